pub mod coordinator;
pub mod directory;
pub mod ledger;
pub mod membership;
pub mod registry;
pub mod rules;
pub mod search;
