pub mod health;
pub mod squads;
