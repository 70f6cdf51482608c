pub mod player;
pub mod proposal;
pub mod squad;

pub use player::*;
pub use proposal::*;
pub use squad::*;
