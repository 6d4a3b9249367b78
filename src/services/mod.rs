pub mod catalog;
pub mod leaderboard;
pub mod overview;

pub use catalog::*;
pub use leaderboard::*;
pub use overview::*;
