//! Game engine: room command handlers, the question flow controller, scoring
//! and leaderboard computation.

pub mod flow;
pub mod handlers;
pub mod leaderboard;
pub mod scoring;
