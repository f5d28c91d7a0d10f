pub mod assistant;
pub mod search;
pub mod shared;

#[cfg(feature = "cli")]
pub mod cli;
