pub mod catalog;
pub mod config;
pub mod highlight;
pub mod host;
pub mod matcher;
pub mod models;
pub mod resolver;
pub mod terminal;

pub use catalog::*;
pub use config::*;
pub use host::*;
pub use matcher::*;
pub use models::*;
pub use resolver::*;
