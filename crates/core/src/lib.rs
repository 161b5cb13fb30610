pub mod config;
pub mod entity;
pub mod error;
pub mod record;
pub mod wire;

pub use config::Config;
pub use entity::*;
pub use error::*;
pub use record::*;
pub use wire::*;
