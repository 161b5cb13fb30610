//! Persistence port for expressions and users, with in-memory and
//! PostgreSQL backends.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{ExpressionStore, UserStore};
