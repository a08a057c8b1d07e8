mod connection;
pub mod search;

pub use connection::{Database, DbError, Result};
pub use search::{Query, SearchHit};
