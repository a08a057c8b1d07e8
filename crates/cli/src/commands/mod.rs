//! CLI command implementations

mod index;
mod search;
mod worker;

pub use self::index::cmd_index;
pub use search::cmd_search;
pub use worker::cmd_worker;
