pub mod config;
pub mod executor;
pub mod shell;
pub mod storage;
pub mod types;

pub use config::EngineConfig;
pub use executor::query::Query;
pub use storage::{
    database::Database,
    table::{SharedTable, Table},
};
pub use types::{
    error::{DatabaseError, Result},
    record::Record,
};
