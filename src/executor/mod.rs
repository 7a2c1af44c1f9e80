pub mod lock;
pub mod query;
pub mod resolve;
