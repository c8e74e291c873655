pub mod config;
pub mod connection;
pub mod filter;
pub mod grid;
pub mod query_executor;
pub mod result_set;
pub mod session;
