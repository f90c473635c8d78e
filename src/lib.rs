pub mod cli;
pub mod counter_store;
pub mod ctr;
pub mod error;
pub mod keys;
pub mod processor;
pub mod server;
pub mod sled_table;
pub mod table;
pub mod thompson;
