//! Physical counter keys derived from one logical key.
//!
//! Views and clicks live in separate rows so each can be incremented
//! atomically on its own.

pub const VIEWS_SUFFIX: &str = "_views";
pub const CLICKS_SUFFIX: &str = "_clicks";

pub fn views_key(key: &str) -> String {
    format!("{}{}", key, VIEWS_SUFFIX)
}

pub fn clicks_key(key: &str) -> String {
    format!("{}{}", key, CLICKS_SUFFIX)
}
