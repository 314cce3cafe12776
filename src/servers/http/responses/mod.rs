//! Bencoded responses of the HTTP tracker.
pub mod announce;
pub mod error;
pub mod scrape;
