//! Parsing of the `announce` and `scrape` requests.
pub mod announce;
pub mod scrape;
