//! The HTTP tracker frontend (BEP-3, BEP-23, BEP-7).
//!
//! Two endpoints, `/announce` and `/scrape`, parse their query parameters,
//! feed the request pipeline and answer with bencoded dictionaries. Two
//! peer-list encodings coexist:
//!
//! - **Compact**: `peers` is a byte string of 6-byte IPv4 tuples, `peers6`
//!   one of 18-byte IPv6 tuples.
//! - **Dictionary**: `peers` is a list of `{peer id, ip, port}` maps.
//!
//! Protocol errors never surface as HTTP status codes: clients expect a
//! `failure reason` in a bencoded body with status 200.
pub mod handlers;
pub mod peer_ip;
pub mod percent_encoding;
pub mod query;
pub mod requests;
pub mod responses;
pub mod server;
