//! The wire frontends and their lifecycle plumbing.
pub mod http;
pub mod signals;
pub mod udp;
