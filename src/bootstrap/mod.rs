//! Setup and assembly of the application.
//!
//! `bootstrap` turns the parsed configuration into running services: it
//! builds the peer store, the hook pipeline and the statistics keeper, and
//! spawns the frontend and background jobs.
pub mod app;
pub mod config;
pub mod jobs;
pub mod logging;
