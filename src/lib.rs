//! A multi-protocol, middleware-driven `BitTorrent` tracker.
//!
//! The tracker ingests peer `announce` and `scrape` requests over UDP
//! (BEP-15) and HTTP (BEP-3, BEP-23, BEP-7) and answers with peer sets and
//! swarm statistics.
//!
//! ```text
//! Delivery layer     Domain layer
//!
//! HTTP frontend |
//!  UDP frontend |> request pipeline > peer storage
//! ```
//!
//! Both frontends validate the wire request, hand a domain
//! [`AnnounceRequest`](crate::core::AnnounceRequest) or
//! [`ScrapeRequest`](crate::core::ScrapeRequest) to the
//! [`pipeline`](crate::core::pipeline), and serialize the domain response
//! back into their own wire format. The pipeline runs the configured
//! pre-hooks, the swarm interaction against the peer store, the response
//! assembly and the configured post-hooks, in that order.
//!
//! The [`core::storage::memory`] module contains the reference peer store: a
//! sharded, in-memory swarm map with a background garbage collector.
pub mod app;
pub mod bootstrap;
pub mod core;
pub mod servers;

/// Working clock for production builds, stopped clock under `cfg(test)`.
///
/// This alias has to be redeclared in each crate using it, because
/// `cfg(test)` is evaluated per crate.
#[cfg(not(test))]
pub type CurrentClock = swarm_tracker_clock::clock::Working;

/// Working clock for production builds, stopped clock under `cfg(test)`.
#[cfg(test)]
pub type CurrentClock = swarm_tracker_clock::clock::Stopped;
