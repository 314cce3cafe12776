//! Time sources for the tracker.
//!
//! Everything in the tracker that needs the current time goes through a
//! clock type implementing [`clock::Time`] so that tests can pin time and
//! drive expiry (peer lifetimes, connection-ID windows) deterministically.
//!
//! Clocks return a `DurationSinceUnixEpoch`, i.e. a `std::time::Duration`
//! since the Unix Epoch (a timestamp, independent of the system time zone).
pub mod clock;
pub mod time_extent;

/// Working clock for production builds, stopped clock under `cfg(test)`.
///
/// This alias needs to be redeclared in each crate using it, because
/// `cfg(test)` is evaluated per crate.
#[cfg(not(test))]
pub type CurrentClock = clock::Working;

/// Working clock for production builds, stopped clock under `cfg(test)`.
#[cfg(test)]
pub type CurrentClock = clock::Stopped;
