//! A clock frozen at a settable instant, used by tests to drive expiry.
use std::num::IntErrorKind;
use std::time::Duration;

use swarm_tracker_primitives::DurationSinceUnixEpoch;

use super::Time;
use crate::clock;

#[allow(clippy::module_name_repetitions)]
pub struct StoppedClock {}

#[allow(clippy::module_name_repetitions)]
pub trait Stopped: Time {
    /// It sets the clock to a given time.
    fn local_set(unix_time: &DurationSinceUnixEpoch);

    /// It sets the clock to the Unix Epoch.
    fn local_set_to_unix_epoch() {
        Self::local_set(&DurationSinceUnixEpoch::ZERO);
    }

    /// It adds a `Duration` to the clock.
    ///
    /// # Errors
    ///
    /// Will return `IntErrorKind` if `duration` would overflow the internal
    /// `Duration`.
    fn local_add(duration: &Duration) -> Result<(), IntErrorKind>;

    /// It subtracts a `Duration` from the clock.
    ///
    /// # Errors
    ///
    /// Will return `IntErrorKind` if `duration` would underflow the internal
    /// `Duration`.
    fn local_sub(duration: &Duration) -> Result<(), IntErrorKind>;

    /// It resets the clock to the Unix Epoch.
    fn local_reset() {
        Self::local_set_to_unix_epoch();
    }
}

impl Time for clock::Stopped {
    fn now() -> DurationSinceUnixEpoch {
        detail::FIXED_TIME.with(|time| *time.borrow())
    }
}

impl Stopped for clock::Stopped {
    fn local_set(unix_time: &DurationSinceUnixEpoch) {
        detail::FIXED_TIME.with(|time| {
            *time.borrow_mut() = *unix_time;
        });
    }

    fn local_add(duration: &Duration) -> Result<(), IntErrorKind> {
        detail::FIXED_TIME.with(|time| {
            let current = *time.borrow();
            match current.checked_add(*duration) {
                Some(new_time) => {
                    *time.borrow_mut() = new_time;
                    Ok(())
                }
                None => Err(IntErrorKind::PosOverflow),
            }
        })
    }

    fn local_sub(duration: &Duration) -> Result<(), IntErrorKind> {
        detail::FIXED_TIME.with(|time| {
            let current = *time.borrow();
            match current.checked_sub(*duration) {
                Some(new_time) => {
                    *time.borrow_mut() = new_time;
                    Ok(())
                }
                None => Err(IntErrorKind::NegOverflow),
            }
        })
    }
}

mod detail {
    use std::cell::RefCell;

    use swarm_tracker_primitives::DurationSinceUnixEpoch;

    thread_local!(pub static FIXED_TIME: RefCell<DurationSinceUnixEpoch> = const { RefCell::new(DurationSinceUnixEpoch::ZERO) });
}
