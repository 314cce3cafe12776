//! Connection-ID issuance and verification.
//!
//! The server never stores issued connection IDs. Instead the cookie is
//! derived from the client IP address, the minute bucket the current time
//! falls into and a server-private secret:
//!
//! ```text
//! connection id = hash(client IP, minute bucket, secret)
//! ```
//!
//! Verification rebuilds the cookie for the current bucket and up to
//! `max_clock_skew` previous buckets; with the default window of one, a
//! token stays valid for the current and the previous minute. This defends
//! against source-IP spoofing: an attacker that cannot read the connect
//! response cannot produce a valid cookie for the forged address.
//!
//! The secret either comes from the configuration or is generated at
//! startup; a generated secret is rotated periodically, and the previous
//! secret stays accepted so rotation never invalidates fresh tokens.
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::panic::Location;
use std::time::Duration;

use aquatic_udp_protocol::ConnectionId;
use parking_lot::RwLock;
use rand::RngCore;
use swarm_tracker_clock::time_extent::{make_time_extent, TimeExtent};

use super::error::Error;
use crate::CurrentClock;

/// A connection ID in its raw big-endian byte form.
pub type Cookie = [u8; 8];

/// Width of one cookie validity bucket.
pub const COOKIE_INCREMENT: Duration = Duration::from_secs(60);

const SECRET_LEN: usize = 32;

type Secret = [u8; SECRET_LEN];

/// Holds the current and the previous cookie secret.
///
/// Readers take a snapshot of both under a short read lock; the rotation
/// job swaps them in one write.
#[derive(Debug)]
pub struct SecretKeeper {
    secrets: RwLock<(Secret, Secret)>,
}

impl SecretKeeper {
    /// Builds a keeper from the configured private key. An empty key yields
    /// a randomly generated secret, which the caller is expected to rotate.
    #[must_use]
    pub fn from_private_key(private_key: &str) -> Self {
        let secret = if private_key.is_empty() {
            random_secret()
        } else {
            secret_from_key_material(private_key)
        };

        Self {
            secrets: RwLock::new((secret, secret)),
        }
    }

    /// Replaces the current secret with a fresh random one, keeping the old
    /// secret valid as the previous one.
    pub fn rotate(&self) {
        let fresh = random_secret();
        let mut secrets = self.secrets.write();
        *secrets = (fresh, secrets.0);
    }

    fn snapshot(&self) -> (Secret, Secret) {
        *self.secrets.read()
    }
}

fn random_secret() -> Secret {
    let mut secret = [0u8; SECRET_LEN];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}

fn secret_from_key_material(private_key: &str) -> Secret {
    let mut secret = [0u8; SECRET_LEN];
    for (slot, byte) in secret.iter_mut().zip(private_key.as_bytes().iter().cycle()) {
        *slot = *byte;
    }
    secret
}

/// Converts a connection ID into a cookie.
#[must_use]
pub fn from_connection_id(connection_id: &ConnectionId) -> Cookie {
    connection_id.0.to_be_bytes()
}

/// Converts a cookie into a connection ID.
#[must_use]
pub fn into_connection_id(cookie: &Cookie) -> ConnectionId {
    ConnectionId(i64::from_be_bytes(*cookie))
}

/// Generates the cookie for a client address at the current minute bucket.
#[must_use]
pub fn make(remote_ip: &IpAddr, secrets: &SecretKeeper) -> Cookie {
    let (current, _) = secrets.snapshot();
    build(remote_ip, &make_time_extent::<CurrentClock>(COOKIE_INCREMENT), &current)
}

/// Checks a cookie against the current and up to `max_clock_skew` previous
/// minute buckets, under both the current and the previous secret.
///
/// # Errors
///
/// Will return an [`Error::InvalidConnectionId`] if no combination matches.
pub fn check(remote_ip: &IpAddr, cookie: &Cookie, secrets: &SecretKeeper, max_clock_skew: u64) -> Result<(), Error> {
    let (current_secret, previous_secret) = secrets.snapshot();
    let newest = make_time_extent::<CurrentClock>(COOKIE_INCREMENT);

    for secret in [&current_secret, &previous_secret] {
        for offset in 0..=max_clock_skew {
            let Some(extent) = newest.decrease(offset) else {
                break;
            };
            if build(remote_ip, &extent, secret) == *cookie {
                return Ok(());
            }
        }
    }

    Err(Error::InvalidConnectionId {
        location: Location::caller(),
    })
}

fn build(remote_ip: &IpAddr, time_extent: &TimeExtent, secret: &Secret) -> Cookie {
    let mut hasher = DefaultHasher::new();

    remote_ip.hash(&mut hasher);
    time_extent.amount.hash(&mut hasher);
    secret.hash(&mut hasher);

    hasher.finish().to_be_bytes()
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
    use std::time::Duration;

    use swarm_tracker_clock::clock::stopped::Stopped as _;
    use swarm_tracker_clock::clock::Stopped;
    use swarm_tracker_primitives::DurationSinceUnixEpoch;

    use super::{check, from_connection_id, into_connection_id, make, SecretKeeper};

    const SKEW: u64 = 1;

    fn keeper() -> SecretKeeper {
        SecretKeeper::from_private_key("a test private key")
    }

    fn client_ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1))
    }

    #[test]
    fn it_should_make_the_same_cookie_for_the_same_ip_bucket_and_secret() {
        Stopped::local_set(&DurationSinceUnixEpoch::from_secs(1000));

        let secrets = keeper();

        assert_eq!(make(&client_ip(), &secrets), make(&client_ip(), &secrets));

        Stopped::local_reset();
    }

    #[test]
    fn it_should_make_different_cookies_for_different_ips() {
        let secrets = keeper();

        let one = make(&client_ip(), &secrets);
        let other = make(&IpAddr::V4(Ipv4Addr::new(126, 0, 0, 2)), &secrets);

        assert_ne!(one, other);
    }

    #[test]
    fn it_should_make_different_cookies_for_different_ip_versions() {
        let secrets = keeper();

        let v4 = make(&IpAddr::V4(Ipv4Addr::UNSPECIFIED), &secrets);
        let v6 = make(&IpAddr::V6(Ipv6Addr::UNSPECIFIED), &secrets);

        assert_ne!(v4, v6);
    }

    #[test]
    fn it_should_make_different_cookies_for_different_secrets() {
        let one = make(&client_ip(), &SecretKeeper::from_private_key("one"));
        let other = make(&client_ip(), &SecretKeeper::from_private_key("other"));

        assert_ne!(one, other);
    }

    #[test]
    fn a_cookie_should_be_valid_right_after_it_was_made() {
        Stopped::local_set(&DurationSinceUnixEpoch::from_secs(1000));

        let secrets = keeper();
        let cookie = make(&client_ip(), &secrets);

        check(&client_ip(), &cookie, &secrets, SKEW).unwrap();

        Stopped::local_reset();
    }

    #[test]
    fn a_cookie_should_be_valid_59_seconds_later() {
        Stopped::local_set(&DurationSinceUnixEpoch::from_secs(1000));

        let secrets = keeper();
        let cookie = make(&client_ip(), &secrets);

        Stopped::local_add(&Duration::from_secs(59)).unwrap();

        check(&client_ip(), &cookie, &secrets, SKEW).unwrap();

        Stopped::local_reset();
    }

    #[test]
    fn a_cookie_should_be_rejected_121_seconds_later() {
        Stopped::local_set(&DurationSinceUnixEpoch::from_secs(1000));

        let secrets = keeper();
        let cookie = make(&client_ip(), &secrets);

        Stopped::local_add(&Duration::from_secs(121)).unwrap();

        assert!(check(&client_ip(), &cookie, &secrets, SKEW).is_err());

        Stopped::local_reset();
    }

    #[test]
    fn a_cookie_should_be_rejected_for_another_ip() {
        Stopped::local_set(&DurationSinceUnixEpoch::from_secs(1000));

        let secrets = keeper();
        let cookie = make(&client_ip(), &secrets);

        assert!(check(&IpAddr::V4(Ipv4Addr::new(126, 0, 0, 2)), &cookie, &secrets, SKEW).is_err());

        Stopped::local_reset();
    }

    #[test]
    fn a_tampered_cookie_should_be_rejected() {
        Stopped::local_set(&DurationSinceUnixEpoch::from_secs(1000));

        let secrets = keeper();
        let mut cookie = make(&client_ip(), &secrets);
        cookie[0] ^= 0x01;

        assert!(check(&client_ip(), &cookie, &secrets, SKEW).is_err());

        Stopped::local_reset();
    }

    #[test]
    fn a_cookie_should_survive_one_secret_rotation_but_not_two() {
        Stopped::local_set(&DurationSinceUnixEpoch::from_secs(1000));

        let secrets = SecretKeeper::from_private_key("");
        let cookie = make(&client_ip(), &secrets);

        secrets.rotate();
        check(&client_ip(), &cookie, &secrets, SKEW).unwrap();

        secrets.rotate();
        assert!(check(&client_ip(), &cookie, &secrets, SKEW).is_err());

        Stopped::local_reset();
    }

    #[test]
    fn it_should_round_trip_through_a_connection_id() {
        let cookie = [1u8, 2, 3, 4, 5, 6, 7, 8];

        assert_eq!(from_connection_id(&into_connection_id(&cookie)), cookie);
    }
}
