//! Aggregate counters for one swarm.
use serde::{Deserialize, Serialize};

/// The counters a scrape returns for a single infohash.
///
/// Field names follow BEP-48: `complete` are active seeders, `incomplete`
/// active leechers and `downloaded` the number of `completed` events ever
/// observed (snatches).
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SwarmMetadata {
    /// Number of peers that have ever completed downloading (snatches).
    pub downloaded: u32,
    /// Number of active seeders.
    pub complete: u32,
    /// Number of active leechers.
    pub incomplete: u32,
}

impl SwarmMetadata {
    #[must_use]
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// Adds the counters of another swarm, saturating on overflow.
    ///
    /// Used to merge the v1 and v2 projections of a hybrid torrent.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            downloaded: self.downloaded.saturating_add(other.downloaded),
            complete: self.complete.saturating_add(other.complete),
            incomplete: self.incomplete.saturating_add(other.incomplete),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SwarmMetadata;

    #[test]
    fn it_should_merge_counters_of_two_swarms() {
        let v2 = SwarmMetadata {
            downloaded: 1,
            complete: 2,
            incomplete: 3,
        };
        let v1 = SwarmMetadata {
            downloaded: 10,
            complete: 20,
            incomplete: 30,
        };

        assert_eq!(
            v2.merge(&v1),
            SwarmMetadata {
                downloaded: 11,
                complete: 22,
                incomplete: 33,
            }
        );
    }
}
