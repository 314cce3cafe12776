//! The event reported by a peer in an announce request.
use serde::{Deserialize, Serialize};

/// The optional `event` announce parameter. A missing or empty event means a
/// routine update announce.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AnnounceEvent {
    /// The peer has just joined the swarm.
    Started,
    /// The peer is leaving the swarm.
    Stopped,
    /// The peer finished downloading.
    Completed,
    /// A routine interval announce.
    None,
}

impl AnnounceEvent {
    #[must_use]
    pub fn from_optional_str(event: Option<&str>) -> Option<Self> {
        match event {
            None | Some("") => Some(Self::None),
            Some("started") => Some(Self::Started),
            Some("stopped") => Some(Self::Stopped),
            Some("completed") => Some(Self::Completed),
            Some(_) => None,
        }
    }
}

impl std::fmt::Display for AnnounceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
            Self::Completed => write!(f, "completed"),
            Self::None => write!(f, "none"),
        }
    }
}
