//! The error taxonomy of the request pipeline.
//!
//! There are three categories:
//!
//! 1. [`ClientError`]: a protocol-visible failure. It is rendered to the
//!    client as a bencoded `failure reason` (HTTP) or an error frame (UDP)
//!    and never logged above DEBUG.
//! 2. Transient internal errors ([`Error::Storage`]): the client receives a
//!    generic failure, the cause is logged at WARN and a failure counter is
//!    incremented.
//! 3. Fatal errors (bad configuration, listener bind failures) never reach
//!    this type; they abort startup in `bootstrap` with a non-zero exit.
use thiserror::Error;

use crate::core::storage;

/// A failure the client caused and is allowed to see.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("info hash not supported")]
    InfoHashNotSupported,
    #[error("unapproved info hash")]
    TorrentNotApproved,
    #[error("unapproved client")]
    ClientNotApproved,
    #[error("{0}")]
    BadRequest(String),
}

/// Any failure a request handler can produce.
#[derive(Error, Debug)]
pub enum Error {
    /// Rendered verbatim to the client.
    #[error("{source}")]
    Client {
        #[from]
        source: ClientError,
    },

    /// A transient store failure; the client receives a generic reason.
    #[error("peer storage failure: {source}")]
    Storage {
        #[from]
        source: storage::Error,
    },
}

impl Error {
    /// The message shown to the client: the real reason for a
    /// [`ClientError`], a generic one otherwise.
    #[must_use]
    pub fn failure_reason(&self) -> String {
        match self {
            Error::Client { source } => source.to_string(),
            Error::Storage { .. } => "internal server error".to_owned(),
        }
    }

    /// Whether the failure was caused by the client.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Client { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::{ClientError, Error};
    use crate::core::storage;

    #[test]
    fn a_client_error_should_be_shown_to_the_client_verbatim() {
        let error = Error::from(ClientError::TorrentNotApproved);

        assert!(error.is_client_error());
        assert_eq!(error.failure_reason(), "unapproved info hash");
    }

    #[test]
    fn an_internal_error_should_be_reduced_to_a_generic_reason() {
        let error = Error::from(storage::Error::ResourceDoesNotExist);

        assert!(!error.is_client_error());
        assert_eq!(error.failure_reason(), "internal server error");
    }
}
