//! Errors of the UDP frontend.
use std::panic::Location;

use thiserror::Error;

use crate::core;

#[derive(Error, Debug)]
pub enum Error {
    /// The client echoed a connection ID that does not verify for its source
    /// address within the accepted time window.
    #[error("connection id could not be verified in {location}")]
    InvalidConnectionId { location: &'static Location<'static> },

    /// The pipeline rejected the request.
    #[error("{source}")]
    Core {
        #[from]
        source: core::error::Error,
    },
}

impl Error {
    /// The reason sent in the error frame. Internal failures are reduced to
    /// a generic message, client failures are shown verbatim.
    #[must_use]
    pub fn failure_reason(&self) -> String {
        match self {
            Error::InvalidConnectionId { .. } => "connection id not valid".to_owned(),
            Error::Core { source } => source.failure_reason(),
        }
    }

    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::InvalidConnectionId { .. } => true,
            Error::Core { source } => source.is_client_error(),
        }
    }
}
