//! `Error` response for the HTTP tracker.
//!
//! A protocol failure is always delivered as a bencoded body with HTTP
//! status 200: `BitTorrent` clients expect the `failure reason` in the body
//! and treat non-2xx responses as a dead tracker.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bip_bencode::{ben_bytes, ben_map};

/// The bencoded `{"failure reason": <message>}` dictionary.
#[derive(Debug, PartialEq, Eq)]
pub struct Error {
    pub failure_reason: String,
}

impl Error {
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        (ben_map! {
            "failure reason" => ben_bytes!(self.failure_reason.clone())
        })
        .encode()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}

impl From<&crate::core::error::Error> for Error {
    fn from(error: &crate::core::error::Error) -> Self {
        Self {
            failure_reason: error.failure_reason(),
        }
    }
}
