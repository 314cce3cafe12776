//! `Scrape` response for the HTTP tracker.
use std::borrow::Cow;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bip_bencode::{ben_int, ben_map, BMutAccess};

use crate::core::ScrapeResponse;

/// The bencoded `files` dictionary, keyed by the raw infohash bytes.
#[derive(Debug, PartialEq, Eq)]
pub struct Bencoded {
    pub response: ScrapeResponse,
}

impl Bencoded {
    /// Returns the bencoded body of the scrape response.
    ///
    /// # Panics
    ///
    /// Panics if the files dictionary cannot be accessed as a mutable
    /// bencode dictionary.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut files = ben_map!();
        let files_mut = files.dict_mut().unwrap();

        for file in &self.response.files {
            files_mut.insert(
                Cow::from(file.info_hash.bytes().to_vec()),
                ben_map! {
                    "complete" => ben_int!(i64::from(file.metadata.complete)),
                    "downloaded" => ben_int!(i64::from(file.metadata.downloaded)),
                    "incomplete" => ben_int!(i64::from(file.metadata.incomplete))
                },
            );
        }

        (ben_map! {
            "files" => files
        })
        .encode()
    }
}

impl IntoResponse for Bencoded {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}

impl From<ScrapeResponse> for Bencoded {
    fn from(response: ScrapeResponse) -> Self {
        Self { response }
    }
}

#[cfg(test)]
mod tests {
    use swarm_tracker_primitives::info_hash::InfoHash;
    use swarm_tracker_primitives::swarm_metadata::SwarmMetadata;

    use super::Bencoded;
    use crate::core::{ScrapeFile, ScrapeResponse};

    #[test]
    fn a_scrape_response_should_be_bencoded_as_a_files_dictionary() {
        let response = ScrapeResponse {
            files: vec![ScrapeFile {
                info_hash: InfoHash::V1([0x69; 20]),
                metadata: SwarmMetadata {
                    complete: 1,
                    downloaded: 2,
                    incomplete: 3,
                },
            }],
        };

        let expected = "d5:filesd20:iiiiiiiiiiiiiiiiiiiid8:completei1e10:downloadedi2e10:incompletei3eeee";

        assert_eq!(String::from_utf8(Bencoded::from(response).body()).unwrap(), expected);
    }

    #[test]
    fn an_empty_scrape_response_should_be_an_empty_files_dictionary() {
        let response = ScrapeResponse { files: vec![] };

        assert_eq!(String::from_utf8(Bencoded::from(response).body()).unwrap(), "d5:filesdee");
    }
}
