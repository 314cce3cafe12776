//! The `Query` struct used to parse and store the URL query parameters.
//!
//! Raw values are kept percent-encoded: `info_hash` and `peer_id` carry
//! binary data that only the request parsers know how to decode.
use std::panic::Location;
use std::str::FromStr;

use multimap::MultiMap;
use thiserror::Error;

type ParamName = String;
type ParamValue = String;

/// A URL query component, allowing repeated parameters.
#[derive(Debug)]
pub struct Query {
    params: MultiMap<ParamName, ParamValue>,
}

impl Query {
    /// Returns the first value of a param, if present.
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<String> {
        self.params.get(name).cloned()
    }

    /// Returns all the values of a param, if present.
    #[must_use]
    pub fn get_param_vec(&self, name: &str) -> Option<Vec<String>> {
        self.params.get_vec(name).cloned()
    }
}

/// Error returned when parsing a [`Query`] from a string.
#[derive(Error, Debug)]
pub enum ParseQueryError {
    /// A param with an unescaped `=` in its value, e.g. `"name=value=value"`.
    #[error("invalid param {raw_param} in {location}")]
    InvalidParam {
        location: &'static Location<'static>,
        raw_param: String,
    },
}

impl FromStr for Query {
    type Err = ParseQueryError;

    fn from_str(raw_query: &str) -> Result<Self, Self::Err> {
        let mut params: MultiMap<ParamName, ParamValue> = MultiMap::new();

        for raw_param in raw_query.trim().trim_start_matches('?').split('&') {
            if raw_param.is_empty() {
                continue;
            }

            let pair: Vec<&str> = raw_param.split('=').collect();
            if pair.len() != 2 {
                return Err(ParseQueryError::InvalidParam {
                    location: Location::caller(),
                    raw_param: raw_param.to_owned(),
                });
            }

            params.insert(pair[0].to_owned(), pair[1].to_owned());
        }

        Ok(Self { params })
    }
}

impl From<Vec<(&str, &str)>> for Query {
    fn from(raw_params: Vec<(&str, &str)>) -> Self {
        let mut params: MultiMap<ParamName, ParamValue> = MultiMap::new();

        for (name, value) in raw_params {
            params.insert(name.to_owned(), value.to_owned());
        }

        Self { params }
    }
}

#[cfg(test)]
mod tests {
    use crate::servers::http::query::Query;

    #[test]
    fn it_should_parse_the_query_params_from_an_url_query_string() {
        let raw_query = "info_hash=%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0&peer_id=-qB00000000000000001&port=17548";

        let query = raw_query.parse::<Query>().unwrap();

        assert_eq!(
            query.get_param("info_hash").unwrap(),
            "%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0"
        );
        assert_eq!(query.get_param("peer_id").unwrap(), "-qB00000000000000001");
        assert_eq!(query.get_param("port").unwrap(), "17548");
    }

    #[test]
    fn it_should_allow_more_than_one_value_for_the_same_param() {
        let query = "info_hash=a&info_hash=b".parse::<Query>().unwrap();

        assert_eq!(
            query.get_param_vec("info_hash"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(query.get_param("info_hash"), Some("a".to_string()));
    }

    #[test]
    fn it_should_ignore_the_preceding_question_mark_if_it_exists() {
        let query = "?name=value".parse::<Query>().unwrap();

        assert_eq!(query.get_param("name"), Some("value".to_string()));
    }

    #[test]
    fn it_should_fail_parsing_an_invalid_query_string() {
        assert!("name=value=value".parse::<Query>().is_err());
    }

    #[test]
    fn it_should_be_instantiated_from_a_string_pair_vector() {
        let query = Query::from(vec![("param1", "value1"), ("param2", "value2")]);

        assert_eq!(query.get_param("param1"), Some("value1".to_string()));
        assert_eq!(query.get_param("param2"), Some("value2".to_string()));
    }
}
