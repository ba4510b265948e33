//! Middleware configuration.
//!
//! Three strings, nothing else. Hosts usually hand plugins their settings as
//! JSON, so [`Config`] deserializes from the camelCase shape below, with any
//! missing field falling back to its default:
//!
//! ```json
//! {
//!   "requestHeaderName":  "X-Request-Time",
//!   "responseHeaderName": "X-Response-Time",
//!   "dateFormat":         "2006-01-02 15:04:05 UTC"
//! }
//! ```

use serde::Deserialize;

use crate::error::Error;

pub const DEFAULT_REQUEST_HEADER: &str = "REQUEST-TIMESTAMP";
pub const DEFAULT_RESPONSE_HEADER: &str = "RESPONSE-TIMESTAMP";
pub const DEFAULT_DATE_FORMAT: &str = "2006-01-02T15:04:05.000Z";

/// Header names and timestamp layout for one middleware instance.
///
/// `date_format` is a reference-date layout (see [`Layout`](crate::Layout)).
/// It is never validated: a pattern with no recognised components is simply
/// copied into the header as-is.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub request_header_name: String,
    pub response_header_name: String,
    pub date_format: String,
}

impl Config {
    /// The defaults: `REQUEST-TIMESTAMP`, `RESPONSE-TIMESTAMP`, millisecond ISO-8601.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a JSON document; absent fields keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn request_header(mut self, name: impl Into<String>) -> Self {
        self.request_header_name = name.into();
        self
    }

    pub fn response_header(mut self, name: impl Into<String>) -> Self {
        self.response_header_name = name.into();
        self
    }

    pub fn date_format(mut self, layout: impl Into<String>) -> Self {
        self.date_format = layout.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_header_name: DEFAULT_REQUEST_HEADER.to_owned(),
            response_header_name: DEFAULT_RESPONSE_HEADER.to_owned(),
            date_format: DEFAULT_DATE_FORMAT.to_owned(),
        }
    }
}
