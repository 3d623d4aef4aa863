use serde::Deserialize;

/// `?key=` query carried by every admin endpoint. A missing key deserializes
/// to the empty string, which is never authorized.
#[derive(Debug, Default, Deserialize)]
pub struct KeyQuery {
    #[serde(default)]
    pub key: String,
}

impl KeyQuery {
    /// `key=<url-encoded key>` for building admin links and redirects
    pub fn to_query_string(&self) -> Result<String, serde_urlencoded::ser::Error> {
        serde_urlencoded::to_string([("key", self.key.as_str())])
    }
}
