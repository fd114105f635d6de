//! Request body for POST/PUT operations.

use crate::base::neterror::NetError;
use crate::http::multipart::Form;
use bytes::Bytes;
use serde::ser::{Serialize, Serializer};

/// Request body for HTTP methods that send data.
#[derive(Debug, Default)]
pub enum RequestBody {
    /// No body (GET, HEAD, DELETE).
    #[default]
    Empty,
    /// Body with raw bytes, sent verbatim.
    Bytes(Bytes),
    /// Name/value pairs, encoded per the request's `Content-Type`.
    Fields(Vec<(String, String)>),
    /// Streamed multipart/form-data.
    Multipart(Form),
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::Bytes(Bytes::from(s))
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(v: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(v))
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::Bytes(Bytes::from(s.to_owned()))
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        RequestBody::Bytes(b)
    }
}

impl From<Form> for RequestBody {
    fn from(form: Form) -> Self {
        RequestBody::Multipart(form)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestBody {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RequestBody::Fields(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Serializes field pairs as a JSON object in insertion order.
struct OrderedFields<'a>(&'a [(String, String)]);

impl Serialize for OrderedFields<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

impl RequestBody {
    /// Check if the body is empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, RequestBody::Multipart(_))
    }

    /// Encode a buffered body. Fields become JSON when `content_type` is
    /// `application/json`, otherwise `application/x-www-form-urlencoded`.
    ///
    /// Returns `None` for an empty body and for multipart forms, which are
    /// streamed rather than buffered.
    pub fn encode(&self, content_type: Option<&str>) -> Result<Option<Bytes>, NetError> {
        match self {
            RequestBody::Empty | RequestBody::Multipart(_) => Ok(None),
            RequestBody::Bytes(b) => Ok(Some(b.clone())),
            RequestBody::Fields(fields) => {
                let is_json = content_type
                    .and_then(|ct| ct.split(';').next())
                    .is_some_and(|ct| ct.trim().eq_ignore_ascii_case("application/json"));
                if is_json {
                    serde_json::to_vec(&OrderedFields(fields))
                        .map(|v| Some(Bytes::from(v)))
                        .map_err(|e| NetError::JsonParseError {
                            message: e.to_string(),
                        })
                } else {
                    let encoded = url::form_urlencoded::Serializer::new(String::new())
                        .extend_pairs(fields.iter())
                        .finish();
                    Ok(Some(Bytes::from(encoded)))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body() {
        let body = RequestBody::Empty;
        assert!(body.is_empty());
        assert_eq!(body.encode(None).unwrap(), None);
    }

    #[test]
    fn test_from_str() {
        let body: RequestBody = "test".into();
        assert_eq!(body.encode(None).unwrap().unwrap(), "test");
    }

    #[test]
    fn test_from_vec() {
        let body: RequestBody = vec![1u8, 2, 3, 4].into();
        assert_eq!(body.encode(None).unwrap().unwrap().len(), 4);
    }

    #[test]
    fn test_fields_form_encoded() {
        let body: RequestBody = [("q", "rust lang"), ("page", "2")].into_iter().collect();
        assert_eq!(
            body.encode(Some("application/x-www-form-urlencoded"))
                .unwrap()
                .unwrap(),
            "q=rust+lang&page=2"
        );
        assert_eq!(body.encode(None).unwrap().unwrap(), "q=rust+lang&page=2");
    }

    #[test]
    fn test_fields_json_keeps_order() {
        let body: RequestBody = [("z", "1"), ("a", "é")].into_iter().collect();
        let encoded = body
            .encode(Some("application/json; charset=utf-8"))
            .unwrap()
            .unwrap();
        assert_eq!(encoded, "{\"z\":\"1\",\"a\":\"é\"}");
    }

    #[test]
    fn test_multipart_is_streamed() {
        let body: RequestBody = Form::with_boundary("b").text("k", "v").into();
        assert!(body.is_multipart());
        assert_eq!(body.encode(None).unwrap(), None);
    }

    #[test]
    fn test_default_is_empty() {
        let body = RequestBody::default();
        assert!(body.is_empty());
    }
}
