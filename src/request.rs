//! Request attributes and payload encoding.

use std::collections::HashMap;

use bytes::Bytes;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;

use crate::error::{Error, ErrorKind, Result};
use crate::{CONTENT_TYPE_JSON, CONTENT_TYPE_MULTIPART, CONTENT_TYPE_XML};

/// Attributes of a single logical HTTP request.
#[derive(Debug, Clone, Default)]
pub struct RequestAttributes {
    /// HTTP method; must be non-empty.
    pub method: String,
    /// Target URL; must be non-empty.
    pub url: String,
    /// Per-request headers; these override the client's default headers on
    /// key collision, distinct keys from both sets are preserved.
    pub headers: HashMap<String, String>,
    /// Body, encoded at send time according to the resolved content type.
    pub body: Option<RequestBody>,
    /// Whether the configured retry bounds apply; `false` forces a single
    /// attempt.
    pub retry: bool,
    /// Opaque trace identifier, attached to log entries only.
    pub trace_id: Option<String>,
}

/// Request body content.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Structured payload, encoded per the resolved `Content-Type`.
    Structured(serde_json::Value),
    /// Pre-encoded bytes, passed through unchanged.
    Raw(Bytes),
}

impl RequestAttributes {
    /// Create request attributes for `method` and `url`, with retries
    /// allowed.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            retry: true,
            trace_id: None,
        }
    }

    /// Set a header, replacing any existing value for the key.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, &name.into(), &value.into());
        self
    }

    /// Merge `headers` in; later writes win per key.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        for (name, value) in headers {
            set_header(&mut self.headers, &name, &value);
        }
        self
    }

    /// Set a structured body from any serializable value.
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| Error::with_source(ErrorKind::Encode(e.to_string()), e))?;
        self.body = Some(RequestBody::Structured(value));
        Ok(self)
    }

    /// Set a pre-encoded raw body.
    pub fn with_raw(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(RequestBody::Raw(body.into()));
        self
    }

    /// Allow or forbid retries for this request.
    pub fn with_retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    /// Attach a trace identifier for log correlation.
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

/// Look up a header value case-insensitively.
pub(crate) fn get_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Insert a header, replacing any existing value under a
/// differently-cased key.
pub(crate) fn set_header(headers: &mut HashMap<String, String>, name: &str, value: &str) {
    let existing = headers
        .keys()
        .find(|key| key.eq_ignore_ascii_case(name))
        .cloned();
    if let Some(key) = existing {
        headers.remove(&key);
    }
    headers.insert(name.to_string(), value.to_string());
}

/// Merge client default headers with request-specific ones.
///
/// Request values win for identical keys (case-insensitively); distinct keys
/// from both sets are preserved.
pub(crate) fn merge_headers(
    defaults: &HashMap<String, String>,
    request: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut merged = defaults.clone();
    for (name, value) in request {
        set_header(&mut merged, name, value);
    }
    merged
}

/// Encode `body` according to the resolved content type.
///
/// JSON and XML encode the structured value; a `multipart/form-data` prefix
/// requires a pre-encoded raw buffer; anything else (or no content type)
/// defaults to JSON. No body encodes to an empty payload.
pub(crate) fn encode_payload(
    content_type: Option<&str>,
    body: Option<&RequestBody>,
) -> Result<Bytes> {
    let Some(body) = body else {
        return Ok(Bytes::new());
    };

    let content_type = content_type.unwrap_or(CONTENT_TYPE_JSON);

    if content_type.starts_with(CONTENT_TYPE_MULTIPART) {
        return match body {
            RequestBody::Raw(bytes) => Ok(bytes.clone()),
            RequestBody::Structured(_) => Err(Error::new(ErrorKind::Encode(
                "multipart body must be a pre-encoded raw buffer".to_string(),
            ))),
        };
    }

    match body {
        // Raw bodies are already encoded; pass them through for any type.
        RequestBody::Raw(bytes) => Ok(bytes.clone()),
        RequestBody::Structured(value) if content_type == CONTENT_TYPE_XML => {
            xml_bytes(value).map(Bytes::from)
        }
        RequestBody::Structured(value) => serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| Error::with_source(ErrorKind::Encode(e.to_string()), e)),
    }
}

/// Serialize a structured value as XML under a fixed `<request>` root.
///
/// Objects become nested elements, arrays repeat the enclosing tag, scalars
/// become text nodes and null an empty element.
fn xml_bytes(value: &serde_json::Value) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    write_xml_value(&mut writer, "request", value)?;
    Ok(writer.into_inner())
}

fn write_xml_value(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    value: &serde_json::Value,
) -> Result<()> {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            emit(writer, Event::Start(BytesStart::new(tag)))?;
            for (name, child) in map {
                write_xml_value(writer, name, child)?;
            }
            emit(writer, Event::End(BytesEnd::new(tag)))
        }
        Value::Array(items) => {
            for item in items {
                write_xml_value(writer, tag, item)?;
            }
            Ok(())
        }
        Value::Null => emit(writer, Event::Empty(BytesStart::new(tag))),
        Value::String(text) => {
            emit(writer, Event::Start(BytesStart::new(tag)))?;
            emit(writer, Event::Text(BytesText::new(text)))?;
            emit(writer, Event::End(BytesEnd::new(tag)))
        }
        scalar => {
            let text = scalar.to_string();
            emit(writer, Event::Start(BytesStart::new(tag)))?;
            emit(writer, Event::Text(BytesText::new(&text)))?;
            emit(writer, Event::End(BytesEnd::new(tag)))
        }
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::with_source(ErrorKind::Encode("xml write failed".to_string()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_merge_preserves_distinct_keys() {
        let merged = merge_headers(&headers(&[("A", "1")]), &headers(&[("B", "2")]));
        assert_eq!(merged.len(), 2);
        assert_eq!(get_header(&merged, "A"), Some("1"));
        assert_eq!(get_header(&merged, "B"), Some("2"));
    }

    #[test]
    fn test_merge_request_overrides_default() {
        let merged = merge_headers(&headers(&[("A", "1")]), &headers(&[("A", "9")]));
        assert_eq!(merged.len(), 1);
        assert_eq!(get_header(&merged, "A"), Some("9"));
    }

    #[test]
    fn test_merge_override_is_case_insensitive() {
        let merged = merge_headers(
            &headers(&[("Content-Type", "application/json")]),
            &headers(&[("content-type", "application/xml")]),
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(get_header(&merged, "Content-Type"), Some("application/xml"));
    }

    #[test]
    fn test_encode_no_body_is_empty() {
        let payload = encode_payload(Some(CONTENT_TYPE_JSON), None).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_encode_json() {
        let body = RequestBody::Structured(json!({"country": "NL", "steps": 2}));
        let payload = encode_payload(Some(CONTENT_TYPE_JSON), Some(&body)).unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(decoded["country"], "NL");
        assert_eq!(decoded["steps"], 2);
    }

    #[test]
    fn test_encode_defaults_to_json() {
        let body = RequestBody::Structured(json!({"a": 1}));

        let missing = encode_payload(None, Some(&body)).unwrap();
        let other = encode_payload(Some("text/plain"), Some(&body)).unwrap();

        assert_eq!(missing, other);
        assert_eq!(missing.as_ref(), br#"{"a":1}"#);
    }

    #[test]
    fn test_encode_xml() {
        let body = RequestBody::Structured(json!({
            "country": "NL",
            "priority": 1,
        }));
        let payload = encode_payload(Some(CONTENT_TYPE_XML), Some(&body)).unwrap();
        let xml = String::from_utf8(payload.to_vec()).unwrap();

        assert!(xml.starts_with("<request>"));
        assert!(xml.contains("<country>NL</country>"));
        assert!(xml.contains("<priority>1</priority>"));
        assert!(xml.ends_with("</request>"));
    }

    #[test]
    fn test_encode_xml_arrays_repeat_tag() {
        let body = RequestBody::Structured(json!({"step": ["ring", "knock"]}));
        let payload = encode_payload(Some(CONTENT_TYPE_XML), Some(&body)).unwrap();
        let xml = String::from_utf8(payload.to_vec()).unwrap();

        assert!(xml.contains("<step>ring</step><step>knock</step>"));
    }

    #[test]
    fn test_encode_multipart_passes_raw_through() {
        let raw = Bytes::from_static(b"--boundary\r\ncontent\r\n--boundary--");
        let body = RequestBody::Raw(raw.clone());
        let payload =
            encode_payload(Some("multipart/form-data; boundary=boundary"), Some(&body)).unwrap();
        assert_eq!(payload, raw);
    }

    #[test]
    fn test_encode_multipart_rejects_structured_body() {
        let body = RequestBody::Structured(json!({"a": 1}));
        let err = encode_payload(Some("multipart/form-data"), Some(&body)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Encode(_)));
    }

    #[test]
    fn test_request_builder_helpers() {
        let request = RequestAttributes::new("POST", "https://example.com/configurations")
            .with_header("X-Trace", "t-1")
            .with_json(&json!({"ok": true}))
            .unwrap()
            .with_retry(false)
            .with_trace_id("t-1");

        assert_eq!(request.method, "POST");
        assert!(!request.retry);
        assert_eq!(request.trace_id.as_deref(), Some("t-1"));
        assert!(matches!(request.body, Some(RequestBody::Structured(_))));
        assert_eq!(get_header(&request.headers, "x-trace"), Some("t-1"));
    }

    #[test]
    fn test_new_request_allows_retries_by_default() {
        let request = RequestAttributes::new("GET", "https://example.com");
        assert!(request.retry);
        assert!(request.body.is_none());
    }
}
