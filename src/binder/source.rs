use super::error::BindError;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Maximum inline path parameters before heap allocation
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated path parameter storage
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Path parameters captured by the router for the current request.
///
/// Routers insert this into the request extensions before binding:
///
/// ```rust
/// use fieldbind::binder::PathParams;
///
/// let mut req = http::Request::get("/items/42").body(std::io::empty()).unwrap();
/// req.extensions_mut().insert(PathParams::from_iter([("id", "42")]));
/// ```
///
/// Requests without the extension bind every `param` field as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathParams(ParamVec);

impl PathParams {
    /// Empty parameter set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a captured parameter.
    pub fn insert(&mut self, name: impl Into<Arc<str>>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Get a path parameter by name.
    ///
    /// Uses "last write wins" semantics: if the same name is captured at
    /// several path depths, the deepest capture is returned.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of captured parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no parameters were captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<Arc<str>>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = PathParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Multi-valued `key=value` pairs from a query string or form body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormValues(HashMap<String, Vec<String>>);

impl FormValues {
    /// Parse `application/x-www-form-urlencoded` bytes, keeping every
    /// occurrence of a key in order.
    #[must_use]
    pub fn parse(input: &[u8]) -> Self {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (k, v) in url::form_urlencoded::parse(input) {
            values.entry(k.into_owned()).or_default().push(v.into_owned());
        }
        Self(values)
    }

    /// Parse the query component of a request URI (`None` when there is none).
    #[must_use]
    pub fn from_query(query: Option<&str>) -> Self {
        query.map(|q| Self::parse(q.as_bytes())).unwrap_or_default()
    }

    /// Append every value of `other` after this set's values for the same key.
    pub fn append(&mut self, other: &FormValues) {
        for (k, vs) in &other.0 {
            self.0.entry(k.clone()).or_default().extend(vs.iter().cloned());
        }
    }

    /// All values for `key`
    #[must_use]
    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// All values for `key` joined by a single space; `None` when the key is absent.
    #[must_use]
    pub fn joined(&self, key: &str) -> Option<String> {
        match self.get_all(key) {
            [] => None,
            values => Some(values.join(" ")),
        }
    }

    /// Number of distinct keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no keys were parsed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Read at most `limit` bytes of request body.
pub(crate) fn read_body<B: Read>(body: B, limit: usize) -> Result<Vec<u8>, BindError> {
    let mut buf = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    body.take(cap)
        .read_to_end(&mut buf)
        .map_err(BindError::Body)?;
    if buf.len() > limit {
        return Err(BindError::BodyTooLarge { limit });
    }
    debug!(body_size_bytes = buf.len(), "Request body read");
    Ok(buf)
}

/// Decode a JSON body into its top-level object.
///
/// A literal `null` body is an empty object: it binds nothing.
pub(crate) fn parse_json_object(
    bytes: &[u8],
) -> Result<serde_json::Map<String, serde_json::Value>, BindError> {
    let parse_start = std::time::Instant::now();
    let parsed = serde_json::from_slice::<Option<serde_json::Map<String, serde_json::Value>>>(bytes);
    let parse_duration_ms = parse_start.elapsed().as_millis() as u64;
    match parsed {
        Ok(map) => {
            let map = map.unwrap_or_default();
            debug!(
                parse_duration_ms = parse_duration_ms,
                body_fields = map.len(),
                "JSON body parsed"
            );
            Ok(map)
        }
        Err(err) => {
            debug!(
                parse_duration_ms = parse_duration_ms,
                error = %err,
                "JSON body parse failed"
            );
            Err(BindError::InvalidJson(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_params_last_write_wins() {
        let params = PathParams::from_iter([("id", "org"), ("team", "t"), ("id", "user")]);
        assert_eq!(params.get("id"), Some("user"));
        assert_eq!(params.get("team"), Some("t"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_query_values_are_multi_valued() {
        let q = FormValues::from_query(Some("tag=red&tag=blue&x=1&name=a%20b&plus=c+d"));
        assert_eq!(q.get_all("tag"), ["red", "blue"]);
        assert_eq!(q.joined("tag").as_deref(), Some("red blue"));
        assert_eq!(q.joined("name").as_deref(), Some("a b"));
        assert_eq!(q.joined("plus").as_deref(), Some("c d"));
        assert_eq!(q.joined("missing"), None);
        assert!(FormValues::from_query(None).is_empty());
    }

    #[test]
    fn test_append_puts_other_values_last() {
        let mut body = FormValues::parse(b"a=body");
        body.append(&FormValues::parse(b"a=query&b=2"));
        assert_eq!(body.get_all("a"), ["body", "query"]);
        assert_eq!(body.get_all("b"), ["2"]);
    }

    #[test]
    fn test_read_body_limit() {
        assert_eq!(read_body(&b"abcd"[..], 4).unwrap(), b"abcd");
        assert!(matches!(
            read_body(&b"abcde"[..], 4),
            Err(BindError::BodyTooLarge { limit: 4 })
        ));
        assert_eq!(read_body(&b"abcde"[..], usize::MAX).unwrap(), b"abcde");
        assert_eq!(read_body(&b"x"[..], 0).unwrap_err().to_string(), "bad request: request body exceeds 0 bytes");
    }

    #[test]
    fn test_parse_json_object_rejects_non_objects() {
        assert!(parse_json_object(br#"{"a": 1}"#).is_ok());
        assert!(parse_json_object(b"null").unwrap().is_empty());
        assert!(parse_json_object(b" null ").unwrap().is_empty());
        assert!(matches!(parse_json_object(b"[1]"), Err(BindError::InvalidJson(_))));
        assert!(matches!(parse_json_object(b""), Err(BindError::InvalidJson(_))));
        assert!(matches!(parse_json_object(b"{"), Err(BindError::InvalidJson(_))));
    }
}
