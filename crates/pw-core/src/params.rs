//! # Parameter Sets
//!
//! String-to-string request parameters shared by widgets and pingbacks.
//! The canonical serialization used for signatures lives here and nowhere else.

use std::collections::BTreeMap;

/// Unordered request parameters.
///
/// Keys are unique and a later insert overwrites the earlier value.
/// Iteration is always in ascending byte-wise key order, independent of
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    entries: BTreeMap<String, String>,
}

impl ParameterSet {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Set a parameter, overwriting any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder: set a parameter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Remove a parameter, returning its value if it was present
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Get a parameter value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Get a parameter value, or the empty string when absent
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// Check whether a parameter is present (an empty value still counts)
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(key, value)` pairs in canonical key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Build the canonical signing string.
    ///
    /// Every key except `excluded_key` is written as `key=value` in ascending
    /// byte-wise key order with no separator between pairs, followed by the
    /// raw `secret`. Values are written as-is, without percent-encoding.
    ///
    /// ```
    /// use pw_core::ParameterSet;
    ///
    /// let params = ParameterSet::new()
    ///     .with("uid", "1")
    ///     .with("currency", "10")
    ///     .with("sig", "ignored");
    /// assert_eq!(params.canonical_string(Some("sig"), "abc"), "currency=10uid=1abc");
    /// ```
    pub fn canonical_string(&self, excluded_key: Option<&str>, secret: &str) -> String {
        let mut base = String::new();
        for (key, value) in self.iter() {
            if Some(key) == excluded_key {
                continue;
            }
            base.push_str(key);
            base.push('=');
            base.push_str(value);
        }
        base.push_str(secret);
        base
    }

    /// Encode as an `application/x-www-form-urlencoded` query string, keys sorted
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }

    /// Decode an `application/x-www-form-urlencoded` query or body.
    ///
    /// A repeated key keeps its last value. Undecodable bytes are replaced
    /// with U+FFFD; use [`raw_urlencoded_value`](Self::raw_urlencoded_value)
    /// when a value must be seen byte for byte.
    pub fn from_urlencoded(input: &[u8]) -> Self {
        url::form_urlencoded::parse(input).collect()
    }

    /// The percent-decoded bytes of `key`'s last value in a urlencoded input
    pub fn raw_urlencoded_value(input: &[u8], key: &str) -> Option<Vec<u8>> {
        input
            .split(|&b| b == b'&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.iter().position(|&b| b == b'=') {
                Some(eq) => (&pair[..eq], &pair[eq + 1..]),
                None => (pair, &pair[pair.len()..]),
            })
            .filter(|(name, _)| form_decode(name) == key.as_bytes())
            .last()
            .map(|(_, value)| form_decode(value))
    }
}

fn form_decode(input: &[u8]) -> Vec<u8> {
    let plus_as_space: Vec<u8> = input
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_encoding::percent_decode(&plus_as_space).collect()
}

impl<K, V> FromIterator<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        params.extend(iter);
        params
    }
}

impl<K, V> Extend<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl From<std::collections::HashMap<String, String>> for ParameterSet {
    fn from(map: std::collections::HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}
