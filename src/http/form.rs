//! POST body key/value pairs.
//!
//! The body is split on `&`, each pair on its first `=`. Keys and values are
//! kept exactly as sent: no percent-decoding, no quote stripping. A value
//! holding a literal `&` is therefore split into two pairs.

use crate::http::error::ForwardError;

/// Ordered key/value pairs with map semantics: a repeated key keeps the
/// position of its first occurrence and the value of its last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pairs: Vec<(String, String)>,
}

impl FormFields {
    /// Parse a body, surrounding whitespace ignored. A pair without `=`
    /// (including the empty pair of an empty body) fails the whole body.
    pub fn parse(body: &str) -> Result<Self, ForwardError> {
        let mut fields = Self::default();

        for pair in body.trim().split('&') {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| ForwardError::MalformedBody {
                    pair: pair.to_string(),
                })?;
            fields.insert(key, value);
        }

        Ok(fields)
    }

    fn insert(&mut self, key: &str, value: &str) {
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.pairs.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Pairs in insertion order, ready for form URL-encoding.
    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}
