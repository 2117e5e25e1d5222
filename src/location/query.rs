//! Query string parsing and serialization.
//!
//! The store keeps only scalars: a repeated key keeps its last value, at
//! the position where it first appeared.

use std::borrow::Cow;

/// Ordered string map mirroring the pairs of a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMap {
    entries: Vec<(String, String)>,
}

impl QueryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string, with or without its leading `?`.
    ///
    /// Never fails: pairs without `=` get an empty value, empty keys are
    /// skipped, and escapes that do not decode to UTF-8 are kept verbatim.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut map = Self::new();

        for pair in query.split('&') {
            if pair.is_empty() {
                continue;
            }
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(raw_key);
            if key.is_empty() {
                continue;
            }
            map.insert(key, decode_component(raw_value));
        }

        map
    }

    /// Serialize in insertion order. An empty map yields an empty string.
    pub fn to_query_string(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert or replace. Returns `true` if the map changed.
    pub fn insert(&mut self, key: String, value: String) -> bool {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) if *existing == value => false,
            Some((_, existing)) => {
                *existing = value;
                true
            }
            None => {
                self.entries.push((key, value));
                true
            }
        }
    }

    /// Remove a key. Returns `true` if it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != key);
        self.entries.len() != before
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k.into(), v.into());
        }
        map
    }
}

fn decode_component(raw: &str) -> String {
    let spaced: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strips_leading_question_mark() {
        let map = QueryMap::parse("?country=Niger&yearMin=1990");
        assert_eq!(map.get("country"), Some("Niger"));
        assert_eq!(map.get("yearMin"), Some("1990"));
        assert_eq!(map.keys(), vec!["country", "yearMin"]);
    }

    #[test]
    fn parse_decodes_plus_and_percent_escapes() {
        let map = QueryMap::parse("search=C%C3%B4te+d%27Ivoire&term=a%26b");
        assert_eq!(map.get("search"), Some("Côte d'Ivoire"));
        assert_eq!(map.get("term"), Some("a&b"));
    }

    #[test]
    fn parse_keeps_last_value_at_first_position() {
        let map = QueryMap::parse("a=1&b=2&a=3");
        assert_eq!(map.keys(), vec!["a", "b"]);
        assert_eq!(map.get("a"), Some("3"));
    }

    #[test]
    fn parse_tolerates_malformed_pairs() {
        let map = QueryMap::parse("&&flag&=orphan&bad=%ZZ");
        assert_eq!(map.get("flag"), Some(""));
        assert!(!map.contains_key(""));
        assert_eq!(map.get("bad"), Some("%ZZ"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn empty_map_serializes_to_empty_string() {
        assert_eq!(QueryMap::new().to_query_string(), "");
        assert!(QueryMap::parse("?").is_empty());
    }

    #[test]
    fn serialize_escapes_reserved_characters() {
        let map: QueryMap = [("search", "a b&c=d")].into_iter().collect();
        assert_eq!(map.to_query_string(), "search=a%20b%26c%3Dd");
        assert_eq!(QueryMap::parse(&map.to_query_string()), map);
    }

    #[test]
    fn insert_reports_changes() {
        let mut map = QueryMap::new();
        assert!(map.insert("k".into(), "v".into()));
        assert!(!map.insert("k".into(), "v".into()));
        assert!(map.insert("k".into(), "w".into()));
        assert!(map.remove("k"));
        assert!(!map.remove("k"));
    }
}
