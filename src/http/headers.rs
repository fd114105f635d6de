use crate::base::neterror::NetError;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use std::str::FromStr;

/// A case-insensitive, multi-valued header collection that preserves insertion order.
///
/// Names are stored in canonical Title-Case form (see [`canonical_name`]), so
/// `content-type`, `CONTENT-TYPE` and `Content-Type` all address the same entry.
/// An entry may hold zero values: it is then declared but empty, and is skipped
/// when the block is serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderStore {
    entries: Vec<(String, Vec<String>)>,
}

/// Convert to title case (e.g., "content-type" -> "Content-Type").
pub fn canonical_name(name: &str) -> String {
    name.trim()
        .split('-')
        .map(|word| {
            let mut chars: Vec<char> = word.chars().collect();
            if let Some(first) = chars.first_mut() {
                *first = first.to_ascii_uppercase();
            }
            for c in chars.iter_mut().skip(1) {
                *c = c.to_ascii_lowercase();
            }
            chars.into_iter().collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("-")
}

impl HeaderStore {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn position(&self, canonical: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == canonical)
    }

    /// Append a value, creating the entry if needed.
    pub fn add(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let canonical = canonical_name(name);
        let value = value.into();
        match self.position(&canonical) {
            Some(idx) => self.entries[idx].1.push(value),
            None => self.entries.push((canonical, vec![value])),
        }
        self
    }

    /// Declare a header as present without a value. No-op if it already exists.
    pub fn declare(&mut self, name: &str) -> &mut Self {
        let canonical = canonical_name(name);
        if self.position(&canonical).is_none() {
            self.entries.push((canonical, Vec::new()));
        }
        self
    }

    /// Replace all values of a header. An existing entry keeps its position.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.replace(name, vec![value.into()])
    }

    /// Replace all values of a header with nothing, keeping it declared.
    pub fn set_empty(&mut self, name: &str) -> &mut Self {
        self.replace(name, Vec::new())
    }

    fn replace(&mut self, name: &str, values: Vec<String>) -> &mut Self {
        let canonical = canonical_name(name);
        match self.position(&canonical) {
            Some(idx) => self.entries[idx].1 = values,
            None => self.entries.push((canonical, values)),
        }
        self
    }

    pub fn remove(&mut self, name: &str) -> &mut Self {
        let canonical = canonical_name(name);
        self.entries.retain(|(n, _)| *n != canonical);
        self
    }

    /// All values of a header; `Some(&[])` for a declared-but-empty header.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        let canonical = canonical_name(name);
        self.entries
            .iter()
            .find(|(n, _)| *n == canonical)
            .map(|(_, v)| v.as_slice())
    }

    /// First value of a header.
    pub fn get_single(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// True when the header is absent or declared without any non-empty value.
    pub fn is_blank(&self, name: &str) -> bool {
        self.get(name)
            .map_or(true, |values| values.iter().all(|v| v.is_empty()))
    }

    /// Feed one raw `Name: value` line. Lines without a colon are ignored and
    /// reported as `false`.
    pub fn add_line(&mut self, line: &str) -> bool {
        match line.split_once(':') {
            Some((name, value)) => {
                self.add(name, value.trim());
                true
            }
            None => false,
        }
    }

    /// Parse a CRLF (or LF) separated block of header lines.
    pub fn parse(block: &str) -> Self {
        let mut store = Self::new();
        for line in block.lines() {
            store.add_line(line);
        }
        store
    }

    /// `Name: value` lines, each terminated by CRLF, skipping valueless entries.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (name, value) in self.iter() {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out
    }

    /// Iterate `(name, value)` pairs in insertion order, one pair per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(name, values)| {
            values
                .iter()
                .map(move |value| (name.as_str(), value.as_str()))
        })
    }

    /// Declared header names in insertion order, including empty ones.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Number of declared names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert into a standard `http::HeaderMap`, dropping valueless entries.
    pub fn to_header_map(&self) -> Result<HeaderMap, NetError> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in self.iter() {
            let header_name = HeaderName::from_str(name).map_err(|_| NetError::InvalidHeader {
                name: name.to_string(),
            })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| NetError::InvalidHeader {
                    name: name.to_string(),
                })?;
            map.append(header_name, header_value);
        }
        Ok(map)
    }
}
