//! Key-value option store
//!
//! The option collection passed through open calls. Behavior is controlled by
//! the `dict_flag` constants; the default lookup is case-insensitive.

use std::os::raw::c_int;

/// Behavior flags for [`Dictionary::set`] and [`Dictionary::get`]
pub mod dict_flag {
  use std::os::raw::c_int;

  /// Match keys exactly instead of case-insensitively
  pub const MATCH_CASE: c_int = 1;
  /// Match any stored key that begins with the lookup key
  pub const IGNORE_SUFFIX: c_int = 2;
  /// Keep an existing entry instead of overwriting it
  pub const DONT_OVERWRITE: c_int = 16;
  /// Concatenate onto the existing value instead of replacing it
  pub const APPEND: c_int = 32;
  /// Allow duplicate keys
  pub const MULTIKEY: c_int = 64;
}

/// Ordered key-value option collection
///
/// Owned and freed by the caller; the bridge only reads it during open.
#[derive(Debug, Default, Clone)]
pub struct Dictionary {
  entries: Vec<(String, String)>,
}

impl Dictionary {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of entries
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Store `value` under `key`
  ///
  /// Without flags an existing entry (matched case-insensitively) is
  /// overwritten; see [`dict_flag`] for the other behaviors.
  pub fn set(&mut self, key: &str, value: &str, flags: c_int) {
    if flags & dict_flag::MULTIKEY == 0 {
      if let Some(idx) = self.find(key, flags) {
        if flags & dict_flag::DONT_OVERWRITE != 0 {
          return;
        }
        if flags & dict_flag::APPEND != 0 {
          self.entries[idx].1.push_str(value);
        } else {
          self.entries[idx].1 = value.to_string();
        }
        return;
      }
    }
    self.entries.push((key.to_string(), value.to_string()));
  }

  /// Look up the first entry matching `key`
  pub fn get(&self, key: &str, flags: c_int) -> Option<&str> {
    self.find(key, flags).map(|idx| self.entries[idx].1.as_str())
  }

  /// Entries in insertion order
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  fn find(&self, key: &str, flags: c_int) -> Option<usize> {
    let match_case = flags & dict_flag::MATCH_CASE != 0;
    let ignore_suffix = flags & dict_flag::IGNORE_SUFFIX != 0;
    self
      .entries
      .iter()
      .position(|(stored, _)| key_matches(stored, key, match_case, ignore_suffix))
  }
}

fn key_matches(stored: &str, query: &str, match_case: bool, ignore_suffix: bool) -> bool {
  let (s, q) = (stored.as_bytes(), query.as_bytes());
  if ignore_suffix {
    s.len() >= q.len() && bytes_eq(&s[..q.len()], q, match_case)
  } else {
    s.len() == q.len() && bytes_eq(s, q, match_case)
  }
}

fn bytes_eq(a: &[u8], b: &[u8], match_case: bool) -> bool {
  if match_case {
    a == b
  } else {
    a.eq_ignore_ascii_case(b)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_set_get_overwrites_by_default() {
    let mut dict = Dictionary::new();
    dict.set("codec", "h264", 0);
    dict.set("codec", "av1", 0);
    assert_eq!(dict.len(), 1);
    assert_eq!(dict.get("codec", 0), Some("av1"));
  }

  #[test]
  fn test_lookup_is_case_insensitive_by_default() {
    let mut dict = Dictionary::new();
    dict.set("Timeout", "5", 0);
    assert_eq!(dict.get("timeout", 0), Some("5"));
    assert_eq!(dict.get("timeout", dict_flag::MATCH_CASE), None);
    assert_eq!(dict.get("Timeout", dict_flag::MATCH_CASE), Some("5"));
  }

  #[test]
  fn test_dont_overwrite_keeps_existing() {
    let mut dict = Dictionary::new();
    dict.set("mode", "fast", 0);
    dict.set("mode", "slow", dict_flag::DONT_OVERWRITE);
    assert_eq!(dict.get("mode", 0), Some("fast"));
  }

  #[test]
  fn test_append_concatenates() {
    let mut dict = Dictionary::new();
    dict.set("flags", "+a", 0);
    dict.set("flags", "+b", dict_flag::APPEND);
    assert_eq!(dict.get("flags", 0), Some("+a+b"));
  }

  #[test]
  fn test_multikey_allows_duplicates() {
    let mut dict = Dictionary::new();
    dict.set("map", "0:0", dict_flag::MULTIKEY);
    dict.set("map", "0:1", dict_flag::MULTIKEY);
    assert_eq!(dict.len(), 2);
    // Lookup still returns the first entry
    assert_eq!(dict.get("map", 0), Some("0:0"));
  }

  #[test]
  fn test_ignore_suffix_prefix_match() {
    let mut dict = Dictionary::new();
    dict.set("timeout_ms", "100", 0);
    assert_eq!(dict.get("timeout", 0), None);
    assert_eq!(dict.get("timeout", dict_flag::IGNORE_SUFFIX), Some("100"));
  }

  #[test]
  fn test_iteration_preserves_insertion_order() {
    let mut dict = Dictionary::new();
    dict.set("b", "2", 0);
    dict.set("a", "1", 0);
    let keys: Vec<_> = dict.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, ["b", "a"]);
  }
}
