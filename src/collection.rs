//! Order-preserving keyed storage for character lists.
//!
//! Character documents store skills, spells and attacks as objects whose
//! keys are zero-padded indices (`"00000"`, `"00001"`, ...). This module
//! keeps the entries in an integer-keyed map so iteration order always
//! follows the numeric index, and produces the padded string keys only at
//! the API and serialization boundary.

use crate::error::OtfError;
use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// Width of a generated key. Indices of 100,000 and above get wider keys.
pub const KEY_WIDTH: usize = 5;

/// Path segment that steps into an entry's nested collection.
pub const CHILDREN_SEGMENT: &str = "contains";

/// Generate the persisted key for an index.
///
/// # Examples
///
/// ```rust
/// use otf_engine::collection::genkey;
///
/// assert_eq!(genkey(12), "00012");
/// assert_eq!(genkey(123456), "123456");
/// ```
pub fn genkey(index: usize) -> String {
    format!("{:0width$}", index, width = KEY_WIDTH)
}

/// Parse a persisted key back into its index.
pub fn parse_key(key: &str) -> Result<usize, OtfError> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OtfError::InvalidKey(key.to_string()));
    }
    key.parse::<usize>()
        .map_err(|_| OtfError::InvalidKey(key.to_string()))
}

/// Entries that may hold a nested collection of the same type.
pub trait Nested: Sized {
    /// The nested entries, if this entry has any.
    fn children(&self) -> Option<&OrderedCollection<Self>>;
}

/// A contiguous, order-preserving collection addressed by padded keys.
///
/// Indices always run from `0` to `len() - 1` with no gaps.
///
/// # Examples
///
/// ```rust
/// use otf_engine::OrderedCollection;
///
/// let mut skills = OrderedCollection::new();
/// let first = skills.append("Acrobatics");
/// skills.append("Stealth");
/// skills.insert_before(&first, "Climbing").unwrap();
///
/// let names: Vec<_> = skills.values().copied().collect();
/// assert_eq!(names, vec!["Climbing", "Acrobatics", "Stealth"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedCollection<T> {
    entries: BTreeMap<usize, T>,
}

impl<T> Default for OrderedCollection<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> OrderedCollection<T> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a value under the lowest unused key and return that key.
    pub fn append(&mut self, value: T) -> String {
        let index = self.entries.len();
        self.entries.insert(index, value);
        genkey(index)
    }

    /// Insert a value at `key`, shifting that entry and every later one up by one.
    ///
    /// `key` may name the slot one past the end, which appends.
    pub fn insert_before(&mut self, key: &str, value: T) -> Result<(), OtfError> {
        let index = parse_key(key)?;
        if index > self.entries.len() {
            return Err(OtfError::KeyOutOfRange {
                key: key.to_string(),
                len: self.entries.len(),
            });
        }
        let tail = self.entries.split_off(&index);
        self.entries.insert(index, value);
        self.entries
            .extend(tail.into_iter().map(|(i, v)| (i + 1, v)));
        Ok(())
    }

    /// Remove the value at `key`, shifting every later entry down by one.
    pub fn remove(&mut self, key: &str) -> Result<T, OtfError> {
        let index = parse_key(key)?;
        let removed = self
            .entries
            .remove(&index)
            .ok_or_else(|| OtfError::KeyOutOfRange {
                key: key.to_string(),
                len: self.entries.len(),
            })?;
        let tail = self.entries.split_off(&index);
        self.entries
            .extend(tail.into_iter().map(|(i, v)| (i - 1, v)));
        Ok(removed)
    }

    /// Look up a value by its persisted key.
    pub fn get(&self, key: &str) -> Option<&T> {
        parse_key(key).ok().and_then(|i| self.entries.get(&i))
    }

    /// Look up a value mutably by its persisted key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        parse_key(key).ok().and_then(|i| self.entries.get_mut(&i))
    }

    /// Iterate `(key, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (String, &T)> {
        self.entries.iter().map(|(i, v)| (genkey(*i), v))
    }

    /// Iterate values in index order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    /// Keys in index order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().map(|i| genkey(*i)).collect()
    }
}

impl<T: Nested> OrderedCollection<T> {
    /// Resolve a dotted path such as `"00001.contains.00000"`.
    pub fn decode(&self, path: &str) -> Option<&T> {
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        while let Some(segment) = segments.next() {
            if segment != CHILDREN_SEGMENT {
                return None;
            }
            current = current.children()?.get(segments.next()?)?;
        }
        Some(current)
    }

    /// Visit every entry depth-first, parents before their children.
    pub fn walk<'a, F>(&'a self, visit: &mut F)
    where
        F: FnMut(&'a T),
    {
        for value in self.entries.values() {
            visit(value);
            if let Some(children) = value.children() {
                children.walk(visit);
            }
        }
    }
}

impl<T> FromIterator<T> for OrderedCollection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().enumerate().collect(),
        }
    }
}

impl<T: Serialize> Serialize for OrderedCollection<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (index, value) in &self.entries {
            map.serialize_entry(&genkey(*index), value)?;
        }
        map.end()
    }
}

struct CollectionVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for CollectionVisitor<T> {
    type Value = OrderedCollection<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object keyed by zero-padded indices")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<String, T>()? {
            let index = parse_key(&key).map_err(de::Error::custom)?;
            if entries.insert(index, value).is_some() {
                return Err(de::Error::custom(format!("duplicate key {}", key)));
            }
        }
        if let Some((&last, _)) = entries.last_key_value() {
            if last + 1 != entries.len() {
                return Err(de::Error::custom("collection keys are not contiguous"));
            }
        }
        Ok(OrderedCollection { entries })
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OrderedCollection<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(CollectionVisitor(PhantomData))
    }
}
