// src/parse/types.rs

use indexmap::IndexMap;
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serialize, Serializer,
};
use std::fmt;

pub const BITS: &str = "bits";
pub const BYTES: &str = "bytes";
pub const NAME: &str = "name";
pub const CHILDREN: &str = "children";

/// Which positional column a table is laid out by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Bits,
    Bytes,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Bits => BITS,
            Dimension::Bytes => BYTES,
        }
    }

    pub fn from_heading(heading: &str) -> Option<Self> {
        match heading {
            BITS => Some(Dimension::Bits),
            BYTES => Some(Dimension::Bytes),
            _ => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inclusive position range, always stored high-to-low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitRange {
    pub hi: u32,
    pub lo: u32,
}

impl BitRange {
    /// Builds a range from two endpoints in either order.
    pub fn new(a: u32, b: u32) -> Self {
        BitRange {
            hi: a.max(b),
            lo: a.min(b),
        }
    }

    pub fn single(n: u32) -> Self {
        BitRange { hi: n, lo: n }
    }

    pub fn is_single(&self) -> bool {
        self.hi == self.lo
    }

    /// Saturates at `u32::MAX` for a range spanning every position.
    pub fn width(&self) -> u32 {
        (self.hi - self.lo).saturating_add(1)
    }
}

impl Serialize for BitRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.is_single() { 1 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.hi)?;
        if !self.is_single() {
            seq.serialize_element(&self.lo)?;
        }
        seq.end()
    }
}

/// Value of a `bits`/`bytes` cell.
///
/// Parsed cells start out as a `Range`; consolidation collapses them into a
/// `Width`. Cells that could not be read as integers are kept as their
/// colon-separated pieces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Extent {
    Width(u32),
    Range(BitRange),
    Malformed(Vec<String>),
}

impl Extent {
    pub fn range(&self) -> Option<BitRange> {
        match self {
            Extent::Range(r) => Some(*r),
            _ => None,
        }
    }

    pub fn width(&self) -> Option<u32> {
        match self {
            Extent::Width(w) => Some(*w),
            _ => None,
        }
    }

    /// Mirrors truthiness of the extracted value: zero and empty are falsy.
    pub fn is_falsy(&self) -> bool {
        match self {
            Extent::Width(w) => *w == 0,
            Extent::Range(_) => false,
            Extent::Malformed(parts) => parts.is_empty(),
        }
    }
}

/// One row of a register table.
///
/// `bits`, `bytes`, `name` and `children` are the fields the pipeline
/// reasons about; every other column lands in `extra`, keyed by heading.
/// Keys are listed and serialized in the order they were first set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldRecord {
    pub bits: Option<Extent>,
    pub bytes: Option<Extent>,
    pub name: Option<String>,
    pub extra: IndexMap<String, String>,
    pub children: Option<Vec<FieldRecord>>,
    order: Vec<String>,
}

impl FieldRecord {
    /// A fresh parser record: no fields yet, an empty child list.
    pub fn new() -> Self {
        let mut record = FieldRecord {
            children: Some(Vec::new()),
            ..Default::default()
        };
        record.touch(CHILDREN);
        record
    }

    fn touch(&mut self, key: &str) {
        if !self.order.iter().any(|k| k == key) {
            self.order.push(key.to_string());
        }
    }

    pub fn extent(&self, dim: Dimension) -> Option<&Extent> {
        match dim {
            Dimension::Bits => self.bits.as_ref(),
            Dimension::Bytes => self.bytes.as_ref(),
        }
    }

    pub fn extent_mut(&mut self, dim: Dimension) -> &mut Option<Extent> {
        match dim {
            Dimension::Bits => &mut self.bits,
            Dimension::Bytes => &mut self.bytes,
        }
    }

    pub fn set_extent(&mut self, dim: Dimension, extent: Extent) {
        self.touch(dim.as_str());
        *self.extent_mut(dim) = Some(extent);
    }

    pub fn with_extent(mut self, dim: Dimension, extent: Extent) -> Self {
        self.set_extent(dim, extent);
        self
    }

    /// Text stored under `heading`; `name` is looked up in its own slot.
    pub fn text(&self, heading: &str) -> Option<&str> {
        if heading == NAME {
            self.name.as_deref()
        } else {
            self.extra.get(heading).map(String::as_str)
        }
    }

    pub fn set_text(&mut self, heading: &str, value: impl Into<String>) {
        self.touch(heading);
        if heading == NAME {
            self.name = Some(value.into());
        } else {
            self.extra.insert(heading.to_string(), value.into());
        }
    }

    pub fn with_text(mut self, heading: &str, value: impl Into<String>) -> Self {
        self.set_text(heading, value);
        self
    }

    pub fn contains(&self, heading: &str) -> bool {
        match heading {
            BITS => self.bits.is_some(),
            BYTES => self.bytes.is_some(),
            NAME => self.name.is_some(),
            CHILDREN => self.children.is_some(),
            other => self.extra.contains_key(other),
        }
    }

    /// Moves an open column to a new key, keeping its position.
    pub fn rename_text(&mut self, from: &str, to: &str) {
        if let Some(idx) = self.extra.get_index_of(from) {
            if let Some((_, value)) = self.extra.shift_remove_index(idx) {
                let (new_idx, _) = self.extra.insert_full(to.to_string(), value);
                self.extra.move_index(new_idx, idx);
            }
            match self.order.iter_mut().find(|k| k.as_str() == from) {
                Some(key) => *key = to.to_string(),
                None => self.touch(to),
            }
        }
    }

    pub fn is_reserved(&self) -> bool {
        self.text("description") == Some("Reserved")
    }

    /// Keys present on this record in the order they were set. Fields
    /// assigned directly rather than through the setters come last.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .order
            .iter()
            .filter(|k| self.contains(k))
            .cloned()
            .collect();
        let known = [CHILDREN, BITS, BYTES, NAME]
            .into_iter()
            .filter(|k| self.contains(k))
            .map(str::to_string);
        for key in known.chain(self.extra.keys().cloned()) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

impl Serialize for FieldRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let keys = self.keys();
        let mut map = serializer.serialize_map(Some(keys.len()))?;
        for key in &keys {
            match key.as_str() {
                BITS => map.serialize_entry(key, &self.bits)?,
                BYTES => map.serialize_entry(key, &self.bytes)?,
                NAME => map.serialize_entry(key, &self.name)?,
                CHILDREN => map.serialize_entry(key, &self.children)?,
                other => map.serialize_entry(key, &self.extra.get(other))?,
            }
        }
        map.end()
    }
}
