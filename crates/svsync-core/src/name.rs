//! Hierarchical names.
//!
//! A [`Name`] is an ordered list of opaque byte components. Node
//! identities, sync group prefixes and data names are all names.

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::tlv::{self, types, Element};

/// Identity of a sync participant.
pub type NodeId = Name;

/// Per-node sequence number.
pub type SeqNo = u64;

/// A single name component.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Component(Bytes);

impl Component {
    /// Create a component from raw bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Create a component holding a non-negative integer.
    pub fn from_number(n: u64) -> Self {
        let mut buf = Vec::with_capacity(8);
        tlv::encode_non_negative_integer(&mut buf, n);
        Self(buf.into())
    }

    /// The component value.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Interpret the value as a non-negative integer.
    pub fn to_number(&self) -> Result<u64> {
        tlv::decode_non_negative_integer(&self.0)
    }

    fn write_uri(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.0.iter() {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "%{:02X}", b)?;
            }
        }
        Ok(())
    }
}

// Canonical order: shorter components first, then bytewise.
impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.as_ref().cmp(other.0.as_ref()))
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_uri(f)
    }
}

impl From<&str> for Component {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<&[u8]> for Component {
    fn from(b: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(b))
    }
}

impl From<Vec<u8>> for Component {
    fn from(b: Vec<u8>) -> Self {
        Self(b.into())
    }
}

/// A hierarchical name.
///
/// Names order component by component, and a name sorts before every
/// name it is a proper prefix of.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    components: Vec<Component>,
}

impl Name {
    /// The empty name (`/`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a name from components.
    pub fn from_components(components: Vec<Component>) -> Self {
        Self { components }
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True for the empty name.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// All components in order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Component at `index`; negative indexes count from the end.
    pub fn get(&self, index: isize) -> Option<&Component> {
        let idx = if index < 0 {
            self.components.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.components.get(idx)
    }

    /// Append a component, returning the extended name.
    pub fn append(mut self, component: impl Into<Component>) -> Self {
        self.components.push(component.into());
        self
    }

    /// Append a non-negative integer component.
    pub fn append_number(self, n: u64) -> Self {
        self.append(Component::from_number(n))
    }

    /// Append every component of `other`.
    pub fn join(mut self, other: &Name) -> Self {
        self.components.extend(other.components.iter().cloned());
        self
    }

    /// The first `n` components (all of them if `n` exceeds the length).
    pub fn prefix(&self, n: usize) -> Name {
        Name {
            components: self.components.iter().take(n).cloned().collect(),
        }
    }

    /// True when every component of `self` leads `other`.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.components.len() <= other.components.len()
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a == b)
    }

    /// Size of the wire encoding in bytes.
    pub fn wire_len(&self) -> usize {
        tlv::tlv_len(types::NAME, self.value_len())
    }

    fn value_len(&self) -> usize {
        self.components
            .iter()
            .map(|c| tlv::tlv_len(types::GENERIC_NAME_COMPONENT, c.0.len()))
            .sum()
    }

    /// Append the wire encoding to `buf`.
    pub fn encode_to(&self, buf: &mut Vec<u8>) {
        tlv::encode_header(buf, types::NAME, self.value_len());
        for component in &self.components {
            tlv::encode_tlv(buf, types::GENERIC_NAME_COMPONENT, &component.0);
        }
    }

    /// Wire encoding as a standalone buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_len());
        self.encode_to(&mut buf);
        buf
    }

    /// Decode from a parsed Name element.
    pub fn from_element(element: &Element<'_>) -> Result<Self> {
        element.expect_type(types::NAME)?;
        let mut components = Vec::new();
        for child in element.children() {
            let child = child?;
            child.expect_type(types::GENERIC_NAME_COMPONENT)?;
            components.push(Component(Bytes::copy_from_slice(child.value)));
        }
        Ok(Self { components })
    }

    /// Decode a standalone wire encoding.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let element = tlv::decode_single(bytes, types::NAME, "name")?;
        Self::from_element(&element)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for component in &self.components {
            write!(f, "/")?;
            component.write_uri(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self)
    }
}

impl FromStr for Name {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| CoreError::InvalidName(format!("must start with '/': {s}")))?;

        let mut components = Vec::new();
        for part in rest.split('/').filter(|p| !p.is_empty()) {
            components.push(Component(percent_decode(part)?.into()));
        }
        Ok(Self { components })
    }
}

fn percent_decode(part: &str) -> Result<Vec<u8>> {
    let bytes = part.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .ok_or_else(|| CoreError::InvalidName(format!("bad escape in {part}")))?;
            let decoded = hex::decode(hex)
                .map_err(|_| CoreError::InvalidName(format!("bad escape in {part}")))?;
            out.extend_from_slice(&decoded);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
