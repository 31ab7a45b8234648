//! Version vectors: the summary exchanged by sync participants.
//!
//! A [`VersionVector`] maps each known node to the highest sequence number
//! seen from it. It also remembers which entries were written most
//! recently, which subset selection uses to bias advertisements toward
//! fresh state.
//!
//! ## Wire format
//!
//! ```text
//! StateVector(201) {
//!     StateVectorEntry(202) { Name(7) { ... }, SeqNo(204) <nonneg int> }
//!     ...
//! }
//! ```
//!
//! Entries are written in descending canonical [`NodeId`] order, so the
//! same mapping always encodes to the same bytes. Decoders accept any
//! entry order.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::name::{Name, NodeId, SeqNo};
use crate::tlv::{self, types};

#[derive(Debug, Clone, Copy)]
struct Slot {
    seq: SeqNo,
    touched: u64,
}

/// Mapping from node identity to highest known sequence number.
#[derive(Clone, Default)]
pub struct VersionVector {
    entries: BTreeMap<NodeId, Slot>,
    clock: u64,
}

impl VersionVector {
    /// Create an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the entry for `node` and mark it most recently updated.
    pub fn set(&mut self, node: NodeId, seq: SeqNo) {
        self.clock += 1;
        let touched = self.clock;
        self.entries.insert(node, Slot { seq, touched });
    }

    /// Sequence number for `node`; 0 when never seen.
    pub fn get(&self, node: &NodeId) -> SeqNo {
        self.entries.get(node).map_or(0, |slot| slot.seq)
    }

    /// True when `node` has an entry.
    pub fn contains(&self, node: &NodeId) -> bool {
        self.entries.contains_key(node)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the vector has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending node order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&NodeId, SeqNo)> + '_ {
        self.entries.iter().map(|(node, slot)| (node, slot.seq))
    }

    /// Node identities in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.entries.keys()
    }

    /// Node identities, most recently updated first.
    ///
    /// Returns a fresh snapshot on every call.
    pub fn recency_order(&self) -> Vec<NodeId> {
        let mut order: Vec<(&NodeId, u64)> = self
            .entries
            .iter()
            .map(|(node, slot)| (node, slot.touched))
            .collect();
        order.sort_by(|a, b| b.1.cmp(&a.1));
        order.into_iter().map(|(node, _)| node.clone()).collect()
    }

    /// Raise entries to the per-key maximum with `other`.
    ///
    /// Absent entries read as 0, so an entry of `other` with sequence
    /// number 0 is never inserted. To rebuild a vector from its chunks,
    /// `set` every decoded entry instead.
    ///
    /// Returns true if any entry changed.
    pub fn merge_max(&mut self, other: &VersionVector) -> bool {
        let mut changed = false;
        for (node, seq) in other.iter() {
            if seq > self.get(node) {
                self.set(node.clone(), seq);
                changed = true;
            }
        }
        changed
    }

    /// True when some entry here exceeds the corresponding entry of `other`.
    pub fn is_newer_than(&self, other: &VersionVector) -> bool {
        self.iter().any(|(node, seq)| seq > other.get(node))
    }

    /// Encode every entry as one StateVector.
    pub fn encode(&self) -> Vec<u8> {
        let entries: Vec<(&NodeId, SeqNo)> = self.iter().rev().collect();
        encode_entries(&entries)
    }

    /// Split entries into standalone encodings of at most `max_entries` each.
    ///
    /// Chunks follow the same entry order as [`encode`](Self::encode).
    /// Decoding every chunk and merging the results reconstructs the mapping.
    pub fn encode_chunks(&self, max_entries: usize) -> Result<Vec<Vec<u8>>> {
        if max_entries == 0 {
            return Err(CoreError::ZeroChunkSize);
        }
        let entries: Vec<(&NodeId, SeqNo)> = self.iter().rev().collect();
        Ok(entries.chunks(max_entries).map(encode_entries).collect())
    }

    /// Size of [`encode`](Self::encode) output without building it.
    pub fn encoded_len(&self) -> usize {
        let value_len: usize = self.iter().map(|(n, s)| entry_wire_len(n, s)).sum();
        tlv::tlv_len(types::STATE_VECTOR, value_len)
    }

    /// Decode a StateVector.
    ///
    /// Either the whole input parses or an error is returned; nothing is
    /// partially applied.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let outer = tlv::decode_single(bytes, types::STATE_VECTOR, "state vector")?;
        let mut vv = VersionVector::new();

        for entry in outer.children() {
            let entry = entry?;
            entry.expect_type(types::STATE_VECTOR_ENTRY)?;

            let mut fields = entry.children();
            let name = fields
                .read_element()
                .and_then(|e| Name::from_element(&e))?;
            let seq_element = fields.expect(types::SEQ_NO)?;
            let seq = tlv::decode_non_negative_integer(seq_element.value)?;
            if !fields.is_empty() {
                return Err(CoreError::MalformedEntry(format!(
                    "unexpected fields after seq for {name}"
                )));
            }
            vv.set(name, seq);
        }

        Ok(vv)
    }
}

fn entry_wire_len(node: &NodeId, seq: SeqNo) -> usize {
    let value_len =
        node.wire_len() + tlv::tlv_len(types::SEQ_NO, tlv::non_negative_integer_len(seq));
    tlv::tlv_len(types::STATE_VECTOR_ENTRY, value_len)
}

fn encode_entries(entries: &[(&NodeId, SeqNo)]) -> Vec<u8> {
    let value_len: usize = entries.iter().map(|(n, s)| entry_wire_len(n, *s)).sum();
    let mut buf = Vec::with_capacity(tlv::tlv_len(types::STATE_VECTOR, value_len));

    tlv::encode_header(&mut buf, types::STATE_VECTOR, value_len);
    for (node, seq) in entries {
        let entry_len = node.wire_len()
            + tlv::tlv_len(types::SEQ_NO, tlv::non_negative_integer_len(*seq));
        tlv::encode_header(&mut buf, types::STATE_VECTOR_ENTRY, entry_len);
        node.encode_to(&mut buf);
        tlv::encode_non_negative_integer_tlv(&mut buf, types::SEQ_NO, *seq);
    }
    buf
}

// Equality compares the mappings; recency order is not part of identity.
impl PartialEq for VersionVector {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for VersionVector {}

impl FromIterator<(NodeId, SeqNo)> for VersionVector {
    fn from_iter<I: IntoIterator<Item = (NodeId, SeqNo)>>(iter: I) -> Self {
        let mut vv = VersionVector::new();
        for (node, seq) in iter {
            vv.set(node, seq);
        }
        vv
    }
}

impl fmt::Display for VersionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (node, seq) in self.iter() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{node}:{seq}")?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Debug for VersionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionVector[{self}]")
    }
}

impl Serialize for VersionVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (node, seq) in self.iter() {
            map.serialize_entry(&node.to_string(), &seq)?;
        }
        map.end()
    }
}
