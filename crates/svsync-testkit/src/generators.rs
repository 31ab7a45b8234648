//! Proptest generators for property-based testing.

use proptest::prelude::*;

use svsync_core::{Component, Keypair, Name, NodeId, SeqNo, VersionVector};
use svsync_sync::SyncInterestMode;

/// Generate a non-empty name component of arbitrary bytes.
pub fn component() -> impl Strategy<Value = Component> {
    prop::collection::vec(any::<u8>(), 1..12).prop_map(Component::from)
}

/// Generate a name with up to `max_len` components.
pub fn name(max_len: usize) -> impl Strategy<Value = Name> {
    prop::collection::vec(component(), 0..=max_len).prop_map(Name::from_components)
}

/// Generate a printable node identity such as `/node/ab12`.
pub fn node_id() -> impl Strategy<Value = NodeId> {
    "[a-z0-9]{1,8}".prop_map(|id| Name::new().append("node").append(id.as_str()))
}

/// Generate a sequence number of any width.
pub fn seq() -> impl Strategy<Value = SeqNo> {
    prop_oneof![
        0u64..=0xFF,
        0x100u64..=0xFFFF,
        0x1_0000u64..=0xFFFF_FFFF,
        any::<u64>(),
    ]
}

/// Generate a version vector with at most `max_entries` entries.
pub fn version_vector(max_entries: usize) -> impl Strategy<Value = VersionVector> {
    prop::collection::vec((name(4), seq()), 0..=max_entries)
        .prop_map(|entries| entries.into_iter().collect())
}

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a valid interest mode.
pub fn interest_mode() -> impl Strategy<Value = SyncInterestMode> {
    prop_oneof![
        Just(SyncInterestMode::Full),
        (1usize..20).prop_map(|max_entries| SyncInterestMode::Fragmented { max_entries }),
        (0usize..4, 0usize..4)
            .prop_map(|(recent, random)| SyncInterestMode::RecentRandom { recent, random }),
        (1usize..4, 0usize..4, any::<bool>()).prop_map(|(bucket_size, recent, globally_ordered)| {
            SyncInterestMode::Bucket {
                bucket_size,
                recent,
                globally_ordered,
            }
        }),
    ]
}
