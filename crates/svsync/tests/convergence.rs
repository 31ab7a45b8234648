//! Multi-node behaviour over the in-memory network.

use std::time::Duration;

use svsync::core::NackReason;
use svsync::{
    FetchError, Keypair, MemoryNetwork, SecurityOptions, SvSyncConfig, SvSyncError,
    SyncInterestMode, TrustAnchors, VersionVector,
};
use svsync_testkit::fixtures::{fast_config, signed_config, SyncGroup};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn seeded(seed: u64) -> impl Fn(usize) -> SvSyncConfig {
    move |i| {
        let mut config = fast_config(i);
        config.sync.rng_seed = Some(seed + i as u64);
        config
    }
}

/// Member `i` publishes `i + 1` items.
async fn publish_all(group: &SyncGroup) -> VersionVector {
    let mut expected = VersionVector::new();
    for (i, member) in group.members().iter().enumerate() {
        for k in 0..=i {
            let seq = member
                .publish_data(format!("{i}:{k}").into_bytes())
                .await
                .unwrap();
            assert_eq!(seq, k as u64 + 1);
        }
        expected.set(SyncGroup::node_id(i), i as u64 + 1);
    }
    expected
}

fn assert_converged(group: &SyncGroup, expected: &VersionVector) {
    for member in group.members() {
        assert_eq!(
            &member.core().state(),
            expected,
            "{} has {}",
            member.node_id(),
            member.core().state_string()
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_group_converges_and_fetches() {
    init_tracing();
    let group = SyncGroup::new(4, seeded(1)).await;

    tokio::time::sleep(Duration::from_secs(2)).await;
    let expected = publish_all(&group).await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_converged(&group, &expected);

    // Every range a member learned about can be fetched from its producer.
    for (i, member) in group.members().iter().enumerate() {
        for info in group.updates(i) {
            assert_ne!(&info.node_id, member.node_id());
            let results = member.fetch_missing(&info, 1).await;
            for (seq, result) in info.seq_nos().zip(results) {
                let data = result.unwrap();
                assert_eq!(data.name, member.data_name(&info.node_id, seq));
            }
        }
    }

    let data = group
        .member(0)
        .fetch_data(&SyncGroup::node_id(3), 4, 1)
        .await
        .unwrap();
    assert_eq!(&data.content[..], b"3:3");
}

#[tokio::test(start_paused = true)]
async fn test_learned_ranges_cover_every_publication() {
    let group = SyncGroup::new(3, seeded(10)).await;

    tokio::time::sleep(Duration::from_secs(2)).await;
    let expected = publish_all(&group).await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    for (i, member) in group.members().iter().enumerate() {
        let mut learned = VersionVector::new();
        for info in group.updates(i) {
            assert!(info.low >= 1 && info.low <= info.high);
            learned.set(info.node_id.clone(), info.high.max(learned.get(&info.node_id)));
        }
        for (node, seq) in expected.iter() {
            if node != member.node_id() {
                assert_eq!(learned.get(node), seq);
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_lossy_network_converges_through_retransmission() {
    init_tracing();
    let group = SyncGroup::on_network(MemoryNetwork::with_loss(0.3, 42), 5, seeded(100))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    let expected = publish_all(&group).await;
    tokio::time::sleep(Duration::from_secs(300)).await;

    assert_converged(&group, &expected);
}

#[tokio::test(start_paused = true)]
async fn test_subset_modes_converge() {
    let base = seeded(200);
    let group = SyncGroup::new(6, |i| {
        let mut config = base(i);
        config.sync.interest_mode = if i % 2 == 0 {
            SyncInterestMode::RecentRandom {
                recent: 1,
                random: 2,
            }
        } else {
            SyncInterestMode::Bucket {
                bucket_size: 2,
                recent: 1,
                globally_ordered: true,
            }
        };
        config
    })
    .await;

    tokio::time::sleep(Duration::from_secs(2)).await;
    let expected = publish_all(&group).await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_converged(&group, &expected);
    assert!(group.converged());
}

#[tokio::test(start_paused = true)]
async fn test_signed_group_validates_data() {
    let group = SyncGroup::new(2, signed_config).await;

    tokio::time::sleep(Duration::from_secs(2)).await;
    group.member(0).publish_data(&b"signed"[..]).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(group.member(1).core().seq_no_of(&SyncGroup::node_id(0)), 1);
    let data = group
        .member(1)
        .fetch_data(&SyncGroup::node_id(0), 1, 0)
        .await
        .unwrap();
    assert!(data.signature.is_some());
    assert_eq!(&data.content[..], b"signed");
}

#[tokio::test(start_paused = true)]
async fn test_untrusted_data_fails_validation() {
    let trusted = Keypair::from_seed(&[7u8; 32]);
    let rogue = Keypair::from_seed(&[8u8; 32]);

    let mut honest = fast_config(0);
    honest.sync.security = SecurityOptions::with_keypair(
        Keypair::from_seed(&[7u8; 32]),
        TrustAnchors::new([trusted.public_key()]),
    );
    let mut forger = fast_config(1);
    forger.sync.security = SecurityOptions::with_keypair(
        Keypair::from_seed(&[8u8; 32]),
        TrustAnchors::new([rogue.public_key(), trusted.public_key()]),
    );

    let mut group = SyncGroup::on_network(MemoryNetwork::new(), 0, fast_config)
        .await
        .unwrap();
    let reader = group.join(honest).await.unwrap();
    let writer = group.join(forger).await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    group.member(writer).publish_data(&b"forged"[..]).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    // The forger's sync interests are dropped as unverified.
    let writer_id = SyncGroup::node_id(writer);
    assert_eq!(group.member(reader).core().seq_no_of(&writer_id), 0);

    let result = group.member(reader).fetch_data(&writer_id, 1, 0).await;
    assert!(matches!(
        result,
        Err(SvSyncError::Fetch(FetchError::ValidationFailed(_)))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failures_are_reported() {
    let group = SyncGroup::new(2, seeded(400)).await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    let ghost = "/ghost".parse().unwrap();
    let nobody = group.member(0).fetch_data(&ghost, 1, 3).await;
    assert!(matches!(
        nobody,
        Err(SvSyncError::Fetch(FetchError::Nack(NackReason::NoRoute)))
    ));

    let unpublished = group
        .member(0)
        .fetch_data(&SyncGroup::node_id(1), 9, 1)
        .await;
    assert!(matches!(
        unpublished,
        Err(SvSyncError::Fetch(FetchError::Timeout { attempts: 2 }))
    ));
}
