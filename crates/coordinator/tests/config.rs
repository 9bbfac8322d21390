mod common;

use common::{CLUSTER_LIST, INIT, Member};
use microcloud_command_mock::MockReply;
use microcloud_coordinator::{CharmConfig, Error, Trigger, UnitStatus};
use microcloud_peer_store_memory::MemoryPeerStore;
use pretty_assertions::assert_eq;

async fn member(config: CharmConfig, snapshot: Option<CharmConfig>) -> Member {
    let store = MemoryPeerStore::new();
    let mut member = Member::with_config(&store, "node-1", true, 1, config, snapshot).await;
    member.handle(Trigger::RelationCreated).await;
    member
}

fn edge_lxd() -> CharmConfig {
    CharmConfig {
        snap_channel_lxd: "5.21/edge".to_string(),
        ..CharmConfig::default()
    }
}

#[tokio::test]
async fn test_first_config_becomes_baseline() {
    let mut member = member(edge_lxd(), None).await;

    let outcome = member.handle(Trigger::ConfigChanged).await;

    assert!(outcome.status.is_none());
    assert!(member.runner.invocations().is_empty());
    assert_eq!(member.coordinator.snapshot(), Some(&edge_lxd()));
}

#[tokio::test]
async fn test_changed_channel_refreshes_snap() {
    let mut member = member(edge_lxd(), Some(CharmConfig::default())).await;

    let outcome = member.handle(Trigger::ConfigChanged).await;

    assert!(!outcome.deferred);
    assert_eq!(
        member.runner.invocations(),
        vec!["snap refresh lxd --channel=5.21/edge".to_string()]
    );
    assert_eq!(member.coordinator.snapshot(), Some(&edge_lxd()));

    member.handle(Trigger::ConfigChanged).await;
    assert_eq!(member.runner.invocations().len(), 1);
}

#[tokio::test]
async fn test_disabled_subsystem_channel_is_not_refreshed() {
    let config = CharmConfig {
        snap_channel_microceph: "reef/stable".to_string(),
        ..CharmConfig::default()
    };
    let mut member = member(config.clone(), Some(CharmConfig::default())).await;

    member.handle(Trigger::ConfigChanged).await;

    assert!(member.runner.invocations().is_empty());
    assert_eq!(member.coordinator.snapshot(), Some(&config));
}

#[tokio::test]
async fn test_toggles_are_frozen_after_clustering() {
    let enabled = CharmConfig {
        microovn: true,
        ..CharmConfig::default()
    };
    let mut member = member(enabled, Some(CharmConfig::default())).await;
    member.mark_healthy();
    member.handle(Trigger::UpdateStatus).await;

    let outcome = member.handle(Trigger::ConfigChanged).await;

    assert!(outcome.status.is_none());
    assert_eq!(member.coordinator.snapshot(), Some(&CharmConfig::default()));
    assert_eq!(member.runner.count("snap refresh microovn --channel=24.03/stable"), 0);
}

#[tokio::test]
async fn test_toggles_follow_config_before_clustering() {
    let enabled = CharmConfig {
        microceph: true,
        ..CharmConfig::default()
    };
    let mut member = member(enabled.clone(), Some(CharmConfig::default())).await;

    member.handle(Trigger::ConfigChanged).await;

    assert_eq!(member.coordinator.snapshot(), Some(&enabled));
}

#[tokio::test]
async fn test_refresh_failure_blocks_and_defers() {
    let mut member = member(edge_lxd(), Some(CharmConfig::default())).await;
    member.runner.on(
        "snap refresh lxd --channel=5.21/edge",
        MockReply::failure(1, "channel not found"),
    );

    let outcome = member.handle(Trigger::ConfigChanged).await;

    assert!(outcome.deferred);
    assert_eq!(
        outcome.status,
        Some(UnitStatus::Blocked(
            "Failed to apply some configuration change(s): snap-channel-lxd".to_string()
        ))
    );
    assert_eq!(member.coordinator.snapshot(), Some(&CharmConfig::default()));
}

#[tokio::test]
async fn test_invalid_config_blocks_without_deferring() {
    let config = CharmConfig {
        snap_channel_lxd: String::new(),
        ..CharmConfig::default()
    };
    let mut member = member(config, Some(CharmConfig::default())).await;

    let outcome = member.handle(Trigger::ConfigChanged).await;

    assert!(!outcome.deferred);
    assert!(matches!(outcome.condition, Some(Error::InvalidConfig(_))));
    assert!(member.runner.invocations().is_empty());
}

#[tokio::test]
async fn test_start_applies_pending_changes_first() {
    let mut member = member(edge_lxd(), Some(CharmConfig::default())).await;

    member.handle(Trigger::Start).await;

    assert_eq!(
        member.runner.invocations(),
        vec![
            "snap refresh lxd --channel=5.21/edge".to_string(),
            CLUSTER_LIST.to_string(),
            INIT.to_string(),
        ]
    );
}

#[tokio::test]
async fn test_start_stops_when_pending_changes_fail() {
    let mut member = member(edge_lxd(), Some(CharmConfig::default())).await;
    member.runner.on(
        "snap refresh lxd --channel=5.21/edge",
        MockReply::failure(1, "channel not found"),
    );

    let outcome = member.handle(Trigger::Start).await;

    assert!(outcome.deferred);
    assert_eq!(member.runner.count(INIT), 0);
}

#[tokio::test]
async fn test_invalid_config_on_start_is_retried_once_corrected() {
    let invalid = CharmConfig {
        snap_channel_lxd: String::new(),
        ..CharmConfig::default()
    };
    let mut member = member(invalid, Some(CharmConfig::default())).await;

    let outcome = member.handle(Trigger::Start).await;

    assert!(outcome.deferred);
    assert!(matches!(outcome.condition, Some(Error::InvalidConfig(_))));
    assert!(matches!(outcome.status, Some(UnitStatus::Blocked(_))));
    assert_eq!(member.runner.count(INIT), 0);

    member.reconfigure(CharmConfig::default());
    let outcome = member.handle(Trigger::Start).await;

    assert!(!outcome.deferred);
    assert_eq!(member.runner.count(INIT), 1);
    assert_eq!(
        outcome.status,
        Some(UnitStatus::Active(
            "MicroCloud successfully initialized".to_string()
        ))
    );
}
