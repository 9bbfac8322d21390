//! Common setup for the coordinator scenario tests: a group of members sharing
//! one in-memory peer bag, each with its own scripted tools.
#![allow(dead_code)]

use std::sync::Once;

use microcloud_command_mock::{MockCommandRunner, MockReply};
use microcloud_coordinator::{
    CLUSTERED_KEY, CharmConfig, ClusteredFlag, ConfigSnapshot, Coordinator, CoordinatorOptions,
    LxdInventory, MemoryStatusSink, Outcome, StaticLeadership, Tools, Trigger, UnitStatus,
};
use microcloud_peer_store::{MemberId, PeerBag};
use microcloud_peer_store_memory::MemoryPeerStore;

pub const CLUSTER_LIST: &str = "lxc cluster list";
pub const CLUSTER_MEMBERS: &str = "lxc cluster list --format csv";
pub const INIT: &str = "microcloud init --auto";
pub const ADD: &str = "microcloud add --auto";
pub const ENABLE_RGW: &str = "microceph enable rgw";
pub const LIST_INSTANCES: &str = "lxc list --all-projects --format=json";

static INIT_LOGGING: Once = Once::new();

/// Installs a test-writer subscriber once per test binary.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

pub type TestCoordinator = Coordinator<
    MemoryPeerStore,
    MockCommandRunner,
    StaticLeadership,
    LxdInventory<MockCommandRunner>,
    MemoryStatusSink,
>;

/// One simulated member.
pub struct Member {
    pub id: MemberId,
    pub coordinator: TestCoordinator,
    pub runner: MockCommandRunner,
    pub status: MemoryStatusSink,
    leadership: StaticLeadership,
    store: MemoryPeerStore,
}

impl Member {
    /// A member with the default configuration and no applied snapshot.
    pub async fn new(
        store: &MemoryPeerStore,
        id: &str,
        is_leader: bool,
        planned_units: usize,
    ) -> Self {
        let config = CharmConfig::default();
        Self::with_config(store, id, is_leader, planned_units, config, None).await
    }

    /// A member with an explicit configuration and applied snapshot.
    pub async fn with_config(
        store: &MemoryPeerStore,
        id: &str,
        is_leader: bool,
        planned_units: usize,
        config: CharmConfig,
        snapshot: Option<ConfigSnapshot>,
    ) -> Self {
        init_test_logging();

        let id = MemberId::from(id);
        let runner = MockCommandRunner::new();
        let status = MemoryStatusSink::new();
        let leadership = StaticLeadership {
            is_leader,
            planned_units,
        };

        store.add_member(&id).await;

        let coordinator = build(store, &id, &runner, &status, leadership, config, snapshot);

        // Until scripted otherwise the member is not part of any cluster
        runner.on(
            CLUSTER_LIST,
            MockReply::failure(1, "Error: LXD server isn't part of a cluster"),
        );

        Self {
            id,
            coordinator,
            runner,
            status,
            leadership,
            store: store.clone(),
        }
    }

    /// Restarts the coordinator with `config`, keeping the applied snapshot.
    pub fn reconfigure(&mut self, config: CharmConfig) {
        let snapshot = self.coordinator.snapshot().cloned();

        self.coordinator = build(
            &self.store,
            &self.id,
            &self.runner,
            &self.status,
            self.leadership,
            config,
            snapshot,
        );
    }

    /// Evaluates `trigger`, which must not hit a peer store fault.
    pub async fn handle(&mut self, trigger: Trigger) -> Outcome {
        self.coordinator
            .handle(&trigger)
            .await
            .expect("evaluation failed")
    }

    /// Makes the health probe of this member succeed.
    pub fn mark_healthy(&self) {
        self.runner.on(CLUSTER_LIST, MockReply::success("+------+"));
    }

    /// This member's flag as other members see it.
    pub async fn flag(&self) -> ClusteredFlag {
        let bag = PeerBag::new(self.store.clone(), self.id.clone());
        ClusteredFlag::parse(&bag.get_own(CLUSTERED_KEY).await)
    }

    /// The latest published status.
    pub fn current_status(&self) -> Option<UnitStatus> {
        self.status.current()
    }

    /// Number of invocations of any removal command.
    pub fn removal_commands(&self) -> usize {
        self.runner
            .invocations()
            .iter()
            .filter(|command| command.contains("cluster remove"))
            .count()
    }
}

fn build(
    store: &MemoryPeerStore,
    id: &MemberId,
    runner: &MockCommandRunner,
    status: &MemoryStatusSink,
    leadership: StaticLeadership,
    config: CharmConfig,
    snapshot: Option<ConfigSnapshot>,
) -> TestCoordinator {
    let tools = Tools::default();

    Coordinator::new(CoordinatorOptions {
        bag: PeerBag::new(store.clone(), id.clone()),
        config,
        inventory: LxdInventory::new(runner.clone(), tools),
        leadership,
        runner: runner.clone(),
        snapshot,
        status: status.clone(),
        tools,
    })
}

/// CSV cluster listing naming `members`.
pub fn cluster_csv(members: &[&str]) -> String {
    members
        .iter()
        .map(|member| {
            format!(
                "{member},https://{member}:8443,database,x86_64,default,,ONLINE,Fully operational\n"
            )
        })
        .collect()
}
