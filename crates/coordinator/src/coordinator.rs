use std::collections::BTreeMap;

use microcloud_command::CommandRunner;
use microcloud_peer_store::{MemberId, PeerBag, PeerStore};
use tracing::{debug, error, info, warn};

use crate::role::{ClusterView, Evaluation, Probe, Role, WaitReason, resolve};
use crate::tools::parse_cluster_members;
use crate::{
    CLUSTERED_KEY, CharmConfig, ClusteredFlag, ConfigSnapshot, Error, Leadership, Outcome, Phase,
    RemovalStep, Result, StatusReporter, StatusSink, Tools, Trigger, UnitStatus,
    WorkloadInventory,
};

const HEALTHY: &str = "Healthy MicroCloud unit";
const NOT_JOINED: &str = "This unit has not joined the cluster yet";
const PROBE_TIMED_OUT: &str = "This unit timed out checking its clustered status";

/// Options for creating a new `Coordinator`.
pub struct CoordinatorOptions<S, R, L, W, K>
where
    S: PeerStore,
{
    /// Peer bag accessor bound to this member.
    pub bag: PeerBag<S>,

    /// The operator configuration currently in effect.
    pub config: CharmConfig,

    /// Source of workloads for the removal safety check.
    pub inventory: W,

    /// Leadership oracle.
    pub leadership: L,

    /// Runner for the clustering tools.
    pub runner: R,

    /// The configuration this member last applied, if any.
    pub snapshot: Option<ConfigSnapshot>,

    /// Destination of unit status updates.
    pub status: K,

    /// Command line builder for the clustering tools.
    pub tools: Tools,
}

/// Drives one member through cluster formation, expansion and removal.
///
/// Each call to [`Coordinator::handle`] is a self-contained evaluation: it
/// re-reads the peer bag and re-probes the clustering tool.
pub struct Coordinator<S, R, L, W, K>
where
    S: PeerStore,
{
    bag: PeerBag<S>,
    config: CharmConfig,
    inventory: W,
    leadership: L,
    reporter: StatusReporter<K>,
    runner: R,
    snapshot: Option<ConfigSnapshot>,
    tools: Tools,
}

impl<S, R, L, W, K> Coordinator<S, R, L, W, K>
where
    S: PeerStore,
    R: CommandRunner,
    L: Leadership,
    W: WorkloadInventory,
    K: StatusSink,
{
    /// Creates a new coordinator.
    pub fn new(
        CoordinatorOptions {
            bag,
            config,
            inventory,
            leadership,
            runner,
            snapshot,
            status,
            tools,
        }: CoordinatorOptions<S, R, L, W, K>,
    ) -> Self {
        Self {
            bag,
            config,
            inventory,
            leadership,
            reporter: StatusReporter::new(status),
            runner,
            snapshot,
            tools,
        }
    }

    /// The configuration this member has applied, if any.
    pub const fn snapshot(&self) -> Option<&ConfigSnapshot> {
        self.snapshot.as_ref()
    }

    /// Evaluates `trigger`.
    ///
    /// Tool failures end up in the returned [`Outcome`] rather than as errors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PeerStore`] if this member's entry cannot be written.
    pub async fn handle(&mut self, trigger: &Trigger) -> Result<Outcome> {
        info!(member = %self.bag.owner(), "handling {}", trigger);

        match trigger {
            Trigger::RelationCreated => self.on_relation_created().await,
            Trigger::ConfigChanged => self.on_config_changed().await,
            Trigger::Start => self.on_start().await,
            Trigger::RelationJoined { unit } => self.on_relation_joined(unit).await,
            Trigger::UpdateStatus => self.on_update_status().await,
            Trigger::Stop => self.on_stop().await,
        }
    }

    async fn on_relation_created(&self) -> Result<Outcome> {
        let own = self.own_flag().await;

        if own == ClusteredFlag::Unset {
            self.write_flag(own, ClusteredFlag::False).await?;
        } else {
            debug!("clustered flag already {}, leaving it", own);
        }

        Ok(Outcome::new(phase_from_flag(self.own_flag().await)))
    }

    async fn on_config_changed(&mut self) -> Result<Outcome> {
        if let Some(outcome) = self.apply_config().await {
            return Ok(outcome);
        }

        Ok(Outcome::new(phase_from_flag(self.own_flag().await)))
    }

    async fn on_start(&mut self) -> Result<Outcome> {
        if self.has_pending_config() {
            debug!("Pending config changes detected");

            if let Some(outcome) = self.apply_config().await {
                return Ok(outcome.deferred());
            }
        }

        let view = self.read_view().await;
        let probe = match self.probe_self().await {
            Ok(probe) => probe,
            Err(e) => return Ok(self.probe_failed(e).await),
        };

        match resolve(&view, &Evaluation::Bootstrap, probe) {
            Role::AlreadyClustered => self.confirm_clustered(view.own_flag()).await,
            Role::ShouldInitialize => self.initialize(view.own_flag()).await,
            Role::NotReady(reason) => {
                debug!("not bootstrapping: {}", reason);

                let (phase, message) = waiting(&reason, view.is_leader);
                let status = self.publish(UnitStatus::Waiting(message.to_string())).await;

                let mut outcome = Outcome::new(phase)
                    .with_status(status)
                    .deferred();
                if let WaitReason::AwaitingQuorum { present, planned } = reason {
                    outcome = outcome.with_condition(Error::QuorumNotReady { present, planned });
                }

                Ok(outcome)
            }
            role @ (Role::ShouldJoin(_) | Role::ShouldVerify) => {
                warn!("unexpected role {:?} while bootstrapping", role);
                Ok(Outcome::new(Phase::derive(view.own_flag(), probe)))
            }
        }
    }

    async fn on_relation_joined(&self, unit: &MemberId) -> Result<Outcome> {
        let view = self.read_view().await;
        let phase = phase_from_flag(view.own_flag());

        // Only a clustered leader acts on a new unit, so only it needs the listing
        let probe = if view.is_leader && view.own_flag() == ClusteredFlag::True {
            match self.probe_unit(unit).await {
                Ok(probe) => probe,
                Err(e) => {
                    let status = self.publish(UnitStatus::Blocked(e.to_string())).await;
                    return Ok(Outcome::new(phase).with_status(status).with_condition(e));
                }
            }
        } else {
            Probe::Unhealthy
        };

        let evaluation = Evaluation::Enroll { unit: unit.clone() };
        match resolve(&view, &evaluation, probe) {
            Role::ShouldJoin(unit) => self.enroll(&unit, phase).await,
            Role::AlreadyClustered => {
                debug!("{} is already listed in the cluster", unit);
                Ok(Outcome::new(phase))
            }
            Role::NotReady(reason) => {
                debug!("not enrolling {}: {}", unit, reason);
                Ok(Outcome::new(phase))
            }
            role @ (Role::ShouldInitialize | Role::ShouldVerify) => {
                warn!("unexpected role {:?} while enrolling {}", role, unit);
                Ok(Outcome::new(phase))
            }
        }
    }

    async fn on_update_status(&self) -> Result<Outcome> {
        let view = self.read_view().await;
        let probe = match self.probe_self().await {
            Ok(probe) => probe,
            Err(e) => return Ok(self.probe_failed(e).await),
        };

        match resolve(&view, &Evaluation::Verify, probe) {
            Role::AlreadyClustered => self.confirm_clustered(view.own_flag()).await,
            Role::ShouldVerify => {
                let status = self
                    .publish(UnitStatus::Blocked(
                        "This unit has failed to join the cluster".to_string(),
                    ))
                    .await;

                Ok(Outcome::new(Phase::Blocked).with_status(status))
            }
            Role::NotReady(reason) => {
                let (phase, message) = waiting(&reason, view.is_leader);
                let status = self.publish(UnitStatus::Waiting(message.to_string())).await;

                Ok(Outcome::new(phase).with_status(status))
            }
            role @ (Role::ShouldInitialize | Role::ShouldJoin(_)) => {
                warn!("unexpected role {:?} while verifying", role);
                Ok(Outcome::new(Phase::derive(view.own_flag(), probe)))
            }
        }
    }

    async fn on_stop(&self) -> Result<Outcome> {
        let own = self.own_flag().await;
        if own != ClusteredFlag::True {
            debug!("not clustered, nothing to remove");
            return Ok(Outcome::new(phase_from_flag(own)));
        }

        let member = self.bag.owner().clone();

        let workloads = match self.inventory.list_active_workloads().await {
            Ok(workloads) => workloads,
            Err(e) => {
                let status = self
                    .publish(UnitStatus::Blocked(format!(
                        "Failed to remove {member} from the MicroCloud cluster: {e}"
                    )))
                    .await;

                return Ok(Outcome::new(Phase::Clustered)
                    .with_status(status)
                    .with_condition(e));
            }
        };

        let hosted: Vec<String> = workloads
            .into_iter()
            .filter(|workload| workload.location == member.as_str())
            .map(|workload| workload.name)
            .collect();

        if !hosted.is_empty() {
            info!("{} still hosts: {}", member, hosted.join(", "));

            let refused = Error::RemovalRefusedWorkloadsPresent {
                member: member.to_string(),
                workloads: hosted,
            };
            let status = self.publish(UnitStatus::Blocked(refused.to_string())).await;

            return Ok(Outcome::new(Phase::Clustered)
                .with_status(status)
                .with_condition(refused));
        }

        self.remove(&member).await
    }

    async fn remove(&self, member: &MemberId) -> Result<Outcome> {
        self.publish(UnitStatus::Maintenance(
            "Removing node from MicroCloud".to_string(),
        ))
        .await;

        let mut completed = Vec::new();
        for step in self.removal_steps() {
            match self
                .runner
                .run_checked(&self.tools.remove(step, member))
                .await
            {
                Ok(_) => {
                    info!(
                        "{} cluster member successfully removed for the '{}' node",
                        step, member
                    );
                    completed.push(step);
                }
                Err(e) => {
                    let partial = Error::PartialRemoval {
                        member: member.to_string(),
                        completed,
                        source: Box::new(Error::from(e)),
                    };
                    error!("Failed to remove {} from MicroCloud", member);
                    let status = self.publish(UnitStatus::Blocked(partial.to_string())).await;

                    return Ok(Outcome::new(Phase::Leaving)
                        .with_status(status)
                        .with_condition(partial));
                }
            }
        }

        info!("MicroCloud node successfully removed");
        let status = self
            .publish(UnitStatus::Active(
                "MicroCloud node successfully removed".to_string(),
            ))
            .await;

        Ok(Outcome::new(Phase::Removed).with_status(status))
    }

    fn removal_steps(&self) -> Vec<RemovalStep> {
        let subsystems = self.subsystems();
        let mut steps = vec![RemovalStep::Lxd];

        if subsystems.microceph {
            steps.push(RemovalStep::MicroCeph);
        }
        if subsystems.microovn {
            steps.push(RemovalStep::MicroOvn);
        }

        steps.push(RemovalStep::MicroCloud);
        steps
    }

    async fn initialize(&self, own: ClusteredFlag) -> Result<Outcome> {
        self.publish(UnitStatus::Maintenance("Initializing MicroCloud".to_string()))
            .await;

        if let Err(e) = self.run_init().await {
            error!("Failed to initialize MicroCloud: {}", e);
            let status = self.publish(UnitStatus::Blocked(e.to_string())).await;

            return Ok(Outcome::new(Phase::Initializing)
                .with_status(status)
                .with_condition(e)
                .deferred());
        }

        self.write_flag(own, ClusteredFlag::True).await?;
        let status = self
            .publish(UnitStatus::Active(
                "MicroCloud successfully initialized".to_string(),
            ))
            .await;

        Ok(Outcome::new(Phase::Clustered).with_status(status))
    }

    async fn run_init(&self) -> Result<()> {
        let output = self.runner.run_checked(&self.tools.init()).await?;

        if self.subsystems().microceph {
            self.runner.run_checked(&self.tools.enable_rgw()).await?;
        }

        info!("MicroCloud successfully initialized:\n{}", output.stdout);

        Ok(())
    }

    async fn enroll(&self, unit: &MemberId, phase: Phase) -> Result<Outcome> {
        self.publish(UnitStatus::Maintenance("Adding node to MicroCloud".to_string()))
            .await;

        match self.runner.run_checked(&self.tools.add()).await {
            Ok(output) => {
                info!("MicroCloud node(s) successfully added:\n{}", output.stdout);
                let status = self
                    .publish(UnitStatus::Active(
                        "New MicroCloud node successfully added".to_string(),
                    ))
                    .await;

                Ok(Outcome::new(phase).with_status(status))
            }
            Err(e) => {
                let e = Error::from(e);
                error!("Failed to add {} to MicroCloud", unit);
                let status = self.publish(UnitStatus::Blocked(e.to_string())).await;

                Ok(Outcome::new(phase).with_status(status).with_condition(e))
            }
        }
    }

    async fn confirm_clustered(&self, own: ClusteredFlag) -> Result<Outcome> {
        self.write_flag(own, ClusteredFlag::True).await?;
        let status = self.publish(UnitStatus::Active(HEALTHY.to_string())).await;

        Ok(Outcome::new(Phase::Clustered).with_status(status))
    }

    async fn probe_failed(&self, e: Error) -> Outcome {
        let message = if e.is_timeout() {
            PROBE_TIMED_OUT.to_string()
        } else {
            e.to_string()
        };
        let status = self.publish(UnitStatus::Blocked(message)).await;

        Outcome::new(Phase::Blocked)
            .with_status(status)
            .with_condition(e)
    }

    /// Applies the configuration delta, returning an outcome only if it failed.
    async fn apply_config(&mut self) -> Option<Outcome> {
        info!("Updating charm config");

        if let Err(e) = self.config.validate() {
            let status = self.publish(UnitStatus::Blocked(e.to_string())).await;
            let phase = phase_from_flag(self.own_flag().await);

            return Some(Outcome::new(phase).with_status(status).with_condition(e));
        }

        let Some(snapshot) = self.snapshot.as_ref() else {
            debug!("no applied configuration yet, adopting the current one");
            self.snapshot = Some(self.config.clone());
            return None;
        };

        let delta = snapshot.delta(&self.config);
        if delta.is_empty() {
            debug!("No configuration changes to apply");
            return None;
        }

        let own = self.own_flag().await;
        let mut next = self.config.clone();

        if own == ClusteredFlag::True && delta.toggles().next().is_some() {
            warn!(
                "MicroCeph and MicroOVN can only be enabled / disabled at deploy time. Ignoring the changes"
            );
            next.microceph = snapshot.microceph;
            next.microovn = snapshot.microovn;
        }

        for key in delta.channels() {
            let (Some(snap), Some(channel)) = (key.snap(), next.channel(key)) else {
                continue;
            };
            if !next.uses_snap(key) {
                debug!("{} is not deployed, not refreshing it", snap);
                continue;
            }

            info!("Changes have been detected in the snap channels, refreshing {}", snap);
            if let Err(e) = self
                .runner
                .run_checked(&self.tools.snap_refresh(snap, channel))
                .await
            {
                let status = self
                    .publish(UnitStatus::Blocked(format!(
                        "Failed to apply some configuration change(s): {}",
                        delta.describe()
                    )))
                    .await;

                return Some(
                    Outcome::new(phase_from_flag(own))
                        .with_status(status)
                        .with_condition(Error::from(e))
                        .deferred(),
                );
            }
        }

        self.snapshot = Some(next);

        None
    }

    fn has_pending_config(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_none_or(|snapshot| !snapshot.delta(&self.config).is_empty())
    }

    /// Feature toggles in effect: the applied ones once there are any.
    fn subsystems(&self) -> &CharmConfig {
        self.snapshot.as_ref().unwrap_or(&self.config)
    }

    async fn read_view(&self) -> ClusterView {
        let mut flags = BTreeMap::new();
        for member in self.bag.members().await {
            let flag = ClusteredFlag::parse(&self.bag.get(&member, CLUSTERED_KEY).await);
            flags.insert(member, flag);
        }

        let owner = self.bag.owner().clone();
        if !flags.contains_key(&owner) {
            let own = self.own_flag().await;
            flags.insert(owner.clone(), own);
        }

        let view = ClusterView {
            member: owner,
            is_leader: self.leadership.is_leader(),
            planned_units: self.leadership.planned_units(),
            flags,
        };

        debug!(
            leader = view.is_leader,
            planned = view.planned_units,
            "peer flags: {:?}",
            view.flags
        );

        view
    }

    async fn own_flag(&self) -> ClusteredFlag {
        ClusteredFlag::parse(&self.bag.get_own(CLUSTERED_KEY).await)
    }

    async fn write_flag(&self, current: ClusteredFlag, next: ClusteredFlag) -> Result<()> {
        let Some(value) = next.as_bag_value() else {
            return Ok(());
        };

        if !current.may_advance_to(next) {
            warn!("refusing to move clustered flag from {} to {}", current, next);
            return Ok(());
        }

        self.bag
            .set(CLUSTERED_KEY, value)
            .await
            .map_err(|e| Error::PeerStore(e.to_string()))
    }

    async fn probe_self(&self) -> Result<Probe> {
        let output = self.runner.run(&self.tools.cluster_list()).await?;

        Ok(if output.is_success() {
            Probe::Healthy
        } else {
            Probe::Unhealthy
        })
    }

    async fn probe_unit(&self, unit: &MemberId) -> Result<Probe> {
        let output = self.runner.run(&self.tools.cluster_members()).await?;

        if !output.is_success() {
            return Ok(Probe::Unhealthy);
        }

        let listed = parse_cluster_members(&output.stdout)
            .iter()
            .any(|name| name == unit.as_str());

        Ok(if listed {
            Probe::Healthy
        } else {
            Probe::Unhealthy
        })
    }

    async fn publish(&self, status: UnitStatus) -> UnitStatus {
        self.reporter.report(&status).await;
        status
    }
}

const fn phase_from_flag(flag: ClusteredFlag) -> Phase {
    match flag {
        ClusteredFlag::True => Phase::Clustered,
        ClusteredFlag::False | ClusteredFlag::Unset => Phase::Unclustered,
    }
}

/// Phase and waiting message for a member that cannot act yet.
const fn waiting(reason: &WaitReason, is_leader: bool) -> (Phase, &'static str) {
    match reason {
        WaitReason::AwaitingEnrollment => (Phase::Joining, NOT_JOINED),
        _ => (Phase::Unclustered, wait_message(is_leader)),
    }
}

const fn wait_message(is_leader: bool) -> &'static str {
    if is_leader {
        "Leader needs to wait for all units to be ready to bootstrap"
    } else {
        "Unit needs to wait for all units to be ready to bootstrap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use microcloud_command_mock::{MockCommandRunner, MockReply};
    use microcloud_peer_store_memory::MemoryPeerStore;
    use tracing_test::traced_test;

    use crate::{LxdInventory, MemoryStatusSink, StaticLeadership};

    type TestCoordinator = Coordinator<
        MemoryPeerStore,
        MockCommandRunner,
        StaticLeadership,
        LxdInventory<MockCommandRunner>,
        MemoryStatusSink,
    >;

    fn coordinator(
        store: &MemoryPeerStore,
        runner: &MockCommandRunner,
        config: CharmConfig,
        snapshot: Option<ConfigSnapshot>,
    ) -> TestCoordinator {
        Coordinator::new(CoordinatorOptions {
            bag: PeerBag::new(store.clone(), MemberId::from("node-1")),
            config,
            inventory: LxdInventory::new(runner.clone(), Tools::default()),
            leadership: StaticLeadership {
                is_leader: true,
                planned_units: 1,
            },
            runner: runner.clone(),
            snapshot,
            status: MemoryStatusSink::new(),
            tools: Tools::default(),
        })
    }

    #[tokio::test]
    #[traced_test]
    async fn test_toggle_change_after_clustering_is_logged() {
        let store = MemoryPeerStore::new();
        let runner = MockCommandRunner::new();
        let config = CharmConfig {
            microceph: true,
            ..CharmConfig::default()
        };
        let mut coordinator =
            coordinator(&store, &runner, config, Some(CharmConfig::default()));

        coordinator.handle(&Trigger::UpdateStatus).await.unwrap();
        coordinator.handle(&Trigger::ConfigChanged).await.unwrap();

        assert!(logs_contain("can only be enabled / disabled at deploy time"));
        assert_eq!(coordinator.snapshot(), Some(&CharmConfig::default()));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_relation_created_keeps_true_flag() {
        let store = MemoryPeerStore::new();
        let runner = MockCommandRunner::new();
        let mut coordinator = coordinator(&store, &runner, CharmConfig::default(), None);

        coordinator.handle(&Trigger::UpdateStatus).await.unwrap();
        let outcome = coordinator.handle(&Trigger::RelationCreated).await.unwrap();

        assert_eq!(outcome.phase, Phase::Clustered);
        assert_eq!(coordinator.own_flag().await, ClusteredFlag::True);
        assert!(logs_contain("clustered flag already True"));
    }

    #[tokio::test]
    async fn test_flag_never_moves_backwards() {
        let store = MemoryPeerStore::new();
        let runner = MockCommandRunner::new();
        runner.on("lxc cluster list", MockReply::success(""));
        let coordinator = coordinator(&store, &runner, CharmConfig::default(), None);

        coordinator
            .write_flag(ClusteredFlag::Unset, ClusteredFlag::True)
            .await
            .unwrap();
        coordinator
            .write_flag(ClusteredFlag::True, ClusteredFlag::False)
            .await
            .unwrap();

        assert_eq!(coordinator.own_flag().await, ClusteredFlag::True);
    }
}
