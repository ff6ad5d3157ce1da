use std::{sync::Arc, time::Duration};

use anyhow::Context;
use rand::seq::SliceRandom;
use tokio::{sync::mpsc, time::Instant};
use tracing::{instrument, Span};
use uuid::Uuid;

use crate::{
    cluster_client::{ClusterClient, RestResult},
    events::{
        EventEmitter, EVENT_CLUSTER_CONNECTED, EVENT_CLUSTER_DISCONNECTED, EVENT_CLUSTER_TOPOLOGY,
    },
    log_throttle::LogThrottle,
    node_bean::NodeBean,
    topology_snapshot::{is_different_cluster, TopologySnapshot},
};

use super::{
    ClusterListenerMessage, DiffOrder, ListenerConfiguration, ListenerState, PollError,
    PollPolicy, Schedule,
};

pub struct ClusterListenerActor {
    client: Arc<dyn ClusterClient>,
    emitter: Arc<dyn EventEmitter>,
    receiver: mpsc::Receiver<ClusterListenerMessage>,
    /// Latest topology, `None` while disconnected.
    topology: Option<TopologySnapshot>,
    schedule: Option<Schedule>,
    next_schedule_id: u64,
    watch_interval: Duration,
    log_throttle: LogThrottle,
    stopped: bool,
}

/// Result of the network part of a tick.
enum PollOutcome {
    Topology {
        snapshot: TopologySnapshot,
        raw: String,
    },
    Rejected(RestResult),
}

impl ClusterListenerActor {
    pub(crate) fn new(
        receiver: mpsc::Receiver<ClusterListenerMessage>,
        config: ListenerConfiguration,
    ) -> Self {
        Self {
            client: config.client,
            emitter: config.emitter,
            receiver,
            topology: None,
            schedule: None,
            next_schedule_id: 0,
            watch_interval: config.watch_interval,
            log_throttle: LogThrottle::new(config.warn_throttle_window),
            stopped: false,
        }
    }

    /// Message handler for the ClusterListenerActor
    #[instrument(
        level = "debug",
        name = "ClusterListener Actor - Handle Message",
        skip(self),
        fields(correlation_id)
    )]
    fn handle_message(&mut self, msg: ClusterListenerMessage) {
        // Apply a correlation id to all child spans of this message handler
        Span::current().record("correlation_id", Uuid::new_v4().to_string().as_str());
        match msg {
            ClusterListenerMessage::StartWatch => self.start_watch(),
            ClusterListenerMessage::StartBroadcast { interval } => self.start_broadcast(interval),
            ClusterListenerMessage::StopBroadcast => self.stop_broadcast(),
            ClusterListenerMessage::AnnounceConnected => self.cluster_connect(),
            ClusterListenerMessage::GetState { respond_to } => {
                let _ = respond_to.send(self.state());
            }
            ClusterListenerMessage::Shutdown => {
                self.cancel_schedule();
                self.stopped = true;
            }
        }
    }

    fn state(&self) -> ListenerState {
        ListenerState {
            mode: self.schedule.map(|s| s.policy.mode),
            interval: self.schedule.map(|s| s.interval),
            topology: self.topology.clone(),
        }
    }

    /// Polls at the default cadence, first tick right away.
    pub(crate) fn start_watch(&mut self) {
        self.install_schedule(PollPolicy::WATCH, self.watch_interval);
    }

    /// Polls verbosely at `interval`, or the default cadence when none (or zero) is given.
    pub(crate) fn start_broadcast(&mut self, interval: Option<Duration>) {
        let interval = interval
            .filter(|i| !i.is_zero())
            .unwrap_or(self.watch_interval);
        self.install_schedule(PollPolicy::BROADCAST, interval);
    }

    pub(crate) fn stop_broadcast(&mut self) {
        self.cancel_schedule();
        self.start_watch();
    }

    fn install_schedule(&mut self, policy: PollPolicy, interval: Duration) {
        self.cancel_schedule();

        self.next_schedule_id += 1;
        self.schedule = Some(Schedule {
            id: self.next_schedule_id,
            policy,
            interval,
            next_tick: Instant::now(),
        });
        tracing::debug!("Started {} polling every {:?}", policy.mode, interval);
    }

    fn cancel_schedule(&mut self) {
        if let Some(schedule) = self.schedule.take() {
            tracing::debug!("Cancelled {} polling", schedule.policy.mode);
        }
    }

    fn cluster_connect(&self) {
        let Some(topology) = &self.topology else {
            tracing::debug!("Not connected to a cluster, nothing to announce");
            return;
        };

        tracing::info!(
            "Connection successfully established to cluster with nodes: {:?}",
            topology.id8s()
        );

        match serde_json::to_string(topology.node_ids()) {
            Ok(payload) => self.emitter.emit(EVENT_CLUSTER_CONNECTED, Some(payload)),
            Err(e) => tracing::error!("Unable to encode cluster node ids. Caused by: {}", e),
        }
    }

    /// Forgets the held topology and tells the subscriber. Does nothing while disconnected.
    fn cluster_disconnect(&mut self) {
        if self.topology.take().is_none() {
            return;
        }

        tracing::info!("Connection to cluster was lost");

        self.emitter.emit(EVENT_CLUSTER_DISCONNECTED, None);
    }

    /// Runs one poll of the current schedule.
    ///
    /// The network part is raced against incoming messages: a mode switch drops the poll in
    /// flight and takes effect immediately, other messages are served while waiting.
    #[instrument(level = "debug", name = "ClusterListener Actor - Tick", skip(self))]
    pub(crate) async fn tick(&mut self) {
        let Some(schedule) = self.schedule else {
            return;
        };
        let policy = schedule.policy;

        let poll = poll_topology(Arc::clone(&self.client), policy);
        tokio::pin!(poll);

        let outcome = loop {
            tokio::select! {
                outcome = &mut poll => break outcome,
                opt_msg = self.receiver.recv() => match opt_msg {
                    Some(msg) if msg.interrupts_poll() => {
                        tracing::debug!("Interrupting {} poll in flight", policy.mode);
                        self.handle_message(msg);
                        return;
                    }
                    Some(msg) => self.handle_message(msg),
                    None => {
                        // Every handle is gone.
                        self.stopped = true;
                        return;
                    }
                },
            }
        };

        let result = match outcome {
            Ok(PollOutcome::Topology { snapshot, raw }) => {
                self.apply_topology(policy, snapshot, raw)
            }
            Ok(PollOutcome::Rejected(result)) => {
                self.log_throttle.warn(
                    result
                        .error
                        .as_deref()
                        .unwrap_or("Cluster rejected the topology request"),
                );
                self.cluster_disconnect();
                Ok(())
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            self.handle_poll_failure(policy, e);
        }

        // Fixed delay: count from the end of this tick, unless the tick replaced the schedule.
        if let Some(current) = self.schedule.as_mut() {
            if current.id == schedule.id {
                current.next_tick = Instant::now() + current.interval;
            }
        }
    }

    fn apply_topology(
        &mut self,
        policy: PollPolicy,
        snapshot: TopologySnapshot,
        raw: String,
    ) -> Result<(), PollError> {
        match policy.diff {
            DiffOrder::HeldFirst => {
                if is_different_cluster(self.topology.as_ref(), &snapshot) {
                    tracing::info!(
                        "Connection successfully established to cluster with nodes: {:?}",
                        snapshot.id8s()
                    );
                }
            }
            DiffOrder::CandidateFirst => {
                let different = match &self.topology {
                    Some(held) => is_different_cluster(Some(&snapshot), held),
                    None => true,
                };

                if different {
                    self.cluster_disconnect();
                    tracing::info!(
                        "Connection successfully established to cluster with nodes: {:?}",
                        snapshot.id8s()
                    );
                    self.start_watch();
                }
            }
        }

        let payload = if policy.emit_raw {
            raw
        } else {
            serde_json::to_string(&snapshot).context("Unable to encode topology snapshot")?
        };

        self.topology = Some(snapshot);
        self.emitter.emit(EVENT_CLUSTER_TOPOLOGY, Some(payload));

        Ok(())
    }

    fn handle_poll_failure(&mut self, policy: PollPolicy, e: PollError) {
        if policy.quiet_when_unreachable && e.is_connection_refused() {
            tracing::trace!("Cluster is unreachable");
        } else {
            tracing::error!("{} poll failed. Caused by: {:?}", policy.mode, e);
        }

        self.cluster_disconnect();

        if policy.demote {
            self.start_watch();
        }
    }
}

/// Network part of a tick: fetch, decode, build and, for watch polls, ask for the active state.
async fn poll_topology(
    client: Arc<dyn ClusterClient>,
    policy: PollPolicy,
) -> Result<PollOutcome, PollError> {
    let result = client.topology(policy.verbose).await?;

    if !result.is_success() {
        return Ok(PollOutcome::Rejected(result));
    }

    let raw = result.data.context("Topology response has no payload")?;
    let nodes = serde_json::from_str::<Vec<NodeBean>>(&raw)?;
    let mut snapshot = TopologySnapshot::build(&nodes)?;

    if policy.query_active {
        let representative = snapshot
            .node_ids()
            .choose(&mut rand::thread_rng())
            .copied();

        // An empty topology has nobody to ask and stays inactive.
        if let (Some(version), Some(node_id)) = (snapshot.version().cloned(), representative) {
            let active = client.active(&version, node_id).await?;
            snapshot.set_active(active);
        }
    }

    Ok(PollOutcome::Topology { snapshot, raw })
}

#[instrument(level = "debug", name = "Running ClusterListener Actor", skip(actor))]
pub async fn run_cluster_listener_actor(mut actor: ClusterListenerActor) {
    actor.start_watch();

    while !actor.stopped {
        let next_tick = actor.schedule.map(|s| s.next_tick);

        tokio::select! {
            opt_msg = actor.receiver.recv() => {
                let msg = match opt_msg {
                    Some(msg) => msg,
                    None => break,
                };
                actor.handle_message(msg);
            },
            _ = sleep_until(next_tick) => {
                actor.tick().await;
            }
        }
    }

    tracing::debug!("ClusterListener actor stopped");
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
