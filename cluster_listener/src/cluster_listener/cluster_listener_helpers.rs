use std::{fmt, sync::Arc, time::Duration};

use tokio::{sync::oneshot, time::Instant};

use crate::{
    cluster_client::ClusterClient, events::EventEmitter, topology_snapshot::TopologySnapshot,
};

/// Cadence of the watch mode, also used by broadcast when the subscriber asks for none.
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_millis(3000);

/// Window during which an identical warning is logged only once.
pub const DEFAULT_WARN_THROTTLE_WINDOW: Duration = Duration::from_secs(300);

#[derive(Debug)]
pub enum ClusterListenerMessage {
    StartWatch,
    StartBroadcast {
        interval: Option<Duration>,
    },
    StopBroadcast,
    /// Emits the connected event for the currently held topology.
    AnnounceConnected,
    GetState {
        respond_to: oneshot::Sender<ListenerState>,
    },
    Shutdown,
}

impl ClusterListenerMessage {
    /// Messages that replace the schedule, and therefore drop a poll that is still in flight.
    pub(crate) fn interrupts_poll(&self) -> bool {
        matches!(
            self,
            ClusterListenerMessage::StartWatch
                | ClusterListenerMessage::StartBroadcast { .. }
                | ClusterListenerMessage::StopBroadcast
                | ClusterListenerMessage::Shutdown
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Watch,
    Broadcast,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Watch => write!(f, "watch"),
            Mode::Broadcast => write!(f, "broadcast"),
        }
    }
}

/// Which snapshot is handed to the diff as the reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DiffOrder {
    /// `is_different_cluster(held, candidate)`
    HeldFirst,
    /// `is_different_cluster(candidate, held)`; no held snapshot counts as different.
    CandidateFirst,
}

/// What distinguishes the watch poll from the broadcast poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PollPolicy {
    pub mode: Mode,
    pub verbose: bool,
    pub diff: DiffOrder,
    pub query_active: bool,
    /// Emit the raw poll payload instead of the encoded snapshot.
    pub emit_raw: bool,
    /// Unreachable cluster is a silent disconnect rather than an error.
    pub quiet_when_unreachable: bool,
    /// Fall back to watch mode after a failed tick or a cluster change.
    pub demote: bool,
}

impl PollPolicy {
    pub const WATCH: PollPolicy = PollPolicy {
        mode: Mode::Watch,
        verbose: false,
        diff: DiffOrder::HeldFirst,
        query_active: true,
        emit_raw: false,
        quiet_when_unreachable: true,
        demote: false,
    };

    pub const BROADCAST: PollPolicy = PollPolicy {
        mode: Mode::Broadcast,
        verbose: true,
        diff: DiffOrder::CandidateFirst,
        query_active: false,
        emit_raw: true,
        quiet_when_unreachable: false,
        demote: true,
    };
}

/// The one recurring poll of a listener.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Schedule {
    /// Changes every time a schedule is installed.
    pub id: u64,
    pub policy: PollPolicy,
    pub interval: Duration,
    pub next_tick: Instant,
}

/// Point in time view of a listener.
#[derive(Clone, Debug)]
pub struct ListenerState {
    pub mode: Option<Mode>,
    pub interval: Option<Duration>,
    pub topology: Option<TopologySnapshot>,
}

/// Everything the actor needs to start.
pub(crate) struct ListenerConfiguration {
    pub(crate) client: Arc<dyn ClusterClient>,
    pub(crate) emitter: Arc<dyn EventEmitter>,
    pub(crate) watch_interval: Duration,
    pub(crate) warn_throttle_window: Duration,
}
