use crate::{cluster_client::ClientError, error_chain_fmt, topology_snapshot::SnapshotError};

#[derive(thiserror::Error)]
pub enum ClusterListenerError {
    #[error("No node URI or cluster client was supplied and a listener can't poll without one")]
    MissingNodeUriError,
    #[error("No event emitter was supplied and a listener can't relay topology without one")]
    MissingEmitterError,
    #[error("The cluster listener has been shut down")]
    ListenerStoppedError,
    #[error(transparent)]
    ClientError(#[from] ClientError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}
impl std::fmt::Debug for ClusterListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Reasons a single poll tick failed. Never leaves the actor.
#[derive(thiserror::Error)]
pub enum PollError {
    #[error(transparent)]
    ClientError(#[from] ClientError),
    #[error("Unable to decode the topology node list")]
    DecodeError(#[from] serde_json::Error),
    #[error("Unable to build a topology snapshot")]
    SnapshotError(#[from] SnapshotError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}
impl std::fmt::Debug for PollError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl PollError {
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, PollError::ClientError(e) if e.is_connection_refused())
    }
}
