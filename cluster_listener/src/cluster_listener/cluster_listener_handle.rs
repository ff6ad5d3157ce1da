use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::instrument;

use super::{
    run_cluster_listener_actor, ClusterListenerActor, ClusterListenerBuilder,
    ClusterListenerError, ClusterListenerMessage, ListenerConfiguration, ListenerState,
};

/**
This a handle to the actor.

One listener should exist per cluster connection. Cloning this handle is very cheap and will not
instantiate a new actor in the background, so clone it to every component that needs to switch
modes, e.g. the handlers of the subscriber's attach and detach signals. When the last handle goes
out of scope and is dropped, the backing actor stops polling and is dropped as well.

The listener starts in watch mode as soon as it is built.
*/
#[derive(Clone, Debug)]
pub struct ClusterListener {
    sender: mpsc::Sender<ClusterListenerMessage>,
}

impl ClusterListener {
    pub fn builder() -> ClusterListenerBuilder {
        ClusterListenerBuilder::default()
    }

    // This is pub(crate) so only the builder can crank it out
    pub(crate) fn new(config: ListenerConfiguration) -> Self {
        let (sender, receiver) = mpsc::channel(8);
        let actor = ClusterListenerActor::new(receiver, config);
        tokio::spawn(run_cluster_listener_actor(actor));

        Self { sender }
    }

    async fn send(&self, msg: ClusterListenerMessage) -> Result<(), ClusterListenerError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| ClusterListenerError::ListenerStoppedError)
    }

    /// (Re)starts low frequency polling. Any other schedule is cancelled first.
    #[instrument(level = "debug", name = "Actor Handle - Start Watch", skip(self))]
    pub async fn start_watch(&self) -> Result<(), ClusterListenerError> {
        self.send(ClusterListenerMessage::StartWatch).await
    }

    /// A subscriber wants topology: broadcast it every `interval`, or at the watch cadence when
    /// `None`.
    #[instrument(level = "debug", name = "Actor Handle - Attach", skip(self))]
    pub async fn attach(&self, interval: Option<Duration>) -> Result<(), ClusterListenerError> {
        self.send(ClusterListenerMessage::StartBroadcast { interval })
            .await
    }

    /// The subscriber went away: go back to watching.
    #[instrument(level = "debug", name = "Actor Handle - Detach", skip(self))]
    pub async fn detach(&self) -> Result<(), ClusterListenerError> {
        self.send(ClusterListenerMessage::StopBroadcast).await
    }

    #[instrument(level = "debug", name = "Actor Handle - Announce Connected", skip(self))]
    pub async fn announce_connected(&self) -> Result<(), ClusterListenerError> {
        self.send(ClusterListenerMessage::AnnounceConnected).await
    }

    #[instrument(level = "debug", name = "Actor Handle - Get State", skip(self))]
    pub async fn state(&self) -> Result<ListenerState, ClusterListenerError> {
        let (tx, rx) = oneshot::channel();
        self.send(ClusterListenerMessage::GetState { respond_to: tx })
            .await?;
        rx.await
            .map_err(|_| ClusterListenerError::ListenerStoppedError)
    }

    /// Stops polling for every handle of this listener.
    #[instrument(level = "debug", name = "Actor Handle - Shutdown", skip(self))]
    pub async fn shutdown(&self) -> Result<(), ClusterListenerError> {
        self.send(ClusterListenerMessage::Shutdown).await
    }
}
