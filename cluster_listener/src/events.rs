use tokio::sync::broadcast;

/// Emitted with the JSON list of node ids when a connection to a cluster is announced.
pub const EVENT_CLUSTER_CONNECTED: &str = "cluster:connected";
/// Emitted with the current topology on every successful poll.
pub const EVENT_CLUSTER_TOPOLOGY: &str = "cluster:topology";
/// Emitted without payload when the connection to the cluster is lost.
pub const EVENT_CLUSTER_DISCONNECTED: &str = "cluster:disconnected";

/// Publishing side of the channel towards the subscriber.
///
/// Emitting must not block: the listener calls it from inside its poll loop.
pub trait EventEmitter: Send + Sync + 'static {
    fn emit(&self, event: &str, payload: Option<String>);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterEvent {
    pub name: String,
    pub payload: Option<String>,
}

/// [`EventEmitter`] fanning events out to any number of in-process subscribers.
///
/// A subscriber that falls behind skips the oldest events; topology events carry full state so
/// the next one brings it up to date.
#[derive(Clone, Debug)]
pub struct ChannelEmitter {
    sender: broadcast::Sender<ClusterEvent>,
}

impl ChannelEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClusterEvent> {
        self.sender.subscribe()
    }
}

impl Default for ChannelEmitter {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventEmitter for ChannelEmitter {
    fn emit(&self, event: &str, payload: Option<String>) {
        tracing::trace!("Emitting `{}`", event);
        // No subscribers is not an error, the event is simply dropped.
        let _ = self.sender.send(ClusterEvent {
            name: event.to_string(),
            payload,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelEmitter, ClusterEvent, EventEmitter, EVENT_CLUSTER_DISCONNECTED};

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        // Arrange
        let emitter = ChannelEmitter::new(4);
        let mut first = emitter.subscribe();
        let mut second = emitter.subscribe();

        // Act
        emitter.emit(EVENT_CLUSTER_DISCONNECTED, None);

        // Assert
        let expected = ClusterEvent {
            name: EVENT_CLUSTER_DISCONNECTED.to_string(),
            payload: None,
        };
        assert_eq!(first.recv().await.unwrap(), expected);
        assert_eq!(second.recv().await.unwrap(), expected);
    }

    #[test]
    fn emitting_without_subscribers_is_fine() {
        let emitter = ChannelEmitter::default();

        emitter.emit(EVENT_CLUSTER_DISCONNECTED, None);
    }
}
