/*!
cluster_listener tracks the live topology of a cluster through its management endpoint and
relays it to a remote subscriber.

This library requires tokio and async, and uses the actor pattern: a single
[`ClusterListenerActor`] per cluster connection owns the latest [`TopologySnapshot`] and the one
active polling schedule, while cheap [`ClusterListener`] handles switch it between modes:

* **watch**: polls every few seconds while nobody consumes topology. Failures are disconnects
  and the next tick simply tries again.
* **broadcast**: polls verbosely at the cadence requested by an attached subscriber. Any failure
  or a change of cluster identity drops back to watch.

Every successful poll is published through an [`EventEmitter`] as `cluster:topology`; losing the
cluster is published once as `cluster:disconnected`.

# Example
```no_run
# async fn run() -> Result<(), cluster_listener::ClusterListenerError> {
use std::{sync::Arc, time::Duration};

use cluster_listener::{events::ChannelEmitter, ClusterListener};

let emitter = ChannelEmitter::default();
let mut events = emitter.subscribe();

let listener = ClusterListener::builder()
    .set_node_uri("http://localhost:8080")
    .set_emitter(Arc::new(emitter))
    .build()?;

// A subscriber showed up and wants topology every second.
listener.attach(Some(Duration::from_secs(1))).await?;

while let Ok(event) = events.recv().await {
    println!("{}: {:?}", event.name, event.payload);
}
# Ok(())
# }
```
*/

mod cluster_listener;
mod log_throttle;

pub mod cluster_client;
pub mod events;
pub mod node_bean;
pub mod product_version;
pub mod topology_snapshot;

pub use cluster_listener::*;
pub use events::EventEmitter;
pub use topology_snapshot::{is_different_cluster, TopologySnapshot};

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
