use std::{sync::Arc, time::Duration};

use cluster_listener::{events::ChannelEmitter, events::EVENT_CLUSTER_TOPOLOGY, ClusterListener};
use tracing::subscriber::set_global_default;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    let node_uri: String =
        std::env::var("CLUSTER_NODE_URI").unwrap_or_else(|_| "http://localhost:8080".to_string());

    let emitter = ChannelEmitter::default();
    let mut events = emitter.subscribe();

    let listener = ClusterListener::builder()
        .set_node_uri(&node_uri)
        .set_emitter(Arc::new(emitter))
        .build()?;

    let mut topologies = 0;
    loop {
        tokio::select! {
            event = events.recv() => {
                let event = event?;
                println!("{} {}", event.name, event.payload.unwrap_or_default());

                // Pretend a subscriber attaches after the first topology and leaves after a few.
                if event.name == EVENT_CLUSTER_TOPOLOGY {
                    topologies += 1;
                    if topologies == 1 {
                        listener.announce_connected().await?;
                        listener.attach(Some(Duration::from_secs(1))).await?;
                    } else if topologies == 10 {
                        listener.detach().await?;
                    }
                }
            },
            _ = tokio::signal::ctrl_c() => {
                listener.shutdown().await?;
                break;
            }
        }
    }

    Ok(())
}

fn setup_tracing() {
    // Redirect all `log`'s events to the subscriber
    LogTracer::init().expect("Failed to set logger");
    // Set up tracing
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let formatting_layer = BunyanFormattingLayer::new("cluster-listener-demo".into(), std::io::stdout);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    set_global_default(subscriber).expect("Failed to set subscriber");
}
