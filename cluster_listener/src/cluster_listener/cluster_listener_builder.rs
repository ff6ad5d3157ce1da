use std::{sync::Arc, time::Duration};

use tracing::instrument;
use url::Url;

use crate::{
    cluster_client::{ClusterClient, RestClient},
    events::EventEmitter,
};

use super::{
    ClusterListener, ClusterListenerError, ListenerConfiguration, DEFAULT_WARN_THROTTLE_WINDOW,
    DEFAULT_WATCH_INTERVAL,
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ClusterListenerBuilder {
    client: Option<Arc<dyn ClusterClient>>,
    emitter: Option<Arc<dyn EventEmitter>>,
    node_uri: Option<String>,
    request_timeout: Duration,
    session_token: Option<String>,
    warn_throttle_window: Duration,
    watch_interval: Duration,
}

impl ClusterListenerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uri of the node whose management endpoint is polled.
    pub fn set_node_uri(mut self, node_uri: &str) -> Self {
        self.node_uri = Some(node_uri.to_string());
        self
    }

    /// Polls through `client` instead of the HTTP endpoint of a node uri.
    pub fn set_client(mut self, client: Arc<dyn ClusterClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn set_emitter(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn set_watch_interval(mut self, watch_interval: Duration) -> Self {
        self.watch_interval = watch_interval;
        self
    }

    pub fn set_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn set_session_token(mut self, session_token: &str) -> Self {
        self.session_token = Some(session_token.to_string());
        self
    }

    pub fn set_warn_throttle_window(mut self, window: Duration) -> Self {
        self.warn_throttle_window = window;
        self
    }

    /// Spawns a new [`ClusterListenerActor`](super::ClusterListenerActor) in watch mode and
    /// returns a handle to it.
    ///
    /// Must be called from within a tokio runtime. Each call creates a new actor, so the builder
    /// can act as a template after being set up once.
    #[instrument(level = "debug", name = "Build ClusterListenerBuilder", skip(self))]
    pub fn build(&self) -> Result<ClusterListener, ClusterListenerError> {
        let emitter = match &self.emitter {
            Some(emitter) => Arc::clone(emitter),
            None => {
                tracing::error!("No event emitter was supplied");
                return Err(ClusterListenerError::MissingEmitterError);
            }
        };

        let client = match (&self.client, &self.node_uri) {
            (Some(client), _) => Arc::clone(client),
            (None, Some(node_uri)) => {
                let base_url = validate_node_uri(node_uri)?;
                let client = RestClient::new(base_url, self.request_timeout)?
                    .with_session_token(self.session_token.clone());
                Arc::new(client)
            }
            (None, None) => {
                tracing::error!("No node URI was supplied");
                return Err(ClusterListenerError::MissingNodeUriError);
            }
        };

        if self.watch_interval.is_zero() {
            return Err(ClusterListenerError::UnexpectedError(anyhow::anyhow!(
                "Watch interval must be greater than zero"
            )));
        }

        let config = ListenerConfiguration {
            client,
            emitter,
            watch_interval: self.watch_interval,
            warn_throttle_window: self.warn_throttle_window,
        };

        Ok(ClusterListener::new(config))
    }
}

impl Default for ClusterListenerBuilder {
    fn default() -> Self {
        Self {
            client: None,
            emitter: None,
            node_uri: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session_token: None,
            warn_throttle_window: DEFAULT_WARN_THROTTLE_WINDOW,
            watch_interval: DEFAULT_WATCH_INTERVAL,
        }
    }
}

/// Parses the node uri, making sure it points to an http or https endpoint.
#[instrument(level = "debug", name = "Validate Node URI")]
fn validate_node_uri(node_uri: &str) -> anyhow::Result<Url> {
    let url = Url::parse(node_uri)
        .map_err(|e| anyhow::anyhow!("Invalid node uri `{}`. Caused by: {}", node_uri, e))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(anyhow::anyhow!(
            "Node uri does not have a supported scheme: {}",
            scheme
        )),
    }
}
