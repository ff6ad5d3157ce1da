use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use tracing::instrument;
use uuid::Uuid;

use crate::product_version::ProductVersion;

use super::{
    rest_result::RestEnvelope, ClientError, ClusterClient, RestResult, RestStatus,
};

/// [`ClusterClient`] talking to the HTTP management endpoint of a cluster node.
#[derive(Clone, Debug)]
pub struct RestClient {
    base_url: Url,
    // Reqwest client maintains an internal connection pool. Reuse it so long as this
    // RestClient lives.
    reqwest_client: reqwest::Client,
    session_token: Option<String>,
}

impl RestClient {
    pub fn new(base_url: Url, request_timeout: Duration) -> Result<Self, ClientError> {
        let reqwest_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            base_url,
            reqwest_client,
            session_token: None,
        })
    }

    pub fn with_session_token(mut self, session_token: Option<String>) -> Self {
        self.session_token = session_token;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[instrument(level = "trace", skip(self))]
    async fn execute(&self, params: &[(&str, &str)]) -> Result<RestResult, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Node url `{}` cannot hold a path", self.base_url))?
            .pop_if_empty()
            .push("ignite");
        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params {
                pairs.append_pair(name, value);
            }
            if let Some(token) = &self.session_token {
                pairs.append_pair("sessionToken", token);
            }
        }

        tracing::trace!("Sending request to {}", &url);
        let response = self.reqwest_client.get(url).send().await?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(RestResult::fail(
                RestStatus::AuthenticationFailed,
                format!("Management endpoint refused the credentials: {}", status),
            ));
        }
        if !status.is_success() {
            return Ok(RestResult::fail(
                RestStatus::Failed,
                format!("Management endpoint answered with {}", status),
            ));
        }

        let body = response.text().await?;
        let envelope = serde_json::from_str::<RestEnvelope>(&body)?;

        Ok(envelope.into())
    }
}

#[async_trait]
impl ClusterClient for RestClient {
    #[instrument(level = "debug", name = "Rest Client - Topology", skip(self))]
    async fn topology(&self, verbose: bool) -> Result<RestResult, ClientError> {
        let verbose = if verbose { "true" } else { "false" };
        self.execute(&[
            ("cmd", "top"),
            ("attr", "true"),
            ("mtr", verbose),
            ("caches", verbose),
        ])
        .await
    }

    #[instrument(level = "debug", name = "Rest Client - Active", skip(self))]
    async fn active(&self, version: &ProductVersion, node_id: Uuid) -> Result<bool, ClientError> {
        // Clusters older than 2.0 have no activation and are always active.
        if *version < ProductVersion::new(2, 0, 0) {
            return Ok(true);
        }

        let result = self.execute(&[("cmd", "currentstate")]).await?;
        if !result.is_success() {
            return Err(ClientError::UnexpectedError(anyhow::anyhow!(
                "Unable to read the cluster state. Caused by: {}",
                result.error.unwrap_or_default()
            )));
        }

        let data = result
            .data
            .context("Cluster state response has no payload")?;
        Ok(serde_json::from_str::<bool>(&data)?)
    }
}
