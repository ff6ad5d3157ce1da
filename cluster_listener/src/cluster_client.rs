mod cluster_client_error;
mod rest_client;
mod rest_result;

pub use cluster_client_error::ClientError;
pub use rest_client::RestClient;
pub use rest_result::{RestResult, RestStatus};

use async_trait::async_trait;
use uuid::Uuid;

use crate::product_version::ProductVersion;

/// Request/response access to the cluster management endpoint.
///
/// Implementations report an unreachable cluster as [`ClientError::ConnectionRefused`] so the
/// listener can tell it apart from every other failure.
#[async_trait]
pub trait ClusterClient: Send + Sync + 'static {
    /// Fetches the current topology. `verbose` asks for richer per node details.
    async fn topology(&self, verbose: bool) -> Result<RestResult, ClientError>;

    /// Asks whether the cluster is active, using the cluster version and any node of the
    /// topology to pick the right query.
    async fn active(&self, version: &ProductVersion, node_id: Uuid) -> Result<bool, ClientError>;
}
