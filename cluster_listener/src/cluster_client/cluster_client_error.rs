use crate::error_chain_fmt;

#[derive(thiserror::Error)]
pub enum ClientError {
    #[error("Unable to connect to the cluster at `{0}`")]
    ConnectionRefused(String),
    #[error("Request to the cluster management endpoint failed")]
    RequestError(#[source] reqwest::Error),
    #[error("Unable to decode the cluster management endpoint response")]
    DecodeError(#[from] serde_json::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}
impl std::fmt::Debug for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            let target = e.url().map(|url| url.to_string()).unwrap_or_default();
            ClientError::ConnectionRefused(target)
        } else {
            ClientError::RequestError(e)
        }
    }
}

impl ClientError {
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, ClientError::ConnectionRefused(_))
    }
}
