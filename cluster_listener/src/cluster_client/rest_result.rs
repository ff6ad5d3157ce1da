use serde::Deserialize;
use serde_json::Value;

/// Outcome reported by the management endpoint in the `successStatus` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestStatus {
    Success,
    Failed,
    AuthenticationFailed,
    SecurityCheckFailed,
}

impl RestStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => RestStatus::Success,
            2 => RestStatus::AuthenticationFailed,
            3 => RestStatus::SecurityCheckFailed,
            _ => RestStatus::Failed,
        }
    }
}

/// Response of the management endpoint with the payload kept in its encoded form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestResult {
    pub status: RestStatus,
    pub error: Option<String>,
    /// JSON encoded `response` field.
    pub data: Option<String>,
    pub session_token: Option<String>,
}

impl RestResult {
    pub fn success(data: impl Into<String>) -> Self {
        Self {
            status: RestStatus::Success,
            error: None,
            data: Some(data.into()),
            session_token: None,
        }
    }

    pub fn fail(status: RestStatus, error: impl Into<String>) -> Self {
        Self {
            status,
            error: Some(error.into()),
            data: None,
            session_token: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RestStatus::Success
    }
}

/// Wire form of a management endpoint response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RestEnvelope {
    pub success_status: i32,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub session_token: Option<Value>,
}

impl From<RestEnvelope> for RestResult {
    fn from(envelope: RestEnvelope) -> Self {
        let session_token = match envelope.session_token {
            Some(Value::String(token)) => Some(token),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };

        Self {
            status: RestStatus::from_code(envelope.success_status),
            error: envelope.error,
            data: envelope.response.map(|response| response.to_string()),
            session_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RestEnvelope, RestResult, RestStatus};

    #[test]
    fn converts_successful_envelope() {
        let envelope = serde_json::from_str::<RestEnvelope>(
            r#"{"successStatus":0,"error":null,"response":[{"nodeId":"x"}],"sessionToken":null}"#,
        )
        .unwrap();

        let result = RestResult::from(envelope);

        assert!(result.is_success());
        assert_eq!(result.data.as_deref(), Some(r#"[{"nodeId":"x"}]"#));
        assert!(result.session_token.is_none());
    }

    #[test]
    fn converts_failed_envelope() {
        let envelope = serde_json::from_str::<RestEnvelope>(
            r#"{"successStatus":2,"error":"Failed to authenticate","response":null}"#,
        )
        .unwrap();

        let result = RestResult::from(envelope);

        assert_eq!(result.status, RestStatus::AuthenticationFailed);
        assert_eq!(result.error.as_deref(), Some("Failed to authenticate"));
        assert!(result.data.is_none());
    }

    #[test]
    fn unknown_status_codes_are_failures() {
        assert_eq!(RestStatus::from_code(42), RestStatus::Failed);
    }
}
