use crate::models::Id;

/// Failures of a synchronization pass, a report, or a single upstream request.
///
/// Upstream variants are caught per page or per collection and reported
/// in-band; only credential, lookup and persistence failures abort a pass.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("user {0} has no Nesten API key configured")]
    MissingCredential(Id),

    #[error("user not found: {0}")]
    UserNotFound(Id),

    #[error("customer not found: {0}")]
    CustomerNotFound(Id),

    #[error("upstream request failed ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream transport error: {0}")]
    Transport(String),

    #[error("failed to decode upstream response: {0}")]
    Decode(String),

    #[error("failed to persist sync results: {0:#}")]
    Persistence(anyhow::Error),
}

impl SyncError {
    /// Stable machine-readable name, used as the `error` field of API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::MissingCredential(_) => "missing_credential",
            SyncError::UserNotFound(_) => "user_not_found",
            SyncError::CustomerNotFound(_) => "customer_not_found",
            SyncError::Upstream { .. } => "upstream_error",
            SyncError::Timeout => "upstream_timeout",
            SyncError::Transport(_) => "upstream_transport",
            SyncError::Decode(_) => "upstream_decode",
            SyncError::Persistence(_) => "persistence_error",
        }
    }

    /// True for failures that originate from the remote API rather than from
    /// local state.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            SyncError::Upstream { .. }
                | SyncError::Timeout
                | SyncError::Transport(_)
                | SyncError::Decode(_)
        )
    }
}
