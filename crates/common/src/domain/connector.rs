use std::fmt;
use thiserror::Error;

pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Failure of a single outbound call, decoded once at the connector boundary.
///
/// Every variant means "upstream unavailable" to callers; the variants only
/// exist so logs say what actually went wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("upstream returned an error: {0}")]
    Upstream(String),

    #[error("invalid response body: {0}")]
    InvalidResponse(String),

    #[error("upstream returned a 'false' result")]
    FalseResult,

    #[error("no recipients")]
    NoRecipients,

    #[error("mail credential unavailable")]
    CredentialUnavailable,
}

/// Upstream dependencies whose health is tracked through an error timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dependency {
    Auth,
    Backend,
    Graph,
    Odoo,
}

impl Dependency {
    /// Key holding the last failure timestamp; empty string means healthy.
    pub fn error_timestamp_key(&self) -> &'static str {
        match self {
            Dependency::Auth => "authErrorTimestamp",
            Dependency::Backend => "backendErrorTimestamp",
            Dependency::Graph => "graphErrorTimestamp",
            Dependency::Odoo => "odooErrorTimestamp",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dependency::Auth => "auth",
            Dependency::Backend => "backend",
            Dependency::Graph => "graph",
            Dependency::Odoo => "odoo",
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_timestamp_keys_are_distinct() {
        let keys = [
            Dependency::Auth.error_timestamp_key(),
            Dependency::Backend.error_timestamp_key(),
            Dependency::Graph.error_timestamp_key(),
            Dependency::Odoo.error_timestamp_key(),
        ];
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }
}
