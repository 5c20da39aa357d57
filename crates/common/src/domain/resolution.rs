use serde::{Deserialize, Serialize};

/// Notice and voting durations of a resolution type, in seconds.
///
/// The subgraph serializes BigInt fields as strings, so they are kept as
/// strings here and parsed on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionType {
    pub notice_period: String,
    pub voting_period: String,
}

/// Governance proposal tracked through created → approved → voting starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approve_timestamp: Option<String>,
    /// Derived locally as `approve_timestamp + notice_period`; never fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voting_starts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_type: Option<ResolutionType>,
}

impl Resolution {
    /// Seconds since epoch at which voting opens, when the resolution is
    /// approved and carries a parseable notice period.
    pub fn computed_voting_starts(&self) -> Option<i64> {
        let approved_at = self.approve_timestamp.as_deref()?.trim().parse::<i64>().ok()?;
        let notice_period = self
            .resolution_type
            .as_ref()?
            .notice_period
            .trim()
            .parse::<i64>()
            .ok()?;
        approved_at.checked_add(notice_period)
    }

    /// Fills `voting_starts` from the approval data, leaving it untouched
    /// when it cannot be computed.
    pub fn with_computed_voting_starts(mut self) -> Self {
        if let Some(starts) = self.computed_voting_starts() {
            self.voting_starts = Some(starts.to_string());
        }
        self
    }

    /// `voting_starts` as seconds, falling back to the computed value.
    pub fn voting_starts_seconds(&self) -> Option<i64> {
        self.voting_starts
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .or_else(|| self.computed_voting_starts())
    }
}
