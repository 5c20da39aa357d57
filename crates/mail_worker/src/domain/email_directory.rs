use common::domain::IdentityRecord;
use std::collections::HashMap;

/// Lowercase address to email mapping, rebuilt on every invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailDirectory {
    emails: HashMap<String, String>,
}

impl EmailDirectory {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the directory, skipping records without an address or email.
    /// When an address appears twice the later record wins.
    pub fn from_identities(records: impl IntoIterator<Item = IdentityRecord>) -> Self {
        let emails = records
            .into_iter()
            .filter(|record| !record.address.trim().is_empty() && !record.email.trim().is_empty())
            .map(|record| (record.address.trim().to_lowercase(), record.email.trim().to_string()))
            .collect();
        Self { emails }
    }

    /// Email registered for `address`, compared case-insensitively.
    pub fn resolve(&self, address: &str) -> Option<&str> {
        self.emails
            .get(&address.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Recipients for an entity's address; empty when unknown.
    pub fn recipients_for(&self, address: Option<&str>) -> Vec<String> {
        address
            .and_then(|address| self.resolve(address))
            .map(|email| vec![email.to_string()])
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}
