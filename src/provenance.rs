//! Identity lookups used when recording and filtering annotation provenance.

use ahash::AHashMap;

use crate::errors::{CatalogError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    /// Agent URI recorded in the provenance chain.
    pub id: String,
    pub display_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoftwareRecord {
    pub id: String,
    pub label: String,
    pub source_uri: String,
}

/// Resolves user and software identifiers to stable agent records. The same
/// identifier must always resolve to the same record.
pub trait IdentityRegistry: Send + Sync {
    fn lookup_user(&self, identifier: &str) -> Result<UserRecord>;
    fn lookup_software(&self, identifier: &str) -> Result<SoftwareRecord>;
}

/// Registry answering from registered records, synthesizing agents under the
/// base URL for identifiers it has not been told about.
#[derive(Clone, Debug, Default)]
pub struct StubRegistry {
    base_url: String,
    users: AHashMap<String, UserRecord>,
    software: AHashMap<String, SoftwareRecord>,
}

impl StubRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            ..Self::default()
        }
    }

    pub fn with_user(mut self, identifier: &str, record: UserRecord) -> Self {
        self.users.insert(identifier.to_string(), record);
        self
    }

    pub fn with_software(mut self, identifier: &str, record: SoftwareRecord) -> Self {
        self.software.insert(identifier.to_string(), record);
        self
    }
}

fn check_identifier(kind: &str, identifier: &str) -> Result<()> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() || trimmed.chars().any(|c| c.is_whitespace() || c == '<' || c == '>') {
        return Err(CatalogError::malformed(format!(
            "invalid {kind} identifier '{identifier}'"
        )));
    }
    Ok(())
}

impl IdentityRegistry for StubRegistry {
    fn lookup_user(&self, identifier: &str) -> Result<UserRecord> {
        if let Some(record) = self.users.get(identifier) {
            return Ok(record.clone());
        }
        check_identifier("user", identifier)?;
        Ok(UserRecord {
            id: format!("{}users/{}", self.base_url, identifier.to_lowercase()),
            display_name: identifier.to_string(),
        })
    }

    fn lookup_software(&self, identifier: &str) -> Result<SoftwareRecord> {
        if let Some(record) = self.software.get(identifier) {
            return Ok(record.clone());
        }
        check_identifier("software", identifier)?;
        let id = format!("{}software/{}", self.base_url, identifier);
        Ok(SoftwareRecord {
            source_uri: id.clone(),
            id,
            label: identifier.to_string(),
        })
    }
}
