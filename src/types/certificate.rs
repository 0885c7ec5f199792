//! Certification types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Certificate {
    pub id: String,
    pub name: String,
    pub issuer: String,
    pub issue_date: String,
    /// `None` for certificates that never expire.
    pub expiry_date: Option<String>,
    pub credential_id: Option<String>,
    pub credential_url: Option<String>,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CertificateStats {
    pub total: u32,
    pub active: u32,
    pub expired: u32,
    pub issuers: u32,
}
