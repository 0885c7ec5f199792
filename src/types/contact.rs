//! Contact details types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContactInfo {
    pub email: String,
    pub phone: Option<String>,
    pub location: String,
    /// Free-text availability ("Open to opportunities").
    pub availability: String,
    pub preferred_contact: String,
    pub response_time: String,
}
