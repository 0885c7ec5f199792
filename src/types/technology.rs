//! Technology stack types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Technology {
    pub id: String,
    pub name: String,
    pub category: String,
    /// Percentage, 0–100.
    pub proficiency: u8,
    pub icon_url: Option<String>,
    pub website_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TechnologyStats {
    pub total: u32,
    pub categories: u32,
    pub average_proficiency: f64,
}
