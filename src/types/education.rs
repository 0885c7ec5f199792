//! Education history types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Education {
    pub id: String,
    pub institution: String,
    pub degree: String,
    pub field: String,
    pub start_date: String,
    /// `None` while still enrolled.
    pub end_date: Option<String>,
    /// On a 4.0 scale.
    pub gpa: Option<f64>,
    pub achievements: Vec<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EducationStats {
    pub total_degrees: u32,
    pub institutions: u32,
    pub average_gpa: f64,
}
