//! Skill matrix types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub category: String,
    /// Percentage, 0–100.
    pub level: u8,
    pub years_of_experience: f64,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SkillStats {
    pub total_skills: u32,
    pub categories: u32,
    /// Percentage, 0–100.
    pub average_level: f64,
    pub expert_count: u32,
}
