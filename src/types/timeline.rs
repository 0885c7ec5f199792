//! Career timeline types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineKind {
    #[default]
    Work,
    Education,
    Project,
    Achievement,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    pub title: String,
    pub organization: String,
    pub description: String,
    /// ISO 8601 date (`YYYY-MM` or `YYYY-MM-DD`).
    pub start_date: String,
    pub end_date: Option<String>,
    #[serde(alias = "type")]
    pub kind: TimelineKind,
    pub current: bool,
}
