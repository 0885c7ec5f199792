//! Personal profile types.

use serde::{Deserialize, Serialize};

/// Profile header shown on the home and about pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalInfo {
    pub name: String,
    pub title: String,
    pub bio: String,
    pub email: String,
    pub location: String,
    pub avatar_url: Option<String>,
    pub resume_url: Option<String>,
    pub years_of_experience: u32,
}

/// A headline achievement or figure ("10+ projects shipped").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: Option<String>,
    pub metric: Option<String>,
}

/// Link to a profile on an external platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SocialLink {
    pub platform: String,
    pub url: String,
    pub username: Option<String>,
}
