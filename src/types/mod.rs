//! Portfolio data types, as served by the backend (camelCase JSON).
//!
//! Every type is `#[serde(default)]`: validators repair payloads before
//! deserialisation, and whatever they leave missing takes the zero value.

mod certificate;
mod contact;
mod education;
mod personal;
mod project;
mod skill;
mod technology;
mod timeline;
mod volunteer;

pub use certificate::{Certificate, CertificateStats};
pub use contact::ContactInfo;
pub use education::{Education, EducationStats};
pub use personal::{Highlight, PersonalInfo, SocialLink};
pub use project::{Project, ProjectStats, ProjectStatus};
pub use skill::{Skill, SkillStats};
pub use technology::{Technology, TechnologyStats};
pub use timeline::{TimelineEvent, TimelineKind};
pub use volunteer::{VolunteerExperience, VolunteerStats};
