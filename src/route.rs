//! Route-context derivation.
//!
//! The host application pushes navigation-completed paths into
//! [`RouteTracker::navigate`]; the tracker derives a coarse page label that
//! namespaces cache keys. A change of label is the signal for a full cache
//! clear (performed by the executor, not here).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse page category derived from a navigation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteContext {
    #[default]
    Home,
    Projects,
    Skills,
    About,
    Contact,
    Other,
}

impl RouteContext {
    /// Derive the context for a path.
    ///
    /// First match wins, case-sensitive substring test: `/contact`,
    /// `/projects`, `/skills`, `/about`; then `""` or `"/"` is home and
    /// anything else is other. Never fails.
    ///
    /// ```rust
    /// # use folio::RouteContext;
    /// assert_eq!(RouteContext::from_path("/projects/42"), RouteContext::Projects);
    /// assert_eq!(RouteContext::from_path("/"), RouteContext::Home);
    /// assert_eq!(RouteContext::from_path("/blog"), RouteContext::Other);
    /// ```
    pub fn from_path(path: &str) -> Self {
        if path.contains("/contact") {
            RouteContext::Contact
        } else if path.contains("/projects") {
            RouteContext::Projects
        } else if path.contains("/skills") {
            RouteContext::Skills
        } else if path.contains("/about") {
            RouteContext::About
        } else if path.is_empty() || path == "/" {
            RouteContext::Home
        } else {
            RouteContext::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteContext::Home => "home",
            RouteContext::Projects => "projects",
            RouteContext::Skills => "skills",
            RouteContext::About => "about",
            RouteContext::Contact => "contact",
            RouteContext::Other => "other",
        }
    }
}

impl fmt::Display for RouteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current raw route and its derived context.
#[derive(Debug, Clone)]
pub struct RouteTracker {
    current_route: String,
    context: RouteContext,
}

impl Default for RouteTracker {
    fn default() -> Self {
        Self {
            current_route: "/".to_string(),
            context: RouteContext::Home,
        }
    }
}

impl RouteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed navigation.
    ///
    /// Returns the previous context when the derived context changed,
    /// `None` when it stayed the same.
    pub fn navigate(&mut self, path: &str) -> Option<RouteContext> {
        let next = RouteContext::from_path(path);
        self.current_route = path.to_string();
        if next == self.context {
            return None;
        }
        let previous = self.context;
        self.context = next;
        Some(previous)
    }

    pub fn current_route(&self) -> &str {
        &self.current_route
    }

    pub fn context(&self) -> RouteContext {
        self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_wins() {
        // contact is tested before projects
        assert_eq!(
            RouteContext::from_path("/projects/contact"),
            RouteContext::Contact
        );
        assert_eq!(
            RouteContext::from_path("/skills/about"),
            RouteContext::Skills
        );
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(RouteContext::from_path("/Projects"), RouteContext::Other);
    }

    #[test]
    fn empty_and_root_are_home() {
        assert_eq!(RouteContext::from_path(""), RouteContext::Home);
        assert_eq!(RouteContext::from_path("/"), RouteContext::Home);
        assert_eq!(RouteContext::from_path("//"), RouteContext::Other);
        assert_eq!(RouteContext::from_path("?q=1"), RouteContext::Other);
    }

    #[test]
    fn navigate_reports_context_changes_only() {
        let mut tracker = RouteTracker::new();
        assert_eq!(tracker.context(), RouteContext::Home);

        assert_eq!(tracker.navigate("/projects"), Some(RouteContext::Home));
        assert_eq!(tracker.navigate("/projects/42"), None);
        assert_eq!(tracker.current_route(), "/projects/42");
        assert_eq!(tracker.navigate("/contact"), Some(RouteContext::Projects));
        assert_eq!(tracker.context(), RouteContext::Contact);
    }
}
