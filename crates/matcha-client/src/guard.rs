//! Route guards.
//!
//! A guard is a pure function of the current [`SessionView`] and the
//! requested path. It never calls the network; re-evaluating after every
//! session change is the caller's job.

use tracing::debug;
use url::form_urlencoded;

use crate::state::SessionView;

/// Paths the guards need to know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConfig {
    pub login: String,
    pub register: String,
    /// Where users with an incomplete profile are sent.
    pub profile_editor: String,
    pub logout: String,
    /// Where authenticated users are sent from guest-only screens.
    pub default_landing: String,
    /// Login/registration screens; authenticated users are bounced.
    pub guest_only: Vec<String>,
    /// Protected screens reachable with an incomplete profile.
    pub exempt: Vec<String>,
    /// Screens reachable by anyone (email verification, password reset).
    pub public: Vec<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            login: "/login".into(),
            register: "/register".into(),
            profile_editor: "/me".into(),
            logout: "/logout".into(),
            default_landing: "/discover".into(),
            guest_only: vec!["/login".into(), "/register".into()],
            exempt: vec!["/me".into(), "/logout".into()],
            public: vec!["/verify".into(), "/reset-password".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    /// Session still loading; show a placeholder, decide later.
    ShowLoading,
    Redirect(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Protected,
    GuestOnly,
    Public,
}

#[derive(Debug, Clone, Default)]
pub struct RouteGuard {
    routes: RouteConfig,
}

impl RouteGuard {
    pub fn new(routes: RouteConfig) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &RouteConfig {
        &self.routes
    }

    pub fn access_for(&self, requested: &str) -> Access {
        let path = path_of(requested);
        if matches_any(path, &self.routes.public) {
            Access::Public
        } else if matches_any(path, &self.routes.guest_only) {
            Access::GuestOnly
        } else {
            Access::Protected
        }
    }

    pub fn evaluate(&self, session: &SessionView, requested: &str) -> GuardDecision {
        match self.access_for(requested) {
            Access::Public => GuardDecision::Render,
            Access::GuestOnly => self.guest_only(session),
            Access::Protected => self.protected(session, requested),
        }
    }

    pub fn protected(&self, session: &SessionView, requested: &str) -> GuardDecision {
        if session.is_loading() {
            return GuardDecision::ShowLoading;
        }
        if !session.is_authenticated() {
            return GuardDecision::Redirect(self.login_redirect(requested));
        }

        let exempt = matches_any(path_of(requested), &self.routes.exempt);
        match session.completeness() {
            Some(completeness) if !exempt && !completeness.is_complete() => {
                debug!(
                    path = requested,
                    missing = ?completeness.missing(),
                    "Profile incomplete; redirecting to editor"
                );
                GuardDecision::Redirect(format!(
                    "{}?incomplete=true",
                    self.routes.profile_editor
                ))
            }
            _ => GuardDecision::Render,
        }
    }

    pub fn guest_only(&self, session: &SessionView) -> GuardDecision {
        if session.is_authenticated() {
            GuardDecision::Redirect(self.routes.default_landing.clone())
        } else {
            GuardDecision::Render
        }
    }

    /// Login path carrying the originally requested location.
    pub fn login_redirect(&self, requested: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(requested.as_bytes()).collect();
        format!("{}?redirect={}", self.routes.login, encoded)
    }
}

fn path_of(requested: &str) -> &str {
    let end = requested.find(['?', '#']).unwrap_or(requested.len());
    &requested[..end]
}

/// Segment-aware prefix match: `/me` matches `/me` and `/me/photos` but
/// not `/menu`.
pub fn path_matches(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn matches_any(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| path_matches(path, p))
}
