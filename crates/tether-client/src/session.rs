use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The signed-in session of an interactive front end
pub trait AuthSession: Send + Sync {
    /// Drop local credentials
    fn logout(&self);
}

/// Route control of an interactive front end
pub trait Navigator: Send + Sync {
    /// Path of the page currently shown
    fn current_route(&self) -> String;

    fn navigate(&self, route: &str);
}

/// Session teardown on `401 Unauthorized`
///
/// Teardown is latched so a burst of overlapping 401s signs out once. The
/// latch re-arms on the next successful response, or explicitly through
/// [`SessionHooks::rearm`] after a fresh login.
pub struct SessionHooks {
    auth: Arc<dyn AuthSession>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
    torn_down: AtomicBool,
}

impl SessionHooks {
    pub fn new(auth: Arc<dyn AuthSession>, navigator: Arc<dyn Navigator>, login_route: impl Into<String>) -> Self {
        Self {
            auth,
            navigator,
            login_route: login_route.into(),
            torn_down: AtomicBool::new(false),
        }
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    /// Whether teardown has fired since the last rearm
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Allow the next 401 to tear the session down again
    pub fn rearm(&self) {
        self.torn_down.store(false, Ordering::Release);
    }

    /// The backend accepted a request, so the next 401 is a new expiry
    pub(crate) fn on_authorized(&self) {
        if self.torn_down.swap(false, Ordering::AcqRel) {
            tracing::debug!("session accepted again, teardown re-armed");
        }
    }

    /// Log out and go to the login route, at most once per latch
    ///
    /// Returns whether teardown ran. Nothing happens while the navigator
    /// already shows the login route.
    pub(crate) fn on_unauthorized(&self) -> bool {
        if self.on_login_route() {
            return false;
        }

        if self.torn_down.swap(true, Ordering::AcqRel) {
            return false;
        }

        tracing::info!(login_route = %self.login_route, "session rejected, signing out");
        self.auth.logout();
        self.navigator.navigate(&self.login_route);

        true
    }

    fn on_login_route(&self) -> bool {
        let route = self.navigator.current_route();
        let path = route.split(['?', '#']).next().unwrap_or_default();

        path.trim_end_matches('/') == self.login_route.trim_end_matches('/')
    }
}

impl std::fmt::Debug for SessionHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHooks")
            .field("login_route", &self.login_route)
            .field("torn_down", &self.is_torn_down())
            .finish_non_exhaustive()
    }
}
