//! Recording stand-ins for the interactive session

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tether_client::{AuthSession, Navigator};

/// Counts logouts and remembers every navigation
pub struct RecordingSession {
    logouts: AtomicUsize,
    route: Mutex<String>,
    navigations: Mutex<Vec<String>>,
}

impl RecordingSession {
    pub fn at(route: &str) -> Self {
        Self {
            logouts: AtomicUsize::new(0),
            route: Mutex::new(route.to_owned()),
            navigations: Mutex::new(Vec::new()),
        }
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    /// Move to `route` without recording a navigation, as after a login
    pub fn visit(&self, route: &str) {
        route.clone_into(&mut self.route.lock().unwrap());
    }
}

impl AuthSession for RecordingSession {
    fn logout(&self) {
        self.logouts.fetch_add(1, Ordering::SeqCst);
    }
}

impl Navigator for RecordingSession {
    fn current_route(&self) -> String {
        self.route.lock().unwrap().clone()
    }

    fn navigate(&self, route: &str) {
        self.navigations.lock().unwrap().push(route.to_owned());
        self.visit(route);
    }
}
