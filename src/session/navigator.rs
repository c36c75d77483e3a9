use std::sync::{PoisonError, RwLock};
use tracing::info;

/// Receives route changes requested by the client, e.g. the forced logout on 401.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn navigate(&self, route: &str) {
        self(route)
    }
}

/// Default navigator for headless use: it only logs.
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &str) {
        info!(route, "navigation requested");
    }
}

/// Keeps every requested route; handy for tests and for hosts that poll.
#[derive(Default)]
pub struct RecordingNavigator {
    routes: RwLock<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<String> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<String> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route.to_string());
    }
}
