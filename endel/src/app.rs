//! Application state shared by the menu and the background services.

use std::sync::Arc;

use endel_bridge::store::TaskStore;

use crate::sync::SyncClient;
use crate::timetable::Timetable;

/// Everything a menu session needs.
pub struct App {
    /// The task store, shared with the embedded sync endpoint.
    pub store: Arc<TaskStore>,
    /// Client for the configured peer, if any.
    pub sync: Option<SyncClient>,
    /// Weekly timetable and subject catalog.
    pub timetable: Timetable,
    /// Clear the terminal before drawing the menu.
    pub clear_screen: bool,
}

impl App {
    /// Create an app over `store` with no peer, an empty timetable and
    /// screen clearing off.
    #[must_use]
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self {
            store,
            sync: None,
            timetable: Timetable::default(),
            clear_screen: false,
        }
    }

    /// Set the peer client used by pull and push.
    #[must_use]
    pub fn with_sync(mut self, sync: Option<SyncClient>) -> Self {
        self.sync = sync;
        self
    }

    /// Set the timetable and subject catalog.
    #[must_use]
    pub fn with_timetable(mut self, timetable: Timetable) -> Self {
        self.timetable = timetable;
        self
    }

    /// Enable or disable clearing the screen between menu screens.
    #[must_use]
    pub const fn with_clear_screen(mut self, clear_screen: bool) -> Self {
        self.clear_screen = clear_screen;
        self
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("store", &self.store.path())
            .field("peer", &self.sync.as_ref().map(|s| s.peer().to_string()))
            .field("clear_screen", &self.clear_screen)
            .finish_non_exhaustive()
    }
}
