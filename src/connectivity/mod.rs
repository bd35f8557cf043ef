//! Connectivity tracking
//!
//! `ConnectivityMonitor` owns the device's online flag. Sessions read it
//! through a cloned `ConnectivityHandle` to pick the online or offline code
//! path. Coming back online triggers a sync of the active session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::backend::Backend;
use crate::session::{JobWorkerSession, SessionError};
use crate::sync::JobSyncReport;

/// Shared, read-mostly view of the online flag
#[derive(Debug, Clone)]
pub struct ConnectivityHandle {
    online: Arc<AtomicBool>,
}

impl ConnectivityHandle {
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Returns the previous value
    fn swap(&self, online: bool) -> bool {
        self.online.swap(online, Ordering::SeqCst)
    }
}

/// Effect of an observation on the online flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    CameOnline,
    WentOffline,
    Unchanged,
}

/// Result of `observe_and_sync`
#[derive(Debug)]
pub struct Reconnect {
    pub transition: Transition,
    /// Present when the transition triggered a sync
    pub sync: Option<Result<JobSyncReport, SessionError>>,
}

/// Tracks online/offline transitions
#[derive(Debug)]
pub struct ConnectivityMonitor {
    handle: ConnectivityHandle,
    last_change: Option<DateTime<Utc>>,
}

impl ConnectivityMonitor {
    pub fn new(online: bool) -> Self {
        Self {
            handle: ConnectivityHandle::new(online),
            last_change: None,
        }
    }

    /// Handle for sessions
    pub fn handle(&self) -> ConnectivityHandle {
        self.handle.clone()
    }

    pub fn is_online(&self) -> bool {
        self.handle.is_online()
    }

    /// When the flag last flipped
    pub fn last_change(&self) -> Option<DateTime<Utc>> {
        self.last_change
    }

    /// Record an online/offline signal
    pub fn observe(&mut self, online: bool) -> Transition {
        let was_online = self.handle.swap(online);
        let transition = match (was_online, online) {
            (false, true) => Transition::CameOnline,
            (true, false) => Transition::WentOffline,
            _ => Transition::Unchanged,
        };
        match transition {
            Transition::CameOnline => info!("connectivity restored"),
            Transition::WentOffline => warn!("connectivity lost, working offline"),
            Transition::Unchanged => return transition,
        }
        self.last_change = Some(Utc::now());
        transition
    }

    /// Record a signal and, on reconnect, sync the session (media flush,
    /// queue drain, reload). Going offline only flips the flag.
    pub fn observe_and_sync(&mut self, online: bool, session: &mut JobWorkerSession) -> Reconnect {
        let transition = self.observe(online);
        let sync = match transition {
            Transition::CameOnline if session.job().is_some() => Some(session.sync()),
            _ => None,
        };
        if let Some(Err(e)) = &sync {
            warn!(error = %e, "sync after reconnect failed");
        }
        Reconnect { transition, sync }
    }

    /// Ping the backend and record the outcome
    pub fn probe(&mut self, backend: &dyn Backend) -> Transition {
        let online = match backend.ping() {
            Ok(()) => true,
            Err(e) if e.is_connectivity() => false,
            // Any answer from the server means the network is there
            Err(_) => true,
        };
        self.observe(online)
    }

    /// `probe` followed by the reconnect sync
    pub fn probe_and_sync(&mut self, backend: &dyn Backend, session: &mut JobWorkerSession) -> Reconnect {
        let online = backend.ping().map_or_else(|e| !e.is_connectivity(), |()| true);
        self.observe_and_sync(online, session)
    }
}
