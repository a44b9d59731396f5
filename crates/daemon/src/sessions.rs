//! Registry of live sync sessions.
//!
//! Every accepted `/sync` connection registers its [`Syncer`] handle here.
//! The manager's job is bookkeeping, not supervision: sessions close
//! themselves, and the manager just drops handles whose session has ended.

use common::sync::Syncer;
use parking_lot::Mutex;

/// Tracks the sync sessions the server has accepted.
///
/// Registration prunes closed sessions *before* adding the new one, so the
/// list never grows past the number of sessions that were actually alive at
/// last accept. The periodic reconciler nudges whatever is registered; a
/// handle that closed between prunes ignores the nudge harmlessly.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: Mutex<Vec<Syncer>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop handles of sessions that have ended.
    pub fn prune(&self) {
        self.sessions.lock().retain(|s| !s.closed());
    }

    /// Prune, then track a freshly accepted session.
    pub fn register(&self, syncer: Syncer) {
        let mut sessions = self.sessions.lock();
        sessions.retain(|s| !s.closed());
        sessions.push(syncer);
        tracing::debug!(active = sessions.len(), "sync session registered");
    }

    /// Nudge every registered session into a reconciliation pass, in
    /// registration order. Closed sessions ignore the nudge; they stay
    /// listed until the next prune.
    pub fn force_reconcile_all(&self) {
        for session in self.sessions.lock().iter() {
            session.force_reconcile();
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}
