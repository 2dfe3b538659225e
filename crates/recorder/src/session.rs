use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use common::RecorderError;
use common::log::{debug, error};
use common::tokio::task::JoinHandle;
use storage::FrameStore;

pub(crate) type SharedSession = Arc<Mutex<Session>>;

/// Mutable state of one recording, shared by the lifecycle and the capture loop.
pub(crate) struct Session {
    /// Index the next frame will be written under.
    pub frame: u64,
    pub running: bool,
    /// Bumped on every start; iterations of an earlier run must not touch this one.
    pub generation: u64,
    /// The single pending scheduled iteration.
    pub timer: Option<JoinHandle<()>>,
    pub interval: Duration,
    pub store: FrameStore,
    /// Fatal error of the last run, handed out by the next `stop()`.
    pub failure: Option<RecorderError>,
}

impl Session {
    pub fn new(interval: Duration, store: FrameStore) -> Self {
        Self {
            frame: 0,
            running: false,
            generation: 0,
            timer: None,
            interval,
            store,
            failure: None,
        }
    }

    pub fn shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.running && self.generation == generation
    }

    /// Installs the next pending iteration, aborting any previous one.
    pub fn arm(&mut self, timer: JoinHandle<()>) {
        if let Some(old) = self.timer.replace(timer) {
            old.abort();
        }
    }

    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            debug!("[session] pending capture cancelled");
        }
    }

    /// Stops the run after an unrecoverable error and keeps the error for the caller.
    pub fn fail(&mut self, err: RecorderError) {
        error!("[session] recording aborted: {}", err);
        self.running = false;
        self.cancel_timer();
        self.failure = Some(err);
    }
}

/// The lock is never held across an await; a poisoned guard is still consistent.
pub(crate) fn lock(session: &SharedSession) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}
