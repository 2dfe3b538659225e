//! Latency-compensated capture loop.
//!
//! Each iteration requests one screenshot, measures how long the request took
//! and arms a single-shot timer for the remainder of the frame interval. The
//! timer is armed before the frame is written so disk latency never eats into
//! the next capture's budget. When a capture takes longer than the interval
//! the next one starts immediately; the effective fps drops instead of drifting.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use common::RecorderError;
use common::anyhow::anyhow;
use common::log::{debug, warn};
use common::tokio::task::JoinHandle;
use common::tokio::time::{self, Instant};

use crate::capture::CaptureSource;
use crate::session::{SharedSession, lock};

type Iteration = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Spawns one iteration plus a supervisor that turns a panic inside it into a
/// capture failure of the run.
pub(crate) fn spawn_iteration(
    session: SharedSession,
    source: Arc<dyn CaptureSource>,
    generation: u64,
) -> JoinHandle<()> {
    let iteration = common::tokio::spawn(run_iteration(session.clone(), source, generation));
    common::tokio::spawn(async move {
        let err = match iteration.await {
            Ok(()) => return,
            Err(err) if err.is_panic() => err,
            Err(_) => return,
        };
        let reason = panic_message(err.into_panic());
        let mut state = lock(&session);
        if state.is_current(generation) {
            state.fail(RecorderError::Capture(anyhow!(
                "capture source panicked: {}",
                reason
            )));
        } else {
            warn!("[scheduler] capture panicked after stop: {}", reason);
        }
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => message.to_string(),
            Err(_) => "unknown panic".to_string(),
        },
    }
}

/// One capture / measure / reschedule / persist cycle.
pub(crate) fn run_iteration(
    session: SharedSession,
    source: Arc<dyn CaptureSource>,
    generation: u64,
) -> Iteration {
    Box::pin(async move {
        let t0 = Instant::now();
        let result = source.take_screenshot().await;
        let elapsed = t0.elapsed();

        let mut state = lock(&session);
        if !state.is_current(generation) {
            match result {
                Ok(_) => debug!("[scheduler] capture finished after stop, discarded"),
                Err(e) => warn!("[scheduler] capture failed after stop: {:#}", e),
            }
            return;
        }

        let png = match result {
            Ok(png) => png,
            Err(e) => {
                state.fail(RecorderError::Capture(e));
                return;
            }
        };

        let delay = state.interval.saturating_sub(elapsed);
        let timer = arm_timer(session.clone(), source, generation, delay);
        state.arm(timer);

        let index = state.frame;
        match state.store.write_frame(index, &png) {
            Ok(_) => state.frame += 1,
            Err(e) => state.fail(e),
        }
        debug!(
            "[scheduler] frame {} took {:?}, next capture in {:?}",
            index, elapsed, delay
        );
    })
}

/// Single-shot timer: after `delay`, start the next iteration of the same run.
fn arm_timer(
    session: SharedSession,
    source: Arc<dyn CaptureSource>,
    generation: u64,
    delay: Duration,
) -> JoinHandle<()> {
    common::tokio::spawn(async move {
        time::sleep(delay).await;
        {
            let mut state = lock(&session);
            if !state.is_current(generation) {
                return;
            }
            state.timer = None;
        }
        spawn_iteration(session, source, generation);
    })
}
