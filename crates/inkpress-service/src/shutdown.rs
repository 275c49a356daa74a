use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::{Notify, watch};

/// Shared state for tracking shutdown status and in-flight requests
#[derive(Clone)]
pub struct ShutdownState {
    is_shutting_down: Arc<AtomicBool>,
    in_flight_count: Arc<AtomicUsize>,
    idle: Arc<Notify>,
    signal: watch::Sender<bool>,
}

impl ShutdownState {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            is_shutting_down: Arc::new(AtomicBool::new(false)),
            in_flight_count: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
            signal,
        }
    }

    /// Signal that shutdown has started
    pub fn start_shutdown(&self) {
        self.is_shutting_down.store(true, Ordering::SeqCst);
        self.signal.send_replace(true);
        self.idle.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::SeqCst)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight_count.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has started. Long-lived responses (event streams)
    /// end on this so the server can drain.
    pub fn wait_for_shutdown(&self) -> impl Future<Output = ()> + Send + use<> {
        let mut receiver = self.signal.subscribe();
        async move {
            let _ = receiver.wait_for(|started| *started).await;
        }
    }

    /// Resolves when shutdown has started and every tracked request has finished.
    pub fn completed(&self) -> impl Future<Output = ()> + Send + use<> {
        let state = self.clone();
        async move {
            loop {
                let notified = state.idle.notified();
                if state.is_shutting_down() && state.in_flight_count() == 0 {
                    return;
                }
                notified.await;
            }
        }
    }

    fn track(&self) -> InFlightGuard {
        self.in_flight_count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            state: self.clone(),
        }
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlightGuard {
    state: ShutdownState,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.state.in_flight_count.fetch_sub(1, Ordering::SeqCst);
        self.state.idle.notify_waiters();
    }
}

/// Rejects new requests with 503 once shutdown starts; counts the rest until their
/// response head is produced.
pub async fn graceful_shutdown(
    State(state): State<ShutdownState>,
    request: Request,
    next: Next,
) -> Response {
    if state.is_shutting_down() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let _guard = state.track();
    next.run(request).await
}
