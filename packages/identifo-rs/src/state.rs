//! Observable authentication state.
//!
//! # Guarantees
//!
//! - **Single slot**: exactly one current value; publishing replaces it
//! - **Immediate replay**: a new subscription yields the current value first
//! - **Non-blocking fan-out**: a slow subscriber never blocks publication or
//!   other subscribers — an observer that falls behind skips straight to the
//!   latest value rather than draining missed intermediates

use tokio::sync::watch;

use crate::types::AuthState;

/// Hot single-slot broadcast of the current [`AuthState`].
///
/// The stream is initialized at construction and updated only by the session
/// manager's commit/clear steps. Clones share the same slot.
///
/// # Example
///
/// ```ignore
/// let mut subscription = auth.auth_state().subscribe();
///
/// // First value arrives immediately: the state current at subscribe time.
/// while let Some(state) = subscription.next().await {
///     println!("auth state: {state:?}");
/// }
/// ```
#[derive(Clone)]
pub struct AuthStateStream {
    sender: watch::Sender<AuthState>,
}

impl AuthStateStream {
    pub(crate) fn new(initial: AuthState) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Synchronous read of the current state.
    pub fn current(&self) -> AuthState {
        self.sender.borrow().clone()
    }

    /// Replace the current state and wake every subscriber.
    pub(crate) fn publish(&self, state: AuthState) {
        self.sender.send_replace(state);
    }

    /// Subscribe to state changes.
    ///
    /// The subscription yields the current value immediately, then every
    /// subsequently published value in publish order, for its lifetime.
    pub fn subscribe(&self) -> AuthStateSubscription {
        let mut receiver = self.sender.subscribe();
        // Make the first `next()` resolve with the value current right now.
        receiver.mark_changed();
        AuthStateSubscription { receiver }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl std::fmt::Debug for AuthStateStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStateStream")
            .field("current", &*self.sender.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// A live subscription to an [`AuthStateStream`].
pub struct AuthStateSubscription {
    receiver: watch::Receiver<AuthState>,
}

impl AuthStateSubscription {
    /// Wait for the next state.
    ///
    /// The first call resolves immediately with the value current at
    /// subscription time. Returns `None` once the stream is gone.
    pub async fn next(&mut self) -> Option<AuthState> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// The latest published value, without waiting.
    pub fn latest(&self) -> AuthState {
        self.receiver.borrow().clone()
    }
}
