//! Single-use reload tokens.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Callback = Box<dyn FnOnce() + Send>;

/// Shared state behind a [`ReloadToken`].
///
/// Owners that swap tokens (the configuration root, providers) keep this in an
/// `ArcSwap` slot and hand out [`ReloadToken`] handles that point at it.
pub struct TokenState {
    fired: AtomicBool,
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, Callback)>>,
}

impl TokenState {
    /// Create an unfired token.
    pub fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
            callbacks: Mutex::new(Vec::new()),
        }
    }
}

impl Default for TokenState {
    fn default() -> Self {
        Self::new()
    }
}

/// A one-shot change notification.
///
/// A token fires at most once. Callbacks registered before the change run
/// exactly once when it fires; callbacks registered afterwards run
/// immediately. To observe the next change, ask the owner for its current
/// token again.
///
/// # Examples
///
/// ```rust
/// use layered_config::notify::ReloadToken;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let token = ReloadToken::new();
/// let hits = Arc::new(AtomicUsize::new(0));
/// let hits_clone = Arc::clone(&hits);
/// let _registration = token.register(move || {
///     hits_clone.fetch_add(1, Ordering::SeqCst);
/// });
///
/// token.fire();
/// token.fire();
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// assert!(token.has_changed());
/// ```
#[derive(Clone)]
pub struct ReloadToken {
    state: Arc<TokenState>,
}

impl ReloadToken {
    /// Create a fresh, unfired token.
    pub fn new() -> Self {
        Self {
            state: Arc::new(TokenState::new()),
        }
    }

    /// Wrap token state owned by a swap slot.
    pub fn from_state(state: Arc<TokenState>) -> Self {
        Self { state }
    }

    /// Whether the change this token represents has happened.
    pub fn has_changed(&self) -> bool {
        self.state.fired.load(Ordering::Acquire)
    }

    /// Register a callback to run when the token fires.
    ///
    /// Dropping the returned registration removes the callback if it has not
    /// run yet.
    pub fn register<F>(&self, callback: F) -> ChangeRegistration
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut callbacks = self.state.callbacks.lock();
            // Checked under the lock so a concurrent `fire` cannot miss us.
            if !self.state.fired.load(Ordering::Acquire) {
                callbacks.push((id, Box::new(callback)));
                return ChangeRegistration {
                    id,
                    state: Arc::downgrade(&self.state),
                };
            }
        }

        callback();
        ChangeRegistration {
            id,
            state: Weak::new(),
        }
    }

    /// Fire the token, running every registered callback once.
    ///
    /// Callbacks run on the calling thread after the registration list has
    /// been released. Firing a spent token does nothing.
    pub fn fire(&self) {
        let callbacks = {
            let mut callbacks = self.state.callbacks.lock();
            if self.state.fired.swap(true, Ordering::AcqRel) {
                return;
            }
            std::mem::take(&mut *callbacks)
        };

        for (_id, callback) in callbacks {
            callback();
        }
    }

    /// Number of callbacks still waiting on this token.
    pub fn callback_count(&self) -> usize {
        self.state.callbacks.lock().len()
    }

    /// Whether two handles refer to the same token.
    pub fn ptr_eq(&self, other: &ReloadToken) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl Default for ReloadToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReloadToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadToken")
            .field("has_changed", &self.has_changed())
            .field("callbacks", &self.callback_count())
            .finish()
    }
}

/// Handle for a callback registered on a [`ReloadToken`].
///
/// When the handle is dropped, the callback is removed from the token.
pub struct ChangeRegistration {
    id: u64,
    state: Weak<TokenState>,
}

impl ChangeRegistration {
    /// Remove the callback now. Equivalent to dropping the handle.
    pub fn dispose(self) {}
}

impl Drop for ChangeRegistration {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            let id = self.id;
            state.callbacks.lock().retain(|(cb_id, _)| *cb_id != id);
        }
    }
}
