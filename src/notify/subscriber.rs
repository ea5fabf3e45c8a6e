//! Long-lived subscriptions over successive reload tokens.

use super::{ChangeRegistration, ReloadToken};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Producer = Box<dyn Fn() -> Option<ReloadToken> + Send + Sync>;
type Consumer = Box<dyn Fn() + Send + Sync>;

/// Handle for a subscription created by [`on_change`].
///
/// When the handle is dropped, the subscription stops following new tokens
/// and its pending callback is removed from the current token.
pub struct ChangeSubscription {
    state: Arc<SubscriptionState>,
}

struct SubscriptionState {
    producer: Producer,
    consumer: Consumer,
    current: Mutex<Option<ChangeRegistration>>,
    disposed: AtomicBool,
}

impl ChangeSubscription {
    /// Stop the subscription now. Equivalent to dropping the handle.
    pub fn dispose(self) {}
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.state.disposed.store(true, Ordering::Release);
        let registration = self.state.current.lock().take();
        drop(registration);
    }
}

/// Invoke `consumer` every time the token returned by `producer` fires.
///
/// After each notification the producer is asked for a fresh token, so a
/// subscriber keeps observing changes across token swaps. A producer that
/// returns `None` ends the chain.
///
/// # Examples
///
/// ```rust
/// use layered_config::core::{Configuration, ConfigurationManager};
/// use layered_config::notify::on_change;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// # fn example() -> layered_config::error::Result<()> {
/// let config = ConfigurationManager::new();
/// let reloads = Arc::new(AtomicUsize::new(0));
///
/// let watched = config.clone();
/// let reloads_clone = Arc::clone(&reloads);
/// let _subscription = on_change(
///     move || Some(watched.reload_token()),
///     move || {
///         reloads_clone.fetch_add(1, Ordering::SeqCst);
///     },
/// );
///
/// config.reload()?;
/// config.reload()?;
/// assert_eq!(reloads.load(Ordering::SeqCst), 2);
/// # Ok(())
/// # }
/// ```
pub fn on_change<P, C>(producer: P, consumer: C) -> ChangeSubscription
where
    P: Fn() -> Option<ReloadToken> + Send + Sync + 'static,
    C: Fn() + Send + Sync + 'static,
{
    let state = Arc::new(SubscriptionState {
        producer: Box::new(producer),
        consumer: Box::new(consumer),
        current: Mutex::new(None),
        disposed: AtomicBool::new(false),
    });
    subscribe(&state);
    ChangeSubscription { state }
}

fn subscribe(state: &Arc<SubscriptionState>) {
    if state.disposed.load(Ordering::Acquire) {
        return;
    }
    let Some(token) = (state.producer)() else {
        return;
    };

    let weak = Arc::downgrade(state);
    let registration = token.register(move || {
        let Some(state) = weak.upgrade() else {
            return;
        };
        if state.disposed.load(Ordering::Acquire) {
            return;
        }
        (state.consumer)();
        subscribe(&state);
    });

    let mut current = state.current.lock();
    // A spent token means the callback already ran and subscribed to the
    // successor; keep that newer registration.
    if !token.has_changed() && !state.disposed.load(Ordering::Acquire) {
        *current = Some(registration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_swap::ArcSwap;
    use std::sync::atomic::AtomicUsize;

    use crate::notify::TokenState;

    struct Swapper {
        slot: ArcSwap<TokenState>,
    }

    impl Swapper {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                slot: ArcSwap::from_pointee(TokenState::new()),
            })
        }

        fn token(&self) -> ReloadToken {
            ReloadToken::from_state(self.slot.load_full())
        }

        fn change(&self) {
            let previous = self.slot.swap(Arc::new(TokenState::new()));
            ReloadToken::from_state(previous).fire();
        }
    }

    #[test]
    fn test_follows_successive_tokens() {
        let swapper = Swapper::new();
        let count = Arc::new(AtomicUsize::new(0));

        let producer = Arc::clone(&swapper);
        let count_clone = Arc::clone(&count);
        let _subscription = on_change(
            move || Some(producer.token()),
            move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
            },
        );

        swapper.change();
        swapper.change();
        swapper.change();
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(swapper.token().callback_count(), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let swapper = Swapper::new();
        let count = Arc::new(AtomicUsize::new(0));

        let producer = Arc::clone(&swapper);
        let count_clone = Arc::clone(&count);
        let subscription = on_change(
            move || Some(producer.token()),
            move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
            },
        );

        swapper.change();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        drop(subscription);
        assert_eq!(swapper.token().callback_count(), 0);

        swapper.change();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_token_ends_chain() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let subscription = on_change(
            || None,
            move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
            },
        );

        assert!(subscription.state.current.lock().is_none());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
