use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub type BoolFeedback = Feedback<bool>;
pub type IntFeedback = Feedback<u32>;
pub type StringFeedback = Feedback<String>;

type ValueFn<T> = Box<dyn Fn() -> T + Send + Sync>;
type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`Feedback::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// An observable value computed on demand.
///
/// `value()` always evaluates the value function against live state.
/// `fire_update()` evaluates it, remembers the result and notifies observers
/// when it differs from the previously fired value.
pub struct Feedback<T> {
    key: String,
    value_fn: ValueFn<T>,
    last_fired: Mutex<Option<T>>,
    observers: Mutex<Vec<(SubscriptionId, Observer<T>)>>,
    next_subscription: AtomicU64,
}

impl<T> Feedback<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    pub fn new(key: impl Into<String>, value_fn: impl Fn() -> T + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            key: key.into(),
            value_fn: Box::new(value_fn),
            last_fired: Mutex::new(None),
            observers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> T {
        (self.value_fn)()
    }

    /// Value observers were last notified with, if ever fired
    pub fn last_fired(&self) -> Option<T> {
        self.last_fired.lock().clone()
    }

    /// Re-evaluate and notify observers on change. Returns true if observers
    /// were notified.
    pub fn fire_update(&self) -> bool {
        let value = self.value();
        {
            let mut last = self.last_fired.lock();
            if last.as_ref() == Some(&value) {
                return false;
            }
            *last = Some(value.clone());
        }

        // Observers may subscribe or fire other feedbacks, so call them unlocked
        let observers: Vec<Observer<T>> = self
            .observers
            .lock()
            .iter()
            .map(|(_, o)| o.clone())
            .collect();
        for observer in observers {
            observer(&value);
        }
        true
    }

    pub fn subscribe(&self, observer: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Arc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(sid, _)| *sid != id);
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }
}

impl<T: fmt::Debug> fmt::Debug for Feedback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feedback")
            .field("key", &self.key)
            .field("last_fired", &*self.last_fired.lock())
            .field("observers", &self.observers.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;

    #[test]
    fn test_value_is_live() {
        let state = Arc::new(RwLock::new(1u32));
        let fb = IntFeedback::new("count", {
            let state = state.clone();
            move || *state.read()
        });
        assert_eq!(fb.value(), 1);
        *state.write() = 7;
        assert_eq!(fb.value(), 7);
        assert_eq!(fb.last_fired(), None);
    }

    #[test]
    fn test_fire_update_notifies_on_change_only() {
        let state = Arc::new(RwLock::new(String::from("a")));
        let fb = StringFeedback::new("name", {
            let state = state.clone();
            move || state.read().clone()
        });
        let seen = Arc::new(Mutex::new(Vec::new()));
        fb.subscribe({
            let seen = seen.clone();
            move |v: &String| seen.lock().push(v.clone())
        });

        assert!(fb.fire_update());
        assert!(!fb.fire_update());
        *state.write() = "b".to_string();
        assert!(fb.fire_update());

        assert_eq!(*seen.lock(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(fb.last_fired(), Some("b".to_string()));
    }

    #[test]
    fn test_unsubscribe() {
        let flag = Arc::new(RwLock::new(false));
        let fb = BoolFeedback::new("flag", {
            let flag = flag.clone();
            move || *flag.read()
        });
        let hits = Arc::new(AtomicU64::new(0));
        let id = fb.subscribe({
            let hits = hits.clone();
            move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        });
        fb.fire_update();
        assert!(fb.unsubscribe(id));
        assert!(!fb.unsubscribe(id));
        *flag.write() = true;
        fb.fire_update();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(fb.observer_count(), 0);
    }

    #[test]
    fn test_observer_may_subscribe_while_notified() {
        let fb = BoolFeedback::new("flag", || true);
        let inner = fb.clone();
        fb.subscribe(move |_| {
            inner.subscribe(|_| {});
        });
        assert!(fb.fire_update());
        assert_eq!(fb.observer_count(), 2);
    }
}
