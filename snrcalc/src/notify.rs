//! Typed change notification and lazy recompute tracking.
//!
//! Parameter objects and spectra own a [`ChangeNotifier`]. Dependents
//! subscribe a weak handle to it and are told what kind of [`Change`]
//! happened. A notification only marks the dependent stale; the actual
//! recompute waits until somebody next asks for data.
//!
//! Every spectrum carries a [`Tracker`], a two-state machine
//! ({Stale, Fresh}) that is itself an observer, so staleness flows through
//! chains of spectra (constituent → composite → consumer) without any of
//! them recomputing eagerly.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// What kind of mutation an observer is being told about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// A physical parameter changed value
    Parameter,
    /// A constituent was added to or removed from a composite
    Membership,
}

/// Receiver of change notifications
pub trait ChangeObserver {
    fn notify(&self, change: Change);
}

/// Downgrade a shared observer into the handle notifiers store
pub fn observer_handle<T: ChangeObserver + 'static>(observer: &Rc<T>) -> Weak<dyn ChangeObserver> {
    Rc::downgrade(observer) as Weak<dyn ChangeObserver>
}

/// Fan-out list of weakly held observers.
///
/// Dropped observers are pruned on the next notification. Observers may
/// subscribe or unsubscribe from inside their own `notify`.
#[derive(Default)]
pub struct ChangeNotifier {
    observers: RefCell<Vec<Weak<dyn ChangeObserver>>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer; subscribing the same handle twice is a no-op
    pub fn subscribe(&self, observer: Weak<dyn ChangeObserver>) {
        let mut observers = self.observers.borrow_mut();
        if !observers.iter().any(|o| Weak::ptr_eq(o, &observer)) {
            observers.push(observer);
        }
    }

    pub fn unsubscribe(&self, observer: &Weak<dyn ChangeObserver>) {
        self.observers
            .borrow_mut()
            .retain(|o| !Weak::ptr_eq(o, observer));
    }

    /// Tell every live observer about a change
    pub fn notify(&self, change: Change) {
        let live: Vec<Rc<dyn ChangeObserver>> = {
            let mut observers = self.observers.borrow_mut();
            observers.retain(|o| o.strong_count() > 0);
            observers.iter().filter_map(Weak::upgrade).collect()
        };
        for observer in live {
            observer.notify(change);
        }
    }

    /// Number of observers still alive
    pub fn observer_count(&self) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter(|o| o.strong_count() > 0)
            .count()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Recompute state of a lazily evaluated quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Stale,
    Fresh,
}

/// Stale/fresh state machine with downstream fan-out.
///
/// Starts stale. [`Tracker::invalidate`] goes stale and tells downstream
/// observers; [`Tracker::expire`] goes stale quietly (used after freeing
/// buffers, which changes no values). Only [`Tracker::mark_fresh`] moves
/// back to fresh.
#[derive(Debug)]
pub struct Tracker {
    state: Cell<Freshness>,
    notifying: Cell<bool>,
    downstream: ChangeNotifier,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker {
    pub fn new() -> Self {
        Self {
            state: Cell::new(Freshness::Stale),
            notifying: Cell::new(false),
            downstream: ChangeNotifier::new(),
        }
    }

    pub fn state(&self) -> Freshness {
        self.state.get()
    }

    pub fn is_stale(&self) -> bool {
        self.state.get() == Freshness::Stale
    }

    /// Go stale and propagate to subscribers
    pub fn invalidate(&self, change: Change) {
        self.state.set(Freshness::Stale);
        // A cycle in the dependency graph stops here
        if self.notifying.replace(true) {
            return;
        }
        self.downstream.notify(change);
        self.notifying.set(false);
    }

    /// Go stale without telling anyone
    pub fn expire(&self) {
        self.state.set(Freshness::Stale);
    }

    pub fn mark_fresh(&self) {
        self.state.set(Freshness::Fresh);
    }

    pub fn subscribe(&self, observer: Weak<dyn ChangeObserver>) {
        self.downstream.subscribe(observer);
    }

    pub fn unsubscribe(&self, observer: &Weak<dyn ChangeObserver>) {
        self.downstream.unsubscribe(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.downstream.observer_count()
    }
}

impl ChangeObserver for Tracker {
    fn notify(&self, change: Change) {
        self.invalidate(change);
    }
}
