//! The currently selected character.
//!
//! Formulas run against whichever character the user last selected. That
//! selection is owned by the caller as a `CurrentActor` and passed into
//! each dispatch; listeners registered with `on_change` are told about
//! every change (a modifier bucket display refreshing, for instance).

use std::fmt;
use std::sync::Arc;

type Listener<T> = Box<dyn FnMut(Option<&T>)>;

/// Holder of the selected character.
///
/// # Examples
///
/// ```rust
/// use otf_engine::{Character, CurrentActor};
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::sync::Arc;
///
/// let changes = Rc::new(Cell::new(0));
/// let seen = changes.clone();
///
/// let mut current: CurrentActor<Character> = CurrentActor::new();
/// current.on_change(move |_| seen.set(seen.get() + 1));
///
/// let ann = Arc::new(Character::new("Ann"));
/// current.set(ann.clone());
/// assert_eq!(current.get().map(|c| c.name.as_str()), Some("Ann"));
///
/// current.clear(&ann);
/// assert!(current.get().is_none());
/// assert_eq!(changes.get(), 2);
/// ```
pub struct CurrentActor<T> {
    actor: Option<Arc<T>>,
    listeners: Vec<Listener<T>>,
}

impl<T> Default for CurrentActor<T> {
    fn default() -> Self {
        Self {
            actor: None,
            listeners: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for CurrentActor<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentActor")
            .field("actor", &self.actor)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<T> CurrentActor<T> {
    /// Start with nobody selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// The selected character, if any.
    pub fn get(&self) -> Option<&T> {
        self.actor.as_deref()
    }

    /// Select `actor` and notify listeners.
    pub fn set(&mut self, actor: Arc<T>) {
        tracing::debug!("selecting current actor");
        self.actor = Some(actor);
        self.notify();
    }

    /// Deselect `actor` if it is the current one.
    ///
    /// Returns whether anything changed.
    pub fn clear(&mut self, actor: &Arc<T>) -> bool {
        match &self.actor {
            Some(current) if Arc::ptr_eq(current, actor) => {
                tracing::debug!("clearing current actor");
                self.actor = None;
                self.notify();
                true
            }
            _ => false,
        }
    }

    /// Register a listener called after every change.
    pub fn on_change<F>(&mut self, listener: F)
    where
        F: FnMut(Option<&T>) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self) {
        let actor = self.actor.as_deref();
        for listener in &mut self.listeners {
            listener(actor);
        }
    }
}
