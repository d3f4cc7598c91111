//! Scoped stores: keyed, lazily initialized mutable cells with explicit
//! lifespan and scope visibility.
//!
//! Stores keep cross-invocation state for generators and action chains.
//! They are consumed through a narrow contract: lazy `get`, transactional
//! `update`, idempotent `reset`.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};

/// How long a stored value lives before the surrounding lifecycle resets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifespan {
    /// Until the whole run finishes
    Run,
    /// Until the current property finishes
    Property,
    /// Until the current try finishes
    Try,
}

/// A node in the scope tree.
///
/// A store is visible to a retriever scope iff the retriever is the store's
/// scope or one of its descendants, decided by walking parent links up to
/// the root.
#[derive(Clone)]
pub struct Scope {
    node: Arc<ScopeNode>,
}

struct ScopeNode {
    label: String,
    parent: Option<Scope>,
}

impl Scope {
    /// Create a root scope.
    pub fn root(label: impl Into<String>) -> Self {
        Self {
            node: Arc::new(ScopeNode {
                label: label.into(),
                parent: None,
            }),
        }
    }

    /// Create a child of this scope.
    pub fn child(&self, label: impl Into<String>) -> Self {
        Self {
            node: Arc::new(ScopeNode {
                label: label.into(),
                parent: Some(self.clone()),
            }),
        }
    }

    /// This scope's label.
    pub fn label(&self) -> &str {
        &self.node.label
    }

    /// The full path from the root to this scope.
    pub fn path(&self) -> String {
        match &self.node.parent {
            Some(parent) => format!("{}/{}", parent.path(), self.node.label),
            None => self.node.label.clone(),
        }
    }

    fn same_as(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Whether `self` equals `ancestor` or descends from it.
    pub fn is_or_descends_from(&self, ancestor: &Scope) -> bool {
        if self.same_as(ancestor) {
            return true;
        }
        match &self.node.parent {
            Some(parent) => parent.is_or_descends_from(ancestor),
            None => false,
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({})", self.path())
    }
}

/// Capability for values that want to release resources when their store is
/// reset.
///
/// Whether a stored value offers this is decided at the store's construction
/// site via [`ScopedStore::with_close_on_reset`]; there is no runtime type
/// probing.
pub trait CloseOnReset {
    /// Release resources held by this value.
    fn close(&mut self);
}

enum Slot<T> {
    Uninitialized,
    Initialized(T),
}

/// A lazily initialized mutable cell addressed by identifier, lifespan and
/// scope.
///
/// All access goes through one lock: `get` initializes at most once per
/// scope lifetime, `update` is a transactional read-modify-write, and
/// `reset` clears the slot so memory is released promptly. Close hook
/// failures during reset are logged and swallowed; resetting always
/// succeeds from the caller's point of view.
pub struct ScopedStore<T> {
    identifier: String,
    lifespan: Lifespan,
    scope: Scope,
    initializer: Arc<dyn Fn() -> T + Send + Sync>,
    closer: Option<Arc<dyn Fn(&mut T) + Send + Sync>>,
    slot: Mutex<Slot<T>>,
}

impl<T: Clone> ScopedStore<T> {
    /// Create a store whose value needs no release on reset.
    pub fn new(
        identifier: impl Into<String>,
        lifespan: Lifespan,
        scope: Scope,
        initializer: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            lifespan,
            scope,
            initializer: Arc::new(initializer),
            closer: None,
            slot: Mutex::new(Slot::Uninitialized),
        }
    }

    /// Create a store that closes its value on every reset.
    pub fn with_close_on_reset(
        identifier: impl Into<String>,
        lifespan: Lifespan,
        scope: Scope,
        initializer: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self
    where
        T: CloseOnReset,
    {
        let mut store = Self::new(identifier, lifespan, scope, initializer);
        store.closer = Some(Arc::new(|value: &mut T| value.close()));
        store
    }

    /// Get the stored value, initializing it on first access.
    ///
    /// Thread-safe; exactly one initialization happens per scope lifetime.
    pub fn get(&self) -> T {
        let mut slot = self.slot.lock().unwrap();
        self.value_under_lock(&mut slot)
    }

    /// Transactional read-modify-write of the stored value.
    pub fn update(&self, updater: impl FnOnce(T) -> T) {
        let mut slot = self.slot.lock().unwrap();
        let current = self.value_under_lock(&mut slot);
        *slot = Slot::Initialized(updater(current));
    }

    /// Reset the store: close the value if a close hook was registered,
    /// then clear the slot.
    ///
    /// Idempotent; a second reset in a row is a no-op. Close failures are
    /// logged, never propagated.
    pub fn reset(&self) {
        let mut slot = self.slot.lock().unwrap();
        if let Slot::Initialized(mut value) = std::mem::replace(&mut *slot, Slot::Uninitialized) {
            if let Some(closer) = &self.closer {
                let close = closer.clone();
                if catch_unwind(AssertUnwindSafe(move || close(&mut value))).is_err() {
                    log::error!("Exception while closing store [{}]", self.identifier);
                }
            }
        }
    }

    /// The store's identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The store's lifespan tag.
    pub fn lifespan(&self) -> Lifespan {
        self.lifespan
    }

    /// The scope this store belongs to.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Whether a retriever in `retriever` may see this store.
    pub fn is_visible_for(&self, retriever: &Scope) -> bool {
        retriever.is_or_descends_from(&self.scope)
    }

    fn value_under_lock(&self, slot: &mut Slot<T>) -> T {
        if let Slot::Initialized(value) = slot {
            return value.clone();
        }
        let value = (self.initializer)();
        *slot = Slot::Initialized(value.clone());
        value
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for ScopedStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.lock().unwrap();
        let rendered = match &*slot {
            Slot::Initialized(value) => format!("{:?}", value),
            Slot::Uninitialized => "<uninitialized>".to_string(),
        };
        write!(
            f,
            "Store({}, {:?}, {}): [{}]",
            self.identifier,
            self.lifespan,
            self.scope.path(),
            rendered
        )
    }
}
