//! # Task registry - process-wide table of registerable background tasks.
//!
//! [`TaskRegistry`] binds task identifiers to [`HandlerRef`]s. Registration
//! must happen during the application's setup phase, before the OS
//! scheduler is allowed to deliver grants for those identifiers; the
//! surrounding OS subsystem treats late registration as a contract
//! violation, so the registry rejects it once [`TaskRegistry::seal`] has
//! been called.
//!
//! ## Rules
//! - Re-registration under an already-bound identifier fails with
//!   [`RegistryError::DuplicateRegistration`]; configuration bugs surface
//!   deterministically at startup instead of silently swallowing a handler.
//! - [`TaskRegistry::lookup`] never panics; absence is a normal outcome
//!   (the OS may hold scheduling state from a previous build that no longer
//!   registers the identifier).
//! - There is no removal; entries live for the process lifetime.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use bgbridge::{GrantContext, HandlerError, HandlerFn, TaskRegistry};
//!
//! # async fn demo() -> Result<(), bgbridge::RegistryError> {
//! let registry = Arc::new(TaskRegistry::new());
//! registry
//!     .register(
//!         "refresh",
//!         HandlerFn::arc(|_ctx: GrantContext| async { Ok::<(), HandlerError>(()) }),
//!     )
//!     .await?;
//! registry.seal();
//! assert!(registry.lookup("refresh").await.is_some());
//! assert!(registry.lookup("unknown").await.is_none());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::error::RegistryError;
use crate::handlers::HandlerRef;

/// Process-wide table of task identifiers bound to handlers.
///
/// Constructed once at startup and passed by `Arc` to the coordinator, so
/// the coordinator stays testable with a registry built in the test itself.
pub struct TaskRegistry {
    handlers: RwLock<HashMap<Arc<str>, HandlerRef>>,
    sealed: AtomicBool,
}

impl TaskRegistry {
    /// Creates a new, empty, unsealed registry.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            sealed: AtomicBool::new(false),
        }
    }

    /// Binds `id` to `handler`.
    ///
    /// Fails with [`RegistryError::Sealed`] after [`TaskRegistry::seal`] and
    /// with [`RegistryError::DuplicateRegistration`] if the identifier is
    /// already bound.
    pub async fn register(
        &self,
        id: impl Into<Arc<str>>,
        handler: HandlerRef,
    ) -> Result<(), RegistryError> {
        let id = id.into();
        if self.is_sealed() {
            return Err(RegistryError::Sealed { id: id.to_string() });
        }

        let mut handlers = self.handlers.write().await;
        match handlers.entry(id) {
            Entry::Occupied(e) => Err(RegistryError::DuplicateRegistration {
                id: e.key().to_string(),
            }),
            Entry::Vacant(v) => {
                v.insert(handler);
                Ok(())
            }
        }
    }

    /// Returns the handler bound to `id`, or `None`.
    ///
    /// Absence is expected for identifiers the current process build did
    /// not register.
    pub async fn lookup(&self, id: &str) -> Option<HandlerRef> {
        self.handlers.read().await.get(id).cloned()
    }

    /// Marks the setup phase as complete; later registrations fail.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    /// True once [`TaskRegistry::seal`] has been called.
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Returns a sorted list of registered identifiers.
    pub async fn list(&self) -> Vec<String> {
        let handlers = self.handlers.read().await;
        let mut ids: Vec<String> = handlers.keys().map(|k| k.to_string()).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered identifiers.
    pub async fn len(&self) -> usize {
        self.handlers.read().await.len()
    }

    /// True if nothing has been registered.
    pub async fn is_empty(&self) -> bool {
        self.handlers.read().await.is_empty()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{GrantContext, HandlerFn};

    fn noop() -> HandlerRef {
        HandlerFn::arc(|_ctx: GrantContext| async { Ok::<(), crate::HandlerError>(()) })
    }

    #[tokio::test]
    async fn register_then_lookup() {
        let registry = TaskRegistry::new();
        let handler = noop();
        registry.register("refresh", handler.clone()).await.unwrap();

        let found = registry.lookup("refresh").await.expect("registered");
        assert!(Arc::ptr_eq(&found, &handler));
        assert!(registry.lookup("unknown").await.is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let registry = TaskRegistry::new();
        registry.register("refresh", noop()).await.unwrap();

        let err = registry.register("refresh", noop()).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::DuplicateRegistration { ref id } if id == "refresh"
        ));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn sealed_registry_rejects_registration() {
        let registry = TaskRegistry::new();
        registry.register("refresh", noop()).await.unwrap();
        registry.seal();
        assert!(registry.is_sealed());

        let err = registry.register("sync", noop()).await.unwrap_err();
        assert!(matches!(err, RegistryError::Sealed { ref id } if id == "sync"));

        // existing bindings still resolve
        assert!(registry.lookup("refresh").await.is_some());
    }

    #[tokio::test]
    async fn list_is_sorted() {
        let registry = TaskRegistry::new();
        registry.register("sync", noop()).await.unwrap();
        registry.register("refresh", noop()).await.unwrap();
        assert_eq!(registry.list().await, vec!["refresh", "sync"]);
        assert!(!registry.is_empty().await);
    }
}
