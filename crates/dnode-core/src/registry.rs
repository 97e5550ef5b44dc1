//! Handler and callback registries.
//!
//! # Thread Safety
//!
//! The receive loop is single-threaded, but handlers may run work on other
//! tasks that sends callbacks and therefore registers them. The callback
//! table and its sequence counter sit behind one `Mutex` so id assignment and
//! insertion happen together. The handler table is written during setup and
//! read during dispatch; an `RwLock` publishes it to copies that share it.
//! Neither lock is held across an `.await`.

use crate::error::{DnodeError, Result};
use crate::function::Callback;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

/// Method name to handler. Write-once per key.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Callback>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `method`.
    ///
    /// Fails if the name is empty or already taken.
    pub fn register(&self, method: &str, handler: Callback) -> Result<()> {
        if method.is_empty() {
            return Err(DnodeError::Registration {
                method: method.to_string(),
                reason: "method name is empty".to_string(),
            });
        }

        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(method) {
            return Err(DnodeError::Registration {
                method: method.to_string(),
                reason: "handler already exists for method".to_string(),
            });
        }

        handlers.insert(method.to_string(), handler);
        Ok(())
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, method: &str) -> Option<Callback> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(method)
            .cloned()
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(method)
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct CallbackTable {
    next_id: u64,
    entries: HashMap<u64, Callback>,
}

/// Callbacks this side has sent to the peer, by id.
///
/// Ids are assigned from a counter that only grows, so an id is never handed
/// out twice, even after its entry has been removed.
#[derive(Default)]
pub struct CallbackRegistry {
    table: Mutex<CallbackTable>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `callback` and return its newly assigned id.
    pub fn register(&self, callback: Callback) -> u64 {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let id = table.next_id;
        table.next_id += 1;
        table.entries.insert(id, callback);
        id
    }

    pub fn get(&self, id: u64) -> Option<Callback> {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .get(&id)
            .cloned()
    }

    /// Remove the entry for `id`. Unknown ids are ignored.
    pub fn remove(&self, id: u64) -> Option<Callback> {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .remove(&id)
    }

    /// The id the next registration will receive.
    pub fn next_id(&self) -> u64 {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).next_id
    }

    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn noop() -> Callback {
        Callback::from_fn(|_| async { Ok(()) })
    }

    #[test]
    fn test_handler_register_and_lookup() {
        let registry = HandlerRegistry::new();
        registry.register("ping", noop()).unwrap();

        assert!(registry.get("ping").is_some());
        assert!(registry.get("Ping").is_none());
        assert!(registry.contains("ping"));
        assert_eq!(registry.methods(), vec!["ping".to_string()]);
    }

    #[test]
    fn test_handler_rejects_empty_name() {
        let registry = HandlerRegistry::new();
        let err = registry.register("", noop()).unwrap_err();
        assert!(matches!(err, DnodeError::Registration { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handler_rejects_duplicate() {
        let registry = HandlerRegistry::new();
        let first = noop();
        registry.register("ping", first.clone()).unwrap();

        assert!(registry.register("ping", noop()).is_err());
        assert!(registry.get("ping").unwrap().ptr_eq(&first));
    }

    #[test]
    fn test_callback_ids_increase() {
        let registry = CallbackRegistry::new();
        let a = registry.register(noop());
        let b = registry.register(noop());
        let c = registry.register(noop());

        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_callback_ids_not_reused_after_remove() {
        let registry = CallbackRegistry::new();
        let a = registry.register(noop());
        let b = registry.register(noop());
        registry.remove(a);
        registry.remove(b);

        let c = registry.register(noop());
        assert!(c > b);
        assert!(registry.get(a).is_none());
        assert!(registry.get(c).is_some());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let registry = CallbackRegistry::new();
        let id = registry.register(noop());

        assert!(registry.remove(99).is_none());
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(id).is_some());
        assert!(registry.remove(id).is_none());
        assert!(registry.is_empty());
        assert_eq!(registry.next_id(), 1);
    }

    #[test]
    fn test_concurrent_registration_unique_ids() {
        let registry = Arc::new(CallbackRegistry::new());
        let mut threads = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            threads.push(std::thread::spawn(move || {
                (0..100).map(|_| registry.register(noop())).collect::<Vec<_>>()
            }));
        }

        let mut ids = HashSet::new();
        for t in threads {
            for id in t.join().unwrap() {
                assert!(ids.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(ids.len(), 800);
        assert_eq!(registry.next_id(), 800);
    }
}
