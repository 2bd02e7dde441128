//! Operation handlers and their registry.

use crate::context::OperationContext;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from operation handlers.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("no handler registered for operation '{0}'")]
    NotRegistered(String),

    #[error("missing parameter '{0}'")]
    MissingParameter(String),

    #[error("equipment fault: {0}")]
    Equipment(String),
}

/// A named side-effecting action invoked during a specific transition.
///
/// Handlers perform domain work (actuate equipment, kick off a scan) and are
/// unrelated to persistence or notification. They are stateless: a fresh
/// instance is resolved from the registry for every invocation and dropped
/// when the transition completes, so an instance may hold per-invocation
/// resources.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    async fn execute(&self, ctx: &OperationContext) -> Result<(), OperationError>;
}

type HandlerFactory = Box<dyn Fn() -> Box<dyn OperationHandler> + Send + Sync>;

/// Startup-built mapping from operation name to handler factory.
///
/// Replaces runtime type resolution with an explicit table: the set of
/// operations is known when the process starts, and `resolve` hands out a
/// scoped instance per call.
#[derive(Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under the given operation name. A later
    /// registration under the same name replaces the earlier one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn OperationHandler> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Resolves a fresh handler instance for the given operation name.
    pub fn resolve(&self, name: &str) -> Option<Box<dyn OperationHandler>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered operation names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{StationState, StationTrigger};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl OperationHandler for CountingHandler {
        async fn execute(&self, _ctx: &OperationContext) -> Result<(), OperationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_context() -> OperationContext {
        OperationContext::new(
            1,
            StationState::NoOrder,
            StationTrigger::Start,
            HashMap::new(),
        )
    }

    #[tokio::test]
    async fn test_resolve_returns_fresh_instance() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        let counter = calls.clone();
        registry.register("start", move || {
            Box::new(CountingHandler {
                calls: counter.clone(),
            })
        });

        let ctx = test_context();
        registry.resolve("start").unwrap().execute(&ctx).await.unwrap();
        registry.resolve("start").unwrap().execute(&ctx).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_resolve_unknown_name() {
        let registry = HandlerRegistry::new();
        assert!(registry.resolve("nope").is_none());
        assert!(!registry.contains("nope"));
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = HandlerRegistry::new();
        registry.register("scan_pallet", || {
            Box::new(CountingHandler {
                calls: Arc::new(AtomicUsize::new(0)),
            })
        });
        registry.register("start", || {
            Box::new(CountingHandler {
                calls: Arc::new(AtomicUsize::new(0)),
            })
        });
        assert_eq!(registry.names(), vec!["scan_pallet", "start"]);
    }
}
