//! Context-keyed arm state — one state vector per decision context, grown
//! lazily, plus the global vector used when no context is given.

use decision_core::ContextKey;
use std::collections::HashMap;

/// Per-context arm states, indexed in the same order as the policy's arms.
#[derive(Debug, Clone)]
pub struct ContextTable<T> {
    prior: Vec<T>,
    global: Vec<T>,
    contexts: HashMap<ContextKey, Vec<T>>,
}

impl<T: Clone> ContextTable<T> {
    pub fn new(prior: Vec<T>) -> Self {
        Self {
            global: prior.clone(),
            prior,
            contexts: HashMap::new(),
        }
    }

    /// Mutable states for `context`, seeding an unseen context with the prior.
    pub fn states_mut(&mut self, context: Option<ContextKey>) -> &mut [T] {
        let Self {
            prior,
            global,
            contexts,
        } = self;
        match context {
            None => global.as_mut_slice(),
            Some(key) => contexts
                .entry(key)
                .or_insert_with(|| prior.clone())
                .as_mut_slice(),
        }
    }

    /// Read-only view. Unseen contexts report the prior and are not created.
    pub fn states(&self, context: Option<ContextKey>) -> &[T] {
        match context {
            None => self.global.as_slice(),
            Some(key) => self.contexts.get(&key).unwrap_or(&self.prior).as_slice(),
        }
    }

    pub fn contexts(&self) -> Vec<ContextKey> {
        self.contexts.keys().copied().collect()
    }

    /// Drop every contextual table and return the global one to the prior.
    pub fn reset(&mut self) {
        self.global = self.prior.clone();
        self.contexts.clear();
    }
}
