//! Registry of the matching strategies available to reconcile methods

use std::collections::HashMap;
use std::sync::Arc;

use crate::traits::*;
use crate::types::*;

/// Maps each strategy kind to its implementation
pub struct StrategyRegistry<S: ReconcileStorage> {
    strategies: HashMap<StrategyKind, Arc<dyn MatchingStrategy<S>>>,
}

impl<S: ReconcileStorage> StrategyRegistry<S> {
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Register a strategy, replacing any previous one for the same kind
    pub fn register<M>(&mut self, kind: StrategyKind, strategy: M) -> &mut Self
    where
        M: MatchingStrategy<S> + 'static,
    {
        self.strategies.insert(kind, Arc::new(strategy));
        self
    }

    /// Builder-style variant of [`StrategyRegistry::register`]
    pub fn with<M>(mut self, kind: StrategyKind, strategy: M) -> Self
    where
        M: MatchingStrategy<S> + 'static,
    {
        self.register(kind, strategy);
        self
    }

    /// Implementation for a kind
    pub fn get(&self, kind: StrategyKind) -> ReconcileResult<Arc<dyn MatchingStrategy<S>>> {
        self.strategies
            .get(&kind)
            .cloned()
            .ok_or_else(|| ReconcileError::UnknownStrategy(kind.identifier().to_string()))
    }

    /// Whether a method of this kind can run
    pub fn contains(&self, kind: StrategyKind) -> bool {
        self.strategies.contains_key(&kind)
    }
}

impl<S: ReconcileStorage> Default for StrategyRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
