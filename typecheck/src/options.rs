//! Checker configuration.

use crate::MAX_DEPTH;

/// How far coercion reaches into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoercionPolicy {
    /// Rewrap the outermost representation only; nested elements are checked as-is.
    #[default]
    Shallow,
    /// Also coerce aggregate elements, recursively.
    Deep,
}

/// Configuration for type checking and coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOptions {
    pub coercion: CoercionPolicy,
    /// Nesting depth beyond which checking fails with `CycleDetected`.
    pub max_depth: usize,
    /// Descend into referenced instances and re-check their slots.
    pub deep_entities: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            coercion: CoercionPolicy::Shallow,
            max_depth: MAX_DEPTH,
            deep_entities: false,
        }
    }
}

impl CheckOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coercion(mut self, coercion: CoercionPolicy) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_deep_entities(mut self, enabled: bool) -> Self {
        self.deep_entities = enabled;
        self
    }

    /// Deep coercion and entity descent.
    pub fn strict() -> Self {
        Self {
            coercion: CoercionPolicy::Deep,
            max_depth: MAX_DEPTH,
            deep_entities: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CheckOptions::default();
        assert_eq!(options.coercion, CoercionPolicy::Shallow);
        assert_eq!(options.max_depth, MAX_DEPTH);
        assert!(!options.deep_entities);
    }

    #[test]
    fn test_builder_overrides() {
        let options = CheckOptions::new()
            .with_coercion(CoercionPolicy::Deep)
            .with_max_depth(4)
            .with_deep_entities(true);
        assert_eq!(options.coercion, CoercionPolicy::Deep);
        assert_eq!(options.max_depth, 4);
        assert!(options.deep_entities);
    }
}
