//! Transformers: named, fallible state transformation steps.

use std::fmt;
use std::sync::Arc;

use refute::PropertyError;

/// One state transformation step of an action chain.
///
/// Transformers carry a human-readable description used in failure reports.
/// A transformer is usually produced by an arbitrary, which makes the choice
/// of transformer — and any parameters baked into it — a generated,
/// shrinkable value.
pub struct Transformer<T> {
    description: String,
    run: Arc<dyn Fn(T) -> Result<T, PropertyError> + Send + Sync>,
    end_of_chain: bool,
}

impl<T> Clone for Transformer<T> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            run: self.run.clone(),
            end_of_chain: self.end_of_chain,
        }
    }
}

impl<T> Transformer<T> {
    /// Create a fallible transformer.
    ///
    /// An [`PropertyError::AssumptionViolated`] error acts as a
    /// generation-time abort; any other error fails the chain run.
    pub fn new(
        description: impl Into<String>,
        run: impl Fn(T) -> Result<T, PropertyError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            run: Arc::new(run),
            end_of_chain: false,
        }
    }

    /// Create an infallible transformer.
    pub fn mapping(
        description: impl Into<String>,
        transform: impl Fn(T) -> T + Send + Sync + 'static,
    ) -> Self {
        Self::new(description, move |state| Ok(transform(state)))
    }

    /// A marker transformer that ends the chain early.
    pub fn end_of_chain() -> Self {
        Self {
            description: "End of chain".to_string(),
            run: Arc::new(|state| Ok(state)),
            end_of_chain: true,
        }
    }

    /// The step's display description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether this transformer ends the chain.
    pub fn is_end_of_chain(&self) -> bool {
        self.end_of_chain
    }

    /// Apply this transformer to a state.
    pub fn apply(&self, state: T) -> Result<T, PropertyError> {
        (self.run)(state)
    }
}

impl<T> fmt::Debug for Transformer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transformer({})", self.description)
    }
}
