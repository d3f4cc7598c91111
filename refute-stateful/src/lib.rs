//! # Refute Stateful
//!
//! Model-based/stateful property testing for Refute: a sequence of state
//! transformations is the unit under test. Transformer choices come from
//! arbitraries, so a failing chain is falsified and shrunk with exactly the
//! same machinery as any other generated value — shrinking removes steps and
//! simplifies their parameters while the chain stays replayable from its
//! recorded choices.
//!
//! ## Quick Example
//!
//! ```rust
//! use refute_stateful::prelude::*;
//!
//! // A chain of recorded counter operations
//! let chain = GeneratedChain::new(
//!     || 0i64,
//!     vec![
//!         Transformer::mapping("add one", |n| n + 1),
//!         Transformer::mapping("add one", |n| n + 1),
//!         Transformer::mapping("subtract one", |n| n - 1),
//!     ],
//! );
//!
//! // Run it, checking an invariant after every step
//! let runner = SequentialActionChain::new(chain);
//! runner.with_invariant(Some("non-negative"), |state| {
//!     if *state >= 0 {
//!         Ok(())
//!     } else {
//!         Err(format!("value {} is negative", state))
//!     }
//! });
//!
//! let final_state = runner.run().unwrap();
//! assert_eq!(final_state, 1);
//! assert_eq!(runner.running(), RunningState::Succeeded);
//! ```

pub mod action_chain;
pub mod chain;
pub mod transformer;

pub use action_chain::{ActionChainError, RunningState, SequentialActionChain};
pub use chain::{Chain, ChainArbitrary, GeneratedChain, action_chains};
pub use transformer::Transformer;

/// Re-exports for convenient imports
pub mod prelude {
    pub use crate::action_chain::{ActionChainError, RunningState, SequentialActionChain};
    pub use crate::chain::{Chain, ChainArbitrary, GeneratedChain, action_chains};
    pub use crate::transformer::Transformer;
}
