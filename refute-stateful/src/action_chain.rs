//! The sequential action-chain runner: drives a chain step by step,
//! observing each new state and checking named invariants.

use std::fmt;
use std::sync::Mutex;

use refute::PropertyError;

use crate::chain::Chain;
use crate::transformer::Transformer;

/// Lifecycle state of one action chain run. Transitions only move forward;
/// there is no way back out of `Succeeded` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningState {
    /// The chain has not been run yet
    NotRun,
    /// The chain is currently being driven
    Running,
    /// The whole chain completed without failure
    Succeeded,
    /// An invariant or a step failed
    Failed,
}

impl fmt::Display for RunningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunningState::NotRun => "NOT_RUN",
            RunningState::Running => "RUNNING",
            RunningState::Succeeded => "SUCCEEDED",
            RunningState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Failure of an action chain run.
#[derive(Debug)]
pub enum ActionChainError {
    /// A named invariant was violated after a step
    InvariantFailed {
        /// Full diagnostic: the actions taken, the final state, the cause
        message: String,
    },
    /// A step itself faulted; the original fault is preserved
    AssertionFailed {
        /// Full diagnostic: the actions taken, the final state, the cause
        message: String,
        /// The step's original fault
        source: PropertyError,
    },
    /// An assumption violation inside a step, propagated unchanged
    Aborted(PropertyError),
}

impl fmt::Display for ActionChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionChainError::InvariantFailed { message } => f.write_str(message),
            ActionChainError::AssertionFailed { message, .. } => f.write_str(message),
            ActionChainError::Aborted(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for ActionChainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ActionChainError::AssertionFailed { source, .. } => Some(source),
            ActionChainError::Aborted(error) => Some(error),
            ActionChainError::InvariantFailed { .. } => None,
        }
    }
}

impl ActionChainError {
    /// Whether this failure is an assumption-violation pass-through.
    pub fn is_aborted(&self) -> bool {
        matches!(self, ActionChainError::Aborted(_))
    }
}

type Peeker<T> = Box<dyn Fn(&T) + Send>;
type NamedInvariant<T> = (String, Box<dyn Fn(&T) -> Result<(), String> + Send>);

struct ChainState<T> {
    current: Option<T>,
    running: RunningState,
    peekers: Vec<Peeker<T>>,
    invariants: Vec<NamedInvariant<T>>,
}

/// Drives a [`Chain`] sequentially, invoking peek observers and checking
/// invariants after every step.
///
/// One lock guards the whole runner state and is held for the full duration
/// of [`run`](SequentialActionChain::run): inspection calls from other
/// threads block until the run completes or fails. Running twice re-enters
/// `Running` from whatever state was left behind; nothing beyond the lock's
/// mutual exclusion sanitizes re-entry.
pub struct SequentialActionChain<T> {
    chain: Box<dyn Chain<T> + Send + Sync>,
    inner: Mutex<ChainState<T>>,
}

impl<T: Clone + fmt::Debug> SequentialActionChain<T> {
    /// Wrap a chain for running.
    pub fn new(chain: impl Chain<T> + Send + Sync + 'static) -> Self {
        Self {
            chain: Box::new(chain),
            inner: Mutex::new(ChainState {
                current: None,
                running: RunningState::NotRun,
                peekers: Vec::new(),
                invariants: Vec::new(),
            }),
        }
    }

    /// Register an observer called with every new state.
    pub fn peek(&self, peeker: impl Fn(&T) + Send + 'static) -> &Self {
        self.inner.lock().unwrap().peekers.push(Box::new(peeker));
        self
    }

    /// Register a named invariant checked after every step.
    ///
    /// The closure returns the violation message when the invariant does
    /// not hold.
    pub fn with_invariant(
        &self,
        label: Option<&str>,
        invariant: impl Fn(&T) -> Result<(), String> + Send + 'static,
    ) -> &Self {
        let label = match label {
            Some(name) => format!("Invariant '{}'", name),
            None => "Invariant".to_string(),
        };
        self.inner
            .lock()
            .unwrap()
            .invariants
            .push((label, Box::new(invariant)));
        self
    }

    /// Drive the chain to completion.
    ///
    /// Holds the runner lock for the whole run. Invariant violations and
    /// step faults move the state to `Failed`; assumption violations are
    /// propagated unchanged and leave the state as it was.
    pub fn run(&self) -> Result<T, ActionChainError> {
        let mut inner = self.inner.lock().unwrap();
        inner.running = RunningState::Running;
        let mut iterator = self.chain.start();
        while let Some(step) = iterator.next() {
            match step {
                Ok(state) => {
                    inner.current = Some(state.clone());
                    for peeker in &inner.peekers {
                        peeker(&state);
                    }
                    let mut violation: Option<(String, String)> = None;
                    for (label, invariant) in &inner.invariants {
                        if let Err(cause) = invariant(&state) {
                            violation = Some((label.clone(), cause));
                            break;
                        }
                    }
                    if let Some((label, cause)) = violation {
                        inner.running = RunningState::Failed;
                        let message = error_message(
                            &label,
                            &self.chain.transformations(),
                            inner.current.as_ref(),
                            &cause,
                        );
                        return Err(ActionChainError::InvariantFailed { message });
                    }
                }
                Err(error) if error.is_assumption_violation() => {
                    return Err(ActionChainError::Aborted(error));
                }
                Err(error) => {
                    inner.running = RunningState::Failed;
                    let message = error_message(
                        "Run",
                        &self.chain.transformations(),
                        inner.current.as_ref(),
                        &error.to_string(),
                    );
                    return Err(ActionChainError::AssertionFailed {
                        message,
                        source: error,
                    });
                }
            }
        }
        inner.running = RunningState::Succeeded;
        match inner.current.clone() {
            Some(state) => Ok(state),
            None => Err(ActionChainError::AssertionFailed {
                message: "chain produced no state at all".to_string(),
                source: PropertyError::internal_error("empty chain"),
            }),
        }
    }

    /// The last state the chain reached, if any.
    pub fn final_state(&self) -> Option<T> {
        self.inner.lock().unwrap().current.clone()
    }

    /// The chain's lifecycle state.
    pub fn running(&self) -> RunningState {
        self.inner.lock().unwrap().running
    }

    /// Descriptions of the steps applied so far.
    pub fn transformations(&self) -> Vec<String> {
        self.chain.transformations()
    }

    /// The transformer descriptors applied so far.
    pub fn transformers(&self) -> Vec<Transformer<T>> {
        self.chain.transformers()
    }
}

impl<T: Clone + fmt::Debug> fmt::Display for SequentialActionChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let running = self.running();
        if running == RunningState::NotRun {
            return write!(
                f,
                "ActionChain[{}]: {} max actions",
                running,
                self.chain.max_transformations()
            );
        }
        write!(f, "ActionChain[{}]: {:?}", running, self.transformations())
    }
}

fn error_message<T: fmt::Debug>(
    name: &str,
    transformations: &[String],
    final_state: Option<&T>,
    cause: &str,
) -> String {
    let actions = transformations
        .iter()
        .map(|transformation| format!("    {}", transformation))
        .collect::<Vec<_>>()
        .join("\n");
    let actions_block = if actions.is_empty() {
        String::new()
    } else {
        format!("\n{}\n  ", actions)
    };
    let state = match final_state {
        Some(value) => format!("{:?}", value),
        None => "<none>".to_string(),
    };
    format!(
        "{} failed after the following actions: [{}]\nfinal state: {}\n{}",
        name, actions_block, state, cause
    )
}
