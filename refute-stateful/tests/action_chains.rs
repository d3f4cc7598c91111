//! Integration tests: action chains as falsifiable, shrinkable values.

use refute::{
    Falsifier, ParamValue, ParameterArbitrary, PredicateFalsifier, PropertyRunner, RunConfig, just,
};
use refute_stateful::prelude::*;

fn counter_chain(steps: Vec<Transformer<i64>>) -> GeneratedChain<i64> {
    GeneratedChain::new(|| 0i64, steps)
}

#[test]
fn five_step_chain_failing_on_the_last_step_reports_every_action() {
    // Five increment/decrement steps; the value goes negative on the fifth.
    let chain = counter_chain(vec![
        Transformer::mapping("increment", |n| n + 1),
        Transformer::mapping("increment", |n| n + 1),
        Transformer::mapping("decrement", |n| n - 1),
        Transformer::mapping("decrement", |n| n - 1),
        Transformer::mapping("decrement twice", |n| n - 2),
    ]);

    let runner = SequentialActionChain::new(chain);
    runner.with_invariant(Some("non-negative"), |state: &i64| {
        if *state >= 0 {
            Ok(())
        } else {
            Err(format!("value {} is negative", state))
        }
    });

    let error = runner.run().unwrap_err();
    assert_eq!(runner.running(), RunningState::Failed);

    let message = error.to_string();
    // the four prior actions plus the causing one are all listed
    let listed = message.matches("    increment").count();
    assert_eq!(listed, 2);
    let listed = message.matches("    decrement\n").count();
    assert_eq!(listed, 2);
    assert!(message.contains("    decrement twice"));
    assert!(message.contains("final state: -2"));
    assert!(message.contains("value -2 is negative"));
}

#[test]
fn failing_chain_shrinks_to_the_minimal_step_sequence() {
    // Property under test: a counter driven by increments never exceeds 3.
    // Chains of up to 10 increments falsify it, and the minimal falsifying
    // chain has exactly 4 steps.
    let chains = action_chains(|| 0i64)
        .with_transformation(just(Transformer::mapping("increment", |n: i64| n + 1)))
        .with_max_transformations(10);

    let parameters = [ParameterArbitrary::new(chains)];
    let falsifier = PredicateFalsifier::new(|params: &[ParamValue]| {
        let chain = params[0].downcast_ref::<GeneratedChain<i64>>().unwrap();
        let runner = SequentialActionChain::new(chain.clone());
        match runner.run() {
            Ok(final_state) => final_state <= 3,
            Err(_) => true,
        }
    });

    let runner = PropertyRunner::new(RunConfig::with_seed(2718));
    let result = runner.run(&parameters, &falsifier).unwrap();
    assert!(result.is_falsified());

    let shrunk = result.shrunk_sample.unwrap();
    let minimal = shrunk.parameters()[0]
        .downcast_ref::<GeneratedChain<i64>>()
        .unwrap();
    assert_eq!(minimal.steps().len(), 4);
    assert!(falsifier.execute(shrunk.parameters()).is_falsified());
}

#[test]
fn invariant_falsification_shrinks_the_offending_chain() {
    // Increments and a large decrement; the invariant "value stays
    // non-negative" fails as soon as a decrement outweighs the increments
    // before it. The minimal counterexample is a single decrement.
    let chains = action_chains(|| 0i64)
        .with_transformation(just(Transformer::mapping("increment", |n: i64| n + 1)))
        .with_transformation(just(Transformer::mapping("decrement by five", |n: i64| {
            n - 5
        })))
        .with_max_transformations(8);

    let parameters = [ParameterArbitrary::new(chains)];
    let falsifier = PredicateFalsifier::new(|params: &[ParamValue]| {
        let chain = params[0].downcast_ref::<GeneratedChain<i64>>().unwrap();
        let runner = SequentialActionChain::new(chain.clone());
        runner.with_invariant(Some("non-negative"), |state: &i64| {
            if *state >= 0 {
                Ok(())
            } else {
                Err(format!("value {} is negative", state))
            }
        });
        runner.run().is_ok()
    });

    let runner = PropertyRunner::new(RunConfig::with_seed(314));
    let result = runner.run(&parameters, &falsifier).unwrap();
    assert!(result.is_falsified());

    let shrunk = result.shrunk_sample.unwrap();
    let minimal = shrunk.parameters()[0]
        .downcast_ref::<GeneratedChain<i64>>()
        .unwrap();
    assert_eq!(minimal.steps().len(), 1);
    assert_eq!(minimal.steps()[0].description(), "decrement by five");
}

#[test]
fn shrunk_chains_replay_deterministically() {
    let chains = action_chains(|| 0i64)
        .with_transformation(just(Transformer::mapping("increment", |n: i64| n + 1)))
        .with_max_transformations(10);

    let parameters = [ParameterArbitrary::new(chains)];
    let falsifier = PredicateFalsifier::new(|params: &[ParamValue]| {
        let chain = params[0].downcast_ref::<GeneratedChain<i64>>().unwrap();
        let runner = SequentialActionChain::new(chain.clone());
        runner.run().map(|state| state <= 5).unwrap_or(true)
    });

    let runner = PropertyRunner::new(RunConfig::with_seed(161));
    let result = runner.run(&parameters, &falsifier).unwrap();
    assert!(result.is_falsified());

    let shrunk = result.shrunk_sample.unwrap();
    let minimal = shrunk.parameters()[0]
        .downcast_ref::<GeneratedChain<i64>>()
        .unwrap();
    // replaying the recorded chain twice gives the same final state
    let first = SequentialActionChain::new(minimal.clone()).run().unwrap();
    let second = SequentialActionChain::new(minimal.clone()).run().unwrap();
    assert_eq!(first, second);
    assert_eq!(first, minimal.steps().len() as i64);
}
