//! Seed reproducibility and driver lifecycle tests.

mod common;

use std::io;

use blocksim::{RunMode, SimError, Simulator, simulate_from_seed};
use common::{RecordingLog, TestApp, config, few_accounts, traced};

fn run_trace(seed: u64) -> (Vec<(u64, String, u64)>, u64) {
    let catalog = [traced("alpha", 3), traced("beta", 1), traced("gamma", 2)];
    let mut app = TestApp::default();
    let outcome = Simulator::new(config(seed), &catalog)
        .unwrap()
        .with_log_writer(Box::new(RecordingLog::default()))
        .run(&mut app, few_accounts, &mut io::sink())
        .unwrap();
    (app.trace, outcome.op_count)
}

#[test]
fn test_same_seed_same_trace() {
    let (trace1, ops1) = run_trace(12345);
    let (trace2, ops2) = run_trace(12345);

    assert!(!trace1.is_empty());
    assert_eq!(trace1, trace2);
    assert_eq!(ops1, ops2);
}

#[test]
fn test_different_seeds_diverge() {
    let (trace1, _) = run_trace(1);
    let (trace2, _) = run_trace(2);
    assert_ne!(trace1, trace2);
}

#[test]
fn test_lifecycle_hooks_and_commit() {
    let catalog = [traced("alpha", 1)];
    let mut app = TestApp::default();
    let config = config(7).with_initial_height(0).with_num_blocks(5);

    let outcome = Simulator::new(config, &catalog)
        .unwrap()
        .with_log_writer(Box::new(RecordingLog::default()))
        .run(&mut app, few_accounts, &mut io::sink())
        .unwrap();

    assert!(!outcome.stopped_early);
    assert_eq!(outcome.blocks_run, 5);
    assert_eq!(outcome.final_height, 6);
    assert_eq!(app.begun, [1, 2, 3, 4, 5]);
    assert_eq!(app.ended, app.begun);
    assert_eq!(app.commits, 5);
    assert_eq!(outcome.op_count, app.trace.len() as u64);
}

#[test]
fn test_commit_disabled() {
    let catalog = [traced("alpha", 1)];
    let mut app = TestApp::default();

    simulate_from_seed(
        &mut app,
        few_accounts,
        &catalog,
        &config(3).with_commit(false).with_mode(RunMode::Benchmark),
        &mut io::sink(),
    )
    .unwrap();

    assert_eq!(app.commits, 0);
}

#[test]
fn test_blocked_accounts_never_reach_operations() {
    let catalog = [traced("alpha", 1)];
    let mut app = TestApp::default();

    Simulator::new(config(99).with_num_blocks(30), &catalog)
        .unwrap()
        .with_log_writer(Box::new(RecordingLog::default()))
        .run(&mut app, few_accounts, &mut io::sink())
        .unwrap();

    assert!(!app.trace.is_empty());
    assert!(!app.saw_blocked_account);
}

#[test]
fn test_block_heights_are_consecutive_and_times_monotonic() {
    let catalog = [traced("alpha", 1)];
    let mut app = TestApp::default();

    let outcome = Simulator::new(config(5).with_initial_height(10), &catalog)
        .unwrap()
        .with_log_writer(Box::new(RecordingLog::default()))
        .run(&mut app, few_accounts, &mut io::sink())
        .unwrap();

    let expected: Vec<u64> = (10..30).collect();
    assert_eq!(app.begun, expected);
    assert!(app.trace.windows(2).all(|w| w[0].0 <= w[1].0));
    assert_eq!(outcome.final_height, 30);
    assert!(outcome.final_time.timestamp() > 1_600_000_000);
}

#[test]
fn test_zero_accounts_is_config_error() {
    let catalog = [traced("alpha", 1)];
    let result = Simulator::new(config(1), &catalog)
        .unwrap()
        .with_log_writer(Box::new(RecordingLog::default()))
        .run(&mut TestApp::default(), |_, _| Vec::new(), &mut io::sink());

    assert!(matches!(result, Err(SimError::Config(_))));
}

#[test]
fn test_no_validators_is_config_error() {
    let catalog = [traced("alpha", 1)];
    let mut app = TestApp {
        no_validators: true,
        ..TestApp::default()
    };
    let result = Simulator::new(config(1), &catalog)
        .unwrap()
        .with_log_writer(Box::new(RecordingLog::default()))
        .run(&mut app, few_accounts, &mut io::sink());

    assert!(matches!(result, Err(SimError::Config(_))));
}

#[test]
fn test_all_accounts_blocked_is_config_error() {
    let catalog = [traced("alpha", 1)];
    let mut app = TestApp {
        block_all: true,
        ..TestApp::default()
    };
    let result = Simulator::new(config(1), &catalog)
        .unwrap()
        .with_log_writer(Box::new(RecordingLog::default()))
        .run(&mut app, few_accounts, &mut io::sink());

    assert!(matches!(result, Err(SimError::Config(_))));
    assert!(app.begun.is_empty());
    assert!(app.trace.is_empty());
}

#[test]
fn test_empty_catalog_is_config_error() {
    let result = Simulator::<TestApp>::new(config(1), &[]);
    assert!(matches!(result, Err(SimError::Config(_))));
}

#[test]
fn test_run_output_mentions_seed_and_completion() {
    let catalog = [traced("alpha", 1)];
    let mut out = Vec::new();

    Simulator::new(config(4242), &catalog)
        .unwrap()
        .with_log_writer(Box::new(RecordingLog::default()))
        .run(&mut TestApp::default(), few_accounts, &mut out)
        .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("seed 4242"));
    assert!(out.contains("Randomized simulation params:"));
    assert!(out.contains("Simulation complete; Final height (blocks): 21"));
    assert!(out.contains("Operation statistics:"));
}
