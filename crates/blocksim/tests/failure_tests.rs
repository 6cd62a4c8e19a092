//! Fatal operation errors, panics and lean logging.

mod common;

use std::io;
use std::panic::{self, AssertUnwindSafe};

use blocksim::{
    EntryKind, FutureOperation, LogSink, Operation, OperationError, OperationOutput, OperationResult,
    RunMode, SimError, Simulator, StandardLogWriter, WeightedOperation, operation,
};
use common::{RecordingLog, SharedBuf, TestApp, config, few_accounts, traced};

fn always_fails() -> WeightedOperation<TestApp> {
    WeightedOperation::new(
        "explode",
        1,
        operation(|_, _, _, _, _| {
            Err(OperationError::new(
                OperationResult::no_op("test", "explode", "always fails"),
                "invariant broken",
            ))
        }),
    )
}

#[test]
fn test_always_erroring_operation_flushes_logs_before_error() {
    let buf = SharedBuf::default();
    let writer = StandardLogWriter::new(LogSink::Writer(Box::new(buf.clone())));

    let result = Simulator::new(config(11).with_num_blocks(100).with_max_block_size(10), &[always_fails()])
        .unwrap()
        .with_log_writer(Box::new(writer))
        .run(&mut TestApp::default(), few_accounts, &mut io::sink());

    let Err(err) = result else {
        panic!("run should fail");
    };
    assert!(err.is_operation_error());
    match err {
        SimError::Operation { route, name, comment, index, .. } => {
            assert_eq!(route, "test");
            assert_eq!(name, "explode");
            assert_eq!(comment, "always fails");
            assert_eq!(index, 0);
        }
        other => panic!("unexpected error: {other}"),
    }

    let dump = buf.contents();
    assert!(!dump.is_empty());
    assert!(dump.lines().last().unwrap().contains("always fails"));
}

#[test]
fn test_error_dumps_once_and_stops_block_loop() {
    let log = RecordingLog::default();
    let catalog = [always_fails()];
    let mut app = TestApp::default();

    let result = Simulator::new(config(3).with_num_blocks(100).with_max_block_size(10), &catalog)
        .unwrap()
        .with_log_writer(Box::new(log.clone()))
        .run(&mut app, few_accounts, &mut io::sink());

    assert!(result.is_err());
    assert_eq!(log.dumps(), 1);
    let failed_height = *app.begun.last().unwrap();
    assert!(app.ended.iter().all(|h| *h < failed_height));
    assert_eq!(app.commits as usize, app.ended.len());
}

#[test]
fn test_deferred_operation_error_is_fatal() {
    let deferred_failure: Operation<TestApp> = operation(|_, _, _, _, _| {
        Err(OperationError::new(
            OperationResult::no_op("vesting", "release", "deferred boom"),
            "release failed",
        ))
    });
    let scheduler: WeightedOperation<TestApp> = WeightedOperation::new(
        "schedule",
        1,
        operation(move |_, _, header, _, _| {
            Ok(OperationOutput::new(OperationResult::ok("vesting", "lock", ""))
                .with_future_op(FutureOperation::at_height(
                    header.height + 1,
                    deferred_failure.clone(),
                )))
        }),
    );
    let log = RecordingLog::default();

    let result = Simulator::new(config(21).with_num_blocks(100), &[scheduler])
        .unwrap()
        .with_log_writer(Box::new(log.clone()))
        .run(&mut TestApp::default(), few_accounts, &mut io::sink());

    match result {
        Err(SimError::QueuedOperation { route, name, .. }) => {
            assert_eq!(route, "vesting");
            assert_eq!(name, "release");
        }
        other => panic!("expected a queued operation error, got {other:?}"),
    }
    assert_eq!(log.dumps(), 1);
    let last = log.entries().pop().unwrap();
    assert_eq!(last.kind, EntryKind::QueuedOperation);
    assert_eq!(last.index, None);
}

fn panics() -> WeightedOperation<TestApp> {
    WeightedOperation::new(
        "panic",
        1,
        operation(|_, _, _, _, _| panic!("operation panicked")),
    )
}

#[test]
fn test_panic_dumps_logs_then_propagates() {
    let log = RecordingLog::default();
    let out = SharedBuf::default();
    let sim = Simulator::new(config(8).with_num_blocks(100).with_max_block_size(10), &[panics()])
        .unwrap()
        .with_log_writer(Box::new(log.clone()));

    let mut w = out.clone();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        sim.run(&mut TestApp::default(), few_accounts, &mut w)
    }));

    assert!(result.is_err(), "panic must propagate");
    assert_eq!(log.dumps(), 1);
    assert!(out.contents().contains("simulation halted due to panic on block"));
}

#[test]
fn test_benchmark_mode_panic_skips_dump() {
    let log = RecordingLog::default();
    let out = SharedBuf::default();
    let sim = Simulator::new(
        config(8)
            .with_num_blocks(100)
            .with_max_block_size(10)
            .with_mode(RunMode::Benchmark),
        &[panics()],
    )
    .unwrap()
    .with_log_writer(Box::new(log.clone()));

    let mut w = out.clone();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        sim.run(&mut TestApp::default(), few_accounts, &mut w)
    }));

    assert!(result.is_err());
    assert_eq!(log.dumps(), 0);
    assert!(!out.contents().contains("halted"));
}

#[test]
fn test_lean_mode_logs_only_successes() {
    let skipper: WeightedOperation<TestApp> = WeightedOperation::new(
        "skip",
        1,
        operation(|_, _, _, _, _| {
            Ok(OperationOutput::new(OperationResult::no_op(
                "test",
                "skip",
                "nothing to do",
            )))
        }),
    );
    let catalog = [skipper, traced("alpha", 1)];

    let lean_log = RecordingLog::default();
    Simulator::new(config(17).with_lean(true), &catalog)
        .unwrap()
        .with_log_writer(Box::new(lean_log.clone()))
        .run(&mut TestApp::default(), few_accounts, &mut io::sink())
        .unwrap();

    let verbose_log = RecordingLog::default();
    Simulator::new(config(17), &catalog)
        .unwrap()
        .with_log_writer(Box::new(verbose_log.clone()))
        .run(&mut TestApp::default(), few_accounts, &mut io::sink())
        .unwrap();

    let results = |log: &RecordingLog| -> Vec<OperationResult> {
        log.entries().into_iter().filter_map(|e| e.result).collect()
    };
    let lean = results(&lean_log);
    let verbose = results(&verbose_log);

    assert!(lean.iter().all(|r| r.ok));
    assert!(verbose.iter().any(|r| !r.ok));
    assert_eq!(lean.len(), verbose.iter().filter(|r| r.ok).count());
}
