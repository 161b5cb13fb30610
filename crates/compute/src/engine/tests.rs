use std::collections::HashSet;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tally_core::{ExpressionId, ExpressionStatus, Operator, OwnerId, TaskId};

use super::{Engine, ResultOutcome, Submission};
use crate::error::EngineError;
use crate::parser::{ParseError, parse};
use crate::scheduler::{SchedulerConfig, Task};
use crate::tree::apply;

const OWNER: OwnerId = OwnerId(1);

fn engine() -> Engine {
    Engine::new(SchedulerConfig::default())
}

fn compute(task: &Task) -> f64 {
    apply(task.operator, task.left, task.right)
}

/// Pull and answer tasks one at a time until `id` finishes.
fn run_to_completion(engine: &Engine, id: ExpressionId) -> (f64, usize) {
    let mut deliveries = 0;
    while let Some(task) = engine.pull_task().unwrap() {
        deliveries += 1;
        if let ResultOutcome::Finished(record) = engine.submit_result(task.id, compute(&task)).unwrap() {
            assert_eq!(record.id, id);
            assert_eq!(record.status, ExpressionStatus::Completed);
            return (record.result.unwrap(), deliveries);
        }
    }
    panic!("expression {id} never finished");
}

#[test]
fn scenario_precedence_walkthrough() {
    let engine = engine();
    let id = ExpressionId(1);
    let submission = engine.submit(id, OWNER, "2+3*4").unwrap();
    assert!(matches!(submission, Submission::Scheduled { tasks_emitted: 1, .. }));
    assert_eq!(submission.record().status, ExpressionStatus::Pending);

    let mul = engine.pull_task().unwrap().unwrap();
    assert_eq!(mul.operator, Operator::Mul);
    assert_eq!((mul.left, mul.right), (3.0, 4.0));
    assert!(engine.pull_task().unwrap().is_none());

    let outcome = engine.submit_result(mul.id, 12.0).unwrap();
    assert_eq!(outcome, ResultOutcome::Progress { expression_id: id, newly_scheduled: 1 });

    let add = engine.pull_task().unwrap().unwrap();
    assert_eq!(add.operator, Operator::Add);
    assert_eq!((add.left, add.right), (2.0, 12.0));

    let ResultOutcome::Finished(record) = engine.submit_result(add.id, 14.0).unwrap() else {
        panic!("expected the expression to finish");
    };
    assert_eq!(record.result, Some(14.0));
    assert_eq!(record.expression, "2+3*4");
    assert_eq!(record.owner, OWNER);
}

#[test]
fn scenario_literal_completes_immediately() {
    let engine = engine();
    let submission = engine.submit(ExpressionId(2), OWNER, "42").unwrap();
    let Submission::Completed(record) = submission else {
        panic!("literal should complete at submission");
    };
    assert_eq!(record.status, ExpressionStatus::Completed);
    assert_eq!(record.result, Some(42.0));

    assert!(engine.pull_task().unwrap().is_none());
    let metrics = engine.metrics().unwrap();
    assert_eq!(metrics.expressions_completed, 1);
    assert_eq!(metrics.live_expressions, 0);
}

#[test]
fn scenario_parse_error_schedules_nothing() {
    let engine = engine();
    let err = engine.submit(ExpressionId(3), OWNER, "2+").unwrap_err();
    assert_eq!(err, EngineError::Parse(ParseError::UnexpectedEnd));

    assert!(engine.pull_task().unwrap().is_none());
    assert_eq!(
        engine.status(ExpressionId(3), OWNER).unwrap_err(),
        EngineError::ExpressionNotFound(ExpressionId(3))
    );
    assert_eq!(engine.metrics().unwrap().parse_errors, 1);
}

#[test]
fn overflowing_literal_is_a_parse_error() {
    let engine = engine();
    let huge = "9".repeat(400);
    for text in [huge.clone(), format!("{huge}-{huge}")] {
        let err = engine.submit(ExpressionId(6), OWNER, &text).unwrap_err();
        assert!(matches!(err, EngineError::Parse(ParseError::InvalidNumber { .. })));
    }
    assert!(engine.pull_task().unwrap().is_none());
    assert_eq!(engine.metrics().unwrap().expressions_completed, 0);
}

#[test]
fn scenario_duplicate_result_rejected() {
    let engine = engine();
    let id = ExpressionId(4);
    engine.submit(id, OWNER, "(1+2)*(3+4)").unwrap();

    let first = engine.pull_task().unwrap().unwrap();
    engine.submit_result(first.id, 3.0).unwrap();

    assert_eq!(
        engine.submit_result(first.id, 99.0).unwrap_err(),
        EngineError::DuplicateResult(first.id)
    );

    // The tree is unchanged: the remaining work still yields 3 * 7.
    let (value, _) = run_to_completion(&engine, id);
    assert_eq!(value, 21.0);
    assert_eq!(engine.metrics().unwrap().duplicates_rejected, 1);
}

#[test]
fn duplicate_after_completion_rejected() {
    let engine = engine();
    engine.submit(ExpressionId(5), OWNER, "1+1").unwrap();
    let task = engine.pull_task().unwrap().unwrap();
    engine.submit_result(task.id, 2.0).unwrap();
    assert_eq!(
        engine.submit_result(task.id, 2.0).unwrap_err(),
        EngineError::DuplicateResult(task.id)
    );
}

#[test]
fn unknown_task_not_found() {
    let engine = engine();
    assert_eq!(
        engine.submit_result(TaskId(404), 1.0).unwrap_err(),
        EngineError::TaskNotFound(TaskId(404))
    );
}

#[test]
fn progress_bounded_by_internal_nodes() {
    for text in ["1+2", "2+3*4", "(1+2)*(3+4)-5/6", "1-2-3-4-5-6-7", "((1+2)*(3-4))/((5+6)*(7-8))"] {
        let engine = engine();
        let id = ExpressionId(10);
        let internal = parse(text).unwrap().internal_count();
        engine.submit(id, OWNER, text).unwrap();

        let (value, deliveries) = run_to_completion(&engine, id);
        assert_eq!(deliveries, internal, "deliveries for {text}");
        assert_eq!(value, parse(text).unwrap().evaluate(), "value for {text}");
    }
}

#[test]
fn result_order_does_not_matter() {
    let text = "(8-3)*(6/2)";
    let mut finals = Vec::new();

    for reverse in [false, true] {
        let engine = engine();
        let id = ExpressionId(20);
        engine.submit(id, OWNER, text).unwrap();

        let mut ready = vec![
            engine.pull_task().unwrap().unwrap(),
            engine.pull_task().unwrap().unwrap(),
        ];
        if reverse {
            ready.reverse();
        }
        assert!(matches!(
            engine.submit_result(ready[0].id, compute(&ready[0])).unwrap(),
            ResultOutcome::Progress { newly_scheduled: 0, .. }
        ));
        assert!(matches!(
            engine.submit_result(ready[1].id, compute(&ready[1])).unwrap(),
            ResultOutcome::Progress { newly_scheduled: 1, .. }
        ));
        finals.push(run_to_completion(&engine, id).0);
    }

    assert_eq!(finals, vec![15.0, 15.0]);
}

#[test]
fn concurrent_pulls_never_share_a_task() {
    let engine = engine();
    // 100 independent additions inside one expression: all ready at once.
    let text = vec!["(1+1)"; 100].join("*");
    engine.submit(ExpressionId(30), OWNER, &text).unwrap();
    let expected = engine.metrics().unwrap().queue_depth;
    assert_eq!(expected, 100);

    let seen = Mutex::new(Vec::new());
    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                while let Some(task) = engine.pull_task().unwrap() {
                    seen.lock().unwrap().push(task.id);
                }
            });
        }
    });

    let seen = seen.into_inner().unwrap();
    let unique: HashSet<TaskId> = seen.iter().copied().collect();
    assert_eq!(seen.len(), expected);
    assert_eq!(unique.len(), expected);
}

#[test]
fn concurrent_workers_finish_many_expressions() {
    let engine = engine();
    for i in 0..20 {
        engine.submit(ExpressionId(i), OWNER, "(1+2)*(3+4)-(10/5)").unwrap();
    }

    let finished = Mutex::new(Vec::new());
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| loop {
                let Some(task) = engine.pull_task().unwrap() else {
                    if engine.metrics().unwrap().live_expressions == 0 {
                        break;
                    }
                    std::thread::yield_now();
                    continue;
                };
                if let ResultOutcome::Finished(record) =
                    engine.submit_result(task.id, compute(&task)).unwrap()
                {
                    finished.lock().unwrap().push(record);
                }
            });
        }
    });

    let finished = finished.into_inner().unwrap();
    assert_eq!(finished.len(), 20);
    assert!(finished.iter().all(|r| r.result == Some(19.0)));
    assert_eq!(engine.metrics().unwrap().results_applied, 20 * 5);
}

#[test]
fn expired_lease_is_redelivered_once() {
    let engine = Engine::new(SchedulerConfig { task_lease_secs: 5, ..Default::default() });
    let id = ExpressionId(40);
    engine.submit(id, OWNER, "6/3").unwrap();

    let task = engine.pull_task().unwrap().unwrap();
    assert!(engine.pull_task().unwrap().is_none());
    assert_eq!(engine.reclaim_expired().unwrap(), 0);

    let later = Instant::now() + Duration::from_secs(6);
    assert_eq!(engine.reclaim_expired_at(later).unwrap(), 1);

    let again = engine.pull_task().unwrap().unwrap();
    assert_eq!(again.id, task.id);

    // The first worker answers late; the redelivered copy is then a duplicate.
    assert!(matches!(engine.submit_result(task.id, 2.0).unwrap(), ResultOutcome::Finished(_)));
    assert_eq!(
        engine.submit_result(again.id, 2.0).unwrap_err(),
        EngineError::DuplicateResult(task.id)
    );
    assert_eq!(engine.metrics().unwrap().leases_reclaimed, 1);
}

#[test]
fn result_for_requeued_task_removes_queued_copy() {
    let engine = Engine::new(SchedulerConfig { task_lease_secs: 1, ..Default::default() });
    engine.submit(ExpressionId(41), OWNER, "1+2").unwrap();
    let task = engine.pull_task().unwrap().unwrap();
    engine.reclaim_expired_at(Instant::now() + Duration::from_secs(2)).unwrap();
    assert_eq!(engine.queue_depth().unwrap(), 1);

    engine.submit_result(task.id, 3.0).unwrap();
    assert_eq!(engine.queue_depth().unwrap(), 0);
    assert!(engine.pull_task().unwrap().is_none());
}

#[test]
fn failed_task_fails_expression_and_purges_siblings() {
    let engine = engine();
    let id = ExpressionId(50);
    engine.submit(id, OWNER, "(1/0)+(2*3)").unwrap();
    let div = engine.pull_task().unwrap().unwrap();
    let mul = engine.pull_task().unwrap().unwrap();
    assert_eq!(div.operator, Operator::Div);

    let record = engine.fail_task(div.id, "division by zero").unwrap();
    assert_eq!(record.status, ExpressionStatus::Error);
    assert_eq!(record.result, None);

    assert_eq!(engine.submit_result(mul.id, 6.0).unwrap_err(), EngineError::TaskNotFound(mul.id));
    assert_eq!(engine.status(id, OWNER).unwrap_err(), EngineError::ExpressionNotFound(id));

    let metrics = engine.metrics().unwrap();
    assert_eq!(metrics.expressions_failed, 1);
    assert_eq!(metrics.in_flight, 0);
    assert_eq!(metrics.live_expressions, 0);
}

#[test]
fn non_finite_result_fails_expression() {
    let engine = engine();
    engine.submit(ExpressionId(51), OWNER, "1/0").unwrap();
    let task = engine.pull_task().unwrap().unwrap();
    let outcome = engine.submit_result(task.id, f64::INFINITY).unwrap();
    let ResultOutcome::Failed(record) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(record.status, ExpressionStatus::Error);
}

#[test]
fn other_expressions_unaffected_by_failure() {
    let engine = engine();
    engine.submit(ExpressionId(60), OWNER, "1/0").unwrap();
    engine.submit(ExpressionId(61), OWNER, "2+2").unwrap();

    let bad = engine.pull_task().unwrap().unwrap();
    engine.fail_task(bad.id, "division by zero").unwrap();

    let (value, _) = run_to_completion(&engine, ExpressionId(61));
    assert_eq!(value, 4.0);
}

#[test]
fn status_is_owner_scoped() {
    let engine = engine();
    let id = ExpressionId(70);
    engine.submit(id, OWNER, "5*5").unwrap();

    let record = engine.status(id, OWNER).unwrap();
    assert_eq!(record.status, ExpressionStatus::Pending);
    assert_eq!(
        engine.status(id, OwnerId(2)).unwrap_err(),
        EngineError::ExpressionNotFound(id)
    );
}

#[test]
fn resubmitting_live_id_rejected() {
    let engine = engine();
    engine.submit(ExpressionId(80), OWNER, "1+1").unwrap();
    assert_eq!(
        engine.submit(ExpressionId(80), OWNER, "2+2").unwrap_err(),
        EngineError::AlreadyExists(ExpressionId(80))
    );
}

#[test]
fn metrics_track_dispatch_and_latency() {
    let engine = engine();
    engine.submit(ExpressionId(90), OWNER, "3*3").unwrap();
    let task = engine.pull_task().unwrap().unwrap();

    let metrics = engine.metrics().unwrap();
    assert_eq!(metrics.tasks_dispatched, 1);
    assert_eq!(metrics.in_flight, 1);
    assert_eq!(metrics.queue_depth, 0);

    engine.submit_result(task.id, 9.0).unwrap();
    let metrics = engine.metrics().unwrap();
    assert_eq!(metrics.results_applied, 1);
    assert_eq!(metrics.latency_samples["*"], 1);
    assert!(metrics.last_completed_at.is_some());
}
