/*!
 * Staleness Reclaimer Tests
 * Eligibility, idempotence and partial-failure behaviour
 */

use crate::common::{FlakyRegistry, RecordingSignaller};
use battle_supervisor::reclaim::FailureKind;
use battle_supervisor::registry::{MemoryRegistry, ProcessStatus, RegistryClient};
use battle_supervisor::{StalenessReclaimer, StalenessWindow};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;

const WINDOW: StalenessWindow = StalenessWindow::from_secs(360);

fn reclaimer(
    registry: impl RegistryClient + 'static,
    signaller: Arc<RecordingSignaller>,
) -> StalenessReclaimer {
    StalenessReclaimer::new(Arc::new(registry), signaller)
}

#[test]
fn test_window_scenario() {
    let registry = MemoryRegistry::with_fixed_time(1000);
    let a = registry.insert_running(101, 500).unwrap();
    let b = registry.insert_running(102, 800).unwrap();

    let signaller = Arc::new(RecordingSignaller::default());
    let report = reclaimer(registry.clone(), signaller.clone())
        .reclaim(WINDOW)
        .unwrap();

    assert_eq!(report.now, 1000);
    assert_eq!(report.threshold, 640);
    assert_eq!(report.reclaimed, 1);
    assert_eq!(signaller.sent(), vec![101]);
    assert_eq!(registry.get(a).unwrap().status, ProcessStatus::Reclaimed);
    assert_eq!(registry.get(b).unwrap().status, ProcessStatus::Running);
}

#[test]
fn test_one_signal_per_stale_record() {
    let registry = MemoryRegistry::with_fixed_time(10_000);
    for pid in 1..=5 {
        registry.insert_running(pid, i64::from(pid) * 100).unwrap();
    }

    let signaller = Arc::new(RecordingSignaller::default());
    let report = reclaimer(registry.clone(), signaller.clone())
        .reclaim(WINDOW)
        .unwrap();

    assert_eq!(report.examined, 5);
    assert_eq!(report.signalled, 5);
    assert_eq!(signaller.sent(), vec![1, 2, 3, 4, 5]);
    assert_eq!(registry.count_running().unwrap(), 0);
}

#[test]
fn test_second_pass_is_a_no_op() {
    let registry = MemoryRegistry::with_fixed_time(1000);
    registry.insert_running(101, 500).unwrap();

    let signaller = Arc::new(RecordingSignaller::default());
    let reclaimer = reclaimer(registry.clone(), signaller.clone());

    reclaimer.reclaim(WINDOW).unwrap();
    let before = registry.records().unwrap();

    let second = reclaimer.reclaim(WINDOW).unwrap();
    assert_eq!(second.examined, 0);
    assert_eq!(second.reclaimed, 0);
    assert_eq!(signaller.sent(), vec![101]);
    assert_eq!(registry.records().unwrap(), before);
}

#[test]
fn test_empty_registry_is_silent() {
    let registry = MemoryRegistry::with_fixed_time(1000);
    let signaller = Arc::new(RecordingSignaller::default());

    let report = reclaimer(registry, signaller.clone())
        .reclaim(WINDOW)
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.examined, 0);
    assert!(signaller.sent().is_empty());
}

#[test]
fn test_already_gone_process_is_still_reclaimed() {
    let registry = MemoryRegistry::with_fixed_time(1000);
    let id = registry.insert_running(404, 0).unwrap();

    let signaller = Arc::new(RecordingSignaller::with_gone([404]));
    let report = reclaimer(registry.clone(), signaller)
        .reclaim(WINDOW)
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.already_gone, 1);
    assert_eq!(report.signalled, 0);
    assert_eq!(registry.get(id).unwrap().status, ProcessStatus::Reclaimed);
}

#[test]
fn test_failed_update_does_not_stop_the_batch() {
    let inner = MemoryRegistry::with_fixed_time(1000);
    inner.insert_running(1, 100).unwrap();
    inner.insert_running(2, 200).unwrap();
    inner.insert_running(3, 300).unwrap();

    let flaky = FlakyRegistry {
        inner: inner.clone(),
        failing: [2].into_iter().collect(),
    };
    let signaller = Arc::new(RecordingSignaller::default());
    let report = reclaimer(flaky, signaller.clone()).reclaim(WINDOW).unwrap();

    assert_eq!(signaller.sent(), vec![1, 2, 3]);
    assert_eq!(report.reclaimed, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].pid, 2);
    assert!(matches!(report.failures[0].kind, FailureKind::Inconsistent(_)));

    // The ghost record stays running and is retried next pass
    let running: Vec<u32> = inner
        .find_stale_running(i64::MAX)
        .unwrap()
        .into_iter()
        .map(|r| r.pid)
        .collect();
    assert_eq!(running, vec![2]);
}

#[test]
fn test_clock_advance_makes_record_eligible() {
    let registry = MemoryRegistry::with_fixed_time(1000);
    let id = registry.insert_running(55, 1000).unwrap();

    let signaller = Arc::new(RecordingSignaller::default());
    let reclaimer = reclaimer(registry.clone(), signaller.clone());

    registry.advance(360);
    reclaimer.reclaim(WINDOW).unwrap();
    assert_eq!(registry.get(id).unwrap().status, ProcessStatus::Running);

    registry.advance(1);
    reclaimer.reclaim(WINDOW).unwrap();
    assert_eq!(registry.get(id).unwrap().status, ProcessStatus::Reclaimed);
    assert_eq!(signaller.sent(), vec![55]);
}

proptest! {
    #[test]
    fn prop_reclaims_exactly_the_stale_records(
        starts in proptest::collection::vec(0i64..2000, 0..40),
        now in 0i64..2000,
        window in 0i64..1000,
    ) {
        let registry = MemoryRegistry::with_fixed_time(now);
        for (i, start) in starts.iter().enumerate() {
            registry.insert_running(i as u32 + 1, *start).unwrap();
        }

        let signaller = Arc::new(RecordingSignaller::default());
        let report = reclaimer(registry.clone(), signaller.clone())
            .reclaim(StalenessWindow::from_secs(window))
            .unwrap();

        let expected = starts.iter().filter(|s| **s < now - window).count();
        prop_assert_eq!(report.reclaimed, expected);
        prop_assert_eq!(signaller.sent().len(), expected);

        for record in registry.records().unwrap() {
            let stale = record.start_time < now - window;
            let reclaimed = record.status == ProcessStatus::Reclaimed;
            prop_assert_eq!(stale, reclaimed);
        }
    }
}
