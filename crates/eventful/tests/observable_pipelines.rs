#![forbid(unsafe_code)]

//! Observable combinator pipelines checked against expected output sequences.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use eventful::{Observable, ObservableConfig, Promise, ReplayPolicy, bind};
use eventful_harness::{
    Expectation, HarnessError, Recorder, expect_sequence, expect_values, init_test_tracing,
};

const TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn present_drops_absent_values() {
    init_test_tracing();
    expect_sequence(
        [Some(1), None, Some(2), None],
        &[Some(1), Some(2)],
        |o: &Observable<i32>| o.present(),
    )
    .unwrap();
}

#[test]
fn default_value_fills_gaps() {
    expect_sequence(
        [Some(1), None, Some(2), None],
        &[Some(1), Some(-1), Some(2), Some(-1)],
        |o: &Observable<i32>| o.default_value(-1),
    )
    .unwrap();
}

#[test]
fn map_sees_absent_input() {
    expect_sequence(
        [Some(2), None],
        &[Some("2".to_string()), Some("-".to_string())],
        |o: &Observable<i32>| o.map(|v| v.map_or_else(|| "-".to_string(), ToString::to_string)),
    )
    .unwrap();
}

#[test]
fn map_optional_parses_text() {
    expect_sequence(
        [Some("1"), Some("x"), None, Some("3")],
        &[Some(1), None, None, Some(3)],
        |o: &Observable<&'static str>| o.map_optional(|s| s.and_then(|s| s.parse::<i32>().ok())),
    )
    .unwrap();
}

#[test]
fn select_keeps_matching() {
    expect_values(&[1, 2, 3, 4, 5, 6], &[2, 4, 6], |o| {
        o.select(|v| v.is_some_and(|n| n % 2 == 0))
    })
    .unwrap();
}

#[test]
fn skip_counts_absent_emissions() {
    expect_sequence(
        [None, Some(1), None, Some(2)],
        &[None, Some(2)],
        |o: &Observable<i32>| o.skip(2),
    )
    .unwrap();
}

#[test]
fn composed_pipeline() {
    expect_sequence(
        [Some(1), None, Some(2), Some(3), None, Some(4)],
        &[Some(20), Some(0), Some(40)],
        |o: &Observable<i32>| {
            o.skip(2)
                .select(|v| v.is_none_or(|n| n % 2 == 0))
                .default_value(0)
                .map(|v| v.copied().unwrap_or_default() * 10)
                .select(|v| v.is_some())
                .present()
        },
    )
    .unwrap();
}

#[test]
fn mismatch_is_reported() {
    let err = expect_values(&[1, 2], &[1, 3], |o: &Observable<i32>| o.skip(0))
        .unwrap_err();
    assert!(matches!(err, HarnessError::Mismatch { index: 1, .. }), "{err}");
}

#[test]
fn then_flattens_immediate_promises() {
    expect_values(&[1, 2, 3], &[10, 30], |o: &Observable<i32>| {
        o.then(|v| {
            let n = v.copied().unwrap_or_default();
            if n == 2 {
                Promise::<i32>::rejected(eventful::Error::msg("two"))
            } else {
                Promise::resolved(n * 10)
            }
        })
    })
    .unwrap();
}

#[test]
fn then_forwards_in_resolution_order() {
    let source = Observable::<u64>::new();
    let pending: Arc<Mutex<Vec<Promise<u64>>>> = Arc::new(Mutex::new(Vec::new()));
    let queue = Arc::clone(&pending);
    let resolved = source.then(move |_| {
        let p = Promise::<u64>::new();
        queue.lock().unwrap().push(p.clone());
        p
    });
    let recorder = Recorder::attach(&resolved);

    source.emit_value(1);
    source.emit_value(2);
    let promises = pending.lock().unwrap().clone();
    assert_eq!(promises.len(), 2);
    assert!(recorder.is_empty());

    promises[1].resolve(200);
    promises[0].resolve(100);
    assert_eq!(recorder.present(), vec![200, 100]);
}

#[test]
fn then_across_threads() {
    let source = Observable::<u64>::new();
    let resolved = source.then(|v| {
        let millis = v.copied().unwrap_or_default();
        let p = Promise::<u64>::new();
        let producer = p.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(millis));
            producer.resolve(millis);
        });
        p
    });
    let recorder = Recorder::attach(&resolved);
    source.emit_value(1);
    source.emit_value(2);
    recorder.wait_for(2, TIMEOUT).unwrap();
    let mut seen = recorder.present();
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 2]);
}

#[test]
fn late_subscriber_without_replay_misses_history() {
    let source = Observable::<i32>::new();
    source.emit_value(1);
    let recorder = Recorder::attach(&source);
    assert!(recorder.is_empty());
    source.emit_value(2);
    assert_eq!(recorder.values(), vec![Some(2)]);
}

#[test]
fn cached_observable_replays_to_pipelines() {
    let source = Observable::<i32>::with_config(
        ObservableConfig::default()
            .with_replay(ReplayPolicy::Latest)
            .with_label("replayed"),
    );
    let doubled = Recorder::attach(&source.map(|v| v.copied().unwrap_or_default() * 2));
    source.emit_value(7);
    assert_eq!(doubled.present(), vec![14]);

    let late = Recorder::attach(&source);
    assert_eq!(late.values(), vec![Some(7)]);
    source.emit(None);
    assert_eq!(late.values(), vec![Some(7), None]);
    assert_eq!(source.latest(), Some(None));
    assert_eq!(doubled.present(), vec![14, 0]);
}

#[test]
fn subscription_detaches_on_drop() {
    let source = Observable::<i32>::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let subscription = source.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    source.emit_value(1);
    assert!(subscription.is_active());
    drop(subscription);
    source.emit_value(2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.subscriber_count(), 0);
}

#[test]
fn bound_slot_follows_pipeline() {
    let text = Observable::<String>::new();
    let label = Arc::new(Mutex::new(None::<String>));
    let shown = Expectation::with_count("label updates", 2);
    let e = shown.clone();
    let summary = text
        .map(|s| s.map_or(0, String::len))
        .map(|n| n.map(|n| format!("{n} chars")).unwrap_or_default());
    bind(&summary, Arc::downgrade(&label)).tap(move |_| e.fulfill());

    text.emit_value("hello".into());
    assert_eq!(label.lock().unwrap().as_deref(), Some("5 chars"));
    text.emit(None);
    assert_eq!(label.lock().unwrap().as_deref(), Some("0 chars"));
    shown.wait(TIMEOUT).unwrap();
}
