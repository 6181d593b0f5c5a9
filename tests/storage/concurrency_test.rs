//! Concurrent handle tests

use crate::common::*;
use std::collections::HashSet;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;

#[test]
fn test_reader_never_sees_partial_set() {
    let store = Arc::new(test_store());
    let doc_a = json!({"v": "a", "items": (0..50).collect::<Vec<u32>>()});
    let doc_b = json!({"v": "b", "items": (100..150).collect::<Vec<u32>>()});
    store.set("/doc", &bytes(&doc_a)).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let writer = {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        let (doc_a, doc_b) = (doc_a.clone(), doc_b.clone());
        thread::spawn(move || {
            barrier.wait();
            for i in 0..50 {
                let doc = if i % 2 == 0 { &doc_b } else { &doc_a };
                store.set("/doc", &bytes(doc)).unwrap();
            }
        })
    };

    barrier.wait();
    for _ in 0..200 {
        let seen = read_json(store.as_ref(), "/doc", &GetOptions::default()).unwrap();
        assert!(seen == doc_a || seen == doc_b, "partial document: {seen}");
    }
    writer.join().unwrap();
}

#[test]
fn test_concurrent_pushes_get_unique_keys() {
    let store = Arc::new(test_store());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                (0..25)
                    .map(|i| {
                        store
                            .push("/events", &bytes(&json!({"t": t, "i": i})))
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut keys = HashSet::new();
    for handle in handles {
        for key in handle.join().unwrap() {
            assert!(keys.insert(key));
        }
    }

    let doc = read_json(store.as_ref(), "/events", &GetOptions::default()).unwrap();
    assert_eq!(doc.as_object().unwrap().len(), 100);
}

#[test]
fn test_handles_on_same_file_see_committed_writes() {
    let (dir, first) = file_store();
    let second = open_file_store(&dir);

    first.set("/shared", br#"{"n":1}"#).unwrap();
    assert_document(&second, "/shared", &json!({"n": 1}));

    second.update("/shared", br#"{"m":2}"#).unwrap();
    assert_document(&first, "/shared", &json!({"n": 1, "m": 2}));
}

#[test]
fn test_racing_creates_one_winner() {
    let (dir, _store) = file_store();
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = open_file_store(&dir);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.create("/lock", &bytes(&json!({"owner": t})))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for err in results.into_iter().filter_map(Result::err) {
        assert_eq!(err.error_code(), "CONFLICT");
    }
}

#[test]
fn test_bounded_writer_waits_for_busy_connection() {
    let store = Arc::new(test_store());
    let barrier = Arc::new(Barrier::new(2));

    // keep the shared connection busy from another thread
    let holder = {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            let bounded = store.with_timeout(Duration::from_secs(5));
            barrier.wait();
            for _ in 0..200 {
                bounded.set("/busy", br#"{"x":1}"#).unwrap();
            }
        })
    };

    barrier.wait();
    let bounded = store.with_timeout(Duration::from_secs(5));
    bounded.set("/other", b"1").unwrap();
    holder.join().unwrap();

    assert_document(store.as_ref(), "/other", &json!(1));
}

#[test]
fn test_timed_out_writes_never_surface() {
    let store = Arc::new(test_store());
    let small = json!({"v": "small"});
    store.set("/doc", &bytes(&small)).unwrap();
    let large = json!({"v": "large", "items": (0..50_000).collect::<Vec<u32>>()});

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            (0..5)
                .filter(|_| {
                    store
                        .with_timeout(Duration::from_millis(1))
                        .set("/doc", &bytes(&large))
                        .is_err()
                })
                .count()
        })
    };

    for _ in 0..50 {
        let seen = read_json(store.as_ref(), "/doc", &GetOptions::default()).unwrap();
        assert_eq!(seen, small);
    }
    assert_eq!(writer.join().unwrap(), 5);
    assert_document(store.as_ref(), "/doc", &small);
}
