#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Concurrent merges and lock-free reads against one shared registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use web_errors::{CodeMap, CodeRegistry, ErrorRegistry};

fn codes(pairs: &[(&str, &str)]) -> CodeMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

#[test]
fn concurrent_service_registrations_all_land() {
    let registry = Arc::new(CodeRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|svc| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for n in 0..50 {
                    let code = format!("B{svc}{n:03}");
                    let label = format!("service {svc} error {n}");
                    registry.merge(&[CodeMap::from([(code, label)])]);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    for svc in 0..8 {
        for n in 0..50 {
            assert_eq!(
                registry.lookup(&format!("B{svc}{n:03}")),
                format!("service {svc} error {n}")
            );
        }
    }
    assert_eq!(registry.lookup("S500"), "RUNTIME");
}

#[test]
fn readers_never_observe_a_half_applied_merge() {
    let registry = Arc::new(CodeRegistry::new());
    registry.merge(&[codes(&[("A1", "v0"), ("A2", "v0")])]);

    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut checked = 0_u64;
                while !done.load(Ordering::Acquire) {
                    let snapshot = registry.snapshot().unwrap();
                    assert_eq!(snapshot.get("A1"), snapshot.get("A2"));
                    assert_eq!(snapshot.get("S400"), Some("BAD_REQUEST"));
                    checked += 1;
                }
                checked
            })
        })
        .collect();

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for round in 0..200 {
                    let label = format!("w{w}-r{round}");
                    registry.merge(&[codes(&[("A1", &label), ("A2", &label)])]);
                }
            })
        })
        .collect();

    for w in writers {
        w.join().unwrap();
    }
    done.store(true, Ordering::Release);
    for r in readers {
        r.join().unwrap();
    }

    let last = registry.snapshot().unwrap();
    assert_eq!(last.get("A1"), last.get("A2"));
    assert!(last.get("A1").unwrap().ends_with("-r199"));
}

#[test]
fn shared_as_trait_object() {
    let registry: Arc<dyn ErrorRegistry> = Arc::new(CodeRegistry::default());
    let other = Arc::clone(&registry);
    other.merge(&[codes(&[("E1", "User")])]);
    assert_eq!(registry.lookup("E1"), "User");
}
