//! Multi-connection writers on one file-backed ledger.

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use ual_core::Actor;
use ual_core::LedgerError;
use ual_core::chain::verify_chain;
use ual_core::config::{AppendConfig, ListConfig};
use ual_core::db::open_ledger;
use ual_core::ledger::{RecordFilter, append, list_records, void_record};
use ual_core::model::NewRecord;

const WRITERS: usize = 6;
const APPENDS_PER_WRITER: usize = 15;

#[test]
fn concurrent_appends_never_fork() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("ledger.sqlite3");
    drop(open_ledger(&path).expect("create ledger"));

    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut conn = open_ledger(&path).expect("open ledger");
                let actor = Actor::new(format!("writer-{writer}")).expect("actor");
                let cfg = AppendConfig {
                    max_retries: 50,
                    retry_backoff_ms: 1,
                };
                barrier.wait();
                (0..APPENDS_PER_WRITER)
                    .map(|n| {
                        let record = NewRecord::new(
                            "approve",
                            format!("PO-{writer}-{n}"),
                            "purchase_order",
                            "finance",
                        );
                        append(&mut conn, &actor, &record, &cfg).expect("append").hash
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut hashes = HashSet::new();
    for handle in handles {
        for hash in handle.join().expect("writer thread") {
            assert!(hashes.insert(hash), "duplicate hash returned");
        }
    }

    let conn = open_ledger(&path).expect("reopen");
    let report = verify_chain(&conn).expect("verify");
    assert!(report.is_intact(), "breaks: {:?}", report.breaks);
    assert_eq!(report.records_checked, (WRITERS * APPENDS_PER_WRITER) as u64);

    let forks: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM (
                SELECT prev_hash FROM actions GROUP BY COALESCE(prev_hash, '') HAVING COUNT(*) > 1
            )",
            [],
            |row| row.get(0),
        )
        .expect("fork query");
    assert_eq!(forks, 0);

    let page = list_records(&conn, &RecordFilter::default(), &ListConfig::default()).expect("list");
    assert_eq!(page.total, hashes.len() as u64);
}

#[test]
fn concurrent_voids_succeed_exactly_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("ledger.sqlite3");
    let id = {
        let mut conn = open_ledger(&path).expect("create ledger");
        let actor = Actor::new("alice").expect("actor");
        append(
            &mut conn,
            &actor,
            &NewRecord::new("submit", "PO-1", "purchase_order", "finance"),
            &AppendConfig::default(),
        )
        .expect("append")
        .id
    };

    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|n| {
            let path = path.clone();
            let id = id.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_ledger(&path).expect("open ledger");
                let actor = Actor::new(format!("voider-{n}")).expect("actor");
                barrier.wait();
                void_record(&conn, &actor, &id, "race")
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("void thread"))
        .collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "results: {results:?}");
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, LedgerError::AlreadyVoided(_)))
    );
}
