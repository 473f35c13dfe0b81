use std::{sync::Arc, thread, time::Duration};

use service::roster::StoreState;
use service::storage::file_lock::{FileLock, LockMode, LockSettings};
use service::{MutationOutcome, Rejection, RosterFileStore, RosterStore, StoreError, StoreOptions};
use uuid::Uuid;

fn data_path() -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("store_properties_{}", Uuid::new_v4()))
        .join("school_data.json")
}

fn patient() -> StoreOptions {
    StoreOptions {
        lock: LockSettings { max_attempts: 2000, retry_delay: Duration::from_millis(5) },
        ..StoreOptions::default()
    }
}

fn cleanup(store: &RosterFileStore) {
    if let Some(dir) = store.path().parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[test]
fn concurrent_duplicate_adds_succeed_exactly_once() -> anyhow::Result<()> {
    let store = RosterFileStore::open(data_path(), patient())?;
    let handles: Vec<_> = (0..20)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.add_student("الرابع أ", "محمد"))
        })
        .collect();
    let mut wins = 0;
    for h in handles {
        if h.join().expect("worker")? {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(store.get_students("الرابع أ")?, vec!["محمد"]);
    cleanup(&store);
    Ok(())
}

#[test]
fn independent_handles_share_one_lock() -> anyhow::Result<()> {
    // Separate handles open their own descriptors, as separate processes would.
    let path = data_path();
    let first = RosterFileStore::open(&path, patient())?;
    let handles: Vec<_> = (0..4)
        .map(|w| {
            let path = path.clone();
            thread::spawn(move || -> Result<(), StoreError> {
                let store = RosterFileStore::open(&path, patient())?;
                for i in 0..10 {
                    assert!(store.add_student("5-b", &format!("w{w}-s{i}"))?);
                    let _ = store.get_all_rosters()?;
                }
                Ok(())
            })
        })
        .collect();
    for h in handles {
        h.join().expect("worker")?;
    }
    assert_eq!(first.get_students("5-b")?.len(), 40);
    cleanup(&first);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fifty_parallel_callers_lose_no_updates() -> anyhow::Result<()> {
    let file_store = RosterFileStore::open(data_path(), patient())?;
    let store: Arc<dyn RosterStore> = file_store.clone();

    let tasks: Vec<_> = (0..50)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.add_student("6-c", &format!("student-{i:02}")).await })
        })
        .collect();
    for t in tasks {
        assert!(t.await??);
    }

    let mut roster = store.get_students("6-c").await?;
    roster.sort();
    let expected: Vec<String> = (0..50).map(|i| format!("student-{i:02}")).collect();
    assert_eq!(roster, expected);
    cleanup(&file_store);
    Ok(())
}

#[test]
fn read_after_write_is_consistent() -> anyhow::Result<()> {
    let store = RosterFileStore::open(data_path(), patient())?;
    for i in 0..10 {
        let name = format!("n{i}");
        assert!(store.add_student("4-a", &name)?);
        assert!(store.get_students("4-a")?.contains(&name));
    }
    assert_eq!(store.get_students("4-a")?.len(), 10);
    cleanup(&store);
    Ok(())
}

#[test]
fn stuck_writer_causes_timeout_without_touching_the_file() -> anyhow::Result<()> {
    let options = StoreOptions {
        lock: LockSettings { max_attempts: 3, retry_delay: Duration::from_millis(20) },
        ..StoreOptions::default()
    };
    let store = RosterFileStore::open(data_path(), options)?;
    store.add_student("4-a", "Lina")?;
    let before = std::fs::read(store.path())?;

    let stuck = FileLock::acquire(store.lock_path(), LockMode::Exclusive, &LockSettings::default())?;

    let err = store.add_student("4-a", "Omar").unwrap_err();
    assert!(matches!(err, StoreError::LockTimeout { mode: LockMode::Exclusive, attempts: 3, .. }));
    assert!(err.is_transient());
    assert!(matches!(store.get_students("4-a"), Err(StoreError::LockTimeout { mode: LockMode::Shared, .. })));
    assert!(matches!(store.clear_all("admin123"), Err(StoreError::LockTimeout { .. })));
    assert_eq!(std::fs::read(store.path())?, before);

    drop(stuck);
    assert!(store.add_student("4-a", "Omar")?);
    assert_eq!(store.get_students("4-a")?, vec!["Lina", "Omar"]);
    cleanup(&store);
    Ok(())
}

#[test]
fn gated_operations_leave_state_byte_identical_on_rejection() -> anyhow::Result<()> {
    let store = RosterFileStore::open(data_path(), patient())?;
    store.add_student("4-a", "Lina")?;
    store.add_student("5-b", "Sami")?;
    let before = store.snapshot()?;

    for (class, student) in [("4-a", "Lina"), ("4-a", "Ghost"), ("none", "Lina")] {
        assert_eq!(
            store.remove_student(class, student, "admin1234")?,
            MutationOutcome::Rejected(Rejection::WrongPassword)
        );
    }
    assert_eq!(store.clear_all("")?, MutationOutcome::Rejected(Rejection::WrongPassword));
    assert_eq!(store.remove_student("4-a", "Ghost", "admin123")?, MutationOutcome::Rejected(Rejection::NotFound));
    assert_eq!(store.snapshot()?, before);

    assert!(store.clear_all("admin123")?.is_applied());
    assert!(store.get_all_rosters()?.is_empty());
    assert!(store.add_student("4-a", "Lina")?);
    cleanup(&store);
    Ok(())
}

#[test]
fn every_write_carries_the_full_roster_set() -> anyhow::Result<()> {
    let store = RosterFileStore::open(data_path(), patient())?;
    for i in 0..100 {
        store.add_student("4-a", &format!("student-{i}"))?;
    }
    let small = std::fs::metadata(store.path())?.len();
    store.add_student("6-e", "late")?;
    let raw = std::fs::read(store.path())?;
    assert!(raw.len() as u64 > small);

    let state: StoreState = serde_json::from_slice(&raw)?;
    assert_eq!(state.total(), 101);
    assert_eq!(state.roster("4-a").len(), 100);
    cleanup(&store);
    Ok(())
}
