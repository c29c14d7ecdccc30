//! Repository behavior against a real (temporary) SQLite database.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;
use uuid::Uuid;

use moneta_core::ids::RecordId;
use moneta_core::records::{
    DebtFields, InvestmentGoalFields, OwnerId, SyncEnvelope, SyncStatus, Syncable, Transaction,
    TransactionDirection, TransactionFields,
};
use moneta_core::sync::{RecordFilter, RecordStore, SyncStateStore};
use moneta_storage_sqlite::Database;

fn open_database() -> Database {
    let path = std::env::temp_dir().join(format!("moneta-test-{}.db", Uuid::new_v4()));
    Database::open(path.to_str().unwrap()).expect("open test database")
}

fn owner() -> OwnerId {
    OwnerId::from("user_1")
}

fn coffee() -> TransactionFields {
    TransactionFields {
        description: "Coffee".to_string(),
        amount: dec!(12.50),
        date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        direction: TransactionDirection::Expense,
        category: Some("food".to_string()),
    }
}

fn salary() -> TransactionFields {
    TransactionFields {
        description: "Salary".to_string(),
        amount: dec!(3200),
        date: NaiveDate::from_ymd_opt(2024, 5, 28).unwrap(),
        direction: TransactionDirection::Income,
        category: None,
    }
}

#[tokio::test]
async fn insert_new_round_trips_through_sqlite() {
    let db = open_database();
    let repo = db.transactions();

    let record = repo.insert_new(&owner(), coffee()).await.unwrap();
    assert!(record.envelope.id.is_temporary());
    assert_eq!(record.envelope.sync_status, SyncStatus::Pending);
    assert_eq!(record.envelope.version, 1);

    let loaded = repo.get(&record.envelope.id).await.unwrap().unwrap();
    assert_eq!(loaded.fields, coffee());
    assert_eq!(loaded.envelope, record.envelope);
}

#[tokio::test]
async fn get_returns_none_for_unknown_id() {
    let db = open_database();
    let repo = db.transactions();

    let missing = repo.get(&RecordId::from("tx_404")).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn update_bumps_version_and_reopens_pending() {
    let db = open_database();
    let repo = db.transactions();

    let record = repo.insert_new(&owner(), coffee()).await.unwrap();
    let temp_id = record.envelope.id.clone();
    let mut confirmed = record;
    confirmed
        .envelope
        .confirm_synced(RecordId::from("tx_001"), Utc::now());
    repo.replace(&temp_id, &confirmed).await.unwrap();

    confirmed.fields.amount = dec!(14);
    let updated = repo.update(confirmed).await.unwrap();
    assert_eq!(updated.envelope.version, 2);
    assert_eq!(updated.envelope.sync_status, SyncStatus::Pending);

    let loaded = repo.get(&updated.envelope.id).await.unwrap().unwrap();
    assert_eq!(loaded.fields.amount, dec!(14));
    assert_eq!(loaded.envelope.sync_status, SyncStatus::Pending);
}

#[tokio::test]
async fn remove_purges_temporary_rows_immediately() {
    let db = open_database();
    let repo = db.transactions();

    let record = repo.insert_new(&owner(), coffee()).await.unwrap();
    repo.remove(&record.envelope.id).await.unwrap();

    assert!(repo.get(&record.envelope.id).await.unwrap().is_none());
    let tombstones = repo
        .list_by_owner(&owner(), RecordFilter::Tombstoned)
        .await
        .unwrap();
    assert!(tombstones.is_empty());
}

#[tokio::test]
async fn remove_tombstones_confirmed_rows() {
    let db = open_database();
    let repo = db.transactions();

    let record = Transaction::from_parts(
        SyncEnvelope::from_remote(RecordId::from("tx_001"), owner(), Utc::now()),
        coffee(),
    );
    repo.put(&record).await.unwrap();
    repo.remove(&record.envelope.id).await.unwrap();

    let loaded = repo.get(&record.envelope.id).await.unwrap().unwrap();
    assert!(loaded.envelope.is_deleted);
    assert_eq!(loaded.envelope.sync_status, SyncStatus::Pending);

    let live = repo.list_by_owner(&owner(), RecordFilter::Live).await.unwrap();
    assert!(live.is_empty());
    let tombstones = repo
        .list_by_owner(&owner(), RecordFilter::Tombstoned)
        .await
        .unwrap();
    assert_eq!(tombstones.len(), 1);
}

#[tokio::test]
async fn replace_swaps_identities_atomically() {
    let db = open_database();
    let repo = db.transactions();

    let record = repo.insert_new(&owner(), coffee()).await.unwrap();
    let temp_id = record.envelope.id.clone();

    let mut confirmed = record;
    confirmed
        .envelope
        .confirm_synced(RecordId::from("tx_001"), Utc::now());
    repo.replace(&temp_id, &confirmed).await.unwrap();

    assert!(repo.get(&temp_id).await.unwrap().is_none());
    let loaded = repo.get(&RecordId::from("tx_001")).await.unwrap().unwrap();
    assert_eq!(loaded.envelope.sync_status, SyncStatus::Synced);
    assert_eq!(
        repo.list_by_owner(&owner(), RecordFilter::All)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn list_by_owner_applies_filters_and_scoping() {
    let db = open_database();
    let repo = db.transactions();

    // Pending live row.
    repo.insert_new(&owner(), coffee()).await.unwrap();
    // Confirmed row.
    repo.put(&Transaction::from_parts(
        SyncEnvelope::from_remote(RecordId::from("tx_001"), owner(), Utc::now()),
        salary(),
    ))
    .await
    .unwrap();
    // Tombstoned row.
    repo.remove(&RecordId::from("tx_001")).await.unwrap();
    // Someone else's row must never surface.
    repo.insert_new(&OwnerId::from("user_2"), salary())
        .await
        .unwrap();

    let all = repo.list_by_owner(&owner(), RecordFilter::All).await.unwrap();
    assert_eq!(all.len(), 2);
    let pending = repo
        .list_by_owner(&owner(), RecordFilter::PendingLive)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].envelope.id.is_temporary());
    let tombstoned = repo
        .list_by_owner(&owner(), RecordFilter::Tombstoned)
        .await
        .unwrap();
    assert_eq!(tombstoned.len(), 1);
    assert_eq!(tombstoned[0].envelope.id.as_str(), "tx_001");
}

#[tokio::test]
async fn watch_by_owner_refreshes_on_writes() {
    let db = open_database();
    let repo = db.transactions();

    let mut live = repo.watch_by_owner(&owner());
    assert!(live.snapshot().is_empty());

    let record = repo.insert_new(&owner(), coffee()).await.unwrap();
    assert!(tokio::time::timeout(Duration::from_secs(5), live.changed())
        .await
        .expect("snapshot refresh timed out"));
    let snapshot = live.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].fields.description, "Coffee");

    // Tombstoned rows disappear from the view.
    repo.put(&Transaction::from_parts(
        SyncEnvelope::from_remote(RecordId::from("tx_001"), owner(), Utc::now()),
        coffee(),
    ))
    .await
    .unwrap();
    assert!(tokio::time::timeout(Duration::from_secs(5), live.changed())
        .await
        .expect("snapshot refresh timed out"));
    repo.remove(&RecordId::from("tx_001")).await.unwrap();
    assert!(tokio::time::timeout(Duration::from_secs(5), live.changed())
        .await
        .expect("snapshot refresh timed out"));
    let snapshot = live.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].envelope.id.as_str(), record.envelope.id.as_str());
}

#[tokio::test]
async fn debt_and_goal_repositories_round_trip() {
    let db = open_database();

    let debts = db.debts();
    let debt = debts
        .insert_new(
            &owner(),
            DebtFields {
                creditor: "Auto Bank".to_string(),
                amount: dec!(5400),
                due_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                is_settled: false,
            },
        )
        .await
        .unwrap();
    let loaded = debts.get(&debt.envelope.id).await.unwrap().unwrap();
    assert_eq!(loaded.fields.creditor, "Auto Bank");
    assert_eq!(loaded.fields.amount, dec!(5400));

    let goals = db.investment_goals();
    let goal = goals
        .insert_new(
            &owner(),
            InvestmentGoalFields {
                name: "House deposit".to_string(),
                target_amount: dec!(40000),
                contributed_amount: dec!(1500.25),
                target_date: NaiveDate::from_ymd_opt(2027, 6, 1),
            },
        )
        .await
        .unwrap();
    let loaded = goals.get(&goal.envelope.id).await.unwrap().unwrap();
    assert_eq!(loaded.fields.contributed_amount, dec!(1500.25));
    assert_eq!(
        loaded.fields.target_date,
        NaiveDate::from_ymd_opt(2027, 6, 1)
    );
}

#[tokio::test]
async fn sync_state_records_last_completed_pass() {
    let db = open_database();
    let state = db.sync_state();

    assert!(state.last_completed_pass(&owner()).await.unwrap().is_none());

    let first = Utc::now();
    state.record_completed_pass(&owner(), first).await.unwrap();
    let stored = state.last_completed_pass(&owner()).await.unwrap().unwrap();
    assert_eq!(stored.timestamp_millis(), first.timestamp_millis());

    let second = Utc::now();
    state.record_completed_pass(&owner(), second).await.unwrap();
    let stored = state.last_completed_pass(&owner()).await.unwrap().unwrap();
    assert_eq!(stored.timestamp_millis(), second.timestamp_millis());
}
