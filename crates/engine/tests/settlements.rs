use chrono::Utc;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    AccountKind, CreateTransactionCmd, Engine, EngineError, MoneyCents, SettlementCmd,
    SettlementFilter, TransactionKind,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password) VALUES (?, ?)",
        vec!["alice".into(), "password".into()],
    ))
    .await
    .unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn reimbursable_expense(
    engine: &Engine,
    account: Uuid,
    cents: i64,
    group: &str,
    counterparty: &str,
) -> Uuid {
    let mut cmd = CreateTransactionCmd::new("alice", MoneyCents::new(cents), Utc::now());
    cmd.kind = Some(TransactionKind::Expense);
    cmd.account_id = Some(account);
    cmd.is_reimbursable = true;
    cmd.settlement_group = Some(group.to_string());
    cmd.counterparty = Some(counterparty.to_string());
    engine.create_transaction(cmd).await.unwrap().id
}

async fn account(engine: &Engine) -> Uuid {
    engine
        .create_account(
            "alice",
            "Checking",
            AccountKind::Bank,
            MoneyCents::new(100_000),
            "EUR",
        )
        .await
        .unwrap()
}

async fn pending_of(engine: &Engine, tx_id: Uuid) -> i64 {
    engine
        .transaction("alice", tx_id)
        .await
        .unwrap()
        .pending_reimbursement()
        .cents()
}

#[tokio::test]
async fn settlement_distributes_proportionally() {
    let (engine, _db) = engine_with_db().await;
    let account = account(&engine).await;
    let big = reimbursable_expense(&engine, account, 6_000, "trip", "Bob").await;
    let small = reimbursable_expense(&engine, account, 4_000, "trip", "Bob").await;

    let outcome = engine
        .create_settlement(
            SettlementCmd::new("alice", MoneyCents::new(5_000)).settlement_group("trip"),
        )
        .await
        .unwrap();

    assert_eq!(outcome.allocations.len(), 2);
    assert_eq!(outcome.allocations[0], (big, MoneyCents::new(3_000)));
    assert_eq!(outcome.allocations[1], (small, MoneyCents::new(2_000)));

    // Conservation: shares sum to the settled amount exactly.
    let total: i64 = outcome.allocations.iter().map(|(_, s)| s.cents()).sum();
    assert_eq!(total, 5_000);

    assert_eq!(pending_of(&engine, big).await, 3_000);
    assert_eq!(pending_of(&engine, small).await, 2_000);
}

#[tokio::test]
async fn uneven_amounts_still_sum_exactly() {
    let (engine, _db) = engine_with_db().await;
    let account = account(&engine).await;
    for cents in [3_300, 3_300, 3_400] {
        reimbursable_expense(&engine, account, cents, "rent", "Bob").await;
    }

    let outcome = engine
        .create_settlement(
            SettlementCmd::new("alice", MoneyCents::new(9_999)).settlement_group("rent"),
        )
        .await
        .unwrap();

    let total: i64 = outcome.allocations.iter().map(|(_, s)| s.cents()).sum();
    assert_eq!(total, 9_999);
}

#[tokio::test]
async fn over_settlement_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let account = account(&engine).await;
    reimbursable_expense(&engine, account, 6_000, "trip", "Bob").await;

    let err = engine
        .create_settlement(
            SettlementCmd::new("alice", MoneyCents::new(10_000)).settlement_group("trip"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOperation(_)));
}

#[tokio::test]
async fn an_empty_pool_is_rejected() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .create_settlement(
            SettlementCmd::new("alice", MoneyCents::new(1_000)).settlement_group("nothing"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOperation(_)));
}

#[tokio::test]
async fn a_settlement_needs_a_group_or_counterparty() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .create_settlement(SettlementCmd::new("alice", MoneyCents::new(1_000)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOperation(_)));
}

#[tokio::test]
async fn fully_reimbursed_transactions_leave_the_pool() {
    let (engine, _db) = engine_with_db().await;
    let account = account(&engine).await;
    let tx = reimbursable_expense(&engine, account, 6_000, "trip", "Bob").await;

    engine
        .create_settlement(
            SettlementCmd::new("alice", MoneyCents::new(6_000)).settlement_group("trip"),
        )
        .await
        .unwrap();
    assert_eq!(pending_of(&engine, tx).await, 0);

    // The pool is empty now; another settlement has nothing to absorb.
    let err = engine
        .create_settlement(
            SettlementCmd::new("alice", MoneyCents::new(100)).settlement_group("trip"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOperation(_)));
}

#[tokio::test]
async fn settlements_can_pool_by_counterparty() {
    let (engine, _db) = engine_with_db().await;
    let account = account(&engine).await;
    let tx = reimbursable_expense(&engine, account, 4_000, "trip", "Bob").await;
    reimbursable_expense(&engine, account, 9_000, "trip", "Carla").await;

    let outcome = engine
        .create_settlement(
            SettlementCmd::new("alice", MoneyCents::new(4_000)).counterparty("Bob"),
        )
        .await
        .unwrap();

    assert_eq!(outcome.allocations, vec![(tx, MoneyCents::new(4_000))]);
}

#[tokio::test]
async fn listing_and_vocabularies() {
    let (engine, _db) = engine_with_db().await;
    let account = account(&engine).await;
    reimbursable_expense(&engine, account, 4_000, "trip", "Bob").await;
    reimbursable_expense(&engine, account, 4_000, "rent", "Carla").await;

    engine
        .create_settlement(
            SettlementCmd::new("alice", MoneyCents::new(1_000)).settlement_group("trip"),
        )
        .await
        .unwrap();

    let all = engine
        .list_settlements("alice", &SettlementFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].amount, MoneyCents::new(1_000));

    let by_group = engine
        .list_settlements(
            "alice",
            &SettlementFilter {
                settlement_group: Some("rent".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(by_group.is_empty());

    assert_eq!(
        engine.counterparties("alice").await.unwrap(),
        vec!["Bob".to_string(), "Carla".to_string()]
    );
    assert_eq!(
        engine.settlement_groups("alice").await.unwrap(),
        vec!["rent".to_string(), "trip".to_string()]
    );
}
