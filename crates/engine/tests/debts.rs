use chrono::{NaiveDate, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    AccountKind, BatchRepaymentCmd, CreateDebtCmd, DebtRole, DebtStatus, Engine, EngineError,
    FixedClock, Frequency, MoneyCents, RepaymentCmd, TransactionFilter, TransactionKind,
};
use migration::MigratorTrait;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Engine frozen at 2026-04-15.
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
        .clock(FixedClock(Utc.with_ymd_and_hms(2026, 4, 15, 12, 0, 0).unwrap()))
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn account_with_balance(engine: &Engine, name: &str, cents: i64) -> Uuid {
    engine
        .create_account(
            "alice",
            name,
            AccountKind::Bank,
            MoneyCents::new(cents),
            "EUR",
        )
        .await
        .unwrap()
}

async fn balance_of(engine: &Engine, account_id: Uuid) -> i64 {
    engine
        .account("alice", account_id)
        .await
        .unwrap()
        .balance
        .cents()
}

async fn debt_update_count(db: &DatabaseConnection, debt_id: Uuid) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_sql_and_values(
            backend,
            "SELECT COUNT(*) AS cnt FROM debt_updates WHERE debt_id = ?",
            vec![debt_id.to_string().into()],
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "cnt").unwrap()
}

#[tokio::test]
async fn catch_up_applies_missed_installments_once() {
    let (engine, db) = engine_with_db().await;
    let account = account_with_balance(&engine, "Checking", 100_000).await;

    let cmd = CreateDebtCmd::new(
        "alice",
        "Car loan",
        DebtRole::Institutional,
        MoneyCents::new(120_000),
    )
    .schedule(MoneyCents::new(10_000), Frequency::Monthly, date(2026, 1, 15))
    .account_id(account);
    let debt = engine.create_debt(cmd).await.unwrap();
    assert_eq!(debt.next_due_date, Some(date(2026, 1, 15)));

    // Due dates strictly before 2026-04-15: Jan, Feb, Mar.
    let outcome = engine.catch_up_one("alice", debt.id).await.unwrap();
    assert_eq!(outcome.applied, 3);
    assert_eq!(outcome.current_balance, MoneyCents::new(90_000));
    assert_eq!(outcome.status, DebtStatus::Open);
    assert_eq!(outcome.next_due_date, Some(date(2026, 4, 15)));

    assert_eq!(balance_of(&engine, account).await, 70_000);
    assert_eq!(debt_update_count(&db, debt.id).await, 3);

    // Replaying is a no-op.
    let again = engine.catch_up_one("alice", debt.id).await.unwrap();
    assert_eq!(again.applied, 0);
    assert_eq!(again.current_balance, MoneyCents::new(90_000));
    assert_eq!(balance_of(&engine, account).await, 70_000);
    assert_eq!(debt_update_count(&db, debt.id).await, 3);
}

#[tokio::test]
async fn catch_up_settles_the_debt_at_zero() {
    let (engine, _db) = engine_with_db().await;

    let cmd = CreateDebtCmd::new(
        "alice",
        "Tiny loan",
        DebtRole::Institutional,
        MoneyCents::new(20_000),
    )
    .schedule(MoneyCents::new(10_000), Frequency::Monthly, date(2026, 1, 15));
    let debt = engine.create_debt(cmd).await.unwrap();

    let outcome = engine.catch_up_one("alice", debt.id).await.unwrap();
    assert_eq!(outcome.applied, 2);
    assert_eq!(outcome.current_balance, MoneyCents::ZERO);
    assert_eq!(outcome.status, DebtStatus::Settled);
}

#[tokio::test]
async fn catch_up_rejects_personal_debts() {
    let (engine, _db) = engine_with_db().await;
    let debt = engine
        .create_debt(CreateDebtCmd::new(
            "alice",
            "Lunch",
            DebtRole::Lent,
            MoneyCents::new(1_000),
        ))
        .await
        .unwrap();

    let err = engine.catch_up_one("alice", debt.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidOperation(_)));
}

#[tokio::test]
async fn pay_early_advances_past_the_covered_due_date() {
    let (engine, db) = engine_with_db().await;

    let cmd = CreateDebtCmd::new(
        "alice",
        "Phone plan",
        DebtRole::Institutional,
        MoneyCents::new(60_000),
    )
    .schedule(MoneyCents::new(5_000), Frequency::Monthly, date(2026, 5, 1));
    let debt = engine.create_debt(cmd).await.unwrap();

    let outcome = engine.pay_early("alice", debt.id).await.unwrap();
    assert_eq!(outcome.applied, 1);
    assert_eq!(outcome.current_balance, MoneyCents::new(55_000));
    assert_eq!(outcome.next_due_date, Some(date(2026, 6, 1)));
    assert_eq!(debt_update_count(&db, debt.id).await, 1);

    // The covered occurrence is never re-applied.
    let caught_up = engine.catch_up_one("alice", debt.id).await.unwrap();
    assert_eq!(caught_up.applied, 0);
    assert_eq!(caught_up.current_balance, MoneyCents::new(55_000));
}

#[tokio::test]
async fn pay_early_is_rejected_once_the_installment_is_due() {
    let (engine, _db) = engine_with_db().await;

    let cmd = CreateDebtCmd::new(
        "alice",
        "Phone plan",
        DebtRole::Institutional,
        MoneyCents::new(60_000),
    )
    .schedule(MoneyCents::new(5_000), Frequency::Monthly, date(2026, 4, 1));
    let debt = engine.create_debt(cmd).await.unwrap();

    let err = engine.pay_early("alice", debt.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidOperation(_)));
}

#[tokio::test]
async fn repayment_and_its_deletion_are_exact_inverses() {
    let (engine, _db) = engine_with_db().await;
    let account = account_with_balance(&engine, "Checking", 20_000).await;

    // Lending 100.00 from the account records the principal expense.
    let debt = engine
        .create_debt(
            CreateDebtCmd::new("alice", "Lunch money", DebtRole::Lent, MoneyCents::new(10_000))
                .counterparty("Bob")
                .account_id(account),
        )
        .await
        .unwrap();
    assert_eq!(balance_of(&engine, account).await, 10_000);

    let repayment = engine
        .add_repayment(RepaymentCmd::new("alice", debt.id, MoneyCents::new(4_000)))
        .await
        .unwrap();
    assert!(repayment.transaction_id.is_some());
    assert_eq!(balance_of(&engine, account).await, 14_000);

    let view = engine.debt("alice", debt.id).await.unwrap();
    assert_eq!(view.remaining, MoneyCents::new(6_000));
    assert_eq!(view.status, DebtStatus::Open);
    assert_eq!(view.progress_percent, 40);

    engine
        .delete_repayment("alice", debt.id, repayment.id)
        .await
        .unwrap();
    assert_eq!(balance_of(&engine, account).await, 10_000);
    let view = engine.debt("alice", debt.id).await.unwrap();
    assert_eq!(view.remaining, MoneyCents::new(10_000));
}

#[tokio::test]
async fn overpayment_settles_and_clamps_the_balance() {
    let (engine, _db) = engine_with_db().await;
    let debt = engine
        .create_debt(CreateDebtCmd::new(
            "alice",
            "Lunch money",
            DebtRole::Lent,
            MoneyCents::new(10_000),
        ))
        .await
        .unwrap();

    engine
        .add_repayment(RepaymentCmd::new("alice", debt.id, MoneyCents::new(12_000)))
        .await
        .unwrap();

    let view = engine.debt("alice", debt.id).await.unwrap();
    assert_eq!(view.status, DebtStatus::Settled);
    assert_eq!(view.remaining, MoneyCents::new(-2_000));
    assert_eq!(view.debt.current_balance, MoneyCents::ZERO);
}

#[tokio::test]
async fn repayments_on_institutional_debts_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let cmd = CreateDebtCmd::new(
        "alice",
        "Car loan",
        DebtRole::Institutional,
        MoneyCents::new(120_000),
    )
    .schedule(MoneyCents::new(10_000), Frequency::Monthly, date(2026, 5, 1));
    let debt = engine.create_debt(cmd).await.unwrap();

    let err = engine
        .add_repayment(RepaymentCmd::new("alice", debt.id, MoneyCents::new(1_000)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOperation(_)));
}

#[tokio::test]
async fn overdue_personal_debt_is_reported() {
    let (engine, _db) = engine_with_db().await;
    let debt = engine
        .create_debt(
            CreateDebtCmd::new("alice", "Old favour", DebtRole::Borrowed, MoneyCents::new(5_000))
                .due_date(date(2026, 4, 1)),
        )
        .await
        .unwrap();

    let view = engine.debt("alice", debt.id).await.unwrap();
    assert_eq!(view.status, DebtStatus::Overdue);
}

#[tokio::test]
async fn batch_repayment_splits_proportionally_with_one_transaction() {
    let (engine, _db) = engine_with_db().await;

    let big = engine
        .create_debt(CreateDebtCmd::new(
            "alice",
            "Dinner",
            DebtRole::Lent,
            MoneyCents::new(6_000),
        ))
        .await
        .unwrap();
    let small = engine
        .create_debt(CreateDebtCmd::new(
            "alice",
            "Taxi",
            DebtRole::Lent,
            MoneyCents::new(4_000),
        ))
        .await
        .unwrap();

    let outcome = engine
        .batch_repayment(BatchRepaymentCmd::new(
            "alice",
            vec![big.id, small.id],
            MoneyCents::new(5_000),
        ))
        .await
        .unwrap();

    assert!(outcome.skipped.is_empty());
    assert_eq!(outcome.allocations.len(), 2);
    assert_eq!(outcome.allocations[0].0, big.id);
    assert_eq!(outcome.allocations[0].2, MoneyCents::new(3_000));
    assert_eq!(outcome.allocations[1].0, small.id);
    assert_eq!(outcome.allocations[1].2, MoneyCents::new(2_000));

    assert_eq!(
        engine.debt("alice", big.id).await.unwrap().remaining,
        MoneyCents::new(3_000)
    );
    assert_eq!(
        engine.debt("alice", small.id).await.unwrap().remaining,
        MoneyCents::new(2_000)
    );

    // One income transaction for the whole batch.
    let incomes = engine
        .list_transactions(
            "alice",
            &TransactionFilter {
                kind: Some(TransactionKind::Income),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(incomes.len(), 1);
    assert_eq!(incomes[0].amount, MoneyCents::new(5_000));
    assert_eq!(Some(incomes[0].id), outcome.transaction_id);
}

#[tokio::test]
async fn batch_repayment_skips_settled_debts() {
    let (engine, _db) = engine_with_db().await;

    let open = engine
        .create_debt(CreateDebtCmd::new(
            "alice",
            "Dinner",
            DebtRole::Lent,
            MoneyCents::new(6_000),
        ))
        .await
        .unwrap();
    let settled = engine
        .create_debt(CreateDebtCmd::new(
            "alice",
            "Taxi",
            DebtRole::Lent,
            MoneyCents::new(4_000),
        ))
        .await
        .unwrap();
    engine
        .add_repayment(RepaymentCmd::new("alice", settled.id, MoneyCents::new(4_000)))
        .await
        .unwrap();

    let outcome = engine
        .batch_repayment(BatchRepaymentCmd::new(
            "alice",
            vec![open.id, settled.id],
            MoneyCents::new(1_000),
        ))
        .await
        .unwrap();

    assert_eq!(outcome.skipped, vec![settled.id]);
    assert_eq!(outcome.allocations.len(), 1);
    assert_eq!(outcome.allocations[0].0, open.id);
    assert_eq!(outcome.allocations[0].2, MoneyCents::new(1_000));
}

#[tokio::test]
async fn mixed_role_batches_are_rejected() {
    let (engine, _db) = engine_with_db().await;

    let lent = engine
        .create_debt(CreateDebtCmd::new(
            "alice",
            "Dinner",
            DebtRole::Lent,
            MoneyCents::new(6_000),
        ))
        .await
        .unwrap();
    let borrowed = engine
        .create_debt(CreateDebtCmd::new(
            "alice",
            "Rent share",
            DebtRole::Borrowed,
            MoneyCents::new(4_000),
        ))
        .await
        .unwrap();

    let err = engine
        .batch_repayment(BatchRepaymentCmd::new(
            "alice",
            vec![lent.id, borrowed.id],
            MoneyCents::new(1_000),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOperation(_)));
}

#[tokio::test]
async fn catch_up_all_covers_every_institutional_debt() {
    let (engine, _db) = engine_with_db().await;

    for name in ["Car loan", "Bike loan"] {
        engine
            .create_debt(
                CreateDebtCmd::new("alice", name, DebtRole::Institutional, MoneyCents::new(60_000))
                    .schedule(MoneyCents::new(5_000), Frequency::Monthly, date(2026, 3, 1)),
            )
            .await
            .unwrap();
    }

    let report = engine.catch_up_all("alice").await.unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(report.outcomes.len(), 2);
    for outcome in report.outcomes {
        assert_eq!(outcome.applied, 2);
        assert_eq!(outcome.current_balance, MoneyCents::new(50_000));
    }
}

#[tokio::test]
async fn catch_up_all_keeps_successes_when_one_debt_fails() {
    let (engine, db) = engine_with_db().await;

    let healthy = engine
        .create_debt(
            CreateDebtCmd::new("alice", "Bike loan", DebtRole::Institutional, MoneyCents::new(60_000))
                .schedule(MoneyCents::new(5_000), Frequency::Monthly, date(2026, 3, 1)),
        )
        .await
        .unwrap();
    let broken = engine
        .create_debt(
            CreateDebtCmd::new("alice", "Car loan", DebtRole::Institutional, MoneyCents::new(60_000))
                .schedule(MoneyCents::new(5_000), Frequency::Monthly, date(2026, 3, 1)),
        )
        .await
        .unwrap();

    // Strip the schedule from one debt so its catch-up fails.
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE debts SET frequency = NULL WHERE id = ?",
        vec![broken.id.to_string().into()],
    ))
    .await
    .unwrap();

    let report = engine.catch_up_all("alice").await.unwrap();
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].debt_id, healthy.id);
    assert_eq!(report.outcomes[0].applied, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, broken.id);
    assert!(matches!(
        report.failures[0].1,
        EngineError::InvalidOperation(_)
    ));
}
