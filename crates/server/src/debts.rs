//! Debt API endpoints

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use engine::{
    BatchRepaymentCmd, CatchUpOutcome, CreateDebtCmd, DebtFilter, DebtRole, DebtStatus, DebtView,
    Frequency, MoneyCents, Repayment, RepaymentCmd,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

#[derive(Deserialize)]
pub struct DebtNew {
    pub name: String,
    pub role: DebtRole,
    /// Decimal string, e.g. `"1200.00"`.
    pub principal: String,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub counterparty: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub settlement_group: Option<String>,
    pub installment: Option<String>,
    pub frequency: Option<Frequency>,
    pub start_date: Option<NaiveDate>,
    pub term_months: Option<i32>,
    pub create_transaction: Option<bool>,
}

#[derive(Deserialize)]
pub struct DebtQuery {
    pub role: Option<DebtRole>,
    pub status: Option<DebtStatus>,
    pub counterparty: Option<String>,
    pub settlement_group: Option<String>,
}

#[derive(Serialize)]
pub struct DebtGet {
    pub id: Uuid,
    pub name: String,
    pub role: DebtRole,
    pub status: DebtStatus,
    pub account_id: Option<Uuid>,
    pub principal_cents: i64,
    pub current_balance_cents: i64,
    pub remaining_cents: i64,
    pub progress_percent: u8,
    pub installment_cents: Option<i64>,
    pub frequency: Option<Frequency>,
    pub start_date: Option<NaiveDate>,
    pub next_due_date: Option<NaiveDate>,
    pub term_months: Option<i32>,
    pub counterparty: Option<String>,
    pub paid_cents: i64,
    pub adjustment_cents: i64,
    pub due_date: Option<NaiveDate>,
    pub settlement_group: Option<String>,
}

impl From<DebtView> for DebtGet {
    fn from(view: DebtView) -> Self {
        let debt = view.debt;
        Self {
            id: debt.id,
            name: debt.name,
            role: debt.role,
            status: view.status,
            account_id: debt.account_id,
            principal_cents: debt.principal.cents(),
            current_balance_cents: debt.current_balance.cents(),
            remaining_cents: view.remaining.cents(),
            progress_percent: view.progress_percent,
            installment_cents: debt.installment.map(MoneyCents::cents),
            frequency: debt.frequency,
            start_date: debt.start_date,
            next_due_date: debt.next_due_date,
            term_months: debt.term_months,
            counterparty: debt.counterparty,
            paid_cents: debt.paid.cents(),
            adjustment_cents: debt.adjustment.cents(),
            due_date: debt.due_date,
            settlement_group: debt.settlement_group,
        }
    }
}

#[derive(Serialize)]
pub struct CatchUpResult {
    pub debt_id: Uuid,
    pub applied: u32,
    pub current_balance_cents: i64,
    pub status: DebtStatus,
    pub next_due_date: Option<NaiveDate>,
}

impl From<CatchUpOutcome> for CatchUpResult {
    fn from(outcome: CatchUpOutcome) -> Self {
        Self {
            debt_id: outcome.debt_id,
            applied: outcome.applied,
            current_balance_cents: outcome.current_balance.cents(),
            status: outcome.status,
            next_due_date: outcome.next_due_date,
        }
    }
}

#[derive(Serialize)]
pub struct CatchUpFailure {
    pub debt_id: Uuid,
    pub error: String,
}

#[derive(Serialize)]
pub struct CatchUpAllResult {
    pub outcomes: Vec<CatchUpResult>,
    pub failures: Vec<CatchUpFailure>,
}

#[derive(Deserialize)]
pub struct RepaymentNew {
    pub amount: String,
    pub adjustment: Option<String>,
    pub repaid_on: Option<NaiveDate>,
    pub notes: Option<String>,
    pub account_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct RepaymentView {
    pub id: Uuid,
    pub debt_id: Uuid,
    pub amount_cents: i64,
    pub adjustment_cents: i64,
    pub repaid_on: NaiveDate,
    pub notes: Option<String>,
    pub transaction_id: Option<Uuid>,
}

impl From<Repayment> for RepaymentView {
    fn from(repayment: Repayment) -> Self {
        Self {
            id: repayment.id,
            debt_id: repayment.debt_id,
            amount_cents: repayment.amount.cents(),
            adjustment_cents: repayment.adjustment.cents(),
            repaid_on: repayment.repaid_on,
            notes: repayment.notes,
            transaction_id: repayment.transaction_id,
        }
    }
}

#[derive(Deserialize)]
pub struct BatchRepaymentNew {
    pub debt_ids: Vec<Uuid>,
    pub amount: String,
    pub adjustment: Option<String>,
    pub repaid_on: Option<NaiveDate>,
    pub notes: Option<String>,
    pub account_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct BatchAllocation {
    pub debt_id: Uuid,
    pub repayment_id: Uuid,
    pub amount_cents: i64,
}

#[derive(Serialize)]
pub struct BatchRepaymentResult {
    pub allocations: Vec<BatchAllocation>,
    pub skipped: Vec<Uuid>,
    pub transaction_id: Option<Uuid>,
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<DebtNew>,
) -> Result<(StatusCode, Json<DebtGet>), ServerError> {
    let principal = payload.principal.parse::<MoneyCents>()?;

    let mut cmd = CreateDebtCmd::new(&user.username, &payload.name, payload.role, principal);
    cmd.account_id = payload.account_id;
    cmd.category_id = payload.category_id;
    cmd.counterparty = payload.counterparty;
    cmd.due_date = payload.due_date;
    cmd.settlement_group = payload.settlement_group;
    cmd.installment = payload
        .installment
        .as_deref()
        .map(str::parse::<MoneyCents>)
        .transpose()?;
    cmd.frequency = payload.frequency;
    cmd.start_date = payload.start_date;
    cmd.term_months = payload.term_months;
    cmd.create_transaction = payload.create_transaction.unwrap_or(false);

    let debt = state.engine.create_debt(cmd).await?;
    let view = state.engine.debt(&user.username, debt.id).await?;
    Ok((StatusCode::CREATED, Json(view.into())))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DebtGet>, ServerError> {
    let view = state.engine.debt(&user.username, id).await?;
    Ok(Json(view.into()))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<DebtQuery>,
) -> Result<Json<Vec<DebtGet>>, ServerError> {
    let filter = DebtFilter {
        role: query.role,
        status: query.status,
        counterparty: query.counterparty,
        settlement_group: query.settlement_group,
    };
    let views = state.engine.list_debts(&user.username, &filter).await?;
    Ok(Json(views.into_iter().map(DebtGet::from).collect()))
}

pub async fn catch_up(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CatchUpResult>, ServerError> {
    let outcome = state.engine.catch_up_one(&user.username, id).await?;
    Ok(Json(outcome.into()))
}

pub async fn catch_up_all(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<CatchUpAllResult>, ServerError> {
    let report = state.engine.catch_up_all(&user.username).await?;
    Ok(Json(CatchUpAllResult {
        outcomes: report.outcomes.into_iter().map(CatchUpResult::from).collect(),
        failures: report
            .failures
            .into_iter()
            .map(|(debt_id, err)| CatchUpFailure {
                debt_id,
                error: err.to_string(),
            })
            .collect(),
    }))
}

pub async fn pay_early(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CatchUpResult>, ServerError> {
    let outcome = state.engine.pay_early(&user.username, id).await?;
    Ok(Json(outcome.into()))
}

pub async fn repayment_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RepaymentNew>,
) -> Result<(StatusCode, Json<RepaymentView>), ServerError> {
    let amount = payload.amount.parse::<MoneyCents>()?;

    let mut cmd = RepaymentCmd::new(&user.username, id, amount);
    cmd.adjustment = payload
        .adjustment
        .as_deref()
        .map(str::parse::<MoneyCents>)
        .transpose()?
        .unwrap_or(MoneyCents::ZERO);
    cmd.repaid_on = payload.repaid_on;
    cmd.notes = payload.notes;
    cmd.account_id = payload.account_id;

    let repayment = state.engine.add_repayment(cmd).await?;
    Ok((StatusCode::CREATED, Json(repayment.into())))
}

pub async fn repayment_list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RepaymentView>>, ServerError> {
    let repayments = state.engine.list_repayments(&user.username, id).await?;
    Ok(Json(
        repayments.into_iter().map(RepaymentView::from).collect(),
    ))
}

pub async fn repayment_remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path((id, repayment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_repayment(&user.username, id, repayment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn batch_repayment(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<BatchRepaymentNew>,
) -> Result<(StatusCode, Json<BatchRepaymentResult>), ServerError> {
    let amount = payload.amount.parse::<MoneyCents>()?;

    let mut cmd = BatchRepaymentCmd::new(&user.username, payload.debt_ids, amount);
    cmd.adjustment = payload
        .adjustment
        .as_deref()
        .map(str::parse::<MoneyCents>)
        .transpose()?
        .unwrap_or(MoneyCents::ZERO);
    cmd.repaid_on = payload.repaid_on;
    cmd.notes = payload.notes;
    cmd.account_id = payload.account_id;

    let outcome = state.engine.batch_repayment(cmd).await?;
    let allocations = outcome
        .allocations
        .into_iter()
        .map(|(debt_id, repayment_id, amount)| BatchAllocation {
            debt_id,
            repayment_id,
            amount_cents: amount.cents(),
        })
        .collect();
    Ok((
        StatusCode::CREATED,
        Json(BatchRepaymentResult {
            allocations,
            skipped: outcome.skipped,
            transaction_id: outcome.transaction_id,
        }),
    ))
}
