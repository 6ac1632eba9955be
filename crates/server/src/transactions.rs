//! Transactions API endpoints

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use engine::{
    CreateTransactionCmd, MoneyCents, Transaction, TransactionFilter, TransactionKind,
    UpdateTransactionCmd,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

#[derive(Deserialize)]
pub struct TransactionNew {
    /// Decimal string, e.g. `"12.34"`.
    pub amount: String,
    pub kind: Option<TransactionKind>,
    pub account_id: Option<Uuid>,
    pub to_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub reimbursable: Option<bool>,
    pub counterparty: Option<String>,
    pub settlement_group: Option<String>,
}

#[derive(Deserialize)]
pub struct TransactionPatch {
    pub amount: Option<String>,
    pub kind: Option<TransactionKind>,
    pub account_id: Option<Uuid>,
    pub to_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub reimbursable: Option<bool>,
    pub counterparty: Option<String>,
    pub settlement_group: Option<String>,
}

#[derive(Deserialize)]
pub struct TransactionQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub reimbursable: Option<bool>,
    pub settlement_group: Option<String>,
    pub counterparty: Option<String>,
}

#[derive(Serialize)]
pub struct TransactionView {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub amount_cents: i64,
    pub amount: String,
    pub occurred_at: DateTime<Utc>,
    pub account_id: Option<Uuid>,
    pub to_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub description: String,
    pub is_reimbursable: bool,
    pub reimbursed_cents: i64,
    pub pending_cents: i64,
    pub counterparty: Option<String>,
    pub settlement_group: Option<String>,
}

impl From<Transaction> for TransactionView {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            kind: tx.kind,
            amount_cents: tx.amount.cents(),
            amount: tx.amount.to_string(),
            occurred_at: tx.occurred_at,
            account_id: tx.account_id,
            to_account_id: tx.to_account_id,
            category_id: tx.category_id,
            description: tx.description.clone(),
            is_reimbursable: tx.is_reimbursable,
            reimbursed_cents: tx.reimbursed.cents(),
            pending_cents: tx.pending_reimbursement().cents(),
            counterparty: tx.counterparty,
            settlement_group: tx.settlement_group,
        }
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let amount = payload.amount.parse::<MoneyCents>()?;
    let occurred_at = payload.occurred_at.unwrap_or_else(Utc::now);

    let mut cmd = CreateTransactionCmd::new(&user.username, amount, occurred_at);
    cmd.kind = payload.kind;
    cmd.account_id = payload.account_id;
    cmd.to_account_id = payload.to_account_id;
    cmd.category_id = payload.category_id;
    cmd.description = payload.description.unwrap_or_default();
    cmd.is_reimbursable = payload.reimbursable.unwrap_or(false);
    cmd.counterparty = payload.counterparty;
    cmd.settlement_group = payload.settlement_group;

    let tx = state.engine.create_transaction(cmd).await?;
    Ok((StatusCode::CREATED, Json(tx.into())))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionPatch>,
) -> Result<Json<TransactionView>, ServerError> {
    let mut cmd = UpdateTransactionCmd::new(&user.username, id);
    cmd.amount = payload
        .amount
        .as_deref()
        .map(str::parse::<MoneyCents>)
        .transpose()?;
    cmd.kind = payload.kind;
    cmd.account_id = payload.account_id;
    cmd.to_account_id = payload.to_account_id;
    cmd.category_id = payload.category_id;
    cmd.occurred_at = payload.occurred_at;
    cmd.description = payload.description;
    cmd.is_reimbursable = payload.reimbursable;
    cmd.counterparty = payload.counterparty;
    cmd.settlement_group = payload.settlement_group;

    let tx = state.engine.update_transaction(cmd).await?;
    Ok(Json(tx.into()))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_transaction(&user.username, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<TransactionView>>, ServerError> {
    let filter = TransactionFilter {
        from: query.from,
        to: query.to,
        account_id: query.account_id,
        category_id: query.category_id,
        kind: query.kind,
        reimbursable: query.reimbursable,
        settlement_group: query.settlement_group,
        counterparty: query.counterparty,
    };
    let txs = state.engine.list_transactions(&user.username, &filter).await?;
    Ok(Json(txs.into_iter().map(TransactionView::from).collect()))
}
