//! Settlement API endpoints

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use engine::{MoneyCents, Settlement, SettlementCmd, SettlementFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

#[derive(Deserialize)]
pub struct SettlementNew {
    /// Decimal string, e.g. `"45.00"`.
    pub amount: String,
    pub settlement_group: Option<String>,
    pub counterparty: Option<String>,
    pub settled_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct SettlementQuery {
    pub settlement_group: Option<String>,
    pub counterparty: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct AllocationView {
    pub transaction_id: Uuid,
    pub amount_cents: i64,
}

#[derive(Serialize)]
pub struct SettlementView {
    pub id: Uuid,
    pub settlement_group: Option<String>,
    pub counterparty: Option<String>,
    pub amount_cents: i64,
    pub settled_on: NaiveDate,
    pub notes: Option<String>,
}

impl From<Settlement> for SettlementView {
    fn from(settlement: Settlement) -> Self {
        Self {
            id: settlement.id,
            settlement_group: settlement.settlement_group,
            counterparty: settlement.counterparty,
            amount_cents: settlement.amount.cents(),
            settled_on: settlement.settled_on,
            notes: settlement.notes,
        }
    }
}

#[derive(Serialize)]
pub struct SettlementCreated {
    pub settlement: SettlementView,
    pub allocations: Vec<AllocationView>,
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<SettlementNew>,
) -> Result<(StatusCode, Json<SettlementCreated>), ServerError> {
    let amount = payload.amount.parse::<MoneyCents>()?;

    let mut cmd = SettlementCmd::new(&user.username, amount);
    cmd.settlement_group = payload.settlement_group;
    cmd.counterparty = payload.counterparty;
    cmd.settled_on = payload.settled_on;
    cmd.notes = payload.notes;

    let outcome = state.engine.create_settlement(cmd).await?;
    let allocations = outcome
        .allocations
        .into_iter()
        .map(|(transaction_id, share)| AllocationView {
            transaction_id,
            amount_cents: share.cents(),
        })
        .collect();
    Ok((
        StatusCode::CREATED,
        Json(SettlementCreated {
            settlement: outcome.settlement.into(),
            allocations,
        }),
    ))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<SettlementQuery>,
) -> Result<Json<Vec<SettlementView>>, ServerError> {
    let filter = SettlementFilter {
        settlement_group: query.settlement_group,
        counterparty: query.counterparty,
        from: query.from,
        to: query.to,
    };
    let settlements = state.engine.list_settlements(&user.username, &filter).await?;
    Ok(Json(
        settlements.into_iter().map(SettlementView::from).collect(),
    ))
}

pub async fn counterparties(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<String>>, ServerError> {
    Ok(Json(state.engine.counterparties(&user.username).await?))
}

pub async fn groups(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<String>>, ServerError> {
    Ok(Json(state.engine.settlement_groups(&user.username).await?))
}
