//! Account API endpoints

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Account, AccountKind, MoneyCents};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

#[derive(Deserialize)]
pub struct AccountNew {
    pub name: String,
    pub kind: AccountKind,
    /// Decimal string, e.g. `"120.50"`. Defaults to zero.
    pub opening_balance: Option<String>,
    pub currency: Option<String>,
}

#[derive(Serialize)]
pub struct AccountCreated {
    pub id: Uuid,
}

#[derive(Serialize)]
pub struct AccountView {
    pub id: Uuid,
    pub name: String,
    pub kind: AccountKind,
    pub balance_cents: i64,
    pub balance: String,
    pub currency: String,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            kind: account.kind,
            balance_cents: account.balance.cents(),
            balance: account.balance.to_string(),
            currency: account.currency,
        }
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<AccountNew>,
) -> Result<(StatusCode, Json<AccountCreated>), ServerError> {
    let opening_balance = match payload.opening_balance.as_deref() {
        Some(raw) => raw.parse::<MoneyCents>()?,
        None => MoneyCents::ZERO,
    };
    let id = state
        .engine
        .create_account(
            &user.username,
            &payload.name,
            payload.kind,
            opening_balance,
            payload.currency.as_deref().unwrap_or("EUR"),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(AccountCreated { id })))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountView>, ServerError> {
    let account = state.engine.account(&user.username, id).await?;
    Ok(Json(account.into()))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<AccountView>>, ServerError> {
    let accounts = state.engine.list_accounts(&user.username).await?;
    Ok(Json(accounts.into_iter().map(AccountView::from).collect()))
}
