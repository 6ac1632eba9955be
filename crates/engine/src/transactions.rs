//! Transaction primitives.
//!
//! A `Transaction` records one money movement. Its amount is always
//! non-negative; the sign of the balance effect is derived from the kind,
//! never stored.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Expense,
    Income,
    Savings,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Savings => "savings",
            Self::Transfer => "transfer",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            "savings" => Ok(Self::Savings),
            "transfer" => Ok(Self::Transfer),
            other => Err(EngineError::InvalidOperation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    /// Source account. Absent for debt-tracking-only records, which carry no
    /// balance effect.
    pub account_id: Option<Uuid>,
    /// Destination account; only transfers and savings moves carry one.
    pub to_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount: MoneyCents,
    pub occurred_at: DateTime<Utc>,
    pub description: String,
    pub is_reimbursable: bool,
    /// How much of a reimbursable expense has been paid back so far.
    /// Invariant: `reimbursed <= amount`.
    pub reimbursed: MoneyCents,
    pub counterparty: Option<String>,
    pub settlement_group: Option<String>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: String,
        kind: TransactionKind,
        amount: MoneyCents,
        occurred_at: DateTime<Utc>,
        account_id: Option<Uuid>,
        to_account_id: Option<Uuid>,
        category_id: Option<Uuid>,
        description: String,
    ) -> ResultEngine<Self> {
        if amount.is_negative() {
            return Err(EngineError::InvalidAmount(
                "amount must not be negative".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            account_id,
            to_account_id,
            category_id,
            kind,
            amount,
            occurred_at,
            description,
            is_reimbursable: false,
            reimbursed: MoneyCents::ZERO,
            counterparty: None,
            settlement_group: None,
        })
    }

    /// Outstanding reimbursable amount (`amount - reimbursed`).
    pub fn pending_reimbursement(&self) -> MoneyCents {
        self.amount - self.reimbursed
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub account_id: Option<String>,
    pub to_account_id: Option<String>,
    pub category_id: Option<String>,
    pub kind: String,
    pub amount_cents: i64,
    pub occurred_at: DateTimeUtc,
    pub description: String,
    pub is_reimbursable: bool,
    pub reimbursed_cents: i64,
    pub counterparty: Option<String>,
    pub settlement_group: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Categories,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            account_id: ActiveValue::Set(tx.account_id.map(|id| id.to_string())),
            to_account_id: ActiveValue::Set(tx.to_account_id.map(|id| id.to_string())),
            category_id: ActiveValue::Set(tx.category_id.map(|id| id.to_string())),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_cents: ActiveValue::Set(tx.amount.cents()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            description: ActiveValue::Set(tx.description.clone()),
            is_reimbursable: ActiveValue::Set(tx.is_reimbursable),
            reimbursed_cents: ActiveValue::Set(tx.reimbursed.cents()),
            counterparty: ActiveValue::Set(tx.counterparty.clone()),
            settlement_group: ActiveValue::Set(tx.settlement_group.clone()),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let parse_opt = |value: Option<String>, label: &str| -> ResultEngine<Option<Uuid>> {
            value
                .map(|raw| {
                    Uuid::parse_str(&raw).map_err(|_| EngineError::NotFound(label.to_string()))
                })
                .transpose()
        };
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("transaction".to_string()))?,
            user_id: model.user_id,
            account_id: parse_opt(model.account_id, "account")?,
            to_account_id: parse_opt(model.to_account_id, "account")?,
            category_id: parse_opt(model.category_id, "category")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount: MoneyCents::new(model.amount_cents),
            occurred_at: model.occurred_at,
            description: model.description,
            is_reimbursable: model.is_reimbursable,
            reimbursed: MoneyCents::new(model.reimbursed_cents),
            counterparty: model.counterparty,
            settlement_group: model.settlement_group,
        })
    }
}
