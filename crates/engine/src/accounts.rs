//! The module contains the `Account` struct and its persisted model.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

/// Where money is held: a bank account, physical cash, a credit card, a
/// digital wallet, or a savings pot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Bank,
    Cash,
    CreditCard,
    Wallet,
    Savings,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Cash => "cash",
            Self::CreditCard => "credit_card",
            Self::Wallet => "wallet",
            Self::Savings => "savings",
        }
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "bank" => Ok(Self::Bank),
            "cash" => Ok(Self::Cash),
            "credit_card" => Ok(Self::CreditCard),
            "wallet" => Ok(Self::Wallet),
            "savings" => Ok(Self::Savings),
            other => Err(EngineError::InvalidOperation(format!(
                "invalid account kind: {other}"
            ))),
        }
    }
}

/// An account owned by one user.
///
/// The stored balance is signed and mutated only by the transaction ledger;
/// nothing else in the engine is allowed to touch it. Currency is a display
/// label, not a convertible unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub kind: AccountKind,
    pub balance: MoneyCents,
    pub currency: String,
}

impl Account {
    pub fn new(
        user_id: String,
        name: String,
        kind: AccountKind,
        balance: MoneyCents,
        currency: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            kind,
            balance,
            currency,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub kind: String,
    pub balance_cents: i64,
    pub currency: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: ActiveValue::Set(account.id.to_string()),
            user_id: ActiveValue::Set(account.user_id.clone()),
            name: ActiveValue::Set(account.name.clone()),
            kind: ActiveValue::Set(account.kind.as_str().to_string()),
            balance_cents: ActiveValue::Set(account.balance.cents()),
            currency: ActiveValue::Set(account.currency.clone()),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("account".to_string()))?,
            user_id: model.user_id,
            name: model.name,
            kind: AccountKind::try_from(model.kind.as_str())?,
            balance: MoneyCents::new(model.balance_cents),
            currency: model.currency,
        })
    }
}
