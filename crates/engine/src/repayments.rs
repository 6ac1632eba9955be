//! Append-only ledger of informal repayments against personal debts.
//!
//! Deleting a repayment must reverse its effect on the parent debt and on
//! any linked transaction, so the linked transaction id is kept on the row.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repayment {
    pub id: Uuid,
    pub debt_id: Uuid,
    pub amount: MoneyCents,
    pub adjustment: MoneyCents,
    pub repaid_on: NaiveDate,
    pub notes: Option<String>,
    pub transaction_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "repayments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub debt_id: String,
    pub amount_cents: i64,
    pub adjustment_cents: i64,
    pub repaid_on: Date,
    pub notes: Option<String>,
    pub transaction_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::debts::Entity",
        from = "Column::DebtId",
        to = "super::debts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Debts,
}

impl Related<super::debts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Debts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Repayment> for ActiveModel {
    fn from(repayment: &Repayment) -> Self {
        Self {
            id: ActiveValue::Set(repayment.id.to_string()),
            debt_id: ActiveValue::Set(repayment.debt_id.to_string()),
            amount_cents: ActiveValue::Set(repayment.amount.cents()),
            adjustment_cents: ActiveValue::Set(repayment.adjustment.cents()),
            repaid_on: ActiveValue::Set(repayment.repaid_on),
            notes: ActiveValue::Set(repayment.notes.clone()),
            transaction_id: ActiveValue::Set(repayment.transaction_id.map(|id| id.to_string())),
        }
    }
}

impl TryFrom<Model> for Repayment {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("repayment".to_string()))?,
            debt_id: Uuid::parse_str(&model.debt_id)
                .map_err(|_| EngineError::NotFound("debt".to_string()))?,
            amount: MoneyCents::new(model.amount_cents),
            adjustment: MoneyCents::new(model.adjustment_cents),
            repaid_on: model.repaid_on,
            notes: model.notes,
            transaction_id: model
                .transaction_id
                .map(|raw| {
                    Uuid::parse_str(&raw)
                        .map_err(|_| EngineError::NotFound("transaction".to_string()))
                })
                .transpose()?,
        })
    }
}
