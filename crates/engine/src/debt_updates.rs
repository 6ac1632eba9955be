//! Applied (or attempted) scheduled installments of institutional debts.
//!
//! One row per due date; the `(debt_id, update_date)` pair is unique so a
//! replayed catch-up can never double-apply an installment.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtUpdateStatus {
    Paid,
    Pending,
    Skipped,
}

impl DebtUpdateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Pending => "pending",
            Self::Skipped => "skipped",
        }
    }
}

impl TryFrom<&str> for DebtUpdateStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "paid" => Ok(Self::Paid),
            "pending" => Ok(Self::Pending),
            "skipped" => Ok(Self::Skipped),
            other => Err(EngineError::InvalidOperation(format!(
                "invalid debt update status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtUpdate {
    pub id: Uuid,
    pub debt_id: Uuid,
    pub update_date: NaiveDate,
    pub transaction_id: Option<Uuid>,
    pub status: DebtUpdateStatus,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "debt_updates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub debt_id: String,
    pub update_date: Date,
    pub transaction_id: Option<String>,
    pub status: String,
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

impl From<&DebtUpdate> for ActiveModel {
    fn from(update: &DebtUpdate) -> Self {
        Self {
            id: ActiveValue::Set(update.id.to_string()),
            debt_id: ActiveValue::Set(update.debt_id.to_string()),
            update_date: ActiveValue::Set(update.update_date),
            transaction_id: ActiveValue::Set(update.transaction_id.map(|id| id.to_string())),
            status: ActiveValue::Set(update.status.as_str().to_string()),
        }
    }
}

impl TryFrom<Model> for DebtUpdate {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("debt update".to_string()))?,
            debt_id: Uuid::parse_str(&model.debt_id)
                .map_err(|_| EngineError::NotFound("debt".to_string()))?,
            update_date: model.update_date,
            transaction_id: model
                .transaction_id
                .map(|raw| {
                    Uuid::parse_str(&raw)
                        .map_err(|_| EngineError::NotFound("transaction".to_string()))
                })
                .transpose()?,
            status: DebtUpdateStatus::try_from(model.status.as_str())?,
        })
    }
}
