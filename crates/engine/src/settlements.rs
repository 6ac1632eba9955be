//! Settlement records.
//!
//! A settlement is money received that was distributed across a pool of
//! reimbursable transactions. The row does not store per-transaction
//! allocation; the distribution is applied directly to each transaction's
//! `reimbursed` amount.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub user_id: String,
    pub settlement_group: Option<String>,
    pub counterparty: Option<String>,
    pub amount: MoneyCents,
    pub settled_on: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settlements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub settlement_group: Option<String>,
    pub counterparty: Option<String>,
    pub amount_cents: i64,
    pub settled_on: Date,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Settlement> for ActiveModel {
    fn from(settlement: &Settlement) -> Self {
        Self {
            id: ActiveValue::Set(settlement.id.to_string()),
            user_id: ActiveValue::Set(settlement.user_id.clone()),
            settlement_group: ActiveValue::Set(settlement.settlement_group.clone()),
            counterparty: ActiveValue::Set(settlement.counterparty.clone()),
            amount_cents: ActiveValue::Set(settlement.amount.cents()),
            settled_on: ActiveValue::Set(settlement.settled_on),
            notes: ActiveValue::Set(settlement.notes.clone()),
        }
    }
}

impl TryFrom<Model> for Settlement {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("settlement".to_string()))?,
            user_id: model.user_id,
            settlement_group: model.settlement_group,
            counterparty: model.counterparty,
            amount: MoneyCents::new(model.amount_cents),
            settled_on: model.settled_on,
            notes: model.notes,
        })
    }
}
