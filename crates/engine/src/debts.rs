//! Debt primitives: institutional loans and informal lent/borrowed money.
//!
//! The two families share one table but move differently:
//!
//! - **Institutional** debts amortize on a fixed schedule. `current_balance`
//!   drops by exactly `installment` per applied catch-up event and the
//!   `paid`/`adjustment` running totals stay unused.
//! - **Personal** (`lent`/`borrowed`) debts are tracked through free-form
//!   repayments: `remaining = principal - paid + adjustment`, and
//!   `current_balance` is the clamped non-negative materialization of it.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Frequency, MoneyCents, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtRole {
    /// Money the user lent out and expects back.
    Lent,
    /// Money the user borrowed and has to pay back.
    Borrowed,
    /// A scheduled loan from an institution (mortgage, car loan).
    Institutional,
}

impl DebtRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lent => "lent",
            Self::Borrowed => "borrowed",
            Self::Institutional => "institutional",
        }
    }

    pub fn is_personal(self) -> bool {
        !matches!(self, Self::Institutional)
    }
}

impl TryFrom<&str> for DebtRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "lent" => Ok(Self::Lent),
            "borrowed" => Ok(Self::Borrowed),
            "institutional" => Ok(Self::Institutional),
            other => Err(EngineError::InvalidOperation(format!(
                "invalid debt role: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    Open,
    Settled,
    Overdue,
}

impl DebtStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Settled => "settled",
            Self::Overdue => "overdue",
        }
    }
}

impl TryFrom<&str> for DebtStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "open" => Ok(Self::Open),
            "settled" => Ok(Self::Settled),
            "overdue" => Ok(Self::Overdue),
            other => Err(EngineError::InvalidOperation(format!(
                "invalid debt status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub id: Uuid,
    pub user_id: String,
    pub account_id: Option<Uuid>,
    pub name: String,
    pub role: DebtRole,
    pub status: DebtStatus,
    pub principal: MoneyCents,
    pub current_balance: MoneyCents,
    // Institutional only.
    pub installment: Option<MoneyCents>,
    pub frequency: Option<Frequency>,
    pub start_date: Option<NaiveDate>,
    pub next_due_date: Option<NaiveDate>,
    pub term_months: Option<i32>,
    // Personal only.
    pub counterparty: Option<String>,
    pub paid: MoneyCents,
    pub adjustment: MoneyCents,
    pub due_date: Option<NaiveDate>,
    pub settlement_group: Option<String>,
}

impl Debt {
    /// Outstanding amount of a personal debt (may be negative when overpaid).
    pub fn remaining(&self) -> MoneyCents {
        match self.role {
            DebtRole::Institutional => self.current_balance,
            DebtRole::Lent | DebtRole::Borrowed => self.principal - self.paid + self.adjustment,
        }
    }

    /// Recomputes `status` and `current_balance` from the running totals.
    ///
    /// Settled iff remaining <= 0; overdue iff remaining > 0 and the due
    /// date (when set) lies strictly before `today`; open otherwise. Only
    /// meaningful for personal debts.
    pub fn recompute_personal(&mut self, today: NaiveDate) {
        let remaining = self.remaining();
        self.current_balance = remaining.clamp_non_negative();
        self.status = if !remaining.is_positive() {
            DebtStatus::Settled
        } else if self.due_date.is_some_and(|due| due < today) {
            DebtStatus::Overdue
        } else {
            DebtStatus::Open
        };
    }

    /// Amortization progress as an integer percentage (0..=100).
    pub fn progress_percent(&self) -> u8 {
        if !self.principal.is_positive() {
            return 100;
        }
        let repaid = (self.principal - self.remaining().clamp_non_negative())
            .clamp_non_negative()
            .cents();
        let percent = repaid.saturating_mul(100) / self.principal.cents();
        percent.clamp(0, 100) as u8
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "debts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub account_id: Option<String>,
    pub name: String,
    pub role: String,
    pub status: String,
    pub principal_cents: i64,
    pub current_balance_cents: i64,
    pub installment_cents: Option<i64>,
    pub frequency: Option<String>,
    pub start_date: Option<Date>,
    pub next_due_date: Option<Date>,
    pub term_months: Option<i32>,
    pub counterparty: Option<String>,
    pub paid_cents: i64,
    pub adjustment_cents: i64,
    pub due_date: Option<Date>,
    pub settlement_group: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::debt_updates::Entity")]
    DebtUpdates,
    #[sea_orm(has_many = "super::repayments::Entity")]
    Repayments,
}

impl Related<super::debt_updates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DebtUpdates.def()
    }
}

impl Related<super::repayments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Debt> for ActiveModel {
    fn from(debt: &Debt) -> Self {
        Self {
            id: ActiveValue::Set(debt.id.to_string()),
            user_id: ActiveValue::Set(debt.user_id.clone()),
            account_id: ActiveValue::Set(debt.account_id.map(|id| id.to_string())),
            name: ActiveValue::Set(debt.name.clone()),
            role: ActiveValue::Set(debt.role.as_str().to_string()),
            status: ActiveValue::Set(debt.status.as_str().to_string()),
            principal_cents: ActiveValue::Set(debt.principal.cents()),
            current_balance_cents: ActiveValue::Set(debt.current_balance.cents()),
            installment_cents: ActiveValue::Set(debt.installment.map(MoneyCents::cents)),
            frequency: ActiveValue::Set(debt.frequency.map(|f| f.as_str().to_string())),
            start_date: ActiveValue::Set(debt.start_date),
            next_due_date: ActiveValue::Set(debt.next_due_date),
            term_months: ActiveValue::Set(debt.term_months),
            counterparty: ActiveValue::Set(debt.counterparty.clone()),
            paid_cents: ActiveValue::Set(debt.paid.cents()),
            adjustment_cents: ActiveValue::Set(debt.adjustment.cents()),
            due_date: ActiveValue::Set(debt.due_date),
            settlement_group: ActiveValue::Set(debt.settlement_group.clone()),
        }
    }
}

impl TryFrom<Model> for Debt {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("debt".to_string()))?,
            user_id: model.user_id,
            account_id: model
                .account_id
                .map(|raw| {
                    Uuid::parse_str(&raw).map_err(|_| EngineError::NotFound("account".to_string()))
                })
                .transpose()?,
            name: model.name,
            role: DebtRole::try_from(model.role.as_str())?,
            status: DebtStatus::try_from(model.status.as_str())?,
            principal: MoneyCents::new(model.principal_cents),
            current_balance: MoneyCents::new(model.current_balance_cents),
            installment: model.installment_cents.map(MoneyCents::new),
            frequency: model
                .frequency
                .as_deref()
                .map(Frequency::try_from)
                .transpose()?,
            start_date: model.start_date,
            next_due_date: model.next_due_date,
            term_months: model.term_months,
            counterparty: model.counterparty,
            paid: MoneyCents::new(model.paid_cents),
            adjustment: MoneyCents::new(model.adjustment_cents),
            due_date: model.due_date,
            settlement_group: model.settlement_group,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn personal_debt(principal: i64) -> Debt {
        Debt {
            id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            account_id: None,
            name: "Lunch money".to_string(),
            role: DebtRole::Lent,
            status: DebtStatus::Open,
            principal: MoneyCents::new(principal),
            current_balance: MoneyCents::new(principal),
            installment: None,
            frequency: None,
            start_date: None,
            next_due_date: None,
            term_months: None,
            counterparty: Some("Bob".to_string()),
            paid: MoneyCents::ZERO,
            adjustment: MoneyCents::ZERO,
            due_date: None,
            settlement_group: None,
        }
    }

    #[test]
    fn remaining_follows_the_personal_formula() {
        let mut debt = personal_debt(10_000);
        debt.paid = MoneyCents::new(4_000);
        debt.adjustment = MoneyCents::new(500);
        assert_eq!(debt.remaining(), MoneyCents::new(6_500));
    }

    #[test]
    fn recompute_settles_on_overpayment_and_clamps_balance() {
        let mut debt = personal_debt(10_000);
        debt.paid = MoneyCents::new(10_500);
        debt.recompute_personal(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(debt.status, DebtStatus::Settled);
        assert_eq!(debt.current_balance, MoneyCents::ZERO);
    }

    #[test]
    fn recompute_marks_overdue_past_due_date() {
        let mut debt = personal_debt(10_000);
        debt.due_date = NaiveDate::from_ymd_opt(2025, 12, 31);
        debt.recompute_personal(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(debt.status, DebtStatus::Overdue);
    }

    #[test]
    fn progress_tracks_repaid_share() {
        let mut debt = personal_debt(10_000);
        assert_eq!(debt.progress_percent(), 0);
        debt.paid = MoneyCents::new(2_500);
        assert_eq!(debt.progress_percent(), 25);
        debt.paid = MoneyCents::new(12_000);
        assert_eq!(debt.progress_percent(), 100);
    }
}
