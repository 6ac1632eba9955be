//! Command structs for engine operations.
//!
//! These types group parameters for write operations (transaction create and
//! update, debt creation, repayments, settlements), keeping call sites
//! readable and avoiding long argument lists.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{DebtRole, Frequency, MoneyCents, TransactionKind};

/// Create a transaction.
///
/// `kind` may be omitted when `category_id` is present; the engine resolves
/// it from the category.
#[derive(Clone, Debug)]
pub struct CreateTransactionCmd {
    pub user_id: String,
    pub amount: MoneyCents,
    pub kind: Option<TransactionKind>,
    pub account_id: Option<Uuid>,
    pub to_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
    pub description: String,
    pub is_reimbursable: bool,
    pub counterparty: Option<String>,
    pub settlement_group: Option<String>,
}

impl CreateTransactionCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, amount: MoneyCents, occurred_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            kind: None,
            account_id: None,
            to_account_id: None,
            category_id: None,
            occurred_at,
            description: String::new(),
            is_reimbursable: false,
            counterparty: None,
            settlement_group: None,
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn to_account_id(mut self, to_account_id: Uuid) -> Self {
        self.to_account_id = Some(to_account_id);
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn reimbursable(mut self, counterparty: Option<String>, group: Option<String>) -> Self {
        self.is_reimbursable = true;
        self.counterparty = counterparty;
        self.settlement_group = group;
        self
    }
}

/// Patch an existing transaction.
///
/// `None` fields are left unchanged. When the patch changes the category but
/// not the kind, the kind is re-derived from the new category.
#[derive(Clone, Debug)]
pub struct UpdateTransactionCmd {
    pub user_id: String,
    pub transaction_id: Uuid,
    pub amount: Option<MoneyCents>,
    pub kind: Option<TransactionKind>,
    pub account_id: Option<Uuid>,
    pub to_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub is_reimbursable: Option<bool>,
    pub counterparty: Option<String>,
    pub settlement_group: Option<String>,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, transaction_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            transaction_id,
            amount: None,
            kind: None,
            account_id: None,
            to_account_id: None,
            category_id: None,
            occurred_at: None,
            description: None,
            is_reimbursable: None,
            counterparty: None,
            settlement_group: None,
        }
    }

    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn to_account_id(mut self, to_account_id: Uuid) -> Self {
        self.to_account_id = Some(to_account_id);
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Create a debt.
///
/// Institutional debts require `installment`, `frequency`, and `start_date`.
/// Personal debts may request an immediate principal transaction via
/// `create_transaction` (implied when an account is supplied).
#[derive(Clone, Debug)]
pub struct CreateDebtCmd {
    pub user_id: String,
    pub name: String,
    pub role: DebtRole,
    pub principal: MoneyCents,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub counterparty: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub settlement_group: Option<String>,
    pub installment: Option<MoneyCents>,
    pub frequency: Option<Frequency>,
    pub start_date: Option<NaiveDate>,
    pub term_months: Option<i32>,
    pub create_transaction: bool,
}

impl CreateDebtCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        role: DebtRole,
        principal: MoneyCents,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            role,
            principal,
            account_id: None,
            category_id: None,
            counterparty: None,
            due_date: None,
            settlement_group: None,
            installment: None,
            frequency: None,
            start_date: None,
            term_months: None,
            create_transaction: false,
        }
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn counterparty(mut self, counterparty: impl Into<String>) -> Self {
        self.counterparty = Some(counterparty.into());
        self
    }

    #[must_use]
    pub fn due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    #[must_use]
    pub fn schedule(
        mut self,
        installment: MoneyCents,
        frequency: Frequency,
        start_date: NaiveDate,
    ) -> Self {
        self.installment = Some(installment);
        self.frequency = Some(frequency);
        self.start_date = Some(start_date);
        self
    }

    #[must_use]
    pub fn with_transaction(mut self) -> Self {
        self.create_transaction = true;
        self
    }
}

/// Record one repayment against a personal debt.
#[derive(Clone, Debug)]
pub struct RepaymentCmd {
    pub user_id: String,
    pub debt_id: Uuid,
    pub amount: MoneyCents,
    pub adjustment: MoneyCents,
    pub repaid_on: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Account for the linked transaction; falls back to the debt's account.
    pub account_id: Option<Uuid>,
}

impl RepaymentCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, debt_id: Uuid, amount: MoneyCents) -> Self {
        Self {
            user_id: user_id.into(),
            debt_id,
            amount,
            adjustment: MoneyCents::ZERO,
            repaid_on: None,
            notes: None,
            account_id: None,
        }
    }

    #[must_use]
    pub fn adjustment(mut self, adjustment: MoneyCents) -> Self {
        self.adjustment = adjustment;
        self
    }

    #[must_use]
    pub fn repaid_on(mut self, repaid_on: NaiveDate) -> Self {
        self.repaid_on = Some(repaid_on);
        self
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Distribute one received payment across several personal debts.
#[derive(Clone, Debug)]
pub struct BatchRepaymentCmd {
    pub user_id: String,
    pub debt_ids: Vec<Uuid>,
    pub amount: MoneyCents,
    pub adjustment: MoneyCents,
    pub repaid_on: Option<NaiveDate>,
    pub notes: Option<String>,
    pub account_id: Option<Uuid>,
}

impl BatchRepaymentCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, debt_ids: Vec<Uuid>, amount: MoneyCents) -> Self {
        Self {
            user_id: user_id.into(),
            debt_ids,
            amount,
            adjustment: MoneyCents::ZERO,
            repaid_on: None,
            notes: None,
            account_id: None,
        }
    }

    #[must_use]
    pub fn adjustment(mut self, adjustment: MoneyCents) -> Self {
        self.adjustment = adjustment;
        self
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }
}

/// Distribute one received payment across pending reimbursable transactions.
#[derive(Clone, Debug)]
pub struct SettlementCmd {
    pub user_id: String,
    pub amount: MoneyCents,
    pub settlement_group: Option<String>,
    pub counterparty: Option<String>,
    pub settled_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl SettlementCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, amount: MoneyCents) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            settlement_group: None,
            counterparty: None,
            settled_on: None,
            notes: None,
        }
    }

    #[must_use]
    pub fn settlement_group(mut self, group: impl Into<String>) -> Self {
        self.settlement_group = Some(group.into());
        self
    }

    #[must_use]
    pub fn counterparty(mut self, counterparty: impl Into<String>) -> Self {
        self.counterparty = Some(counterparty.into());
        self
    }

    #[must_use]
    pub fn settled_on(mut self, settled_on: NaiveDate) -> Self {
        self.settled_on = Some(settled_on);
        self
    }
}
