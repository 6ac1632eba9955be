//! The balance and settlement consistency engine.
//!
//! Users record transactions against accounts and categories, track debts
//! (institutional loans and informal lent/borrowed money), and reconcile
//! shared expenses via settlements. Every multi-step mutation runs inside a
//! single database transaction so account balances, debt balances, and
//! reimbursement totals stay mutually consistent.

pub use accounts::{Account, AccountKind};
pub use categories::{Category, CategoryKind};
pub use clock::{Clock, FixedClock, SystemClock};
pub use commands::{
    BatchRepaymentCmd, CreateDebtCmd, CreateTransactionCmd, RepaymentCmd, SettlementCmd,
    UpdateTransactionCmd,
};
pub use debt_updates::{DebtUpdate, DebtUpdateStatus};
pub use debts::{Debt, DebtRole, DebtStatus};
pub use error::EngineError;
pub use money::{MoneyCents, allocate_proportional};
pub use ops::{
    BatchRepaymentOutcome, CatchUpOutcome, CatchUpReport, DebtFilter, DebtView, Engine,
    EngineBuilder,
    SettlementFilter, SettlementOutcome, TransactionFilter,
};
pub use repayments::Repayment;
pub use schedule::{Frequency, next_occurrence};
pub use settlements::Settlement;
pub use transactions::{Transaction, TransactionKind};

pub mod accounts;
pub mod categories;
mod clock;
mod commands;
pub mod debt_updates;
pub mod debts;
mod error;
mod money;
mod ops;
pub mod repayments;
mod schedule;
pub mod settlements;
pub mod transactions;

type ResultEngine<T> = Result<T, EngineError>;
