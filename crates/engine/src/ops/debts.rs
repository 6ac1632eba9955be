use chrono::{NaiveDate, NaiveTime};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    BatchRepaymentCmd, CategoryKind, CreateDebtCmd, Debt, DebtRole, DebtStatus, DebtUpdate,
    DebtUpdateStatus, EngineError, Frequency, MoneyCents, Repayment, RepaymentCmd, ResultEngine,
    TransactionKind, allocate_proportional, debt_updates, debts, next_occurrence, repayments,
};

use super::{Engine, normalize_optional_text, with_tx};

/// Result of catching up one institutional debt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatchUpOutcome {
    pub debt_id: Uuid,
    /// Installments applied by this call (zero when already up to date).
    pub applied: u32,
    pub current_balance: MoneyCents,
    pub status: DebtStatus,
    pub next_due_date: Option<NaiveDate>,
}

/// Per-debt results of a catch-up sweep.
#[derive(Debug)]
pub struct CatchUpReport {
    /// Debts caught up successfully, in name order.
    pub outcomes: Vec<CatchUpOutcome>,
    /// Debts whose catch-up failed, with the error. Failures never roll back
    /// the successes.
    pub failures: Vec<(Uuid, EngineError)>,
}

/// Result of distributing one payment across several personal debts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchRepaymentOutcome {
    /// `(debt_id, repayment_id, allocated amount)` per debt that received a
    /// share, in the order the debts were given.
    pub allocations: Vec<(Uuid, Uuid, MoneyCents)>,
    /// Debts left out because nothing remained on them.
    pub skipped: Vec<Uuid>,
    /// The single transaction recorded for the whole batch, if any.
    pub transaction_id: Option<Uuid>,
}

/// A debt together with its derived figures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebtView {
    pub debt: Debt,
    pub remaining: MoneyCents,
    pub progress_percent: u8,
    /// Status as of today, including overdue checks not yet persisted.
    pub status: DebtStatus,
}

#[derive(Clone, Debug, Default)]
pub struct DebtFilter {
    pub role: Option<DebtRole>,
    pub status: Option<DebtStatus>,
    pub counterparty: Option<String>,
    pub settlement_group: Option<String>,
}

fn view_of(debt: Debt, today: NaiveDate) -> DebtView {
    let remaining = debt.remaining();
    let progress_percent = debt.progress_percent();
    let status = match debt.role {
        DebtRole::Lent | DebtRole::Borrowed => {
            let mut probe = debt.clone();
            probe.recompute_personal(today);
            probe.status
        }
        DebtRole::Institutional => {
            if debt.status == DebtStatus::Settled {
                DebtStatus::Settled
            } else if debt.next_due_date.is_some_and(|due| due < today) {
                DebtStatus::Overdue
            } else {
                DebtStatus::Open
            }
        }
    };
    DebtView {
        debt,
        remaining,
        progress_percent,
        status,
    }
}

/// Direction of money for a repayment received on (or paid against) a
/// personal debt: getting lent money back is income, paying borrowed money
/// back is an expense.
fn repayment_kind(role: DebtRole) -> ResultEngine<TransactionKind> {
    match role {
        DebtRole::Lent => Ok(TransactionKind::Income),
        DebtRole::Borrowed => Ok(TransactionKind::Expense),
        DebtRole::Institutional => Err(EngineError::InvalidOperation(
            "institutional debts are repaid through their schedule".to_string(),
        )),
    }
}

struct Schedule {
    installment: MoneyCents,
    frequency: Frequency,
    start_date: NaiveDate,
}

fn schedule_of(debt: &Debt) -> ResultEngine<Schedule> {
    match (debt.installment, debt.frequency, debt.start_date) {
        (Some(installment), Some(frequency), Some(start_date)) => Ok(Schedule {
            installment,
            frequency,
            start_date,
        }),
        _ => Err(EngineError::InvalidOperation(
            "institutional debt is missing its installment schedule".to_string(),
        )),
    }
}

impl Engine {
    pub(super) async fn require_debt(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        debt_id: Uuid,
    ) -> ResultEngine<Debt> {
        let model = debts::Entity::find_by_id(debt_id.to_string())
            .filter(debts::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("debt".to_string()))?;
        Debt::try_from(model)
    }

    async fn save_debt(&self, db_tx: &DatabaseTransaction, debt: &Debt) -> ResultEngine<()> {
        let mut active = debts::ActiveModel::from(debt);
        active.id = ActiveValue::Unchanged(debt.id.to_string());
        active.update(db_tx).await?;
        Ok(())
    }

    /// Creates a debt of either family.
    ///
    /// Institutional debts must carry a full schedule and start with
    /// `next_due_date` on the start date itself. Personal debts may record
    /// the principal movement as a transaction when requested or when an
    /// account was supplied.
    pub async fn create_debt(&self, cmd: CreateDebtCmd) -> ResultEngine<Debt> {
        if !cmd.principal.is_positive() {
            return Err(EngineError::InvalidAmount(
                "principal must be positive".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            if let Some(account_id) = cmd.account_id {
                self.require_account(&db_tx, &cmd.user_id, account_id).await?;
            }

            let mut debt = Debt {
                id: Uuid::new_v4(),
                user_id: cmd.user_id.clone(),
                account_id: cmd.account_id,
                name: cmd.name.trim().to_string(),
                role: cmd.role,
                status: DebtStatus::Open,
                principal: cmd.principal,
                current_balance: cmd.principal,
                installment: None,
                frequency: None,
                start_date: None,
                next_due_date: None,
                term_months: None,
                counterparty: normalize_optional_text(cmd.counterparty.as_deref()),
                paid: MoneyCents::ZERO,
                adjustment: MoneyCents::ZERO,
                due_date: None,
                settlement_group: normalize_optional_text(cmd.settlement_group.as_deref()),
            };
            if debt.name.is_empty() {
                return Err(EngineError::InvalidOperation(
                    "debt name cannot be empty".to_string(),
                ));
            }

            match cmd.role {
                DebtRole::Institutional => {
                    let (Some(installment), Some(frequency), Some(start_date)) =
                        (cmd.installment, cmd.frequency, cmd.start_date)
                    else {
                        return Err(EngineError::InvalidOperation(
                            "institutional debt requires installment, frequency and start date"
                                .to_string(),
                        ));
                    };
                    if !installment.is_positive() {
                        return Err(EngineError::InvalidAmount(
                            "installment must be positive".to_string(),
                        ));
                    }
                    debt.installment = Some(installment);
                    debt.frequency = Some(frequency);
                    debt.start_date = Some(start_date);
                    debt.next_due_date = Some(start_date);
                    debt.term_months = cmd.term_months;
                }
                DebtRole::Lent | DebtRole::Borrowed => {
                    debt.due_date = cmd.due_date;
                    if cmd.create_transaction || cmd.account_id.is_some() {
                        let kind = match cmd.role {
                            DebtRole::Lent => TransactionKind::Expense,
                            _ => match cmd.category_id {
                                Some(category_id) => {
                                    let category_kind = self
                                        .resolve_kind(&db_tx, &cmd.user_id, category_id)
                                        .await?;
                                    match category_kind {
                                        CategoryKind::Expense => TransactionKind::Expense,
                                        CategoryKind::Income => TransactionKind::Income,
                                        CategoryKind::Savings => TransactionKind::Savings,
                                    }
                                }
                                None => TransactionKind::Income,
                            },
                        };
                        let description = match (&debt.counterparty, cmd.role) {
                            (Some(who), DebtRole::Lent) => format!("Lent to {who}"),
                            (Some(who), _) => format!("Borrowed from {who}"),
                            (None, DebtRole::Lent) => format!("Lent: {}", debt.name),
                            (None, _) => format!("Borrowed: {}", debt.name),
                        };
                        self.record_linked_transaction(
                            &db_tx,
                            &cmd.user_id,
                            kind,
                            cmd.principal,
                            cmd.account_id,
                            cmd.category_id,
                            description,
                            self.clock.now(),
                        )
                        .await?;
                    }
                }
            }

            debts::ActiveModel::from(&debt).insert(&db_tx).await?;
            Ok(debt)
        })
    }

    /// Returns one debt with its derived figures.
    pub async fn debt(&self, user_id: &str, debt_id: Uuid) -> ResultEngine<DebtView> {
        let debt = with_tx!(self, |db_tx| self.require_debt(&db_tx, user_id, debt_id).await)?;
        Ok(view_of(debt, self.clock.today()))
    }

    /// Applies every missed installment of one institutional debt.
    ///
    /// Walks due dates strictly before today in increasing order. A due date
    /// that already has a `debt_updates` row is skipped, so replaying the
    /// whole catch-up after a partial failure applies only what is missing.
    /// Each applied installment records a linked expense transaction against
    /// the debt's account under the lazily created "Debt Payment" category.
    pub async fn catch_up_one(&self, user_id: &str, debt_id: Uuid) -> ResultEngine<CatchUpOutcome> {
        with_tx!(self, |db_tx| {
            let mut debt = self.require_debt(&db_tx, user_id, debt_id).await?;
            if debt.role != DebtRole::Institutional {
                return Err(EngineError::InvalidOperation(
                    "catch-up only applies to institutional debts".to_string(),
                ));
            }
            let schedule = schedule_of(&debt)?;
            let today = self.clock.today();
            let original_next = debt.next_due_date;
            let mut due = debt.next_due_date.unwrap_or(schedule.start_date);
            let mut applied = 0u32;

            while due < today && debt.status != DebtStatus::Settled {
                if !self.update_exists(&db_tx, debt.id, due).await? {
                    let transaction_id = self
                        .apply_installment(&db_tx, &debt, &schedule, due, due)
                        .await?;
                    debt.current_balance = debt.current_balance - schedule.installment;
                    if !debt.current_balance.is_positive() {
                        debt.status = DebtStatus::Settled;
                    }
                    applied += 1;
                    debug!(debt = %debt.id, %due, tx = ?transaction_id, "installment applied");
                }
                due = next_occurrence(schedule.start_date, schedule.frequency, Some(due));
                debt.next_due_date = Some(due);
            }

            debt.next_due_date = Some(due);
            if applied > 0 || debt.next_due_date != original_next {
                self.save_debt(&db_tx, &debt).await?;
            }

            Ok(CatchUpOutcome {
                debt_id: debt.id,
                applied,
                current_balance: debt.current_balance,
                status: debt.status,
                next_due_date: debt.next_due_date,
            })
        })
    }

    /// Catches up every unsettled institutional debt of the user.
    ///
    /// Debts are processed independently, each in its own DB transaction, so
    /// one failing debt does not roll back the others. The report carries
    /// both the successful outcomes and the per-debt failures.
    pub async fn catch_up_all(&self, user_id: &str) -> ResultEngine<CatchUpReport> {
        let models = debts::Entity::find()
            .filter(debts::Column::UserId.eq(user_id))
            .filter(debts::Column::Role.eq(DebtRole::Institutional.as_str()))
            .filter(debts::Column::Status.ne(DebtStatus::Settled.as_str()))
            .order_by_asc(debts::Column::Name)
            .all(&self.database)
            .await?;

        let mut report = CatchUpReport {
            outcomes: Vec::with_capacity(models.len()),
            failures: Vec::new(),
        };
        for model in models {
            let debt_id = super::parse_id(&model.id, "debt")?;
            match self.catch_up_one(user_id, debt_id).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(err) => {
                    debug!(debt = %debt_id, error = %err, "catch-up failed");
                    report.failures.push((debt_id, err));
                }
            }
        }
        Ok(report)
    }

    /// Pays the next scheduled installment before it falls due.
    ///
    /// Allowed only while today is strictly before `next_due_date`. The
    /// DebtUpdate is dated today, and the schedule advances past the due
    /// date the payment covered, so the regular catch-up will not apply that
    /// occurrence again.
    pub async fn pay_early(&self, user_id: &str, debt_id: Uuid) -> ResultEngine<CatchUpOutcome> {
        with_tx!(self, |db_tx| {
            let mut debt = self.require_debt(&db_tx, user_id, debt_id).await?;
            if debt.role != DebtRole::Institutional {
                return Err(EngineError::InvalidOperation(
                    "early payment only applies to institutional debts".to_string(),
                ));
            }
            if debt.status == DebtStatus::Settled {
                return Err(EngineError::InvalidOperation(
                    "debt is already settled".to_string(),
                ));
            }
            let schedule = schedule_of(&debt)?;
            let today = self.clock.today();
            let due = debt.next_due_date.unwrap_or(schedule.start_date);
            if today >= due {
                return Err(EngineError::InvalidOperation(
                    "installment is already due; run catch-up instead".to_string(),
                ));
            }
            if self.update_exists(&db_tx, debt.id, today).await? {
                return Err(EngineError::Conflict(
                    "an installment was already recorded today".to_string(),
                ));
            }

            self.apply_installment(&db_tx, &debt, &schedule, today, today)
                .await?;
            debt.current_balance = debt.current_balance - schedule.installment;
            if !debt.current_balance.is_positive() {
                debt.status = DebtStatus::Settled;
            }
            debt.next_due_date = Some(next_occurrence(
                schedule.start_date,
                schedule.frequency,
                Some(due),
            ));
            self.save_debt(&db_tx, &debt).await?;

            Ok(CatchUpOutcome {
                debt_id: debt.id,
                applied: 1,
                current_balance: debt.current_balance,
                status: debt.status,
                next_due_date: debt.next_due_date,
            })
        })
    }

    async fn update_exists(
        &self,
        db_tx: &DatabaseTransaction,
        debt_id: Uuid,
        update_date: NaiveDate,
    ) -> ResultEngine<bool> {
        let existing = debt_updates::Entity::find()
            .filter(debt_updates::Column::DebtId.eq(debt_id.to_string()))
            .filter(debt_updates::Column::UpdateDate.eq(update_date))
            .one(db_tx)
            .await?;
        Ok(existing.is_some())
    }

    /// Records one installment: the linked expense transaction plus the
    /// DebtUpdate row that makes the occurrence idempotent.
    async fn apply_installment(
        &self,
        db_tx: &DatabaseTransaction,
        debt: &Debt,
        schedule: &Schedule,
        update_date: NaiveDate,
        occurred_on: NaiveDate,
    ) -> ResultEngine<Option<Uuid>> {
        let category_id = self.debt_payment_category(db_tx, &debt.user_id).await?;
        let transaction_id = self
            .record_linked_transaction(
                db_tx,
                &debt.user_id,
                TransactionKind::Expense,
                schedule.installment,
                debt.account_id,
                Some(category_id),
                format!("{} installment", debt.name),
                occurred_on.and_time(NaiveTime::MIN).and_utc(),
            )
            .await?;
        let update = DebtUpdate {
            id: Uuid::new_v4(),
            debt_id: debt.id,
            update_date,
            transaction_id: Some(transaction_id),
            status: DebtUpdateStatus::Paid,
        };
        debt_updates::ActiveModel::from(&update).insert(db_tx).await?;
        Ok(update.transaction_id)
    }

    /// Records one repayment against a personal debt.
    pub async fn add_repayment(&self, cmd: RepaymentCmd) -> ResultEngine<Repayment> {
        if cmd.amount.is_negative() {
            return Err(EngineError::InvalidAmount(
                "repayment amount must not be negative".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let mut debt = self.require_debt(&db_tx, &cmd.user_id, cmd.debt_id).await?;
            let kind = repayment_kind(debt.role)?;
            let today = self.clock.today();
            let repaid_on = cmd.repaid_on.unwrap_or(today);

            let transaction_id = if cmd.amount.is_positive() {
                let category_id = self.debt_payment_category(&db_tx, &cmd.user_id).await?;
                let account_id = cmd.account_id.or(debt.account_id);
                Some(
                    self.record_linked_transaction(
                        &db_tx,
                        &cmd.user_id,
                        kind,
                        cmd.amount,
                        account_id,
                        Some(category_id),
                        format!("Repayment: {}", debt.name),
                        repaid_on.and_time(NaiveTime::MIN).and_utc(),
                    )
                    .await?,
                )
            } else {
                None
            };

            let repayment = Repayment {
                id: Uuid::new_v4(),
                debt_id: debt.id,
                amount: cmd.amount,
                adjustment: cmd.adjustment,
                repaid_on,
                notes: normalize_optional_text(cmd.notes.as_deref()),
                transaction_id,
            };
            repayments::ActiveModel::from(&repayment).insert(&db_tx).await?;

            debt.paid = debt.paid + cmd.amount;
            debt.adjustment = debt.adjustment + cmd.adjustment;
            debt.recompute_personal(today);
            self.save_debt(&db_tx, &debt).await?;

            Ok(repayment)
        })
    }

    /// Removes a repayment, undoing its effect on the debt and deleting its
    /// linked transaction (with the balance reversal that entails).
    pub async fn delete_repayment(
        &self,
        user_id: &str,
        debt_id: Uuid,
        repayment_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let mut debt = self.require_debt(&db_tx, user_id, debt_id).await?;
            let model = repayments::Entity::find_by_id(repayment_id.to_string())
                .filter(repayments::Column::DebtId.eq(debt_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("repayment".to_string()))?;
            let repayment = Repayment::try_from(model)?;

            if let Some(transaction_id) = repayment.transaction_id {
                self.delete_linked_transaction(&db_tx, user_id, transaction_id)
                    .await?;
            }
            repayments::Entity::delete_by_id(repayment_id.to_string())
                .exec(&db_tx)
                .await?;

            debt.paid = debt.paid - repayment.amount;
            debt.adjustment = debt.adjustment - repayment.adjustment;
            debt.recompute_personal(self.clock.today());
            self.save_debt(&db_tx, &debt).await?;

            Ok(())
        })
    }

    /// Distributes one received payment across several personal debts,
    /// proportionally to each debt's remaining amount.
    ///
    /// The selection must share a single role; mixing money lent with money
    /// borrowed would give the one transaction an undefined direction, so it
    /// is rejected. Settled debts in the selection are skipped instead of
    /// receiving a zero share.
    pub async fn batch_repayment(
        &self,
        cmd: BatchRepaymentCmd,
    ) -> ResultEngine<BatchRepaymentOutcome> {
        if !cmd.amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "batch amount must be positive".to_string(),
            ));
        }
        if cmd.debt_ids.is_empty() {
            return Err(EngineError::InvalidOperation(
                "no debts selected".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let mut debts = Vec::with_capacity(cmd.debt_ids.len());
            for debt_id in &cmd.debt_ids {
                debts.push(self.require_debt(&db_tx, &cmd.user_id, *debt_id).await?);
            }

            let role = debts[0].role;
            if debts.iter().any(|d| d.role != role) {
                return Err(EngineError::InvalidOperation(
                    "cannot mix debt roles in one batch repayment".to_string(),
                ));
            }
            let kind = repayment_kind(role)?;

            let mut eligible = Vec::new();
            let mut skipped = Vec::new();
            for debt in debts {
                if debt.remaining().is_positive() {
                    eligible.push(debt);
                } else {
                    skipped.push(debt.id);
                }
            }
            if eligible.is_empty() {
                return Err(EngineError::InvalidOperation(
                    "nothing remains on the selected debts".to_string(),
                ));
            }

            let weights: Vec<MoneyCents> = eligible.iter().map(Debt::remaining).collect();
            let amount_shares = allocate_proportional(cmd.amount, &weights);
            let adjustment_shares = allocate_proportional(cmd.adjustment, &weights);

            let today = self.clock.today();
            let repaid_on = cmd.repaid_on.unwrap_or(today);

            let category_id = self.debt_payment_category(&db_tx, &cmd.user_id).await?;
            let account_id = cmd.account_id.or(eligible[0].account_id);
            let transaction_id = self
                .record_linked_transaction(
                    &db_tx,
                    &cmd.user_id,
                    kind,
                    cmd.amount,
                    account_id,
                    Some(category_id),
                    "Batch repayment".to_string(),
                    repaid_on.and_time(NaiveTime::MIN).and_utc(),
                )
                .await?;

            let mut allocations = Vec::with_capacity(eligible.len());
            for (index, mut debt) in eligible.into_iter().enumerate() {
                let amount = amount_shares[index];
                let adjustment = adjustment_shares[index];
                let repayment = Repayment {
                    id: Uuid::new_v4(),
                    debt_id: debt.id,
                    amount,
                    adjustment,
                    repaid_on,
                    notes: normalize_optional_text(cmd.notes.as_deref()),
                    // The batch transaction hangs off the first allocation.
                    transaction_id: (index == 0).then_some(transaction_id),
                };
                repayments::ActiveModel::from(&repayment).insert(&db_tx).await?;

                debt.paid = debt.paid + amount;
                debt.adjustment = debt.adjustment + adjustment;
                debt.recompute_personal(today);
                self.save_debt(&db_tx, &debt).await?;

                allocations.push((debt.id, repayment.id, amount));
            }

            Ok(BatchRepaymentOutcome {
                allocations,
                skipped,
                transaction_id: Some(transaction_id),
            })
        })
    }

    /// Lists repayments of one debt, newest first.
    pub async fn list_repayments(
        &self,
        user_id: &str,
        debt_id: Uuid,
    ) -> ResultEngine<Vec<Repayment>> {
        with_tx!(self, |db_tx| {
            self.require_debt(&db_tx, user_id, debt_id).await?;
            let models = repayments::Entity::find()
                .filter(repayments::Column::DebtId.eq(debt_id.to_string()))
                .order_by_desc(repayments::Column::RepaidOn)
                .order_by_desc(repayments::Column::Id)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Repayment::try_from).collect()
        })
    }

    /// Lists debts with their derived figures, filtered.
    pub async fn list_debts(
        &self,
        user_id: &str,
        filter: &DebtFilter,
    ) -> ResultEngine<Vec<DebtView>> {
        let mut query = debts::Entity::find()
            .filter(debts::Column::UserId.eq(user_id))
            .order_by_asc(debts::Column::Name);
        if let Some(role) = filter.role {
            query = query.filter(debts::Column::Role.eq(role.as_str()));
        }
        if let Some(counterparty) = &filter.counterparty {
            query = query.filter(debts::Column::Counterparty.eq(counterparty.as_str()));
        }
        if let Some(group) = &filter.settlement_group {
            query = query.filter(debts::Column::SettlementGroup.eq(group.as_str()));
        }

        let today = self.clock.today();
        let mut views = Vec::new();
        for model in query.all(&self.database).await? {
            let view = view_of(Debt::try_from(model)?, today);
            if filter.status.is_none_or(|status| view.status == status) {
                views.push(view);
            }
        }
        Ok(views)
    }
}
