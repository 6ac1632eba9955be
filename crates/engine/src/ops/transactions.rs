use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    CategoryKind, CreateTransactionCmd, EngineError, MoneyCents, ResultEngine, Transaction,
    TransactionKind, UpdateTransactionCmd, transactions,
};

use super::{Engine, normalize_optional_text, with_tx};

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Matches the source or the destination account.
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub reimbursable: Option<bool>,
    pub settlement_group: Option<String>,
    pub counterparty: Option<String>,
}

/// Computes the signed balance deltas a transaction applies to accounts.
///
/// The transaction amount is non-negative; the sign comes from the kind:
///
/// - transfers and two-account savings moves debit the source and credit the
///   destination
/// - a plain expense debits its account, income and single-account savings
///   credit theirs
/// - a transaction with no account is a debt-tracking-only record and moves
///   no balance
///
/// Deleting or re-pointing a transaction reverses these exact deltas, so this
/// is the single place where kind is turned into a sign.
fn balance_deltas(
    kind: TransactionKind,
    amount: MoneyCents,
    account_id: Option<Uuid>,
    to_account_id: Option<Uuid>,
) -> ResultEngine<Vec<(Uuid, MoneyCents)>> {
    let deltas = match (kind, account_id, to_account_id) {
        (TransactionKind::Transfer | TransactionKind::Savings, Some(from), Some(to)) => {
            vec![(from, -amount), (to, amount)]
        }
        (TransactionKind::Transfer, _, _) => {
            return Err(EngineError::InvalidOperation(
                "transfer requires both source and destination accounts".to_string(),
            ));
        }
        (_, _, Some(_)) => {
            return Err(EngineError::InvalidOperation(
                "only transfers and savings moves take a destination account".to_string(),
            ));
        }
        (TransactionKind::Expense, Some(account), None) => vec![(account, -amount)],
        (TransactionKind::Income | TransactionKind::Savings, Some(account), None) => {
            vec![(account, amount)]
        }
        (_, None, None) => Vec::new(),
    };
    Ok(deltas)
}

fn kind_for_category(kind: CategoryKind) -> TransactionKind {
    match kind {
        CategoryKind::Expense => TransactionKind::Expense,
        CategoryKind::Income => TransactionKind::Income,
        CategoryKind::Savings => TransactionKind::Savings,
    }
}

fn negate(deltas: &[(Uuid, MoneyCents)]) -> Vec<(Uuid, MoneyCents)> {
    deltas.iter().map(|(id, delta)| (*id, -*delta)).collect()
}

impl Engine {
    /// Applies balance deltas to the owner's accounts, one read-modify-write
    /// per entry.
    ///
    /// Entries are applied sequentially inside the surrounding DB
    /// transaction, so a later delta against the same account sees the
    /// earlier write. Ownership is enforced per account; an unowned account
    /// aborts the whole unit.
    async fn apply_deltas(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        deltas: &[(Uuid, MoneyCents)],
    ) -> ResultEngine<()> {
        for (account_id, delta) in deltas {
            let model = self.require_account(db_tx, user_id, *account_id).await?;
            let new_balance = MoneyCents::new(model.balance_cents)
                .checked_add(*delta)
                .ok_or_else(|| EngineError::InvalidAmount("balance overflow".to_string()))?;
            self.save_balance(db_tx, *account_id, new_balance).await?;
        }
        Ok(())
    }

    async fn resolve_transaction_kind(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        explicit: Option<TransactionKind>,
        category_id: Option<Uuid>,
    ) -> ResultEngine<TransactionKind> {
        if let Some(kind) = explicit {
            return Ok(kind);
        }
        let category_id = category_id.ok_or_else(|| {
            EngineError::InvalidOperation(
                "transaction kind missing and no category to derive it from".to_string(),
            )
        })?;
        let category_kind = self.resolve_kind(db_tx, user_id, category_id).await?;
        Ok(kind_for_category(category_kind))
    }

    /// Creates a transaction, mutating at most two account balances
    /// atomically with the row insert.
    pub async fn create_transaction(&self, cmd: CreateTransactionCmd) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let kind = self
                .resolve_transaction_kind(&db_tx, &cmd.user_id, cmd.kind, cmd.category_id)
                .await?;

            let mut description = cmd.description.clone();
            if let (TransactionKind::Transfer | TransactionKind::Savings, Some(to)) =
                (kind, cmd.to_account_id)
            {
                let destination = self.require_account(&db_tx, &cmd.user_id, to).await?;
                if !description.to_lowercase().contains("transfer") {
                    description = if description.trim().is_empty() {
                        format!("Transfer to {}", destination.name)
                    } else {
                        format!("{description} (to {})", destination.name)
                    };
                }
            }

            let mut tx = Transaction::new(
                cmd.user_id.clone(),
                kind,
                cmd.amount,
                cmd.occurred_at,
                cmd.account_id,
                cmd.to_account_id,
                cmd.category_id,
                description,
            )?;
            tx.is_reimbursable = cmd.is_reimbursable;
            tx.counterparty = normalize_optional_text(cmd.counterparty.as_deref());
            tx.settlement_group = normalize_optional_text(cmd.settlement_group.as_deref());

            if let Some(category_id) = cmd.category_id {
                // Ownership check even when the kind was explicit.
                self.resolve_kind(&db_tx, &cmd.user_id, category_id).await?;
            }

            let deltas = balance_deltas(kind, tx.amount, tx.account_id, tx.to_account_id)?;
            self.apply_deltas(&db_tx, &cmd.user_id, &deltas).await?;
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;

            Ok(tx)
        })
    }

    /// Updates a transaction with reverse-then-reapply semantics.
    ///
    /// The balance effect depends on mutable fields (amount, kind,
    /// accounts), so the old effect is reversed from the stored pre-update
    /// snapshot and the new effect applied from the patched values, all in
    /// one atomic unit. Repeating the same patch is a no-op for balances:
    /// the patch sets state, it does not add to it.
    pub async fn update_transaction(&self, cmd: UpdateTransactionCmd) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = transactions::Entity::find_by_id(cmd.transaction_id.to_string())
                .filter(transactions::Column::UserId.eq(cmd.user_id.as_str()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("transaction".to_string()))?;
            let old = Transaction::try_from(model)?;

            // Step 1: reverse the old effect, computed from the snapshot.
            let old_deltas = balance_deltas(old.kind, old.amount, old.account_id, old.to_account_id)?;
            self.apply_deltas(&db_tx, &cmd.user_id, &negate(&old_deltas))
                .await?;

            // Step 2: resolve the new kind (explicit patch wins, then a
            // patched category, then the stored kind).
            let new_kind = match (cmd.kind, cmd.category_id) {
                (Some(kind), Some(category_id)) => {
                    // Ownership check even when the kind was explicit.
                    self.resolve_kind(&db_tx, &cmd.user_id, category_id).await?;
                    kind
                }
                (Some(kind), None) => kind,
                (None, Some(category_id)) => {
                    kind_for_category(self.resolve_kind(&db_tx, &cmd.user_id, category_id).await?)
                }
                (None, None) => old.kind,
            };

            let new_amount = cmd.amount.unwrap_or(old.amount);
            if new_amount.is_negative() {
                return Err(EngineError::InvalidAmount(
                    "amount must not be negative".to_string(),
                ));
            }
            if old.reimbursed > new_amount {
                return Err(EngineError::InvalidOperation(
                    "amount cannot drop below the reimbursed total".to_string(),
                ));
            }
            let new_account = cmd.account_id.or(old.account_id);
            let new_to_account = cmd.to_account_id.or(old.to_account_id);

            // Step 3: apply the new effect.
            let new_deltas = balance_deltas(new_kind, new_amount, new_account, new_to_account)?;
            self.apply_deltas(&db_tx, &cmd.user_id, &new_deltas).await?;

            // Step 4: merge the patch and persist.
            let updated = Transaction {
                id: old.id,
                user_id: old.user_id.clone(),
                account_id: new_account,
                to_account_id: new_to_account,
                category_id: cmd.category_id.or(old.category_id),
                kind: new_kind,
                amount: new_amount,
                occurred_at: cmd.occurred_at.unwrap_or(old.occurred_at),
                description: cmd.description.clone().unwrap_or(old.description),
                is_reimbursable: cmd.is_reimbursable.unwrap_or(old.is_reimbursable),
                reimbursed: old.reimbursed,
                counterparty: normalize_optional_text(cmd.counterparty.as_deref())
                    .or(old.counterparty),
                settlement_group: normalize_optional_text(cmd.settlement_group.as_deref())
                    .or(old.settlement_group),
            };
            let mut active = transactions::ActiveModel::from(&updated);
            active.id = ActiveValue::Unchanged(updated.id.to_string());
            active.update(&db_tx).await?;

            Ok(updated)
        })
    }

    /// Deletes a transaction after reversing its balance effect.
    pub async fn delete_transaction(&self, user_id: &str, transaction_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = transactions::Entity::find_by_id(transaction_id.to_string())
                .filter(transactions::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("transaction".to_string()))?;
            let tx = Transaction::try_from(model)?;

            let deltas = balance_deltas(tx.kind, tx.amount, tx.account_id, tx.to_account_id)?;
            self.apply_deltas(&db_tx, user_id, &negate(&deltas)).await?;

            transactions::Entity::delete_by_id(transaction_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Returns one of the user's transactions.
    pub async fn transaction(&self, user_id: &str, transaction_id: Uuid) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find_by_id(transaction_id.to_string())
            .filter(transactions::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("transaction".to_string()))?;
        Transaction::try_from(model)
    }

    /// Lists the user's transactions, newest first.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::Id);

        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::OccurredAt.lt(to));
        }
        if let Some(account_id) = filter.account_id {
            query = query.filter(
                Condition::any()
                    .add(transactions::Column::AccountId.eq(account_id.to_string()))
                    .add(transactions::Column::ToAccountId.eq(account_id.to_string())),
            );
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(transactions::Column::CategoryId.eq(category_id.to_string()));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(reimbursable) = filter.reimbursable {
            query = query.filter(transactions::Column::IsReimbursable.eq(reimbursable));
        }
        if let Some(group) = &filter.settlement_group {
            query = query.filter(transactions::Column::SettlementGroup.eq(group.as_str()));
        }
        if let Some(counterparty) = &filter.counterparty {
            query = query.filter(transactions::Column::Counterparty.eq(counterparty.as_str()));
        }

        let models = query.all(&self.database).await?;
        models.into_iter().map(Transaction::try_from).collect()
    }

    /// Records a transaction linked to a debt event (installment, repayment,
    /// principal movement) inside the caller's DB transaction.
    ///
    /// Single-account only; returns the new transaction id for back-links.
    #[allow(clippy::too_many_arguments)]
    pub(super) async fn record_linked_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        kind: TransactionKind,
        amount: MoneyCents,
        account_id: Option<Uuid>,
        category_id: Option<Uuid>,
        description: String,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Uuid> {
        let tx = Transaction::new(
            user_id.to_string(),
            kind,
            amount,
            occurred_at,
            account_id,
            None,
            category_id,
            description,
        )?;
        let deltas = balance_deltas(kind, amount, account_id, None)?;
        self.apply_deltas(db_tx, user_id, &deltas).await?;
        transactions::ActiveModel::from(&tx).insert(db_tx).await?;
        Ok(tx.id)
    }

    /// Deletes a debt-linked transaction, reversing its balance effect.
    ///
    /// A missing row is a no-op: the user may have deleted the transaction
    /// directly, and repayment deletion must still succeed.
    pub(super) async fn delete_linked_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        transaction_id: Uuid,
    ) -> ResultEngine<()> {
        let Some(model) = transactions::Entity::find_by_id(transaction_id.to_string())
            .filter(transactions::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
        else {
            return Ok(());
        };
        let tx = Transaction::try_from(model)?;
        let deltas = balance_deltas(tx.kind, tx.amount, tx.account_id, tx.to_account_id)?;
        self.apply_deltas(db_tx, user_id, &negate(&deltas)).await?;
        transactions::Entity::delete_by_id(transaction_id.to_string())
            .exec(db_tx)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_without_destination_is_rejected() {
        let err = balance_deltas(
            TransactionKind::Transfer,
            MoneyCents::new(100),
            Some(Uuid::new_v4()),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidOperation(_)));
    }

    #[test]
    fn expense_debits_and_income_credits() {
        let account = Uuid::new_v4();
        let debit = balance_deltas(
            TransactionKind::Expense,
            MoneyCents::new(500),
            Some(account),
            None,
        )
        .unwrap();
        assert_eq!(debit, vec![(account, MoneyCents::new(-500))]);

        let credit = balance_deltas(
            TransactionKind::Income,
            MoneyCents::new(500),
            Some(account),
            None,
        )
        .unwrap();
        assert_eq!(credit, vec![(account, MoneyCents::new(500))]);
    }

    #[test]
    fn accountless_transaction_moves_nothing() {
        let deltas =
            balance_deltas(TransactionKind::Expense, MoneyCents::new(500), None, None).unwrap();
        assert!(deltas.is_empty());
    }

    #[test]
    fn savings_move_mirrors_transfer() {
        let (from, to) = (Uuid::new_v4(), Uuid::new_v4());
        let deltas = balance_deltas(
            TransactionKind::Savings,
            MoneyCents::new(2000),
            Some(from),
            Some(to),
        )
        .unwrap();
        assert_eq!(
            deltas,
            vec![(from, MoneyCents::new(-2000)), (to, MoneyCents::new(2000))]
        );
    }
}
