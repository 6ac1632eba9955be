use chrono::NaiveDate;
use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine, Settlement, SettlementCmd, Transaction,
    allocate_proportional, settlements, transactions,
};

use super::{Engine, normalize_optional_text, with_tx};

/// Result of distributing one settlement across its transaction pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementOutcome {
    pub settlement: Settlement,
    /// `(transaction_id, share)` per pool member that received money, in
    /// pool order.
    pub allocations: Vec<(Uuid, MoneyCents)>,
}

#[derive(Clone, Debug, Default)]
pub struct SettlementFilter {
    pub settlement_group: Option<String>,
    pub counterparty: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl Engine {
    /// Distributes a received payment across the matching reimbursable
    /// transactions.
    ///
    /// The pool is the owner's reimbursable transactions matching the given
    /// settlement group and/or counterparty, ordered by occurrence then id
    /// so the distribution is deterministic. Shares follow the
    /// running-remainder policy of [`allocate_proportional`], weighted by
    /// each transaction's pending amount; since the settlement amount may
    /// not exceed the total pending, no transaction is ever reimbursed past
    /// its own amount.
    pub async fn create_settlement(&self, cmd: SettlementCmd) -> ResultEngine<SettlementOutcome> {
        if !cmd.amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "settlement amount must be positive".to_string(),
            ));
        }
        let group = normalize_optional_text(cmd.settlement_group.as_deref());
        let counterparty = normalize_optional_text(cmd.counterparty.as_deref());
        if group.is_none() && counterparty.is_none() {
            return Err(EngineError::InvalidOperation(
                "a settlement needs a settlement group or a counterparty".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let mut query = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(cmd.user_id.as_str()))
                .filter(transactions::Column::IsReimbursable.eq(true))
                .order_by_asc(transactions::Column::OccurredAt)
                .order_by_asc(transactions::Column::Id);
            if let Some(group) = &group {
                query = query.filter(transactions::Column::SettlementGroup.eq(group.as_str()));
            }
            if let Some(counterparty) = &counterparty {
                query = query.filter(transactions::Column::Counterparty.eq(counterparty.as_str()));
            }

            let mut pool = Vec::new();
            for model in query.all(&db_tx).await? {
                let tx = Transaction::try_from(model)?;
                if tx.pending_reimbursement().is_positive() {
                    pool.push(tx);
                }
            }
            if pool.is_empty() {
                return Err(EngineError::InvalidOperation(
                    "no pending reimbursable transactions match".to_string(),
                ));
            }

            let pending: Vec<MoneyCents> =
                pool.iter().map(Transaction::pending_reimbursement).collect();
            let total_pending = pending
                .iter()
                .copied()
                .try_fold(MoneyCents::ZERO, MoneyCents::checked_add)
                .ok_or_else(|| EngineError::InvalidAmount("pending overflow".to_string()))?;
            if cmd.amount > total_pending {
                return Err(EngineError::InvalidOperation(format!(
                    "settlement of {} exceeds the {} still pending",
                    cmd.amount, total_pending
                )));
            }

            let shares = allocate_proportional(cmd.amount, &pending);

            let mut allocations = Vec::with_capacity(pool.len());
            for (tx, share) in pool.iter().zip(shares) {
                if share.is_zero() {
                    continue;
                }
                let mut active = transactions::ActiveModel {
                    id: ActiveValue::Unchanged(tx.id.to_string()),
                    ..Default::default()
                };
                active.reimbursed_cents = ActiveValue::Set((tx.reimbursed + share).cents());
                active.update(&db_tx).await?;
                allocations.push((tx.id, share));
            }

            let settlement = Settlement {
                id: Uuid::new_v4(),
                user_id: cmd.user_id.clone(),
                settlement_group: group.clone(),
                counterparty: counterparty.clone(),
                amount: cmd.amount,
                settled_on: cmd.settled_on.unwrap_or_else(|| self.clock.today()),
                notes: normalize_optional_text(cmd.notes.as_deref()),
            };
            settlements::ActiveModel::from(&settlement).insert(&db_tx).await?;
            debug!(settlement = %settlement.id, pool = allocations.len(), "settlement distributed");

            Ok(SettlementOutcome {
                settlement,
                allocations,
            })
        })
    }

    /// Lists settlements, newest first.
    pub async fn list_settlements(
        &self,
        user_id: &str,
        filter: &SettlementFilter,
    ) -> ResultEngine<Vec<Settlement>> {
        let mut query = settlements::Entity::find()
            .filter(settlements::Column::UserId.eq(user_id))
            .order_by_desc(settlements::Column::SettledOn)
            .order_by_desc(settlements::Column::Id);
        if let Some(group) = &filter.settlement_group {
            query = query.filter(settlements::Column::SettlementGroup.eq(group.as_str()));
        }
        if let Some(counterparty) = &filter.counterparty {
            query = query.filter(settlements::Column::Counterparty.eq(counterparty.as_str()));
        }
        if let Some(from) = filter.from {
            query = query.filter(settlements::Column::SettledOn.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(settlements::Column::SettledOn.lt(to));
        }
        let models = query.all(&self.database).await?;
        models.into_iter().map(Settlement::try_from).collect()
    }

    /// Distinct counterparties seen on the user's transactions.
    pub async fn counterparties(&self, user_id: &str) -> ResultEngine<Vec<String>> {
        let values: Vec<Option<String>> = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::Counterparty)
            .distinct()
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::Counterparty.is_not_null())
            .order_by_asc(transactions::Column::Counterparty)
            .into_tuple()
            .all(&self.database)
            .await?;
        Ok(values.into_iter().flatten().collect())
    }

    /// Distinct settlement groups seen on the user's transactions.
    pub async fn settlement_groups(&self, user_id: &str) -> ResultEngine<Vec<String>> {
        let values: Vec<Option<String>> = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::SettlementGroup)
            .distinct()
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::SettlementGroup.is_not_null())
            .order_by_asc(transactions::Column::SettlementGroup)
            .into_tuple()
            .all(&self.database)
            .await?;
        Ok(values.into_iter().flatten().collect())
    }
}
