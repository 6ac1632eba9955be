use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{Account, AccountKind, EngineError, MoneyCents, ResultEngine, accounts};

use super::{Engine, normalize_optional_text, with_tx};

impl Engine {
    /// Creates an account with an opening balance.
    pub async fn create_account(
        &self,
        user_id: &str,
        name: &str,
        kind: AccountKind,
        opening_balance: MoneyCents,
        currency: &str,
    ) -> ResultEngine<Uuid> {
        let name = normalize_optional_text(Some(name))
            .ok_or_else(|| EngineError::InvalidOperation("account name must not be empty".to_string()))?;
        let currency = normalize_optional_text(Some(currency)).unwrap_or_else(|| "EUR".to_string());

        let account = Account::new(
            user_id.to_string(),
            name,
            kind,
            opening_balance,
            currency.to_ascii_uppercase(),
        );
        let id = account.id;
        accounts::ActiveModel::from(&account)
            .insert(&self.database)
            .await?;
        Ok(id)
    }

    /// Returns one of the user's accounts.
    pub async fn account(&self, user_id: &str, account_id: Uuid) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, user_id, account_id).await?;
            Account::try_from(model)
        })
    }

    /// Lists the user's accounts, sorted by name.
    pub async fn list_accounts(&self, user_id: &str) -> ResultEngine<Vec<Account>> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .order_by_asc(accounts::Column::Name)
            .all(&self.database)
            .await?;
        models.into_iter().map(Account::try_from).collect()
    }

    /// Loads an account, enforcing ownership.
    pub(super) async fn require_account(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        account_id: Uuid,
    ) -> ResultEngine<accounts::Model> {
        accounts::Entity::find_by_id(account_id.to_string())
            .filter(accounts::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("account".to_string()))
    }

    /// Persists a new balance for an account.
    ///
    /// The transaction ledger is the only caller; everything else treats
    /// balances as read-only.
    pub(super) async fn save_balance(
        &self,
        db_tx: &DatabaseTransaction,
        account_id: Uuid,
        new_balance: MoneyCents,
    ) -> ResultEngine<()> {
        let model = accounts::ActiveModel {
            id: ActiveValue::Set(account_id.to_string()),
            balance_cents: ActiveValue::Set(new_balance.cents()),
            ..Default::default()
        };
        model.update(db_tx).await?;
        Ok(())
    }
}
