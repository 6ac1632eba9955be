use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{Category, CategoryKind, EngineError, ResultEngine, categories};

use super::{Engine, normalize_optional_text, parse_id, with_tx};

/// Per-owner system category used for institutional installment payments.
const DEBT_PAYMENT_NAME: &str = "Debt Payment";

impl Engine {
    /// Creates a category.
    ///
    /// Duplicate `(user, name, kind)` triples are rejected by the unique
    /// index and surface as [`EngineError::Conflict`].
    pub async fn create_category(
        &self,
        user_id: &str,
        name: &str,
        kind: CategoryKind,
    ) -> ResultEngine<Uuid> {
        let name = normalize_optional_text(Some(name)).ok_or_else(|| {
            EngineError::InvalidOperation("category name must not be empty".to_string())
        })?;

        let id = Uuid::new_v4();
        let active = categories::ActiveModel {
            id: ActiveValue::Set(id.to_string()),
            user_id: ActiveValue::Set(user_id.to_string()),
            name: ActiveValue::Set(name.clone()),
            kind: ActiveValue::Set(kind.as_str().to_string()),
        };
        match active.insert(&self.database).await {
            Ok(_) => Ok(id),
            Err(DbErr::Exec(err)) if err.to_string().to_lowercase().contains("unique") => {
                Err(EngineError::Conflict(name))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Lists the user's categories, sorted by name.
    pub async fn list_categories(&self, user_id: &str) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .order_by_asc(categories::Column::Name)
            .all(&self.database)
            .await?;
        models.into_iter().map(Category::try_from).collect()
    }

    /// Maps a category to the transaction kind it implies.
    pub async fn resolve_category_kind(
        &self,
        user_id: &str,
        category_id: Uuid,
    ) -> ResultEngine<CategoryKind> {
        with_tx!(self, |db_tx| {
            self.resolve_kind(&db_tx, user_id, category_id).await
        })
    }

    pub(super) async fn resolve_kind(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        category_id: Uuid,
    ) -> ResultEngine<CategoryKind> {
        let model = categories::Entity::find_by_id(category_id.to_string())
            .filter(categories::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("category".to_string()))?;
        CategoryKind::try_from(model.kind.as_str())
    }

    /// Find-or-create of the per-owner "Debt Payment" expense category.
    ///
    /// Concurrent first uses race on the insert; the unique index on
    /// `(user_id, name, kind)` makes the loser's insert fail, after which the
    /// winner's row is re-read. Never check-then-insert without the index.
    pub(super) async fn debt_payment_category(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Uuid> {
        let existing = categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .filter(categories::Column::Name.eq(DEBT_PAYMENT_NAME))
            .filter(categories::Column::Kind.eq(CategoryKind::Expense.as_str()))
            .one(db_tx)
            .await?;
        if let Some(model) = existing {
            return parse_id(&model.id, "category");
        }

        let id = Uuid::new_v4();
        let active = categories::ActiveModel {
            id: ActiveValue::Set(id.to_string()),
            user_id: ActiveValue::Set(user_id.to_string()),
            name: ActiveValue::Set(DEBT_PAYMENT_NAME.to_string()),
            kind: ActiveValue::Set(CategoryKind::Expense.as_str().to_string()),
        };
        if let Err(err) = active.insert(db_tx).await {
            let raced = categories::Entity::find()
                .filter(categories::Column::UserId.eq(user_id))
                .filter(categories::Column::Name.eq(DEBT_PAYMENT_NAME))
                .filter(categories::Column::Kind.eq(CategoryKind::Expense.as_str()))
                .one(db_tx)
                .await?;
            if let Some(model) = raced {
                return parse_id(&model.id, "category");
            }
            return Err(err.into());
        }
        Ok(id)
    }
}
