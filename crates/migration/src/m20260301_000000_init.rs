//! Initial schema migration - creates all tables from scratch.
//!
//! The complete schema for Saldo:
//!
//! - `users`: authentication
//! - `accounts`: money locations (bank, cash, card) with a running balance
//! - `categories`: user-defined expense/income/savings labels
//! - `transactions`: money movements, including reimbursable shared expenses
//! - `debts`: institutional loans and informal lent/borrowed money
//! - `debt_updates`: applied scheduled installments, one row per due date
//! - `repayments`: informal repayments against personal debts
//! - `settlements`: received payments distributed across reimbursables

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    UserId,
    Name,
    Kind,
    BalanceCents,
    Currency,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    UserId,
    Name,
    Kind,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    UserId,
    AccountId,
    ToAccountId,
    CategoryId,
    Kind,
    AmountCents,
    OccurredAt,
    Description,
    IsReimbursable,
    ReimbursedCents,
    Counterparty,
    SettlementGroup,
}

#[derive(Iden)]
enum Debts {
    Table,
    Id,
    UserId,
    AccountId,
    Name,
    Role,
    Status,
    PrincipalCents,
    CurrentBalanceCents,
    InstallmentCents,
    Frequency,
    StartDate,
    NextDueDate,
    TermMonths,
    Counterparty,
    PaidCents,
    AdjustmentCents,
    DueDate,
    SettlementGroup,
}

#[derive(Iden)]
enum DebtUpdates {
    Table,
    Id,
    DebtId,
    UpdateDate,
    TransactionId,
    Status,
}

#[derive(Iden)]
enum Repayments {
    Table,
    Id,
    DebtId,
    AmountCents,
    AdjustmentCents,
    RepaidOn,
    Notes,
    TransactionId,
}

#[derive(Iden)]
enum Settlements {
    Table,
    Id,
    UserId,
    SettlementGroup,
    Counterparty,
    AmountCents,
    SettledOn,
    Notes,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::UserId).string().not_null())
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Accounts::BalanceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::Currency)
                            .string()
                            .not_null()
                            .default("EUR"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounts-user_id")
                            .from(Accounts::Table, Accounts::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-user_id-name-unique")
                    .table(Accounts::Table)
                    .col(Accounts::UserId)
                    .col(Accounts::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::UserId).string().not_null())
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::Kind).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-categories-user_id")
                            .from(Categories::Table, Categories::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-user_id-name-kind-unique")
                    .table(Categories::Table)
                    .col(Categories::UserId)
                    .col(Categories::Name)
                    .col(Categories::Kind)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::UserId).string().not_null())
                    .col(ColumnDef::new(Transactions::AccountId).string())
                    .col(ColumnDef::new(Transactions::ToAccountId).string())
                    .col(ColumnDef::new(Transactions::CategoryId).string())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::Description)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::IsReimbursable)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::ReimbursedCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Transactions::Counterparty).string())
                    .col(ColumnDef::new(Transactions::SettlementGroup).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-user_id")
                            .from(Transactions::Table, Transactions::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-account_id")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-to_account_id")
                            .from(Transactions::Table, Transactions::ToAccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-category_id")
                            .from(Transactions::Table, Transactions::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-user_id-occurred_at")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-settlement_group")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::SettlementGroup)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Debts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Debts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Debts::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Debts::UserId).string().not_null())
                    .col(ColumnDef::new(Debts::AccountId).string())
                    .col(ColumnDef::new(Debts::Name).string().not_null())
                    .col(ColumnDef::new(Debts::Role).string().not_null())
                    .col(ColumnDef::new(Debts::Status).string().not_null())
                    .col(
                        ColumnDef::new(Debts::PrincipalCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Debts::CurrentBalanceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Debts::InstallmentCents).big_integer())
                    .col(ColumnDef::new(Debts::Frequency).string())
                    .col(ColumnDef::new(Debts::StartDate).date())
                    .col(ColumnDef::new(Debts::NextDueDate).date())
                    .col(ColumnDef::new(Debts::TermMonths).integer())
                    .col(ColumnDef::new(Debts::Counterparty).string())
                    .col(
                        ColumnDef::new(Debts::PaidCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Debts::AdjustmentCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Debts::DueDate).date())
                    .col(ColumnDef::new(Debts::SettlementGroup).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-debts-user_id")
                            .from(Debts::Table, Debts::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-debts-account_id")
                            .from(Debts::Table, Debts::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-debts-user_id-role")
                    .table(Debts::Table)
                    .col(Debts::UserId)
                    .col(Debts::Role)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Debt updates
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(DebtUpdates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DebtUpdates::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DebtUpdates::DebtId).string().not_null())
                    .col(ColumnDef::new(DebtUpdates::UpdateDate).date().not_null())
                    .col(ColumnDef::new(DebtUpdates::TransactionId).string())
                    .col(ColumnDef::new(DebtUpdates::Status).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-debt_updates-debt_id")
                            .from(DebtUpdates::Table, DebtUpdates::DebtId)
                            .to(Debts::Table, Debts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per due date; catch-up replay depends on this.
        manager
            .create_index(
                Index::create()
                    .name("idx-debt_updates-debt_id-update_date-unique")
                    .table(DebtUpdates::Table)
                    .col(DebtUpdates::DebtId)
                    .col(DebtUpdates::UpdateDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Repayments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Repayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repayments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Repayments::DebtId).string().not_null())
                    .col(
                        ColumnDef::new(Repayments::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Repayments::AdjustmentCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Repayments::RepaidOn).date().not_null())
                    .col(ColumnDef::new(Repayments::Notes).string())
                    .col(ColumnDef::new(Repayments::TransactionId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-repayments-debt_id")
                            .from(Repayments::Table, Repayments::DebtId)
                            .to(Debts::Table, Debts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-repayments-debt_id")
                    .table(Repayments::Table)
                    .col(Repayments::DebtId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Settlements
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Settlements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settlements::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settlements::UserId).string().not_null())
                    .col(ColumnDef::new(Settlements::SettlementGroup).string())
                    .col(ColumnDef::new(Settlements::Counterparty).string())
                    .col(
                        ColumnDef::new(Settlements::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Settlements::SettledOn).date().not_null())
                    .col(ColumnDef::new(Settlements::Notes).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-settlements-user_id")
                            .from(Settlements::Table, Settlements::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-settlements-user_id-settled_on")
                    .table(Settlements::Table)
                    .col(Settlements::UserId)
                    .col(Settlements::SettledOn)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Settlements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Repayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DebtUpdates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Debts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
