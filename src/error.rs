//! Error types for store access and the actions built on top of it.
//!
//! Every failure ends up as one blocking message for the user; there is no
//! retry and no partial recovery.

use std::fmt;

use thiserror::Error;

use crate::budget::BudgetError;
use crate::fund::FundError;
use crate::inventory::InventoryError;
use crate::store::Table;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("invalid store configuration: {0}")]
    Config(String),

    #[error("{table} record {id} not found")]
    NotFound { table: Table, id: String },

    #[error("malformed {table} record: {reason}")]
    Malformed { table: Table, reason: String },
}

/// The user action that was running when something failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    LoadSchools,
    LoadTransactions,
    AddSchool,
    AddFranchise,
    SaveFranchise,
    UpdateSchool,
    RenameSchool,
    DeleteSchool,
    DeleteFranchise,
    AddTransaction,
    DeleteTransaction,
}

impl Operation {
    pub fn label(&self) -> &'static str {
        match self {
            Operation::LoadSchools => "load schools",
            Operation::LoadTransactions => "load transactions",
            Operation::AddSchool => "add school",
            Operation::AddFranchise => "add franchise",
            Operation::SaveFranchise => "save franchise",
            Operation::UpdateSchool => "update school",
            Operation::RenameSchool => "rename school",
            Operation::DeleteSchool => "delete school",
            Operation::DeleteFranchise => "delete franchise",
            Operation::AddTransaction => "add transaction",
            Operation::DeleteTransaction => "delete transaction",
        }
    }

    /// Message shown to the user; `detail` is appended where the message takes one.
    fn user_message(&self, detail: &str) -> String {
        match self {
            Operation::LoadSchools => format!("Erro ao carregar escolas: {detail}"),
            Operation::LoadTransactions => "Erro ao carregar movimentações.".to_string(),
            Operation::AddSchool | Operation::AddFranchise => {
                format!("Erro ao criar pasta: {detail}")
            }
            Operation::SaveFranchise => format!("Erro ao salvar: {detail}"),
            Operation::UpdateSchool => format!("Erro ao atualizar escola: {detail}"),
            Operation::RenameSchool => "Erro ao renomear escola.".to_string(),
            Operation::DeleteSchool | Operation::DeleteFranchise => {
                format!("Erro ao excluir: {detail}")
            }
            Operation::AddTransaction => "Erro ao registrar movimentação. Verifique se a tabela \
                 'investment_transactions' existe no seu banco de dados."
                .to_string(),
            Operation::DeleteTransaction => "Erro ao excluir movimentação.".to_string(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{op} failed: {source}")]
    Store {
        op: Operation,
        #[source]
        source: StoreError,
    },

    #[error("{0} not found")]
    Missing(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Budget(#[from] BudgetError),

    #[error(transparent)]
    Fund(#[from] FundError),
}

impl AppError {
    pub fn store(op: Operation, source: StoreError) -> Self {
        AppError::Store { op, source }
    }

    /// Text for the blocking alert.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Store { op, source } => op.user_message(&source.to_string()),
            AppError::Missing(what) => {
                format!("Erro: {what} não encontrada (recarregue os dados)")
            }
            AppError::Validation(message) => message.clone(),
            AppError::Inventory(
                InventoryError::ZeroQuantity | InventoryError::QuantityOverflow { .. },
            ) => "Quantidade inválida".to_string(),
            AppError::Inventory(err) => format!("Item inválido: {err}"),
            AppError::Budget(_) => "Quantidade inválida".to_string(),
            AppError::Fund(_) => "Valor inválido".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failure_message_carries_detail() {
        let err = AppError::store(
            Operation::SaveFranchise,
            StoreError::Status {
                status: 500,
                body: "boom".into(),
            },
        );
        assert_eq!(
            err.user_message(),
            "Erro ao salvar: store responded with status 500: boom"
        );
        assert_eq!(
            err.to_string(),
            "save franchise failed: store responded with status 500: boom"
        );
    }

    #[test]
    fn fixed_messages() {
        let err = AppError::store(
            Operation::DeleteTransaction,
            StoreError::Crypto("bad tag".into()),
        );
        assert_eq!(err.user_message(), "Erro ao excluir movimentação.");
        assert_eq!(
            AppError::from(InventoryError::ZeroQuantity).user_message(),
            "Quantidade inválida"
        );
    }

    #[test]
    fn missing_record_message_agrees_with_feminine_labels() {
        assert_eq!(
            AppError::Missing("Escola".into()).user_message(),
            "Erro: Escola não encontrada (recarregue os dados)"
        );
        assert_eq!(
            AppError::Missing("Unidade".into()).user_message(),
            "Erro: Unidade não encontrada (recarregue os dados)"
        );
    }
}
