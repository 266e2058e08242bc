//! Workflow error model.

use thiserror::Error;

use crate::backend::BackendError;
use crate::form::PaymentField;

/// How a failure is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTier {
    /// Blocking alert, then navigation back to the list view.
    Fatal,
    /// Logged; the UI stays usable with whatever was loaded.
    Recoverable,
    /// Non-navigating warning; the user can fix the input and retry.
    UserCorrectable,
    /// Generic processing error; form state kept for a retry.
    Submission,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("no invoice identifiers were supplied")]
    MissingRecordIds,

    #[error("no outstanding invoices were found for the supplied identifiers")]
    NoOutstandingInvoices,

    #[error("selected invoices use more than one currency: {}", .0.join(", "))]
    CurrencyMismatch(Vec<String>),

    #[error("failed to load invoices: {0}")]
    LoadFailed(BackendError),

    #[error("failed to resolve invoice type: {0}")]
    TypeResolutionFailed(BackendError),

    #[error("record type {0:?} is neither a purchase nor a sales invoice")]
    UnrecognizedInvoiceType(String),

    #[error("invoice type has not been resolved")]
    InvoiceTypeUnresolved,

    #[error("invoice load was superseded by a newer one")]
    LoadSuperseded,

    #[error("{} is required", .0.label())]
    MissingField(PaymentField),

    #[error("select at least one invoice to pay")]
    EmptySelection,

    #[error("unknown payment field: {0:?}")]
    UnknownField(String),

    #[error("a payment is already being submitted")]
    SubmissionInProgress,

    #[error("payment was not processed by the backend")]
    PaymentRejected,

    #[error("payment processing failed: {0}")]
    PaymentFailed(BackendError),
}

impl WorkflowError {
    pub fn tier(&self) -> ErrorTier {
        match self {
            WorkflowError::MissingRecordIds
            | WorkflowError::NoOutstandingInvoices
            | WorkflowError::CurrencyMismatch(_) => ErrorTier::Fatal,
            WorkflowError::LoadFailed(_)
            | WorkflowError::TypeResolutionFailed(_)
            | WorkflowError::UnrecognizedInvoiceType(_)
            | WorkflowError::InvoiceTypeUnresolved
            | WorkflowError::LoadSuperseded => ErrorTier::Recoverable,
            WorkflowError::MissingField(_)
            | WorkflowError::EmptySelection
            | WorkflowError::UnknownField(_)
            | WorkflowError::SubmissionInProgress => ErrorTier::UserCorrectable,
            WorkflowError::PaymentRejected | WorkflowError::PaymentFailed(_) => {
                ErrorTier::Submission
            }
        }
    }
}

impl From<crate::form::UnknownField> for WorkflowError {
    fn from(value: crate::form::UnknownField) -> Self {
        WorkflowError::UnknownField(value.0)
    }
}
