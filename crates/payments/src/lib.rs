//! Bulk invoice payment workflow.
//!
//! Loads the outstanding invoices behind a batch of record identifiers, lets
//! the user choose which to pay and fill in the payment details, and submits a
//! single bulk payment to the backend procedure for the batch's invoice side.
//!
//! The backend, routing and alert widgets are collaborators reached through
//! traits; [`in_memory`] provides recording implementations of all of them.

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod form;
pub mod in_memory;
pub mod invoice_type;
pub mod navigation;
pub mod record;
pub mod selection;

pub use backend::{
    AccountDirectory, BackendError, InvoiceProcedures, PaymentRequest, ProcedureTable,
    RecordTypeResolver,
};
pub use config::WorkflowConfig;
pub use controller::{Collaborators, InvoicePaymentWorkflow, LoadSummary, Phase};
pub use error::{ErrorTier, WorkflowError};
pub use form::{PaymentField, PaymentForm};
pub use invoice_type::{InvoiceType, InvoiceTypeInfo, RecordTypeInfo, TypeTokens};
pub use navigation::{NavigationTarget, Navigator, Notice, Notifier, Severity, ViewKind};
pub use record::{
    AccountRef, AccountRow, BankAccountOption, CurrencyRef, InvoiceColumn, InvoiceRecord,
    InvoiceRow,
};
pub use selection::SelectionSet;
