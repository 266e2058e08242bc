//! Backend collaborators: record fetch, payment processing, type resolution,
//! and the account directory.
//!
//! All of them are opaque remote procedures. The workflow only relies on the
//! input/output contracts below; how they are reached (HTTP, RPC, in-memory)
//! is up to the host.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bulkpay_core::{RecordId, RequestId};

use crate::invoice_type::{InvoiceType, RecordTypeInfo};
use crate::record::{AccountRow, InvoiceRecord};

/// Backend call failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend rejected the call: {0}")]
    Rejected(String),
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for BackendError {
    fn from(value: serde_json::Error) -> Self {
        BackendError::Decode(value.to_string())
    }
}

/// Bulk payment request handed to the payment procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub request_id: RequestId,
    /// Full records of the selected invoices, in batch order.
    pub invoices: Vec<InvoiceRecord>,
    pub exchange_rate: String,
    pub account_id: String,
    /// Selected outstanding total, two decimal places.
    #[serde(with = "rust_decimal::serde::str")]
    pub total_amount: Decimal,
    pub posting_date: String,
    pub reference: String,
}

/// Fetch + submit procedures for one invoice side.
#[async_trait::async_trait]
pub trait InvoiceProcedures: Send + Sync {
    /// Full invoice details for every identifier in the batch.
    async fn fetch_invoices(&self, ids: &[RecordId]) -> Result<Vec<InvoiceRecord>, BackendError>;

    /// Post the bulk payment.
    ///
    /// `Some(non-empty)` is a confirmation; `None` or an empty string means the
    /// backend declined without raising an error.
    async fn process_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<Option<String>, BackendError>;
}

/// Source of selectable bank/nominal accounts.
#[async_trait::async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn fetch_bank_accounts(&self) -> Result<Vec<AccountRow>, BackendError>;
}

/// Resolves which object a record identifier belongs to.
#[async_trait::async_trait]
pub trait RecordTypeResolver: Send + Sync {
    async fn resolve_invoice_type(&self, id: &RecordId) -> Result<RecordTypeInfo, BackendError>;
}

/// Strategy table: invoice side → procedures.
#[derive(Clone)]
pub struct ProcedureTable {
    purchase: Arc<dyn InvoiceProcedures>,
    sales: Arc<dyn InvoiceProcedures>,
}

impl ProcedureTable {
    pub fn new(purchase: Arc<dyn InvoiceProcedures>, sales: Arc<dyn InvoiceProcedures>) -> Self {
        Self { purchase, sales }
    }

    pub fn for_type(&self, kind: InvoiceType) -> Arc<dyn InvoiceProcedures> {
        match kind {
            InvoiceType::Purchase => Arc::clone(&self.purchase),
            InvoiceType::Sales => Arc::clone(&self.sales),
        }
    }
}

impl core::fmt::Debug for ProcedureTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProcedureTable").finish_non_exhaustive()
    }
}

/// Await a backend call, bounded by `limit` when one is configured.
pub(crate) async fn bounded<T, F>(limit: Option<Duration>, call: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| BackendError::Timeout(limit))?,
        None => call.await,
    }
}
