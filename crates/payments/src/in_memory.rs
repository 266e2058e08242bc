//! In-memory collaborators.
//!
//! Intended for tests/dev and for hosts that want to drive the workflow
//! without a backend. They record every call so assertions can inspect them.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use bulkpay_core::RecordId;

use crate::backend::{
    AccountDirectory, BackendError, InvoiceProcedures, PaymentRequest, RecordTypeResolver,
};
use crate::invoice_type::RecordTypeInfo;
use crate::navigation::{NavigationTarget, Navigator, Notice, Notifier};
use crate::record::{AccountRow, InvoiceRecord};

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Invoice store + payment endpoint for one invoice side.
#[derive(Debug)]
pub struct InMemoryProcedures {
    invoices: RwLock<Vec<InvoiceRecord>>,
    fetch_error: RwLock<Option<BackendError>>,
    payment_response: RwLock<Result<Option<String>, BackendError>>,
    payment_delay: RwLock<Duration>,
    fetch_delays: RwLock<HashMap<RecordId, Duration>>,
    fetch_calls: Mutex<Vec<Vec<RecordId>>>,
    payments: Mutex<Vec<PaymentRequest>>,
}

impl Default for InMemoryProcedures {
    fn default() -> Self {
        Self {
            invoices: RwLock::new(Vec::new()),
            fetch_error: RwLock::new(None),
            payment_response: RwLock::new(Ok(Some("OK".to_string()))),
            payment_delay: RwLock::new(Duration::ZERO),
            fetch_delays: RwLock::new(HashMap::new()),
            fetch_calls: Mutex::new(Vec::new()),
            payments: Mutex::new(Vec::new()),
        }
    }
}

impl InMemoryProcedures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_invoices(invoices: Vec<InvoiceRecord>) -> Self {
        let store = Self::default();
        store.set_invoices(invoices);
        store
    }

    /// Load invoices from a JSON array in the backend wire shape.
    pub fn from_json(json: &str) -> Result<Self, BackendError> {
        let invoices: Vec<InvoiceRecord> = serde_json::from_str(json)?;
        Ok(Self::with_invoices(invoices))
    }

    pub fn set_invoices(&self, invoices: Vec<InvoiceRecord>) {
        *self.invoices.write().unwrap_or_else(PoisonError::into_inner) = invoices;
    }

    pub fn fail_fetch(&self, error: BackendError) {
        *self.fetch_error.write().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    pub fn respond_to_payment(&self, response: Result<Option<String>, BackendError>) {
        *self.payment_response.write().unwrap_or_else(PoisonError::into_inner) = response;
    }

    /// Hold every payment call for `delay` before answering.
    pub fn delay_payment(&self, delay: Duration) {
        *self.payment_delay.write().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Hold any fetch that asks for `id` for `delay` before answering.
    pub fn delay_fetch_of(&self, id: RecordId, delay: Duration) {
        self.fetch_delays
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, delay);
    }

    pub fn fetch_calls(&self) -> Vec<Vec<RecordId>> {
        locked(&self.fetch_calls).clone()
    }

    pub fn payments(&self) -> Vec<PaymentRequest> {
        locked(&self.payments).clone()
    }
}

#[async_trait::async_trait]
impl InvoiceProcedures for InMemoryProcedures {
    async fn fetch_invoices(&self, ids: &[RecordId]) -> Result<Vec<InvoiceRecord>, BackendError> {
        locked(&self.fetch_calls).push(ids.to_vec());

        let delay = {
            let delays = self.fetch_delays.read().unwrap_or_else(PoisonError::into_inner);
            ids.iter()
                .filter_map(|id| delays.get(id).copied())
                .max()
                .unwrap_or(Duration::ZERO)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self
            .fetch_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(err);
        }

        let invoices = self.invoices.read().unwrap_or_else(PoisonError::into_inner);
        Ok(invoices
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn process_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<Option<String>, BackendError> {
        locked(&self.payments).push(request.clone());

        let delay = *self.payment_delay.read().unwrap_or_else(PoisonError::into_inner);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.payment_response
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Fixed account list (or a fixed failure).
#[derive(Debug)]
pub struct InMemoryAccountDirectory {
    rows: Result<Vec<AccountRow>, BackendError>,
}

impl InMemoryAccountDirectory {
    pub fn new(rows: Vec<AccountRow>) -> Self {
        Self { rows: Ok(rows) }
    }

    pub fn failing(error: BackendError) -> Self {
        Self { rows: Err(error) }
    }
}

impl Default for InMemoryAccountDirectory {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait::async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn fetch_bank_accounts(&self) -> Result<Vec<AccountRow>, BackendError> {
        self.rows.clone()
    }
}

/// Record identifier → object API name.
#[derive(Debug, Default)]
pub struct InMemoryTypeResolver {
    api_names: HashMap<RecordId, String>,
    lookups: Mutex<Vec<RecordId>>,
}

impl InMemoryTypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: RecordId, api_name: impl Into<String>) -> Self {
        self.api_names.insert(id, api_name.into());
        self
    }

    pub fn lookups(&self) -> Vec<RecordId> {
        locked(&self.lookups).clone()
    }
}

#[async_trait::async_trait]
impl RecordTypeResolver for InMemoryTypeResolver {
    async fn resolve_invoice_type(&self, id: &RecordId) -> Result<RecordTypeInfo, BackendError> {
        locked(&self.lookups).push(id.clone());
        self.api_names
            .get(id)
            .map(|api_name| RecordTypeInfo {
                api_name: api_name.clone(),
            })
            .ok_or_else(|| BackendError::Rejected(format!("unknown record {id}")))
    }
}

/// Navigator that records every command.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    targets: Mutex<Vec<NavigationTarget>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn targets(&self) -> Vec<NavigationTarget> {
        locked(&self.targets).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: NavigationTarget) {
        locked(&self.targets).push(target);
    }
}

/// Notifier that records every notice.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        locked(&self.notices).clone()
    }

    pub fn last(&self) -> Option<Notice> {
        locked(&self.notices).last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        locked(&self.notices).push(notice);
    }
}
