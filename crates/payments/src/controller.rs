//! Invoice payment workflow controller.
//!
//! Owns all workflow state: the loaded batch, the selection, the payment form
//! and the account options. Every operation is driven by a UI event (or the
//! startup hook) and talks to collaborators through the traits in
//! [`crate::backend`] and [`crate::navigation`].
//!
//! State lives behind a mutex that is never held across an `.await`, so the
//! controller can be shared by reference between event handlers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::Instrument;

use bulkpay_core::{Amount, RecordId, RequestId, parse_record_ids};

use crate::backend::{
    AccountDirectory, InvoiceProcedures, PaymentRequest, ProcedureTable, RecordTypeResolver,
    bounded,
};
use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::form::{PaymentField, PaymentForm};
use crate::invoice_type::{InvoiceType, InvoiceTypeInfo};
use crate::navigation::{NavigationTarget, Navigator, Notice, Notifier, Severity};
use crate::record::{BankAccountOption, InvoiceRecord, InvoiceRow, distinct_currencies};
use crate::selection::SelectionSet;

const PROCESSING_ERROR_MESSAGE: &str =
    "An error occurred while processing the payment. Please try again.";

/// Everything the workflow talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub procedures: ProcedureTable,
    pub accounts: Arc<dyn AccountDirectory>,
    pub types: Arc<dyn RecordTypeResolver>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
}

/// Workflow lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Submitting,
    Completed,
    Aborted,
}

/// Outcome of a successful [`InvoicePaymentWorkflow::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub invoice_type: InvoiceType,
    pub invoices: usize,
    pub currency: Option<String>,
}

#[derive(Debug)]
struct State {
    phase: Phase,
    /// Bumped on every `start`; results of older loads are discarded.
    generation: u64,
    loading: bool,
    busy: bool,
    record_ids: Vec<RecordId>,
    invoice_type: Option<InvoiceTypeInfo>,
    records: Vec<InvoiceRecord>,
    selection: SelectionSet,
    form: PaymentForm,
    bank_accounts: Vec<BankAccountOption>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            generation: 0,
            loading: false,
            busy: false,
            record_ids: Vec::new(),
            invoice_type: None,
            records: Vec::new(),
            selection: SelectionSet::new(),
            form: PaymentForm::default(),
            bank_accounts: Vec::new(),
        }
    }
}

impl State {
    fn resolved_kind(&self) -> Option<InvoiceType> {
        self.invoice_type.as_ref().and_then(|t| t.kind)
    }

    /// List view of the resolved object, or of the configured default.
    fn list_target(&self, config: &WorkflowConfig) -> NavigationTarget {
        match &self.invoice_type {
            Some(info) if info.kind.is_some() => NavigationTarget::list_view(&info.api_name),
            _ => NavigationTarget::list_view(&config.default_object_api_name),
        }
    }
}

/// Clears the busy flag on every exit path of a submission.
struct BusyGuard<'a> {
    state: &'a Mutex<State>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.busy = false;
        if state.phase == Phase::Submitting {
            state.phase = Phase::Ready;
        }
    }
}

pub struct InvoicePaymentWorkflow {
    config: WorkflowConfig,
    collaborators: Collaborators,
    state: Mutex<State>,
}

impl InvoicePaymentWorkflow {
    pub fn new(config: WorkflowConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
            state: Mutex::new(State::default()),
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the batch named by a comma-separated identifier list.
    ///
    /// Fatal errors have already been shown and navigated away from when this
    /// returns; recoverable ones leave the workflow usable with empty lists.
    pub async fn start(&self, raw_ids: Option<&str>) -> Result<LoadSummary, WorkflowError> {
        let ids = raw_ids.map(parse_record_ids).unwrap_or_default();

        let generation = {
            let mut state = self.state();
            state.generation += 1;
            state.phase = Phase::Loading;
            state.loading = true;
            state.record_ids = ids.clone();
            state.invoice_type = None;
            state.records.clear();
            state.selection.clear();
            state.generation
        };

        let Some(first) = ids.first() else {
            return Err(self.abort(generation, WorkflowError::MissingRecordIds).await);
        };

        tracing::info!(records = ids.len(), "starting invoice payment workflow");

        // Account options and type resolution are independent; the invoice
        // fetch needs the resolved type.
        let ((), resolved) = tokio::join!(
            self.load_bank_accounts(),
            self.resolve_type(first, ids.len())
        );

        let info = match resolved {
            Ok(info) => info,
            Err(err) => return Err(self.settle_recoverable(generation, err)),
        };

        let kind = {
            let mut state = self.state();
            if state.generation != generation {
                tracing::debug!("discarding superseded type resolution");
                return Err(WorkflowError::LoadSuperseded);
            }
            let kind = info.kind;
            state.invoice_type = Some(info.clone());
            kind
        };

        let Some(kind) = kind else {
            let err = WorkflowError::UnrecognizedInvoiceType(info.api_name);
            return Err(self.settle_recoverable(generation, err));
        };

        let procedures = self.collaborators.procedures.for_type(kind);
        let fetched = bounded(self.config.call_timeout, procedures.fetch_invoices(&ids)).await;

        let mut records = match fetched {
            Ok(records) => records,
            Err(e) => {
                return Err(self.settle_recoverable(generation, WorkflowError::LoadFailed(e)));
            }
        };

        for record in &mut records {
            record.flatten_account_name();
        }

        if records.is_empty() {
            return Err(self.abort(generation, WorkflowError::NoOutstandingInvoices).await);
        }

        let currencies = distinct_currencies(&records);
        if currencies.len() > 1 {
            let names = currencies
                .into_iter()
                .map(|c| c.unwrap_or_else(|| "(none)".to_string()))
                .collect();
            let err = WorkflowError::CurrencyMismatch(names);
            return Err(self.abort(generation, err).await);
        }
        let currency = currencies.into_iter().next().flatten();

        let mut state = self.state();
        if state.generation != generation {
            tracing::debug!("discarding superseded invoice load");
            return Err(WorkflowError::LoadSuperseded);
        }
        state.selection = SelectionSet::all_of(&records);
        state.records = records;
        state.loading = false;
        state.phase = Phase::Ready;

        tracing::info!(
            invoice_type = %kind,
            invoices = state.records.len(),
            currency = currency.as_deref().unwrap_or(""),
            "invoices loaded"
        );

        Ok(LoadSummary {
            invoice_type: kind,
            invoices: state.records.len(),
            currency,
        })
    }

    async fn load_bank_accounts(&self) {
        let fetched = bounded(
            self.config.call_timeout,
            self.collaborators.accounts.fetch_bank_accounts(),
        )
        .await;

        match fetched {
            Ok(rows) => {
                let options: Vec<BankAccountOption> =
                    rows.into_iter().map(BankAccountOption::from).collect();
                tracing::debug!(accounts = options.len(), "bank accounts loaded");
                self.state().bank_accounts = options;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load bank accounts");
            }
        }
    }

    async fn resolve_type(
        &self,
        first: &RecordId,
        batch_len: usize,
    ) -> Result<InvoiceTypeInfo, WorkflowError> {
        if batch_len > 1 {
            // Only the first record is classified; the rest are assumed to match.
            tracing::warn!(
                record_id = %first,
                batch_len,
                "invoice type resolved from the first record only"
            );
        }

        let info = bounded(
            self.config.call_timeout,
            self.collaborators.types.resolve_invoice_type(first),
        )
        .await
        .map_err(WorkflowError::TypeResolutionFailed)?;

        Ok(InvoiceTypeInfo::resolve(info, &self.config.type_tokens))
    }

    /// Recoverable load failure: log, clear the loading flag, stay put.
    fn settle_recoverable(&self, generation: u64, err: WorkflowError) -> WorkflowError {
        let mut state = self.state();
        if state.generation == generation {
            state.loading = false;
            state.phase = Phase::Ready;
        }
        tracing::warn!(error = %err, "invoice load did not complete");
        err
    }

    /// Fatal failure: blocking alert, then (after a delay) back to the list.
    ///
    /// A load already replaced by a newer `start` does nothing. One replaced
    /// during the delay keeps its alert but skips the navigation.
    async fn abort(&self, generation: u64, err: WorkflowError) -> WorkflowError {
        {
            let mut state = self.state();
            if state.generation != generation {
                tracing::debug!(error = %err, "discarding fatal result of superseded load");
                return WorkflowError::LoadSuperseded;
            }
            state.phase = Phase::Aborted;
            state.loading = false;
        }

        tracing::error!(error = %err, "invoice payment workflow aborted");
        self.collaborators
            .notifier
            .notify(Notice::alert("Error", err.to_string()));

        if !self.config.navigation_delay.is_zero() {
            tokio::time::sleep(self.config.navigation_delay).await;
        }

        let target = {
            let state = self.state();
            if state.generation != generation {
                tracing::debug!("newer load started during abort; staying put");
                return WorkflowError::LoadSuperseded;
            }
            state.list_target(&self.config)
        };
        self.collaborators.navigator.navigate(target);
        err
    }

    /// Replace the selection with a full snapshot of chosen identifiers.
    pub fn update_selection<I>(&self, ids: I)
    where
        I: IntoIterator<Item = RecordId>,
    {
        let mut state = self.state();
        let State {
            records, selection, ..
        } = &mut *state;
        let dropped = selection.replace(ids, records);
        if !dropped.is_empty() {
            tracing::warn!(dropped = dropped.len(), "ignored selection of unloaded invoices");
        }
        tracing::debug!(selected = selection.len(), "selection updated");
    }

    pub fn update_field(&self, field: PaymentField, value: impl Into<String>) {
        self.state().form.set(field, value);
        tracing::debug!(%field, "payment field updated");
    }

    /// Update a field by its input name; unknown names change nothing.
    pub fn update_field_by_name(
        &self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        let field: PaymentField = name.parse().map_err(|e| {
            tracing::warn!(name, "rejected update of unknown payment field");
            WorkflowError::from(e)
        })?;
        self.update_field(field, value);
        Ok(())
    }

    /// Selected outstanding total, always two decimal places.
    pub fn total_amount(&self) -> String {
        let state = self.state();
        state.selection.total(&state.records).to_fixed()
    }

    /// Validate the form and submit the bulk payment.
    ///
    /// Returns the backend confirmation. A call made while another submission
    /// is outstanding is rejected without reaching the backend.
    pub async fn submit_payment(&self) -> Result<String, WorkflowError> {
        let prepared = {
            let mut state = self.state();
            self.prepare_submission(&mut state)
        };

        let (request, kind, procedures) = match prepared {
            Ok(prepared) => prepared,
            Err(WorkflowError::SubmissionInProgress) => {
                tracing::debug!("submission already in flight; ignoring");
                return Err(WorkflowError::SubmissionInProgress);
            }
            Err(err) => {
                tracing::warn!(error = %err, "payment not submitted");
                self.collaborators.notifier.notify(Notice::toast(
                    Severity::Warning,
                    "Check payment details",
                    err.to_string(),
                ));
                return Err(err);
            }
        };

        let guard = BusyGuard { state: &self.state };

        let span = tracing::info_span!(
            "submit_payment",
            request_id = %request.request_id,
            invoice_type = %kind,
        );
        let outcome = bounded(self.config.call_timeout, procedures.process_payment(&request))
            .instrument(span)
            .await;

        let result = match outcome {
            Ok(Some(confirmation)) if !confirmation.trim().is_empty() => Ok(confirmation),
            Ok(_) => Err(WorkflowError::PaymentRejected),
            Err(e) => Err(WorkflowError::PaymentFailed(e)),
        };

        match result {
            Ok(confirmation) => {
                let target = {
                    let mut state = self.state();
                    state.phase = Phase::Completed;
                    state.list_target(&self.config)
                };
                drop(guard);

                tracing::info!(
                    request_id = %request.request_id,
                    invoices = request.invoices.len(),
                    total = %request.total_amount,
                    "payment processed"
                );
                self.collaborators.notifier.notify(Notice::toast(
                    Severity::Success,
                    "Payment submitted",
                    format!(
                        "Payment of {} for {} invoice(s) was processed.",
                        request.total_amount,
                        request.invoices.len()
                    ),
                ));
                self.collaborators.navigator.navigate(target);
                Ok(confirmation)
            }
            Err(err) => {
                drop(guard);
                tracing::error!(request_id = %request.request_id, error = %err, "payment failed");
                self.collaborators.notifier.notify(Notice::toast(
                    Severity::Error,
                    "Payment failed",
                    PROCESSING_ERROR_MESSAGE,
                ));
                Err(err)
            }
        }
    }

    /// Check preconditions and, when they hold, mark the workflow busy.
    fn prepare_submission(
        &self,
        state: &mut State,
    ) -> Result<(PaymentRequest, InvoiceType, Arc<dyn InvoiceProcedures>), WorkflowError> {
        if state.busy {
            return Err(WorkflowError::SubmissionInProgress);
        }
        if let Some(field) = state.form.first_missing() {
            return Err(WorkflowError::MissingField(field));
        }
        if state.selection.is_empty() {
            return Err(WorkflowError::EmptySelection);
        }
        let kind = state
            .resolved_kind()
            .ok_or(WorkflowError::InvoiceTypeUnresolved)?;

        let selected = state.selection.selected(&state.records);
        let total: Amount = selected.iter().map(|r| r.outstanding()).sum();
        let request = PaymentRequest {
            request_id: RequestId::new(),
            invoices: selected.into_iter().cloned().collect(),
            exchange_rate: state.form.exchange_rate.trim().to_string(),
            account_id: state.form.bank_account.trim().to_string(),
            total_amount: total.rounded(),
            posting_date: state.form.payment_date.trim().to_string(),
            reference: state.form.payment_reference.trim().to_string(),
        };

        state.busy = true;
        state.phase = Phase::Submitting;
        Ok((request, kind, self.collaborators.procedures.for_type(kind)))
    }

    /// Leave the workflow for the list view, replacing the history entry.
    pub fn cancel(&self) {
        let target = self.state().list_target(&self.config);
        tracing::info!(object = %target.object_api_name, "payment workflow cancelled");
        self.collaborators.navigator.navigate(target);
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn is_busy(&self) -> bool {
        self.state().busy
    }

    pub fn record_ids(&self) -> Vec<RecordId> {
        self.state().record_ids.clone()
    }

    pub fn invoice_type(&self) -> Option<InvoiceTypeInfo> {
        self.state().invoice_type.clone()
    }

    pub fn records(&self) -> Vec<InvoiceRecord> {
        self.state().records.clone()
    }

    pub fn rows(&self) -> Vec<InvoiceRow> {
        let state = self.state();
        state
            .records
            .iter()
            .map(|r| InvoiceRow::render(r, state.selection.contains(&r.id)))
            .collect()
    }

    pub fn selection(&self) -> SelectionSet {
        self.state().selection.clone()
    }

    pub fn form(&self) -> PaymentForm {
        self.state().form.clone()
    }

    pub fn bank_accounts(&self) -> Vec<BankAccountOption> {
        self.state().bank_accounts.clone()
    }
}
