use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use bulkpay_core::RecordId;
use bulkpay_payments::in_memory::{
    InMemoryAccountDirectory, InMemoryProcedures, InMemoryTypeResolver, RecordingNavigator,
    RecordingNotifier,
};
use bulkpay_payments::{
    AccountRow, BackendError, Collaborators, ErrorTier, InvoicePaymentWorkflow, InvoiceRecord,
    InvoiceType, NavigationTarget, PaymentField, Phase, ProcedureTable, Severity, ViewKind,
    WorkflowConfig, WorkflowError,
};

const PURCHASE_OBJECT: &str = "Purchase_Invoice__c";
const SALES_OBJECT: &str = "Sales_Invoice__c";

struct Harness {
    purchase: Arc<InMemoryProcedures>,
    sales: Arc<InMemoryProcedures>,
    types: Arc<InMemoryTypeResolver>,
    navigator: Arc<RecordingNavigator>,
    notifier: Arc<RecordingNotifier>,
    workflow: InvoicePaymentWorkflow,
}

fn id(s: &str) -> RecordId {
    RecordId::new(s).unwrap()
}

fn invoice(id: &str, outstanding: &str, currency: Option<&str>) -> InvoiceRecord {
    let mut value = json!({
        "id": id,
        "name": format!("INV-{id}"),
        "account": { "id": "acc-1", "name": "Acme Supplies" },
        "invoiceDate": "2024-03-01",
        "customerReference": "PO-1",
        "grossAmount": "500.00",
        "outstandingBalance": outstanding,
    });
    if let Some(currency) = currency {
        value["currency"] = json!({ "name": currency });
    }
    serde_json::from_value(value).unwrap()
}

fn test_config() -> WorkflowConfig {
    WorkflowConfig {
        navigation_delay: Duration::ZERO,
        call_timeout: Some(Duration::from_secs(2)),
        ..WorkflowConfig::default()
    }
}

fn harness_with(
    config: WorkflowConfig,
    accounts: InMemoryAccountDirectory,
    types: InMemoryTypeResolver,
) -> Harness {
    bulkpay_observability::init_for_tests();

    let purchase = Arc::new(InMemoryProcedures::new());
    let sales = Arc::new(InMemoryProcedures::new());
    let types = Arc::new(types);
    let navigator = Arc::new(RecordingNavigator::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let collaborators = Collaborators {
        procedures: ProcedureTable::new(purchase.clone(), sales.clone()),
        accounts: Arc::new(accounts),
        types: types.clone(),
        navigator: navigator.clone(),
        notifier: notifier.clone(),
    };

    Harness {
        purchase,
        sales,
        types,
        navigator,
        notifier,
        workflow: InvoicePaymentWorkflow::new(config, collaborators),
    }
}

/// Purchase batch of three USD invoices (inv-1..inv-3), plus a default account list.
fn purchase_harness() -> Harness {
    let accounts = InMemoryAccountDirectory::new(vec![
        AccountRow { name: "Main Bank".into(), id: id("nom-1") },
        AccountRow { name: "Petty Cash".into(), id: id("nom-2") },
    ]);
    let types = InMemoryTypeResolver::new()
        .with(id("inv-1"), PURCHASE_OBJECT)
        .with(id("sin-1"), SALES_OBJECT)
        .with(id("jnl-1"), "Journal__c");
    let h = harness_with(test_config(), accounts, types);
    h.purchase.set_invoices(vec![
        invoice("inv-1", "100.00", Some("USD")),
        invoice("inv-2", "250.50", Some("USD")),
        invoice("inv-3", "49.495", Some("USD")),
    ]);
    h
}

fn fill_form(workflow: &InvoicePaymentWorkflow) {
    workflow.update_field(PaymentField::PaymentDate, "2024-04-30");
    workflow.update_field(PaymentField::BankAccount, "nom-1");
    workflow.update_field(PaymentField::ExchangeRate, "1.0");
    workflow.update_field(PaymentField::PaymentReference, "April supplier run");
}

fn list_view(object: &str) -> NavigationTarget {
    NavigationTarget {
        object_api_name: object.to_string(),
        view: ViewKind::List,
        replace: true,
    }
}

#[tokio::test]
async fn successful_load_preselects_every_returned_invoice() {
    let h = purchase_harness();

    let summary = h.workflow.start(Some(" inv-1, inv-2 ,inv-3 ")).await.unwrap();
    assert_eq!(summary.invoice_type, InvoiceType::Purchase);
    assert_eq!(summary.invoices, 3);
    assert_eq!(summary.currency.as_deref(), Some("USD"));

    let selected: Vec<RecordId> = h.workflow.selection().iter().cloned().collect();
    assert_eq!(selected, vec![id("inv-1"), id("inv-2"), id("inv-3")]);

    assert_eq!(h.workflow.phase(), Phase::Ready);
    assert!(!h.workflow.is_loading());
    assert!(h.workflow.records().iter().all(|r| r.account_name == "Acme Supplies"));
    assert!(h.workflow.rows().iter().all(|row| row.selected));
    assert!(h.navigator.targets().is_empty());
    assert!(h.notifier.notices().is_empty());
}

#[tokio::test]
async fn type_is_resolved_from_first_identifier_and_fetch_gets_whole_batch() {
    let h = purchase_harness();

    h.workflow.start(Some("inv-1,inv-2,inv-3")).await.unwrap();

    assert_eq!(h.types.lookups(), vec![id("inv-1")]);
    assert_eq!(
        h.purchase.fetch_calls(),
        vec![vec![id("inv-1"), id("inv-2"), id("inv-3")]]
    );
    assert!(h.sales.fetch_calls().is_empty());
    assert_eq!(h.workflow.record_ids().len(), 3);
}

#[tokio::test]
async fn sales_batches_use_sales_procedures() {
    let h = purchase_harness();
    h.sales.set_invoices(vec![invoice("sin-1", "75.00", Some("GBP"))]);

    let summary = h.workflow.start(Some("sin-1")).await.unwrap();
    assert_eq!(summary.invoice_type, InvoiceType::Sales);
    assert!(h.purchase.fetch_calls().is_empty());

    fill_form(&h.workflow);
    h.workflow.submit_payment().await.unwrap();
    assert_eq!(h.sales.payments().len(), 1);
    assert!(h.purchase.payments().is_empty());
    assert_eq!(h.navigator.targets(), vec![list_view(SALES_OBJECT)]);
}

#[tokio::test]
async fn bank_accounts_become_options() {
    let h = purchase_harness();
    h.workflow.start(Some("inv-1")).await.unwrap();

    let options = h.workflow.bank_accounts();
    assert_eq!(options.len(), 2);
    assert_eq!(options[0].label, "Main Bank");
    assert_eq!(options[0].value, "nom-1");
}

#[tokio::test]
async fn bank_account_failure_is_not_fatal() {
    let h = harness_with(
        test_config(),
        InMemoryAccountDirectory::failing(BackendError::Unavailable("directory down".into())),
        InMemoryTypeResolver::new().with(id("inv-1"), PURCHASE_OBJECT),
    );
    h.purchase.set_invoices(vec![invoice("inv-1", "10.00", Some("USD"))]);

    h.workflow.start(Some("inv-1")).await.unwrap();

    assert!(h.workflow.bank_accounts().is_empty());
    assert_eq!(h.workflow.records().len(), 1);
    assert!(h.navigator.targets().is_empty());
}

#[tokio::test]
async fn missing_identifiers_abort_without_loading() {
    for raw in [None, Some(""), Some(" , ,")] {
        let h = purchase_harness();

        let err = h.workflow.start(raw).await.unwrap_err();
        assert_eq!(err, WorkflowError::MissingRecordIds);
        assert_eq!(err.tier(), ErrorTier::Fatal);

        assert!(h.types.lookups().is_empty());
        assert!(h.purchase.fetch_calls().is_empty());
        assert_eq!(h.workflow.phase(), Phase::Aborted);

        let notice = h.notifier.last().unwrap();
        assert!(notice.blocking);
        assert_eq!(notice.severity, Severity::Error);
        assert_eq!(h.navigator.targets(), vec![list_view("Invoice")]);
    }
}

#[tokio::test]
async fn zero_returned_invoices_abort() {
    let h = purchase_harness();
    h.purchase.set_invoices(Vec::new());

    let err = h.workflow.start(Some("inv-1")).await.unwrap_err();
    assert_eq!(err, WorkflowError::NoOutstandingInvoices);
    assert!(h.workflow.records().is_empty());
    assert!(h.notifier.last().unwrap().blocking);
    assert_eq!(h.navigator.targets(), vec![list_view(PURCHASE_OBJECT)]);
}

#[tokio::test]
async fn single_currency_batch_loads() {
    let h = purchase_harness();
    h.purchase.set_invoices(vec![
        invoice("inv-1", "1.00", Some("USD")),
        invoice("inv-2", "2.00", Some("USD")),
    ]);

    assert!(h.workflow.start(Some("inv-1,inv-2")).await.is_ok());
    assert!(h.navigator.targets().is_empty());
}

#[tokio::test]
async fn mixed_currency_batch_aborts_and_navigates_back() {
    let h = purchase_harness();
    h.purchase.set_invoices(vec![
        invoice("inv-1", "1.00", Some("USD")),
        invoice("inv-2", "2.00", Some("EUR")),
    ]);

    let err = h.workflow.start(Some("inv-1,inv-2")).await.unwrap_err();
    assert_eq!(
        err,
        WorkflowError::CurrencyMismatch(vec!["EUR".to_string(), "USD".to_string()])
    );
    assert!(h.workflow.selection().is_empty());
    assert_eq!(h.workflow.phase(), Phase::Aborted);
    assert_eq!(h.navigator.targets(), vec![list_view(PURCHASE_OBJECT)]);
}

#[tokio::test]
async fn fatal_navigation_waits_for_the_configured_delay() {
    let config = WorkflowConfig {
        navigation_delay: Duration::from_millis(40),
        ..test_config()
    };
    let h = harness_with(config, InMemoryAccountDirectory::default(), InMemoryTypeResolver::new());

    let started = Instant::now();
    let _ = h.workflow.start(None).await;
    assert!(started.elapsed() >= Duration::from_millis(40));
    assert_eq!(h.navigator.targets().len(), 1);
}

#[tokio::test]
async fn fetch_failure_is_recoverable() {
    let h = purchase_harness();
    h.purchase.fail_fetch(BackendError::Unavailable("timeout talking to ledger".into()));

    let err = h.workflow.start(Some("inv-1,inv-2")).await.unwrap_err();
    assert!(matches!(err, WorkflowError::LoadFailed(_)));
    assert_eq!(err.tier(), ErrorTier::Recoverable);

    assert!(!h.workflow.is_loading());
    assert_eq!(h.workflow.phase(), Phase::Ready);
    assert!(h.workflow.records().is_empty());
    assert!(h.navigator.targets().is_empty());
    assert!(h.notifier.notices().is_empty());
}

#[tokio::test]
async fn unrecognized_type_skips_the_fetch() {
    let h = purchase_harness();

    let err = h.workflow.start(Some("jnl-1")).await.unwrap_err();
    assert_eq!(err, WorkflowError::UnrecognizedInvoiceType("Journal__c".into()));
    assert!(h.purchase.fetch_calls().is_empty());
    assert!(h.sales.fetch_calls().is_empty());
    assert!(h.navigator.targets().is_empty());

    // Unset type: cancel falls back to the default object.
    h.workflow.cancel();
    assert_eq!(h.navigator.targets(), vec![list_view("Invoice")]);
}

#[tokio::test]
async fn type_resolution_failure_is_recoverable() {
    let h = purchase_harness();

    let err = h.workflow.start(Some("unknown-1")).await.unwrap_err();
    assert!(matches!(err, WorkflowError::TypeResolutionFailed(_)));
    assert!(!h.workflow.is_loading());
    assert!(h.navigator.targets().is_empty());
}

#[tokio::test]
async fn reloading_replaces_records_and_selection() {
    let h = purchase_harness();
    h.workflow.start(Some("inv-1,inv-2,inv-3")).await.unwrap();
    h.workflow.update_selection(vec![id("inv-1")]);

    h.workflow.start(Some("inv-1,inv-2")).await.unwrap();

    let selected: Vec<RecordId> = h.workflow.selection().iter().cloned().collect();
    assert_eq!(selected, vec![id("inv-1"), id("inv-2")]);
    assert_eq!(h.workflow.records().len(), 2);
}

/// Purchase harness where `old-1` and `new-1` both resolve to purchase
/// invoices; only `new-1` has an outstanding invoice.
fn overlapping_harness(config: WorkflowConfig) -> Harness {
    let types = InMemoryTypeResolver::new()
        .with(id("old-1"), PURCHASE_OBJECT)
        .with(id("new-1"), PURCHASE_OBJECT);
    let h = harness_with(config, InMemoryAccountDirectory::default(), types);
    h.purchase.set_invoices(vec![invoice("new-1", "75.00", Some("USD"))]);
    h
}

#[tokio::test]
async fn replaced_load_with_no_invoices_neither_alerts_nor_navigates() {
    let h = overlapping_harness(test_config());
    h.purchase.delay_fetch_of(id("old-1"), Duration::from_millis(100));

    let (old, new) = tokio::join!(h.workflow.start(Some("old-1")), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.workflow.start(Some("new-1")).await
    });

    assert_eq!(old.unwrap_err(), WorkflowError::LoadSuperseded);
    assert_eq!(new.unwrap().invoices, 1);
    assert_eq!(h.workflow.phase(), Phase::Ready);
    assert_eq!(h.workflow.record_ids(), vec![id("new-1")]);
    assert_eq!(h.workflow.records().len(), 1);
    assert!(h.navigator.targets().is_empty());
    assert!(h.notifier.notices().is_empty());
}

#[tokio::test]
async fn replaced_successful_load_does_not_overwrite_newer_batch() {
    let h = overlapping_harness(test_config());
    h.purchase.set_invoices(vec![
        invoice("old-1", "10.00", Some("EUR")),
        invoice("new-1", "75.00", Some("USD")),
    ]);
    h.purchase.delay_fetch_of(id("old-1"), Duration::from_millis(100));

    let (old, new) = tokio::join!(h.workflow.start(Some("old-1")), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.workflow.start(Some("new-1")).await
    });

    assert_eq!(old.unwrap_err(), WorkflowError::LoadSuperseded);
    assert_eq!(new.unwrap().currency.as_deref(), Some("USD"));

    let selected: Vec<RecordId> = h.workflow.selection().iter().cloned().collect();
    assert_eq!(selected, vec![id("new-1")]);
    assert_eq!(h.workflow.total_amount(), "75.00");
    assert_eq!(h.workflow.phase(), Phase::Ready);
}

#[tokio::test]
async fn load_started_during_fatal_delay_cancels_the_navigation() {
    let config = WorkflowConfig {
        navigation_delay: Duration::from_millis(100),
        ..test_config()
    };
    let h = overlapping_harness(config);

    let (old, new) = tokio::join!(h.workflow.start(Some("old-1")), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.workflow.start(Some("new-1")).await
    });

    // The alert was already up; only the navigation is withdrawn.
    assert_eq!(old.unwrap_err(), WorkflowError::LoadSuperseded);
    assert_eq!(new.unwrap().invoices, 1);
    assert_eq!(h.notifier.notices().len(), 1);
    assert!(h.navigator.targets().is_empty());
    assert_eq!(h.workflow.phase(), Phase::Ready);
    assert_eq!(h.workflow.records().len(), 1);
}

#[tokio::test]
async fn total_tracks_the_selected_subset() {
    let h = purchase_harness();
    h.workflow.start(Some("inv-1,inv-2,inv-3")).await.unwrap();

    // 100.00 + 250.50 + 49.495
    assert_eq!(h.workflow.total_amount(), "400.00");

    h.workflow.update_selection(vec![id("inv-2"), id("inv-3")]);
    assert_eq!(h.workflow.total_amount(), "300.00");

    h.workflow.update_selection(vec![id("inv-2")]);
    assert_eq!(h.workflow.total_amount(), "250.50");

    h.workflow.update_selection(Vec::new());
    assert_eq!(h.workflow.total_amount(), "0.00");
}

#[tokio::test]
async fn selection_ignores_unloaded_identifiers() {
    let h = purchase_harness();
    h.workflow.start(Some("inv-1,inv-2")).await.unwrap();

    h.workflow.update_selection(vec![id("inv-2"), id("inv-3"), id("other")]);

    let selected: Vec<RecordId> = h.workflow.selection().iter().cloned().collect();
    assert_eq!(selected, vec![id("inv-2")]);
    let rows = h.workflow.rows();
    assert!(!rows[0].selected);
    assert!(rows[1].selected);
}

#[tokio::test]
async fn fields_update_by_name_and_unknown_names_are_rejected() {
    let h = purchase_harness();

    h.workflow.update_field_by_name("exchangeRate", "1.17").unwrap();
    assert_eq!(h.workflow.form().exchange_rate, "1.17");

    let before = h.workflow.form();
    let err = h.workflow.update_field_by_name("invoiceRecords", "x").unwrap_err();
    assert_eq!(err, WorkflowError::UnknownField("invoiceRecords".into()));
    assert_eq!(h.workflow.form(), before);
}

#[tokio::test]
async fn any_missing_field_blocks_submission() {
    for missing in PaymentField::ALL {
        let h = purchase_harness();
        h.workflow.start(Some("inv-1,inv-2")).await.unwrap();
        fill_form(&h.workflow);
        h.workflow.update_field(missing, "  ");

        let err = h.workflow.submit_payment().await.unwrap_err();
        assert_eq!(err, WorkflowError::MissingField(missing));
        assert_eq!(err.tier(), ErrorTier::UserCorrectable);

        assert!(h.purchase.payments().is_empty());
        assert!(h.navigator.targets().is_empty());
        let notice = h.notifier.last().unwrap();
        assert_eq!(notice.severity, Severity::Warning);
        assert!(!notice.blocking);
    }
}

#[tokio::test]
async fn fields_are_checked_in_order() {
    let h = purchase_harness();
    h.workflow.start(Some("inv-1")).await.unwrap();
    h.workflow.update_field(PaymentField::PaymentReference, "ref");

    let err = h.workflow.submit_payment().await.unwrap_err();
    assert_eq!(err, WorkflowError::MissingField(PaymentField::PaymentDate));
}

#[tokio::test]
async fn empty_selection_blocks_submission() {
    let h = purchase_harness();
    h.workflow.start(Some("inv-1,inv-2")).await.unwrap();
    fill_form(&h.workflow);
    h.workflow.update_selection(Vec::new());

    let err = h.workflow.submit_payment().await.unwrap_err();
    assert_eq!(err, WorkflowError::EmptySelection);
    assert!(h.purchase.payments().is_empty());
}

#[tokio::test]
async fn successful_submission_pays_selected_invoices_once() {
    let h = purchase_harness();
    h.workflow.start(Some("inv-1,inv-2,inv-3")).await.unwrap();
    h.workflow.update_selection(vec![id("inv-1"), id("inv-3")]);
    fill_form(&h.workflow);
    let expected_total = h.workflow.total_amount();

    let confirmation = h.workflow.submit_payment().await.unwrap();
    assert_eq!(confirmation, "OK");

    let payments = h.purchase.payments();
    assert_eq!(payments.len(), 1);
    let request = &payments[0];
    assert_eq!(request.total_amount.to_string(), expected_total);
    assert_eq!(expected_total, "149.50");
    assert_eq!(
        request.invoices.iter().map(|r| r.id.clone()).collect::<Vec<_>>(),
        vec![id("inv-1"), id("inv-3")]
    );
    assert_eq!(request.account_id, "nom-1");
    assert_eq!(request.exchange_rate, "1.0");
    assert_eq!(request.posting_date, "2024-04-30");
    assert_eq!(request.reference, "April supplier run");
    assert!(h.sales.payments().is_empty());

    assert_eq!(h.workflow.phase(), Phase::Completed);
    assert!(!h.workflow.is_busy());
    assert_eq!(h.notifier.last().unwrap().severity, Severity::Success);
    assert_eq!(h.navigator.targets(), vec![list_view(PURCHASE_OBJECT)]);
}

#[tokio::test]
async fn falsy_result_keeps_state_and_allows_retry() {
    let h = purchase_harness();
    h.workflow.start(Some("inv-1,inv-2")).await.unwrap();
    fill_form(&h.workflow);
    h.purchase.respond_to_payment(Ok(Some(String::new())));

    let err = h.workflow.submit_payment().await.unwrap_err();
    assert_eq!(err, WorkflowError::PaymentRejected);
    assert_eq!(err.tier(), ErrorTier::Submission);
    assert_eq!(h.notifier.last().unwrap().severity, Severity::Error);
    assert!(h.navigator.targets().is_empty());
    assert!(!h.workflow.is_busy());
    assert_eq!(h.workflow.phase(), Phase::Ready);
    assert_eq!(h.workflow.form().payment_reference, "April supplier run");
    assert_eq!(h.workflow.selection().len(), 2);

    h.purchase.respond_to_payment(Ok(None));
    assert_eq!(
        h.workflow.submit_payment().await.unwrap_err(),
        WorkflowError::PaymentRejected
    );

    h.purchase.respond_to_payment(Ok(Some("PAY-0001".into())));
    assert_eq!(h.workflow.submit_payment().await.unwrap(), "PAY-0001");
    assert_eq!(h.purchase.payments().len(), 3);
    assert_eq!(h.navigator.targets().len(), 1);
}

#[tokio::test]
async fn backend_failure_is_reported_and_recoverable() {
    let h = purchase_harness();
    h.workflow.start(Some("inv-1")).await.unwrap();
    fill_form(&h.workflow);
    h.purchase
        .respond_to_payment(Err(BackendError::Rejected("period closed".into())));

    let err = h.workflow.submit_payment().await.unwrap_err();
    assert_eq!(
        err,
        WorkflowError::PaymentFailed(BackendError::Rejected("period closed".into()))
    );
    assert!(!h.workflow.is_busy());
    assert!(h.navigator.targets().is_empty());
}

#[tokio::test]
async fn concurrent_submission_is_rejected_while_busy() {
    let h = purchase_harness();
    h.workflow.start(Some("inv-1,inv-2")).await.unwrap();
    fill_form(&h.workflow);
    h.purchase.delay_payment(Duration::from_millis(50));

    let (first, second) = tokio::join!(h.workflow.submit_payment(), h.workflow.submit_payment());

    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), WorkflowError::SubmissionInProgress);
    assert_eq!(h.purchase.payments().len(), 1);
    assert!(!h.workflow.is_busy());
}

#[tokio::test]
async fn hung_payment_times_out_and_clears_busy_flag() {
    let config = WorkflowConfig {
        call_timeout: Some(Duration::from_millis(20)),
        ..test_config()
    };
    let h = harness_with(
        config,
        InMemoryAccountDirectory::default(),
        InMemoryTypeResolver::new().with(id("inv-1"), PURCHASE_OBJECT),
    );
    h.purchase.set_invoices(vec![invoice("inv-1", "10.00", Some("USD"))]);
    h.purchase.delay_payment(Duration::from_millis(500));
    h.workflow.start(Some("inv-1")).await.unwrap();
    fill_form(&h.workflow);

    let err = h.workflow.submit_payment().await.unwrap_err();
    assert_eq!(
        err,
        WorkflowError::PaymentFailed(BackendError::Timeout(Duration::from_millis(20)))
    );
    assert!(!h.workflow.is_busy());
    assert_eq!(h.workflow.phase(), Phase::Ready);
}

#[tokio::test]
async fn cancel_navigates_once_to_resolved_list_view() {
    let h = purchase_harness();
    h.workflow.start(Some("inv-1")).await.unwrap();

    h.workflow.cancel();

    assert_eq!(h.navigator.targets(), vec![list_view(PURCHASE_OBJECT)]);
}

#[tokio::test]
async fn cancel_before_start_uses_default_object() {
    let h = purchase_harness();

    h.workflow.cancel();

    let targets = h.navigator.targets();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].object_api_name, "Invoice");
    assert!(targets[0].replace);
}
