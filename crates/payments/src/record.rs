//! Invoice records as returned by the backend, and their table presentation.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bulkpay_core::{Amount, Entity, RecordId};

/// Reference to the account (customer/supplier) an invoice belongs to.
///
/// Display-only, so the nested id is taken as sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Reference to the invoice currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRef {
    pub name: String,
}

/// Invoice header with an outstanding balance, as fetched for payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub account: Option<AccountRef>,
    #[serde(default)]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default)]
    pub customer_reference: Option<String>,
    pub gross_amount: Decimal,
    pub outstanding_balance: Decimal,
    #[serde(default)]
    pub currency: Option<CurrencyRef>,

    /// Flattened account name for display; filled in when the batch is loaded.
    #[serde(default)]
    pub account_name: String,
}

impl InvoiceRecord {
    /// Copy the nested account name into `account_name` (empty when absent).
    pub fn flatten_account_name(&mut self) {
        self.account_name = self
            .account
            .as_ref()
            .and_then(|a| a.name.clone())
            .unwrap_or_default();
    }

    pub fn currency_name(&self) -> Option<&str> {
        self.currency.as_ref().map(|c| c.name.as_str())
    }

    pub fn outstanding(&self) -> Amount {
        Amount::new(self.outstanding_balance)
    }
}

impl Entity for InvoiceRecord {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Distinct currencies across a batch. Records without a currency count as
/// one distinct (`None`) value.
pub fn distinct_currencies(records: &[InvoiceRecord]) -> BTreeSet<Option<String>> {
    records
        .iter()
        .map(|r| r.currency_name().map(str::to_string))
        .collect()
}

/// Account row as returned by the account directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountRow {
    pub name: String,
    pub id: RecordId,
}

/// Option for the bank/nominal account selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccountOption {
    pub label: String,
    pub value: String,
}

impl From<AccountRow> for BankAccountOption {
    fn from(row: AccountRow) -> Self {
        Self {
            label: row.name,
            value: row.id.into(),
        }
    }
}

/// Columns of the invoice selection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvoiceColumn {
    InvoiceName,
    Account,
    InvoiceDate,
    CustomerReference,
    GrossAmount,
    OutstandingAmount,
}

impl InvoiceColumn {
    pub const ALL: [InvoiceColumn; 6] = [
        InvoiceColumn::InvoiceName,
        InvoiceColumn::Account,
        InvoiceColumn::InvoiceDate,
        InvoiceColumn::CustomerReference,
        InvoiceColumn::GrossAmount,
        InvoiceColumn::OutstandingAmount,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            InvoiceColumn::InvoiceName => "Invoice name",
            InvoiceColumn::Account => "Account",
            InvoiceColumn::InvoiceDate => "Invoice date",
            InvoiceColumn::CustomerReference => "Customer reference",
            InvoiceColumn::GrossAmount => "Gross amount",
            InvoiceColumn::OutstandingAmount => "Outstanding amount",
        }
    }

    /// Render the column's cell for one record.
    pub fn cell(&self, record: &InvoiceRecord) -> String {
        match self {
            InvoiceColumn::InvoiceName => record.name.clone(),
            InvoiceColumn::Account => record.account_name.clone(),
            InvoiceColumn::InvoiceDate => record
                .invoice_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            InvoiceColumn::CustomerReference => {
                record.customer_reference.clone().unwrap_or_default()
            }
            InvoiceColumn::GrossAmount => Amount::new(record.gross_amount).to_fixed(),
            InvoiceColumn::OutstandingAmount => record.outstanding().to_fixed(),
        }
    }
}

/// One rendered table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceRow {
    pub id: RecordId,
    pub selected: bool,
    /// Cells in [`InvoiceColumn::ALL`] order.
    pub cells: Vec<String>,
}

impl InvoiceRow {
    pub fn render(record: &InvoiceRecord, selected: bool) -> Self {
        Self {
            id: record.id.clone(),
            selected,
            cells: InvoiceColumn::ALL.iter().map(|c| c.cell(record)).collect(),
        }
    }
}
