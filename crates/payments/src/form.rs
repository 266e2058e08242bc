//! Payment form fields.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of editable payment fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentField {
    PaymentDate,
    BankAccount,
    ExchangeRate,
    PaymentReference,
}

impl PaymentField {
    /// Validation order.
    pub const ALL: [PaymentField; 4] = [
        PaymentField::PaymentDate,
        PaymentField::BankAccount,
        PaymentField::ExchangeRate,
        PaymentField::PaymentReference,
    ];

    /// Input name used by the form controls.
    pub fn name(&self) -> &'static str {
        match self {
            PaymentField::PaymentDate => "paymentDate",
            PaymentField::BankAccount => "bankAccount",
            PaymentField::ExchangeRate => "exchangeRate",
            PaymentField::PaymentReference => "paymentReference",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentField::PaymentDate => "Payment date",
            PaymentField::BankAccount => "Bank account",
            PaymentField::ExchangeRate => "Exchange rate",
            PaymentField::PaymentReference => "Payment reference",
        }
    }
}

impl core::fmt::Display for PaymentField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognized field name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment field: {0:?}")]
pub struct UnknownField(pub String);

impl FromStr for PaymentField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentField::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// Payment details entered by the user. Validated only at submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentForm {
    pub payment_date: String,
    pub bank_account: String,
    pub exchange_rate: String,
    pub payment_reference: String,
}

impl PaymentForm {
    pub fn set(&mut self, field: PaymentField, value: impl Into<String>) {
        *self.slot_mut(field) = value.into();
    }

    pub fn get(&self, field: PaymentField) -> &str {
        match field {
            PaymentField::PaymentDate => &self.payment_date,
            PaymentField::BankAccount => &self.bank_account,
            PaymentField::ExchangeRate => &self.exchange_rate,
            PaymentField::PaymentReference => &self.payment_reference,
        }
    }

    fn slot_mut(&mut self, field: PaymentField) -> &mut String {
        match field {
            PaymentField::PaymentDate => &mut self.payment_date,
            PaymentField::BankAccount => &mut self.bank_account,
            PaymentField::ExchangeRate => &mut self.exchange_rate,
            PaymentField::PaymentReference => &mut self.payment_reference,
        }
    }

    /// First required field (in [`PaymentField::ALL`] order) that is blank.
    pub fn first_missing(&self) -> Option<PaymentField> {
        PaymentField::ALL
            .into_iter()
            .find(|f| self.get(*f).trim().is_empty())
    }
}
