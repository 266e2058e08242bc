//! Classification of an invoice batch as purchase or sales.

use serde::{Deserialize, Serialize};

/// Invoice side, driving which backend procedures a batch uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceType {
    Purchase,
    Sales,
}

impl InvoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Purchase => "purchase",
            InvoiceType::Sales => "sales",
        }
    }
}

impl core::fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw answer of the record-type resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTypeInfo {
    pub api_name: String,
}

/// Substring tokens used to classify an object API name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTokens {
    pub purchase: String,
    pub sales: String,
}

impl Default for TypeTokens {
    fn default() -> Self {
        Self {
            purchase: "Purchase".to_string(),
            sales: "Sales".to_string(),
        }
    }
}

impl TypeTokens {
    /// Purchase wins when an API name carries both tokens.
    pub fn classify(&self, api_name: &str) -> Option<InvoiceType> {
        if !self.purchase.is_empty() && api_name.contains(&self.purchase) {
            Some(InvoiceType::Purchase)
        } else if !self.sales.is_empty() && api_name.contains(&self.sales) {
            Some(InvoiceType::Sales)
        } else {
            None
        }
    }
}

/// Resolved classification of the batch plus the object it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTypeInfo {
    pub kind: Option<InvoiceType>,
    pub api_name: String,
}

impl InvoiceTypeInfo {
    pub fn resolve(info: RecordTypeInfo, tokens: &TypeTokens) -> Self {
        Self {
            kind: tokens.classify(&info.api_name),
            api_name: info.api_name,
        }
    }
}
