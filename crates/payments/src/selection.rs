//! Invoice selection and the derived payment total.

use std::collections::BTreeSet;

use bulkpay_core::{Amount, Entity, RecordId};

use crate::record::InvoiceRecord;

/// Identifiers currently chosen for payment.
///
/// Always a subset of the loaded batch: [`SelectionSet::replace`] drops
/// identifiers that are not loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<RecordId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything in the batch selected.
    pub fn all_of(records: &[InvoiceRecord]) -> Self {
        Self {
            ids: records.iter().map(|r| r.id().clone()).collect(),
        }
    }

    /// Replace the selection with a full snapshot, restricted to `records`.
    ///
    /// Returns the identifiers that were dropped because they are not loaded.
    pub fn replace<I>(&mut self, snapshot: I, records: &[InvoiceRecord]) -> Vec<RecordId>
    where
        I: IntoIterator<Item = RecordId>,
    {
        let loaded: BTreeSet<&RecordId> = records.iter().map(Entity::id).collect();
        let (kept, dropped): (BTreeSet<RecordId>, BTreeSet<RecordId>) =
            snapshot.into_iter().partition(|id| loaded.contains(id));
        self.ids = kept;
        dropped.into_iter().collect()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordId> {
        self.ids.iter()
    }

    /// Selected records, in batch order.
    pub fn selected<'a>(&self, records: &'a [InvoiceRecord]) -> Vec<&'a InvoiceRecord> {
        records.iter().filter(|r| self.contains(r.id())).collect()
    }

    /// Sum of outstanding balances over the selected records.
    pub fn total(&self, records: &[InvoiceRecord]) -> Amount {
        self.selected(records).into_iter().map(|r| r.outstanding()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn id(s: &str) -> RecordId {
        RecordId::new(s).unwrap()
    }

    fn record(id_str: &str, cents: i64) -> InvoiceRecord {
        InvoiceRecord {
            id: id(id_str),
            name: format!("INV-{id_str}"),
            account: None,
            invoice_date: None,
            customer_reference: None,
            gross_amount: Decimal::new(cents, 2),
            outstanding_balance: Decimal::new(cents, 2),
            currency: None,
            account_name: String::new(),
        }
    }

    #[test]
    fn all_of_selects_every_loaded_record() {
        let records = vec![record("a", 100), record("b", 250)];
        let selection = SelectionSet::all_of(&records);
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.total(&records).to_fixed(), "3.50");
    }

    #[test]
    fn empty_selection_totals_zero() {
        let records = vec![record("a", 100)];
        let selection = SelectionSet::new();
        assert_eq!(selection.total(&records).to_fixed(), "0.00");
    }

    #[test]
    fn replace_is_a_snapshot_and_drops_unknown_ids() {
        let records = vec![record("a", 100), record("b", 250), record("c", 1)];
        let mut selection = SelectionSet::all_of(&records);

        let dropped = selection.replace(vec![id("b"), id("zzz"), id("b")], &records);
        assert_eq!(dropped, vec![id("zzz")]);
        assert_eq!(selection.iter().cloned().collect::<Vec<_>>(), vec![id("b")]);
        assert_eq!(selection.total(&records).to_fixed(), "2.50");
    }

    proptest! {
        /// The total is exactly the sum of outstanding balances of the chosen
        /// subset, rendered with two fractional digits.
        #[test]
        fn total_matches_selected_subset(
            balances in prop::collection::vec(0i64..10_000_000i64, 0..20),
            mask in prop::collection::vec(any::<bool>(), 20),
        ) {
            let records: Vec<InvoiceRecord> = balances
                .iter()
                .enumerate()
                .map(|(i, cents)| record(&format!("inv{i}"), *cents))
                .collect();

            let mut selection = SelectionSet::new();
            let chosen: Vec<RecordId> = records
                .iter()
                .zip(mask.iter())
                .filter(|(_, pick)| **pick)
                .map(|(r, _)| r.id.clone())
                .collect();
            selection.replace(chosen, &records);

            let expected_cents: i64 = balances
                .iter()
                .zip(mask.iter())
                .filter(|(_, pick)| **pick)
                .map(|(c, _)| *c)
                .sum();
            let expected = format!("{}.{:02}", expected_cents / 100, expected_cents % 100);

            prop_assert_eq!(selection.total(&records).to_fixed(), expected);
            prop_assert!(selection.iter().all(|id| records.iter().any(|r| &r.id == id)));
        }
    }
}
