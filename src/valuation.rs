use std::collections::HashMap;

use chrono::NaiveDate;

use crate::tables::ValuationRecord;

/// Per-entity valuation history, sorted by effective date, queried as-of a date.
#[derive(Debug, Clone, Default)]
pub struct ValuationIndex {
    by_entity: HashMap<u64, Vec<(NaiveDate, f64)>>,
}

impl ValuationIndex {
    pub fn from_records(records: &[ValuationRecord]) -> Self {
        let mut by_entity: HashMap<u64, Vec<(NaiveDate, f64)>> = HashMap::new();
        for rec in records {
            if !rec.value.is_finite() {
                continue;
            }
            by_entity
                .entry(rec.player_id)
                .or_default()
                .push((rec.date, rec.value));
        }
        // Stable sort: several records on one day keep input order, so the last one wins.
        for series in by_entity.values_mut() {
            series.sort_by_key(|(date, _)| *date);
        }
        Self { by_entity }
    }

    pub fn entities(&self) -> usize {
        self.by_entity.len()
    }

    /// Value of the latest record dated on or before `as_of`. Never looks past `as_of`.
    pub fn value_as_of(&self, entity: u64, as_of: NaiveDate) -> Option<f64> {
        let series = self.by_entity.get(&entity)?;
        let idx = series.partition_point(|(date, _)| *date <= as_of);
        if idx == 0 {
            return None;
        }
        Some(series[idx - 1].1)
    }

    /// Batch form of [`Self::value_as_of`]; output order follows `queries`.
    pub fn attach(&self, queries: &[(u64, NaiveDate)]) -> Vec<Option<f64>> {
        queries
            .iter()
            .map(|(entity, as_of)| self.value_as_of(*entity, *as_of))
            .collect()
    }
}
