//! Response shapes handed to the routing layer.
//!
//! Field names are part of the public API and must not change: multi-word
//! fields are camelCase.

use serde::{Deserialize, Serialize};

/// A single bucketed value. `period` is `YYYY-MM-DD` or `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodEntry {
    pub period: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePeriodResponse {
    /// Number of periods stored, independent of pagination.
    pub total_periods: usize,
    /// The independently maintained total counter.
    pub total_value: u64,
    /// The requested page only.
    pub periods: Vec<PeriodEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationsSourceMetric {
    pub service: String,
    pub uri: String,
    pub citations: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSummaryItem {
    pub id: u64,
    pub views: u64,
    pub downloads: u64,
    pub crossref: u64,
    pub pubmed: u64,
    pub scopus: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSummaryResponse {
    pub total: usize,
    pub items: Vec<MetricSummaryItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn time_period_response_uses_camel_case() {
        let response = TimePeriodResponse {
            total_periods: 3,
            total_value: 30,
            periods: vec![PeriodEntry {
                period: "2023-10-03".to_owned(),
                value: 15,
            }],
        };

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "totalPeriods": 3,
                "totalValue": 30,
                "periods": [{"period": "2023-10-03", "value": 15}]
            })
        );
    }

    #[test]
    fn summary_item_field_names() {
        let item = MetricSummaryItem {
            id: 12345,
            views: 1,
            downloads: 2,
            crossref: 3,
            pubmed: 0,
            scopus: 0,
        };

        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({
                "id": 12345,
                "views": 1,
                "downloads": 2,
                "crossref": 3,
                "pubmed": 0,
                "scopus": 0
            })
        );
    }
}
