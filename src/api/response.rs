//! Caller-facing response shape. Pure composition; nothing is computed here.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::advisor::Advice;
use crate::aggregator::AggregatedRow;
use crate::config::{CONFIDENCE, EXPLAINABILITY};
use crate::filter::Predicate;
use crate::scorer::ReallocationSuggestion;
use crate::types::Collection;

#[derive(Debug, Serialize)]
pub struct TimeRange {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize)]
pub struct ResponseMetadata {
    pub query: Option<String>,
    pub kpi: Option<String>,
    pub time_range: TimeRange,
    pub collection: Collection,
    pub row_count: usize,
    pub filter: Predicate,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub metadata: ResponseMetadata,
    pub summary: Vec<AggregatedRow>,
    pub suggested_reallocation: Vec<ReallocationSuggestion>,
    pub explainability: &'static str,
    pub confidence: f64,
}

/// Echoed request fields that play no part in the computation.
#[derive(Debug, Clone, Default)]
pub struct RequestEcho {
    pub query: Option<String>,
    pub kpi: Option<String>,
    pub collection: Collection,
}

pub fn assemble(echo: RequestEcho, advice: Advice) -> QueryResponse {
    let Advice {
        predicate,
        summary,
        suggestions,
    } = advice;

    let time_range = TimeRange {
        from: predicate.date_range.and_then(|r| r.start),
        to: predicate.date_range.and_then(|r| r.end),
    };

    QueryResponse {
        metadata: ResponseMetadata {
            query: echo.query,
            kpi: echo.kpi,
            time_range,
            collection: echo.collection,
            row_count: summary.len(),
            filter: predicate,
        },
        summary,
        suggested_reallocation: suggestions,
        explainability: EXPLAINABILITY,
        confidence: CONFIDENCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DateRange;
    use chrono::NaiveDate;

    #[test]
    fn composes_metadata_and_fixed_fields() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let advice = Advice {
            predicate: Predicate {
                date_range: Some(DateRange {
                    start: Some(start),
                    end: None,
                }),
                channels: Vec::new(),
            },
            summary: Vec::new(),
            suggestions: Vec::new(),
        };
        let echo = RequestEcho {
            query: Some("where should budget go?".to_string()),
            kpi: Some("ROAS".to_string()),
            collection: Collection::RetailerPageTypeDaily,
        };

        let json = serde_json::to_value(assemble(echo, advice)).unwrap();
        assert_eq!(json["metadata"]["query"], "where should budget go?");
        assert_eq!(json["metadata"]["kpi"], "ROAS");
        assert_eq!(json["metadata"]["collection"], "retailer_page_type_daily");
        assert_eq!(json["metadata"]["row_count"], 0);
        assert_eq!(json["metadata"]["time_range"]["from"], "2024-03-01T00:00:00");
        assert!(json["metadata"]["time_range"]["to"].is_null());
        assert_eq!(json["confidence"], 0.75);
        assert_eq!(json["explainability"], EXPLAINABILITY);
        assert!(json["summary"].as_array().unwrap().is_empty());
    }
}
