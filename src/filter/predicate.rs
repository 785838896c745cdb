use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::types::MetricRecord;

/// Record fields a channel token can match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelField {
    Channel,
    Source,
    RetailerName,
    RetailerId,
}

impl ChannelField {
    /// Text fields take case-insensitive substring matches.
    pub const TEXT: [ChannelField; 3] = [
        ChannelField::Channel,
        ChannelField::Source,
        ChannelField::RetailerName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelField::Channel => "channel",
            ChannelField::Source => "source",
            ChannelField::RetailerName => "retailer_name",
            ChannelField::RetailerId => "retailer_id",
        }
    }

    /// SQL column holding the lowercased copy of a text field.
    pub fn folded_column(&self) -> Option<&'static str> {
        match self {
            ChannelField::Channel => Some("channel_folded"),
            ChannelField::Source => Some("source_folded"),
            ChannelField::RetailerName => Some("retailer_name_folded"),
            ChannelField::RetailerId => None,
        }
    }

    fn value<'r>(&self, record: &'r MetricRecord) -> Option<&'r str> {
        match self {
            ChannelField::Channel => record.channel.as_deref(),
            ChannelField::Source => record.source.as_deref(),
            ChannelField::RetailerName => record.retailer_name.as_deref(),
            ChannelField::RetailerId => record.retailer_id.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MatchCondition {
    /// Case-insensitive substring. `value` is stored lowercased.
    Contains { field: ChannelField, value: String },
    Equals { field: ChannelField, value: String },
    EqualsNumber { field: ChannelField, value: i64 },
}

impl MatchCondition {
    pub fn contains(field: ChannelField, value: &str) -> Self {
        MatchCondition::Contains {
            field,
            value: value.to_lowercase(),
        }
    }

    pub fn equals(field: ChannelField, value: &str) -> Self {
        MatchCondition::Equals {
            field,
            value: value.to_string(),
        }
    }

    pub fn matches(&self, record: &MetricRecord) -> bool {
        match self {
            MatchCondition::Contains { field, value } => field
                .value(record)
                .is_some_and(|v| v.to_lowercase().contains(value.as_str())),
            MatchCondition::Equals { field, value } => {
                field.value(record).is_some_and(|v| v == value)
            }
            MatchCondition::EqualsNumber { field, value } => field
                .value(record)
                .map(str::trim)
                .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|v| v.parse::<i64>().ok())
                .is_some_and(|v| v == *value),
        }
    }
}

/// All conditions contributed by one channel token (OR'd together).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenFilter {
    pub token: String,
    pub conditions: Vec<MatchCondition>,
}

/// Inclusive date range. `end`, when present, is already normalized to the end of its day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DateRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateRange {
    /// Earliest record day that falls in the range.
    pub fn first_day(&self) -> Option<NaiveDate> {
        self.start.map(|s| s.date())
    }

    /// Latest record day that falls in the range.
    pub fn last_day(&self) -> Option<NaiveDate> {
        self.end.map(|e| e.date())
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.first_day().map_or(true, |first| day >= first)
            && self.last_day().map_or(true, |last| day <= last)
    }
}

/// Query predicate handed to a `RecordStore`: date range AND (any channel condition).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Predicate {
    pub date_range: Option<DateRange>,
    /// Empty means no channel restriction.
    pub channels: Vec<TokenFilter>,
}

impl Predicate {
    pub fn is_unrestricted(&self) -> bool {
        self.date_range.is_none() && self.channels.is_empty()
    }

    /// Every channel condition across all tokens.
    pub fn channel_conditions(&self) -> impl Iterator<Item = &MatchCondition> {
        self.channels.iter().flat_map(|t| t.conditions.iter())
    }

    pub fn matches(&self, record: &MetricRecord) -> bool {
        let in_range = self
            .date_range
            .map_or(true, |range| range.contains(record.date));
        if !in_range {
            return false;
        }
        self.channels.is_empty() || self.channel_conditions().any(|c| c.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn record(d: u32, retailer_id: &str, retailer_name: &str) -> MetricRecord {
        MetricRecord {
            date: day(d),
            retailer_id: Some(retailer_id.to_string()),
            retailer_name: Some(retailer_name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn contains_is_case_insensitive() {
        let cond = MatchCondition::contains(ChannelField::RetailerName, "WalMart");
        assert!(cond.matches(&record(1, "2", "Walmart US")));
        assert!(!cond.matches(&record(1, "1", "Amazon")));
    }

    #[test]
    fn contains_folds_non_ascii() {
        let cond = MatchCondition::contains(ChannelField::RetailerName, "Épicerie");
        assert!(cond.matches(&record(1, "9", "ÉPICERIE Müller")));
    }

    #[test]
    fn numeric_match_ignores_formatting() {
        let cond = MatchCondition::EqualsNumber {
            field: ChannelField::RetailerId,
            value: 42,
        };
        assert!(cond.matches(&record(1, "42", "x")));
        assert!(cond.matches(&record(1, "042", "x")));
        assert!(!cond.matches(&record(1, "abc", "x")));
    }

    #[test]
    fn date_range_is_inclusive_by_day() {
        let range = DateRange {
            start: day(2).and_hms_opt(12, 0, 0),
            end: day(4).and_hms_micro_opt(23, 59, 59, 999_999),
        };
        assert!(!range.contains(day(1)));
        assert!(range.contains(day(2)));
        assert!(range.contains(day(4)));
        assert!(!range.contains(day(5)));
    }

    #[test]
    fn channels_are_ored_and_dates_anded() {
        let predicate = Predicate {
            date_range: Some(DateRange {
                start: day(2).and_hms_opt(0, 0, 0),
                end: None,
            }),
            channels: vec![
                TokenFilter {
                    token: "amazon".to_string(),
                    conditions: vec![MatchCondition::contains(ChannelField::RetailerName, "amazon")],
                },
                TokenFilter {
                    token: "7".to_string(),
                    conditions: vec![MatchCondition::equals(ChannelField::RetailerId, "7")],
                },
            ],
        };
        assert!(predicate.matches(&record(3, "1", "Amazon")));
        assert!(predicate.matches(&record(3, "7", "Other")));
        assert!(!predicate.matches(&record(3, "8", "Other")));
        assert!(!predicate.matches(&record(1, "1", "Amazon")));
    }

    #[test]
    fn empty_predicate_matches_everything() {
        let predicate = Predicate::default();
        assert!(predicate.is_unrestricted());
        assert!(predicate.matches(&record(1, "1", "a")));
    }
}
