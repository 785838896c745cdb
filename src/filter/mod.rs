pub mod aliases;
pub mod dates;
pub mod predicate;

use tracing::warn;

pub use aliases::{AliasEntry, AliasTable};
pub use predicate::{ChannelField, DateRange, MatchCondition, Predicate, TokenFilter};

/// Turns raw request bounds and channel tokens into a `Predicate`.
pub struct FilterBuilder<'a> {
    aliases: &'a AliasTable,
}

impl<'a> FilterBuilder<'a> {
    pub fn new(aliases: &'a AliasTable) -> Self {
        Self { aliases }
    }

    pub fn build(&self, from: Option<&str>, to: Option<&str>, channels: &[String]) -> Predicate {
        let start = from.and_then(|raw| parse_logged("from", raw));
        let end = to
            .and_then(|raw| parse_logged("to", raw))
            .map(dates::end_of_day);

        let date_range = if start.is_some() || end.is_some() {
            Some(DateRange { start, end })
        } else {
            None
        };

        Predicate {
            date_range,
            channels: channels
                .iter()
                .filter_map(|token| self.resolve_token(token))
                .collect(),
        }
    }

    /// Candidate match conditions for one channel token. Blank tokens resolve to nothing.
    pub fn resolve_token(&self, raw: &str) -> Option<TokenFilter> {
        let token = raw.trim();
        if token.is_empty() {
            return None;
        }

        let mut conditions: Vec<MatchCondition> = ChannelField::TEXT
            .iter()
            .map(|&field| MatchCondition::contains(field, token))
            .collect();
        conditions.push(MatchCondition::equals(ChannelField::RetailerId, token));

        if token.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(value) = token.parse::<i64>() {
                conditions.push(MatchCondition::EqualsNumber {
                    field: ChannelField::RetailerId,
                    value,
                });
            }
        }

        if let Some(entry) = self.aliases.lookup(token) {
            for id in &entry.retailer_ids {
                conditions.push(MatchCondition::equals(ChannelField::RetailerId, id));
            }
            for fragment in &entry.name_contains {
                conditions.push(MatchCondition::contains(ChannelField::RetailerName, fragment));
            }
        }

        Some(TokenFilter {
            token: token.to_string(),
            conditions,
        })
    }
}

fn parse_logged(bound: &str, raw: &str) -> Option<chrono::NaiveDateTime> {
    let parsed = dates::parse_bound(raw);
    if parsed.is_none() && !raw.trim().is_empty() {
        warn!(bound, value = raw, "Unparseable date bound ignored");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn aliases() -> AliasTable {
        AliasTable::from_json(
            r#"{"version": 1, "aliases": {"amazon": {"retailer_ids": ["1", "11"], "name_contains": ["amzn"]}}}"#,
        )
        .unwrap()
    }

    #[test]
    fn unparseable_start_drops_lower_bound() {
        let table = aliases();
        let predicate = FilterBuilder::new(&table).build(Some("not-a-date"), Some("2024-03-05"), &[]);
        let range = predicate.date_range.expect("end bound survives");
        assert!(range.start.is_none());
        assert_eq!(range.last_day(), NaiveDate::from_ymd_opt(2024, 3, 5));
    }

    #[test]
    fn both_bounds_unparseable_means_no_range() {
        let table = aliases();
        let predicate = FilterBuilder::new(&table).build(Some("soon"), Some("later"), &[]);
        assert!(predicate.date_range.is_none());
        assert!(predicate.is_unrestricted());
    }

    #[test]
    fn end_bound_covers_whole_day() {
        let table = aliases();
        let predicate = FilterBuilder::new(&table).build(None, Some("2024-03-05T08:30:00"), &[]);
        let end = predicate.date_range.unwrap().end.unwrap();
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));
        assert_eq!(end.nanosecond(), 999_999_000);
    }

    #[test]
    fn text_token_resolves_to_field_conditions() {
        let table = aliases();
        let filter = FilterBuilder::new(&table).resolve_token(" Search ").unwrap();
        assert_eq!(filter.token, "Search");
        assert_eq!(
            filter.conditions,
            vec![
                MatchCondition::contains(ChannelField::Channel, "search"),
                MatchCondition::contains(ChannelField::Source, "search"),
                MatchCondition::contains(ChannelField::RetailerName, "search"),
                MatchCondition::equals(ChannelField::RetailerId, "Search"),
            ]
        );
    }

    #[test]
    fn numeric_token_adds_numeric_match() {
        let table = aliases();
        let filter = FilterBuilder::new(&table).resolve_token("42").unwrap();
        assert!(filter.conditions.contains(&MatchCondition::EqualsNumber {
            field: ChannelField::RetailerId,
            value: 42,
        }));
    }

    #[test]
    fn alias_token_expands_case_insensitively() {
        let table = aliases();
        let filter = FilterBuilder::new(&table).resolve_token("AMAZON").unwrap();
        assert!(filter
            .conditions
            .contains(&MatchCondition::equals(ChannelField::RetailerId, "1")));
        assert!(filter
            .conditions
            .contains(&MatchCondition::equals(ChannelField::RetailerId, "11")));
        assert!(filter
            .conditions
            .contains(&MatchCondition::contains(ChannelField::RetailerName, "amzn")));
    }

    #[test]
    fn blank_tokens_are_skipped() {
        let table = aliases();
        let predicate = FilterBuilder::new(&table).build(None, None, &["  ".to_string()]);
        assert!(predicate.channels.is_empty());
    }
}
