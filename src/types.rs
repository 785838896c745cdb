use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Impressions,
    Clicks,
    AdSpend,
    AdSales,
    AdUnits,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Impressions,
        Metric::Clicks,
        Metric::AdSpend,
        Metric::AdSales,
        Metric::AdUnits,
    ];

    /// Field / column name of the metric.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Impressions => "impressions",
            Metric::Clicks => "clicks",
            Metric::AdSpend => "ad_spend",
            Metric::AdSales => "ad_sales",
            Metric::AdUnits => "ad_units",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ratios derived from summed metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ratio {
    /// ad_sales / ad_spend
    Roas,
    /// clicks / impressions
    Ctr,
    /// ad_spend / clicks
    Cpc,
    /// ad_units / clicks
    ConversionRate,
}

impl Ratio {
    pub const ALL: [Ratio; 4] = [Ratio::Roas, Ratio::Ctr, Ratio::Cpc, Ratio::ConversionRate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ratio::Roas => "roas",
            Ratio::Ctr => "ctr",
            Ratio::Cpc => "cpc",
            Ratio::ConversionRate => "conversion_rate",
        }
    }

    pub fn numerator(&self) -> Metric {
        match self {
            Ratio::Roas => Metric::AdSales,
            Ratio::Ctr => Metric::Clicks,
            Ratio::Cpc => Metric::AdSpend,
            Ratio::ConversionRate => Metric::AdUnits,
        }
    }

    pub fn denominator(&self) -> Metric {
        match self {
            Ratio::Roas => Metric::AdSpend,
            Ratio::Ctr => Metric::Impressions,
            Ratio::Cpc => Metric::Clicks,
            Ratio::ConversionRate => Metric::Clicks,
        }
    }
}

// ---------------------------------------------------------------------------
// Dimensions & collections
// ---------------------------------------------------------------------------

/// Field a query groups records by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    RetailerId,
    Keyword,
    PageType,
    ProductId,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::RetailerId => "retailer_id",
            Dimension::Keyword => "keyword",
            Dimension::PageType => "page_type",
            Dimension::ProductId => "product_id",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Record collections the advisor can aggregate. Each maps to a fixed grouping
/// dimension, metric set and sort metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    #[default]
    RetailerDailySpend,
    RetailerKeywordsDaily,
    RetailerPageTypeDaily,
    RetailerProductDaily,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::RetailerDailySpend,
        Collection::RetailerKeywordsDaily,
        Collection::RetailerPageTypeDaily,
        Collection::RetailerProductDaily,
    ];

    /// Collection name, also the SQLite table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::RetailerDailySpend => "retailer_daily_spend",
            Collection::RetailerKeywordsDaily => "retailer_keywords_daily",
            Collection::RetailerPageTypeDaily => "retailer_page_type_daily",
            Collection::RetailerProductDaily => "retailer_product_daily",
        }
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            Collection::RetailerDailySpend => Dimension::RetailerId,
            Collection::RetailerKeywordsDaily => Dimension::Keyword,
            Collection::RetailerPageTypeDaily => Dimension::PageType,
            Collection::RetailerProductDaily => Dimension::ProductId,
        }
    }

    pub fn metrics(&self) -> &'static [Metric] {
        &Metric::ALL
    }

    pub fn sort_by(&self) -> Metric {
        Metric::AdSales
    }

    /// Resolve an optional request name; absent or blank selects the default collection.
    pub fn resolve(name: Option<&str>) -> Result<Self, AppError> {
        match name.map(str::trim) {
            None | Some("") => Ok(Collection::default()),
            Some(n) => n.parse(),
        }
    }
}

impl std::str::FromStr for Collection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, AppError> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::UnknownCollection(s.to_string()))
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One day of performance for one dimension value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "id_text")]
    pub retailer_id: Option<String>,
    #[serde(default)]
    pub retailer_name: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub page_type: Option<String>,
    #[serde(default, deserialize_with = "id_text")]
    pub product_id: Option<String>,
    #[serde(default)]
    pub impressions: Option<f64>,
    #[serde(default)]
    pub clicks: Option<f64>,
    #[serde(default)]
    pub ad_spend: Option<f64>,
    #[serde(default)]
    pub ad_sales: Option<f64>,
    #[serde(default)]
    pub ad_units: Option<f64>,
}

/// Identifier as exported: text or a bare integer.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Int(i64),
}

fn id_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<IdValue>::deserialize(deserializer)?.map(|id| match id {
        IdValue::Text(s) => s,
        IdValue::Int(n) => n.to_string(),
    }))
}

impl MetricRecord {
    /// Metric value with absent treated as zero.
    pub fn metric(&self, metric: Metric) -> f64 {
        let v = match metric {
            Metric::Impressions => self.impressions,
            Metric::Clicks => self.clicks,
            Metric::AdSpend => self.ad_spend,
            Metric::AdSales => self.ad_sales,
            Metric::AdUnits => self.ad_units,
        };
        v.unwrap_or(0.0)
    }

    pub fn dimension_value(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::RetailerId => self.retailer_id.as_deref(),
            Dimension::Keyword => self.keyword.as_deref(),
            Dimension::PageType => self.page_type.as_deref(),
            Dimension::ProductId => self.product_id.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

/// Optional reallocation constraints supplied with a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub min_roas: Option<f64>,
    #[serde(default)]
    pub max_spend: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_resolution() {
        assert_eq!(Collection::resolve(None).unwrap(), Collection::RetailerDailySpend);
        assert_eq!(Collection::resolve(Some("")).unwrap(), Collection::RetailerDailySpend);
        assert_eq!(
            Collection::resolve(Some("retailer_keywords_daily")).unwrap(),
            Collection::RetailerKeywordsDaily
        );
        assert!(matches!(
            Collection::resolve(Some("budget")),
            Err(AppError::UnknownCollection(name)) if name == "budget"
        ));
    }

    #[test]
    fn collections_group_by_their_dimension() {
        assert_eq!(Collection::RetailerDailySpend.dimension(), Dimension::RetailerId);
        assert_eq!(Collection::RetailerKeywordsDaily.dimension(), Dimension::Keyword);
        assert_eq!(Collection::RetailerPageTypeDaily.dimension(), Dimension::PageType);
        assert_eq!(Collection::RetailerProductDaily.dimension(), Dimension::ProductId);
    }

    #[test]
    fn missing_metrics_read_as_zero() {
        let record: MetricRecord =
            serde_json::from_str(r#"{"date": "2024-03-01", "retailer_id": "7", "clicks": 4}"#)
                .unwrap();
        assert_eq!(record.metric(Metric::Clicks), 4.0);
        assert_eq!(record.metric(Metric::AdSpend), 0.0);
        assert_eq!(record.dimension_value(Dimension::RetailerId), Some("7"));
        assert_eq!(record.dimension_value(Dimension::Keyword), None);
    }

    #[test]
    fn numeric_ids_read_as_text() {
        let record: MetricRecord = serde_json::from_str(
            r#"{"date": "2024-03-01", "retailer_id": 7, "product_id": 90210, "ad_spend": 1}"#,
        )
        .unwrap();
        assert_eq!(record.retailer_id.as_deref(), Some("7"));
        assert_eq!(record.product_id.as_deref(), Some("90210"));

        let record: MetricRecord =
            serde_json::from_str(r#"{"date": "2024-03-01", "retailer_id": null}"#).unwrap();
        assert_eq!(record.retailer_id, None);
        assert!(serde_json::from_str::<MetricRecord>(
            r#"{"date": "2024-03-01", "retailer_id": 1.5}"#
        )
        .is_err());
    }
}
