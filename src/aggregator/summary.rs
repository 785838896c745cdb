use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::state::GroupSums;
use crate::types::{Dimension, Metric, Ratio};

/// Per-group metric sums plus the ratios derivable from them.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub dimension: Dimension,
    pub key: Option<String>,
    pub metrics: Vec<(Metric, f64)>,
    /// Only ratios whose two source metrics were requested. `None` = zero denominator.
    pub ratios: Vec<(Ratio, Option<f64>)>,
}

impl AggregatedRow {
    pub fn from_sums(dimension: Dimension, sums: GroupSums) -> Self {
        let GroupSums { key, sums } = sums;
        let lookup = |m: Metric| sums.iter().find(|(metric, _)| *metric == m).map(|(_, v)| *v);

        let ratios = Ratio::ALL
            .into_iter()
            .filter_map(|ratio| {
                let num = lookup(ratio.numerator())?;
                let den = lookup(ratio.denominator())?;
                Some((ratio, derive_ratio(num, den)))
            })
            .collect();

        Self {
            dimension,
            key,
            metrics: sums,
            ratios,
        }
    }

    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.metrics.iter().find(|(m, _)| *m == metric).map(|(_, v)| *v)
    }

    /// Ratio value; `None` when undefined or not derivable for this row.
    pub fn ratio(&self, ratio: Ratio) -> Option<f64> {
        self.ratios
            .iter()
            .find(|(r, _)| *r == ratio)
            .and_then(|(_, v)| *v)
    }

    pub fn has_ratio(&self, ratio: Ratio) -> bool {
        self.ratios.iter().any(|(r, _)| *r == ratio)
    }
}

/// `num / den`, undefined unless the denominator is positive.
pub fn derive_ratio(num: f64, den: f64) -> Option<f64> {
    if den > 0.0 {
        Some(num / den)
    } else {
        None
    }
}

/// Flat JSON object: `{<dimension>: key, <metric>: sum, ..., <ratio>: value|null, ...}`.
impl Serialize for AggregatedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.metrics.len() + self.ratios.len()))?;
        map.serialize_entry(self.dimension.as_str(), &self.key)?;
        for (metric, value) in &self.metrics {
            map.serialize_entry(metric.as_str(), value)?;
        }
        for (ratio, value) in &self.ratios {
            map.serialize_entry(ratio.as_str(), value)?;
        }
        map.end()
    }
}
