use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classify_types::{BinInfo, Category};

/// One persisted classification. Created exactly once per fully presented
/// result; never mutated afterwards. `id` and `timestamp` may be left
/// unset by the caller; the store assigns them on append.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HistoryRecord {
    pub id: Option<String>,
    pub label: String,
    pub bin: BinInfo,
    pub category: Category,
    pub confidence: f32,
    pub timestamp: Option<DateTime<Utc>>,
    pub image_locator: String,
}

/// Derived aggregate counts. Never stored, always recomputed from the
/// full record log.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Statistics {
    pub total: u64,
    pub recyclable: u64,
    pub organic: u64,
    pub hazardous: u64,
    /// `round(100 * recyclable / total)`, 0 when the log is empty.
    pub recyclable_percent: u32,
}

impl Statistics {
    pub fn recompute(categories: impl Iterator<Item = Category>) -> Self {
        use crate::models::classify_types::Bucket;

        let mut stats = Statistics::default();
        for category in categories {
            stats.total += 1;
            match category.bucket() {
                Bucket::Recyclable => stats.recyclable += 1,
                Bucket::Organic => stats.organic += 1,
                Bucket::Hazardous => stats.hazardous += 1,
                Bucket::Neither => {}
            }
        }
        if stats.total > 0 {
            stats.recyclable_percent =
                ((100.0 * stats.recyclable as f64 / stats.total as f64).round()) as u32;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_log_yields_zeroed_statistics() {
        let stats = Statistics::recompute(std::iter::empty());
        assert_eq!(stats, Statistics::default());
        assert_eq!(stats.recyclable_percent, 0);
    }

    #[test]
    fn residual_and_unknown_count_only_toward_total() {
        let stats =
            Statistics::recompute([Category::Residual, Category::Unknown].into_iter());
        assert_eq!(stats.total, 2);
        assert_eq!(stats.recyclable, 0);
        assert_eq!(stats.organic, 0);
        assert_eq!(stats.hazardous, 0);
        assert_eq!(stats.recyclable_percent, 0);
    }

    #[test]
    fn percent_is_rounded_to_nearest_integer() {
        // 2/3 recyclable -> 66.67 -> 67
        let stats = Statistics::recompute(
            [Category::Recyclable, Category::Organic, Category::Recyclable].into_iter(),
        );
        assert_eq!(stats.recyclable_percent, 67);

        // 1/3 recyclable -> 33.33 -> 33
        let stats = Statistics::recompute(
            [Category::Paper, Category::Organic, Category::Residual].into_iter(),
        );
        assert_eq!(stats.recyclable_percent, 33);
    }

    #[test]
    fn all_material_categories_map_to_recyclable_bucket() {
        let stats = Statistics::recompute(
            [
                Category::Recyclable,
                Category::Paper,
                Category::Cardboard,
                Category::Metal,
                Category::Glass,
                Category::Plastic,
            ]
            .into_iter(),
        );
        assert_eq!(stats.recyclable, 6);
        assert_eq!(stats.recyclable_percent, 100);
    }
}
