use serde::Serialize;

/// The `yearMin`/`yearMax` pair as one read model.
///
/// Bounds are not reordered; enforce `min <= max` with validators if needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct YearRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
    /// True when at least one bound is present.
    pub is_set: bool,
}

impl YearRange {
    pub fn new(min: Option<i64>, max: Option<i64>) -> Self {
        Self {
            min,
            max,
            is_set: min.is_some() || max.is_some(),
        }
    }

    /// Whether `year` falls within the range. Missing bounds are open.
    pub fn contains(&self, year: i64) -> bool {
        self.min.map_or(true, |min| year >= min) && self.max.map_or(true, |max| year <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_range_contains_everything() {
        let range = YearRange::new(None, None);
        assert!(!range.is_set);
        assert!(range.contains(1900));
    }

    #[test]
    fn half_open_range() {
        let range = YearRange::new(Some(1990), None);
        assert!(range.is_set);
        assert!(range.contains(1990));
        assert!(range.contains(2024));
        assert!(!range.contains(1989));
    }

    #[test]
    fn inverted_bounds_are_kept() {
        let range = YearRange::new(Some(2000), Some(1990));
        assert_eq!(range.min, Some(2000));
        assert!(!range.contains(1995));
    }
}
