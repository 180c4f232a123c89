use serde::{Deserialize, Serialize};

/// Income classification of a station catchment or tract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IncomeCategory {
    #[serde(rename = "Low-Income Area")]
    LowIncome,
    #[serde(rename = "Non-Low-Income Area")]
    NonLowIncome,
}

impl IncomeCategory {
    pub fn label(self) -> &'static str {
        match self {
            IncomeCategory::LowIncome => "Low-Income Area",
            IncomeCategory::NonLowIncome => "Non-Low-Income Area",
        }
    }
}

/// Classifies a median household income against `threshold`.
///
/// | Median income       | Category            |
/// |---------------------|---------------------|
/// | `< threshold`       | Low-Income Area     |
/// | `>= threshold`      | Non-Low-Income Area |
pub fn income_category(median_income: f64, threshold: f64) -> IncomeCategory {
    match median_income {
        m if m < threshold => IncomeCategory::LowIncome,
        _ => IncomeCategory::NonLowIncome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_income_category_boundaries() {
        let (low, high) = (IncomeCategory::LowIncome, IncomeCategory::NonLowIncome);
        assert_eq!(income_category(63_596.0, 80_000.0), low);
        assert_eq!(income_category(79_999.99, 80_000.0), low);
        assert_eq!(income_category(80_000.0, 80_000.0), high);
        assert_eq!(income_category(95_556.0, 80_000.0), high);
    }

    #[test]
    fn test_label_matches_serialized_name() {
        let json = serde_json::to_string(&IncomeCategory::LowIncome).unwrap();
        assert_eq!(json, format!("\"{}\"", IncomeCategory::LowIncome.label()));
    }
}
