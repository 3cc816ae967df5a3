use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maps each distinct category to its index in the sorted class list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();

        Self {
            classes: classes.into_iter().collect(),
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn transform_one(&self, value: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .ok()
    }

    pub fn inverse_transform(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_sorted_order() {
        let encoder = LabelEncoder::fit(["Two year", "Month-to-month", "One year", "Month-to-month"]);

        assert_eq!(encoder.classes(), &["Month-to-month", "One year", "Two year"]);
        assert_eq!(encoder.transform_one("Month-to-month"), Some(0));
        assert_eq!(encoder.transform_one("Two year"), Some(2));
        assert_eq!(encoder.transform_one("Weekly"), None);
        assert_eq!(encoder.inverse_transform(1), Some("One year"));
    }
}
