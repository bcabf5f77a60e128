//! Categorical label encoding for the Agent and Topic columns.
//!
//! Classes are the distinct observed strings in sorted order; a class's id is
//! its index. Fitting is deterministic for a given set of inputs regardless
//! of row order.

use std::collections::{BTreeSet, HashMap};

use crate::error::{CallsightError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    field: &'static str,
    classes: Vec<String>,
    index: HashMap<String, u32>,
}

impl LabelEncoder {
    /// Fit an encoder over every value of one column.
    pub fn fit<I, S>(field: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: Vec<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i as u32))
            .collect();
        Self {
            field,
            classes,
            index,
        }
    }

    /// Look up the id of a category seen during fitting.
    pub fn transform(&self, value: &str) -> Result<u32> {
        self.index
            .get(value)
            .copied()
            .ok_or_else(|| CallsightError::UnseenCategory {
                field: self.field,
                value: value.to_string(),
            })
    }

    pub fn inverse_transform(&self, id: u32) -> Result<&str> {
        self.classes
            .get(id as usize)
            .map(String::as_str)
            .ok_or(CallsightError::UnknownId {
                field: self.field,
                id,
            })
    }

    /// Categories in id order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agents() -> LabelEncoder {
        LabelEncoder::fit("Agent", ["Jim", "Becky", "Jim", "Diane", "Becky"])
    }

    #[test]
    fn test_classes_are_sorted_and_distinct() {
        assert_eq!(agents().classes(), ["Becky", "Diane", "Jim"]);
    }

    #[test]
    fn test_transform_assigns_dense_ids() {
        let enc = agents();
        assert_eq!(enc.transform("Becky").unwrap(), 0);
        assert_eq!(enc.transform("Diane").unwrap(), 1);
        assert_eq!(enc.transform("Jim").unwrap(), 2);
    }

    #[test]
    fn test_round_trip_every_class() {
        let enc = agents();
        for class in enc.classes() {
            let id = enc.transform(class).unwrap();
            assert_eq!(enc.inverse_transform(id).unwrap(), class);
        }
    }

    #[test]
    fn test_unseen_category_fails() {
        match agents().transform("Martha") {
            Err(CallsightError::UnseenCategory { field, value }) => {
                assert_eq!(field, "Agent");
                assert_eq!(value, "Martha");
            }
            other => panic!("Expected UnseenCategory, got: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_id_fails() {
        assert!(matches!(
            agents().inverse_transform(3),
            Err(CallsightError::UnknownId { id: 3, .. })
        ));
    }

    #[test]
    fn test_fit_ignores_input_order() {
        let a = LabelEncoder::fit("Topic", ["Streaming", "Admin Support", "Contract related"]);
        let b = LabelEncoder::fit("Topic", ["Contract related", "Streaming", "Admin Support"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_matching_is_exact() {
        let enc = agents();
        assert!(enc.transform("jim").is_err());
        assert!(enc.transform(" Jim").is_err());
    }
}
