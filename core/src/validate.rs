//! Validation rules: pure, declarative, side-effect free.
//!
//! A rule is a (field, predicate, message) triple; the aggregate
//! [`ValidationRules::validate`] simply folds the list in declaration order
//! with no special-casing. Monetary input additionally gets a
//! character-level filter ([`filter_numeric_text`]) so a clearly-invalid
//! value never sits visibly in the field while editing; commit-time rules
//! are the second, independent layer.

use crate::{
    descriptor::{FieldType, RecordDescriptor},
    FieldError, FieldName, FieldValue, Record,
};
use std::fmt;
use std::sync::Arc;

type RulePredicate = Arc<dyn Fn(Option<&FieldValue>) -> bool + Send + Sync>;

/// A single declarative validation rule.
///
/// The predicate receives the field's current value (or `None` when unset)
/// and returns whether the draft passes. Predicates must be pure.
#[derive(Clone)]
pub struct Rule {
    /// Field the rule applies to
    pub field: FieldName,
    /// Message attached when the predicate fails
    pub message: String,
    predicate: RulePredicate,
}

impl Rule {
    /// Create a rule from a pure predicate.
    pub fn new<F>(field: impl Into<FieldName>, message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Option<&FieldValue>) -> bool + Send + Sync + 'static,
    {
        Self {
            field: field.into(),
            message: message.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluate the rule against a record.
    pub fn check(&self, record: &Record) -> Option<FieldError> {
        if (self.predicate)(record.field(&self.field)) {
            None
        } else {
            Some(FieldError::new(self.field.clone(), self.message.clone()))
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("field", &self.field)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// An ordered list of rules for one entity.
#[derive(Debug, Clone, Default)]
pub struct ValidationRules {
    rules: Vec<Rule>,
}

impl ValidationRules {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style method to append a rule.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Append a rule.
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the rule set is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Standard rules derived from a descriptor: required fields must be
    /// present (and, for text, non-empty); number fields must be finite and
    /// strictly positive when set.
    pub fn for_descriptor(descriptor: &RecordDescriptor) -> Self {
        let mut rules = Self::new();
        for def in &descriptor.fields {
            if def.required {
                rules.push(Rule::new(
                    def.name.clone(),
                    format!("{} is required", def.name),
                    |value| match value {
                        None => false,
                        Some(FieldValue::Text(s)) => !s.trim().is_empty(),
                        Some(_) => true,
                    },
                ));
            }
            if def.field_type == FieldType::Number {
                rules.push(Rule::new(
                    def.name.clone(),
                    format!("{} must be a positive amount", def.name),
                    |value| match value {
                        None => true, // presence is the required-rule's concern
                        Some(FieldValue::Number(n)) => n.is_finite() && *n > 0.0,
                        Some(_) => false,
                    },
                ));
            }
        }
        rules
    }

    /// Validate a record: fold every rule in order, collecting failures.
    pub fn validate(&self, record: &Record) -> Vec<FieldError> {
        self.rules
            .iter()
            .filter_map(|rule| rule.check(record))
            .collect()
    }
}

/// Whether a character may be appended to a monetary input buffer.
///
/// Digits always; a single decimal point; everything else (signs included,
/// amounts are unsigned by construction) is dropped at the keystroke.
pub fn amount_char_allowed(current: &str, ch: char) -> bool {
    ch.is_ascii_digit() || (ch == '.' && !current.contains('.'))
}

/// Filter raw typed text down to a valid monetary input buffer.
///
/// Each character is checked against the buffer built so far, mirroring
/// what per-keystroke filtering would have produced.
pub fn filter_numeric_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if amount_char_allowed(&out, ch) {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldDef;
    use crate::Status;

    fn expense_descriptor() -> RecordDescriptor {
        RecordDescriptor::new(
            "expense",
            vec![
                FieldDef::required("label", FieldType::Text),
                FieldDef::required("amount", FieldType::Number),
                FieldDef::optional("discount", FieldType::Number),
            ],
            vec![Status::new("PENDING"), Status::new("PAID")],
            Status::new("PENDING"),
        )
        .unwrap()
    }

    fn valid_record() -> Record {
        Record::new(1, Status::new("PENDING"))
            .with_field("label", FieldValue::Text("Team lunch".into()))
            .with_field("amount", FieldValue::Number(64.0))
    }

    #[test]
    fn valid_record_passes() {
        let rules = ValidationRules::for_descriptor(&expense_descriptor());
        assert!(rules.validate(&valid_record()).is_empty());
    }

    #[test]
    fn missing_required_field_fails() {
        let rules = ValidationRules::for_descriptor(&expense_descriptor());
        let mut record = valid_record();
        record.fields.remove("label");

        let errors = rules.validate(&record);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "label");
    }

    #[test]
    fn blank_required_text_fails() {
        let rules = ValidationRules::for_descriptor(&expense_descriptor());
        let mut record = valid_record();
        record.set_field("label", FieldValue::Text("   ".into()));

        let errors = rules.validate(&record);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "label");
    }

    #[test]
    fn non_positive_amount_fails() {
        let rules = ValidationRules::for_descriptor(&expense_descriptor());

        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let mut record = valid_record();
            record.set_field("amount", FieldValue::Number(bad));
            let errors = rules.validate(&record);
            assert_eq!(errors.len(), 1, "amount {bad} should fail");
            assert_eq!(errors[0].field, "amount");
        }
    }

    #[test]
    fn optional_number_unset_passes() {
        let rules = ValidationRules::for_descriptor(&expense_descriptor());
        // "discount" never set: positivity rule does not fire
        assert!(rules.validate(&valid_record()).is_empty());
    }

    #[test]
    fn errors_collected_in_rule_order() {
        let rules = ValidationRules::for_descriptor(&expense_descriptor());
        let record = Record::new(1, Status::new("PENDING"))
            .with_field("amount", FieldValue::Number(-1.0));

        let errors = rules.validate(&record);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "label");
        assert_eq!(errors[1].field, "amount");
    }

    #[test]
    fn custom_rule_appends() {
        let rules = ValidationRules::for_descriptor(&expense_descriptor()).with_rule(Rule::new(
            "amount",
            "amount must stay under 10000",
            |value| match value {
                Some(FieldValue::Number(n)) => *n < 10_000.0,
                _ => true,
            },
        ));

        let mut record = valid_record();
        record.set_field("amount", FieldValue::Number(25_000.0));

        let errors = rules.validate(&record);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "amount must stay under 10000");
    }

    #[test]
    fn char_filter_accepts_digits_and_one_point() {
        assert!(amount_char_allowed("", '1'));
        assert!(amount_char_allowed("12", '.'));
        assert!(!amount_char_allowed("12.5", '.'));
        assert!(!amount_char_allowed("", '-'));
        assert!(!amount_char_allowed("", 'a'));
    }

    #[test]
    fn filter_drops_invalid_characters() {
        assert_eq!(filter_numeric_text("abc"), "");
        assert_eq!(filter_numeric_text("-12.50"), "12.50");
        assert_eq!(filter_numeric_text("1.2.3"), "1.23");
        assert_eq!(filter_numeric_text("200"), "200");
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_validate_is_deterministic(amount in -1000.0f64..1000.0) {
                let rules = ValidationRules::for_descriptor(&expense_descriptor());
                let record = valid_record()
                    .with_field("amount", FieldValue::Number(amount));

                let first = rules.validate(&record);
                let second = rules.validate(&record);
                prop_assert_eq!(first, second);
            }

            #[test]
            fn prop_filtered_text_always_parses_or_is_empty(raw in "\\PC{0,24}") {
                let filtered = filter_numeric_text(&raw);
                if !filtered.is_empty() && filtered != "." {
                    prop_assert!(filtered.parse::<f64>().is_ok(), "{:?}", filtered);
                }
            }

            #[test]
            fn prop_filter_is_idempotent(raw in "\\PC{0,24}") {
                let once = filter_numeric_text(&raw);
                let twice = filter_numeric_text(&once);
                prop_assert_eq!(once, twice);
            }
        }
    }
}
