//! Exit Rules
//!
//! Named, prioritized, conjunctive condition sets mapped to an action.
//! Rules are parsed from configuration once at startup; a malformed rule is
//! a fatal configuration error since exit behavior cannot be safely guessed.

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RuleError {
    #[error("Unknown condition field: {0}")]
    UnknownField(String),
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("Malformed comparator expression '{0}' (expected e.g. \">= 5\")")]
    MalformedComparator(String),
    #[error("Rule '{0}' has no conditions")]
    EmptyConditions(String),
}

/// Fields a condition can test. Thresholds use the same units as the field:
/// percentage points for gain, raw seconds for hold time, multiplier ratio
/// for volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionField {
    PriceGainPct,
    HoldTimeSecs,
    VolumeRatio,
}

impl ConditionField {
    fn parse(name: &str) -> Result<Self, RuleError> {
        match name {
            "price_gain_pct" => Ok(ConditionField::PriceGainPct),
            "hold_time_secs" => Ok(ConditionField::HoldTimeSecs),
            "volume_ratio" => Ok(ConditionField::VolumeRatio),
            other => Err(RuleError::UnknownField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Ge,
    Le,
    Gt,
    Lt,
}

impl Comparator {
    fn apply(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::Ge => value >= threshold,
            Comparator::Le => value <= threshold,
            Comparator::Gt => value > threshold,
            Comparator::Lt => value < threshold,
        }
    }
}

/// One field test, e.g. `price_gain_pct >= 15`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: ConditionField,
    pub comparator: Comparator,
    pub threshold: f64,
}

impl Condition {
    /// Parse a condition from a field name and a comparator expression such
    /// as `">= 5"` or `"< 2.5"`. Two-character operators are tried first so
    /// `">="` never parses as `">"` with a leading `=` in the number.
    pub fn parse(field: &str, expr: &str) -> Result<Self, RuleError> {
        let field = ConditionField::parse(field)?;
        let trimmed = expr.trim();

        let (comparator, rest) = if let Some(rest) = trimmed.strip_prefix(">=") {
            (Comparator::Ge, rest)
        } else if let Some(rest) = trimmed.strip_prefix("<=") {
            (Comparator::Le, rest)
        } else if let Some(rest) = trimmed.strip_prefix('>') {
            (Comparator::Gt, rest)
        } else if let Some(rest) = trimmed.strip_prefix('<') {
            (Comparator::Lt, rest)
        } else {
            return Err(RuleError::MalformedComparator(expr.to_string()));
        };

        let threshold: f64 = rest
            .trim()
            .parse()
            .map_err(|_| RuleError::MalformedComparator(expr.to_string()))?;

        Ok(Self {
            field,
            comparator,
            threshold,
        })
    }

    pub fn holds(&self, metrics: &ExitMetrics) -> bool {
        let value = match self.field {
            ConditionField::PriceGainPct => metrics.price_gain_pct,
            ConditionField::HoldTimeSecs => metrics.hold_time_secs,
            ConditionField::VolumeRatio => metrics.volume_ratio,
        };
        self.comparator.apply(value, self.threshold)
    }
}

/// Live position state a rule is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct ExitMetrics {
    pub price_gain_pct: f64,
    pub hold_time_secs: f64,
    pub volume_ratio: f64,
}

/// What a fired rule does with the position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    /// Sell the entire held quantity
    ExitFull,
    /// Sell half of the held quantity
    ExitHalf,
}

impl RuleAction {
    fn parse(name: &str) -> Result<Self, RuleError> {
        match name {
            "exit_full" => Ok(RuleAction::ExitFull),
            "exit_half" => Ok(RuleAction::ExitHalf),
            other => Err(RuleError::UnknownAction(other.to_string())),
        }
    }
}

/// A named, prioritized exit rule. Conditions are conjunctive: the rule
/// fires only when every condition holds.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub priority: i32,
    pub conditions: Vec<Condition>,
    pub action: RuleAction,
}

impl Rule {
    pub fn matches(&self, metrics: &ExitMetrics) -> bool {
        self.conditions.iter().all(|c| c.holds(metrics))
    }
}

/// Raw rule record as it appears in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub priority: i32,
    /// field name -> comparator expression, e.g. price_gain_pct = ">= 15".
    /// BTreeMap keeps condition order stable for reproducible logs.
    pub conditions: BTreeMap<String, String>,
    pub action: String,
}

impl RuleSpec {
    pub fn compile(&self) -> Result<Rule, RuleError> {
        if self.conditions.is_empty() {
            return Err(RuleError::EmptyConditions(self.name.clone()));
        }
        let conditions = self
            .conditions
            .iter()
            .map(|(field, expr)| Condition::parse(field, expr))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Rule {
            name: self.name.clone(),
            priority: self.priority,
            conditions,
            action: RuleAction::parse(&self.action)?,
        })
    }
}

/// Compile and sort rule specs ascending by priority. The sort is stable so
/// equal priorities keep declaration order.
pub fn compile_rules(specs: &[RuleSpec]) -> Result<Vec<Rule>, RuleError> {
    let mut rules = specs
        .iter()
        .map(RuleSpec::compile)
        .collect::<Result<Vec<_>, _>>()?;
    rules.sort_by_key(|r| r.priority);
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(gain: f64, held: f64, volume: f64) -> ExitMetrics {
        ExitMetrics {
            price_gain_pct: gain,
            hold_time_secs: held,
            volume_ratio: volume,
        }
    }

    #[test]
    fn test_parse_condition_operators() {
        let c = Condition::parse("price_gain_pct", ">= 15").unwrap();
        assert_eq!(c.comparator, Comparator::Ge);
        assert_eq!(c.threshold, 15.0);

        let c = Condition::parse("hold_time_secs", "<= 5").unwrap();
        assert_eq!(c.comparator, Comparator::Le);

        let c = Condition::parse("volume_ratio", "> 2.5").unwrap();
        assert_eq!(c.comparator, Comparator::Gt);
        assert_eq!(c.threshold, 2.5);

        let c = Condition::parse("price_gain_pct", "<-3.5").unwrap();
        assert_eq!(c.comparator, Comparator::Lt);
        assert_eq!(c.threshold, -3.5);
    }

    #[test]
    fn test_parse_condition_errors() {
        assert_eq!(
            Condition::parse("bogus_field", ">= 1"),
            Err(RuleError::UnknownField("bogus_field".to_string()))
        );
        assert!(matches!(
            Condition::parse("price_gain_pct", "== 1"),
            Err(RuleError::MalformedComparator(_))
        ));
        assert!(matches!(
            Condition::parse("price_gain_pct", ">= abc"),
            Err(RuleError::MalformedComparator(_))
        ));
    }

    #[test]
    fn test_fractional_thresholds() {
        let c = Condition::parse("price_gain_pct", ">= 0.5").unwrap();
        assert!(c.holds(&metrics(0.5, 0.0, 0.0)));
        assert!(!c.holds(&metrics(0.49, 0.0, 0.0)));
    }

    #[test]
    fn test_conjunctive_conditions() {
        let rule = Rule {
            name: "fast-exit".to_string(),
            priority: 1,
            conditions: vec![
                Condition::parse("price_gain_pct", ">= 15").unwrap(),
                Condition::parse("hold_time_secs", "<= 5").unwrap(),
            ],
            action: RuleAction::ExitFull,
        };

        assert!(rule.matches(&metrics(20.0, 4.0, 1.0)));
        // Flip either condition to false: rule must not fire
        assert!(!rule.matches(&metrics(10.0, 4.0, 1.0)));
        assert!(!rule.matches(&metrics(20.0, 6.0, 1.0)));
    }

    #[test]
    fn test_compile_rules_sorted_stable() {
        let specs = vec![
            RuleSpec {
                name: "b".to_string(),
                priority: 2,
                conditions: BTreeMap::from([("price_gain_pct".to_string(), ">= 5".to_string())]),
                action: "exit_half".to_string(),
            },
            RuleSpec {
                name: "a".to_string(),
                priority: 1,
                conditions: BTreeMap::from([("price_gain_pct".to_string(), ">= 15".to_string())]),
                action: "exit_full".to_string(),
            },
            RuleSpec {
                name: "c".to_string(),
                priority: 2,
                conditions: BTreeMap::from([("hold_time_secs".to_string(), ">= 16".to_string())]),
                action: "exit_full".to_string(),
            },
        ];

        let rules = compile_rules(&specs).unwrap();
        let names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
        // Ascending priority, declaration order preserved on ties
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_compile_rejects_empty_conditions() {
        let spec = RuleSpec {
            name: "empty".to_string(),
            priority: 1,
            conditions: BTreeMap::new(),
            action: "exit_full".to_string(),
        };
        assert!(matches!(spec.compile(), Err(RuleError::EmptyConditions(_))));
    }

    #[test]
    fn test_compile_rejects_unknown_action() {
        let spec = RuleSpec {
            name: "bad".to_string(),
            priority: 1,
            conditions: BTreeMap::from([("price_gain_pct".to_string(), ">= 5".to_string())]),
            action: "moon".to_string(),
        };
        assert!(matches!(spec.compile(), Err(RuleError::UnknownAction(_))));
    }
}
