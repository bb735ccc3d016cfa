//! Threshold rules that turn metrics into findings.
//!
//! The rules form an ordered table. Each rule looks at one metric, appends at
//! most one finding and never suppresses a later rule, so the output order is
//! the table order.

use crate::{
    config::AnalysisConfig,
    metrics::{MetricValue, Metrics},
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Normal,
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn needs_follow_up(self) -> bool {
        matches!(self, Severity::Warning | Severity::Critical)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub condition: String,
    pub severity: Severity,
}

impl Finding {
    pub fn new(condition: impl Into<String>, severity: Severity) -> Self {
        Self {
            condition: condition.into(),
            severity,
        }
    }
}

/// Which metric a rule reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSelector {
    HeartRate,
    PrInterval,
    QtInterval,
    /// Population RR standard deviation in seconds.
    RrStd,
}

impl MetricSelector {
    pub fn read(self, metrics: &Metrics) -> MetricValue {
        match self {
            MetricSelector::HeartRate => metrics.heart_rate_bpm,
            MetricSelector::PrInterval => metrics.pr_ms,
            MetricSelector::QtInterval => metrics.qt_ms,
            MetricSelector::RrStd => metrics.rr_std_s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Predicate {
    Unavailable,
    Above(f64),
    Below(f64),
    /// Inclusive on both ends.
    Within(f64, f64),
}

impl Predicate {
    pub fn matches(self, value: MetricValue) -> bool {
        match (self, value) {
            (Predicate::Unavailable, MetricValue::Unavailable) => true,
            (Predicate::Above(limit), MetricValue::Available(v)) => v > limit,
            (Predicate::Below(limit), MetricValue::Available(v)) => v < limit,
            (Predicate::Within(lo, hi), MetricValue::Available(v)) => v >= lo && v <= hi,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub metric: MetricSelector,
    pub predicate: Predicate,
    pub condition: &'static str,
    pub severity: Severity,
}

impl Rule {
    const fn new(
        metric: MetricSelector,
        predicate: Predicate,
        condition: &'static str,
        severity: Severity,
    ) -> Self {
        Self {
            metric,
            predicate,
            condition,
            severity,
        }
    }

    pub fn evaluate(&self, metrics: &Metrics) -> Option<Finding> {
        self.predicate
            .matches(self.metric.read(metrics))
            .then(|| Finding::new(self.condition, self.severity))
    }
}

/// The rule table, in evaluation order, with thresholds taken from `cfg`.
pub fn rule_table(cfg: &AnalysisConfig) -> Vec<Rule> {
    use MetricSelector::*;
    use Predicate::*;
    vec![
        Rule::new(HeartRate, Unavailable, "heart rate not available", Severity::Info),
        Rule::new(HeartRate, Above(cfg.tachycardia_bpm), "tachycardia", Severity::Warning),
        Rule::new(HeartRate, Below(cfg.bradycardia_bpm), "bradycardia", Severity::Warning),
        Rule::new(
            HeartRate,
            Within(cfg.bradycardia_bpm, cfg.tachycardia_bpm),
            "normal sinus rhythm",
            Severity::Normal,
        ),
        Rule::new(PrInterval, Unavailable, "PR interval not available", Severity::Info),
        Rule::new(PrInterval, Above(cfg.pr_high_ms), "possible AV block", Severity::Warning),
        Rule::new(PrInterval, Below(cfg.pr_low_ms), "short PR", Severity::Info),
        Rule::new(QtInterval, Unavailable, "QT interval not available", Severity::Info),
        Rule::new(
            QtInterval,
            Above(cfg.qt_high_ms),
            "prolonged QT (arrhythmia risk)",
            Severity::Critical,
        ),
        Rule::new(QtInterval, Below(cfg.qt_low_ms), "short QT", Severity::Info),
        Rule::new(
            RrStd,
            Above(cfg.rr_std_threshold_s),
            "increased RR variability (possible arrhythmia)",
            Severity::Warning,
        ),
    ]
}

/// Apply the rule table with thresholds from `cfg`.
pub fn interpret_with(metrics: &Metrics, cfg: &AnalysisConfig) -> Vec<Finding> {
    rule_table(cfg)
        .iter()
        .filter_map(|rule| rule.evaluate(metrics))
        .collect()
}

/// Apply the rule table with default thresholds.
pub fn interpret(metrics: &Metrics) -> Vec<Finding> {
    interpret_with(metrics, &AnalysisConfig::default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    FollowUp,
    WithinNormalRange,
}

impl Recommendation {
    pub fn message(self) -> &'static str {
        match self {
            Recommendation::FollowUp => {
                "Findings outside the normal range; clinical follow-up is recommended."
            }
            Recommendation::WithinNormalRange => "Results appear within normal range.",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

pub fn recommend(findings: &[Finding]) -> Recommendation {
    if findings.iter().any(|f| f.severity.needs_follow_up()) {
        Recommendation::FollowUp
    } else {
        Recommendation::WithinNormalRange
    }
}
