use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::NormalizeWarning;
use crate::models::{DurationSpec, NOT_SPECIFIED, StepId};

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number pattern"));
static RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*[-–]\s*(\d+(?:\.\d+)?)").expect("range pattern")
});
static PARENTHESIZED_HOURS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((\d+(?:\.\d+)?)\s*h\)").expect("parenthesized hours pattern")
});

const NUMBER_WORDS: [(&str, &str); 12] = [
    ("one", "1"),
    ("two", "2"),
    ("three", "3"),
    ("four", "4"),
    ("five", "5"),
    ("six", "6"),
    ("seven", "7"),
    ("eight", "8"),
    ("nine", "9"),
    ("ten", "10"),
    ("eleven", "11"),
    ("twelve", "12"),
];

/// Configuration for Stage 3 duration resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationConfig {
    /// Hours assigned when the duration cannot be resolved
    pub fallback_hours: f64,
    /// Floor applied to `layout_hours`; `None` disables the clamp
    pub min_layout_hours: Option<f64>,
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            fallback_hours: 35.0,
            min_layout_hours: Some(35.0),
        }
    }
}

/// Unit implied by the duration text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Week,
    Day,
    Hour,
}

impl DurationUnit {
    /// First match wins: "week" before "day", hours otherwise
    pub fn detect(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("week") {
            DurationUnit::Week
        } else if lower.contains("day") {
            DurationUnit::Day
        } else {
            DurationUnit::Hour
        }
    }

    pub fn hours_factor(self) -> f64 {
        match self {
            DurationUnit::Week => 7.0 * 24.0,
            DurationUnit::Day => 24.0,
            DurationUnit::Hour => 1.0,
        }
    }

    fn word(self) -> &'static str {
        match self {
            DurationUnit::Week => "week",
            DurationUnit::Day => "day",
            DurationUnit::Hour => "hour",
        }
    }
}

/// Replace `one`..`twelve` with digits; other words are left alone
pub fn number_words_to_digits(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            NUMBER_WORDS
                .iter()
                .find(|(name, _)| *name == lower)
                .map_or(word, |(_, digits)| *digits)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rewrite integer ranges as a span length: `"days 3-5"` -> `"days 3 days"`
///
/// A range that is reversed, fractional or too large to count is left as
/// written.
pub fn collapse_ranges(text: &str, unit: DurationUnit) -> String {
    RANGE
        .replace_all(text, |caps: &Captures| {
            let span = match (caps[1].parse::<u64>(), caps[2].parse::<u64>()) {
                (Ok(first), Ok(last)) => last.checked_sub(first).and_then(|d| d.checked_add(1)),
                _ => None,
            };
            match span {
                Some(span) => {
                    let plural = if span > 1 { "s" } else { "" };
                    format!("{} {}{}", span, unit.word(), plural)
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Whether a range in the text names a span rather than two estimates
///
/// Day and week ranges always do. Hour ranges only when the text leads
/// with a word (`"hours 24-48"`); `"24-48 hours"` is averaged.
fn range_is_span(text: &str, unit: DurationUnit) -> bool {
    if !RANGE.is_match(text) {
        return false;
    }
    match unit {
        DurationUnit::Week | DurationUnit::Day => true,
        DurationUnit::Hour => text.chars().next().is_some_and(char::is_alphabetic),
    }
}

fn extract_numbers(text: &str) -> Vec<f64> {
    NUMBER
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

fn parenthesized_hours(text: &str) -> Option<f64> {
    PARENTHESIZED_HOURS
        .captures(text)
        .and_then(|caps| caps[1].parse::<f64>().ok())
}

/// Put the unit on its own line: `"48 hours"` -> `"48\nhours"`
fn format_label(label: &str) -> String {
    if label.to_lowercase().contains("hours") {
        label.replace(" hours", "\nhours")
    } else {
        format!("{}\nhours", label)
    }
}

fn unspecified(config: &DurationConfig) -> DurationSpec {
    DurationSpec {
        hours: config.fallback_hours,
        layout_hours: apply_floor(config.fallback_hours, config),
        label: NOT_SPECIFIED.to_string(),
        specified: false,
    }
}

fn apply_floor(hours: f64, config: &DurationConfig) -> f64 {
    match config.min_layout_hours {
        Some(floor) if hours < floor => floor,
        _ => hours,
    }
}

/// Perform Stage 3 for one step: resolve free-text duration to hours
///
/// Blank text, `"0"`, and text without digits resolve to the configured
/// fallback labelled "Not specified". Several numbers are averaged,
/// except that three or more numbers with an `(Nh)` group resolve to `N`
/// hours.
pub fn resolve_duration(text: Option<&str>, config: &DurationConfig) -> DurationSpec {
    let raw = text.map(str::trim).unwrap_or_default();
    if raw.is_empty() || raw == "0" {
        return unspecified(config);
    }

    let converted = number_words_to_digits(raw);
    let unit = DurationUnit::detect(&converted);
    let collapsed = range_is_span(&converted, unit);
    let working = if collapsed {
        collapse_ranges(&converted.to_lowercase(), unit)
    } else {
        converted.clone()
    };

    let numbers = extract_numbers(&working);
    if numbers.is_empty() {
        return unspecified(config);
    }

    let explicit_hours = if numbers.len() > 2 {
        parenthesized_hours(&working)
    } else {
        None
    };

    let hours = match explicit_hours {
        Some(hours) => hours,
        None => numbers.iter().sum::<f64>() / numbers.len() as f64 * unit.hours_factor(),
    };

    if !hours.is_finite() || hours < 0.0 {
        return unspecified(config);
    }

    let label = match unit {
        DurationUnit::Hour if !collapsed => converted,
        _ => format!("{} hours", hours.trunc() as i64),
    };

    DurationSpec {
        hours,
        layout_hours: apply_floor(hours, config),
        label: format_label(&label),
        specified: true,
    }
}

/// Resolve one step's duration, flagging text that held no usable number
pub fn resolve_step_duration(
    step: StepId,
    text: Option<&str>,
    config: &DurationConfig,
) -> (DurationSpec, Option<NormalizeWarning>) {
    let spec = resolve_duration(text, config);
    let raw = text.map(str::trim).unwrap_or_default();

    let warning = if !spec.specified && !raw.is_empty() && raw != "0" {
        debug!("Step {}: falling back for duration {:?}", step, raw);
        Some(NormalizeWarning::UnresolvableDuration {
            step,
            text: raw.to_string(),
        })
    } else {
        None
    };

    (spec, warning)
}
