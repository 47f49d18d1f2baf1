//! The fixed set of dashboard metrics and their display formatting.
//!
//! Each refresh turns a raw source value into a display string such as
//! `"65 ms"`. History values are derived back out of that string, so the
//! formatting and [`parse_display_value`] must stay in step.

use crate::sources::types::{CategoryMetric, QuantityMetric, Unit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display value used when a metric has no data this cycle.
pub const NO_DATA: &str = "--";

/// One of the six dashboard metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Hrv,
    RestingHeartRate,
    Sleep,
    MindfulMinutes,
    Steps,
    ActiveEnergy,
}

/// How a metric is read from its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricQuery {
    /// Latest single quantity sample
    Latest { metric: QuantityMetric, unit: Unit },
    /// Sum of quantity samples since local midnight
    DailySum { metric: QuantityMetric, unit: Unit },
    /// Total duration of intervals since local midnight
    DailyDuration {
        metric: CategoryMetric,
        asleep_only: bool,
    },
}

impl MetricKind {
    /// All metrics, in dashboard order.
    pub const ALL: [MetricKind; 6] = [
        MetricKind::Hrv,
        MetricKind::RestingHeartRate,
        MetricKind::Sleep,
        MetricKind::MindfulMinutes,
        MetricKind::Steps,
        MetricKind::ActiveEnergy,
    ];

    /// Dashboard title.
    pub fn title(self) -> &'static str {
        match self {
            MetricKind::Hrv => "HRV",
            MetricKind::RestingHeartRate => "Resting HR",
            MetricKind::Sleep => "Sleep",
            MetricKind::MindfulMinutes => "Mindful Minutes",
            MetricKind::Steps => "Steps",
            MetricKind::ActiveEnergy => "Active Energy",
        }
    }

    /// Look a metric up by its dashboard title.
    pub fn from_title(title: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.title() == title)
    }

    /// Whether this metric's history survives restarts.
    pub fn is_persisted(self) -> bool {
        self == MetricKind::Hrv
    }

    pub fn query(self) -> MetricQuery {
        match self {
            MetricKind::Hrv => MetricQuery::Latest {
                metric: QuantityMetric::HeartRateVariability,
                unit: Unit::Seconds,
            },
            MetricKind::RestingHeartRate => MetricQuery::Latest {
                metric: QuantityMetric::RestingHeartRate,
                unit: Unit::BeatsPerMinute,
            },
            MetricKind::Sleep => MetricQuery::DailyDuration {
                metric: CategoryMetric::SleepAnalysis,
                asleep_only: true,
            },
            MetricKind::MindfulMinutes => MetricQuery::DailyDuration {
                metric: CategoryMetric::MindfulSession,
                asleep_only: false,
            },
            MetricKind::Steps => MetricQuery::DailySum {
                metric: QuantityMetric::StepCount,
                unit: Unit::Count,
            },
            MetricKind::ActiveEnergy => MetricQuery::DailySum {
                metric: QuantityMetric::ActiveEnergyBurned,
                unit: Unit::Kilocalories,
            },
        }
    }

    /// Format a raw value into its display string.
    ///
    /// `value` is in the unit the metric is queried in: seconds for HRV,
    /// hours for sleep, minutes for mindful minutes.
    pub fn format(self, value: f64) -> String {
        match self {
            MetricKind::Hrv => format!("{} ms", (value * 1000.0).round() as i64),
            MetricKind::RestingHeartRate => format!("{} bpm", value.round() as i64),
            MetricKind::Sleep => format!("{value:.1} h"),
            MetricKind::MindfulMinutes => format!("{} min", value.round() as i64),
            MetricKind::Steps => format!("{}", value.round() as i64),
            MetricKind::ActiveEnergy => format!("{} kcal", value.round() as i64),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    /// Accepts the dashboard title or a short CLI name (`hrv`, `resting-hr`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(kind) = Self::from_title(s) {
            return Ok(kind);
        }

        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "hrv" => Ok(MetricKind::Hrv),
            "resting-hr" | "resting-heart-rate" | "rhr" => Ok(MetricKind::RestingHeartRate),
            "sleep" => Ok(MetricKind::Sleep),
            "mindful" | "mindful-minutes" => Ok(MetricKind::MindfulMinutes),
            "steps" => Ok(MetricKind::Steps),
            "energy" | "active-energy" => Ok(MetricKind::ActiveEnergy),
            other => Err(format!("unknown metric '{other}'")),
        }
    }
}

/// One displayed reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub title: String,
    pub display_value: String,
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    pub fn new(
        title: impl Into<String>,
        display_value: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            display_value: display_value.into(),
            timestamp,
        }
    }

    /// A sentinel reading for `kind`.
    pub fn no_data(kind: MetricKind, timestamp: DateTime<Utc>) -> Self {
        Self::new(kind.title(), NO_DATA, timestamp)
    }

    /// The metric this sample belongs to, if it is one of the six.
    pub fn kind(&self) -> Option<MetricKind> {
        MetricKind::from_title(&self.title)
    }

    pub fn has_data(&self) -> bool {
        self.display_value != NO_DATA
    }
}

/// Recover the numeric value from a display string.
///
/// Keeps only ASCII digits and `.` and parses the rest. Returns `None` for
/// the sentinel and anything that does not parse to a finite number.
pub fn parse_display_value(display: &str) -> Option<f64> {
    if display.trim() == NO_DATA {
        return None;
    }

    let numeric: String = display
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if numeric.is_empty() {
        return None;
    }

    numeric.parse::<f64>().ok().filter(|v| v.is_finite())
}
