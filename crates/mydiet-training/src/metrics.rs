use crate::error::MetricsError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Open-ended mapping from metric name to value.
///
/// The trainer owns the shape of this payload; the gateway only guarantees
/// that every leaf is a number or a string.
pub type MetricsMap = BTreeMap<String, MetricValue>;

/// A single metric value reported by the trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum MetricValue {
    Number(f64),
    Text(String),
    Map(MetricsMap),
}

impl MetricValue {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&MetricsMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl TryFrom<Value> for MetricValue {
    type Error = MetricsError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Number(n) => n.as_f64().map(Self::Number).ok_or(MetricsError::UnsupportedValue("number")),
            Value::String(s) => Ok(Self::Text(s)),
            Value::Object(map) => map
                .into_iter()
                .map(|(key, value)| Self::try_from(value).map(|v| (key, v)))
                .collect::<Result<MetricsMap, _>>()
                .map(Self::Map),
            Value::Null => Err(MetricsError::UnsupportedValue("null")),
            Value::Bool(_) => Err(MetricsError::UnsupportedValue("boolean")),
            Value::Array(_) => Err(MetricsError::UnsupportedValue("array")),
        }
    }
}

impl From<MetricValue> for Value {
    fn from(value: MetricValue) -> Self {
        match value {
            MetricValue::Number(n) => serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number),
            MetricValue::Text(s) => Value::String(s),
            MetricValue::Map(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<MetricsMap> for MetricValue {
    fn from(value: MetricsMap) -> Self {
        Self::Map(value)
    }
}

/// One persisted snapshot of a completed training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub id: i64,
    pub metrics: MetricsMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_versions: Option<MetricsMap>,
    pub trained_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_files: Option<MetricsMap>,
}

/// A training run as reported by the trainer, before the store assigns an id.
///
/// `trained_at` defaults to the time of insertion when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMetricsRecord {
    pub metrics: MetricsMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_versions: Option<MetricsMap>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub trained_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_files: Option<MetricsMap>,
}

impl NewMetricsRecord {
    #[must_use]
    pub fn new(metrics: MetricsMap) -> Self {
        Self { metrics, model_versions: None, trained_at: None, dataset_files: None }
    }

    #[must_use]
    pub fn trained_at(mut self, trained_at: DateTime<Utc>) -> Self {
        self.trained_at = Some(trained_at);
        self
    }
}

/// Parses the timestamp formats the trainer is known to emit.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.f]` (read as UTC) and a bare
/// `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, MetricsError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Some(naive) =
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc());
    }
    Err(MetricsError::InvalidTimestamp(raw.to_string()))
}

fn deserialize_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_timestamp(&s).map_err(serde::de::Error::custom)).transpose()
}
