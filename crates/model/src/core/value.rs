use crate::core::data_type::DataType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

/// Fixed textual form used for TIMESTAMP columns in payloads and cursor literals.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f UTC";

/// A single warehouse cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Int(i64),
    /// NaN and the infinities serialize as `"NaN"`, `"inf"` and `"-inf"`.
    Float(#[serde(with = "float_repr")] f64),
    /// NUMERIC / BIGNUMERIC, kept in their exact decimal text.
    Numeric(String),
    String(String),
    Boolean(bool),
    Json(serde_json::Value),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<Utc>),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Numeric(_))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) => Some(*v as i64),
            Value::Numeric(v) | Value::String(v) => v.parse::<i64>().ok(),
            Value::Boolean(v) => Some(i64::from(*v)),
            Value::Json(v) => v.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Numeric(v) | Value::String(v) => v.parse::<f64>().ok(),
            Value::Json(v) => v.as_f64(),
            _ => None,
        }
    }

    /// Textual form of the value; `None` for NULL.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::String(v) | Value::Numeric(v) => Some(v.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Int(a), Float(b)) => (*a as f64).partial_cmp(b),
            (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)),
            (Numeric(_), _) | (_, Numeric(_)) => self.as_f64()?.partial_cmp(&other.as_f64()?),
            (String(a), String(b)) => Some(a.cmp(b)),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            (DateTime(a), DateTime(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (Null, Null) => Some(Ordering::Equal),
            _ => None,
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Numeric(_) => DataType::Numeric,
            Value::String(_) => DataType::String,
            Value::Boolean(_) => DataType::Boolean,
            Value::Json(_) => DataType::Json,
            Value::Date(_) => DataType::Date,
            Value::Time(_) => DataType::Time,
            Value::DateTime(_) => DataType::DateTime,
            Value::Timestamp(_) => DataType::Timestamp,
            Value::Null => DataType::Custom("NULL".to_string()),
        }
    }

    /// Plain JSON rendering used for record payloads.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Boolean(v) => serde_json::Value::Bool(*v),
            Value::Json(v) => v.clone(),
            Value::Null => serde_json::Value::Null,
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Numeric(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Json(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::Time(v) => write!(f, "{}", v.format("%H:%M:%S%.f")),
            Value::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::Timestamp(v) => write!(f, "{}", v.format(TIMESTAMP_FORMAT)),
            Value::Null => write!(f, "NULL"),
        }
    }
}

/// JSON has no literal for non-finite floats; they travel as strings.
mod float_repr {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(v: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if v.is_nan() {
            serializer.serialize_str("NaN")
        } else if v.is_infinite() {
            serializer.serialize_str(if *v > 0.0 { "inf" } else { "-inf" })
        } else {
            serializer.serialize_f64(*v)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(t) => match t.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid float `{other}`"))),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldValue {
    pub name: String,
    pub value: Value,
    pub data_type: DataType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_renders_in_fixed_form() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(
            Value::Timestamp(ts).to_string(),
            "2024-03-01 12:30:05.000000 UTC"
        );
    }

    #[test]
    fn compares_mixed_numerics() {
        assert_eq!(
            Value::Int(3).compare(&Value::Float(2.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Numeric("10.5".into()).compare(&Value::Int(11)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::String("a".into()).compare(&Value::Int(1)), None);
    }

    #[test]
    fn non_finite_floats_survive_json() {
        for v in [f64::INFINITY, f64::NEG_INFINITY, 1.5] {
            let json = serde_json::to_string(&Value::Float(v)).unwrap();
            let back: Value = serde_json::from_str(&json).unwrap();
            assert_eq!(back, Value::Float(v));
        }
        let json = serde_json::to_string(&Value::Float(f64::NAN)).unwrap();
        assert_eq!(json, r#"{"Float":"NaN"}"#);
        match serde_json::from_str::<Value>(&json).unwrap() {
            Value::Float(v) => assert!(v.is_nan()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn payload_json_keeps_numbers_native() {
        assert_eq!(Value::Int(7).to_json(), serde_json::json!(7));
        assert_eq!(Value::Boolean(true).to_json(), serde_json::json!(true));
        assert_eq!(
            Value::Numeric("1.10".into()).to_json(),
            serde_json::json!("1.10")
        );
        assert_eq!(Value::Null.to_json(), serde_json::Value::Null);
    }
}
