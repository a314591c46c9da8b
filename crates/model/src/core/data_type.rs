use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, collections::HashMap, fmt};

/// Column types as reported by the warehouse schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Float,
    Numeric,
    BigNumeric,
    Boolean,
    String,
    Bytes,
    Date,
    Time,
    DateTime,
    Timestamp,
    Interval,
    Geography,
    Json,
    Record,
    Custom(String),
}

lazy_static! {
    static ref BIGQUERY_TYPE_MAP: HashMap<&'static str, DataType> = build_bigquery_type_map();
}

impl DataType {
    /// Resolves a schema type name (legacy or standard SQL spelling).
    /// Unknown names are kept as `Custom` so new warehouse types never fail a read.
    pub fn from_bigquery_type(type_name: &str) -> Self {
        let normalized = type_name.trim().to_ascii_uppercase();
        BIGQUERY_TYPE_MAP
            .get(normalized.as_str())
            .cloned()
            .unwrap_or(DataType::Custom(normalized))
    }

    pub fn bigquery_name(&self) -> Cow<'_, str> {
        match self {
            DataType::Integer => Cow::Borrowed("INT64"),
            DataType::Float => Cow::Borrowed("FLOAT64"),
            DataType::Numeric => Cow::Borrowed("NUMERIC"),
            DataType::BigNumeric => Cow::Borrowed("BIGNUMERIC"),
            DataType::Boolean => Cow::Borrowed("BOOL"),
            DataType::String => Cow::Borrowed("STRING"),
            DataType::Bytes => Cow::Borrowed("BYTES"),
            DataType::Date => Cow::Borrowed("DATE"),
            DataType::Time => Cow::Borrowed("TIME"),
            DataType::DateTime => Cow::Borrowed("DATETIME"),
            DataType::Timestamp => Cow::Borrowed("TIMESTAMP"),
            DataType::Interval => Cow::Borrowed("INTERVAL"),
            DataType::Geography => Cow::Borrowed("GEOGRAPHY"),
            DataType::Json => Cow::Borrowed("JSON"),
            DataType::Record => Cow::Borrowed("STRUCT"),
            DataType::Custom(name) => Cow::Owned(name.clone()),
        }
    }

    /// Numeric columns are compared unquoted in cursor predicates.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Integer | DataType::Float | DataType::Numeric | DataType::BigNumeric
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            DataType::Date | DataType::Time | DataType::DateTime | DataType::Timestamp
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bigquery_name())
    }
}

fn build_bigquery_type_map() -> HashMap<&'static str, DataType> {
    HashMap::from([
        ("INTEGER", DataType::Integer),
        ("INT64", DataType::Integer),
        ("FLOAT", DataType::Float),
        ("FLOAT64", DataType::Float),
        ("NUMERIC", DataType::Numeric),
        ("DECIMAL", DataType::Numeric),
        ("BIGNUMERIC", DataType::BigNumeric),
        ("BIGDECIMAL", DataType::BigNumeric),
        ("BOOLEAN", DataType::Boolean),
        ("BOOL", DataType::Boolean),
        ("STRING", DataType::String),
        ("BYTES", DataType::Bytes),
        ("DATE", DataType::Date),
        ("TIME", DataType::Time),
        ("DATETIME", DataType::DateTime),
        ("TIMESTAMP", DataType::Timestamp),
        ("INTERVAL", DataType::Interval),
        ("GEOGRAPHY", DataType::Geography),
        ("JSON", DataType::Json),
        ("RECORD", DataType::Record),
        ("STRUCT", DataType::Record),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_legacy_and_standard_names() {
        assert_eq!(DataType::from_bigquery_type("INTEGER"), DataType::Integer);
        assert_eq!(DataType::from_bigquery_type("int64"), DataType::Integer);
        assert_eq!(DataType::from_bigquery_type("RECORD"), DataType::Record);
        assert_eq!(
            DataType::from_bigquery_type("RANGE"),
            DataType::Custom("RANGE".to_string())
        );
    }

    #[test]
    fn numeric_and_temporal_classes() {
        assert!(DataType::BigNumeric.is_numeric());
        assert!(!DataType::Timestamp.is_numeric());
        assert!(DataType::Timestamp.is_temporal());
        assert!(!DataType::String.is_temporal());
    }
}
