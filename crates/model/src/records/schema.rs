use crate::core::data_type::DataType;
use serde::{Deserialize, Serialize};

/// One column of a query result schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    /// REPEATED columns arrive as arrays and are kept as JSON.
    #[serde(default)]
    pub repeated: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            repeated: false,
        }
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }
}

/// Ordered column list of a result set.
pub type Schema = Vec<Field>;
