use serde::Serialize;

pub const SERVICE_ACCOUNT: &str = "serviceAccount";
pub const PROJECT_ID: &str = "projectID";
pub const DATASET_ID: &str = "datasetID";
pub const TABLE_ID: &str = "tableID";
pub const INCREMENT_COLUMN: &str = "incrementingColumnName";
pub const PRIMARY_KEY_COLUMN: &str = "primaryKeyColName";
pub const ORDER_BY: &str = "orderBy";
pub const POLLING_TIME: &str = "pollingTime";
pub const DATASET_LOCATION: &str = "datasetLocation";

/// One configuration parameter as declared to the host.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Parameter {
    pub name: &'static str,
    pub required: bool,
    pub default: &'static str,
    pub description: &'static str,
}

pub const PARAMETERS: &[Parameter] = &[
    Parameter {
        name: SERVICE_ACCOUNT,
        required: true,
        default: "",
        description: "Path to the service account JSON key file.",
    },
    Parameter {
        name: PROJECT_ID,
        required: true,
        default: "",
        description: "Google Cloud project ID.",
    },
    Parameter {
        name: DATASET_ID,
        required: true,
        default: "",
        description: "BigQuery dataset ID.",
    },
    Parameter {
        name: TABLE_ID,
        required: false,
        default: "",
        description: "Comma separated table IDs. Empty or `*` syncs every table in the dataset.",
    },
    Parameter {
        name: INCREMENT_COLUMN,
        required: false,
        default: "",
        description: "Column whose increasing values drive incremental reads.",
    },
    Parameter {
        name: PRIMARY_KEY_COLUMN,
        required: false,
        default: "",
        description: "Column used as the record key.",
    },
    Parameter {
        name: ORDER_BY,
        required: false,
        default: "",
        description: "Explicit ordering for offset reads, as `table:column,table2:column2`.",
    },
    Parameter {
        name: POLLING_TIME,
        required: false,
        default: "5m",
        description: "Interval between sync cycles, e.g. `30s`, `5m`, `1h30m`.",
    },
    Parameter {
        name: DATASET_LOCATION,
        required: false,
        default: "",
        description: "Location of the dataset, e.g. `US` or `europe-west1`.",
    },
];

pub fn parameter(name: &str) -> Option<&'static Parameter> {
    PARAMETERS.iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_keys_are_declared() {
        let required: Vec<_> = PARAMETERS
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();
        assert_eq!(required, vec![SERVICE_ACCOUNT, PROJECT_ID, DATASET_ID]);
        assert_eq!(parameter(POLLING_TIME).map(|p| p.default), Some("5m"));
        assert!(parameter("nope").is_none());
    }
}
