//! Source configuration, parsed from the host's flat string map.

use crate::error::ConfigError;
use model::execution::table::TableDescriptor;
use params::{
    DATASET_ID, DATASET_LOCATION, INCREMENT_COLUMN, ORDER_BY, POLLING_TIME, PRIMARY_KEY_COLUMN,
    PROJECT_ID, SERVICE_ACCOUNT, TABLE_ID,
};
use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

pub mod params;

/// Rows fetched per page query, shared by every table.
pub const PAGE_SIZE: u64 = 100;

/// Capacity of the record channel between readers and the host.
pub const CHANNEL_CAPACITY: usize = 100;

pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Which tables a cycle reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSelection {
    /// List the dataset at every tick.
    Discover,
    Listed(Vec<String>),
}

/// Validated configuration of one warehouse source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub service_account: PathBuf,
    pub project_id: String,
    pub dataset_id: String,
    pub tables: TableSelection,
    pub increment_column: Option<String>,
    pub primary_key_column: Option<String>,
    /// Explicit ORDER BY column per table, for tables read by offset.
    pub order_by: BTreeMap<String, String>,
    pub polling_interval: Duration,
    pub location: Option<String>,
}

impl SourceConfig {
    pub fn from_map(cfg: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let config = Self {
            service_account: PathBuf::from(required(cfg, SERVICE_ACCOUNT)?),
            project_id: required(cfg, PROJECT_ID)?,
            dataset_id: required(cfg, DATASET_ID)?,
            tables: parse_tables(optional(cfg, TABLE_ID).as_deref()),
            increment_column: optional(cfg, INCREMENT_COLUMN),
            primary_key_column: optional(cfg, PRIMARY_KEY_COLUMN),
            order_by: parse_order_by(optional(cfg, ORDER_BY).as_deref())?,
            polling_interval: parse_polling(optional(cfg, POLLING_TIME).as_deref())?,
            location: optional(cfg, DATASET_LOCATION),
        };

        debug!(
            project = %config.project_id,
            dataset = %config.dataset_id,
            tables = ?config.tables,
            polling = %humantime::format_duration(config.polling_interval),
            "Parsed source config"
        );
        Ok(config)
    }

    /// Reads a JSON object of string values, keyed like the host map.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let map: HashMap<String, String> = serde_json::from_str(&raw)?;
        Self::from_map(&map)
    }

    /// The only table this source reads, when exactly one is listed.
    pub fn single_table(&self) -> Option<&str> {
        match &self.tables {
            TableSelection::Listed(tables) if tables.len() == 1 => Some(tables[0].as_str()),
            _ => None,
        }
    }

    /// Stable identity of this source, used to key persisted positions.
    pub fn source_id(&self) -> String {
        format!("{}.{}", self.project_id, self.dataset_id)
    }

    pub fn descriptor(&self, table: &str) -> TableDescriptor {
        TableDescriptor {
            name: table.to_string(),
            increment_col: self.increment_column.clone(),
            primary_key: self.primary_key_column.clone(),
            order_by: self.order_by.get(table).cloned(),
        }
    }

    pub fn descriptors(&self, tables: &[String]) -> Vec<TableDescriptor> {
        tables.iter().map(|t| self.descriptor(t)).collect()
    }
}

fn optional(cfg: &HashMap<String, String>, key: &str) -> Option<String> {
    cfg.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(cfg: &HashMap<String, String>, key: &'static str) -> Result<String, ConfigError> {
    optional(cfg, key).ok_or(ConfigError::MissingKey(key))
}

/// Comma list in first-seen order; a repeated name is read once.
fn parse_tables(raw: Option<&str>) -> TableSelection {
    let mut tables: Vec<String> = Vec::new();
    for table in raw.unwrap_or_default().split(',').map(str::trim) {
        if !table.is_empty() && !tables.iter().any(|t| t == table) {
            tables.push(table.to_string());
        }
    }

    if tables.is_empty() || tables.iter().any(|t| t == "*") {
        TableSelection::Discover
    } else {
        TableSelection::Listed(tables)
    }
}

fn parse_order_by(raw: Option<&str>) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut map = BTreeMap::new();
    let Some(raw) = raw else {
        return Ok(map);
    };

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (table, column) = entry
            .split_once(':')
            .map(|(t, c)| (t.trim(), c.trim()))
            .filter(|(t, c)| !t.is_empty() && !c.is_empty())
            .ok_or_else(|| ConfigError::InvalidValue {
                key: ORDER_BY,
                reason: format!("expected `table:column`, got `{entry}`"),
            })?;
        map.insert(table.to_string(), column.to_string());
    }
    Ok(map)
}

fn parse_polling(raw: Option<&str>) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_POLLING_INTERVAL);
    };

    let interval = humantime::parse_duration(raw).map_err(|e| ConfigError::InvalidValue {
        key: POLLING_TIME,
        reason: format!("`{raw}`: {e}"),
    })?;
    if interval.is_zero() {
        return Err(ConfigError::InvalidValue {
            key: POLLING_TIME,
            reason: "interval must be greater than zero".into(),
        });
    }
    Ok(interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base() -> HashMap<String, String> {
        HashMap::from([
            (SERVICE_ACCOUNT.to_string(), "/keys/sa.json".to_string()),
            (PROJECT_ID.to_string(), "proj".to_string()),
            (DATASET_ID.to_string(), "shop".to_string()),
        ])
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = SourceConfig::from_map(&base()).unwrap();
        assert_eq!(cfg.tables, TableSelection::Discover);
        assert_eq!(cfg.polling_interval, DEFAULT_POLLING_INTERVAL);
        assert_eq!(cfg.increment_column, None);
        assert_eq!(cfg.location, None);
        assert_eq!(cfg.source_id(), "proj.shop");
        assert_eq!(cfg.single_table(), None);
    }

    #[test]
    fn parses_optional_keys() {
        let mut map = base();
        map.insert(TABLE_ID.into(), " orders, users ,".into());
        map.insert(INCREMENT_COLUMN.into(), "updated_at".into());
        map.insert(PRIMARY_KEY_COLUMN.into(), "id".into());
        map.insert(ORDER_BY.into(), "orders:created, events : ts".into());
        map.insert(POLLING_TIME.into(), "1h30m".into());
        map.insert(DATASET_LOCATION.into(), "EU".into());

        let cfg = SourceConfig::from_map(&map).unwrap();
        assert_eq!(
            cfg.tables,
            TableSelection::Listed(vec!["orders".into(), "users".into()])
        );
        assert_eq!(cfg.polling_interval, Duration::from_secs(90 * 60));
        assert_eq!(cfg.location.as_deref(), Some("EU"));

        let orders = cfg.descriptor("orders");
        assert_eq!(orders.order_by.as_deref(), Some("created"));
        assert_eq!(orders.increment_col.as_deref(), Some("updated_at"));
        assert_eq!(orders.primary_key.as_deref(), Some("id"));
        assert_eq!(cfg.descriptor("events").order_by.as_deref(), Some("ts"));
        assert_eq!(cfg.descriptor("users").order_by, None);
    }

    #[test]
    fn star_means_discover_and_single_table_is_detected() {
        let mut map = base();
        map.insert(TABLE_ID.into(), "*".into());
        assert_eq!(
            SourceConfig::from_map(&map).unwrap().tables,
            TableSelection::Discover
        );

        map.insert(TABLE_ID.into(), "orders".into());
        assert_eq!(SourceConfig::from_map(&map).unwrap().single_table(), Some("orders"));
    }

    #[test]
    fn repeated_tables_are_listed_once() {
        let mut map = base();
        map.insert(TABLE_ID.into(), "orders, users,orders ,users".into());
        assert_eq!(
            SourceConfig::from_map(&map).unwrap().tables,
            TableSelection::Listed(vec!["orders".into(), "users".into()])
        );

        map.insert(TABLE_ID.into(), "orders,orders".into());
        assert_eq!(SourceConfig::from_map(&map).unwrap().single_table(), Some("orders"));
    }

    #[test]
    fn rejects_missing_and_blank_required_keys() {
        let mut map = base();
        map.remove(PROJECT_ID);
        assert!(matches!(
            SourceConfig::from_map(&map),
            Err(ConfigError::MissingKey(PROJECT_ID))
        ));

        let mut map = base();
        map.insert(DATASET_ID.into(), "  ".into());
        assert!(matches!(
            SourceConfig::from_map(&map),
            Err(ConfigError::MissingKey(DATASET_ID))
        ));
    }

    #[test]
    fn rejects_bad_durations() {
        for bad in ["soon", "0s", "5 parsecs"] {
            let mut map = base();
            map.insert(POLLING_TIME.into(), bad.into());
            assert!(
                matches!(
                    SourceConfig::from_map(&map),
                    Err(ConfigError::InvalidValue {
                        key: POLLING_TIME,
                        ..
                    })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_malformed_order_by() {
        for bad in ["orders", "orders:", ":created"] {
            let mut map = base();
            map.insert(ORDER_BY.into(), bad.into());
            assert!(matches!(
                SourceConfig::from_map(&map),
                Err(ConfigError::InvalidValue { key: ORDER_BY, .. })
            ));
        }
    }

    #[test]
    fn reads_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"serviceAccount":"/k.json","projectID":"p","datasetID":"d","tableID":"t","pollingTime":"30s"}}"#
        )
        .unwrap();

        let cfg = SourceConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.single_table(), Some("t"));
        assert_eq!(cfg.polling_interval, Duration::from_secs(30));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "[1, 2]").unwrap();
        assert!(matches!(
            SourceConfig::from_file(bad.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
