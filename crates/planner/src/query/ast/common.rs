use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDir {
    Asc,
    Desc,
}

/// Fully qualified warehouse table: `project.dataset.table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub name: String,
}

impl TableRef {
    pub fn new(project: &str, dataset: &str, name: &str) -> Self {
        Self {
            project: project.to_string(),
            dataset: dataset.to_string(),
            name: name.to_string(),
        }
    }
}
