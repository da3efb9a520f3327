//! Wide-column store gateway.
//!
//! The service talks to its store through [`StoreGateway`], a narrow
//! put/get/scan surface. [`MemoryStore`] is the in-tree backend; a client
//! for a real wide-column store implements the same trait.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{IngestError, Result};
use crate::schema;

/// Cells of one row, keyed `"family:qualifier"`. BTreeMap keeps
/// qualifiers in lexicographic order, which index scans rely on.
pub type CellMap = BTreeMap<String, Vec<u8>>;

/// Row-range parameters for [`StoreGateway::scan`]. All bounds compose:
/// a row must match the prefix and fall inside `[start, stop)`.
#[derive(Debug, Clone, Default)]
pub struct ScanParams {
    pub prefix: Option<String>,
    pub start: Option<String>,
    /// Exclusive. Append a sentinel to realize an inclusive bound.
    pub stop: Option<String>,
    pub limit: Option<usize>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Write one row, replacing any previous cells under the same key.
    /// Record writes always carry the full cell set, so latest-write-wins
    /// needs no merge.
    async fn put(&self, table: &str, row_key: &str, cells: CellMap) -> Result<()>;

    /// Upsert cells into a row without touching cells outside the map.
    /// Index rows accumulate one cell per entry, so they need the native
    /// wide-column put rather than a row replace.
    async fn merge(&self, table: &str, row_key: &str, cells: CellMap) -> Result<()>;

    async fn get(&self, table: &str, row_key: &str) -> Result<Option<CellMap>>;

    /// Ordered row scan. Finite and not restartable; callers re-scan from
    /// the last seen key on retry.
    async fn scan(&self, table: &str, params: ScanParams) -> Result<Vec<(String, CellMap)>>;

    async fn list_tables(&self) -> Result<Vec<String>>;

    async fn create_table(&self, name: &str, families: &[String]) -> Result<()>;
}

#[derive(Debug, Default)]
struct TableData {
    families: Vec<String>,
    rows: BTreeMap<String, CellMap>,
}

/// In-process store backend over ordered rows, with per-row atomicity
/// for a single put, like the wide-column stores it stands in for.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, TableData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_families(table: &TableData, table_name: &str, cells: &CellMap) -> Result<()> {
        for column in cells.keys() {
            let family = column.split(':').next().unwrap_or(column);
            if !table.families.iter().any(|f| f == family) {
                return Err(IngestError::StoreWriteFailed(format!(
                    "Unknown column family {} in table {}",
                    family, table_name
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StoreGateway for MemoryStore {
    async fn put(&self, table: &str, row_key: &str, cells: CellMap) -> Result<()> {
        let mut tables = self.tables.write().await;
        let data = tables
            .get_mut(table)
            .ok_or_else(|| IngestError::StoreUnavailable(format!("Unknown table: {}", table)))?;
        Self::check_families(data, table, &cells)?;
        data.rows.insert(row_key.to_string(), cells);
        Ok(())
    }

    async fn merge(&self, table: &str, row_key: &str, cells: CellMap) -> Result<()> {
        let mut tables = self.tables.write().await;
        let data = tables
            .get_mut(table)
            .ok_or_else(|| IngestError::StoreUnavailable(format!("Unknown table: {}", table)))?;
        Self::check_families(data, table, &cells)?;
        data.rows.entry(row_key.to_string()).or_default().extend(cells);
        Ok(())
    }

    async fn get(&self, table: &str, row_key: &str) -> Result<Option<CellMap>> {
        let tables = self.tables.read().await;
        let data = tables
            .get(table)
            .ok_or_else(|| IngestError::StoreUnavailable(format!("Unknown table: {}", table)))?;
        Ok(data.rows.get(row_key).cloned())
    }

    async fn scan(&self, table: &str, params: ScanParams) -> Result<Vec<(String, CellMap)>> {
        let tables = self.tables.read().await;
        let data = tables
            .get(table)
            .ok_or_else(|| IngestError::StoreUnavailable(format!("Unknown table: {}", table)))?;

        let limit = params.limit.unwrap_or(usize::MAX);
        let mut rows = Vec::new();

        for (key, cells) in &data.rows {
            if let Some(prefix) = &params.prefix {
                if !key.starts_with(prefix.as_str()) {
                    continue;
                }
            }
            if let Some(start) = &params.start {
                if key < start {
                    continue;
                }
            }
            if let Some(stop) = &params.stop {
                if key >= stop {
                    break;
                }
            }
            rows.push((key.clone(), cells.clone()));
            if rows.len() >= limit {
                break;
            }
        }

        Ok(rows)
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let tables = self.tables.read().await;
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_table(&self, name: &str, families: &[String]) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.entry(name.to_string()).or_insert_with(|| TableData {
            families: families.to_vec(),
            rows: BTreeMap::new(),
        });
        Ok(())
    }
}

/// Create the three service tables when absent. Idempotent; safe to run
/// on every startup.
pub async fn ensure_tables(store: &dyn StoreGateway) -> Result<()> {
    let specs: [(&str, &[&str]); 3] = [
        (
            schema::QNA_TABLE,
            &[
                schema::QUESTION_FAMILY,
                schema::ANSWERS_FAMILY,
                schema::TOP_ANSWERS_FAMILY,
            ],
        ),
        (schema::TRENDS_TABLE, &[schema::TREND_FAMILY]),
        (schema::TAG_INDEX_TABLE, &[schema::TAG_INDEX_FAMILY]),
    ];

    let existing = store.list_tables().await?;

    for (name, families) in specs {
        if existing.iter().any(|t| t == name) {
            continue;
        }
        info!("Creating table {}", name);
        let families: Vec<String> = families.iter().map(|f| f.to_string()).collect();
        store.create_table(name, &families).await?;
    }

    Ok(())
}
