// Season rows from a CSV export in NBA stats column format.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use hoopsrisk_core::model::{CareerTable, Column, SeasonRecord};
use hoopsrisk_core::provider::{ProviderError, StatsProvider};
use hoopsrisk_core::PipelineError;
use thiserror::Error;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SeasonsError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("invalid season table in {path}: {source}")]
    Table {
        path: String,
        source: PipelineError,
    },
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Every season row of a CSV file, served per player.
#[derive(Debug, Clone)]
pub struct CsvStatsProvider {
    table: CareerTable,
}

impl CsvStatsProvider {
    /// Load a seasons CSV from disk.
    pub fn from_path(path: &Path) -> Result<Self, SeasonsError> {
        let file = std::fs::File::open(path).map_err(|e| SeasonsError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// Load from any reader. `source` names the input in errors.
    pub fn from_reader<R: Read>(rdr: R, source: &str) -> Result<Self, SeasonsError> {
        let (columns, records) = load_seasons_from_reader(rdr).map_err(|e| SeasonsError::Csv {
            path: source.to_string(),
            source: e,
        })?;
        if !columns.contains(&Column::PlayerId) {
            return Err(SeasonsError::Table {
                path: source.to_string(),
                source: PipelineError::MissingColumns {
                    columns: vec![Column::PlayerId],
                },
            });
        }
        let table = CareerTable::with_columns(columns, records).map_err(|e| SeasonsError::Table {
            path: source.to_string(),
            source: e,
        })?;
        info!(
            "loaded {} season rows for {} players from {}",
            table.len(),
            table.player_ids().len(),
            source
        );
        Ok(Self { table })
    }

    /// The whole table, every player included.
    pub fn table(&self) -> &CareerTable {
        &self.table
    }
}

impl StatsProvider for CsvStatsProvider {
    fn career(&self, player_id: &str) -> Result<CareerTable, ProviderError> {
        self.table.career(player_id)
    }
}

// ---------------------------------------------------------------------------
// Reader-based loading
// ---------------------------------------------------------------------------

/// Read the header into a schema and every well-formed row into a record.
///
/// Unknown headers are ignored. Rows with the wrong field count or without a
/// player id are skipped. A repeated (player, season) pair keeps the latest
/// row.
fn load_seasons_from_reader<R: Read>(
    rdr: R,
) -> Result<(Vec<Column>, Vec<SeasonRecord>), csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let layout: Vec<Option<Column>> = reader.headers()?.iter().map(Column::from_header).collect();
    let columns: Vec<Column> = layout.iter().flatten().copied().collect();

    let mut records: Vec<SeasonRecord> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    for result in reader.records() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!("skipping malformed season row: {}", e);
                continue;
            }
        };
        let Some(record) = parse_row(&layout, &row) else {
            warn!(
                "skipping season row without a player id at line {}",
                row.position().map_or(0, |p| p.line())
            );
            continue;
        };
        let key = (record.player_id.clone(), record.season_id.clone());
        match index.get(&key) {
            Some(&idx) => {
                warn!(
                    "duplicate season {} for player {}, using latest row",
                    record.season_id, record.player_id
                );
                records[idx] = record;
            }
            None => {
                index.insert(key, records.len());
                records.push(record);
            }
        }
    }
    Ok((columns, records))
}

fn parse_row(layout: &[Option<Column>], row: &csv::StringRecord) -> Option<SeasonRecord> {
    let mut record = SeasonRecord::new("", "");
    for (column, cell) in layout.iter().zip(row.iter()) {
        let Some(column) = *column else {
            continue;
        };
        let cell = cell.trim();
        match column {
            Column::PlayerId => record.player_id = cell.to_string(),
            Column::SeasonId => record.season_id = cell.to_string(),
            Column::DraftYear => record.bio.draft_year = parse_number(cell).map(|y| y.round() as i32),
            Column::DraftRound => record.bio.draft_round = parse_text(cell),
            Column::DraftNumber => record.bio.draft_number = parse_text(cell),
            Column::Height => record.bio.height = parse_text(cell),
            Column::Position => {
                if let Some(position) = parse_text(cell) {
                    record.bio.position = position;
                }
            }
            numeric => {
                if let Some(slot) = record.stat_mut(numeric) {
                    *slot = parse_number(cell);
                }
            }
        }
    }
    (!record.player_id.is_empty()).then_some(record)
}

/// Empty cells and text such as "Undrafted" are null.
fn parse_number(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_text(cell: &str) -> Option<String> {
    (!cell.is_empty()).then(|| cell.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
