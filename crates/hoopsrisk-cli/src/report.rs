// Report output: the player report as JSON, or the processed feature table
// as CSV with one column per engineered feature.

use std::io::Write;

use hoopsrisk_core::features::ProcessedSeason;
use hoopsrisk_core::model::{Column, SeasonRecord};
use hoopsrisk_core::{PlayerReport, RiskAssessment};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write feature table: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed player report.
    #[default]
    Json,
    /// Processed feature table, one row per season.
    Csv,
}

/// Write the report as pretty JSON followed by a newline.
pub fn write_json<W: Write>(report: &PlayerReport, mut out: W) -> Result<(), ReportError> {
    serde_json::to_writer_pretty(&mut out, report)?;
    writeln!(out)?;
    Ok(())
}

/// One line of the whole-table score listing.
#[derive(Debug, Serialize)]
struct PlayerScore<'a> {
    player_id: &'a str,
    risk: &'a RiskAssessment,
}

/// Write every player's risk as a pretty JSON array.
pub fn write_scores_json<W: Write>(
    scores: &[(String, RiskAssessment)],
    mut out: W,
) -> Result<(), ReportError> {
    let listing: Vec<PlayerScore<'_>> = scores
        .iter()
        .map(|(player_id, risk)| PlayerScore { player_id, risk })
        .collect();
    serde_json::to_writer_pretty(&mut out, &listing)?;
    writeln!(out)?;
    Ok(())
}

/// Write the processed seasons as CSV: raw columns, then feature columns.
pub fn write_feature_csv<W: Write>(seasons: &[ProcessedSeason], out: W) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_writer(out);
    if let Some(first) = seasons.first() {
        let header = Column::ALL
            .iter()
            .map(|c| c.as_str().to_string())
            .chain(first.features.columns().into_iter().map(|(name, _)| name));
        writer.write_record(header)?;
    }
    for season in seasons {
        let row = record_cells(&season.record)
            .into_iter()
            .chain(season.features.columns().into_iter().map(|(_, value)| value.to_cell()));
        writer.write_record(row)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn record_cells(record: &SeasonRecord) -> Vec<String> {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    Column::ALL
        .iter()
        .map(|&column| match column {
            Column::PlayerId => record.player_id.clone(),
            Column::SeasonId => record.season_id.clone(),
            Column::DraftRound => text(&record.bio.draft_round),
            Column::DraftNumber => text(&record.bio.draft_number),
            Column::Height => text(&record.bio.height),
            Column::Position => record.bio.position.clone(),
            Column::DraftYear => record
                .bio
                .draft_year
                .map(|y| y.to_string())
                .unwrap_or_default(),
            numeric => record
                .stat(numeric)
                .map(|v| v.to_string())
                .unwrap_or_default(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
