// Pipeline error taxonomy.

use thiserror::Error;

use crate::model::Column;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// A required column is absent from the input schema. Nothing is processed.
    #[error("missing required columns: {}", join_columns(columns))]
    MissingColumns { columns: Vec<Column> },

    #[error("invalid season id `{season_id}` for player {player_id}: expected a leading 4-digit year")]
    InvalidSeasonId { player_id: String, season_id: String },

    #[error("duplicate season {season_id} for player {player_id}")]
    DuplicateSeason { player_id: String, season_id: String },

    /// The risk scorer refuses to produce a default score for an empty table.
    #[error("cannot score an empty career table")]
    EmptyTable,
}

fn join_columns(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
