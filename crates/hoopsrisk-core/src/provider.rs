// The stats provider seam. The pipeline never fetches data itself; callers
// hand it a career table obtained through this trait.

use thiserror::Error;

use crate::error::PipelineError;
use crate::model::CareerTable;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no seasons found for player {0}")]
    UnknownPlayer(String),

    #[error("stats source unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Table(#[from] PipelineError),
}

/// Supplies the season records of one player.
pub trait StatsProvider {
    fn career(&self, player_id: &str) -> Result<CareerTable, ProviderError>;
}

/// An already-loaded table serves as an in-memory provider.
impl StatsProvider for CareerTable {
    fn career(&self, player_id: &str) -> Result<CareerTable, ProviderError> {
        let table = self.for_player(player_id);
        if table.is_empty() {
            return Err(ProviderError::UnknownPlayer(player_id.to_string()));
        }
        Ok(table)
    }
}
