// Approximate player efficiency rating for providers that do not supply one.
//
// A simplified, non-canonical PER: weighted positive box-score contributions
// minus missed shots and turnovers, scaled to 48 minutes and to a league
// average of roughly 15.

use tracing::warn;

use crate::model::{CareerTable, Column, SeasonRecord};

/// League-average efficiency, used when a rating cannot be computed or imputed.
pub const LEAGUE_AVERAGE_PER: f64 = 15.0;

/// Stats the estimate reads. Any one of them missing yields no estimate.
pub const ESTIMATE_INPUTS: [Column; 11] = [
    Column::Pts,
    Column::Reb,
    Column::Ast,
    Column::Stl,
    Column::Blk,
    Column::Fga,
    Column::Fgm,
    Column::Fta,
    Column::Ftm,
    Column::Tov,
    Column::Min,
];

const REB_WEIGHT: f64 = 1.2;
const AST_WEIGHT: f64 = 1.5;
const STL_WEIGHT: f64 = 2.0;
const BLK_WEIGHT: f64 = 2.0;
const MISSED_FT_WEIGHT: f64 = 0.5;
const PACE_MINUTES: f64 = 48.0;
const LEAGUE_SCALE: f64 = 15.0 / 13.0;

/// Estimate the efficiency rating of one season.
///
/// Returns `None` if any input is absent or not finite; the caller imputes.
pub fn estimate_per(record: &SeasonRecord) -> Option<f64> {
    let mut v = [0.0_f64; 11];
    for (slot, column) in v.iter_mut().zip(ESTIMATE_INPUTS) {
        let value = record.stat(column)?;
        if !value.is_finite() {
            return None;
        }
        *slot = value;
    }
    let [pts, reb, ast, stl, blk, fga, fgm, fta, ftm, tov, min] = v;

    let positive = pts + REB_WEIGHT * reb + AST_WEIGHT * ast + STL_WEIGHT * stl + BLK_WEIGHT * blk;
    let negative = (fga - fgm) + MISSED_FT_WEIGHT * (fta - ftm) + tov;
    let minutes = if min > 0.0 { min } else { 1.0 };
    let raw = (positive - negative) * PACE_MINUTES / minutes;
    Some(raw * LEAGUE_SCALE)
}

/// True when the provider's own rating is unusable for the whole table:
/// the column is absent, or present with no value in any row.
pub fn needs_estimation(table: &CareerTable) -> bool {
    !table.has_column(Column::PlayerEfficiencyRating)
        || table
            .records()
            .iter()
            .all(|r| r.player_efficiency_rating.is_none())
}

/// Overwrite every record's rating with the estimate, falling back to
/// [`LEAGUE_AVERAGE_PER`] where the estimate is unavailable. Returns how many
/// records fell back.
pub fn apply_estimates(records: &mut [SeasonRecord]) -> usize {
    let mut fallbacks = 0;
    for record in records.iter_mut() {
        let estimate = estimate_per(record).unwrap_or_else(|| {
            fallbacks += 1;
            LEAGUE_AVERAGE_PER
        });
        record.player_efficiency_rating = Some(estimate);
    }
    if fallbacks > 0 {
        warn!(
            "{} of {} seasons lack box-score inputs; using league-average efficiency {}",
            fallbacks,
            records.len(),
            LEAGUE_AVERAGE_PER
        );
    }
    fallbacks
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
