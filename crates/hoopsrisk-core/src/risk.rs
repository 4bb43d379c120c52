// Career risk score.
//
// Reduces the latest season's engineered features, plus the volatility of
// games played across the whole career, into a single 0-100 score.

use serde::Serialize;

use crate::error::PipelineError;
use crate::features::{ProcessedSeason, ProcessedTable, TrackedStat};
use crate::stats::{clip, sample_stdev};

// ---------------------------------------------------------------------------
// Policy constants
// ---------------------------------------------------------------------------

pub const AGE_WEIGHT: f64 = 0.30;
pub const PERFORMANCE_WEIGHT: f64 = 0.30;
pub const USAGE_WEIGHT: f64 = 0.28;
pub const INJURY_WEIGHT: f64 = 0.12;

/// Years after the draft at which age risk saturates.
const AGE_HORIZON_YEARS: f64 = 20.0;
/// Share of the latest single-season decline in a decline sub-risk; the rest
/// comes from the three-season accumulation.
const LATEST_DECLINE_SHARE: f64 = 0.7;
const ACCUMULATED_DECLINE_SHARE: f64 = 0.3;
const MISSED_GAMES_FACTOR: f64 = 1.5;
const GP_VOLATILITY_FACTOR: f64 = 2.0;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Sub-risks, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskComponents {
    pub age: f64,
    pub performance: f64,
    pub usage: f64,
    pub injury: f64,
}

impl RiskComponents {
    /// Weighted sum scaled to `[0, 100]`.
    pub fn weighted_score(&self) -> f64 {
        let blended = AGE_WEIGHT * self.age
            + PERFORMANCE_WEIGHT * self.performance
            + USAGE_WEIGHT * self.usage
            + INJURY_WEIGHT * self.injury;
        clip(100.0 * blended, 0.0, 100.0)
    }
}

/// The career risk score together with the sub-risks it was built from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub components: RiskComponents,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score a processed table holding one player's career.
pub fn score(table: &ProcessedTable) -> Result<RiskAssessment, PipelineError> {
    score_seasons(table.seasons())
}

/// Score a slice of processed seasons. The latest season is the one with the
/// highest season year; among equal years the last one wins. Absent feature
/// values count as zero.
pub fn score_seasons(seasons: &[ProcessedSeason]) -> Result<RiskAssessment, PipelineError> {
    let latest = seasons
        .iter()
        .max_by_key(|s| s.features.season_year)
        .ok_or(PipelineError::EmptyTable)?;
    let f = &latest.features;

    let gp_ratios: Vec<f64> = seasons.iter().filter_map(|s| s.features.gp_ratio).collect();
    let gp_volatility = sample_stdev(&gp_ratios);

    let age = clip(f.years_from_draft.unwrap_or(0.0) / AGE_HORIZON_YEARS, 0.0, 1.0);
    let performance = decline_risk(f.per_decline_severity, f.per_3year_decline);
    let usage = decline_risk(f.usage_decline_severity, f.usage_3year_decline);
    let gp_growth = f.trend(TrackedStat::Gp).pct_change.unwrap_or(0.0).max(0.0);
    let injury = clip(
        (1.0 - f.gp_ratio.unwrap_or(0.0)) * MISSED_GAMES_FACTOR
            + gp_growth
            + GP_VOLATILITY_FACTOR * gp_volatility,
        0.0,
        1.0,
    );

    let components = RiskComponents {
        age,
        performance,
        usage,
        injury,
    };
    Ok(RiskAssessment {
        score: components.weighted_score(),
        components,
    })
}

fn decline_risk(latest: Option<f64>, accumulated: Option<f64>) -> f64 {
    clip(
        LATEST_DECLINE_SHARE * latest.unwrap_or(0.0)
            + ACCUMULATED_DECLINE_SHARE * accumulated.unwrap_or(0.0),
        0.0,
        1.0,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
