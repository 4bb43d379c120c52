// Longitudinal feature engineering.
//
// Turns a career table into one processed row per season: career position,
// rate stats, season-over-season changes, weighted rolling averages and
// accumulated decline. All per-player operations run on each player's
// seasons in chronological order. Raw-stat medians span every record passed
// in; gaps left in engineered columns are filled from the same player only.

use std::collections::HashMap;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::debug;

use crate::efficiency;
use crate::error::PipelineError;
use crate::model::{CareerTable, Column, SeasonRecord};
use crate::normalize;
use crate::stats::{dense_rank, forward_fill, pct_change};

/// Columns the builder cannot work without.
pub const REQUIRED_COLUMNS: [Column; 6] = [
    Column::SeasonId,
    Column::Pts,
    Column::Ast,
    Column::Reb,
    Column::Gp,
    Column::Min,
];

/// Games in a full regular season.
pub const FULL_SEASON_GAMES: f64 = 82.0;

/// Rolling-average weights for `[current, previous, two seasons before]`.
pub const ROLLING_WEIGHTS: [f64; 3] = [0.5, 0.3, 0.2];

// ---------------------------------------------------------------------------
// Feature types
// ---------------------------------------------------------------------------

/// How the rolling average treats careers shorter than the full window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RollingWeighting {
    /// Use the leading weights as given, without rescaling. A one-season
    /// window is half the raw value.
    #[default]
    Truncated,
    /// Divide by the sum of the weights actually used.
    Renormalized,
}

/// A stat followed season over season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedStat {
    Pts,
    Ast,
    Reb,
    MinPerGame,
    PlayerEfficiencyRating,
    Gp,
}

impl TrackedStat {
    pub const ALL: [TrackedStat; 6] = [
        TrackedStat::Pts,
        TrackedStat::Ast,
        TrackedStat::Reb,
        TrackedStat::MinPerGame,
        TrackedStat::PlayerEfficiencyRating,
        TrackedStat::Gp,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TrackedStat::Pts => "PTS",
            TrackedStat::Ast => "AST",
            TrackedStat::Reb => "REB",
            TrackedStat::MinPerGame => "MIN_PER_GAME",
            TrackedStat::PlayerEfficiencyRating => "PLAYER_EFFICIENCY_RATING",
            TrackedStat::Gp => "GP",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Change, rolling average and rolling decline of one tracked stat.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Trend {
    pub pct_change: Option<f64>,
    pub rolling_avg: Option<f64>,
    pub rolling_decline: Option<f64>,
}

/// Engineered features of one season.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonFeatures {
    pub season_year: i32,
    pub career_year: u32,
    pub min_per_game: Option<f64>,
    pub gp_ratio: Option<f64>,
    pub years_from_draft: Option<f64>,
    pub trends: [Trend; 6],
    pub per_decline_severity: Option<f64>,
    pub usage_decline_severity: Option<f64>,
    pub per_3year_decline: Option<f64>,
    pub usage_3year_decline: Option<f64>,
    pub per_decline: bool,
    pub usage_decline: bool,
    /// Rating substituted by the position-median pass.
    pub per_was_missing: bool,
    /// Provider supplied no rating for this season.
    pub per_missing: bool,
    pub min_per_game_missing: bool,
    pub gp_missing: bool,
}

impl SeasonFeatures {
    pub fn trend(&self, stat: TrackedStat) -> &Trend {
        &self.trends[stat.index()]
    }

    fn trend_mut(&mut self, stat: TrackedStat) -> &mut Trend {
        &mut self.trends[stat.index()]
    }

    /// Column name and value for every feature, in presentation order.
    pub fn columns(&self) -> Vec<(String, FeatureValue)> {
        let mut out = vec![
            ("SEASON_YEAR".to_string(), FeatureValue::Integer(i64::from(self.season_year))),
            ("CAREER_YEAR".to_string(), FeatureValue::Integer(i64::from(self.career_year))),
            ("MIN_PER_GAME".to_string(), FeatureValue::Number(self.min_per_game)),
            ("GP_RATIO".to_string(), FeatureValue::Number(self.gp_ratio)),
            ("YEARS_FROM_DRAFT".to_string(), FeatureValue::Number(self.years_from_draft)),
        ];
        for stat in TrackedStat::ALL {
            let t = self.trend(stat);
            let name = stat.as_str();
            out.push((format!("{name}_PCT_CHANGE"), FeatureValue::Number(t.pct_change)));
            out.push((format!("{name}_ROLLING_AVG"), FeatureValue::Number(t.rolling_avg)));
            out.push((format!("{name}_ROLLING_DECLINE"), FeatureValue::Number(t.rolling_decline)));
        }
        out.extend([
            ("PER_DECLINE_SEVERITY".to_string(), FeatureValue::Number(self.per_decline_severity)),
            ("USAGE_DECLINE_SEVERITY".to_string(), FeatureValue::Number(self.usage_decline_severity)),
            ("PER_3YEAR_DECLINE".to_string(), FeatureValue::Number(self.per_3year_decline)),
            ("USAGE_3YEAR_DECLINE".to_string(), FeatureValue::Number(self.usage_3year_decline)),
            ("PER_DECLINE".to_string(), FeatureValue::Flag(self.per_decline)),
            ("USAGE_DECLINE".to_string(), FeatureValue::Flag(self.usage_decline)),
            (
                "PLAYER_EFFICIENCY_RATING_WAS_MISSING".to_string(),
                FeatureValue::Indicator(self.per_was_missing),
            ),
            (
                "PLAYER_EFFICIENCY_RATING_MISSING".to_string(),
                FeatureValue::Indicator(self.per_missing),
            ),
            ("MIN_PER_GAME_MISSING".to_string(), FeatureValue::Indicator(self.min_per_game_missing)),
            ("GP_MISSING".to_string(), FeatureValue::Indicator(self.gp_missing)),
        ]);
        out
    }

    fn numeric_cells_mut(&mut self) -> Vec<&mut Option<f64>> {
        let mut cells = vec![
            &mut self.min_per_game,
            &mut self.gp_ratio,
            &mut self.years_from_draft,
            &mut self.per_decline_severity,
            &mut self.usage_decline_severity,
            &mut self.per_3year_decline,
            &mut self.usage_3year_decline,
        ];
        for t in self.trends.iter_mut() {
            cells.push(&mut t.pct_change);
            cells.push(&mut t.rolling_avg);
            cells.push(&mut t.rolling_decline);
        }
        cells
    }
}

/// A single feature cell, typed for JSON and CSV output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Integer(i64),
    Number(Option<f64>),
    Flag(bool),
    /// 0/1 missing-data indicator.
    Indicator(bool),
}

impl FeatureValue {
    /// Text form for CSV cells; absent numbers are empty.
    pub fn to_cell(self) -> String {
        match self {
            FeatureValue::Integer(v) => v.to_string(),
            FeatureValue::Number(Some(v)) => v.to_string(),
            FeatureValue::Number(None) => String::new(),
            FeatureValue::Flag(b) => b.to_string(),
            FeatureValue::Indicator(b) => u8::from(b).to_string(),
        }
    }
}

impl Serialize for FeatureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            FeatureValue::Integer(v) => serializer.serialize_i64(v),
            FeatureValue::Number(v) => v.serialize(serializer),
            FeatureValue::Flag(b) => serializer.serialize_bool(b),
            FeatureValue::Indicator(b) => serializer.serialize_u8(u8::from(b)),
        }
    }
}

impl Serialize for SeasonFeatures {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let columns = self.columns();
        let mut map = serializer.serialize_map(Some(columns.len()))?;
        for (name, value) in &columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// One season after normalization and feature engineering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedSeason {
    #[serde(flatten)]
    pub record: SeasonRecord,
    #[serde(flatten)]
    pub features: SeasonFeatures,
}

impl ProcessedSeason {
    fn feature_cells_mut(&mut self) -> Vec<&mut Option<f64>> {
        self.features.numeric_cells_mut()
    }
}

/// Every optional numeric stat of a raw record.
fn record_cells_mut(r: &mut SeasonRecord) -> Vec<&mut Option<f64>> {
    vec![
        &mut r.gp,
        &mut r.min,
        &mut r.pts,
        &mut r.ast,
        &mut r.reb,
        &mut r.fga,
        &mut r.fgm,
        &mut r.fta,
        &mut r.ftm,
        &mut r.tov,
        &mut r.stl,
        &mut r.blk,
        &mut r.player_efficiency_rating,
        &mut r.bio.weight,
    ]
}

/// The processed feature table, plus the raw table it was derived from.
///
/// Seasons are grouped by player id (ascending) and ordered chronologically
/// within each player.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedTable {
    source: CareerTable,
    seasons: Vec<ProcessedSeason>,
}

impl ProcessedTable {
    pub fn seasons(&self) -> &[ProcessedSeason] {
        &self.seasons
    }

    /// The untouched input.
    pub fn source(&self) -> &CareerTable {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
    }

    pub fn player_ids(&self) -> Vec<&str> {
        self.source.player_ids()
    }

    /// One player's seasons, chronological.
    pub fn player_seasons(&self, player_id: &str) -> Vec<&ProcessedSeason> {
        self.seasons
            .iter()
            .filter(|s| s.record.player_id == player_id)
            .collect()
    }

    pub fn into_seasons(self) -> Vec<ProcessedSeason> {
        self.seasons
    }
}

impl From<ProcessedTable> for CareerTable {
    fn from(table: ProcessedTable) -> Self {
        table.source
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds the processed feature table from raw career data.
#[derive(Debug, Clone, Copy)]
pub struct FeatureBuilder {
    current_year: i32,
    rolling: RollingWeighting,
}

impl FeatureBuilder {
    /// `current_year` is the calendar year `YEARS_FROM_DRAFT` counts to.
    pub fn new(current_year: i32) -> Self {
        Self {
            current_year,
            rolling: RollingWeighting::default(),
        }
    }

    pub fn with_rolling(mut self, rolling: RollingWeighting) -> Self {
        self.rolling = rolling;
        self
    }

    /// Run estimation, normalization and feature engineering over `table`.
    ///
    /// Fails before any processing when a required column is absent from the
    /// schema or a season id has no leading year. The input is not modified.
    pub fn build(&self, table: &CareerTable) -> Result<ProcessedTable, PipelineError> {
        table.require_columns(&REQUIRED_COLUMNS)?;
        let groups = table.chronological_groups()?;

        let mut records: Vec<SeasonRecord> = table.records().to_vec();
        let per_missing: Vec<bool> = records
            .iter()
            .map(|r| r.player_efficiency_rating.is_none())
            .collect();

        if efficiency::needs_estimation(table) {
            debug!("provider supplied no efficiency ratings; estimating from box scores");
            efficiency::apply_estimates(&mut records);
        }
        normalize::zero_fill_inactive(&mut records);

        // Season year and career year per record.
        let mut season_year = vec![0_i32; records.len()];
        let mut career_year = vec![0_u32; records.len()];
        let mut first_season: HashMap<String, i32> = HashMap::new();
        for (player, indices) in &groups {
            let years: Vec<i32> = indices
                .iter()
                .map(|&i| records[i].season_year().unwrap_or_default())
                .collect();
            for (&i, (&year, rank)) in indices.iter().zip(years.iter().zip(dense_rank(&years))) {
                season_year[i] = year;
                career_year[i] = rank;
            }
            if let Some(&first) = years.first() {
                first_season.insert(player.to_string(), first);
            }
        }

        let per_was_missing = normalize::impute_position_efficiency(&mut records);
        normalize::fill_draft_years(&mut records, &first_season);

        let gp_missing: Vec<bool> = records.iter().map(|r| r.gp.is_none()).collect();
        let min_per_game_missing: Vec<bool> = records
            .iter()
            .map(|r| r.min.is_none() || r.gp.is_none())
            .collect();
        // Rates and trends below read the filled stats.
        let raw_filled = normalize::fill_column_medians(&mut records, record_cells_mut);

        let mut features: Vec<SeasonFeatures> = records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let min_per_game = match (r.min, r.gp) {
                    (Some(min), Some(gp)) => Some(min / gp.max(1.0)),
                    _ => None,
                };
                SeasonFeatures {
                    season_year: season_year[i],
                    career_year: career_year[i],
                    min_per_game,
                    gp_ratio: r.gp.map(|gp| gp / FULL_SEASON_GAMES),
                    years_from_draft: r
                        .bio
                        .draft_year
                        .map(|y| f64::from(self.current_year - y)),
                    trends: [Trend::default(); 6],
                    per_decline_severity: None,
                    usage_decline_severity: None,
                    per_3year_decline: None,
                    usage_3year_decline: None,
                    per_decline: false,
                    usage_decline: false,
                    per_was_missing: per_was_missing[i],
                    per_missing: per_missing[i],
                    min_per_game_missing: min_per_game_missing[i],
                    gp_missing: gp_missing[i],
                }
            })
            .collect();

        for indices in groups.values() {
            self.build_player(indices, &records, &mut features);
        }

        let mut seasons: Vec<ProcessedSeason> = Vec::with_capacity(records.len());
        let mut slots: Vec<Option<(SeasonRecord, SeasonFeatures)>> =
            records.into_iter().zip(features).map(Some).collect();
        let mut feature_filled = 0;
        for indices in groups.values() {
            let start = seasons.len();
            for &i in indices {
                if let Some((record, features)) = slots[i].take() {
                    seasons.push(ProcessedSeason { record, features });
                }
            }
            feature_filled +=
                normalize::fill_column_medians(&mut seasons[start..], ProcessedSeason::feature_cells_mut);
        }

        debug!(
            "built features for {} seasons across {} players ({} stat and {} feature cells median-filled)",
            seasons.len(),
            groups.len(),
            raw_filled,
            feature_filled
        );

        Ok(ProcessedTable {
            source: table.clone(),
            seasons,
        })
    }

    /// Per-player longitudinal features. `indices` is chronological.
    fn build_player(&self, indices: &[usize], records: &[SeasonRecord], features: &mut [SeasonFeatures]) {
        for stat in TrackedStat::ALL {
            let raw: Vec<Option<f64>> = indices
                .iter()
                .map(|&i| match stat {
                    TrackedStat::Pts => records[i].pts,
                    TrackedStat::Ast => records[i].ast,
                    TrackedStat::Reb => records[i].reb,
                    TrackedStat::MinPerGame => features[i].min_per_game,
                    TrackedStat::PlayerEfficiencyRating => records[i].player_efficiency_rating,
                    TrackedStat::Gp => records[i].gp,
                })
                .collect();
            let series = forward_fill(&raw);
            let rolling: Vec<Option<f64>> = (0..series.len())
                .map(|pos| self.rolling_average(&series[..=pos]))
                .collect();

            for (pos, &i) in indices.iter().enumerate() {
                let prev = pos.checked_sub(1);
                let trend = features[i].trend_mut(stat);
                trend.pct_change = prev.and_then(|p| pct_change(series[p], series[pos]));
                trend.rolling_avg = rolling[pos];
                trend.rolling_decline = prev.and_then(|p| pct_change(rolling[p], rolling[pos]));

                let declined = match (prev.and_then(|p| series[p]), series[pos]) {
                    (Some(before), Some(now)) => now < before,
                    _ => false,
                };
                match stat {
                    TrackedStat::PlayerEfficiencyRating => features[i].per_decline = declined,
                    TrackedStat::MinPerGame => features[i].usage_decline = declined,
                    _ => {}
                }
            }
        }

        for &i in indices {
            let f = &mut features[i];
            f.per_decline_severity = f
                .trend(TrackedStat::PlayerEfficiencyRating)
                .pct_change
                .map(decline_severity);
            f.usage_decline_severity = f.trend(TrackedStat::MinPerGame).pct_change.map(decline_severity);
        }

        for pos in 0..indices.len() {
            let window = &indices[pos.saturating_sub(2)..=pos];
            let per = sum_present(window.iter().map(|&i| features[i].per_decline_severity));
            let usage = sum_present(window.iter().map(|&i| features[i].usage_decline_severity));
            let f = &mut features[indices[pos]];
            f.per_3year_decline = per;
            f.usage_3year_decline = usage;
        }
    }

    /// Weighted average of the last (up to) three values of `history`, the
    /// current season weighted first. `None` if any value in the window is
    /// absent.
    fn rolling_average(&self, history: &[Option<f64>]) -> Option<f64> {
        let window = &history[history.len().saturating_sub(ROLLING_WEIGHTS.len())..];
        let mut total = 0.0;
        let mut weight_sum = 0.0;
        for (value, weight) in window.iter().rev().zip(ROLLING_WEIGHTS) {
            total += (*value)? * weight;
            weight_sum += weight;
        }
        if window.is_empty() {
            return None;
        }
        match self.rolling {
            RollingWeighting::Truncated => Some(total),
            RollingWeighting::Renormalized => Some(total / weight_sum),
        }
    }
}

/// Magnitude of a negative change; 0 for flat or rising values.
pub fn decline_severity(pct_change: f64) -> f64 {
    (-pct_change).max(0.0)
}

fn sum_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn make_season(season_id: &str, gp: f64, min: f64, pts: f64, per: Option<f64>) -> SeasonRecord {
        let mut r = SeasonRecord::new("2544", season_id)
            .with(Column::Gp, gp)
            .with(Column::Min, min)
            .with(Column::Pts, pts)
            .with(Column::Ast, 5.0)
            .with(Column::Reb, 7.0)
            .with(Column::DraftYear, 2003.0)
            .with_position("Forward");
        r.player_efficiency_rating = per;
        r
    }

    fn build(records: Vec<SeasonRecord>) -> ProcessedTable {
        let table = CareerTable::new(records).unwrap();
        FeatureBuilder::new(2024).build(&table).unwrap()
    }

    #[test]
    fn missing_required_column_fails_before_processing() {
        let table = CareerTable::with_columns(
            [Column::SeasonId, Column::Pts, Column::Ast, Column::Reb, Column::Gp],
            vec![make_season("2019-20", 70.0, 2100.0, 25.0, Some(20.0))],
        )
        .unwrap();
        let err = FeatureBuilder::new(2024).build(&table).unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingColumns {
                columns: vec![Column::Min]
            }
        );
    }

    #[test]
    fn single_season_baseline() {
        let out = build(vec![make_season("2019-20", 70.0, 2100.0, 25.0, Some(20.0))]);
        let s = &out.seasons()[0];
        assert_eq!(s.features.season_year, 2019);
        assert_eq!(s.features.career_year, 1);
        assert_eq!(s.features.min_per_game, Some(30.0));
        for stat in TrackedStat::ALL {
            let t = s.features.trend(stat);
            assert_eq!(t.pct_change, None, "{} pct change", stat.as_str());
            assert_eq!(t.rolling_decline, None);
        }
        assert_eq!(s.features.trend(TrackedStat::Pts).rolling_avg, Some(12.5));
        assert_eq!(s.features.trend(TrackedStat::MinPerGame).rolling_avg, Some(15.0));
        assert_eq!(s.features.trend(TrackedStat::PlayerEfficiencyRating).rolling_avg, Some(10.0));
        assert_eq!(s.features.trend(TrackedStat::Gp).rolling_avg, Some(35.0));
        assert!(!s.features.per_decline);
        assert!(!s.features.usage_decline);
        assert_eq!(s.features.per_decline_severity, None);
    }

    #[test]
    fn seasons_sorted_and_ranked_regardless_of_input_order() {
        let out = build(vec![
            make_season("2012-13", 70.0, 2100.0, 25.0, Some(20.0)),
            make_season("2010-11", 70.0, 2100.0, 25.0, Some(20.0)),
            make_season("2011-12", 70.0, 2100.0, 25.0, Some(20.0)),
        ]);
        let years: Vec<i32> = out.seasons().iter().map(|s| s.features.season_year).collect();
        let ranks: Vec<u32> = out.seasons().iter().map(|s| s.features.career_year).collect();
        assert_eq!(years, vec![2010, 2011, 2012]);
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn career_year_gaps_are_dense() {
        let out = build(vec![
            make_season("2008-09", 70.0, 2100.0, 25.0, Some(20.0)),
            make_season("2012-13", 70.0, 2100.0, 25.0, Some(20.0)),
        ]);
        assert_eq!(out.seasons()[1].features.career_year, 2);
    }

    #[test]
    fn rolling_average_truncates_weights() {
        let out = build(vec![
            make_season("2010-11", 70.0, 2100.0, 10.0, Some(15.0)),
            make_season("2011-12", 70.0, 2100.0, 20.0, Some(15.0)),
            make_season("2012-13", 70.0, 2100.0, 30.0, Some(15.0)),
            make_season("2013-14", 70.0, 2100.0, 40.0, Some(15.0)),
        ]);
        let avg: Vec<f64> = out
            .seasons()
            .iter()
            .map(|s| s.features.trend(TrackedStat::Pts).rolling_avg.unwrap())
            .collect();
        assert!(approx_eq(avg[0], 5.0, 1e-9));
        assert!(approx_eq(avg[1], 0.5 * 20.0 + 0.3 * 10.0, 1e-9));
        assert!(approx_eq(avg[2], 0.5 * 30.0 + 0.3 * 20.0 + 0.2 * 10.0, 1e-9));
        assert!(approx_eq(avg[3], 0.5 * 40.0 + 0.3 * 30.0 + 0.2 * 20.0, 1e-9));

        let decline = out.seasons()[1].features.trend(TrackedStat::Pts).rolling_decline.unwrap();
        assert!(approx_eq(decline, (13.0 - 5.0) / 5.0, 1e-9));
    }

    #[test]
    fn rolling_average_renormalized_option() {
        let table = CareerTable::new(vec![
            make_season("2010-11", 70.0, 2100.0, 10.0, Some(15.0)),
            make_season("2011-12", 70.0, 2100.0, 20.0, Some(15.0)),
        ])
        .unwrap();
        let out = FeatureBuilder::new(2024)
            .with_rolling(RollingWeighting::Renormalized)
            .build(&table)
            .unwrap();
        let first = out.seasons()[0].features.trend(TrackedStat::Pts).rolling_avg.unwrap();
        let second = out.seasons()[1].features.trend(TrackedStat::Pts).rolling_avg.unwrap();
        assert!(approx_eq(first, 10.0, 1e-9));
        assert!(approx_eq(second, (0.5 * 20.0 + 0.3 * 10.0) / 0.8, 1e-9));
    }

    #[test]
    fn monotonic_efficiency_decline() {
        let out = build(vec![
            make_season("2018-19", 70.0, 2100.0, 25.0, Some(20.0)),
            make_season("2019-20", 70.0, 2100.0, 25.0, Some(15.0)),
            make_season("2020-21", 70.0, 2100.0, 25.0, Some(10.0)),
        ]);
        let s = out.seasons();
        assert!(!s[0].features.per_decline);
        assert!(s[1].features.per_decline);
        assert!(s[2].features.per_decline);

        assert!(approx_eq(s[1].features.per_decline_severity.unwrap(), 0.25, 1e-9));
        assert!(approx_eq(s[2].features.per_decline_severity.unwrap(), 1.0 / 3.0, 1e-9));
        assert!(approx_eq(s[1].features.per_3year_decline.unwrap(), 0.25, 1e-9));
        assert!(approx_eq(s[2].features.per_3year_decline.unwrap(), 0.25 + 1.0 / 3.0, 1e-9));
        assert!(s[2].features.per_3year_decline > s[1].features.per_3year_decline);

        // Constant minutes: no usage decline anywhere.
        assert!(s.iter().all(|x| !x.features.usage_decline));
        assert_eq!(s[2].features.usage_decline_severity, Some(0.0));
    }

    #[test]
    fn three_year_window_drops_oldest_season() {
        let out = build(vec![
            make_season("2016-17", 70.0, 2100.0, 25.0, Some(40.0)),
            make_season("2017-18", 70.0, 2100.0, 25.0, Some(20.0)),
            make_season("2018-19", 70.0, 2100.0, 25.0, Some(20.0)),
            make_season("2019-20", 70.0, 2100.0, 25.0, Some(20.0)),
            make_season("2020-21", 70.0, 2100.0, 25.0, Some(10.0)),
        ]);
        let s = out.seasons();
        assert!(approx_eq(s[1].features.per_3year_decline.unwrap(), 0.5, 1e-9));
        assert!(approx_eq(s[3].features.per_3year_decline.unwrap(), 0.5, 1e-9));
        assert!(approx_eq(s[4].features.per_3year_decline.unwrap(), 0.5, 1e-9));
        // Window for season 5 is seasons 3..=5: 0 + 0 + 0.5.
        assert!(!s[3].features.per_decline);
    }

    #[test]
    fn zero_games_season() {
        let out = build(vec![
            make_season("2018-19", 70.0, 2100.0, 25.0, Some(20.0)),
            make_season("2019-20", 0.0, 300.0, 8.0, Some(20.0)),
        ]);
        let s = &out.seasons()[1];
        assert_eq!(s.record.pts, Some(0.0));
        assert_eq!(s.record.ast, Some(0.0));
        assert_eq!(s.record.reb, Some(0.0));
        assert_eq!(s.record.min, Some(0.0));
        assert_eq!(s.features.min_per_game, Some(0.0));
        assert_eq!(s.features.gp_ratio, Some(0.0));
        assert!(s.features.usage_decline);
        assert_eq!(s.features.usage_decline_severity, Some(1.0));
    }

    #[test]
    fn gp_ratio_for_typical_seasons_is_a_fraction() {
        let out = build(vec![
            make_season("2018-19", 82.0, 2800.0, 25.0, Some(20.0)),
            make_season("2019-20", 41.0, 1200.0, 25.0, Some(20.0)),
            make_season("2020-21", 1.0, 10.0, 2.0, Some(20.0)),
        ]);
        for s in out.seasons() {
            let ratio = s.features.gp_ratio.unwrap();
            assert!((0.0..=1.0).contains(&ratio));
        }
        assert_eq!(out.seasons()[0].features.gp_ratio, Some(1.0));
        assert_eq!(out.seasons()[1].features.gp_ratio, Some(0.5));
    }

    #[test]
    fn years_from_draft_uses_injected_year() {
        let mut record = make_season("2023-24", 70.0, 2100.0, 25.0, Some(20.0));
        record.bio.draft_year = Some(2010);
        let out = build(vec![record]);
        assert_eq!(out.seasons()[0].features.years_from_draft, Some(14.0));
    }

    #[test]
    fn draft_year_estimated_when_table_has_none() {
        let mut a = make_season("2015-16", 70.0, 2100.0, 25.0, Some(20.0));
        let mut b = make_season("2016-17", 70.0, 2100.0, 25.0, Some(20.0));
        a.bio.draft_year = None;
        b.bio.draft_year = None;
        let out = build(vec![b, a]);
        for s in out.seasons() {
            assert_eq!(s.record.bio.draft_year, Some(2015));
            assert_eq!(s.features.years_from_draft, Some(9.0));
        }
    }

    #[test]
    fn missing_indicators_reflect_raw_input() {
        let mut no_minutes = make_season("2019-20", 70.0, 0.0, 25.0, None);
        no_minutes.min = None;
        let out = build(vec![
            make_season("2018-19", 70.0, 2100.0, 25.0, Some(20.0)),
            no_minutes,
        ]);
        let s = out.seasons();
        assert!(!s[0].features.per_missing);
        assert!(!s[0].features.per_was_missing);
        assert!(s[1].features.per_missing);
        assert!(s[1].features.per_was_missing);
        assert_eq!(s[1].record.player_efficiency_rating, Some(20.0));
        assert!(s[1].features.min_per_game_missing);
        assert!(!s[1].features.gp_missing);
        // Safety net fills the gap with the column median.
        assert_eq!(s[1].record.min, Some(2100.0));
        assert_eq!(s[1].features.min_per_game, Some(30.0));
    }

    #[test]
    fn estimated_efficiency_when_provider_has_none() {
        let records = vec![
            make_season("2018-19", 70.0, 2100.0, 25.0, None)
                .with(Column::Stl, 1.0)
                .with(Column::Blk, 1.0)
                .with(Column::Fga, 18.0)
                .with(Column::Fgm, 9.0)
                .with(Column::Fta, 6.0)
                .with(Column::Ftm, 5.0)
                .with(Column::Tov, 3.0),
            make_season("2019-20", 70.0, 2100.0, 25.0, None),
        ];
        let out = build(records);
        let s = out.seasons();
        let expected = efficiency::estimate_per(&s[0].record).unwrap();
        assert!(approx_eq(s[0].record.player_efficiency_rating.unwrap(), expected, 1e-9));
        assert_eq!(s[1].record.player_efficiency_rating, Some(efficiency::LEAGUE_AVERAGE_PER));
        assert!(s.iter().all(|x| x.features.per_missing && !x.features.per_was_missing));
    }

    #[test]
    fn players_are_processed_independently() {
        let mut other = make_season("2019-20", 70.0, 2100.0, 25.0, Some(5.0));
        other.player_id = "201939".into();
        let out = build(vec![
            make_season("2018-19", 70.0, 2100.0, 25.0, Some(20.0)),
            other,
            make_season("2019-20", 70.0, 2100.0, 25.0, Some(20.0)),
        ]);
        assert_eq!(out.player_ids(), vec!["201939", "2544"]);
        let curry = out.player_seasons("201939");
        assert_eq!(curry.len(), 1);
        assert_eq!(curry[0].features.career_year, 1);
        assert!(!curry[0].features.per_decline);

        let lebron = out.player_seasons("2544");
        assert_eq!(lebron[1].features.career_year, 2);
        assert_eq!(
            lebron[1].features.trend(TrackedStat::PlayerEfficiencyRating).pct_change,
            Some(0.0)
        );
    }

    fn without_indicators(features: &SeasonFeatures) -> SeasonFeatures {
        SeasonFeatures {
            per_was_missing: false,
            per_missing: false,
            min_per_game_missing: false,
            gp_missing: false,
            ..features.clone()
        }
    }

    #[test]
    fn reprocessing_output_records_leaves_features_unchanged() {
        let mut gap = make_season("2019-20", 72.0, 0.0, 22.0, None);
        gap.min = None;
        let first = build(vec![
            make_season("2018-19", 70.0, 2100.0, 25.0, Some(20.0)),
            gap,
            make_season("2020-21", 60.0, 2220.0, 18.0, Some(12.0)),
        ]);
        let filled = &first.seasons()[1];
        assert_eq!(filled.record.min, Some(2160.0));
        assert!(approx_eq(filled.features.min_per_game.unwrap(), 2160.0 / 72.0, 1e-12));

        let second = build(first.seasons().iter().map(|s| s.record.clone()).collect());
        for (a, b) in first.seasons().iter().zip(second.seasons()) {
            assert_eq!(a.record, b.record);
            // Indicators describe the input they were given, so only they may differ.
            assert_eq!(without_indicators(&a.features), without_indicators(&b.features));
        }
    }

    #[test]
    fn engineered_gaps_filled_from_same_player_only() {
        let mut other = make_season("2019-20", 82.0, 2460.0, 25.0, Some(18.0));
        other.player_id = "201939".into();
        let out = build(vec![
            make_season("2018-19", 70.0, 2520.0, 25.0, Some(24.0)),
            make_season("2019-20", 70.0, 1680.0, 25.0, Some(12.0)),
            other,
        ]);
        let single = out.player_seasons("201939")[0];
        for stat in TrackedStat::ALL {
            assert_eq!(single.features.trend(stat).pct_change, None, "{}", stat.as_str());
            assert_eq!(single.features.trend(stat).rolling_decline, None);
        }
        assert_eq!(single.features.per_decline_severity, None);
        assert_eq!(single.features.per_3year_decline, None);

        let lebron = out.player_seasons("2544");
        let per = |i: usize| lebron[i].features.trend(TrackedStat::PlayerEfficiencyRating).pct_change;
        assert_eq!(per(1), Some(-0.5));
        assert_eq!(per(0), Some(-0.5));
    }

    #[test]
    fn rebuilding_from_source_is_deterministic() {
        let first = build(vec![
            make_season("2018-19", 70.0, 2100.0, 25.0, Some(20.0)),
            make_season("2019-20", 0.0, 0.0, 25.0, None),
            make_season("2020-21", 60.0, 1500.0, 18.0, Some(12.0)),
        ]);
        let second = FeatureBuilder::new(2024).build(first.source()).unwrap();
        assert_eq!(first, second);
        // Input untouched: the zero-games season still carries its raw points.
        assert_eq!(first.source().records()[1].pts, Some(25.0));
    }

    #[test]
    fn feature_columns_have_presentation_names() {
        let out = build(vec![make_season("2019-20", 70.0, 2100.0, 25.0, Some(20.0))]);
        let names: Vec<String> = out.seasons()[0]
            .features
            .columns()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names.len(), 5 + 18 + 10);
        assert!(names.contains(&"PLAYER_EFFICIENCY_RATING_ROLLING_AVG".to_string()));
        assert!(names.contains(&"MIN_PER_GAME_PCT_CHANGE".to_string()));
        assert!(names.contains(&"GP_ROLLING_DECLINE".to_string()));
        assert!(names.contains(&"USAGE_3YEAR_DECLINE".to_string()));
    }

    #[test]
    fn processed_season_serializes_flat() {
        let out = build(vec![make_season("2019-20", 70.0, 2100.0, 25.0, Some(20.0))]);
        let json = serde_json::to_value(&out.seasons()[0]).unwrap();
        assert_eq!(json["SEASON_ID"], "2019-20");
        assert_eq!(json["CAREER_YEAR"], 1);
        assert_eq!(json["PTS_PCT_CHANGE"], serde_json::Value::Null);
        assert_eq!(json["PER_DECLINE"], false);
        assert_eq!(json["GP_MISSING"], 0);
        assert_eq!(json["POSITION"], "Forward");
    }
}
