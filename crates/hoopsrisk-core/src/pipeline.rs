// End-to-end orchestration: raw career table in, one report per player out.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::features::{FeatureBuilder, ProcessedSeason, ProcessedTable, RollingWeighting};
use crate::model::CareerTable;
use crate::provider::{ProviderError, StatsProvider};
use crate::risk::{self, RiskAssessment};
use crate::summary::{self, PointsSummary, SeasonPoints};

/// Knobs the caller controls. The risk weights are fixed policy and are not
/// among them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineOptions {
    /// Calendar year `YEARS_FROM_DRAFT` counts to.
    pub current_year: i32,
    pub rolling: RollingWeighting,
}

impl PipelineOptions {
    pub fn new(current_year: i32) -> Self {
        Self {
            current_year,
            rolling: RollingWeighting::default(),
        }
    }
}

/// Everything the presentation layer renders for one player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerReport {
    pub player_id: String,
    pub risk: RiskAssessment,
    pub points_by_season: Vec<SeasonPoints>,
    pub points_summary: Option<PointsSummary>,
    pub seasons: Vec<ProcessedSeason>,
}

#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Estimation, normalization and feature engineering.
    pub fn process(&self, table: &CareerTable) -> Result<ProcessedTable, PipelineError> {
        FeatureBuilder::new(self.options.current_year)
            .with_rolling(self.options.rolling)
            .build(table)
    }

    /// Run the full pipeline and report on every player in `table`, ordered
    /// by player id. Each career is processed on its own, so a player's
    /// report matches what [`Pipeline::run_player`] gives for that player.
    pub fn run(&self, table: &CareerTable) -> Result<Vec<PlayerReport>, PipelineError> {
        if table.is_empty() {
            return Err(PipelineError::EmptyTable);
        }

        let mut reports = Vec::new();
        for player_id in table.player_ids() {
            let career = table.for_player(player_id);
            let seasons = self.process(&career)?.into_seasons();
            let risk = risk::score_seasons(&seasons)?;
            let points_by_season = summary::average_points_by_season(&career)?;
            let points_summary = summary::summarize(&points_by_season);
            debug!(
                "player {}: {} seasons, risk {:.1}",
                player_id,
                seasons.len(),
                risk.score
            );
            reports.push(PlayerReport {
                player_id: player_id.to_string(),
                risk,
                points_by_season,
                points_summary,
                seasons,
            });
        }
        info!("scored {} players", reports.len());
        Ok(reports)
    }

    /// Processed seasons of every player in `table`, each career built on
    /// its own, grouped by player id.
    pub fn process_players(&self, table: &CareerTable) -> Result<Vec<ProcessedSeason>, PipelineError> {
        let mut seasons = Vec::with_capacity(table.len());
        for player_id in table.player_ids() {
            seasons.extend(self.process(&table.for_player(player_id))?.into_seasons());
        }
        Ok(seasons)
    }

    /// Fetch one player's career from `provider` and report on it.
    pub fn run_player<P: StatsProvider + ?Sized>(
        &self,
        provider: &P,
        player_id: &str,
    ) -> Result<PlayerReport, ProviderError> {
        let table = provider.career(player_id)?;
        let mut reports = self.run(&table)?;
        match reports.iter().position(|r| r.player_id == player_id) {
            Some(idx) => Ok(reports.swap_remove(idx)),
            None => Err(ProviderError::UnknownPlayer(player_id.to_string())),
        }
    }

    /// Risk score per player, ordered by player id.
    pub fn score_players(&self, table: &CareerTable) -> Result<Vec<(String, RiskAssessment)>, PipelineError> {
        Ok(self
            .run(table)?
            .into_iter()
            .map(|r| (r.player_id, r.risk))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, SeasonRecord};

    fn make_season(player: &str, season_id: &str, gp: f64, per: f64) -> SeasonRecord {
        SeasonRecord::new(player, season_id)
            .with(Column::Gp, gp)
            .with(Column::Min, gp * 30.0)
            .with(Column::Pts, gp * 20.0)
            .with(Column::Ast, gp * 5.0)
            .with(Column::Reb, gp * 7.0)
            .with(Column::PlayerEfficiencyRating, per)
            .with(Column::DraftYear, 2009.0)
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(PipelineOptions::new(2024))
    }

    #[test]
    fn empty_table_rejected() {
        let table = CareerTable::new(Vec::new()).unwrap();
        assert_eq!(pipeline().run(&table), Err(PipelineError::EmptyTable));
    }

    #[test]
    fn one_report_per_player() {
        let table = CareerTable::new(vec![
            make_season("201939", "2021-22", 64.0, 24.0),
            make_season("2544", "2021-22", 56.0, 27.0),
            make_season("201939", "2022-23", 56.0, 25.0),
            make_season("2544", "2022-23", 55.0, 23.0),
        ])
        .unwrap();
        let reports = pipeline().run(&table).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].player_id, "201939");
        assert_eq!(reports[1].player_id, "2544");
        assert_eq!(reports[1].seasons.len(), 2);
        assert_eq!(reports[1].points_by_season.len(), 2);
        assert!(reports.iter().all(|r| (0.0..=100.0).contains(&r.risk.score)));
        // Efficiency fell for one player and rose for the other.
        assert!(reports[1].risk.components.performance > reports[0].risk.components.performance);
    }

    #[test]
    fn run_player_uses_provider() {
        let table = CareerTable::new(vec![
            make_season("2544", "2021-22", 56.0, 27.0),
            make_season("201939", "2021-22", 64.0, 24.0),
        ])
        .unwrap();
        let report = pipeline().run_player(&table, "2544").unwrap();
        assert_eq!(report.player_id, "2544");
        assert_eq!(report.seasons.len(), 1);

        assert!(matches!(
            pipeline().run_player(&table, "1"),
            Err(ProviderError::UnknownPlayer(_))
        ));
    }

    #[test]
    fn score_players_pairs_ids_with_scores() {
        let table = CareerTable::new(vec![make_season("2544", "2021-22", 56.0, 27.0)]).unwrap();
        let scores = pipeline().score_players(&table).unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].0, "2544");
    }

    #[test]
    fn whole_table_scores_match_single_player_runs() {
        let table = CareerTable::new(vec![
            make_season("2544", "2021-22", 70.0, 24.0),
            make_season("2544", "2022-23", 70.0, 12.0),
            make_season("201939", "2022-23", 82.0, 18.0),
        ])
        .unwrap();
        for (player_id, risk) in pipeline().score_players(&table).unwrap() {
            let single = pipeline().run_player(&table, &player_id).unwrap();
            assert_eq!(risk, single.risk, "player {player_id}");
        }
    }

    #[test]
    fn process_players_keeps_careers_apart() {
        let table = CareerTable::new(vec![
            make_season("2544", "2021-22", 70.0, 24.0),
            make_season("2544", "2022-23", 70.0, 12.0),
            make_season("201939", "2022-23", 82.0, 18.0),
        ])
        .unwrap();
        let seasons = pipeline().process_players(&table).unwrap();
        assert_eq!(seasons.len(), 3);
        assert_eq!(seasons[0].record.player_id, "201939");
        assert_eq!(seasons[0].features.per_decline_severity, None);
        assert!(pipeline().process_players(&CareerTable::new(Vec::new()).unwrap()).unwrap().is_empty());
    }
}
