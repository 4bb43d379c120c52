// Missing-data normalization.
//
// Deterministic gap-filling rules, applied in a fixed order by the pipeline:
// 1. Game-stat pass: seasons with no games played have zero counting stats.
// 2. Efficiency pass: missing ratings take the median of the player's
//    position group, or the league average when the group has none.
// 3. Draft-year fallback: missing draft years take the table median, or the
//    player's first season when the table has no draft years at all.
// 4. Safety net: remaining gaps in raw stat columns take the column median
//    before rates are derived; gaps left in engineered columns after feature
//    engineering take the median of the same player's seasons.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::efficiency::LEAGUE_AVERAGE_PER;
use crate::model::SeasonRecord;
use crate::stats::{median, median_of};

// ---------------------------------------------------------------------------
// Game-stat pass
// ---------------------------------------------------------------------------

/// Zero `PTS`, `AST`, `REB` and `MIN` for every season whose `GP` is zero or
/// missing. Returns the number of seasons touched.
pub fn zero_fill_inactive(records: &mut [SeasonRecord]) -> usize {
    let mut touched = 0;
    for r in records.iter_mut() {
        let inactive = match r.gp {
            None => true,
            Some(gp) => gp == 0.0,
        };
        if inactive {
            r.pts = Some(0.0);
            r.ast = Some(0.0);
            r.reb = Some(0.0);
            r.min = Some(0.0);
            touched += 1;
        }
    }
    if touched > 0 {
        debug!("zeroed counting stats for {} seasons without games", touched);
    }
    touched
}

// ---------------------------------------------------------------------------
// Efficiency pass
// ---------------------------------------------------------------------------

/// Fill missing efficiency ratings with the median of the record's position
/// group, computed over every record passed in.
///
/// Returns one flag per record: `true` where the rating was substituted.
/// A group with no ratings at all falls back to [`LEAGUE_AVERAGE_PER`].
pub fn impute_position_efficiency(records: &mut [SeasonRecord]) -> Vec<bool> {
    let mut by_position: HashMap<&str, Vec<f64>> = HashMap::new();
    for r in records.iter() {
        let group = by_position.entry(r.bio.position.as_str()).or_default();
        if let Some(per) = r.player_efficiency_rating {
            group.push(per);
        }
    }
    let medians: HashMap<String, f64> = by_position
        .into_iter()
        .map(|(position, values)| {
            let fill = median(&values).unwrap_or_else(|| {
                warn!(
                    "no efficiency ratings for position '{}'; using league average {}",
                    position, LEAGUE_AVERAGE_PER
                );
                LEAGUE_AVERAGE_PER
            });
            (position.to_string(), fill)
        })
        .collect();

    records
        .iter_mut()
        .map(|r| {
            if r.player_efficiency_rating.is_some() {
                return false;
            }
            let fill = medians
                .get(&r.bio.position)
                .copied()
                .unwrap_or(LEAGUE_AVERAGE_PER);
            r.player_efficiency_rating = Some(fill);
            true
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Draft-year fallback
// ---------------------------------------------------------------------------

/// Where a missing draft year comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftYearFallback {
    /// Median of the draft years present in the table, rounded to a whole
    /// year with halves going up: 2011 and 2012 give 2012, so filled seasons
    /// sit half a year off the exact median in `YEARS_FROM_DRAFT`.
    Numeric(i32),
    /// No draft year anywhere in the table: use the player's earliest season.
    EstimatedFromFirstSeason,
}

impl DraftYearFallback {
    /// Pick the strategy for a table. The median strategy wins whenever at
    /// least one record carries a draft year.
    pub fn for_records(records: &[SeasonRecord]) -> Self {
        match median_of(records.iter().map(|r| r.bio.draft_year.map(f64::from))) {
            Some(m) => DraftYearFallback::Numeric(m.round() as i32),
            None => DraftYearFallback::EstimatedFromFirstSeason,
        }
    }

    /// The year to use for a player whose earliest season starts in
    /// `first_season_year`.
    pub fn year(self, first_season_year: i32) -> i32 {
        match self {
            DraftYearFallback::Numeric(y) => y,
            DraftYearFallback::EstimatedFromFirstSeason => first_season_year,
        }
    }
}

/// Fill missing draft years in place. `first_season_year` maps a player id to
/// the leading year of that player's earliest season. Returns the strategy used.
pub fn fill_draft_years(
    records: &mut [SeasonRecord],
    first_season_year: &HashMap<String, i32>,
) -> DraftYearFallback {
    let fallback = DraftYearFallback::for_records(records);
    let mut filled = 0;
    for r in records.iter_mut().filter(|r| r.bio.draft_year.is_none()) {
        // Records with an unparseable season never reach this point: the
        // feature builder rejects them first.
        if let Some(&first) = first_season_year.get(&r.player_id) {
            r.bio.draft_year = Some(fallback.year(first));
            filled += 1;
        }
    }
    if filled > 0 {
        warn!("filled {} missing draft years using {:?}", filled, fallback);
    }
    fallback
}

// ---------------------------------------------------------------------------
// Safety net
// ---------------------------------------------------------------------------

/// Fill each remaining gap with its column's median over `rows`.
///
/// `cells` lists a row's optional numeric cells in a fixed column order.
/// Medians are computed per column before that column is filled. A column
/// with no values keeps its gaps. Returns the number of cells filled.
pub fn fill_column_medians<T>(
    rows: &mut [T],
    cells: impl Fn(&mut T) -> Vec<&mut Option<f64>>,
) -> usize {
    let width = rows.first_mut().map(|row| cells(row).len()).unwrap_or(0);
    let mut filled = 0;
    for column in 0..width {
        let Some(fill) = median_of(rows.iter_mut().map(|row| *cells(row)[column])) else {
            continue;
        };
        for row in rows.iter_mut() {
            let mut row_cells = cells(row);
            let cell = &mut row_cells[column];
            if cell.is_none() {
                **cell = Some(fill);
                filled += 1;
            }
        }
    }
    filled
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;

    fn season(player: &str, season_id: &str) -> SeasonRecord {
        SeasonRecord::new(player, season_id)
    }

    #[test]
    fn zero_games_zeroes_counting_stats() {
        let mut records = vec![
            season("1", "2019-20")
                .with(Column::Gp, 0.0)
                .with(Column::Pts, 12.0)
                .with(Column::Min, 40.0),
            season("1", "2020-21")
                .with(Column::Gp, 60.0)
                .with(Column::Pts, 12.0),
            season("1", "2021-22").with(Column::Pts, 3.0),
        ];
        assert_eq!(zero_fill_inactive(&mut records), 2);

        assert_eq!(records[0].pts, Some(0.0));
        assert_eq!(records[0].ast, Some(0.0));
        assert_eq!(records[0].reb, Some(0.0));
        assert_eq!(records[0].min, Some(0.0));
        assert_eq!(records[1].pts, Some(12.0));
        assert_eq!(records[1].ast, None);
        assert_eq!(records[2].pts, Some(0.0));
    }

    #[test]
    fn efficiency_imputed_from_position_median() {
        let mut records = vec![
            season("1", "2019-20").with_position("Guard").with(Column::PlayerEfficiencyRating, 10.0),
            season("2", "2019-20").with_position("Guard").with(Column::PlayerEfficiencyRating, 20.0),
            season("3", "2019-20").with_position("Guard"),
            season("4", "2019-20").with_position("Center").with(Column::PlayerEfficiencyRating, 25.0),
            season("5", "2019-20").with_position("Center"),
        ];
        let flags = impute_position_efficiency(&mut records);
        assert_eq!(flags, vec![false, false, true, false, true]);
        assert_eq!(records[2].player_efficiency_rating, Some(15.0));
        assert_eq!(records[4].player_efficiency_rating, Some(25.0));
        assert_eq!(records[0].player_efficiency_rating, Some(10.0));
    }

    #[test]
    fn empty_position_group_uses_league_average() {
        let mut records = vec![
            season("1", "2019-20").with_position("Forward"),
            season("1", "2020-21").with_position("Forward"),
            season("2", "2019-20").with_position("Guard").with(Column::PlayerEfficiencyRating, 30.0),
        ];
        let flags = impute_position_efficiency(&mut records);
        assert_eq!(flags, vec![true, true, false]);
        assert_eq!(records[0].player_efficiency_rating, Some(LEAGUE_AVERAGE_PER));
        assert_eq!(records[1].player_efficiency_rating, Some(LEAGUE_AVERAGE_PER));
    }

    #[test]
    fn draft_year_median_strategy() {
        let mut records = vec![
            season("1", "2012-13").with(Column::DraftYear, 2010.0),
            season("2", "2015-16"),
            season("3", "2013-14").with(Column::DraftYear, 2013.0),
            season("4", "2016-17").with(Column::DraftYear, 2014.0),
        ];
        let firsts: HashMap<String, i32> = [("2".to_string(), 2015)].into_iter().collect();
        let fallback = fill_draft_years(&mut records, &firsts);
        assert_eq!(fallback, DraftYearFallback::Numeric(2013));
        assert_eq!(records[1].bio.draft_year, Some(2013));
        assert_eq!(records[0].bio.draft_year, Some(2010));
    }

    #[test]
    fn draft_year_median_rounds_half_years_up() {
        let mut records = vec![
            season("1", "2012-13").with(Column::DraftYear, 2011.0),
            season("2", "2013-14").with(Column::DraftYear, 2012.0),
            season("3", "2014-15"),
        ];
        let firsts: HashMap<String, i32> = [("3".to_string(), 2014)].into_iter().collect();
        assert_eq!(fill_draft_years(&mut records, &firsts), DraftYearFallback::Numeric(2012));
        assert_eq!(records[2].bio.draft_year, Some(2012));
    }

    #[test]
    fn draft_year_estimated_from_first_season() {
        let mut records = vec![season("9", "2005-06"), season("9", "2003-04")];
        let firsts: HashMap<String, i32> = [("9".to_string(), 2003)].into_iter().collect();
        let fallback = fill_draft_years(&mut records, &firsts);
        assert_eq!(fallback, DraftYearFallback::EstimatedFromFirstSeason);
        assert_eq!(records[0].bio.draft_year, Some(2003));
        assert_eq!(records[1].bio.draft_year, Some(2003));
    }

    #[test]
    fn fallback_year_selection() {
        assert_eq!(DraftYearFallback::Numeric(2001).year(2010), 2001);
        assert_eq!(DraftYearFallback::EstimatedFromFirstSeason.year(2010), 2010);
    }

    #[derive(Debug, Default)]
    struct Row {
        a: Option<f64>,
        b: Option<f64>,
    }

    fn row_cells(row: &mut Row) -> Vec<&mut Option<f64>> {
        vec![&mut row.a, &mut row.b]
    }

    #[test]
    fn column_medians_fill_gaps_only() {
        let mut rows = vec![
            Row { a: Some(1.0), b: None },
            Row { a: None, b: None },
            Row { a: Some(3.0), b: None },
            Row { a: Some(8.0), b: None },
        ];
        let filled = fill_column_medians(&mut rows, row_cells);
        assert_eq!(filled, 1);
        assert_eq!(rows[1].a, Some(3.0));
        assert_eq!(rows[0].a, Some(1.0));
        assert!(rows.iter().all(|r| r.b.is_none()));
    }
}
