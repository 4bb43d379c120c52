// Per-season scoring averages and the career points summary shown next to
// the risk gauge.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::PipelineError;
use crate::model::{parse_season_year, CareerTable, Column};

/// Mean points of all rows sharing one season id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonPoints {
    pub season_id: String,
    pub average_points: f64,
}

/// Mean, highest and lowest of the per-season averages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointsSummary {
    pub average: f64,
    pub highest: f64,
    pub lowest: f64,
}

/// Average `PTS` per season id, in chronological order.
///
/// Rows without points are skipped; a season with no points at all is left
/// out. Requires the `SEASON_ID` and `PTS` columns.
pub fn average_points_by_season(table: &CareerTable) -> Result<Vec<SeasonPoints>, PipelineError> {
    table.require_columns(&[Column::SeasonId, Column::Pts])?;

    let mut totals: BTreeMap<(Option<i32>, &str), (f64, usize)> = BTreeMap::new();
    for r in table.records() {
        let Some(pts) = r.pts else {
            continue;
        };
        let key = (parse_season_year(&r.season_id), r.season_id.as_str());
        let entry = totals.entry(key).or_insert((0.0, 0));
        entry.0 += pts;
        entry.1 += 1;
    }

    Ok(totals
        .into_iter()
        .map(|((_, season_id), (sum, count))| SeasonPoints {
            season_id: season_id.to_string(),
            average_points: sum / count as f64,
        })
        .collect())
}

/// Summarize per-season averages. `None` when there are none.
pub fn summarize(seasons: &[SeasonPoints]) -> Option<PointsSummary> {
    if seasons.is_empty() {
        return None;
    }
    let values = seasons.iter().map(|s| s.average_points);
    let n = seasons.len() as f64;
    Some(PointsSummary {
        average: values.clone().sum::<f64>() / n,
        highest: values.clone().fold(f64::NEG_INFINITY, f64::max),
        lowest: values.fold(f64::INFINITY, f64::min),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
