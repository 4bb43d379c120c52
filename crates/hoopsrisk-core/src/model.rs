// Season records and the career table handed over by the stats provider.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Position label used when the provider does not supply one.
pub const UNKNOWN_POSITION: &str = "Unknown";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// A raw column the stats provider may supply. The string forms are the
/// provider's column headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Column {
    PlayerId,
    SeasonId,
    Gp,
    Min,
    Pts,
    Ast,
    Reb,
    Fga,
    Fgm,
    Fta,
    Ftm,
    Tov,
    Stl,
    Blk,
    PlayerEfficiencyRating,
    DraftYear,
    DraftRound,
    DraftNumber,
    Height,
    Weight,
    Position,
}

impl Column {
    pub const ALL: [Column; 21] = [
        Column::PlayerId,
        Column::SeasonId,
        Column::Gp,
        Column::Min,
        Column::Pts,
        Column::Ast,
        Column::Reb,
        Column::Fga,
        Column::Fgm,
        Column::Fta,
        Column::Ftm,
        Column::Tov,
        Column::Stl,
        Column::Blk,
        Column::PlayerEfficiencyRating,
        Column::DraftYear,
        Column::DraftRound,
        Column::DraftNumber,
        Column::Height,
        Column::Weight,
        Column::Position,
    ];

    /// Counting stats stored as optional numbers on a record.
    pub const COUNTING: [Column; 12] = [
        Column::Gp,
        Column::Min,
        Column::Pts,
        Column::Ast,
        Column::Reb,
        Column::Fga,
        Column::Fgm,
        Column::Fta,
        Column::Ftm,
        Column::Tov,
        Column::Stl,
        Column::Blk,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Column::PlayerId => "PLAYER_ID",
            Column::SeasonId => "SEASON_ID",
            Column::Gp => "GP",
            Column::Min => "MIN",
            Column::Pts => "PTS",
            Column::Ast => "AST",
            Column::Reb => "REB",
            Column::Fga => "FGA",
            Column::Fgm => "FGM",
            Column::Fta => "FTA",
            Column::Ftm => "FTM",
            Column::Tov => "TOV",
            Column::Stl => "STL",
            Column::Blk => "BLK",
            Column::PlayerEfficiencyRating => "PLAYER_EFFICIENCY_RATING",
            Column::DraftYear => "DRAFT_YEAR",
            Column::DraftRound => "DRAFT_ROUND",
            Column::DraftNumber => "DRAFT_NUMBER",
            Column::Height => "HEIGHT",
            Column::Weight => "WEIGHT",
            Column::Position => "POSITION",
        }
    }

    /// Parse a provider header (case-insensitive, surrounding whitespace ignored).
    pub fn from_header(header: &str) -> Option<Column> {
        let upper = header.trim().to_uppercase();
        Column::ALL.into_iter().find(|c| c.as_str() == upper)
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Biographical attributes. Constant across a player's seasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biography {
    #[serde(rename = "DRAFT_YEAR")]
    pub draft_year: Option<i32>,
    #[serde(rename = "DRAFT_ROUND")]
    pub draft_round: Option<String>,
    #[serde(rename = "DRAFT_NUMBER")]
    pub draft_number: Option<String>,
    #[serde(rename = "HEIGHT")]
    pub height: Option<String>,
    #[serde(rename = "WEIGHT")]
    pub weight: Option<f64>,
    #[serde(rename = "POSITION")]
    pub position: String,
}

impl Default for Biography {
    fn default() -> Self {
        Self {
            draft_year: None,
            draft_round: None,
            draft_number: None,
            height: None,
            weight: None,
            position: UNKNOWN_POSITION.to_string(),
        }
    }
}

/// One player-season of raw statistics. Every stat may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonRecord {
    #[serde(rename = "PLAYER_ID")]
    pub player_id: String,
    #[serde(rename = "SEASON_ID")]
    pub season_id: String,
    #[serde(rename = "GP")]
    pub gp: Option<f64>,
    #[serde(rename = "MIN")]
    pub min: Option<f64>,
    #[serde(rename = "PTS")]
    pub pts: Option<f64>,
    #[serde(rename = "AST")]
    pub ast: Option<f64>,
    #[serde(rename = "REB")]
    pub reb: Option<f64>,
    #[serde(rename = "FGA")]
    pub fga: Option<f64>,
    #[serde(rename = "FGM")]
    pub fgm: Option<f64>,
    #[serde(rename = "FTA")]
    pub fta: Option<f64>,
    #[serde(rename = "FTM")]
    pub ftm: Option<f64>,
    #[serde(rename = "TOV")]
    pub tov: Option<f64>,
    #[serde(rename = "STL")]
    pub stl: Option<f64>,
    #[serde(rename = "BLK")]
    pub blk: Option<f64>,
    #[serde(rename = "PLAYER_EFFICIENCY_RATING")]
    pub player_efficiency_rating: Option<f64>,
    #[serde(flatten)]
    pub bio: Biography,
}

impl SeasonRecord {
    /// An empty record: every stat absent, default biography.
    pub fn new(player_id: impl Into<String>, season_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            season_id: season_id.into(),
            gp: None,
            min: None,
            pts: None,
            ast: None,
            reb: None,
            fga: None,
            fgm: None,
            fta: None,
            ftm: None,
            tov: None,
            stl: None,
            blk: None,
            player_efficiency_rating: None,
            bio: Biography::default(),
        }
    }

    /// Leading 4-digit year of the season id (`"2019-20"` -> 2019).
    pub fn season_year(&self) -> Option<i32> {
        parse_season_year(&self.season_id)
    }

    /// Read a numeric column. Non-numeric columns return `None`.
    pub fn stat(&self, column: Column) -> Option<f64> {
        match column {
            Column::Gp => self.gp,
            Column::Min => self.min,
            Column::Pts => self.pts,
            Column::Ast => self.ast,
            Column::Reb => self.reb,
            Column::Fga => self.fga,
            Column::Fgm => self.fgm,
            Column::Fta => self.fta,
            Column::Ftm => self.ftm,
            Column::Tov => self.tov,
            Column::Stl => self.stl,
            Column::Blk => self.blk,
            Column::PlayerEfficiencyRating => self.player_efficiency_rating,
            Column::Weight => self.bio.weight,
            Column::DraftYear => self.bio.draft_year.map(f64::from),
            _ => None,
        }
    }

    /// Mutable slot for a numeric stat column, or `None` for columns that are
    /// not stored as `Option<f64>`.
    pub fn stat_mut(&mut self, column: Column) -> Option<&mut Option<f64>> {
        match column {
            Column::Gp => Some(&mut self.gp),
            Column::Min => Some(&mut self.min),
            Column::Pts => Some(&mut self.pts),
            Column::Ast => Some(&mut self.ast),
            Column::Reb => Some(&mut self.reb),
            Column::Fga => Some(&mut self.fga),
            Column::Fgm => Some(&mut self.fgm),
            Column::Fta => Some(&mut self.fta),
            Column::Ftm => Some(&mut self.ftm),
            Column::Tov => Some(&mut self.tov),
            Column::Stl => Some(&mut self.stl),
            Column::Blk => Some(&mut self.blk),
            Column::PlayerEfficiencyRating => Some(&mut self.player_efficiency_rating),
            Column::Weight => Some(&mut self.bio.weight),
            _ => None,
        }
    }

    /// Builder-style setter used by providers and tests.
    pub fn with(mut self, column: Column, value: f64) -> Self {
        match column {
            Column::DraftYear => self.bio.draft_year = Some(value.round() as i32),
            _ => {
                if let Some(slot) = self.stat_mut(column) {
                    *slot = Some(value);
                }
            }
        }
        self
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.bio.position = position.into();
        self
    }
}

/// Parse the leading 4-digit year of a `YYYY-YY` season id.
pub fn parse_season_year(season_id: &str) -> Option<i32> {
    let head = season_id.trim().get(..4)?;
    if !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    head.parse().ok()
}

// ---------------------------------------------------------------------------
// Career table
// ---------------------------------------------------------------------------

/// The season records for one or more players together with the set of
/// columns the provider actually supplied.
///
/// `(player_id, season_id)` is unique. Chronological order comes from the
/// leading year of `season_id`, never from insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CareerTable {
    columns: BTreeSet<Column>,
    records: Vec<SeasonRecord>,
}

impl CareerTable {
    /// Build a table whose schema carries every known column.
    pub fn new(records: Vec<SeasonRecord>) -> Result<Self, PipelineError> {
        Self::with_columns(Column::ALL, records)
    }

    /// Build a table with an explicit schema, as read from a provider header.
    pub fn with_columns(
        columns: impl IntoIterator<Item = Column>,
        records: Vec<SeasonRecord>,
    ) -> Result<Self, PipelineError> {
        let mut seen: HashSet<(&str, &str)> = HashSet::with_capacity(records.len());
        for r in &records {
            if !seen.insert((r.player_id.as_str(), r.season_id.as_str())) {
                return Err(PipelineError::DuplicateSeason {
                    player_id: r.player_id.clone(),
                    season_id: r.season_id.clone(),
                });
            }
        }
        Ok(Self {
            columns: columns.into_iter().collect(),
            records,
        })
    }

    pub fn records(&self) -> &[SeasonRecord] {
        &self.records
    }

    pub fn columns(&self) -> &BTreeSet<Column> {
        &self.columns
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fail with every absent column from `required`, in the order given.
    pub fn require_columns(&self, required: &[Column]) -> Result<(), PipelineError> {
        let missing: Vec<Column> = required
            .iter()
            .copied()
            .filter(|c| !self.columns.contains(c))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::MissingColumns { columns: missing })
        }
    }

    /// Distinct player ids, sorted.
    pub fn player_ids(&self) -> Vec<&str> {
        let ids: BTreeSet<&str> = self.records.iter().map(|r| r.player_id.as_str()).collect();
        ids.into_iter().collect()
    }

    /// Record indices grouped by player, each group in chronological order.
    ///
    /// Seasons sharing a year keep their insertion order. Records whose
    /// season id has no parseable year are reported as an error.
    pub fn chronological_groups(&self) -> Result<BTreeMap<&str, Vec<usize>>, PipelineError> {
        let mut groups: BTreeMap<&str, Vec<(i32, usize)>> = BTreeMap::new();
        for (idx, r) in self.records.iter().enumerate() {
            let year = r.season_year().ok_or_else(|| PipelineError::InvalidSeasonId {
                player_id: r.player_id.clone(),
                season_id: r.season_id.clone(),
            })?;
            groups.entry(r.player_id.as_str()).or_default().push((year, idx));
        }
        Ok(groups
            .into_iter()
            .map(|(player, mut seasons)| {
                seasons.sort_by_key(|&(year, _)| year);
                (player, seasons.into_iter().map(|(_, idx)| idx).collect())
            })
            .collect())
    }

    /// A new table restricted to one player's records, with the same schema.
    pub fn for_player(&self, player_id: &str) -> CareerTable {
        CareerTable {
            columns: self.columns.clone(),
            records: self
                .records
                .iter()
                .filter(|r| r.player_id == player_id)
                .cloned()
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
