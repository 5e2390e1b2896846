use crate::ledger::StatLedger;
use crate::stats::StatLine;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use uuid::Uuid;

/// The fixed counter set tracked for one player in one game.
///
/// The same shape doubles as a delta: each field is a signed adjustment and
/// zero means "untouched". Zero fields are left out when serialized so a
/// stored delta reads like a partial mapping (`{"FGM":1,"FGA":1}`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "UPPERCASE")]
pub struct Stats {
    #[serde(skip_serializing_if = "is_zero")]
    pub fgm: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub fga: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub tpm: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub tpa: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub ftm: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub fta: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub oreb: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub dreb: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub ast: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub stl: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub blk: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub tov: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub pf: i64,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl Stats {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    pub fn checked_add(self, rhs: Stats) -> Option<Stats> {
        self.try_zip_with(rhs, i64::checked_add)
    }

    pub fn checked_sub(self, rhs: Stats) -> Option<Stats> {
        self.try_zip_with(rhs, i64::checked_sub)
    }

    /// Field-wise absolute value; `None` if a field is `i64::MIN`.
    pub fn checked_abs(self) -> Option<Stats> {
        self.try_zip_with(Stats::default(), |value, _| value.checked_abs())
    }

    fn to_array(self) -> [i64; 13] {
        [
            self.fgm, self.fga, self.tpm, self.tpa, self.ftm, self.fta, self.oreb, self.dreb,
            self.ast, self.stl, self.blk, self.tov, self.pf,
        ]
    }

    fn from_array(values: [i64; 13]) -> Self {
        let [fgm, fga, tpm, tpa, ftm, fta, oreb, dreb, ast, stl, blk, tov, pf] = values;
        Self {
            fgm,
            fga,
            tpm,
            tpa,
            ftm,
            fta,
            oreb,
            dreb,
            ast,
            stl,
            blk,
            tov,
            pf,
        }
    }

    fn try_zip_with(self, other: Self, op: impl Fn(i64, i64) -> Option<i64>) -> Option<Self> {
        let (lhs, rhs) = (self.to_array(), other.to_array());
        let mut out = [0; 13];
        for (slot, (a, b)) in out.iter_mut().zip(lhs.into_iter().zip(rhs)) {
            *slot = op(a, b)?;
        }
        Some(Self::from_array(out))
    }

    fn zip_with(self, other: Self, op: impl Fn(i64, i64) -> i64) -> Self {
        Self {
            fgm: op(self.fgm, other.fgm),
            fga: op(self.fga, other.fga),
            tpm: op(self.tpm, other.tpm),
            tpa: op(self.tpa, other.tpa),
            ftm: op(self.ftm, other.ftm),
            fta: op(self.fta, other.fta),
            oreb: op(self.oreb, other.oreb),
            dreb: op(self.dreb, other.dreb),
            ast: op(self.ast, other.ast),
            stl: op(self.stl, other.stl),
            blk: op(self.blk, other.blk),
            tov: op(self.tov, other.tov),
            pf: op(self.pf, other.pf),
        }
    }
}

impl Add for Stats {
    type Output = Stats;

    fn add(self, rhs: Stats) -> Stats {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl Sub for Stats {
    type Output = Stats;

    fn sub(self, rhs: Stats) -> Stats {
        self.zip_with(rhs, |a, b| a - b)
    }
}

impl Neg for Stats {
    type Output = Stats;

    fn neg(self) -> Stats {
        Stats::default() - self
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, rhs: Stats) {
        *self = *self + rhs;
    }
}

impl SubAssign for Stats {
    fn sub_assign(&mut self, rhs: Stats) {
        *self = *self - rhs;
    }
}

impl<'a> std::iter::Sum<&'a Stats> for Stats {
    fn sum<I: Iterator<Item = &'a Stats>>(iter: I) -> Stats {
        iter.fold(Stats::default(), |acc, delta| acc + *delta)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: String,
    pub action_text: String,
    #[serde(rename = "statChanges")]
    pub delta: Stats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub photo: Option<String>,
}

impl Player {
    pub fn new(name: impl Into<String>, photo: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            photo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: Uuid,
    #[serde(flatten)]
    pub ledger: StatLedger,
    pub opposition: String,
    pub game_date: NaiveDate,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub player_team_score: Option<u32>,
    #[serde(default)]
    pub opposition_team_score: Option<u32>,
}

impl Game {
    pub fn new() -> Self {
        Self::on(Local::now().date_naive())
    }

    pub fn on(game_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            ledger: StatLedger::default(),
            opposition: "Opponent".to_string(),
            game_date,
            summary: String::new(),
            player_team_score: None,
            opposition_team_score: None,
        }
    }

    pub fn result(&self) -> Option<GameResult> {
        let (ours, theirs) = (self.player_team_score?, self.opposition_team_score?);
        Some(match ours.cmp(&theirs) {
            std::cmp::Ordering::Greater => GameResult::Won,
            std::cmp::Ordering::Less => GameResult::Lost,
            std::cmp::Ordering::Equal => GameResult::Tied,
        })
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Won,
    Lost,
    Tied,
}

impl GameResult {
    pub fn as_str(self) -> &'static str {
        match self {
            GameResult::Won => "won",
            GameResult::Lost => "lost",
            GameResult::Tied => "tied",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: crate::action::Action,
}

#[derive(Debug, Deserialize)]
pub struct LogRequest {
    pub label: String,
    pub delta: Stats,
}

#[derive(Debug, Default, Deserialize)]
pub struct GameInfoUpdate {
    pub opposition: Option<String>,
    pub game_date: Option<NaiveDate>,
    /// `Some(None)` clears the score, a missing field leaves it alone.
    #[serde(default, deserialize_with = "double_option")]
    pub player_team_score: Option<Option<u32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub opposition_team_score: Option<Option<u32>>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<u32>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<u32>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct PlayerRequest {
    pub name: String,
    #[serde(default)]
    pub photo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GameView {
    pub player: Player,
    pub game: Game,
    pub totals: StatLine,
    pub result: Option<GameResult>,
    pub read_only: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryItem {
    pub id: Uuid,
    pub opposition: String,
    pub game_date: NaiveDate,
    pub points: i64,
    pub player_team_score: Option<u32>,
    pub opposition_team_score: Option<u32>,
    pub result: Option<GameResult>,
    pub has_summary: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub players: Vec<Player>,
    pub active_player_id: Uuid,
    pub current: GameView,
    pub history: Vec<HistoryItem>,
}
