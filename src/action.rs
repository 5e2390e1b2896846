//! The tracker's buttons, each mapped to a fixed label and counter delta.
//!
//! Shots derive their delta from `(kind, made)` so an attempt is always
//! counted alongside a make and `made <= attempted` holds for every pair.

use crate::models::Stats;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotKind {
    Two,
    Three,
    FreeThrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shot {
    pub kind: ShotKind,
    pub made: bool,
}

impl Shot {
    pub fn delta(self) -> Stats {
        let made = i64::from(self.made);
        match self.kind {
            ShotKind::Two => Stats {
                fgm: made,
                fga: 1,
                ..Stats::default()
            },
            // A three is also a field goal; points rely on TPM being counted within FGM.
            ShotKind::Three => Stats {
                fgm: made,
                fga: 1,
                tpm: made,
                tpa: 1,
                ..Stats::default()
            },
            ShotKind::FreeThrow => Stats {
                ftm: made,
                fta: 1,
                ..Stats::default()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    TwoMade,
    TwoMissed,
    ThreeMade,
    ThreeMissed,
    FreeThrowMade,
    FreeThrowMissed,
    Assist,
    Steal,
    Block,
    Turnover,
    OffensiveRebound,
    DefensiveRebound,
    PersonalFoul,
}

impl Action {
    pub const ALL: [Action; 13] = [
        Action::TwoMade,
        Action::TwoMissed,
        Action::ThreeMade,
        Action::ThreeMissed,
        Action::FreeThrowMade,
        Action::FreeThrowMissed,
        Action::Assist,
        Action::Steal,
        Action::Block,
        Action::Turnover,
        Action::OffensiveRebound,
        Action::DefensiveRebound,
        Action::PersonalFoul,
    ];

    pub fn shot(self) -> Option<Shot> {
        let (kind, made) = match self {
            Action::TwoMade => (ShotKind::Two, true),
            Action::TwoMissed => (ShotKind::Two, false),
            Action::ThreeMade => (ShotKind::Three, true),
            Action::ThreeMissed => (ShotKind::Three, false),
            Action::FreeThrowMade => (ShotKind::FreeThrow, true),
            Action::FreeThrowMissed => (ShotKind::FreeThrow, false),
            _ => return None,
        };
        Some(Shot { kind, made })
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::TwoMade => "2-Point Shot Made",
            Action::TwoMissed => "2-Point Shot Missed",
            Action::ThreeMade => "3-Point Shot Made",
            Action::ThreeMissed => "3-Point Shot Missed",
            Action::FreeThrowMade => "Free Throw Made",
            Action::FreeThrowMissed => "Free Throw Missed",
            Action::Assist => "Assist",
            Action::Steal => "Steal",
            Action::Block => "Block",
            Action::Turnover => "Turnover",
            Action::OffensiveRebound => "Offensive Rebound",
            Action::DefensiveRebound => "Defensive Rebound",
            Action::PersonalFoul => "Personal Foul",
        }
    }

    pub fn delta(self) -> Stats {
        let mut delta = Stats::default();
        match self {
            Action::TwoMade
            | Action::TwoMissed
            | Action::ThreeMade
            | Action::ThreeMissed
            | Action::FreeThrowMade
            | Action::FreeThrowMissed => return self.shot().map(Shot::delta).unwrap_or(delta),
            Action::Assist => delta.ast = 1,
            Action::Steal => delta.stl = 1,
            Action::Block => delta.blk = 1,
            Action::Turnover => delta.tov = 1,
            Action::OffensiveRebound => delta.oreb = 1,
            Action::DefensiveRebound => delta.dreb = 1,
            Action::PersonalFoul => delta.pf = 1,
        }
        delta
    }

    pub fn token(self) -> &'static str {
        match self {
            Action::TwoMade => "two_made",
            Action::TwoMissed => "two_missed",
            Action::ThreeMade => "three_made",
            Action::ThreeMissed => "three_missed",
            Action::FreeThrowMade => "free_throw_made",
            Action::FreeThrowMissed => "free_throw_missed",
            Action::Assist => "assist",
            Action::Steal => "steal",
            Action::Block => "block",
            Action::Turnover => "turnover",
            Action::OffensiveRebound => "offensive_rebound",
            Action::DefensiveRebound => "defensive_rebound",
            Action::PersonalFoul => "personal_foul",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.token() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}
