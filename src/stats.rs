use crate::models::Stats;
use serde::Serialize;

/// Derived numbers shown next to the raw counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatLine {
    pub points: i64,
    pub rebounds: i64,
    pub field_goal_pct: String,
    pub three_point_pct: String,
    pub free_throw_pct: String,
}

pub fn build_stat_line(stats: &Stats) -> StatLine {
    StatLine {
        points: points(stats),
        rebounds: total_rebounds(stats),
        field_goal_pct: percentage(stats.fgm, stats.fga),
        three_point_pct: percentage(stats.tpm, stats.tpa),
        free_throw_pct: percentage(stats.ftm, stats.fta),
    }
}

/// Threes are counted inside FGM, so only the non-three makes are worth two.
/// Saturates at the `i64` bounds.
pub fn points(stats: &Stats) -> i64 {
    let two_pointers_made = stats.fgm.saturating_sub(stats.tpm);
    two_pointers_made
        .saturating_mul(2)
        .saturating_add(stats.tpm.saturating_mul(3))
        .saturating_add(stats.ftm)
}

pub fn percentage(made: i64, attempted: i64) -> String {
    if attempted == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", made as f64 / attempted as f64 * 100.0)
}

pub fn total_rebounds(stats: &Stats) -> i64 {
    stats.oreb.saturating_add(stats.dreb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_count_threes_inside_field_goals() {
        let stats = Stats {
            fgm: 10,
            tpm: 3,
            ftm: 4,
            ..Stats::default()
        };
        assert_eq!(points(&stats), 27);
    }

    #[test]
    fn percentage_formats_one_decimal() {
        assert_eq!(percentage(0, 0), "0.0%");
        assert_eq!(percentage(3, 10), "30.0%");
        assert_eq!(percentage(1, 3), "33.3%");
        assert_eq!(percentage(2, 3), "66.7%");
        assert_eq!(percentage(5, 5), "100.0%");
    }

    #[test]
    fn stat_line_combines_rebounds() {
        let stats = Stats {
            oreb: 2,
            dreb: 5,
            ftm: 1,
            fta: 2,
            ..Stats::default()
        };
        let line = build_stat_line(&stats);
        assert_eq!(line.rebounds, 7);
        assert_eq!(line.points, 1);
        assert_eq!(line.free_throw_pct, "50.0%");
        assert_eq!(line.field_goal_pct, "0.0%");
    }

    #[test]
    fn huge_counters_saturate() {
        let stats = Stats {
            fgm: i64::MAX,
            oreb: i64::MAX,
            dreb: 1,
            ..Stats::default()
        };
        assert_eq!(points(&stats), i64::MAX);
        assert_eq!(total_rebounds(&stats), i64::MAX);
    }
}
