use crate::models::Game;
use crate::stats::build_stat_line;
use chrono::NaiveDate;

const HEADERS: [&str; 23] = [
    "Player",
    "Opponent",
    "Date",
    "Player Team Score",
    "Opponent Team Score",
    "PTS",
    "FGM",
    "FGA",
    "FG%",
    "3PM",
    "3PA",
    "3P%",
    "FTM",
    "FTA",
    "FT%",
    "OREB",
    "DREB",
    "REB",
    "AST",
    "STL",
    "BLK",
    "TOV",
    "PF",
];

pub fn generate_csv(player_name: &str, game: &Game) -> String {
    let stats = game.ledger.stats();
    let line = build_stat_line(stats);
    let score = |score: Option<u32>| score.map_or_else(|| "N/A".to_string(), |s| s.to_string());

    let summary = [
        player_name.to_string(),
        game.opposition.clone(),
        game.game_date.to_string(),
        score(game.player_team_score),
        score(game.opposition_team_score),
        line.points.to_string(),
        stats.fgm.to_string(),
        stats.fga.to_string(),
        line.field_goal_pct,
        stats.tpm.to_string(),
        stats.tpa.to_string(),
        line.three_point_pct,
        stats.ftm.to_string(),
        stats.fta.to_string(),
        line.free_throw_pct,
        stats.oreb.to_string(),
        stats.dreb.to_string(),
        line.rebounds.to_string(),
        stats.ast.to_string(),
        stats.stl.to_string(),
        stats.blk.to_string(),
        stats.tov.to_string(),
        stats.pf.to_string(),
    ];

    let mut csv = row(HEADERS);
    csv.push_str(&row(summary.iter().map(String::as_str)));
    csv.push_str("\n\nGame Log\nTimestamp,Action\n");
    for entry in game.ledger.chronological() {
        csv.push_str(&row([entry.timestamp.as_str(), entry.action_text.as_str()]));
    }
    csv
}

fn row<'a>(cells: impl IntoIterator<Item = &'a str>) -> String {
    let mut line = cells.into_iter().map(quote).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

/// `{player}_vs_{opponent}_{date}.csv`, names lowercased with every non-alphanumeric character replaced by `_`.
pub fn export_file_name(player_name: &str, opposition: &str, game_date: NaiveDate) -> String {
    format!(
        "{}_vs_{}_{}.csv",
        sanitize(player_name),
        sanitize(opposition),
        game_date
    )
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}
