//! Natural-language game summaries from a hosted text-generation service.

use crate::config::SummaryConfig;
use crate::models::{Game, LogEntry, Stats};
use crate::session::Session;
use crate::stats::build_stat_line;
use async_trait::async_trait;
use futures_util::{StreamExt, stream::BoxStream};
use reqwest::{Client, Url};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, warn};
use uuid::Uuid;

/// Log lines included in a prompt, most recent ones.
pub const PROMPT_LOG_LIMIT: usize = 30;

pub type FragmentStream = BoxStream<'static, Result<String, SummaryError>>;

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("summary service is not configured (set GEMINI_API_KEY)")]
    NotConfigured,
    #[error("summary request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("summary service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid summary response: {0}")]
    Payload(String),
}

#[async_trait]
pub trait SummaryBackend: Send + Sync {
    /// Starts generation; the stream yields text fragments in arrival order.
    async fn stream_summary(&self, prompt: &str) -> Result<FragmentStream, SummaryError>;
}

pub fn build_prompt(player_name: &str, game: &Game) -> String {
    let score_line = match (game.player_team_score, game.opposition_team_score, game.result()) {
        (Some(ours), Some(theirs), Some(result)) => format!(
            "The final score was {ours} to {theirs}, and their team {}.",
            result.as_str()
        ),
        _ => String::new(),
    };

    let recent: Vec<&LogEntry> = game.ledger.log().iter().take(PROMPT_LOG_LIMIT).collect();
    let log_lines = recent
        .iter()
        .rev()
        .map(|entry| format!("- {}: {}", entry.timestamp, entry.action_text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You're an energetic and super positive basketball commentator, like someone from a fun \
sports highlight show. Give a hype-filled and motivating summary for a player named {player} after \
their game against {opponent} on {date}.
{score_line}

The audience is the player, who is in middle school, so keep the tone fun, exciting, and easy to \
understand. Use exclamation points and encouraging words!

Look at their final stats and the recent plays from the game log.
- Celebrate the awesome things they did! What were their biggest highlights?
- Point out their hustle and smart plays.
- Gently suggest one or two things they can practice to become an even more unstoppable force on \
the court next time. Frame it as a fun challenge!

Keep it concise, positive, and full of energy! No more than 150 words!

**Here are the stats:**
{stats}

**Recent Action from the Game:**
{log_lines}

**Hype Summary:**",
        player = player_name,
        opponent = game.opposition,
        date = game.game_date,
        stats = format_stats(game.ledger.stats()),
    )
}

fn format_stats(stats: &Stats) -> String {
    let line = build_stat_line(stats);
    [
        format!("- Points: {}", line.points),
        format!("- Rebounds: {} ({} OREB, {} DREB)", line.rebounds, stats.oreb, stats.dreb),
        format!("- Assists: {}", stats.ast),
        format!("- Steals: {}", stats.stl),
        format!("- Blocks: {}", stats.blk),
        format!("- Turnovers: {}", stats.tov),
        format!("- Fouls: {}", stats.pf),
        format!("- Field Goals: {}/{} ({})", stats.fgm, stats.fga, line.field_goal_pct),
        format!("- 3-Pointers: {}/{} ({})", stats.tpm, stats.tpa, line.three_point_pct),
        format!("- Free Throws: {}/{} ({})", stats.ftm, stats.fta, line.free_throw_pct),
    ]
    .join("\n")
}

pub struct GeminiClient {
    client: Client,
    url: Url,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &SummaryConfig) -> Result<Self, SummaryError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: resolve_stream_endpoint(&config.endpoint, &config.model)?,
            api_key: config.api_key.clone(),
        })
    }
}

fn resolve_stream_endpoint(endpoint: &str, model: &str) -> Result<Url, SummaryError> {
    let raw = if endpoint.contains(":streamGenerateContent") {
        endpoint.to_string()
    } else {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent",
            endpoint.trim_end_matches('/'),
            model
        )
    };
    let mut url = Url::parse(&raw)
        .map_err(|e| SummaryError::Payload(format!("invalid endpoint {raw}: {e}")))?;
    if !url.query_pairs().any(|(k, _)| k == "alt") {
        url.query_pairs_mut().append_pair("alt", "sse");
    }
    Ok(url)
}

#[async_trait]
impl SummaryBackend for GeminiClient {
    async fn stream_summary(&self, prompt: &str) -> Result<FragmentStream, SummaryError> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0.7, "topP": 0.95 },
        });

        let response = self
            .client
            .post(self.url.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SummaryError::Status {
                status,
                body: truncate(&body, 320),
            });
        }

        let mut decoder = SseDecoder::default();
        let fragments = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => decoder.push(&bytes),
                Err(err) => vec![Err(SummaryError::from(err))],
            })
            .flat_map(futures_util::stream::iter);
        Ok(fragments.boxed())
    }
}

/// Incremental `text/event-stream` decoder yielding the text of each event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<String, SummaryError>> {
        self.buffer.extend_from_slice(bytes);
        let mut out = Vec::new();
        // Split on raw bytes so a multi-byte character spanning two chunks stays intact.
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let Some(data) = line.trim_end().strip_prefix("data:") else {
                continue;
            };
            match candidate_text(data.trim()) {
                Ok(text) if text.is_empty() => {}
                other => out.push(other),
            }
        }
        out
    }
}

fn candidate_text(data: &str) -> Result<String, SummaryError> {
    let body: Value =
        serde_json::from_str(data).map_err(|e| SummaryError::Payload(e.to_string()))?;
    if let Some(message) = body["error"]["message"].as_str() {
        return Err(SummaryError::Payload(message.to_string()));
    }
    Ok(body["candidates"]
        .as_array()
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate["content"]["parts"].as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect::<String>()
        })
        .unwrap_or_default())
}

fn truncate(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((index, _)) => format!("{}...", &value[..index]),
        None => value.to_string(),
    }
}

/// The game a summary request was started for. Fragments are only ever
/// written to this game, even if the active player or game changes meanwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryTarget {
    pub player_id: Uuid,
    pub game_id: Uuid,
}

/// Feeds fragments into the target game's summary as they arrive.
///
/// The first error replaces the summary with a visible `Error: ...` text.
/// Returns the final summary, or `None` when the game disappeared.
pub async fn accumulate(
    session: &Mutex<Session>,
    target: SummaryTarget,
    started: Result<FragmentStream, SummaryError>,
) -> Option<String> {
    let mut fragments = match started {
        Ok(fragments) => fragments,
        Err(err) => return fail(session, target, &err).await,
    };

    while let Some(fragment) = fragments.next().await {
        match fragment {
            Ok(text) => {
                let mut session = session.lock().await;
                if session
                    .append_summary(target.player_id, target.game_id, &text)
                    .is_err()
                {
                    warn!(game = %target.game_id, "game removed while summarizing, dropping output");
                    return None;
                }
            }
            Err(err) => return fail(session, target, &err).await,
        }
    }

    let session = session.lock().await;
    session
        .find_game(target.player_id, target.game_id)
        .ok()
        .map(|game| game.summary.clone())
}

async fn fail(
    session: &Mutex<Session>,
    target: SummaryTarget,
    err: &SummaryError,
) -> Option<String> {
    error!(game = %target.game_id, "summary generation failed: {err}");
    let mut session = session.lock().await;
    session
        .fail_summary(target.player_id, target.game_id, &err.to_string())
        .ok()?;
    session
        .find_game(target.player_id, target.game_id)
        .ok()
        .map(|game| game.summary.clone())
}
