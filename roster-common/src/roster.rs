// Copyright (C) 2026 StarHuntingGames
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::{MAX_ROSTER_PLAYERS, Metrics, PipelineError, PlayerRecord, RosterResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterWire {
    player_data: Vec<Value>,
    additional_output: String,
}

#[derive(Debug, Deserialize)]
struct PlayerWire {
    ign: String,
    name: String,
    team: String,
    role: String,
    agents: Vec<String>,
    #[serde(default)]
    metrics: Option<Metrics>,
    #[serde(default)]
    image: Option<String>,
}

impl From<PlayerWire> for PlayerRecord {
    fn from(wire: PlayerWire) -> Self {
        Self {
            ign: wire.ign,
            name: wire.name,
            team: wire.team,
            role: wire.role,
            agents: wire.agents,
            metrics: wire.metrics.unwrap_or_default(),
            image: wire.image.unwrap_or_default(),
        }
    }
}

/// Strictly parse model output into a roster.
///
/// Rosters longer than [`MAX_ROSTER_PLAYERS`] are truncated to their first
/// entries; the dropped entries are not validated.
pub fn parse_and_validate(raw: &str) -> Result<RosterResult, PipelineError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| PipelineError::malformed(format!("response is not valid JSON: {e}"), raw))?;
    if !value.is_object() {
        return Err(PipelineError::malformed("response must be a JSON object", raw));
    }

    let wire: RosterWire = serde_json::from_value(value)
        .map_err(|e| PipelineError::malformed(format!("roster shape is invalid: {e}"), raw))?;

    let total = wire.player_data.len();
    if total > MAX_ROSTER_PLAYERS {
        warn!(
            total,
            kept = MAX_ROSTER_PLAYERS,
            "model returned too many players; truncating roster"
        );
    }

    let mut player_data = Vec::with_capacity(total.min(MAX_ROSTER_PLAYERS));
    for (index, entry) in wire
        .player_data
        .into_iter()
        .take(MAX_ROSTER_PLAYERS)
        .enumerate()
    {
        let player: PlayerWire = serde_json::from_value(entry).map_err(|e| {
            PipelineError::malformed(format!("playerData[{index}] is invalid: {e}"), raw)
        })?;
        player_data.push(player.into());
    }

    Ok(RosterResult {
        player_data,
        additional_output: wire.additional_output,
    })
}

/// Pull the generated text out of a provider response body.
///
/// Titan bodies carry the text in `results[0].outputText`; any other body is
/// treated as the generated text itself. Markdown fences and prose around the
/// first JSON object are stripped before the text is returned.
pub fn extract_completion_text(raw: &str) -> Result<String, PipelineError> {
    let envelope = serde_json::from_str::<Value>(raw).ok().filter(is_titan_envelope);

    let text = match envelope {
        Some(envelope) => envelope
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
            .and_then(|first| first.get("outputText"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or_else(|| PipelineError::malformed("provider returned no output text", raw))?,
        None => raw.trim().to_string(),
    };

    Ok(isolate_json_object(strip_code_fence(&text)).to_string())
}

fn is_titan_envelope(value: &Value) -> bool {
    value.get("playerData").is_none() && value.get("results").is_some_and(Value::is_array)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.trim_end().strip_suffix("```") else {
        return text;
    };
    // Drop the info string, e.g. "json".
    match body.split_once('\n') {
        Some((info, inner)) if !info.contains('{') => inner.trim(),
        _ => body.trim(),
    }
}

/// Slice out the first complete JSON value starting at the first `{`.
/// Text that does not hold one is returned unchanged for strict parsing.
fn isolate_json_object(text: &str) -> &str {
    let Some(start) = text.find('{') else {
        return text;
    };
    let candidate = &text[start..];
    let mut values = serde_json::Deserializer::from_str(candidate).into_iter::<Value>();
    match values.next() {
        Some(Ok(_)) => &candidate[..values.byte_offset()],
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    const TENZ_RESPONSE: &str = r#"{"playerData":[{"ign":"Tenz","name":"Tyson Ngo","team":"SEN","role":"Duelist","agents":["Jett"],"metrics":{"impact":90,"flexibility":70,"consistency":85}}],"additionalOutput":"Balanced roster"}"#;

    fn player(ign: &str) -> Value {
        json!({
            "ign": ign,
            "name": format!("{ign} Name"),
            "team": "FNC",
            "role": "Initiator",
            "agents": ["Sova", "Fade"],
            "metrics": {"impact": 80, "flexibility": 75.5, "consistency": 82},
            "image": format!("https://example.com/{ign}.png"),
        })
    }

    #[test]
    fn parses_single_player_roster() {
        let roster = parse_and_validate(TENZ_RESPONSE).unwrap();
        assert_eq!(roster.player_data.len(), 1);

        let tenz = &roster.player_data[0];
        assert_eq!(tenz.ign, "Tenz");
        assert_eq!(tenz.name, "Tyson Ngo");
        assert_eq!(tenz.agents, vec!["Jett".to_string()]);
        assert_eq!(tenz.metrics.impact, 90.0);
        assert_eq!(tenz.metrics.consistency, 85.0);
        assert_eq!(tenz.image, "");
        assert_eq!(roster.additional_output, "Balanced roster");
    }

    #[test]
    fn rejects_non_json_without_partial_data() {
        let err = parse_and_validate("not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert_eq!(err.raw_payload(), Some("not json"));
    }

    #[test]
    fn rejects_non_object_json() {
        let err = parse_and_validate("[1,2,3]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn truncates_to_first_five_players() {
        let players: Vec<Value> = (1..=7).map(|i| player(&format!("p{i}"))).collect();
        let raw = json!({"playerData": players, "additionalOutput": ""}).to_string();

        let roster = parse_and_validate(&raw).unwrap();
        let igns: Vec<&str> = roster.player_data.iter().map(|p| p.ign.as_str()).collect();
        assert_eq!(igns, vec!["p1", "p2", "p3", "p4", "p5"]);
        assert_eq!(roster.additional_output, "");
    }

    #[test]
    fn invalid_entries_past_the_limit_are_ignored() {
        let mut players: Vec<Value> = (1..=5).map(|i| player(&format!("p{i}"))).collect();
        players.push(json!({"ign": 42}));
        let raw = json!({"playerData": players, "additionalOutput": "ok"}).to_string();

        assert_eq!(parse_and_validate(&raw).unwrap().player_data.len(), 5);
    }

    #[test]
    fn missing_metrics_default_to_zero() {
        let mut entry = player("Derke");
        entry.as_object_mut().unwrap().remove("metrics");
        let raw = json!({"playerData": [entry], "additionalOutput": "x"}).to_string();

        let roster = parse_and_validate(&raw).unwrap();
        assert_eq!(roster.player_data[0].metrics, Metrics::default());
        assert_eq!(roster.player_data[0].metrics.impact, 0.0);
    }

    #[test]
    fn null_or_partial_metrics_are_filled_with_zero() {
        let mut null_metrics = player("Chronicle");
        null_metrics["metrics"] = Value::Null;
        let mut partial_metrics = player("Boaster");
        partial_metrics["metrics"] = json!({"impact": 64});
        let raw = json!({
            "playerData": [null_metrics, partial_metrics],
            "additionalOutput": "x"
        })
        .to_string();

        let roster = parse_and_validate(&raw).unwrap();
        assert_eq!(roster.player_data[0].metrics, Metrics::default());
        assert_eq!(
            roster.player_data[1].metrics,
            Metrics {
                impact: 64.0,
                flexibility: 0.0,
                consistency: 0.0
            }
        );
    }

    #[test]
    fn out_of_range_metrics_are_kept() {
        let mut entry = player("Aspas");
        entry["metrics"] = json!({"impact": 140, "flexibility": -5, "consistency": 100.5});
        let raw = json!({"playerData": [entry], "additionalOutput": ""}).to_string();

        let metrics = parse_and_validate(&raw).unwrap().player_data[0].metrics;
        assert_eq!(metrics.impact, 140.0);
        assert_eq!(metrics.flexibility, -5.0);
        assert_eq!(metrics.consistency, 100.5);
    }

    #[test]
    fn rejects_missing_required_player_fields() {
        let mut entry = player("Yay");
        entry.as_object_mut().unwrap().remove("team");
        let raw = json!({"playerData": [player("ok"), entry], "additionalOutput": ""}).to_string();

        let err = parse_and_validate(&raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert!(err.to_string().contains("playerData[1]"));
        assert!(err.to_string().contains("team"));
    }

    #[test]
    fn rejects_non_numeric_metrics_and_non_string_agents() {
        let mut bad_metric = player("a");
        bad_metric["metrics"]["impact"] = json!("high");
        let mut bad_agents = player("b");
        bad_agents["agents"] = json!(["Jett", 7]);

        for entry in [bad_metric, bad_agents] {
            let raw = json!({"playerData": [entry], "additionalOutput": ""}).to_string();
            assert_eq!(
                parse_and_validate(&raw).unwrap_err().kind(),
                ErrorKind::MalformedResponse
            );
        }
    }

    #[test]
    fn requires_top_level_fields() {
        for raw in [
            r#"{"additionalOutput":"x"}"#,
            r#"{"playerData":[]}"#,
            r#"{"playerData":{},"additionalOutput":"x"}"#,
            r#"{"playerData":[],"additionalOutput":null}"#,
        ] {
            assert_eq!(
                parse_and_validate(raw).unwrap_err().kind(),
                ErrorKind::MalformedResponse,
                "{raw}"
            );
        }
    }

    #[test]
    fn reparsing_serialized_roster_is_idempotent() {
        let players: Vec<Value> = (1..=6).map(|i| player(&format!("p{i}"))).collect();
        let raw = json!({"playerData": players, "additionalOutput": "Duelist heavy"}).to_string();

        let first = parse_and_validate(&raw).unwrap();
        let second = parse_and_validate(&serde_json::to_string(&first).unwrap()).unwrap();
        assert_eq!(first, second);

        let tenz = parse_and_validate(TENZ_RESPONSE).unwrap();
        let again = parse_and_validate(&serde_json::to_string(&tenz).unwrap()).unwrap();
        assert_eq!(tenz, again);
    }

    #[test]
    fn extracts_titan_output_text() {
        let body = json!({
            "inputTextTokenCount": 312,
            "results": [{
                "tokenCount": 120,
                "outputText": format!("\n{TENZ_RESPONSE}\n"),
                "completionReason": "FINISH"
            }]
        })
        .to_string();

        let text = extract_completion_text(&body).unwrap();
        assert_eq!(text, TENZ_RESPONSE);
        assert_eq!(parse_and_validate(&text).unwrap().player_data[0].ign, "Tenz");
    }

    #[test]
    fn passes_plain_roster_through() {
        assert_eq!(extract_completion_text(TENZ_RESPONSE).unwrap(), TENZ_RESPONSE);
    }

    #[test]
    fn strips_code_fence_and_surrounding_prose() {
        let fenced = format!("```json\n{TENZ_RESPONSE}\n```");
        assert_eq!(extract_completion_text(&fenced).unwrap(), TENZ_RESPONSE);

        let chatty = format!("Here is your team:\n{TENZ_RESPONSE}\nGood luck!");
        assert_eq!(extract_completion_text(&chatty).unwrap(), TENZ_RESPONSE);
    }

    #[test]
    fn drops_prose_after_the_roster() {
        let body = json!({
            "results": [{
                "outputText": format!("{TENZ_RESPONSE}\n\nThis roster balances aim and utility."),
                "completionReason": "FINISH"
            }]
        })
        .to_string();

        let text = extract_completion_text(&body).unwrap();
        assert_eq!(text, TENZ_RESPONSE);
        assert_eq!(parse_and_validate(&text).unwrap().player_data.len(), 1);

        let fenced = format!("```json\n{TENZ_RESPONSE}\n```\nLet me know if you want swaps.");
        assert_eq!(extract_completion_text(&fenced).unwrap(), TENZ_RESPONSE);
    }

    #[test]
    fn braces_inside_strings_do_not_end_the_object() {
        let raw = r#"{"playerData":[],"additionalOutput":"use {smokes} early"} then more text }"#;
        let text = extract_completion_text(raw).unwrap();
        assert_eq!(text, r#"{"playerData":[],"additionalOutput":"use {smokes} early"}"#);
    }

    #[test]
    fn roster_with_extra_results_field_is_not_an_envelope() {
        let mut roster: Value = serde_json::from_str(TENZ_RESPONSE).unwrap();
        roster["results"] = json!("scouting notes");
        let raw = roster.to_string();

        let text = extract_completion_text(&raw).unwrap();
        let parsed = parse_and_validate(&text).unwrap();
        assert_eq!(parsed.player_data[0].ign, "Tenz");

        roster["results"] = json!([]);
        let raw = roster.to_string();
        let parsed = parse_and_validate(&extract_completion_text(&raw).unwrap()).unwrap();
        assert_eq!(parsed.additional_output, "Balanced roster");
    }

    #[test]
    fn empty_titan_results_are_malformed() {
        for body in [
            r#"{"inputTextTokenCount":3,"results":[]}"#,
            r#"{"results":[{"outputText":"   "}]}"#,
        ] {
            assert_eq!(
                extract_completion_text(body).unwrap_err().kind(),
                ErrorKind::MalformedResponse
            );
        }
    }

    #[test]
    fn non_json_text_is_returned_for_strict_parsing() {
        let text = extract_completion_text("not json").unwrap();
        assert_eq!(text, "not json");
        assert!(parse_and_validate(&text).is_err());
    }
}
