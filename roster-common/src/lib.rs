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

mod error;
mod prompt;
mod roster;
mod stream;

use serde::{Deserialize, Serialize};

pub use error::{ErrorKind, PipelineError};
pub use prompt::{DEFAULT_INSTRUCTIONS, Encoder, GenerationConfig, encode};
pub use roster::{extract_completion_text, parse_and_validate};
pub use stream::{decode_chunks, decode_reader};

pub const MAX_ROSTER_PLAYERS: usize = 5;
pub const DEFAULT_MODEL_ID: &str = "amazon.titan-text-express-v1";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const USER_MESSAGE_REQUIRED: &str = "User message is required";

/// Inbound chat submission from the browser.
///
/// A missing `userMessage` deserializes to an empty string so that it is
/// rejected by the same validation path as a blank one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub user_message: String,
}

/// Request description handed to the model provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInvocation {
    pub model_id: String,
    pub content_type: String,
    pub accept: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Metrics {
    pub impact: f64,
    pub flexibility: f64,
    pub consistency: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerRecord {
    pub ign: String,
    pub name: String,
    pub team: String,
    pub role: String,
    pub agents: Vec<String>,
    pub metrics: Metrics,
    /// URL to a player portrait; empty when the model omitted it.
    pub image: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RosterResult {
    pub player_data: Vec<PlayerRecord>,
    pub additional_output: String,
}

/// Reject empty or whitespace-only chat messages.
pub fn validate_user_message(user_message: &str) -> Result<(), PipelineError> {
    if user_message.trim().is_empty() {
        return Err(PipelineError::Validation(USER_MESSAGE_REQUIRED.to_string()));
    }
    Ok(())
}
