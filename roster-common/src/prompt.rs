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

use serde::Serialize;

use crate::{
    DEFAULT_MODEL_ID, JSON_CONTENT_TYPE, ModelInvocation, PipelineError, validate_user_message,
};

pub const DEFAULT_INSTRUCTIONS: &str = "You are a seasoned data scientist specializing in Valorant team formation.

Instructions: Based on the user's request, generate an optimal team composition for Valorant, including player details such as player name, actual name, current team, role, characters, and key contributions.";

const OUTPUT_SCHEMA: &str = r#"Return the data in JSON format with the following structure:

{
  "playerData": [
    {
      "ign": "string",
      "name": "string",
      "team": "string",
      "role": "string",
      "agents": ["string", "string"],
      "metrics": {
        "impact": number,
        "flexibility": number,
        "consistency": number
      },
      "image": "string" // URL to player image
    },
    // ... up to 5 players
  ],
  "additionalOutput": "string"
}"#;

/// Titan `textGenerationConfig`. Unset fields are left to the model defaults.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_token_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl GenerationConfig {
    pub fn is_empty(&self) -> bool {
        self.max_token_count.is_none() && self.temperature.is_none() && self.top_p.is_none()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanTextRequest<'a> {
    input_text: &'a str,
    #[serde(skip_serializing_if = "GenerationConfig::is_empty")]
    text_generation_config: &'a GenerationConfig,
}

/// Builds model invocations for roster requests.
///
/// Only the instruction preamble can be replaced. The output schema and the
/// quoted user request are always part of the prompt.
#[derive(Debug, Clone)]
pub struct Encoder {
    model_id: String,
    instructions: String,
    generation: GenerationConfig,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_ID)
    }
}

impl Encoder {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            generation: GenerationConfig::default(),
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn render_prompt(&self, user_message: &str) -> String {
        format!(
            "{}\n\n{}\n\nUser Request:\n\"{}\"\n\nResponse:",
            self.instructions.trim_end(),
            OUTPUT_SCHEMA,
            user_message
        )
    }

    pub fn encode(&self, user_message: &str) -> Result<ModelInvocation, PipelineError> {
        validate_user_message(user_message)?;

        let prompt = self.render_prompt(user_message);
        let body = serde_json::to_vec(&TitanTextRequest {
            input_text: &prompt,
            text_generation_config: &self.generation,
        })
        .map_err(|e| {
            PipelineError::Configuration(format!("failed to encode model request: {e}"))
        })?;

        Ok(ModelInvocation {
            model_id: self.model_id.clone(),
            content_type: JSON_CONTENT_TYPE.to_string(),
            accept: JSON_CONTENT_TYPE.to_string(),
            body,
        })
    }
}

/// Encode with the default model and instructions.
pub fn encode(user_message: &str) -> Result<ModelInvocation, PipelineError> {
    Encoder::default().encode(user_message)
}
