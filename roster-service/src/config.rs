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

use std::net::SocketAddr;

use anyhow::Context;
use roster_common::{DEFAULT_MODEL_ID, Encoder, GenerationConfig};
use serde::Deserialize;
use tracing::{info, warn};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_REGION: &str = "us-west-2";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub model_id: String,
    pub generation: GenerationConfig,
    pub instructions: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PromptConfigFile {
    instructions: Option<String>,
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("ROSTER_SERVICE_BIND")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("invalid ROSTER_SERVICE_BIND")?;

        let region = normalize_optional_string(lookup("AWS_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let endpoint_url = normalize_optional_string(lookup("BEDROCK_ENDPOINT"));

        // A blank model id is kept so each request can report it.
        let model_id = lookup("BEDROCK_MODEL_ID")
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());
        if model_id.is_empty() {
            warn!("BEDROCK_MODEL_ID is set but blank; roster requests will fail");
        }

        let generation = GenerationConfig {
            max_token_count: parse_env_number(&lookup, "BEDROCK_MAX_TOKENS"),
            temperature: parse_env_number(&lookup, "BEDROCK_TEMPERATURE"),
            top_p: parse_env_number(&lookup, "BEDROCK_TOP_P"),
        };

        let instructions = normalize_optional_string(lookup("ROSTER_PROMPT_CONFIG_PATH"))
            .and_then(|path| load_prompt_instructions(&path));

        Ok(Self {
            bind_addr,
            region,
            endpoint_url,
            model_id,
            generation,
            instructions,
        })
    }

    pub fn encoder(&self) -> Encoder {
        let encoder = Encoder::new(self.model_id.clone()).with_generation(self.generation);
        match &self.instructions {
            Some(instructions) => encoder.with_instructions(instructions.clone()),
            None => encoder,
        }
    }
}

fn parse_env_number<T, F>(lookup: &F, var_name: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = normalize_optional_string(lookup(var_name))?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = %var_name, value = %raw, "ignoring unparsable numeric setting");
            None
        }
    }
}

fn load_prompt_instructions(path: &str) -> Option<String> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(path = %path, error = %error, "failed to read roster prompt config path");
            return None;
        }
    };

    let parsed = match serde_yaml::from_str::<PromptConfigFile>(&raw) {
        Ok(parsed) => parsed,
        Err(error) => {
            warn!(path = %path, error = %error, "failed to parse roster prompt config yaml");
            return None;
        }
    };

    let Some(instructions) = normalize_optional_string(parsed.instructions) else {
        warn!(path = %path, "roster prompt config missing instructions; ignoring file");
        return None;
    };

    info!(
        path = %path,
        instructions_len = instructions.chars().count(),
        "loaded roster prompt config"
    );
    Some(instructions)
}

fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
}
