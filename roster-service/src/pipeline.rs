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

use std::{io, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use roster_common::{
    ChatRequest, Encoder, ModelInvocation, PipelineError, RosterResult, decode_chunks,
    extract_completion_text, parse_and_validate, validate_user_message,
};
use tracing::info;

pub type ChunkStream = BoxStream<'static, Result<Bytes, io::Error>>;

/// Seam to the external model service.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(&self, invocation: &ModelInvocation) -> Result<ChunkStream, PipelineError>;
}

/// Runs one chat request through encode, invoke, decode and validate.
pub struct RosterPipeline {
    invoker: Arc<dyn ModelInvoker>,
    encoder: Encoder,
}

impl RosterPipeline {
    pub fn new(invoker: Arc<dyn ModelInvoker>, encoder: Encoder) -> Self {
        Self { invoker, encoder }
    }

    /// Single attempt; the first failing stage short-circuits.
    pub async fn handle(&self, request: &ChatRequest) -> Result<RosterResult, PipelineError> {
        validate_user_message(&request.user_message)?;
        if self.encoder.model_id().trim().is_empty() {
            return Err(PipelineError::Configuration(
                "BEDROCK_MODEL_ID is not configured".to_string(),
            ));
        }

        let invocation = self.encoder.encode(&request.user_message)?;
        info!(
            model_id = %invocation.model_id,
            request_bytes = invocation.body.len(),
            "invoking model"
        );

        let chunks = self.invoker.invoke(&invocation).await?;
        let raw = decode_chunks(chunks).await?;
        let text = extract_completion_text(&raw)?;
        let roster = parse_and_validate(&text)?;

        info!(
            response_bytes = raw.len(),
            players = roster.player_data.len(),
            "roster validated"
        );
        Ok(roster)
    }
}
