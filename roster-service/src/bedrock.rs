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

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_bedrockruntime::{
    Client as BedrockClient, config::Region, error::DisplayErrorContext, primitives::Blob,
};
use bytes::Bytes;
use futures::{StreamExt, stream};
use roster_common::{ModelInvocation, PipelineError};
use tracing::info;

use crate::{
    config::ServiceConfig,
    pipeline::{ChunkStream, ModelInvoker},
};

/// `InvokeModel` client shared by every request for the life of the process.
#[derive(Clone)]
pub struct BedrockInvoker {
    client: BedrockClient,
}

impl BedrockInvoker {
    pub async fn from_config(config: &ServiceConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;
        info!(
            region = %config.region,
            endpoint = ?config.endpoint_url,
            "bedrock runtime client configured"
        );
        Self {
            client: BedrockClient::new(&sdk_config),
        }
    }
}

#[async_trait]
impl ModelInvoker for BedrockInvoker {
    async fn invoke(&self, invocation: &ModelInvocation) -> Result<ChunkStream, PipelineError> {
        let output = self
            .client
            .invoke_model()
            .model_id(&invocation.model_id)
            .content_type(&invocation.content_type)
            .accept(&invocation.accept)
            .body(Blob::new(invocation.body.clone()))
            .send()
            .await
            .map_err(|e| PipelineError::Invocation(DisplayErrorContext(&e).to_string()))?;

        Ok(body_chunks(output.body.into_inner()))
    }
}

/// `InvokeModel` returns the whole body at once; expose it as a one-chunk stream.
fn body_chunks(body: Vec<u8>) -> ChunkStream {
    stream::iter([Ok(Bytes::from(body))]).boxed()
}
