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

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Configuration,
    Invocation,
    StreamRead,
    MalformedResponse,
}

impl ErrorKind {
    /// Status code the transport layer should answer with.
    pub fn http_status(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Configuration | Self::Invocation | Self::StreamRead | Self::MalformedResponse => {
                500
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("model invocation failed: {0}")]
    Invocation(String),

    #[error("response stream failed after {received} bytes: {message}")]
    StreamRead { received: usize, message: String },

    /// `raw` holds the offending payload for server-side diagnostics only.
    #[error("malformed model response: {reason}")]
    MalformedResponse { reason: String, raw: String },
}

impl PipelineError {
    pub fn malformed(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Invocation(_) => ErrorKind::Invocation,
            Self::StreamRead { .. } => ErrorKind::StreamRead,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
        }
    }

    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }

    pub fn raw_payload(&self) -> Option<&str> {
        match self {
            Self::MalformedResponse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
