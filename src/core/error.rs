use std::error::Error;
use std::fmt;

use crate::core::backend::BackendError;

/// Why a prompt was rejected before anything was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreconditionFailure {
    EmptyPrompt,
    NoModelsAvailable,
    NoModelSelected,
    UnknownModel(String),
}

impl fmt::Display for PreconditionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreconditionFailure::EmptyPrompt => write!(f, "Type a message before sending"),
            PreconditionFailure::NoModelsAvailable => write!(
                f,
                "No models available. Please ensure Ollama is running and a model is pulled (e.g. `ollama pull llama3.2`)"
            ),
            PreconditionFailure::NoModelSelected => write!(f, "Please select a model first"),
            PreconditionFailure::UnknownModel(model) => {
                write!(f, "Model '{model}' is not available on the Ollama server")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Nothing was sent and no state changed.
    PreconditionFailed(PreconditionFailure),
    /// The chat request could not be opened. The user message is committed.
    Connectivity(BackendError),
    /// The stream broke mid-reply. The partial reply is committed.
    StreamInterrupted {
        partial: String,
        source: BackendError,
    },
    /// The user cancelled the turn. The partial reply is committed.
    Cancelled { partial: String },
    /// Another turn is already in flight.
    Busy,
}

impl ChatError {
    /// Whether the store was left untouched by the failed turn.
    pub fn left_store_untouched(&self) -> bool {
        matches!(self, ChatError::PreconditionFailed(_) | ChatError::Busy)
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::PreconditionFailed(reason) => write!(f, "{reason}"),
            ChatError::Connectivity(err) => write!(
                f,
                "Error communicating with Ollama: {err}. Please ensure the Ollama server is running"
            ),
            ChatError::StreamInterrupted { source, .. } => {
                write!(f, "Response interrupted: {source}")
            }
            ChatError::Cancelled { .. } => write!(f, "Response cancelled"),
            ChatError::Busy => write!(f, "A response is already streaming"),
        }
    }
}

impl Error for ChatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ChatError::Connectivity(err) | ChatError::StreamInterrupted { source: err, .. } => {
                Some(err)
            }
            _ => None,
        }
    }
}

impl From<PreconditionFailure> for ChatError {
    fn from(reason: PreconditionFailure) -> Self {
        ChatError::PreconditionFailed(reason)
    }
}
