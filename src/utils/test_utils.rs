use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use crate::api::{ChatChunk, ChatRequest};
use crate::core::backend::{BackendError, ChatBackend, ChunkStream};
use crate::core::message::Message;

/// What one `chat` call on a [`ScriptedBackend`] does.
#[derive(Debug, Clone)]
pub struct ChatScript {
    refuse: Option<BackendError>,
    items: Vec<Result<ChatChunk, BackendError>>,
    hang: bool,
}

impl ChatScript {
    pub fn fragments(parts: &[&str]) -> Self {
        Self::chunks(parts.iter().map(|p| ChatChunk::fragment(p)).collect())
    }

    pub fn chunks(chunks: Vec<ChatChunk>) -> Self {
        Self {
            refuse: None,
            items: chunks.into_iter().map(Ok).collect(),
            hang: false,
        }
    }

    /// The chat request fails before any stream opens.
    pub fn refuse(err: BackendError) -> Self {
        Self {
            refuse: Some(err),
            items: Vec::new(),
            hang: false,
        }
    }

    pub fn then_fail(mut self, err: BackendError) -> Self {
        self.items.push(Err(err));
        self
    }

    /// Keeps the stream open after the scripted items until cancelled.
    pub fn then_hang(mut self) -> Self {
        self.hang = true;
        self
    }
}

/// In-memory backend that replays scripted chat responses and counts calls.
pub struct ScriptedBackend {
    models: Result<Vec<String>, BackendError>,
    scripts: Mutex<VecDeque<ChatScript>>,
    requests: Mutex<Vec<ChatRequest>>,
    list_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn with_models(models: &[&str]) -> Self {
        Self::new(Ok(models.iter().map(|m| m.to_string()).collect()))
    }

    pub fn unreachable(err: BackendError) -> Self {
        Self::new(Err(err))
    }

    fn new(models: Result<Vec<String>, BackendError>) -> Self {
        Self {
            models,
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn script(self, script: ChatScript) -> Self {
        self.scripts
            .lock()
            .expect("scripts lock")
            .push_back(script);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.models.clone()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChunkStream, BackendError> {
        self.requests.lock().expect("requests lock").push(request);
        let script = self
            .scripts
            .lock()
            .expect("scripts lock")
            .pop_front()
            .unwrap_or_else(|| ChatScript::chunks(Vec::new()));

        if let Some(err) = script.refuse {
            return Err(err);
        }
        let items = stream::iter(script.items);
        if script.hang {
            Ok(items.chain(stream::pending()).boxed())
        } else {
            Ok(items.boxed())
        }
    }
}

pub fn create_test_messages() -> Vec<Message> {
    vec![
        Message::user("Hello"),
        Message::assistant("Hi there!"),
        Message::user("How are you?"),
        Message::assistant("I'm doing well, thank you for asking!"),
    ]
}
