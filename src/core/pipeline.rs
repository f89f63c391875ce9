//! One chat turn: precondition check, user message, streamed reply, commit.
//!
//! A turn moves through [`TurnPhase`]s:
//!
//! ```text
//! Idle -> AwaitingPrecondition -> Streaming -> Committing -> Idle
//!                 |                   |
//!                 +----> Errored <----+
//! ```
//!
//! Every transition and every store mutation is published on the optional
//! event channel in the order it happens, so a UI can follow the turn
//! without touching the state the pipeline is mutating.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ChatOptions, ChatRequest};
use crate::core::accumulator::{accumulate, Termination};
use crate::core::backend::ChatBackend;
use crate::core::error::{ChatError, PreconditionFailure};
use crate::core::message::{to_api_messages, Message, Role};
use crate::core::registry::ModelRegistry;
use crate::core::state::AppState;
use crate::core::store::StoreChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingPrecondition,
    Streaming,
    Committing,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    PhaseChanged(TurnPhase),
    /// The full reply received so far.
    Display(String),
    StoreChanged(StoreChange),
}

/// A turn that streamed to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub conversation: usize,
    pub model: String,
    pub reply: String,
    pub fragments: usize,
}

#[derive(Clone)]
pub struct ChatPipeline {
    backend: Arc<dyn ChatBackend>,
    registry: Arc<ModelRegistry>,
    events: Option<mpsc::UnboundedSender<PipelineEvent>>,
    in_flight: Arc<AtomicBool>,
}

struct InFlightGuard(Arc<AtomicBool>);

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ChatPipeline {
    pub fn new(backend: Arc<dyn ChatBackend>, registry: Arc<ModelRegistry>) -> Self {
        Self {
            backend,
            registry,
            events: None,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// True while a turn started from this pipeline or any clone of it runs.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn publish(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn phase(&self, phase: TurnPhase) {
        debug!(?phase, "Turn phase");
        self.publish(PipelineEvent::PhaseChanged(phase));
    }

    fn check_preconditions(
        &self,
        state: &AppState,
        models: &[String],
    ) -> Result<String, PreconditionFailure> {
        if models.is_empty() {
            return Err(PreconditionFailure::NoModelsAvailable);
        }
        let model = state
            .selected_model()
            .ok_or(PreconditionFailure::NoModelSelected)?;
        if !models.iter().any(|m| m == model) {
            return Err(PreconditionFailure::UnknownModel(model.to_string()));
        }
        Ok(model.to_string())
    }

    /// Runs one full turn for `prompt` against the active conversation.
    ///
    /// Rejections (`Busy`, `PreconditionFailed`) leave `state` untouched.
    /// Once the user message is appended, every exit path commits the
    /// working transcript before returning.
    pub async fn submit(
        &self,
        state: &mut AppState,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, ChatError> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(ChatError::Busy)?;

        if prompt.trim().is_empty() {
            return Err(PreconditionFailure::EmptyPrompt.into());
        }

        self.phase(TurnPhase::AwaitingPrecondition);
        let models = self.registry.list_available().await;
        let model = match self.check_preconditions(state, &models) {
            Ok(model) => model,
            Err(reason) => {
                info!(%reason, "Prompt rejected");
                self.phase(TurnPhase::Errored);
                self.phase(TurnPhase::Idle);
                return Err(reason.into());
            }
        };

        let (conversation, created) = state.store.ensure_active();
        if created {
            self.publish(PipelineEvent::StoreChanged(StoreChange::Created(conversation)));
        }
        state.store.append_message(Message::user(prompt));
        self.publish(PipelineEvent::StoreChanged(StoreChange::Appended {
            conversation,
            role: Role::User,
        }));

        let request = ChatRequest {
            model: model.clone(),
            messages: to_api_messages(state.store.active_transcript()),
            stream: true,
            options: ChatOptions {
                temperature: state.temperature().value(),
            },
        };
        info!(
            model = %model,
            conversation,
            messages = request.messages.len(),
            "Starting chat turn"
        );

        self.phase(TurnPhase::Streaming);
        let stream = match self.backend.chat(request).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "Chat request failed");
                self.commit(state);
                self.phase(TurnPhase::Errored);
                self.phase(TurnPhase::Idle);
                return Err(ChatError::Connectivity(err));
            }
        };

        let outcome = accumulate(stream, cancel, |display| {
            self.publish(PipelineEvent::Display(display.to_string()))
        })
        .await;

        if matches!(outcome.termination, Termination::Completed) {
            self.phase(TurnPhase::Committing);
        }
        state
            .store
            .append_message(Message::assistant(outcome.text.clone()));
        self.publish(PipelineEvent::StoreChanged(StoreChange::Appended {
            conversation,
            role: Role::Assistant,
        }));
        self.commit(state);

        let result = match outcome.termination {
            Termination::Completed => {
                debug!(
                    fragments = outcome.fragments,
                    chars = outcome.text.len(),
                    "Chat turn complete"
                );
                Ok(TurnOutcome {
                    conversation,
                    model,
                    reply: outcome.text,
                    fragments: outcome.fragments,
                })
            }
            Termination::Failed(source) => {
                warn!(error = %source, fragments = outcome.fragments, "Chat stream interrupted");
                self.phase(TurnPhase::Errored);
                Err(ChatError::StreamInterrupted {
                    partial: outcome.text,
                    source,
                })
            }
            Termination::Cancelled => {
                info!(fragments = outcome.fragments, "Chat turn cancelled");
                self.phase(TurnPhase::Errored);
                Err(ChatError::Cancelled {
                    partial: outcome.text,
                })
            }
        };
        self.phase(TurnPhase::Idle);
        result
    }

    fn commit(&self, state: &mut AppState) {
        if let Some(index) = state.store.commit_active_transcript() {
            self.publish(PipelineEvent::StoreChanged(StoreChange::Committed(index)));
        }
    }
}
