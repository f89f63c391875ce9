//! Owns the session while the UI is idle and hands it to a background task
//! for the length of each turn.
//!
//! While a turn runs the UI has no `AppState` at all, only a snapshot taken
//! at submit time, so nothing the user does can touch the store or the
//! settings the pipeline is using. The task sends the state back together
//! with the turn result when it finishes.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::error::ChatError;
use crate::core::pipeline::{ChatPipeline, PipelineEvent, TurnOutcome};
use crate::core::registry::ModelRegistry;
use crate::core::session::SessionBootstrap;
use crate::core::state::AppState;
use crate::ui::chat_loop::keybindings::UiAction;
use crate::ui::renderer::RenderModel;
use crate::ui::view::{LiveTurn, Tab, ViewState};
use crate::utils::transcript_log::TranscriptLog;

pub(crate) type TurnResult = (AppState, Result<TurnOutcome, ChatError>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Quit,
}

const BUSY_HINT: &str = "Wait for the reply to finish (Esc to stop it)";

pub(crate) struct ChatController {
    pipeline: ChatPipeline,
    registry: Arc<ModelRegistry>,
    state: Option<AppState>,
    snapshot: AppState,
    cancel: Option<CancellationToken>,
    done_tx: mpsc::UnboundedSender<TurnResult>,
    transcript: TranscriptLog,
    logged_from: usize,
    host: String,
    pub(crate) view: ViewState,
}

impl ChatController {
    pub(crate) fn new(
        session: SessionBootstrap,
        events: mpsc::UnboundedSender<PipelineEvent>,
        done_tx: mpsc::UnboundedSender<TurnResult>,
    ) -> Self {
        let SessionBootstrap {
            host,
            registry,
            pipeline,
            state,
            transcript,
        } = session;

        let mut view = ViewState::default();
        if !registry.is_connected() {
            match registry.last_error() {
                Some(err) => view.error(format!(
                    "Cannot reach Ollama at {host}: {err}. Start it with `ollama serve`."
                )),
                None => view.error("No models installed. Pull one with `ollama pull llama3.2`."),
            }
        }

        Self {
            pipeline: pipeline.with_events(events),
            registry,
            snapshot: state.clone(),
            state: Some(state),
            cancel: None,
            done_tx,
            transcript,
            logged_from: 0,
            host,
            view,
        }
    }

    /// The live state when idle, otherwise the snapshot taken at submit.
    pub(crate) fn state(&self) -> &AppState {
        self.state.as_ref().unwrap_or(&self.snapshot)
    }

    pub(crate) fn is_streaming(&self) -> bool {
        self.state.is_none()
    }

    pub(crate) fn render_model(&self) -> RenderModel<'_> {
        RenderModel {
            state: self.state(),
            view: &self.view,
            registry: &self.registry,
            host: &self.host,
            transcript_status: self.transcript.status_string(),
            streaming: self.is_streaming(),
        }
    }

    pub(crate) fn apply(&mut self, action: UiAction) -> LoopControl {
        match action {
            UiAction::Quit => {
                if let Some(cancel) = &self.cancel {
                    cancel.cancel();
                }
                return LoopControl::Quit;
            }
            UiAction::CancelTurn => {
                if let Some(cancel) = &self.cancel {
                    cancel.cancel();
                }
            }
            UiAction::InsertChar(c) => self.view.input.push(c),
            UiAction::Backspace => {
                self.view.input.pop();
            }
            UiAction::ClearInput => self.view.input.clear(),
            UiAction::NextTab => self.view.tab = self.view.tab.next(),
            UiAction::Submit => self.submit(),
            UiAction::NewConversation
            | UiAction::PreviousConversation
            | UiAction::NextConversation
            | UiAction::CycleModel
            | UiAction::TemperatureDown
            | UiAction::TemperatureUp => self.adjust(action),
        }
        LoopControl::Continue
    }

    fn adjust(&mut self, action: UiAction) {
        let Some(state) = self.state.as_mut() else {
            self.view.error(BUSY_HINT);
            return;
        };
        match action {
            UiAction::NewConversation => {
                let index = state.store.create_conversation();
                self.view.info(format!("Started conversation {}", index + 1));
            }
            UiAction::PreviousConversation | UiAction::NextConversation => {
                let target = if action == UiAction::PreviousConversation {
                    state.store.previous_index()
                } else {
                    state.store.next_index()
                };
                if let Some(index) = target {
                    match state.store.select_conversation(index) {
                        Ok(()) => self.view.info(format!("Switched to conversation {}", index + 1)),
                        Err(err) => self.view.error(err.to_string()),
                    }
                }
            }
            UiAction::CycleModel => {
                let available = self.registry.cached().unwrap_or_else(|| Arc::from(Vec::new()));
                match state.cycle_model(&available) {
                    Some(model) => self.view.info(format!("Model: {model}")),
                    None => self.view.error("No models available"),
                }
            }
            UiAction::TemperatureDown => {
                state.set_temperature(state.temperature().step_down());
                self.view.info(format!("Temperature: {}", state.temperature()));
            }
            UiAction::TemperatureUp => {
                state.set_temperature(state.temperature().step_up());
                self.view.info(format!("Temperature: {}", state.temperature()));
            }
            _ => {}
        }
    }

    fn submit(&mut self) {
        if self.is_streaming() {
            self.view.error(BUSY_HINT);
            return;
        }
        let Some(prompt) = self.view.take_input() else {
            return;
        };
        let Some(state) = self.state.take() else {
            return;
        };

        self.snapshot = state.clone();
        self.logged_from = state.store.active_transcript().len();
        self.view.status = None;
        self.view.tab = Tab::Chat;
        self.view.live = Some(LiveTurn {
            prompt: prompt.clone(),
            display: String::new(),
        });

        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());
        let pipeline = self.pipeline.clone();
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let mut state = state;
            let result = pipeline.submit(&mut state, &prompt, &cancel).await;
            let _ = done_tx.send((state, result));
        });
    }

    pub(crate) fn apply_pipeline_event(&mut self, event: PipelineEvent) {
        self.view.apply_event(&event);
    }

    pub(crate) fn finish_turn(&mut self, (state, result): TurnResult) {
        self.cancel = None;
        let live = self.view.live.take();

        match &result {
            Ok(_) => {}
            Err(ChatError::Cancelled { .. }) => self.view.info("Response cancelled"),
            Err(err) => self.view.error(err.to_string()),
        }

        let untouched = matches!(&result, Err(err) if err.left_store_untouched());
        if untouched {
            if let Some(live) = live {
                if self.view.input.is_empty() {
                    self.view.input = live.prompt;
                }
            }
        } else {
            let new_messages = state
                .store
                .active_transcript()
                .get(self.logged_from..)
                .unwrap_or_default();
            if let Err(err) = self.transcript.log_messages(new_messages) {
                warn!(error = %err, "Failed to write transcript log");
                self.view.error(format!("Transcript log failed: {err}"));
            }
        }

        self.state = Some(state);
    }

    /// Waits for a cancelled turn to hand its state back, so the partial
    /// reply still reaches the transcript log before exit.
    pub(crate) async fn shutdown(&mut self, done_rx: &mut mpsc::UnboundedReceiver<TurnResult>) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
        while self.is_streaming() {
            match done_rx.recv().await {
                Some(result) => self.finish_turn(result),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::BackendError;
    use crate::core::config::Config;
    use crate::core::message::Message;
    use crate::core::session::SessionOptions;
    use crate::utils::test_utils::{ChatScript, ScriptedBackend};

    struct Harness {
        controller: ChatController,
        events: mpsc::UnboundedReceiver<PipelineEvent>,
        done: mpsc::UnboundedReceiver<TurnResult>,
    }

    impl Harness {
        async fn new(backend: ScriptedBackend) -> Self {
            Self::with_options(backend, SessionOptions::default()).await
        }

        async fn with_options(backend: ScriptedBackend, options: SessionOptions) -> Self {
            let session = SessionBootstrap::with_backend(
                Arc::new(backend),
                "http://localhost:11434".into(),
                options,
                &Config::default(),
            )
            .await
            .expect("session");
            let (event_tx, events) = mpsc::unbounded_channel();
            let (done_tx, done) = mpsc::unbounded_channel();
            Self {
                controller: ChatController::new(session, event_tx, done_tx),
                events,
                done,
            }
        }

        fn type_text(&mut self, text: &str) {
            for c in text.chars() {
                self.controller.apply(UiAction::InsertChar(c));
            }
        }

        async fn finish(&mut self) {
            let result = self.done.recv().await.expect("turn result");
            while let Ok(event) = self.events.try_recv() {
                self.controller.apply_pipeline_event(event);
            }
            self.controller.finish_turn(result);
        }
    }

    #[tokio::test]
    async fn submit_hands_state_to_turn_and_takes_it_back() {
        let mut h = Harness::new(
            ScriptedBackend::with_models(&["llama3.2"]).script(ChatScript::fragments(&["Hi!"])),
        )
        .await;
        h.type_text("Hello");
        h.controller.apply(UiAction::Submit);

        assert!(h.controller.is_streaming());
        assert!(h.controller.view.input.is_empty());
        assert_eq!(
            h.controller.view.live.as_ref().map(|l| l.prompt.as_str()),
            Some("Hello")
        );

        h.finish().await;
        assert!(!h.controller.is_streaming());
        assert_eq!(h.controller.view.live, None);
        assert_eq!(
            h.controller.state().store.active_transcript(),
            [Message::user("Hello"), Message::assistant("Hi!")]
        );
    }

    #[tokio::test]
    async fn settings_are_locked_while_streaming() {
        let mut h = Harness::new(
            ScriptedBackend::with_models(&["a", "b"])
                .script(ChatScript::fragments(&["..."]).then_hang()),
        )
        .await;
        h.type_text("go");
        h.controller.apply(UiAction::Submit);

        h.controller.apply(UiAction::TemperatureUp);
        h.controller.apply(UiAction::NewConversation);
        h.type_text("next");
        h.controller.apply(UiAction::Submit);
        assert_eq!(
            h.controller.view.status.as_ref().map(|s| s.text.as_str()),
            Some(BUSY_HINT)
        );
        assert_eq!(h.controller.view.input, "next");

        h.controller.apply(UiAction::CancelTurn);
        h.finish().await;

        let state = h.controller.state();
        assert_eq!(state.temperature().to_string(), "0.7");
        assert_eq!(state.store.len(), 1);
        assert_eq!(
            h.controller.view.status.as_ref().map(|s| s.text.as_str()),
            Some("Response cancelled")
        );
    }

    #[tokio::test]
    async fn quitting_mid_reply_still_logs_the_partial_turn() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("chat.log");
        let options = SessionOptions {
            log_file: Some(path.clone()),
            ..Default::default()
        };
        let mut h = Harness::with_options(
            ScriptedBackend::with_models(&["llama3.2"])
                .script(ChatScript::fragments(&["Once upon"]).then_hang()),
            options,
        )
        .await;
        h.type_text("Tell me a story");
        h.controller.apply(UiAction::Submit);
        while let Some(event) = h.events.recv().await {
            if matches!(event, PipelineEvent::Display(_)) {
                break;
            }
        }

        assert_eq!(h.controller.apply(UiAction::Quit), LoopControl::Quit);
        h.controller.shutdown(&mut h.done).await;

        assert!(!h.controller.is_streaming());
        let contents = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(contents, "You: Tell me a story\n\nOnce upon\n\n");
    }

    #[tokio::test]
    async fn rejected_prompt_is_restored_to_input() {
        let mut h = Harness::new(ScriptedBackend::unreachable(BackendError::Connect(
            "connection refused".into(),
        )))
        .await;
        assert!(h
            .controller
            .view
            .status
            .as_ref()
            .is_some_and(|s| s.text.contains("connection refused")));

        h.type_text("anyone there?");
        h.controller.apply(UiAction::Submit);
        h.finish().await;

        assert_eq!(h.controller.view.input, "anyone there?");
        assert!(h.controller.state().store.is_empty());
        assert!(h
            .controller
            .view
            .status
            .as_ref()
            .is_some_and(|s| s.text.starts_with("No models available")));
    }

    #[tokio::test]
    async fn keys_adjust_conversations_model_and_temperature() {
        let mut h = Harness::new(ScriptedBackend::with_models(&["a", "b"])).await;

        h.controller.apply(UiAction::NewConversation);
        h.controller.apply(UiAction::NewConversation);
        h.controller.apply(UiAction::PreviousConversation);
        assert_eq!(h.controller.state().store.active_index(), Some(0));
        h.controller.apply(UiAction::PreviousConversation);
        assert_eq!(h.controller.state().store.active_index(), Some(0));
        h.controller.apply(UiAction::NextConversation);
        assert_eq!(h.controller.state().store.active_index(), Some(1));

        assert_eq!(h.controller.state().selected_model(), Some("a"));
        h.controller.apply(UiAction::CycleModel);
        assert_eq!(h.controller.state().selected_model(), Some("b"));

        h.controller.apply(UiAction::TemperatureDown);
        h.controller.apply(UiAction::TemperatureDown);
        assert_eq!(h.controller.state().temperature().to_string(), "0.5");

        assert_eq!(h.controller.apply(UiAction::Quit), LoopControl::Quit);
    }
}
