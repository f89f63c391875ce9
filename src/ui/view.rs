//! UI-only state: the selected tab, the input line, the status line and the
//! reply that is currently streaming.

use crate::core::pipeline::{PipelineEvent, TurnPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Chat,
    Settings,
    History,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Chat, Tab::Settings, Tab::History];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Chat => "Chat",
            Tab::Settings => "Settings",
            Tab::History => "History",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Tab::Chat => Tab::Settings,
            Tab::Settings => Tab::History,
            Tab::History => Tab::Chat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

/// The turn being streamed: the prompt as typed and the reply so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveTurn {
    pub prompt: String,
    pub display: String,
}

#[derive(Debug)]
pub struct ViewState {
    pub tab: Tab,
    pub input: String,
    pub status: Option<Status>,
    pub live: Option<LiveTurn>,
    pub phase: TurnPhase,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            tab: Tab::default(),
            input: String::new(),
            status: None,
            live: None,
            phase: TurnPhase::Idle,
        }
    }
}

impl ViewState {
    pub fn info(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            kind: StatusKind::Info,
            text: text.into(),
        });
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            kind: StatusKind::Error,
            text: text.into(),
        });
    }

    /// Takes the input line if it holds anything besides whitespace.
    pub fn take_input(&mut self) -> Option<String> {
        if self.input.trim().is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.input))
    }

    pub fn apply_event(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::PhaseChanged(phase) => self.phase = *phase,
            PipelineEvent::Display(text) => {
                if let Some(live) = &mut self.live {
                    live.display.clone_from(text);
                }
            }
            PipelineEvent::StoreChanged(_) => {}
        }
    }
}
