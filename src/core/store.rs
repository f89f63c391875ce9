//! Ordered conversation list plus the working transcript of the active one.
//!
//! The store is append-only at the top level: a conversation keeps its
//! position for the lifetime of the process. Messages are appended to the
//! working transcript during a turn and only written back into the
//! conversation list by [`ConversationStore::commit_active_transcript`].

use std::error::Error;
use std::fmt;

use crate::core::message::{Conversation, Message, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The requested conversation index does not exist.
    OutOfRange { index: usize, len: usize },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::OutOfRange { index, len } => write!(
                f,
                "Conversation {} does not exist ({} available)",
                index + 1,
                len
            ),
        }
    }
}

impl Error for StoreError {}

/// Notification emitted for every store mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    Created(usize),
    Selected(usize),
    Appended { conversation: usize, role: Role },
    Committed(usize),
}

#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    active_index: Option<usize>,
    active_transcript: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an empty conversation, makes it active and returns its index.
    pub fn create_conversation(&mut self) -> usize {
        self.conversations.push(Conversation::new());
        let index = self.conversations.len() - 1;
        self.active_index = Some(index);
        self.active_transcript.clear();
        index
    }

    /// Makes `index` the active conversation, replacing the working
    /// transcript with a copy of its messages. Index and transcript change
    /// together; nothing changes on failure.
    pub fn select_conversation(&mut self, index: usize) -> Result<(), StoreError> {
        let conversation = self.conversations.get(index).ok_or(StoreError::OutOfRange {
            index,
            len: self.conversations.len(),
        })?;
        self.active_transcript = conversation.messages().to_vec();
        self.active_index = Some(index);
        Ok(())
    }

    /// Returns the active index, creating a first conversation when the
    /// store is empty. The flag reports whether one was created.
    pub fn ensure_active(&mut self) -> (usize, bool) {
        match self.active_index {
            Some(index) => (index, false),
            None => (self.create_conversation(), true),
        }
    }

    /// Appends to the working transcript only. The conversation list is not
    /// touched until the transcript is committed.
    pub fn append_message(&mut self, message: Message) -> usize {
        let (index, _) = self.ensure_active();
        self.active_transcript.push(message);
        index
    }

    /// Writes the working transcript back into the active conversation.
    /// Returns the committed index, or `None` when nothing is active.
    pub fn commit_active_transcript(&mut self) -> Option<usize> {
        let index = self.active_index?;
        let conversation = self.conversations.get_mut(index)?;
        *conversation = Conversation::from(self.active_transcript.clone());
        Some(index)
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, index: usize) -> Option<&Conversation> {
        self.conversations.get(index)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn active_transcript(&self) -> &[Message] {
        &self.active_transcript
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// True when the active conversation equals the working transcript.
    pub fn is_synchronized(&self) -> bool {
        match self.active_index.and_then(|i| self.conversations.get(i)) {
            Some(conversation) => conversation.messages() == self.active_transcript.as_slice(),
            None => self.active_transcript.is_empty(),
        }
    }

    /// Index of the conversation before the active one, if any.
    pub fn previous_index(&self) -> Option<usize> {
        self.active_index.and_then(|i| i.checked_sub(1))
    }

    /// Index of the conversation after the active one, if any.
    pub fn next_index(&self) -> Option<usize> {
        let next = self.active_index? + 1;
        (next < self.conversations.len()).then_some(next)
    }
}
