use sarvam_kernel_protocol::{AssistantReply, Role, Turn};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("a user turn is already waiting for an assistant reply")]
    UserTurnPending,
    #[error("no user turn is waiting for an assistant reply")]
    NoPendingUserTurn,
}

/// Conversation history in template order: optional system turn, then
/// alternating user/assistant turns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationStore {
    turns: Vec<Turn>,
}

impl ConversationStore {
    pub fn new(system_prompt: Option<String>) -> Self {
        let mut store = Self::default();
        store.reset(system_prompt);
        store
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.turns
            .first()
            .filter(|turn| turn.role == Role::System)
            .map(|turn| turn.content.as_str())
    }

    pub fn awaiting_reply(&self) -> bool {
        self.turns
            .last()
            .is_some_and(|turn| turn.role == Role::User)
    }

    /// Number of completed user/assistant exchanges.
    pub fn exchange_count(&self) -> usize {
        self.turns
            .iter()
            .filter(|turn| turn.role == Role::Assistant)
            .count()
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> Result<(), StoreError> {
        if self.awaiting_reply() {
            return Err(StoreError::UserTurnPending);
        }
        self.turns.push(Turn::user(content));
        Ok(())
    }

    /// Records a decoded reply with its reasoning kept apart from the content,
    /// so the next render can re-materialise the reasoning block.
    pub fn append_assistant(&mut self, reply: &AssistantReply) -> Result<(), StoreError> {
        if !self.awaiting_reply() {
            return Err(StoreError::NoPendingUserTurn);
        }
        self.turns.push(reply.to_turn());
        Ok(())
    }

    /// Drops a trailing user turn that will never get a reply.
    pub fn discard_pending_user(&mut self) -> Option<Turn> {
        if self.awaiting_reply() {
            self.turns.pop()
        } else {
            None
        }
    }

    pub fn reset(&mut self, system_prompt: Option<String>) {
        self.turns.clear();
        if let Some(prompt) = system_prompt {
            self.turns.push(Turn::system(prompt));
        }
    }
}
