use crate::translate::ChatMessage;

/// Per-owner conversation state: a bounded history window and the agent the
/// owner last addressed.
#[derive(Debug, Clone)]
pub struct OwnerContext {
    history: Vec<ChatMessage>,
    max_history: usize,
    active_agent: Option<String>,
}

impl OwnerContext {
    pub fn new(max_history: usize) -> Self {
        Self {
            history: Vec::new(),
            max_history: max_history.max(1),
            active_agent: None,
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.history.push(message);
        if self.history.len() > self.max_history {
            let excess = self.history.len() - self.max_history;
            self.history.drain(..excess);
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn active_agent(&self) -> Option<&str> {
        self.active_agent.as_deref()
    }

    pub fn set_active_agent(&mut self, agent: &str) {
        self.active_agent = Some(agent.to_string());
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.active_agent = None;
    }
}
