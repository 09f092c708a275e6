//! Shared test helpers for pipeline and session tests.

use async_trait::async_trait;
use outfitsync_core::error::{HostError, ProviderError};
use outfitsync_core::{
    CharacterDirectory, CharacterRecord, ChatMessage, ExtensionWriter, HostContext, Notice,
    Notifier, Provider, ProviderRequest,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A provider that replays a script of replies.
///
/// Each call to `generate` pops the next entry. An exhausted script answers
/// with `ProviderError::EmptyResponse`.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Take `delay` (tokio time) before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn failing(times: usize) -> Self {
        Self::new(
            (0..times)
                .map(|_| Err(ProviderError::Network("connection reset".into())))
                .collect(),
        )
    }

    pub fn push(&self, reply: Result<String, ProviderError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: ProviderRequest) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProviderError::EmptyResponse))
    }
}

/// Collects notices for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// A scriptable host: one conversation, a character list, and a record of
/// extension writes.
#[derive(Default)]
pub struct FakeHost {
    pub messages: Mutex<Vec<ChatMessage>>,
    pub characters: Mutex<Vec<CharacterRecord>>,
    pub active: Mutex<Option<String>>,
    pub writes: Mutex<Vec<(String, String, serde_json::Value)>>,
    pub reject_writes: bool,
    pub write_delay: Option<Duration>,
}

impl FakeHost {
    pub fn with_character(name: &str) -> Self {
        let host = Self::default();
        host.characters.lock().unwrap().push(CharacterRecord::new(name));
        *host.active.lock().unwrap() = Some(name.to_string());
        host
    }

    pub fn push_message(&self, message: ChatMessage) {
        self.messages.lock().unwrap().push(message);
    }
}

impl HostContext for FakeHost {
    fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().unwrap().clone()
    }

    fn active_character(&self) -> Option<CharacterRecord> {
        let active = self.active.lock().unwrap().clone()?;
        self.characters
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.name == active)
            .cloned()
    }

    fn user_name(&self) -> String {
        "Sam".into()
    }
}

impl CharacterDirectory for FakeHost {
    fn characters(&self) -> Vec<CharacterRecord> {
        self.characters.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtensionWriter for FakeHost {
    async fn write_field(
        &self,
        character: &str,
        field: &str,
        value: serde_json::Value,
    ) -> Result<(), HostError> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject_writes {
            return Err(HostError::ExtensionWrite {
                character: character.into(),
                field: field.into(),
                reason: "read-only".into(),
            });
        }
        self.writes
            .lock()
            .unwrap()
            .push((character.into(), field.into(), value.clone()));
        if let Some(record) = self
            .characters
            .lock()
            .unwrap()
            .iter_mut()
            .find(|c| c.name == character)
        {
            record.extensions.insert(field.into(), value);
        }
        Ok(())
    }
}
