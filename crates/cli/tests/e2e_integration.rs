//! End-to-end integration tests for outfit tracking.
//!
//! These tests wire every crate together the way a host does: a file-backed
//! store, persona and user managers, macro resolution, the session
//! coordinator, and the command pipeline driven by a scripted model.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use outfitsync_core::error::{HostError, ProviderError};
use outfitsync_core::{
    CharacterDirectory, CharacterRecord, ChatMessage, EventBus, ExtensionWriter, HostContext,
    HostEvent, Notice, NoticeLevel, Notifier, Provider, ProviderRequest, Slot,
};
use outfitsync_macros::{MacroResolver, DEFAULT_CACHE_TTL};
use outfitsync_manager::{OutfitManager, PersonaOutfitManager, UserOutfitManager};
use outfitsync_pipeline::{
    CommandPipeline, PipelineError, PipelineSettings, ProcessOutcome, SessionCoordinator,
};
use outfitsync_store::{FileBackend, OutfitStateStore};

// ── Test doubles ─────────────────────────────────────────────────────────

/// A model that answers with scripted replies in sequence.
struct ScriptedProvider {
    replies: Mutex<Vec<Result<String, ProviderError>>>,
    calls: Mutex<usize>,
}

impl ScriptedProvider {
    fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn generate(&self, _request: ProviderRequest) -> Result<String, ProviderError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        replies.remove(0)
    }
}

#[derive(Default)]
struct Notices(Mutex<Vec<Notice>>);

impl Notifier for Notices {
    fn notify(&self, notice: Notice) {
        self.0.lock().unwrap().push(notice);
    }
}

/// An in-process host with a character list and one conversation.
#[derive(Default)]
struct TestHost {
    characters: Mutex<Vec<CharacterRecord>>,
    active: Mutex<Option<String>>,
    messages: Mutex<Vec<ChatMessage>>,
}

impl TestHost {
    fn new(active: &str, others: &[&str]) -> Self {
        let host = Self::default();
        let mut characters = host.characters.lock().unwrap();
        characters.push(CharacterRecord::new(active));
        characters.extend(others.iter().map(|n| CharacterRecord::new(*n)));
        drop(characters);
        *host.active.lock().unwrap() = Some(active.to_string());
        host
    }

    fn say(&self, message: ChatMessage) {
        self.messages.lock().unwrap().push(message);
    }

    fn switch_to(&self, name: &str) {
        *self.active.lock().unwrap() = Some(name.to_string());
    }

    fn replace_conversation(&self, messages: Vec<ChatMessage>) {
        *self.messages.lock().unwrap() = messages;
    }
}

impl HostContext for TestHost {
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

impl CharacterDirectory for TestHost {
    fn characters(&self) -> Vec<CharacterRecord> {
        self.characters.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ExtensionWriter for TestHost {
    async fn write_field(
        &self,
        character: &str,
        field: &str,
        value: serde_json::Value,
    ) -> Result<(), HostError> {
        let mut characters = self.characters.lock().unwrap();
        let record = characters
            .iter_mut()
            .find(|c| c.name == character)
            .ok_or_else(|| HostError::ExtensionWrite {
                character: character.into(),
                field: field.into(),
                reason: "unknown character".into(),
            })?;
        record.extensions.insert(field.into(), value);
        Ok(())
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

struct App {
    store: Arc<OutfitStateStore>,
    persona: Arc<PersonaOutfitManager>,
    user: Arc<UserOutfitManager>,
    resolver: Arc<MacroResolver>,
    pipeline: Arc<CommandPipeline>,
    session: Arc<SessionCoordinator>,
    provider: Arc<ScriptedProvider>,
    notices: Arc<Notices>,
}

async fn boot(
    host: &Arc<TestHost>,
    state_file: &std::path::Path,
    replies: Vec<Result<String, ProviderError>>,
) -> App {
    let store = Arc::new(
        OutfitStateStore::new().with_backend(Arc::new(FileBackend::new(state_file))),
    );
    store.load().await.unwrap();

    let persona = Arc::new(PersonaOutfitManager::new(Arc::clone(&store)));
    let user = Arc::new(UserOutfitManager::new(Arc::clone(&store)));
    let resolver = Arc::new(MacroResolver::new(host.clone(), DEFAULT_CACHE_TTL));
    resolver.set_persona_manager(Arc::clone(&persona));
    resolver.set_user_manager(Arc::clone(&user));
    resolver.attach(&store);

    let provider = Arc::new(ScriptedProvider::new(replies));
    let notices = Arc::new(Notices::default());
    let settings = PipelineSettings {
        retry_attempts: 2,
        retry_delay: Duration::from_millis(10),
        debounce: Duration::from_millis(50),
        ..PipelineSettings::default()
    };
    let pipeline = Arc::new(CommandPipeline::new(
        provider.clone(),
        Arc::clone(&persona),
        Arc::clone(&resolver),
        notices.clone(),
        settings,
    ));
    let session = Arc::new(SessionCoordinator::new(
        host.clone(),
        host.clone(),
        Arc::clone(&persona),
        Arc::clone(&user),
        Arc::clone(&resolver),
        Arc::clone(&pipeline),
    ));
    session.refresh().await.unwrap();

    App { store, persona, user, resolver, pipeline, session, provider, notices }
}

fn opening() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("A rainy evening in the harbor town."),
        ChatMessage::author("Ava", "Ava waits under the tavern awning, hood up."),
    ]
}

// ── E2E: Model-driven updates ────────────────────────────────────────────

#[tokio::test]
async fn e2e_model_reply_updates_and_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("state.json");
    let host = Arc::new(TestHost::new("Ava", &[]));
    for m in opening() {
        host.say(m);
    }
    host.say(ChatMessage::user("Sam", "Come inside, you're soaked."));
    host.say(ChatMessage::author("Ava", "She hangs her cloak and kicks off her wet boots."));

    let app = boot(
        &host,
        &state_file,
        vec![Ok(concat!(
            "outfit-system_wear_cape(\"rain cloak\")\n",
            "outfit-system_remove_footwear()\n",
            "outfit-system_wear_hands-accessory(\"silver ring\")",
        )
        .into())],
    )
    .await;
    app.persona.set_outfit_item("footwear", "wet boots").unwrap();

    let outcome = app.pipeline.manual_trigger(&host.messages()).await.unwrap();
    let ProcessOutcome::Applied(report) = outcome else {
        panic!("expected Applied");
    };
    assert_eq!(report.successful.len(), 2);
    assert_eq!(report.failed.len(), 1, "cape is not a slot");
    assert_eq!(app.persona.get_item(Slot::Footwear), "None");
    assert_eq!(app.persona.get_item(Slot::HandsAccessory), "silver ring");

    let notices = app.notices.0.lock().unwrap().clone();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Success);
    assert!(state_file.exists());

    // A fresh process over the same file and host sees the same outfit
    let restarted = boot(&host, &state_file, vec![]).await;
    assert_eq!(restarted.persona.owner_id(), app.persona.owner_id());
    assert_eq!(restarted.persona.get_item(Slot::HandsAccessory), "silver ring");
}

#[tokio::test]
async fn e2e_event_bus_drives_debounced_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(TestHost::new("Ava", &[]));
    for m in opening() {
        host.say(m);
    }
    let app = boot(
        &host,
        &dir.path().join("state.json"),
        vec![Ok("outfit-system_wear_headwear(\"wide-brimmed hat\")".into())],
    )
    .await;

    let bus = Arc::new(EventBus::new(16));
    let session = Arc::clone(&app.session);
    let bus_for_session = Arc::clone(&bus);
    let handle = tokio::spawn(async move { session.run(&bus_for_session).await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    // A burst of messages collapses into one model call
    for i in 0..3 {
        host.say(ChatMessage::user("Sam", format!("line {i}")));
        bus.publish(HostEvent::message_received(2 + i));
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(app.provider.calls(), 1);
    assert_eq!(app.persona.get_item(Slot::Headwear), "wide-brimmed hat");
    handle.abort();
}

// ── E2E: Conversation instances ──────────────────────────────────────────

#[tokio::test]
async fn e2e_branches_share_state_by_first_message() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(TestHost::new("Ava", &[]));
    host.replace_conversation(opening());
    let app = boot(&host, &dir.path().join("state.json"), vec![]).await;
    app.persona.set_outfit_item("topwear", "oilskin coat").unwrap();
    let main_branch = app.persona.instance_id();

    // Same opening, different continuation: same instance
    let mut branch = opening();
    branch.push(ChatMessage::user("Sam", "A different path."));
    host.replace_conversation(branch);
    app.session.refresh().await.unwrap();
    assert_eq!(app.persona.instance_id(), main_branch);
    assert_eq!(app.persona.get_item(Slot::Topwear), "oilskin coat");

    // A new opening is a new instance with an empty outfit
    host.replace_conversation(vec![ChatMessage::author("Ava", "Sunny morning at the market.")]);
    app.session.refresh().await.unwrap();
    assert_ne!(app.persona.instance_id(), main_branch);
    assert_eq!(app.persona.get_item(Slot::Topwear), "None");
    assert_eq!(app.store.instances(&app.persona.owner().unwrap()).len(), 1);
}

#[tokio::test]
async fn e2e_switching_character_rebinds_persona() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(TestHost::new("Ava", &["Captain Jack"]));
    host.replace_conversation(opening());
    let app = boot(&host, &dir.path().join("state.json"), vec![]).await;
    app.persona.set_outfit_item("headwear", "hood").unwrap();
    let ava = app.persona.owner_id();

    host.switch_to("Captain Jack");
    app.session.refresh().await.unwrap();
    assert_eq!(app.persona.name(), "Captain Jack");
    assert_ne!(app.persona.owner_id(), ava);
    assert_eq!(app.persona.get_item(Slot::Headwear), "None");
    app.persona.set_outfit_item("headwear", "tricorn").unwrap();

    // Ava's outfit is addressable by name from Jack's session
    let rendered = app.resolver.substitute_all("Ava: {{Ava_headwear}}, Jack: {{char_headwear}}");
    assert_eq!(rendered, "Ava: hood, Jack: tricorn");
}

// ── E2E: Macros and user outfit ──────────────────────────────────────────

#[tokio::test]
async fn e2e_user_outfit_and_macros() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(TestHost::new("Ava", &[]));
    host.replace_conversation(opening());
    let app = boot(&host, &dir.path().join("state.json"), vec![]).await;

    app.user.set_outfit_item("topwear", "denim jacket").unwrap();
    assert_eq!(app.resolver.substitute_all("{{user_topwear}}"), "denim jacket");

    // Writes through the store invalidate cached macro values
    app.user.set_outfit_item("topwear", "raincoat").unwrap();
    assert_eq!(app.resolver.substitute_all("{{user_topwear}}"), "raincoat");

    app.user.set_prompt_injection(false).unwrap();
    assert_eq!(app.resolver.substitute_all("{{user_topwear}}"), "None");
}

#[tokio::test]
async fn e2e_default_preset_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("state.json");
    let host = Arc::new(TestHost::new("Ava", &[]));
    host.replace_conversation(opening());

    let app = boot(&host, &state_file, vec![]).await;
    app.persona.set_outfit_item("topwear", "travel coat").unwrap();
    app.persona.set_outfit_item("footwear", "riding boots").unwrap();
    app.persona.save_preset("travel").unwrap();
    app.persona.set_default_preset("travel").unwrap();
    app.persona.set_outfit_item("topwear", "nightgown").unwrap();
    app.persona.set_outfit_item("footwear", "").unwrap();
    app.store.persist().await.unwrap();

    let restarted = boot(&host, &state_file, vec![]).await;
    assert_eq!(restarted.persona.get_item(Slot::Topwear), "nightgown");
    assert_eq!(
        restarted.persona.get_default_preset_name().unwrap().as_deref(),
        Some("travel")
    );
    let changes = restarted.persona.load_default_outfit().unwrap().unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(restarted.persona.get_item(Slot::Topwear), "travel coat");
    assert_eq!(restarted.persona.get_item(Slot::Footwear), "riding boots");

    // Presets belong to one conversation
    host.replace_conversation(vec![ChatMessage::author("Ava", "A new journey begins.")]);
    restarted.session.refresh().await.unwrap();
    assert!(restarted.persona.get_presets().unwrap().is_empty());
    assert!(restarted.persona.load_default_outfit().unwrap().is_none());
}

// ── E2E: Failure handling ────────────────────────────────────────────────

#[tokio::test]
async fn e2e_repeated_failures_disable_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(TestHost::new("Ava", &[]));
    host.replace_conversation(opening());
    let app = boot(&host, &dir.path().join("state.json"), vec![]).await;
    let messages = host.messages();

    let mut last = None;
    for _ in 0..5 {
        last = Some(app.pipeline.process(&messages).await);
    }
    assert!(matches!(
        last,
        Some(Err(PipelineError::ConsecutiveFailureExhaustion(5)))
    ));
    // Two attempts per cycle
    assert_eq!(app.provider.calls(), 10);
    assert!(!app.pipeline.is_enabled());

    let notices = app.notices.0.lock().unwrap().clone();
    assert_eq!(notices.last().unwrap().level, NoticeLevel::Error);

    assert!(matches!(
        app.pipeline.manual_trigger(&messages).await,
        Err(PipelineError::Disabled)
    ));
    assert_eq!(app.provider.calls(), 10);
}
