//! Binds the managers to the active character and conversation.

use outfitsync_core::host::OWNER_ID_FIELD;
use outfitsync_core::{EventBus, ExtensionWriter, HostContext, HostEvent, InstanceId, OwnerId};
use outfitsync_macros::MacroResolver;
use outfitsync_manager::{OutfitManager, PersonaOutfitManager, UserOutfitManager};
use outfitsync_store::derive_instance_id;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::pipeline::{CommandPipeline, ProcessingGuard};

/// What the managers are bound to after a refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub character: Option<String>,
    pub owner_id: Option<OwnerId>,
    pub instance_id: Option<InstanceId>,
}

pub struct SessionCoordinator {
    host: Arc<dyn HostContext>,
    writer: Arc<dyn ExtensionWriter>,
    persona: Arc<PersonaOutfitManager>,
    user: Arc<UserOutfitManager>,
    resolver: Arc<MacroResolver>,
    pipeline: Arc<CommandPipeline>,
    is_updating: AtomicBool,
}

impl SessionCoordinator {
    pub fn new(
        host: Arc<dyn HostContext>,
        writer: Arc<dyn ExtensionWriter>,
        persona: Arc<PersonaOutfitManager>,
        user: Arc<UserOutfitManager>,
        resolver: Arc<MacroResolver>,
        pipeline: Arc<CommandPipeline>,
    ) -> Self {
        Self {
            host,
            writer,
            persona,
            user,
            resolver,
            pipeline,
            is_updating: AtomicBool::new(false),
        }
    }

    pub fn pipeline(&self) -> &Arc<CommandPipeline> {
        &self.pipeline
    }

    /// Re-bind both managers to the host's current character and
    /// conversation. Returns `None` when another refresh is in progress.
    pub async fn refresh(&self) -> Option<SessionState> {
        if self
            .is_updating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Session refresh already running");
            return None;
        }

        let _guard = ProcessingGuard(&self.is_updating);
        Some(self.rebind().await)
    }

    async fn rebind(&self) -> SessionState {
        let character = self.host.active_character();
        let owner_id = match &character {
            Some(record) => Some(match record.owner_id() {
                Some(id) => id,
                None => self.assign_owner_id(&record.name).await,
            }),
            None => None,
        };

        self.persona.set_owner(owner_id.clone());
        if let Some(record) = &character {
            self.persona.set_name(&record.name);
        }
        self.user.set_name(&self.host.user_name());

        let instance_id = derive_instance_id(&self.host.messages());
        self.persona.set_instance(instance_id.clone());
        self.user.set_instance(instance_id.clone());
        self.resolver.invalidate_cache();

        info!(
            character = character.as_ref().map(|c| c.name.as_str()),
            owner = owner_id.as_ref().map(|o| o.as_str()),
            instance = instance_id.as_ref().map(|i| i.0.as_str()),
            "Session bound"
        );

        SessionState {
            character: character.map(|c| c.name),
            owner_id,
            instance_id,
        }
    }

    /// Mint a fresh owner id and try to store it on the character. A failed
    /// write still binds for this session.
    async fn assign_owner_id(&self, character: &str) -> OwnerId {
        let id = OwnerId::from(uuid::Uuid::new_v4().to_string().as_str());
        if let Err(e) = self
            .writer
            .write_field(character, OWNER_ID_FIELD, serde_json::Value::String(id.to_string()))
            .await
        {
            warn!(character, error = %e, "Could not persist owner id; using it for this session only");
        }
        id
    }

    /// Follow host events until the bus closes.
    pub async fn run(self: Arc<Self>, bus: &EventBus) {
        let mut rx = bus.subscribe();
        self.refresh().await;

        loop {
            match rx.recv().await {
                Ok(event) => match event.as_ref() {
                    HostEvent::MessageReceived { message_index, .. } => {
                        debug!(message_index, "Message received");
                        if self.persona.instance_id().is_none() {
                            self.refresh().await;
                        }
                        let pipeline = Arc::clone(&self.pipeline);
                        let messages = self.host.messages();
                        tokio::spawn(async move {
                            if let Err(e) = pipeline.on_message_received(messages).await {
                                warn!(error = %e, "Outfit cycle failed");
                            }
                        });
                    }
                    HostEvent::ConversationChanged { conversation_id, .. }
                    | HostEvent::ConversationCreated { conversation_id, .. } => {
                        debug!(conversation_id, "Conversation switched");
                        self.refresh().await;
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session fell behind host events");
                }
                Err(RecvError::Closed) => {
                    info!("Host event bus closed, session stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineSettings;
    use crate::test_helpers::{FakeHost, RecordingNotifier, ScriptedProvider};
    use outfitsync_core::{ChatMessage, Slot};
    use outfitsync_macros::DEFAULT_CACHE_TTL;
    use outfitsync_store::{instance_id_for_text, OutfitStateStore};
    use std::time::Duration;

    struct Rig {
        host: Arc<FakeHost>,
        persona: Arc<PersonaOutfitManager>,
        user: Arc<UserOutfitManager>,
        session: Arc<SessionCoordinator>,
    }

    fn rig(host: FakeHost, reply: &str) -> Rig {
        let host = Arc::new(host);
        let store = Arc::new(OutfitStateStore::new());
        let persona = Arc::new(PersonaOutfitManager::new(Arc::clone(&store)));
        let user = Arc::new(UserOutfitManager::new(Arc::clone(&store)));
        let resolver = Arc::new(MacroResolver::new(host.clone(), DEFAULT_CACHE_TTL));
        resolver.set_persona_manager(Arc::clone(&persona));
        resolver.set_user_manager(Arc::clone(&user));
        resolver.attach(&store);

        let pipeline = Arc::new(CommandPipeline::new(
            Arc::new(ScriptedProvider::replying(reply)),
            Arc::clone(&persona),
            Arc::clone(&resolver),
            Arc::new(RecordingNotifier::default()),
            PipelineSettings::default(),
        ));
        let session = Arc::new(SessionCoordinator::new(
            host.clone(),
            host.clone(),
            Arc::clone(&persona),
            Arc::clone(&user),
            resolver,
            pipeline,
        ));
        Rig { host, persona, user, session }
    }

    #[tokio::test]
    async fn first_refresh_mints_and_writes_owner_id() {
        let host = FakeHost::with_character("Ava");
        host.push_message(ChatMessage::author("Ava", "Hello there."));
        let r = rig(host, "");

        let state = r.session.refresh().await.unwrap();
        let owner = state.owner_id.clone().unwrap();
        assert_eq!(state.character.as_deref(), Some("Ava"));
        assert_eq!(r.persona.owner_id(), Some(owner.clone()));
        assert_eq!(r.persona.name(), "Ava");
        assert_eq!(r.user.name(), "Sam");

        let writes = r.host.writes.lock().unwrap().clone();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1, OWNER_ID_FIELD);
        assert_eq!(writes[0].2, serde_json::Value::String(owner.to_string()));

        // The stored id is reused afterwards
        let again = r.session.refresh().await.unwrap();
        assert_eq!(again.owner_id, Some(owner));
        assert_eq!(r.host.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_write_still_binds() {
        let mut host = FakeHost::with_character("Ava");
        host.reject_writes = true;
        let r = rig(host, "");

        let state = r.session.refresh().await.unwrap();
        assert!(state.owner_id.is_some());
        assert!(r.persona.owner_id().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_refresh_is_skipped() {
        let mut host = FakeHost::with_character("Ava");
        host.write_delay = Some(Duration::from_secs(5));
        let r = rig(host, "");

        let (first, second) = tokio::join!(r.session.refresh(), r.session.refresh());
        assert_ne!(first.is_some(), second.is_some());
        assert_eq!(r.host.writes.lock().unwrap().len(), 1);

        // The guard is released once the first refresh finishes
        assert!(r.session.refresh().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_refresh_releases_guard() {
        let mut host = FakeHost::with_character("Ava");
        host.write_delay = Some(Duration::from_secs(5));
        let r = rig(host, "");

        let timed_out =
            tokio::time::timeout(Duration::from_secs(1), r.session.refresh()).await;
        assert!(timed_out.is_err());
        assert!(r.host.writes.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(60)).await;
        let state = r.session.refresh().await.unwrap();
        assert!(state.owner_id.is_some());
        assert_eq!(r.persona.owner_id(), state.owner_id);
        assert_eq!(r.host.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn instance_follows_first_message() {
        let host = FakeHost::with_character("Ava");
        host.push_message(ChatMessage::system("scenario notes"));
        host.push_message(ChatMessage::author("Ava", "The  market   is busy."));
        host.push_message(ChatMessage::user("Sam", "Let's go."));
        let r = rig(host, "");

        let state = r.session.refresh().await.unwrap();
        let expected = instance_id_for_text("The market is busy.");
        assert_eq!(state.instance_id, Some(expected.clone()));
        assert_eq!(r.persona.instance_id(), Some(expected.clone()));
        assert_eq!(r.user.instance_id(), Some(expected));
    }

    #[tokio::test]
    async fn no_active_character_unbinds_persona() {
        let r = rig(FakeHost::default(), "");
        let state = r.session.refresh().await.unwrap();
        assert_eq!(state, SessionState::default());
        assert!(!r.persona.is_bound());
    }

    #[tokio::test(start_paused = true)]
    async fn run_routes_messages_to_pipeline() {
        let host = FakeHost::with_character("Ava");
        host.push_message(ChatMessage::author("Ava", "I reach for my boots."));
        let r = rig(host, r#"outfit-system_wear_footwear("leather boots")"#);

        let bus = Arc::new(EventBus::new(16));
        let session = Arc::clone(&r.session);
        let bus_for_run = Arc::clone(&bus);
        let handle = tokio::spawn(async move { session.run(&bus_for_run).await });

        // Let the coordinator subscribe and bind before publishing
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(r.persona.is_bound());

        bus.publish(HostEvent::message_received(0));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(r.persona.get_item(Slot::Footwear), "leather boots");

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn conversation_change_rebinds_instance() {
        let host = FakeHost::with_character("Ava");
        host.push_message(ChatMessage::author("Ava", "First chat."));
        let r = rig(host, "");

        let bus = Arc::new(EventBus::new(16));
        let session = Arc::clone(&r.session);
        let bus_for_run = Arc::clone(&bus);
        let handle = tokio::spawn(async move { session.run(&bus_for_run).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        let first = r.persona.instance_id();

        *r.host.messages.lock().unwrap() = vec![ChatMessage::author("Ava", "Second chat.")];
        bus.publish(HostEvent::conversation_changed("chat-2"));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_ne!(r.persona.instance_id(), first);
        assert_eq!(r.persona.instance_id(), Some(instance_id_for_text("Second chat.")));
        handle.abort();
    }
}
