//! Subcommand implementations.

pub mod apply;
pub mod config_cmd;
pub mod extract;
pub mod outfit;
pub mod preset;
pub mod render;
pub mod run;
pub mod status;

use std::io::Read;
use std::sync::Arc;

use outfitsync_config::AppConfig;
use outfitsync_core::host::LogNotifier;
use outfitsync_core::StateBackend;
use outfitsync_macros::MacroResolver;
use outfitsync_manager::{OutfitManager, PersonaOutfitManager, UserOutfitManager};
use outfitsync_pipeline::{CommandPipeline, PipelineSettings, SessionCoordinator, SessionState};
use outfitsync_store::{FileBackend, NoopBackend, OutfitStateStore};

use crate::session_file::SessionFile;
use crate::Target;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Everything a session-bound command needs, wired like a running host.
pub struct Workspace {
    pub config: AppConfig,
    pub store: Arc<OutfitStateStore>,
    pub session_file: Arc<SessionFile>,
    pub persona: Arc<PersonaOutfitManager>,
    pub user: Arc<UserOutfitManager>,
    pub resolver: Arc<MacroResolver>,
    pub coordinator: Arc<SessionCoordinator>,
    pub state: SessionState,
    user_target: bool,
}

impl Workspace {
    pub async fn open(target: &Target) -> CliResult<Self> {
        let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
        Self::open_with(config, target).await
    }

    pub async fn open_with(config: AppConfig, target: &Target) -> CliResult<Self> {
        let store = Arc::new(OutfitStateStore::new().with_backend(backend_for(&config)));
        store.load().await?;

        let session_file = Arc::new(SessionFile::open(&target.session).await?);
        let persona = Arc::new(PersonaOutfitManager::new(Arc::clone(&store)));
        let user = Arc::new(UserOutfitManager::new(Arc::clone(&store)));

        let resolver = Arc::new(MacroResolver::new(
            session_file.clone(),
            config.macros.cache_ttl(),
        ));
        resolver.set_persona_manager(Arc::clone(&persona));
        resolver.set_user_manager(Arc::clone(&user));
        resolver.attach(&store);

        let router = outfitsync_providers::build_from_config(&config);
        let provider = router
            .default_provider()
            .ok_or("No default provider configured")?;
        let pipeline = Arc::new(CommandPipeline::new(
            provider,
            Arc::clone(&persona),
            Arc::clone(&resolver),
            Arc::new(LogNotifier),
            PipelineSettings::from_config(&config),
        ));

        let coordinator = Arc::new(SessionCoordinator::new(
            session_file.clone(),
            session_file.clone(),
            Arc::clone(&persona),
            Arc::clone(&user),
            Arc::clone(&resolver),
            pipeline,
        ));
        let state = coordinator
            .refresh()
            .await
            .ok_or("Session is already being refreshed")?;

        Ok(Self {
            config,
            store,
            session_file,
            persona,
            user,
            resolver,
            coordinator,
            state,
            user_target: target.user,
        })
    }

    /// The manager the command targets.
    pub fn manager(&self) -> &dyn OutfitManager {
        if self.user_target {
            self.user.as_ref()
        } else {
            self.persona.as_ref()
        }
    }

    pub fn pipeline(&self) -> &Arc<CommandPipeline> {
        self.coordinator.pipeline()
    }

    /// Fail early with a readable message when the target has nothing to act on.
    pub fn require_bound(&self) -> CliResult {
        if self.manager().is_bound() {
            return Ok(());
        }
        if !self.user_target && self.state.character.is_none() {
            return Err("The session has no active character".into());
        }
        Err("The session has no messages yet, so there is no conversation to track".into())
    }

    pub async fn persist(&self) -> CliResult {
        self.store.persist().await?;
        Ok(())
    }
}

fn backend_for(config: &AppConfig) -> Arc<dyn StateBackend> {
    match config.storage.backend.as_str() {
        "none" => Arc::new(NoopBackend),
        _ => Arc::new(FileBackend::new(config.storage.resolved_path())),
    }
}

/// The given text, or all of stdin.
pub fn text_or_stdin(text: Option<String>) -> CliResult<String> {
    match text {
        Some(t) => Ok(t),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
