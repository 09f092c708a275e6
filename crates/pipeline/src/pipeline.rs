//! The retrying, self-disabling command pipeline.

use chrono::{DateTime, Utc};
use outfitsync_config::AppConfig;
use outfitsync_core::message::transcript;
use outfitsync_core::{ChatMessage, Notice, Notifier, Provider, ProviderRequest};
use outfitsync_macros::MacroResolver;
use outfitsync_manager::{OutfitManager, PersonaOutfitManager};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::batch::{apply_batch, BatchReport};
use crate::prompt::default_system_prompt;
use crate::PipelineError;

/// Tunables for one pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub enabled: bool,
    pub max_consecutive_failures: u32,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub debounce: Duration,
    pub message_window: usize,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Replaces the built-in system prompt
    pub system_prompt: Option<String>,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let p = &config.pipeline;
        Self {
            enabled: p.enabled,
            max_consecutive_failures: p.max_consecutive_failures,
            retry_attempts: p.retry_attempts,
            retry_delay: p.retry_delay(),
            debounce: p.debounce(),
            message_window: p.message_window,
            model: config.default_model.clone(),
            temperature: config.default_temperature,
            max_tokens: Some(config.default_max_tokens),
            system_prompt: p.system_prompt.clone(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Why a cycle did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyProcessing,
    Disabled,
    NoMessages,
    /// A newer message arrived during the debounce window
    Superseded,
}

#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    Applied(BatchReport),
    Skipped(SkipReason),
    /// The pipeline was disabled while the model call was in flight
    Discarded,
}

/// Snapshot for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub enabled: bool,
    pub processing: bool,
    pub consecutive_failures: u32,
    pub max_consecutive_failures: u32,
    pub provider: String,
    pub model: String,
    pub last_run: Option<DateTime<Utc>>,
    pub last_applied: usize,
}

/// Clears a busy flag when dropped, including when the owning future is
/// cancelled.
pub(crate) struct ProcessingGuard<'a>(pub(crate) &'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Turns model replies into persona outfit changes.
pub struct CommandPipeline {
    provider: Arc<dyn Provider>,
    persona: Arc<PersonaOutfitManager>,
    resolver: Arc<MacroResolver>,
    notifier: Arc<dyn Notifier>,
    settings: PipelineSettings,
    system_prompt: RwLock<String>,
    enabled: AtomicBool,
    is_processing: AtomicBool,
    consecutive_failures: AtomicU32,
    debounce_generation: AtomicU64,
    last_run: Mutex<Option<(DateTime<Utc>, usize)>>,
}

impl CommandPipeline {
    pub fn new(
        provider: Arc<dyn Provider>,
        persona: Arc<PersonaOutfitManager>,
        resolver: Arc<MacroResolver>,
        notifier: Arc<dyn Notifier>,
        settings: PipelineSettings,
    ) -> Self {
        let system_prompt = settings
            .system_prompt
            .clone()
            .unwrap_or_else(default_system_prompt);
        Self {
            provider,
            persona,
            resolver,
            notifier,
            enabled: AtomicBool::new(settings.enabled),
            settings,
            system_prompt: RwLock::new(system_prompt),
            is_processing: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
            debounce_generation: AtomicU64::new(0),
            last_run: Mutex::new(None),
        }
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Turn the pipeline on and forget past failures.
    pub fn enable(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        self.enabled.store(true, Ordering::Release);
        info!("Outfit pipeline enabled");
    }

    /// Stop future cycles. A cycle already in flight discards its result.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
        info!("Outfit pipeline disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing.load(Ordering::Acquire)
    }

    /// Replace the system prompt; `None` restores the built-in one.
    pub fn set_prompt(&self, prompt: Option<String>) {
        let prompt = prompt.unwrap_or_else(default_system_prompt);
        *self
            .system_prompt
            .write()
            .unwrap_or_else(PoisonError::into_inner) = prompt;
    }

    /// The system prompt before macro rendering.
    pub fn system_prompt(&self) -> String {
        self.system_prompt
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The system prompt as the model sees it, with the persona's name and
    /// current outfit filled in.
    pub fn rendered_system_prompt(&self) -> String {
        let prompt = self.system_prompt().replace("{{char}}", &self.persona.name());
        self.resolver.substitute_all(&prompt)
    }

    pub fn status(&self) -> PipelineStatus {
        let last = *self.last_run.lock().unwrap_or_else(PoisonError::into_inner);
        PipelineStatus {
            enabled: self.is_enabled(),
            processing: self.is_processing(),
            consecutive_failures: self.consecutive_failures.load(Ordering::Acquire),
            max_consecutive_failures: self.settings.max_consecutive_failures,
            provider: self.provider.name().to_string(),
            model: self.settings.model.clone(),
            last_run: last.map(|(at, _)| at),
            last_applied: last.map(|(_, n)| n).unwrap_or(0),
        }
    }

    // ── Triggers ───────────────────────────────────────────────────────

    /// Run one cycle now. Unlike automatic triggers, a disabled pipeline is
    /// an error here.
    pub async fn manual_trigger(
        &self,
        messages: &[ChatMessage],
    ) -> Result<ProcessOutcome, PipelineError> {
        if !self.is_enabled() {
            return Err(PipelineError::Disabled);
        }
        self.process(messages).await
    }

    /// Run a cycle once no newer message has arrived for the debounce period.
    pub async fn on_message_received(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<ProcessOutcome, PipelineError> {
        if !self.is_enabled() {
            return Ok(ProcessOutcome::Skipped(SkipReason::Disabled));
        }

        let generation = self.debounce_generation.fetch_add(1, Ordering::AcqRel) + 1;
        tokio::time::sleep(self.settings.debounce).await;
        if self.debounce_generation.load(Ordering::Acquire) != generation {
            debug!(generation, "Debounced message superseded");
            return Ok(ProcessOutcome::Skipped(SkipReason::Superseded));
        }

        self.process(&messages).await
    }

    // ── Cycle ──────────────────────────────────────────────────────────

    /// One full cycle: prompt, retry, extract, apply, persist, report.
    pub async fn process(&self, messages: &[ChatMessage]) -> Result<ProcessOutcome, PipelineError> {
        if !self.is_enabled() {
            return Ok(ProcessOutcome::Skipped(SkipReason::Disabled));
        }
        if self
            .is_processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Outfit pipeline already processing, skipping");
            return Ok(ProcessOutcome::Skipped(SkipReason::AlreadyProcessing));
        }
        let _guard = ProcessingGuard(&self.is_processing);

        let prompt = transcript(messages, self.settings.message_window);
        if prompt.is_empty() {
            return Ok(ProcessOutcome::Skipped(SkipReason::NoMessages));
        }

        let attempts = self.settings.retry_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let result = self.generate(&prompt).await;

            if !self.is_enabled() {
                info!(attempt, "Pipeline disabled during generation, discarding result");
                return Ok(ProcessOutcome::Discarded);
            }

            match result {
                Ok(text) => {
                    let report = apply_batch(self.persona.as_ref(), &text);
                    self.finish_cycle(&report).await;
                    return Ok(ProcessOutcome::Applied(report));
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Outfit generation attempt failed");
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.settings.retry_delay).await;
                    }
                }
            }
        }

        Err(self.record_failure(last_error))
    }

    async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        let mut request =
            ProviderRequest::new(&self.settings.model, self.rendered_system_prompt(), prompt);
        request.temperature = self.settings.temperature;
        request.max_tokens = self.settings.max_tokens;

        let text = self
            .provider
            .generate(request)
            .await
            .map_err(|e| PipelineError::Generation(e.to_string()))?;

        if text.trim().is_empty() {
            return Err(PipelineError::Generation("empty response".into()));
        }
        Ok(text)
    }

    async fn finish_cycle(&self, report: &BatchReport) {
        self.consecutive_failures.store(0, Ordering::Release);
        *self.last_run.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((Utc::now(), report.successful.len()));

        info!(
            applied = report.successful.len(),
            unchanged = report.unchanged.len(),
            failed = report.failed.len(),
            low_confidence = report.low_confidence.len(),
            "Outfit cycle complete"
        );

        let Some(summary) = report.summary() else {
            return;
        };
        if let Err(e) = self.persona.core().store().persist().await {
            warn!(error = %e, "Failed to persist outfit state");
        }
        self.notifier.notify(Notice::success(summary));
    }

    fn record_failure(&self, last_error: String) -> PipelineError {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        let max = self.settings.max_consecutive_failures;

        if failures < max {
            warn!(failures, max, error = %last_error, "Outfit cycle failed");
            return PipelineError::Generation(last_error);
        }

        self.enabled.store(false, Ordering::Release);
        error!(failures, error = %last_error, "Outfit pipeline disabled after repeated failures");
        self.notifier.notify(Notice::error(format!(
            "Outfit tracking disabled after {failures} consecutive failures. Enable it again to resume."
        )));
        PipelineError::ConsecutiveFailureExhaustion(failures)
    }
}
