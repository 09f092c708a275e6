//! Apply the commands found in one model reply.

use outfitsync_commands::{extract_commands, parse_command, Action, Command, Confidence};
use outfitsync_manager::{OutfitManager, SetItemOutcome};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct AppliedCommand {
    pub command: Command,
    pub confidence: Confidence,
    /// Transition message from the manager
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedCommand {
    /// The extracted text as it appeared in the reply
    pub raw: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LowConfidenceCommand {
    pub command: Command,
    pub confidence: Confidence,
}

/// Outcome of every command in one reply, by bucket.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub successful: Vec<AppliedCommand>,
    pub unchanged: Vec<Command>,
    pub failed: Vec<FailedCommand>,
    pub low_confidence: Vec<LowConfidenceCommand>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.successful.len() + self.unchanged.len() + self.failed.len() + self.low_confidence.len()
    }

    /// The aggregate notice text, if anything was applied.
    pub fn summary(&self) -> Option<String> {
        match self.successful.len() {
            0 => None,
            1 => Some("1 outfit change applied".to_string()),
            n => Some(format!("{n} outfit changes applied")),
        }
    }
}

/// Extract, score, and apply every command in `text` to `manager`.
///
/// Commands are independent: one failing never stops the rest.
pub fn apply_batch(manager: &dyn OutfitManager, text: &str) -> BatchReport {
    let mut report = BatchReport::default();

    for raw in extract_commands(text) {
        let command = match parse_command(&raw) {
            Ok(c) => c,
            Err(e) => {
                debug!(raw = %raw, error = %e, "Extracted command failed to parse");
                report.failed.push(FailedCommand { raw, reason: e.to_string() });
                continue;
            }
        };

        let confidence = command.confidence(manager.slots());
        if !confidence.passes() {
            warn!(%command, %confidence, "Dropping low-confidence command");
            report.low_confidence.push(LowConfidenceCommand { command, confidence });
            continue;
        }

        let value = match command.action.canonical() {
            Action::Remove => "",
            _ if command.value.trim().is_empty() => {
                report.failed.push(FailedCommand {
                    raw,
                    reason: format!("'{}' needs an item description", command.action),
                });
                continue;
            }
            _ => command.value.as_str(),
        };

        match manager.set_outfit_item(&command.slot, value) {
            Ok(SetItemOutcome::Changed(message)) => {
                info!(%command, %confidence, "Applied outfit command");
                report.successful.push(AppliedCommand { command, confidence, message });
            }
            Ok(SetItemOutcome::Unchanged) => report.unchanged.push(command),
            Ok(SetItemOutcome::Unbound) => report.failed.push(FailedCommand {
                raw,
                reason: "no active character or conversation".into(),
            }),
            Err(e) => report.failed.push(FailedCommand { raw, reason: e.to_string() }),
        }
    }

    report
}
