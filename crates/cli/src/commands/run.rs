//! `outfitsync run` / `outfitsync watch` — Model-driven outfit updates.

use std::sync::Arc;
use std::time::Duration;

use outfitsync_core::message::transcript;
use outfitsync_core::{EventBus, HostContext, HostEvent};
use outfitsync_pipeline::ProcessOutcome;
use outfitsync_store::derive_instance_id;

use super::apply::print_report;
use super::{CliResult, Workspace};
use crate::Target;

const LOCAL_PROVIDERS: &[&str] = &["ollama", "vllm", "llamacpp", "llama.cpp"];

pub async fn run(target: &Target, dry_run: bool) -> CliResult {
    let ws = Workspace::open(target).await?;
    ws.require_bound()?;
    let messages = ws.session_file.messages();

    if dry_run {
        println!("── System prompt ──");
        println!("{}", ws.pipeline().rendered_system_prompt());
        println!("── Transcript ──");
        println!("{}", transcript(&messages, ws.config.pipeline.message_window));
        return Ok(());
    }

    check_api_key(&ws)?;
    match ws.pipeline().manual_trigger(&messages).await? {
        ProcessOutcome::Applied(report) => print_report(&report),
        ProcessOutcome::Skipped(reason) => println!("Skipped: {reason:?}"),
        ProcessOutcome::Discarded => println!("Result discarded, the pipeline was disabled"),
    }
    Ok(())
}

pub async fn watch(target: &Target, interval_ms: u64) -> CliResult {
    let ws = Workspace::open(target).await?;
    check_api_key(&ws)?;

    let bus = Arc::new(EventBus::default());
    let coordinator = Arc::clone(&ws.coordinator);
    let bus_for_session = Arc::clone(&bus);
    let session = tokio::spawn(async move { coordinator.run(&bus_for_session).await });

    println!(
        "👀 Watching {} (Ctrl-C to stop)",
        target.session.display()
    );

    let mut seen = ws.session_file.message_count();
    let mut instance = derive_instance_id(&ws.session_file.messages());
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(50)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        if !ws.session_file.reload().await {
            continue;
        }
        let count = ws.session_file.message_count();
        let current = derive_instance_id(&ws.session_file.messages());

        if current != instance {
            instance = current;
            seen = count;
            bus.publish(HostEvent::conversation_changed(
                instance.as_ref().map(|i| i.to_string()).unwrap_or_default(),
            ));
        } else if count > seen {
            seen = count;
            bus.publish(HostEvent::message_received(count - 1));
        } else {
            seen = count;
        }
    }

    session.abort();
    ws.persist().await?;
    println!("Stopped");
    Ok(())
}

fn check_api_key(ws: &Workspace) -> CliResult {
    if ws.config.has_api_key()
        || ws.config.providers.values().any(|p| p.api_key.is_some())
        || LOCAL_PROVIDERS.contains(&ws.config.default_provider.as_str())
    {
        return Ok(());
    }
    Err(format!(
        "No API key configured. Set OUTFITSYNC_API_KEY, OPENROUTER_API_KEY or OPENAI_API_KEY, \
         or add api_key to {}",
        outfitsync_config::AppConfig::config_dir().join("config.toml").display()
    )
    .into())
}
