//! `outfitsync status` — Show configuration and stored state.

use outfitsync_config::AppConfig;
use outfitsync_core::StateDocument;
use outfitsync_store::{FileBackend, OutfitStateStore};
use std::sync::Arc;

use super::CliResult;

pub async fn run() -> CliResult {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let pipeline = &config.pipeline;

    println!("👗 OutfitSync Status");
    println!("===================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.default_model);
    println!("  Temperature:  {}", config.default_temperature);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    println!("  Pipeline:     {}", if pipeline.enabled { "enabled" } else { "disabled" });
    println!(
        "  Retries:      {} attempts, {} ms apart, off after {} failed cycles",
        pipeline.retry_attempts, pipeline.retry_delay_ms, pipeline.max_consecutive_failures
    );
    println!("  Debounce:     {} ms", pipeline.debounce_ms);
    println!("  Macro cache:  {} s", config.macros.cache_ttl_secs);

    if config.storage.backend == "none" {
        println!("  Storage:      none (state is not persisted)");
        return Ok(());
    }

    let path = config.storage.resolved_path();
    println!("  Storage:      {}", path.display());

    let store = OutfitStateStore::new().with_backend(Arc::new(FileBackend::new(&path)));
    match store.load().await {
        Ok(true) => print_counts(&store.snapshot()),
        Ok(false) => println!("\n  ⚠️  No saved state yet"),
        Err(e) => println!("\n  ❌ State file unreadable: {e}"),
    }

    Ok(())
}

fn print_counts(doc: &StateDocument) {
    let persona_outfits: usize = doc.persona_instances.values().map(|m| m.len()).sum();
    let presets: usize = doc.presets.persona.values().map(|m| m.len()).sum::<usize>()
        + doc.presets.user.values().map(|m| m.len()).sum::<usize>();

    println!();
    println!("  Characters:   {}", doc.persona_instances.len());
    println!("  Outfits:      {} character, {} user", persona_outfits, doc.user_instances.len());
    println!("  Presets:      {presets}");
}
