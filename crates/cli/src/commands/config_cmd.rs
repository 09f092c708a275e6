//! `outfitsync config` — Configuration management commands.

use outfitsync_config::AppConfig;

use super::CliResult;

pub async fn validate() -> CliResult {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let warnings = warnings(&config);
            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:  {}", config.default_provider);
            println!("   Model:     {}", config.default_model);
            println!("   Storage:   {}", config.storage.backend);
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Settings that load fine but are probably a mistake.
fn warnings(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();

    if config.api_key.is_none() && config.providers.values().all(|p| p.api_key.is_none()) {
        warnings.push("No API key set (set OUTFITSYNC_API_KEY, OPENROUTER_API_KEY or OPENAI_API_KEY)");
    }
    if !config.pipeline.enabled {
        warnings.push("Pipeline is disabled; `run` and `watch` will do nothing");
    }
    if config.pipeline.debounce_ms == 0 {
        warnings.push("Debounce is 0 ms; every message triggers its own model call");
    }
    if config.macros.cache_ttl_secs == 0 {
        warnings.push("Macro cache TTL is 0; every macro reads the store");
    }

    warnings
}

pub async fn show() -> CliResult {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> CliResult {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

pub async fn init() -> CliResult {
    print!("{}", AppConfig::default_toml());
    Ok(())
}
