//! `outfitsync preset` — Manage saved outfits.

use super::{CliResult, Workspace};
use crate::{PresetAction, Target};

pub async fn run(target: &Target, action: PresetAction) -> CliResult {
    let ws = Workspace::open(target).await?;
    ws.require_bound()?;
    let manager = ws.manager();

    match action {
        PresetAction::List => {
            let default = manager.get_default_preset_name()?;
            let presets = manager.get_presets()?;
            if presets.is_empty() {
                println!("No presets saved for {}", manager.name());
            }
            for name in presets {
                let marker = if default.as_deref() == Some(name.as_str()) { " (default)" } else { "" };
                println!("  {name}{marker}");
            }
            return Ok(());
        }
        PresetAction::Save { name, overwrite } => {
            if overwrite {
                manager.overwrite_preset(&name)?;
            } else {
                manager.save_preset(&name)?;
            }
            println!("Saved preset \"{name}\"");
        }
        PresetAction::Load { name } => {
            let changes = manager.load_preset(&name)?;
            print_changes(&changes);
        }
        PresetAction::Delete { name } => {
            manager.delete_preset(&name)?;
            println!("Deleted preset \"{name}\"");
        }
        PresetAction::Default { name } => {
            manager.set_default_preset(&name)?;
            println!("\"{name}\" is now the default outfit");
        }
        PresetAction::ClearDefault => {
            if !manager.clear_default_preset()? {
                println!("No default outfit was set");
                return Ok(());
            }
            println!("Default outfit cleared");
        }
        PresetAction::Wear => match manager.load_default_outfit()? {
            Some(changes) => print_changes(&changes),
            None => {
                println!("No default outfit is set");
                return Ok(());
            }
        },
    }

    ws.persist().await
}

fn print_changes(changes: &[String]) {
    if changes.is_empty() {
        println!("Already wearing that");
    }
    for change in changes {
        println!("  {change}");
    }
}
