//! `outfitsync outfit` — Show or edit an outfit directly.

use outfitsync_manager::OutfitManager;

use super::{CliResult, Workspace};
use crate::{OutfitAction, Target};

pub async fn run(target: &Target, action: OutfitAction) -> CliResult {
    let ws = Workspace::open(target).await?;

    match action {
        OutfitAction::Show { json } => {
            let manager = ws.manager();
            if json {
                println!("{}", serde_json::to_string_pretty(&manager.get_outfit_data())?);
            } else {
                print_outfit(manager);
            }
        }
        OutfitAction::Set { slot, value } => {
            ws.require_bound()?;
            let outcome = ws.manager().set_outfit_item(&slot, &value)?;
            finish(&ws, outcome.message()).await?;
        }
        OutfitAction::Remove { slot } => {
            ws.require_bound()?;
            let outcome = ws.manager().set_outfit_item(&slot, "")?;
            finish(&ws, outcome.message()).await?;
        }
        OutfitAction::Inject { enabled } => {
            ws.require_bound()?;
            ws.manager().set_prompt_injection(enabled)?;
            ws.persist().await?;
            println!(
                "Prompt injection {} for {}",
                if enabled { "enabled" } else { "disabled" },
                ws.manager().name()
            );
        }
    }

    Ok(())
}

async fn finish(ws: &Workspace, message: Option<&str>) -> CliResult {
    match message {
        Some(message) => {
            ws.persist().await?;
            println!("{message}");
        }
        None => println!("No change"),
    }
    Ok(())
}

fn print_outfit(manager: &dyn OutfitManager) {
    println!("👗 {}'s outfit", manager.name());
    match (manager.owner(), manager.instance_id()) {
        (Some(owner), Some(instance)) => println!("   {owner} in {instance}"),
        _ => {
            println!("   (not bound to a conversation)");
            return;
        }
    }
    if !manager.prompt_injection_enabled() {
        println!("   prompt injection off");
    }
    println!();
    let outfit = manager.get_outfit_data();
    for (slot, value) in outfit.iter() {
        println!("  {:<18} {value}", slot.as_str());
    }
}
