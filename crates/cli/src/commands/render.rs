//! `outfitsync render` — Substitute outfit macros in a template.

use super::{CliResult, Workspace};
use crate::Target;

pub async fn run(target: &Target, template: &str) -> CliResult {
    let ws = Workspace::open(target).await?;
    println!("{}", ws.resolver.substitute_all(template));
    Ok(())
}
