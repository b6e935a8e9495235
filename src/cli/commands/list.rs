//! `list` command

use super::CommandContext;
use anyhow::Result;
use std::io::Write;

/// Print every registered module with its description
pub fn list(ctx: &CommandContext) -> Result<i32> {
    let modules: Vec<(&str, &str)> = ctx
        .registry
        .names()
        .into_iter()
        .filter_map(|name| {
            ctx.registry
                .get(name)
                .map(|module| (module.name(), module.description()))
        })
        .collect();
    let text = ctx.output.format_modules(&modules)?;
    std::io::stdout().write_all(text.as_bytes())?;
    Ok(0)
}
