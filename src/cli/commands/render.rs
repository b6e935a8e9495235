//! `render` and `validate` commands
//!
//! Both run the module pipeline without a cluster: parse the parameters,
//! build and prune the definition, then validate it unless `state` is absent.

use super::{CommandContext, ModuleArgs};
use anyhow::Result;
use sodalite_k8s::error::Error;
use sodalite_k8s::modules::{ModuleError, ValidationError};
use std::io::Write;
use tracing::debug;

fn render_definition(args: &ModuleArgs, ctx: &CommandContext) -> Result<serde_json::Value, Error> {
    let module = ctx
        .registry
        .require(&args.module)
        .map_err(|e| Error::module(&args.module, e))?;
    let params = ctx.load_params(&args.params)?;
    debug!(module = %args.module, params = %args.params.display(), "rendering");
    module
        .render(&params)
        .map_err(|e| Error::module(&args.module, e))
}

/// Print the rendered definition
pub fn render(args: &ModuleArgs, ctx: &CommandContext) -> Result<i32> {
    match render_definition(args, ctx) {
        Ok(definition) => {
            let text = ctx.output.format_definition(&definition)?;
            std::io::stdout().write_all(text.as_bytes())?;
            Ok(0)
        }
        Err(e) => Ok(ctx.fail(&e)),
    }
}

/// Print `ok` or every violated rule
pub fn validate(args: &ModuleArgs, ctx: &CommandContext) -> Result<i32> {
    let outcome = render_definition(args, ctx);
    let errors: Vec<ValidationError> = match &outcome {
        Ok(_) => Vec::new(),
        Err(Error::Module {
            source: ModuleError::Validation(errors),
            ..
        }) => {
            let limit = if ctx.config.execution.fail_fast_validation {
                1
            } else {
                errors.len()
            };
            errors.iter().take(limit).cloned().collect()
        }
        Err(e) => return Ok(ctx.fail(e)),
    };

    let text = ctx.output.format_validation(&args.module, &errors)?;
    std::io::stdout().write_all(text.as_bytes())?;
    Ok(outcome.map_or_else(|e| e.exit_code(), |_| 0))
}
