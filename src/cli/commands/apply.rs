//! `apply` command
//!
//! Runs a module through the execution layer. With `--state` the cluster is
//! an in-memory object list read from (and written back to) a YAML file.
//! Without it, builds with the `kubernetes` feature talk to the cluster from
//! the current kubeconfig.

use super::{CommandContext, ModuleArgs};
use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use sodalite_k8s::error::Error;
use sodalite_k8s::modules::k8s::executor::{InMemoryClient, ResourceClient};
use sodalite_k8s::modules::ModuleContext;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Arguments for the apply command
#[derive(Parser, Debug, Clone)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: ModuleArgs,

    /// YAML file with the objects of an in-memory cluster
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Report what would change without changing anything
    #[arg(long)]
    pub check: bool,

    /// Show before/after differences
    #[arg(long)]
    pub diff: bool,

    /// Kubeconfig used when no --state file is given
    #[cfg(feature = "kubernetes")]
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context used when no --state file is given
    #[cfg(feature = "kubernetes")]
    #[arg(long)]
    pub context: Option<String>,
}

/// Objects stored in a state file. A missing or empty file is an empty cluster.
pub fn read_state(path: &Path) -> Result<Vec<Value>, Error> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    match serde_yaml::from_str::<Option<Value>>(&content)? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(objects)) => Ok(objects),
        Some(_) => Err(Error::InvalidFile {
            path: path.to_path_buf(),
            message: "state must be a list of objects".to_string(),
        }),
    }
}

fn write_state(path: &Path, objects: &[Value]) -> Result<()> {
    let text = serde_yaml::to_string(objects)?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write state file: {}", path.display()))
}

impl ApplyArgs {
    #[cfg(feature = "kubernetes")]
    fn live_client(&self) -> Result<Arc<dyn ResourceClient>, Error> {
        use sodalite_k8s::modules::k8s::kube_client::KubeClient;
        let client = KubeClient::connect(self.kubeconfig.as_deref(), self.context.as_deref())
            .map_err(|e| Error::module(&self.target.module, e))?;
        Ok(Arc::new(client))
    }

    #[cfg(not(feature = "kubernetes"))]
    fn live_client(&self) -> Result<Arc<dyn ResourceClient>, Error> {
        Err(Error::Config(
            "apply needs --state: this build has no Kubernetes client (enable the 'kubernetes' feature)"
                .to_string(),
        ))
    }

    /// Execute the apply command
    pub fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let module = &self.target.module;
        let params = match ctx
            .registry
            .require(module)
            .map_err(|e| Error::module(module, e))
            .and_then(|_| ctx.load_params(&self.target.params))
        {
            Ok(params) => params,
            Err(e) => return Ok(ctx.fail(&e)),
        };

        let memory = match &self.state {
            Some(path) => match read_state(path).and_then(|objects| {
                InMemoryClient::with_objects(objects).map_err(|e| Error::module(module, e))
            }) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => return Ok(ctx.fail(&e)),
            },
            None => None,
        };
        let client: Arc<dyn ResourceClient> = match &memory {
            Some(client) => client.clone() as Arc<dyn ResourceClient>,
            None => match self.live_client() {
                Ok(client) => client,
                Err(e) => return Ok(ctx.fail(&e)),
            },
        };

        let check_mode = self.check || ctx.config.execution.check_mode;
        let context = ModuleContext::new()
            .with_check_mode(check_mode)
            .with_diff_mode(self.diff || ctx.config.execution.diff)
            .with_client(client);

        let output = match ctx.registry.execute(module, &params, &context) {
            Ok(output) => output,
            Err(e) => return Ok(ctx.fail(&Error::module(module, e))),
        };
        info!(module = %module, changed = output.changed, "module finished");

        if let (Some(client), Some(path)) = (&memory, &self.state) {
            if output.changed && !check_mode {
                write_state(path, &client.objects())?;
            }
        }

        let text = ctx.output.format_result(module, &output)?;
        std::io::stdout().write_all(text.as_bytes())?;
        Ok(0)
    }
}
