use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tracing::Instrument;

use scribe_stack::{
    cli::args_from_env, composer::StackComposer, config::Config, logging::init_tracing,
    secrets::resolve_secrets,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = args_from_env()?;
    let config = Config::load(&args.config_path)
        .with_context(|| format!("failed to load config from {}", args.config_path.display()))?;
    let logging = init_tracing(&config.logging, &config.environment)
        .context("failed to initialize logging")?;

    let output_path = args.output_path.clone().or(config.output.path.clone());
    run(config, output_path)
        .instrument(logging.span().clone())
        .await
}

async fn run(config: Config, output_path: Option<PathBuf>) -> Result<()> {
    let provider = config.secrets.provider();
    let secrets = resolve_secrets(provider.as_ref(), config.stack.secret_names())
        .await
        .context("failed to resolve secrets")?;

    let composer = StackComposer::new(config.environment.clone());
    let stack = composer
        .compose(&config.stack, &secrets)
        .with_context(|| format!("failed to compose stack {}", config.environment.stack_name))?;
    let snapshot = stack
        .to_json_pretty()
        .context("failed to serialize composed stack")?;

    match &output_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            tokio::fs::write(path, snapshot.as_bytes())
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(snapshot.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    tracing::info!(
        target: "main",
        fingerprint = %stack.fingerprint(),
        resources = stack.resources().len(),
        compute_units = stack.compute_units().len(),
        routes = stack.routes().entries().len(),
        output = %output_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "stdout".to_string()),
        "snapshot_written"
    );
    Ok(())
}
