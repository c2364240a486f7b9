use std::sync::Arc;

use anyhow::Context;
use clarity::{
    cli::config_path_from_args,
    config::Config,
    decision::DecisionOrchestrator,
    logging::init_tracing,
    model::{credentials::ModelServiceSettings, openai_compatible::OpenAiCompatibleModel},
    server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::resolve(config_path.as_deref()).context("failed to load config")?;
    let logging_guard = init_tracing(&config.logging)?;

    let settings = ModelServiceSettings::from_env(&config.model)
        .context("model service is not configured")?;
    let model = OpenAiCompatibleModel::new(settings).context("failed to build model client")?;
    tracing::info!(
        target: "server",
        run_id = %logging_guard.run_id(),
        model = %model.model(),
        "model_client_ready"
    );
    let orchestrator = Arc::new(DecisionOrchestrator::new(
        Arc::new(model),
        config.decision.timeout(),
    ));

    let result = server::run(config, orchestrator).await;
    if let Err(err) = &result {
        tracing::error!(target: "server", error = %format!("{err:#}"), "server_failed");
    }
    result
}
