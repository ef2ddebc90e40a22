pub mod cli;
pub mod output;
pub mod rewrite;
pub mod token;

use std::io::Write;

use anyhow::Context as _;
use kubeconfig::{KubeConfig, Loader};

pub use cli::Options;
pub use output::Output;
pub use token::{impersonate, IssuedToken, KubeTokenIssuer, TokenIssuer, TokenParams};

/// Namespace used when neither the flag nor the context names one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Reduces `config` to a single context, switching to `context` first unless
/// it is empty, with every referenced file embedded.
pub fn normalize(mut config: KubeConfig, context: Option<&str>) -> anyhow::Result<KubeConfig> {
    if let Some(context) = context.filter(|c| !c.is_empty()) {
        config.current_context = context.to_owned();
    }

    config.minify().context("failed to minify configuration")?;
    config.flatten().context("failed to flatten configuration")?;

    tracing::debug!(context = %config.current_context, "normalized configuration");
    Ok(config)
}

/// The namespace the service account lives in.
pub fn resolve_namespace(options: &Options, config: &KubeConfig) -> anyhow::Result<String> {
    if let Some(namespace) = options.namespace.as_deref().filter(|ns| !ns.is_empty()) {
        return Ok(namespace.to_owned());
    }

    let namespace = config
        .current()?
        .namespace
        .clone()
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned());
    Ok(namespace)
}

/// Requests a token and rewrites the normalized `config` around it.
pub async fn generate(
    options: &Options,
    mut config: KubeConfig,
    issuer: &impl TokenIssuer,
) -> anyhow::Result<KubeConfig> {
    let namespace = resolve_namespace(options, &config)?;
    let name = &options.service_account_name;

    let mut requester = config.clone();
    impersonate(
        &mut requester,
        options.impersonate.clone(),
        options.impersonate_groups.clone(),
    )?;

    let issued = issuer
        .issue(&requester, &namespace, name, &options.token_params())
        .await
        .with_context(|| format!("failed to acquire token for serviceaccount {name}"))?;
    tracing::info!(
        serviceaccount = %options.qualified_name(&namespace),
        expires_at = issued.expires_at.as_deref().unwrap_or("unknown"),
        "issued token"
    );

    rewrite::add_service_account_token(&mut config, &namespace, name, &issued.token)
        .context("failed to add token to configuration")?;
    Ok(config)
}

/// Writes `config` to the file named by `output`, or to `stdout`.
pub fn write_config(config: &KubeConfig, output: &Output, stdout: impl Write) -> anyhow::Result<()> {
    let content = config
        .to_yaml()
        .context("failed to marshal configuration")?;
    output
        .write(&content, stdout)
        .context("failed to write client configuration")
}

pub async fn run(
    options: &Options,
    issuer: &impl TokenIssuer,
    stdout: impl Write,
) -> anyhow::Result<()> {
    let config = Loader::from_env(options.kubeconfig.clone())
        .load()
        .context("failed to get kubernetes configuration")?;
    let config = normalize(config, options.context.as_deref())?;
    let config = generate(options, config, issuer).await?;

    write_config(&config, &Output::from(options.output.clone()), stdout)
}
