use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::token::TokenParams;

/// Fully qualified username Kubernetes assigns to a service account.
pub fn qualified_name(namespace: &str, service_account: &str) -> String {
    format!("system:serviceaccount:{namespace}:{service_account}")
}

/// Generate a kubeconfig that authenticates as a service account.
#[derive(Debug, Clone, Parser)]
#[command(name = "kubectl-saconfig", version, disable_version_flag = true)]
pub struct Options {
    /// Name of the service account to issue a token for
    #[arg(value_name = "SERVICE_ACCOUNT")]
    pub service_account_name: String,

    /// Path to the kubeconfig file
    #[arg(short, long, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// The name of the kubeconfig context to use
    #[arg(long, value_name = "NAME")]
    pub context: Option<String>,

    /// Namespace of the service account (defaults to the namespace of the context)
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Username to impersonate for the token request
    #[arg(long = "as", value_name = "USER")]
    pub impersonate: Option<String>,

    /// Group to impersonate for the token request, may be repeated
    #[arg(long = "as-group", value_name = "GROUP")]
    pub impersonate_groups: Vec<String>,

    /// Intended audience of the token, may be repeated (defaults to the API server)
    #[arg(long = "audience", value_name = "AUDIENCE")]
    pub audiences: Vec<String>,

    /// Requested token lifetime in seconds (at least 600), the server may shorten it
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(i64).range(600..))]
    pub duration: Option<i64>,

    /// File to which to write the configuration (defaults to standard output)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    #[allow(dead_code)]
    version: (),
}

impl Options {
    pub fn qualified_name(&self, namespace: &str) -> String {
        qualified_name(namespace, &self.service_account_name)
    }

    pub fn token_params(&self) -> TokenParams {
        TokenParams {
            audiences: self.audiences.clone(),
            expiration_seconds: self.duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn parses_all_flags() {
        let opts = Options::try_parse_from([
            "kubectl-saconfig",
            "-k",
            "/tmp/admin.yaml",
            "--context",
            "admin@prod",
            "-n",
            "ci",
            "--as",
            "jane",
            "--as-group",
            "ops",
            "--as-group",
            "sre",
            "--audience",
            "vault",
            "--duration",
            "3600",
            "-o",
            "robot.yaml",
            "deployer",
        ])
        .unwrap();

        assert_eq!(opts.service_account_name, "deployer");
        assert_eq!(opts.kubeconfig, Some(PathBuf::from("/tmp/admin.yaml")));
        assert_eq!(opts.context.as_deref(), Some("admin@prod"));
        assert_eq!(opts.namespace.as_deref(), Some("ci"));
        assert_eq!(opts.impersonate.as_deref(), Some("jane"));
        assert_eq!(opts.impersonate_groups, ["ops", "sre"]);
        assert_eq!(opts.output, Some(PathBuf::from("robot.yaml")));

        let params = opts.token_params();
        assert_eq!(params.audiences, ["vault"]);
        assert_eq!(params.expiration_seconds, Some(3600));
    }

    #[test]
    fn defaults_leave_everything_unset() {
        let opts = Options::try_parse_from(["kubectl-saconfig", "deployer"]).unwrap();

        assert_eq!(opts.namespace, None);
        assert_eq!(opts.context, None);
        assert_eq!(opts.output, None);
        assert!(opts.audiences.is_empty());
        assert_eq!(opts.token_params().expiration_seconds, None);
    }

    #[test]
    fn missing_service_account_is_a_usage_error() {
        let err = Options::try_parse_from(["kubectl-saconfig", "-n", "ci"]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
        assert!(err.render().to_string().contains("Usage:"));
    }

    #[test]
    fn rejects_extra_positionals() {
        let err = Options::try_parse_from(["kubectl-saconfig", "one", "two"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn rejects_short_durations() {
        assert!(Options::try_parse_from(["kubectl-saconfig", "--duration", "60", "sa"]).is_err());
    }

    #[test]
    fn duration_help_states_minimum() {
        use clap::CommandFactory;

        let help = Options::command().render_help().to_string();
        assert!(help.contains("at least 600"));
    }

    #[test]
    fn version_flag_exits_cleanly() {
        let err = Options::try_parse_from(["kubectl-saconfig", "-v"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
        assert_eq!(err.exit_code(), 0);
    }

    #[test]
    fn qualifies_names() {
        assert_eq!(
            qualified_name("ci", "deployer"),
            "system:serviceaccount:ci:deployer"
        );
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Options::command().debug_assert();
    }
}
