use anyhow::Context as _;
use k8s_openapi::api::{
    authentication::v1::{TokenRequest, TokenRequestSpec},
    core::v1::ServiceAccount,
};
use kube::{
    api::{Api, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use kubeconfig::KubeConfig;

/// What to ask for when requesting a token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenParams {
    /// Empty means the API server's own audience.
    pub audiences: Vec<String>,
    pub expiration_seconds: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken {
    pub token: String,
    /// RFC 3339 timestamp, when the issuer reports one.
    pub expires_at: Option<String>,
}

/// Mints a token for a service account, authenticating with `config`.
#[allow(async_fn_in_trait)]
pub trait TokenIssuer {
    async fn issue(
        &self,
        config: &KubeConfig,
        namespace: &str,
        service_account: &str,
        params: &TokenParams,
    ) -> anyhow::Result<IssuedToken>;
}

/// Makes the current user of a minified `config` act as `user` and `groups`.
///
/// Any impersonation the profile already carried is dropped, so the request
/// goes out as exactly the identity asked for. With neither set the profile
/// is left alone.
pub fn impersonate(
    config: &mut KubeConfig,
    user: Option<String>,
    groups: Vec<String>,
) -> anyhow::Result<()> {
    if user.is_none() && groups.is_empty() {
        return Ok(());
    }

    let user_name = config.current()?.user.clone();
    let spec = config
        .users
        .get_mut(&user_name)
        .with_context(|| format!("cannot locate user {user_name}"))?;
    spec.impersonate = user;
    spec.impersonate_groups = groups;
    spec.impersonate_uid = None;
    spec.impersonate_user_extra = None;

    Ok(())
}

/// Issues tokens through the `serviceaccounts/token` subresource of the
/// cluster the kubeconfig points at.
#[derive(Debug, Clone, Default)]
pub struct KubeTokenIssuer;

impl KubeTokenIssuer {
    async fn client(config: &KubeConfig) -> anyhow::Result<Client> {
        let kubeconfig = Kubeconfig::from_yaml(&config.to_yaml()?)
            .context("failed to extract client configuration")?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context("failed to extract client configuration")?;

        Client::try_from(config).context("failed to create kubernetes client")
    }
}

impl TokenIssuer for KubeTokenIssuer {
    #[tracing::instrument(skip(self, config, params))]
    async fn issue(
        &self,
        config: &KubeConfig,
        namespace: &str,
        service_account: &str,
        params: &TokenParams,
    ) -> anyhow::Result<IssuedToken> {
        let api: Api<ServiceAccount> = Api::namespaced(Self::client(config).await?, namespace);

        let request = TokenRequest {
            spec: TokenRequestSpec {
                audiences: params.audiences.clone(),
                expiration_seconds: params.expiration_seconds,
                ..TokenRequestSpec::default()
            },
            ..TokenRequest::default()
        };

        let response = api
            .create_token_request(service_account, &PostParams::default(), &request)
            .await?;
        let status = response
            .status
            .context("token request response carried no status")?;

        Ok(IssuedToken {
            token: status.token,
            expires_at: Some(status.expiration_timestamp.0.to_rfc3339()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: &str = r#"
current-context: admin
clusters:
- name: prod
  cluster: {server: "https://prod.example.com"}
contexts:
- name: admin
  context: {cluster: prod, user: admin}
users:
- name: admin
  user: {token: admin-token, as: someone-else}
"#;

    #[test]
    fn impersonation_overrides_current_user() {
        let mut config = KubeConfig::from_yaml(ADMIN).unwrap();
        impersonate(&mut config, Some("jane".into()), vec!["ops".into()]).unwrap();

        let admin = &config.users["admin"];
        assert_eq!(admin.impersonate.as_deref(), Some("jane"));
        assert_eq!(admin.impersonate_groups, ["ops"]);
        assert_eq!(admin.token.as_deref(), Some("admin-token"));
    }

    #[test]
    fn impersonation_drops_existing_groups_and_uid() {
        let mut config = KubeConfig::from_yaml(&ADMIN.replace(
            "as: someone-else}",
            "as: bob, as-groups: [system:masters], as-uid: \"42\", as-user-extra: {scopes: [all]}}",
        ))
        .unwrap();
        assert_eq!(config.users["admin"].impersonate_groups, ["system:masters"]);

        impersonate(&mut config, Some("jane".into()), Vec::new()).unwrap();

        let admin = &config.users["admin"];
        assert_eq!(admin.impersonate.as_deref(), Some("jane"));
        assert!(admin.impersonate_groups.is_empty());
        assert_eq!(admin.impersonate_uid, None);
        assert_eq!(admin.impersonate_user_extra, None);
    }

    #[test]
    fn groups_alone_clear_the_profile_user() {
        let mut config = KubeConfig::from_yaml(ADMIN).unwrap();
        impersonate(&mut config, None, vec!["ops".into()]).unwrap();

        let admin = &config.users["admin"];
        assert_eq!(admin.impersonate, None);
        assert_eq!(admin.impersonate_groups, ["ops"]);
    }

    #[test]
    fn no_impersonation_keeps_user() {
        let mut config = KubeConfig::from_yaml(ADMIN).unwrap();
        impersonate(&mut config, None, Vec::new()).unwrap();

        assert_eq!(
            config.users["admin"].impersonate.as_deref(),
            Some("someone-else")
        );
    }

    #[test]
    fn normalized_profile_is_readable_by_kube() {
        let config = KubeConfig::from_yaml(ADMIN).unwrap();
        let kubeconfig = Kubeconfig::from_yaml(&config.to_yaml().unwrap()).unwrap();

        assert_eq!(kubeconfig.current_context.as_deref(), Some("admin"));
        assert_eq!(kubeconfig.clusters.len(), 1);
    }
}
