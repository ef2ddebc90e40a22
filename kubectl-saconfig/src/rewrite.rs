use std::collections::BTreeMap;

use kubeconfig::{ContextSpec, KubeConfig, UserSpec};

use crate::cli::qualified_name;

/// Replaces the current context and every user with a single context and
/// user for the service account, authenticating with `token` against the
/// cluster the current context pointed at.
pub fn add_service_account_token(
    config: &mut KubeConfig,
    namespace: &str,
    service_account: &str,
    token: &str,
) -> kubeconfig::Result<()> {
    let qual_name = qualified_name(namespace, service_account);
    let cluster = config.current()?.cluster.clone();

    let previous = std::mem::replace(&mut config.current_context, qual_name.clone());
    config.contexts.remove(&previous);
    config.contexts.insert(
        qual_name.clone(),
        ContextSpec {
            cluster,
            user: qual_name.clone(),
            namespace: Some(namespace.to_owned()),
            extensions: None,
        },
    );

    config.users = BTreeMap::from([(qual_name, UserSpec::with_token(token))]);

    Ok(())
}
