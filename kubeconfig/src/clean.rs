use std::collections::BTreeMap;

use crate::direct;
pub use crate::direct::{
    ApiVersion, Cluster, ClusterSpec, Context, ContextSpec, Kind, User, UserSpec,
};
use crate::{Error, Result};

/// A kubeconfig keyed by name, the shape every operation here works on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KubeConfig {
    pub contexts: BTreeMap<String, ContextSpec>,
    pub current_context: String,
    pub clusters: BTreeMap<String, ClusterSpec>,
    pub preferences: serde_yaml::Value,
    pub users: BTreeMap<String, UserSpec>,
    pub extensions: Option<serde_yaml::Value>,
}

impl From<direct::KubeConfig> for KubeConfig {
    fn from(kc: direct::KubeConfig) -> Self {
        Self {
            current_context: kc.current_context,
            preferences: kc.preferences,
            extensions: kc.extensions,
            contexts: kc
                .contexts
                .into_iter()
                .map(|ctx| (ctx.name, ctx.context))
                .collect(),
            clusters: kc
                .clusters
                .into_iter()
                .map(|cls| (cls.name, cls.cluster))
                .collect(),
            users: kc
                .users
                .into_iter()
                .map(|usr| (usr.name, usr.user))
                .collect(),
        }
    }
}

impl From<KubeConfig> for direct::KubeConfig {
    fn from(kc: KubeConfig) -> Self {
        direct::KubeConfig {
            kind: Kind::Config,
            api_version: ApiVersion::V1,
            preferences: if kc.preferences.is_null() {
                serde_yaml::Value::Mapping(Default::default())
            } else {
                kc.preferences
            },
            current_context: kc.current_context,
            extensions: kc.extensions,

            clusters: kc
                .clusters
                .into_iter()
                .map(|(name, cluster)| Cluster { name, cluster })
                .collect(),
            contexts: kc
                .contexts
                .into_iter()
                .map(|(name, context)| Context { name, context })
                .collect(),
            users: kc
                .users
                .into_iter()
                .map(|(name, user)| User { name, user })
                .collect(),
        }
    }
}

fn is_unset(value: &serde_yaml::Value) -> bool {
    match value {
        serde_yaml::Value::Null => true,
        serde_yaml::Value::Mapping(m) => m.is_empty(),
        _ => false,
    }
}

impl KubeConfig {
    pub fn from_yaml(text: &str) -> Result<KubeConfig> {
        direct::KubeConfig::from_yaml(text).map(KubeConfig::from)
    }

    pub fn to_yaml(&self) -> Result<String> {
        direct::KubeConfig::from(self.clone()).to_yaml()
    }

    /// Folds `other` into `self` the way kubectl merges a `KUBECONFIG` list:
    /// whatever is already defined here wins.
    pub fn merge(&mut self, other: KubeConfig) {
        if self.current_context.is_empty() {
            self.current_context = other.current_context;
        }
        if is_unset(&self.preferences) {
            self.preferences = other.preferences;
        }
        if self.extensions.is_none() {
            self.extensions = other.extensions;
        }

        for (name, cluster) in other.clusters {
            self.clusters.entry(name).or_insert(cluster);
        }
        for (name, context) in other.contexts {
            self.contexts.entry(name).or_insert(context);
        }
        for (name, user) in other.users {
            self.users.entry(name).or_insert(user);
        }
    }

    /// The spec of the current context.
    pub fn current(&self) -> Result<&ContextSpec> {
        if self.current_context.is_empty() {
            return Err(Error::NoCurrentContext);
        }
        self.contexts
            .get(&self.current_context)
            .ok_or_else(|| Error::ContextNotFound(self.current_context.clone()))
    }

    /// Drops everything not reachable from the current context.
    pub fn minify(&mut self) -> Result<()> {
        let context = self.current()?.clone();

        let cluster = self
            .clusters
            .get(&context.cluster)
            .cloned()
            .ok_or_else(|| Error::ClusterNotFound(context.cluster.clone()))?;
        let user = self
            .users
            .get(&context.user)
            .cloned()
            .ok_or_else(|| Error::UserNotFound(context.user.clone()))?;

        self.clusters = BTreeMap::from([(context.cluster.clone(), cluster)]);
        self.users = BTreeMap::from([(context.user.clone(), user)]);
        self.contexts = BTreeMap::from([(self.current_context.clone(), context)]);

        Ok(())
    }

    /// Embeds every referenced certificate and key file as inline data.
    pub fn flatten(&mut self) -> Result<()> {
        for (name, cluster) in &mut self.clusters {
            tracing::trace!(cluster = %name, "inlining cluster files");
            cluster.inline()?;
        }

        for (name, user) in &mut self.users {
            tracing::trace!(user = %name, "inlining user files");
            user.inline()?;
        }

        Ok(())
    }
}
