//! The kubeconfig file exactly as it is laid out on disk.

use std::{
    fs,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::*;
use serde_yaml::Value as YamlValue;

use crate::{Error, Result};

/// Accepts both a missing key and an explicit `null`, which kubectl writes for empty lists.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_false(b: &Option<bool>) -> bool {
    !b.unwrap_or(false)
}

// region: Context
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ContextSpec {
    pub cluster: String,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<YamlValue>,
}
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Context {
    pub name: String,
    pub context: ContextSpec,
}
// endregion

/// Reads the file at `path` into `data`, base64 encoded, and forgets the path.
fn inline_data(
    field: &'static str,
    path: &mut Option<PathBuf>,
    data: &mut Option<String>,
) -> Result<()> {
    let Some(file) = path.take() else {
        return Ok(());
    };

    if data.is_some() {
        return Err(Error::InlineConflict { field });
    }

    let contents = fs::read(&file).map_err(|source| Error::Inline {
        field,
        path: file.clone(),
        source,
    })?;
    *data = Some(STANDARD.encode(contents));

    Ok(())
}

fn resolve_path(path: &mut Option<PathBuf>, base: &Path) {
    if let Some(path) = path {
        if !path.as_os_str().is_empty() && path.is_relative() {
            *path = base.join(&*path);
        }
    }
}

// region: Cluster
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterSpec {
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_server_name: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub insecure_skip_tls_verify: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authority: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authority_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_compression: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<YamlValue>,
}

impl ClusterSpec {
    pub fn inline(&mut self) -> Result<()> {
        inline_data(
            "certificate-authority",
            &mut self.certificate_authority,
            &mut self.certificate_authority_data,
        )
    }

    fn resolve_paths(&mut self, base: &Path) {
        resolve_path(&mut self.certificate_authority, base);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Cluster {
    pub name: String,
    pub cluster: ClusterSpec,
}
// endregion

// region: User
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct UserSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_certificate: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_certificate_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
    #[serde(default, rename = "as", skip_serializing_if = "Option::is_none")]
    pub impersonate: Option<String>,
    #[serde(default, rename = "as-uid", skip_serializing_if = "Option::is_none")]
    pub impersonate_uid: Option<String>,
    #[serde(
        default,
        rename = "as-groups",
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub impersonate_groups: Vec<String>,
    #[serde(default, rename = "as-user-extra", skip_serializing_if = "Option::is_none")]
    pub impersonate_user_extra: Option<YamlValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_provider: Option<YamlValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<YamlValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<YamlValue>,
}

impl UserSpec {
    /// A user that authenticates with nothing but a bearer token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn inline(&mut self) -> Result<()> {
        inline_data(
            "client-certificate",
            &mut self.client_certificate,
            &mut self.client_certificate_data,
        )?;
        inline_data(
            "client-key",
            &mut self.client_key,
            &mut self.client_key_data,
        )
    }

    fn resolve_paths(&mut self, base: &Path) {
        resolve_path(&mut self.client_certificate, base);
        resolve_path(&mut self.client_key, base);
        resolve_path(&mut self.token_file, base);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub name: String,
    pub user: UserSpec,
}
// endregion

// region: Common
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub enum ApiVersion {
    #[default]
    #[serde(rename = "v1")]
    V1,
}
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub enum Kind {
    #[default]
    Config,
}

fn empty_mapping() -> YamlValue {
    YamlValue::Mapping(Default::default())
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct KubeConfig {
    #[serde(rename = "apiVersion", default)]
    pub api_version: ApiVersion,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clusters: Vec<Cluster>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contexts: Vec<Context>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_context: String,
    #[serde(default)]
    pub kind: Kind,
    #[serde(default = "empty_mapping")]
    pub preferences: YamlValue,
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: Vec<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<YamlValue>,
}

impl Default for KubeConfig {
    fn default() -> Self {
        Self {
            api_version: ApiVersion::V1,
            clusters: Vec::new(),
            contexts: Vec::new(),
            current_context: String::new(),
            kind: Kind::Config,
            preferences: empty_mapping(),
            users: Vec::new(),
            extensions: None,
        }
    }
}

impl KubeConfig {
    pub fn inline(&mut self) -> Result<()> {
        for cluster in &mut self.clusters {
            cluster.cluster.inline()?;
        }

        for user in &mut self.users {
            user.user.inline()?;
        }

        Ok(())
    }

    /// Makes relative file references absolute against `base`, the directory
    /// of the file this config was read from.
    pub fn resolve_paths(&mut self, base: &Path) {
        for cluster in &mut self.clusters {
            cluster.cluster.resolve_paths(base);
        }

        for user in &mut self.users {
            user.user.resolve_paths(base);
        }
    }

    /// An empty document is an empty config, not an error.
    pub fn from_yaml(text: &str) -> Result<KubeConfig> {
        if text.trim().is_empty() {
            return Ok(KubeConfig::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn read_from(path: impl AsRef<Path>) -> Result<KubeConfig> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Open {
            path: path.to_owned(),
            source,
        })?;

        Self::from_yaml(&text).map_err(|err| match err {
            Error::Yaml(source) => Error::Parse {
                path: path.to_owned(),
                source,
            },
            other => other,
        })
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_yaml()?).map_err(|source| Error::Write {
            path: path.to_owned(),
            source,
        })
    }
}
// endregion
