use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{direct, Error, KubeConfig, Result};

/// Environment variable holding a list of kubeconfig files.
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Where to look for the kubeconfig, in the order kubectl does.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    /// Set by `--kubeconfig`; when present nothing else is consulted.
    pub explicit_path: Option<PathBuf>,
    pub kubeconfig_env: Option<OsString>,
    pub home: Option<PathBuf>,
}

impl Loader {
    pub fn from_env(explicit_path: Option<PathBuf>) -> Self {
        Self {
            explicit_path,
            kubeconfig_env: env::var_os(KUBECONFIG_ENV),
            home: env::var_os("HOME").map(PathBuf::from),
        }
    }

    pub fn load(&self) -> Result<KubeConfig> {
        if let Some(path) = &self.explicit_path {
            tracing::debug!(path = %path.display(), "loading explicit kubeconfig");
            return load_file(path);
        }

        if let Some(list) = self.kubeconfig_env.as_ref().filter(|v| !v.is_empty()) {
            let paths: Vec<PathBuf> = env::split_paths(list)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            return load_merged(&paths);
        }

        let home = self.home.as_ref().ok_or(Error::NoHome)?;
        load_merged(&[kube_dir(home).join("config")])
    }
}

pub fn kube_dir(home: &Path) -> PathBuf {
    home.join(".kube")
}

fn load_file(path: &Path) -> Result<KubeConfig> {
    let mut kc = direct::KubeConfig::read_from(path)?;
    if let Some(dir) = path.parent() {
        kc.resolve_paths(dir);
    }
    Ok(kc.into())
}

fn load_merged(paths: &[PathBuf]) -> Result<KubeConfig> {
    let mut merged: Option<KubeConfig> = None;

    for path in paths {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "skipping missing kubeconfig");
            continue;
        }
        tracing::debug!(path = %path.display(), "loading kubeconfig");
        let kc = load_file(path)?;
        match &mut merged {
            Some(merged) => merged.merge(kc),
            None => merged = Some(kc),
        }
    }

    merged.ok_or_else(|| Error::NotFound {
        searched: paths.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        direct::KubeConfig::from_yaml(text)
            .unwrap()
            .write_to(&path)
            .unwrap();
        path
    }

    const PROD: &str = r#"
current-context: prod
clusters:
- name: prod
  cluster:
    server: https://prod.example.com
    certificate-authority: ca.crt
contexts:
- name: prod
  context: {cluster: prod, user: admin}
users:
- name: admin
  user: {token: abc}
"#;

    const DEV: &str = r#"
current-context: dev
clusters:
- name: dev
  cluster: {server: https://dev.example.com}
contexts:
- name: dev
  context: {cluster: dev, user: admin}
"#;

    #[test]
    fn explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let prod = write(dir.path(), "prod.yaml", PROD);
        let dev = write(dir.path(), "dev.yaml", DEV);

        let loader = Loader {
            explicit_path: Some(prod),
            kubeconfig_env: Some(dev.into_os_string()),
            home: None,
        };
        let kc = loader.load().unwrap();

        assert_eq!(kc.current_context, "prod");
        assert_eq!(
            kc.clusters["prod"].certificate_authority.as_deref(),
            Some(dir.path().join("ca.crt").as_path())
        );
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let loader = Loader {
            explicit_path: Some("/nonexistent/kubeconfig".into()),
            ..Loader::default()
        };
        assert!(matches!(loader.load(), Err(Error::Open { .. })));
    }

    #[test]
    fn env_list_merges_in_order_and_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let prod = write(dir.path(), "prod.yaml", PROD);
        let dev = write(dir.path(), "dev.yaml", DEV);
        let list = env::join_paths([dir.path().join("absent.yaml"), dev, prod]).unwrap();

        let loader = Loader {
            kubeconfig_env: Some(list),
            ..Loader::default()
        };
        let kc = loader.load().unwrap();

        assert_eq!(kc.current_context, "dev");
        assert_eq!(kc.clusters.len(), 2);
        assert_eq!(kc.users["admin"].token.as_deref(), Some("abc"));
    }

    #[test]
    fn falls_back_to_home() {
        let home = tempfile::tempdir().unwrap();
        fs::create_dir(kube_dir(home.path())).unwrap();
        write(&kube_dir(home.path()), "config", DEV);

        let loader = Loader {
            home: Some(home.path().to_owned()),
            ..Loader::default()
        };
        assert_eq!(loader.load().unwrap().current_context, "dev");
    }

    #[test]
    fn nothing_found() {
        let home = tempfile::tempdir().unwrap();
        let loader = Loader {
            home: Some(home.path().to_owned()),
            ..Loader::default()
        };
        assert!(matches!(loader.load(), Err(Error::NotFound { .. })));

        assert!(matches!(Loader::default().load(), Err(Error::NoHome)));
    }
}
