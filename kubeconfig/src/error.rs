use std::{io, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Opening kube config {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Parsing kube config {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Writing kube config {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Parsing kube config")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Reading {} for {field}", .path.display())]
    Inline {
        field: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{field} has both a path and inline data")]
    InlineConflict { field: &'static str },
    #[error("HOME is not set, cannot locate the default kube config")]
    NoHome,
    #[error("no kube config found (looked in {})", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },
    #[error("current-context must exist in order to minify")]
    NoCurrentContext,
    #[error("cannot locate context {0}")]
    ContextNotFound(String),
    #[error("cannot locate cluster {0}")]
    ClusterNotFound(String),
    #[error("cannot locate user {0}")]
    UserNotFound(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
