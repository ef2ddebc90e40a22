use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::Context as _;

#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Stdout,
    File(PathBuf),
}

impl From<Option<PathBuf>> for Output {
    fn from(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => Output::File(path),
            None => Output::Stdout,
        }
    }
}

impl Output {
    /// `stdout` is only written to for [`Output::Stdout`].
    pub fn write(&self, content: &str, stdout: impl Write) -> anyhow::Result<()> {
        match self {
            Output::Stdout => write_all(stdout, content),
            Output::File(path) => {
                let file = create(path)
                    .with_context(|| format!("failed to open {} for writing", path.display()))?;
                write_all(file, content)
            }
        }
    }
}

fn write_all(mut out: impl Write, content: &str) -> anyhow::Result<()> {
    out.write_all(content.as_bytes())
        .and_then(|()| out.flush())
        .context("failed to write configuration file")
}

/// The file holds a bearer token, so it is only readable by its owner.
fn create(path: &Path) -> io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}
