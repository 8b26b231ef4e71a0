//! Input acquisition: a local path or an http(s) URL, plus the naming of
//! the artifacts derived from it.

use reqwest::Url;
use std::path::{Path, PathBuf};

use crate::error::{Result, SensorLoggerError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Location {
    Path(PathBuf),
    Remote(Url),
}

/// One command-line input
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputSource {
    pub location: Location,
    /// Artifact base name, without directory or capture extensions
    pub stem: String,
    /// Directory the artifacts are written to
    pub out_dir: PathBuf,
}

impl InputSource {
    pub fn parse(arg: &str) -> Self {
        if let Ok(url) = Url::parse(arg) {
            if matches!(url.scheme(), "http" | "https") {
                let basename = url
                    .path_segments()
                    .and_then(|segments| segments.last())
                    .filter(|s| !s.is_empty())
                    .unwrap_or("download")
                    .to_string();
                return InputSource {
                    stem: strip_extensions(&basename),
                    out_dir: PathBuf::from("."),
                    location: Location::Remote(url),
                };
            }
        }

        let path = PathBuf::from(arg);
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| arg.to_string());
        let out_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        InputSource {
            stem: strip_extensions(&basename),
            out_dir,
            location: Location::Path(path),
        }
    }

    pub fn label(&self) -> String {
        match &self.location {
            Location::Path(p) => p.display().to_string(),
            Location::Remote(url) => url.to_string(),
        }
    }

    /// `<out_dir>/<stem><suffix>`
    pub fn artifact_path(&self, suffix: &str) -> PathBuf {
        self.out_dir.join(format!("{}{}", self.stem, suffix))
    }

    pub async fn fetch(&self, client: &reqwest::Client) -> Result<Vec<u8>> {
        match &self.location {
            Location::Path(path) => Ok(tokio::fs::read(path).await?),
            Location::Remote(url) => {
                log::debug!("fetching {}", url);
                let response = client.get(url.clone()).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(SensorLoggerError::UnrecognizedInput(format!(
                        "{}: HTTP {}",
                        url, status
                    )));
                }
                let bytes = response.bytes().await?;
                log::debug!("fetched {} bytes from {}", bytes.len(), url);
                Ok(bytes.to_vec())
            }
        }
    }
}

/// `ride.json.gz` -> `ride`, `ride.zip` -> `ride`
fn strip_extensions(basename: &str) -> String {
    let without_gz = match basename.strip_suffix(".gz") {
        Some(rest) if !rest.is_empty() => rest,
        _ => basename,
    };
    match Path::new(without_gz).file_stem() {
        Some(stem) if !stem.is_empty() => stem.to_string_lossy().into_owned(),
        _ => without_gz.to_string(),
    }
}
