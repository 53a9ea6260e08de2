//! Image references: a remote URL or a local file.

use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

const URL_SCHEMES: [&str; 4] = ["http", "https", "ftp", "ftps"];

/// Where an image comes from. Decides how it is submitted for detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(Url),
    File(PathBuf),
}

impl ImageSource {
    /// Classify a user-supplied reference.
    ///
    /// Absolute http(s)/ftp(s) URLs with a host are remote; everything else
    /// is a path, with `~` expanded and relative paths resolved against the
    /// working directory.
    pub fn parse(reference: &str) -> Self {
        if let Ok(url) = Url::parse(reference) {
            if URL_SCHEMES.contains(&url.scheme()) && url.host().is_some() {
                return ImageSource::Url(url);
            }
        }
        ImageSource::File(resolve_path(reference))
    }

    pub fn is_url(&self) -> bool {
        matches!(self, ImageSource::Url(_))
    }

    /// Local path, if this is a file reference.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            ImageSource::File(path) => Some(path),
            ImageSource::Url(_) => None,
        }
    }

    /// Short name for output files: file stem or last URL path segment.
    pub fn stem(&self) -> String {
        let name = match self {
            ImageSource::File(path) => path.file_stem().map(|s| s.to_string_lossy().into_owned()),
            ImageSource::Url(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|s| !s.is_empty())
                .map(|s| {
                    Path::new(s)
                        .file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                        .unwrap_or_else(|| s.to_string())
                }),
        };
        name.unwrap_or_else(|| "image".to_string())
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Url(url) => write!(f, "{url}"),
            ImageSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Expand a leading `~` and make the path absolute.
pub fn resolve_path(path: &str) -> PathBuf {
    let expanded = if path == "~" || path.starts_with("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/".to_string());
        PathBuf::from(home).join(path.trim_start_matches('~').trim_start_matches('/'))
    } else {
        PathBuf::from(path)
    };

    if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    }
}
