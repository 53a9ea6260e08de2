//! Credentials and runtime settings.
//!
//! The subscription key and endpoint come from, in order: command-line
//! flags, `FACEMATCH_*` environment variables, a key file, and finally an
//! interactive prompt. Whatever was resolved is written back to the
//! default key file for the next run.

use anyhow::{Context, Result};
use facematch_client::normalize_endpoint;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

pub const KEY_ENV: &str = "FACEMATCH_KEY";
pub const ENDPOINT_ENV: &str = "FACEMATCH_ENDPOINT";
pub const KEY_FILE_ENV: &str = "FACEMATCH_KEY_FILE";

const KEY_FILE_NAME: &str = "key.txt";
const QUOTE_CHARS: &[char] = &['\'', '"', ' ', '\t'];

const ONBOARDING: &str = "
    To use the Azure face service:

        https://azure.microsoft.com/en-us/services/cognitive-services/face/

    a Face API subscription key and endpoint are needed.

    A free trial account can be created at:

        https://azure.microsoft.com/en-us/try/cognitive-services/?api=face-api
";

/// Runtime settings, loaded from `FACEMATCH_*` environment variables.
pub struct Settings {
    /// TrueType font for labels and captions.
    pub font_path: Option<PathBuf>,
    /// HTTP timeout for each face service call.
    pub timeout_secs: u64,
    /// Maximum `findsimilars` results per query.
    pub max_candidates: u32,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Settings from any key/value lookup; unset or unparsable values
    /// fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            font_path: lookup("FACEMATCH_FONT").map(PathBuf::from),
            timeout_secs: parse_or(lookup("FACEMATCH_TIMEOUT_SECS"), 30),
            max_candidates: parse_or(lookup("FACEMATCH_MAX_CANDIDATES"), 20),
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// A subscription key and the endpoint it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub key: String,
    pub endpoint: String,
}

/// What the user supplied up front, before any file or prompt is consulted.
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    pub key: Option<String>,
    pub endpoint: Option<String>,
    pub key_file: Option<PathBuf>,
}

impl CredentialSources {
    /// Fill whatever the flags left out from the environment.
    pub fn with_env_fallback(self) -> Self {
        self.with_fallback(|key| std::env::var(key).ok())
    }

    /// Fill whatever the flags left out from `lookup`. Blank values count
    /// as unset.
    pub fn with_fallback(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            key: self.key.or_else(|| non_empty(KEY_ENV)),
            endpoint: self.endpoint.or_else(|| non_empty(ENDPOINT_ENV)),
            key_file: self.key_file.or_else(|| non_empty(KEY_FILE_ENV).map(PathBuf::from)),
        }
    }
}

/// `$XDG_CONFIG_HOME/facematch/key.txt`, or `./key.txt` without a config dir.
pub fn default_key_file() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("facematch"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(KEY_FILE_NAME)
}

/// On-disk key file layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct KeyFile {
    key: Option<String>,
    endpoint: Option<String>,
}

/// Parse key file contents.
///
/// Accepts the TOML this tool writes and the older line format:
/// `key = ...` / `endpoint = ...` with optional quotes, `#` comments, and
/// bare lines (an `http...` line is the endpoint, anything else the key).
pub fn parse_key_file(contents: &str) -> (Option<String>, Option<String>) {
    if let Ok(file) = toml::from_str::<KeyFile>(contents) {
        if file.key.is_some() || file.endpoint.is_some() {
            return (file.key, file.endpoint);
        }
    }

    let mut key = None;
    let mut endpoint = None;
    for line in contents.lines() {
        let pair: Vec<&str> = line.split('=').collect();
        if pair.len() == 2 {
            let name = pair[0].trim_matches(QUOTE_CHARS).to_ascii_lowercase();
            let value = pair[1].trim_matches(QUOTE_CHARS).to_string();
            match name.as_str() {
                "key" => key = Some(value),
                "endpoint" => endpoint = Some(value),
                _ => {}
            }
        } else if !line.starts_with('#') {
            let value = line.trim_matches(QUOTE_CHARS);
            if value.is_empty() {
                continue;
            }
            if value.starts_with("http") {
                endpoint = Some(value.to_string());
            } else {
                key = Some(value.to_string());
            }
        }
    }
    (key, endpoint)
}

pub fn load_key(path: &Path) -> Result<(Option<String>, Option<String>)> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read key file {}", path.display()))?;
    Ok(parse_key_file(&contents))
}

pub fn save_key(credentials: &Credentials, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create {}", dir.display()))?;
    }
    let file = KeyFile {
        key: Some(credentials.key.clone()),
        endpoint: Some(credentials.endpoint.clone()),
    };
    std::fs::write(path, toml::to_string(&file)?)
        .with_context(|| format!("cannot write key file {}", path.display()))?;
    Ok(())
}

/// Interactive questions asked while resolving credentials.
pub trait Prompt {
    fn say(&mut self, message: &str);
    /// Ask until a non-empty answer is given.
    fn ask(&mut self, message: &str) -> io::Result<String>;
    fn confirm(&mut self, message: &str, default: bool) -> io::Result<bool>;
}

/// Prompt on stdin/stdout.
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn read_line(&self) -> io::Result<String> {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
        }
        Ok(line.trim().to_string())
    }
}

impl Prompt for TerminalPrompt {
    fn say(&mut self, message: &str) {
        println!("{message}");
    }

    fn ask(&mut self, message: &str) -> io::Result<String> {
        println!("{message}");
        loop {
            print!("> ");
            io::stdout().flush()?;
            let answer = self.read_line()?;
            if !answer.is_empty() {
                return Ok(answer);
            }
        }
    }

    fn confirm(&mut self, message: &str, default: bool) -> io::Result<bool> {
        print!("{message} {} ", if default { "[Y/n]" } else { "[y/N]" });
        io::stdout().flush()?;
        let answer = self.read_line()?.to_ascii_lowercase();
        Ok(match answer.as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        })
    }
}

/// Resolve the credential pair and persist it to `default_file`.
///
/// A pair whose endpoint is not a usable URL is rejected and not saved.
pub fn resolve_credentials(
    sources: CredentialSources,
    default_file: &Path,
    prompt: &mut impl Prompt,
) -> Result<Credentials> {
    let CredentialSources { key, endpoint, mut key_file } = sources;
    let mut from_file = (None, None);

    if key.is_none() || endpoint.is_none() {
        if key_file.is_none() {
            if default_file.exists() {
                let reuse = prompt.confirm(
                    "A subscription key is found locally! Would you like to use it?",
                    true,
                )?;
                if reuse {
                    key_file = Some(default_file.to_path_buf());
                }
            } else {
                prompt.say(ONBOARDING);
            }
        }
        if let Some(path) = &key_file {
            from_file = load_key(path)?;
            tracing::debug!(path = %path.display(), "loaded key file");
        }
    }

    let key = match key.or(from_file.0) {
        Some(key) => key,
        None => prompt.ask(&format!(
            "\nPlease paste the key below (it will be kept in\n'{}'):",
            default_file.display()
        ))?,
    };
    let endpoint = match endpoint.or(from_file.1) {
        Some(endpoint) => endpoint,
        None => prompt.ask("\nAnd the endpoint:")?,
    };

    normalize_endpoint(&endpoint).context("endpoint not saved")?;

    let credentials = Credentials { key, endpoint };
    if let Err(err) = save_key(&credentials, default_file) {
        tracing::warn!(error = %err, "could not persist credentials");
    }
    Ok(credentials)
}
