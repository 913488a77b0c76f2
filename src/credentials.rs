//! Credential loading from the runtime `.env` file and the process environment.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, warn};

/// Secrets loaded from `.env`, with the process environment as fallback.
#[derive(Clone, Default)]
pub struct Credentials {
    vars: BTreeMap<String, String>,
    use_env: bool,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .field("use_env", &self.use_env)
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a key-value map only, ignoring the environment.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self {
            vars,
            use_env: false,
        }
    }

    /// Returns a credential value for a key, if present and non-empty.
    pub fn get(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| {
                self.use_env
                    .then(|| std::env::var(key).ok())
                    .flatten()
            })
            .filter(|value| !value.trim().is_empty())
    }

    /// Returns a required credential or an error when missing.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is neither in the file nor the environment.
    pub fn require(&self, key: &str) -> anyhow::Result<String> {
        self.get(key)
            .ok_or_else(|| anyhow::anyhow!("missing required credential: {key}"))
    }
}

/// Load credentials from `path`, falling back to the process environment.
///
/// A missing file is not an error; every lookup then goes to the environment.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    let mut vars = BTreeMap::new();

    if path.exists() {
        warn_if_shared(path);
        let iter = dotenvy::from_path_iter(path)
            .with_context(|| format!("failed to read credentials at {}", path.display()))?;
        for item in iter {
            let (key, value) = item.with_context(|| {
                format!(
                    "failed to parse key-value entry in credentials file {}",
                    path.display()
                )
            })?;
            vars.insert(key, value);
        }
        debug!(path = %path.display(), keys = vars.len(), "credentials loaded");
    } else {
        debug!(path = %path.display(), "no credentials file, using environment");
    }

    Ok(Credentials {
        vars,
        use_env: true,
    })
}

/// Warn when the credentials file is readable by group or others.
fn warn_if_shared(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if let Ok(metadata) = std::fs::metadata(path) {
            let mode = metadata.permissions().mode() & 0o777;
            if mode & 0o077 != 0 {
                warn!(
                    path = %path.display(),
                    mode = format!("{mode:o}"),
                    "credentials file is readable by other users; consider chmod 600"
                );
            }
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}
