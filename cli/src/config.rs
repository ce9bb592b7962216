use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use basket_core::store::Store;

use crate::backend::DEFAULT_BACKEND_URL;

pub const BACKEND_URL_KEY: &str = "backend_url";

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "basket").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("basket.db");

        Ok(Config { db_path, data_dir })
    }

    /// Load the API key from disk, or generate a new one.
    ///
    /// Returns `(key, newly_created)`.
    pub fn load_or_create_api_key(&self) -> Result<(String, bool)> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");

        if path.exists() {
            let key = std::fs::read_to_string(&path).context("Failed to read API key file")?;
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok((key, false));
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let key = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        std::fs::write(&path, &key).context("Failed to write API key file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set API key file permissions")?;
        }
        tracing::info!(path = %path.display(), "generated API key");
        Ok((key, true))
    }
}

/// Pick the backend URL: explicit flag or `BASKET_BACKEND_URL`, then the stored
/// setting, then the default.
pub fn resolve_backend_url(explicit: Option<&str>, store: &Store) -> Result<String> {
    if let Some(url) = explicit.map(str::trim).filter(|u| !u.is_empty()) {
        return Ok(url.to_string());
    }
    if let Some(url) = store.get_setting(BACKEND_URL_KEY)? {
        return Ok(url);
    }
    Ok(DEFAULT_BACKEND_URL.to_string())
}

/// Validate and store the backend URL for later runs.
pub fn set_backend_url(store: &Store, url: &str) -> Result<String> {
    let url = url.trim().trim_end_matches('/');
    let parsed = reqwest::Url::parse(url).with_context(|| format!("Invalid URL: '{url}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("Backend URL must use http or https, got '{}'", parsed.scheme());
    }
    store.set_setting(BACKEND_URL_KEY, url)?;
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_backend_url_precedence() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(resolve_backend_url(None, &store).unwrap(), DEFAULT_BACKEND_URL);

        set_backend_url(&store, "http://pantry.local:5000/").unwrap();
        assert_eq!(
            resolve_backend_url(None, &store).unwrap(),
            "http://pantry.local:5000"
        );
        assert_eq!(
            resolve_backend_url(Some("http://other:1"), &store).unwrap(),
            "http://other:1"
        );
        assert_eq!(
            resolve_backend_url(Some("  "), &store).unwrap(),
            "http://pantry.local:5000"
        );
    }

    #[test]
    fn test_set_backend_url_rejects_garbage() {
        let store = Store::open_in_memory().unwrap();
        assert!(set_backend_url(&store, "not a url").is_err());
        assert!(set_backend_url(&store, "ftp://example.com").is_err());
        assert!(store.get_setting(BACKEND_URL_KEY).unwrap().is_none());
    }

    #[test]
    fn test_api_key_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            db_path: dir.path().join("basket.db"),
            data_dir: dir.path().to_path_buf(),
        };
        let (key, created) = config.load_or_create_api_key().unwrap();
        assert!(created);
        assert_eq!(key.len(), 64);
        let (again, created) = config.load_or_create_api_key().unwrap();
        assert!(!created);
        assert_eq!(again, key);
    }
}
