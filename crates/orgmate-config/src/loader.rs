use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::Config;

/// `$XDG_CONFIG_HOME/orgmate/config.toml`, falling back to the working
/// directory when no config dir can be determined.
pub fn default_config_path() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("orgmate").join("config.toml"),
        None => PathBuf::from("orgmate.toml"),
    }
}

/// A config file on disk.
///
/// A missing file is not an error: [`ConfigStore::load_or_init`] writes the
/// defaults to the path and returns them.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the explicit path if given, else at [`default_config_path`].
    pub fn at(path: Option<&Path>) -> Self {
        Self::new(path.map(Path::to_path_buf).unwrap_or_else(default_config_path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config, materializing and persisting the defaults when the
    /// file does not exist yet.
    pub fn load_or_init(&self) -> anyhow::Result<Config> {
        if !self.path.is_file() {
            debug!(path = %self.path.display(), "no config file; writing defaults");
            let config = Config::default();
            self.save(&config)?;
            return Ok(config);
        }

        debug!(path = %self.path.display(), "loading config");
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let text = toml::to_string_pretty(config).context("serializing config")?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_materializes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/orgmate/config.toml");
        let store = ConfigStore::new(&path);

        let cfg = store.load_or_init().unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.is_file(), "defaults must be persisted");

        let written: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, Config::default());
    }

    #[test]
    fn existing_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"[backend]
host = "http://gpu-box:11434"
default_model = "qwen2.5"
"#,
        )
        .unwrap();

        let cfg = ConfigStore::new(&path).load_or_init().unwrap();
        assert_eq!(cfg.backend.host, "http://gpu-box:11434");
        assert_eq!(cfg.backend.default_model, "qwen2.5");
    }

    #[test]
    fn invalid_file_is_an_error_with_path_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend = [not toml").unwrap();

        let err = ConfigStore::new(&path).load_or_init().unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"), "{err:#}");
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.toml"));
        let mut cfg = store.load_or_init().unwrap();
        cfg.knowledge_base.enable_auto_search = true;
        cfg.knowledge_base.directories = vec!["/notes".into()];
        store.save(&cfg).unwrap();

        assert_eq!(store.load_or_init().unwrap(), cfg);
    }

    #[test]
    fn explicit_path_overrides_default_location() {
        let store = ConfigStore::at(Some(Path::new("/tmp/orgmate-explicit.toml")));
        assert_eq!(store.path(), Path::new("/tmp/orgmate-explicit.toml"));
        assert!(ConfigStore::at(None).path().ends_with("config.toml")
            || ConfigStore::at(None).path().ends_with("orgmate.toml"));
    }
}
