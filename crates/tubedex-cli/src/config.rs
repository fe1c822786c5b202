// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tubedex_app::ViewMode;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_LLM_TIMEOUT: &str = "10s";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub catalog: CatalogSection,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub llm: Llm,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            catalog: CatalogSection::default(),
            ui: Ui::default(),
            llm: Llm::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSection {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub view: Option<String>,
    pub show_summary: Option<bool>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            view: Some(ViewMode::Grid.as_str().to_owned()),
            show_summary: Some(false),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Llm {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Llm {
    fn default() -> Self {
        Self {
            enabled: Some(true),
            base_url: Some(tubedex_llm::DEFAULT_BASE_URL.to_owned()),
            model: Some(tubedex_llm::DEFAULT_MODEL.to_owned()),
            api_key: None,
            timeout: Some(DEFAULT_LLM_TIMEOUT.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("TUBEDEX_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set TUBEDEX_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(tubedex_catalog::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and keep values under [catalog], [ui], and [llm]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(catalog_path) = &self.catalog.path {
            tubedex_catalog::validate_catalog_path(catalog_path)?;
        }

        if let Some(view) = &self.ui.view
            && ViewMode::parse(view).is_none()
        {
            bail!(
                "ui.view in {} must be \"grid\" or \"list\", got {view:?}",
                path.display()
            );
        }

        if let Some(timeout) = &self.llm.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "llm.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        Ok(())
    }

    pub fn catalog_path(&self) -> Option<PathBuf> {
        self.catalog.path.as_ref().map(PathBuf::from)
    }

    pub fn view_mode(&self) -> ViewMode {
        self.ui
            .view
            .as_deref()
            .and_then(ViewMode::parse)
            .unwrap_or(ViewMode::Grid)
    }

    pub fn show_summary(&self) -> bool {
        self.ui.show_summary.unwrap_or(false)
    }

    pub fn llm_enabled(&self) -> bool {
        self.llm.enabled.unwrap_or(true)
    }

    pub fn llm_base_url(&self) -> &str {
        self.llm
            .base_url
            .as_deref()
            .unwrap_or(tubedex_llm::DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn llm_model(&self) -> &str {
        self.llm.model.as_deref().unwrap_or(tubedex_llm::DEFAULT_MODEL)
    }

    /// The configured key wins; the `GEMINI_API_KEY` environment
    /// variable is the fallback so the key can stay out of the file.
    pub fn llm_api_key(&self) -> Option<String> {
        if let Some(key) = &self.llm.api_key
            && !key.trim().is_empty()
        {
            return Some(key.clone());
        }
        env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn llm_timeout(&self) -> Result<Duration> {
        parse_duration(self.llm.timeout.as_deref().unwrap_or(DEFAULT_LLM_TIMEOUT))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# tubedex config\n# Place this file at: {}\n\nversion = 1\n\n[catalog]\n# Optional. Defaults to the built-in channel directory; set a path to\n# a JSON array of {{id, title, description, category}} objects.\n# path = \"/absolute/path/to/channels.json\"\n\n[ui]\nview = \"grid\"\nshow_summary = false\n\n[llm]\nenabled = true\nbase_url = \"{}\"\nmodel = \"{}\"\n# api_key = \"...\"  # or set GEMINI_API_KEY\ntimeout = \"10s\"\n",
            path.display(),
            tubedex_llm::DEFAULT_BASE_URL,
            tubedex_llm::DEFAULT_MODEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 10s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_duration};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;
    use tubedex_app::ViewMode;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.view_mode(), ViewMode::Grid);
        assert!(!config.show_summary());
        assert!(config.llm_enabled());
        assert_eq!(config.llm_model(), tubedex_llm::DEFAULT_MODEL);
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[ui]\nview = \"list\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"), "got: {message}");
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 7\n")?;
        let error = Config::load(&path).expect_err("v7 config should fail");
        assert!(error.to_string().contains("unsupported config version 7"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[catalog]\npath = \"/tmp/channels.json\"\n[ui]\nview = \"list\"\nshow_summary = true\n[llm]\nenabled = false\nmodel = \"gemini-2.5-pro\"\ntimeout = \"2s\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.catalog_path(), Some(PathBuf::from("/tmp/channels.json")));
        assert_eq!(config.view_mode(), ViewMode::List);
        assert!(config.show_summary());
        assert!(!config.llm_enabled());
        assert_eq!(config.llm_model(), "gemini-2.5-pro");
        assert_eq!(config.llm_timeout()?, Duration::from_secs(2));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn uri_style_catalog_path_is_rejected() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[catalog]\npath = \"https://example.com/channels.json\"\n",
        )?;
        let error = Config::load(&path).expect_err("URI catalog path should fail");
        assert!(error.to_string().contains("looks like a URI"));
        Ok(())
    }

    #[test]
    fn unknown_view_mode_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\nview = \"cards\"\n")?;
        let error = Config::load(&path).expect_err("unknown view should fail");
        assert!(error.to_string().contains("\"grid\" or \"list\""));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("TUBEDEX_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("TUBEDEX_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn api_key_prefers_config_over_environment() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n[llm]\napi_key = \"from-config\"\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("GEMINI_API_KEY", "from-env");
        }
        let config = Config::load(&path)?;
        let key = config.llm_api_key();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("GEMINI_API_KEY");
        }
        assert_eq!(key.as_deref(), Some("from-config"));
        Ok(())
    }

    #[test]
    fn api_key_falls_back_to_environment() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("GEMINI_API_KEY", "from-env");
        }
        let config = Config::load(&path)?;
        let key = config.llm_api_key();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("GEMINI_API_KEY");
        }
        assert_eq!(key.as_deref(), Some("from-env"));
        Ok(())
    }

    #[test]
    fn missing_api_key_resolves_to_none() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var("GEMINI_API_KEY");
        }
        let config = Config::load(&path)?;
        assert_eq!(config.llm_api_key(), None);
        Ok(())
    }

    #[test]
    fn base_url_trims_trailing_slashes() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[llm]\nbase_url = \"http://localhost:9090/v1beta///\"\n",
        )?;
        let config = Config::load(&path)?;
        assert_eq!(config.llm_base_url(), "http://localhost:9090/v1beta");
        Ok(())
    }

    #[test]
    fn timeout_parses_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("10s")?, Duration::from_secs(10));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("oops").is_err());
        Ok(())
    }

    #[test]
    fn zero_timeout_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[llm]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn example_config_includes_required_sections() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[catalog]"));
        assert!(example.contains("[ui]"));
        assert!(example.contains("[llm]"));
        assert!(example.contains("GEMINI_API_KEY"));
        Ok(())
    }
}
