// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tubedex_app::Channel;

pub const APP_NAME: &str = "tubedex";

const BUILTIN_CHANNELS: &str = include_str!("../data/channels.json");

/// The channel directory. Loaded once at startup, validated, and then
/// treated as read-only for the rest of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    channels: Vec<Channel>,
}

impl Catalog {
    /// The catalog compiled into the binary, used when no catalog file
    /// is configured.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CHANNELS).context("parse built-in catalog")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read catalog file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parse catalog file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let channels: Vec<Channel> =
            serde_json::from_str(raw).context("catalog is not a JSON array of channels")?;
        validate_channels(&channels)?;
        Ok(Self { channels })
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn find(&self, id: &tubedex_app::ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|channel| &channel.id == id)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

fn validate_channels(channels: &[Channel]) -> Result<()> {
    if channels.is_empty() {
        bail!("catalog contains no channels");
    }

    let mut seen = BTreeSet::new();
    for (index, channel) in channels.iter().enumerate() {
        if channel.id.as_str().trim().is_empty() {
            bail!("catalog entry {index} has an empty id");
        }
        if channel.title.trim().is_empty() {
            bail!("catalog entry {index} ({}) has an empty title", channel.id);
        }
        if channel.category.trim().is_empty() {
            bail!(
                "catalog entry {index} ({}) has an empty category",
                channel.id
            );
        }
        if !seen.insert(channel.id.clone()) {
            bail!("catalog contains duplicate channel id {}", channel.id);
        }
    }

    Ok(())
}

pub fn default_catalog_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("TUBEDEX_CATALOG_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set TUBEDEX_CATALOG_PATH to a catalog file")
    })?;

    Ok(data_root.join(APP_NAME).join("channels.json"))
}

pub fn validate_catalog_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("catalog path must not be empty");
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "catalog path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("catalog path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!("catalog path {path:?} contains '?'; remove query parameters and use a plain file path");
    }

    Ok(())
}
