// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

/// Sentinel category meaning "no category filter".
pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChannelId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the channel directory. Loaded once at startup and
/// never mutated; the session only filters records out of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
}

impl Channel {
    pub fn url(&self) -> String {
        format!("https://www.youtube.com/channel/{}", self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortMode {
    TitleAsc,
    TitleDesc,
    Random,
}

impl SortMode {
    pub const ALL: [Self; 3] = [Self::TitleAsc, Self::TitleDesc, Self::Random];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TitleAsc => "title-asc",
            Self::TitleDesc => "title-desc",
            Self::Random => "random",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "title-asc" => Some(Self::TitleAsc),
            "title-desc" => Some(Self::TitleDesc),
            "random" => Some(Self::Random),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::TitleAsc => "Title (A-Z)",
            Self::TitleDesc => "Title (Z-A)",
            Self::Random => "Random",
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Self::TitleAsc => Self::TitleDesc,
            Self::TitleDesc => Self::Random,
            Self::Random => Self::TitleAsc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewMode {
    Grid,
    List,
}

impl ViewMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::List => "list",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "grid" => Some(Self::Grid),
            "list" => Some(Self::List),
            _ => None,
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Grid => Self::List,
            Self::List => Self::Grid,
        }
    }
}

/// An AI-generated guess at a channel's next upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub title: String,
    pub description: String,
}
