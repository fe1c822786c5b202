// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::path::PathBuf;
use tubedex_app::{Channel, ChannelId};

const CATEGORIES: [&str; 8] = [
    "Tech", "Science", "Music", "Gaming", "Cooking", "Film", "History", "DIY",
];

const TITLE_ADJECTIVES: [&str; 12] = [
    "Midnight", "Analog", "Practical", "Restless", "Quiet", "Borrowed", "Second", "Northern",
    "Paper", "Copper", "Patient", "Lost",
];

const TITLE_NOUNS: [&str; 14] = [
    "Workshop",
    "Archive",
    "Signal",
    "Kitchen",
    "Frontier",
    "Notebook",
    "Orbit",
    "Garage",
    "Library",
    "Cartography",
    "Darkroom",
    "Foundry",
    "Almanac",
    "Assembly",
];

const DESCRIPTION_VERBS: [&str; 8] = [
    "explores", "documents", "rebuilds", "explains", "collects", "tests", "restores", "maps",
];

const DESCRIPTION_SUBJECTS: [&str; 10] = [
    "forgotten hardware",
    "everyday engineering",
    "regional recipes",
    "field recordings",
    "archival footage",
    "open problems",
    "workshop techniques",
    "game mechanics",
    "local history",
    "homegrown experiments",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Deterministic channel generator for tests. The same seed always
/// yields the same sequence of channels.
#[derive(Debug, Clone)]
pub struct ChannelFaker {
    rng: DeterministicRng,
    counter: u64,
}

impl ChannelFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            counter: 0,
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn channel(&mut self) -> Channel {
        let category = self.pick(&CATEGORIES).to_owned();
        self.channel_in(&category)
    }

    pub fn channel_in(&mut self, category: &str) -> Channel {
        self.counter += 1;
        let title = format!(
            "{} {} {}",
            self.pick(&TITLE_ADJECTIVES),
            self.pick(&TITLE_NOUNS),
            self.counter,
        );
        let description = format!(
            "A channel that {} {}.",
            self.pick(&DESCRIPTION_VERBS),
            self.pick(&DESCRIPTION_SUBJECTS),
        );
        Channel {
            // Counter-based so generated ids can never collide.
            id: ChannelId::new(format!("UCfake{:016x}{:04}", self.rng.next_u64(), self.counter)),
            title,
            description,
            category: category.to_owned(),
        }
    }

    pub fn channels(&mut self, count: usize) -> Vec<Channel> {
        (0..count).map(|_| self.channel()).collect()
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

pub fn categories() -> &'static [&'static str] {
    &CATEGORIES
}

pub fn temp_catalog_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("channels.json");
    Ok((dir, path))
}

/// Serializes channels the way a catalog file stores them.
pub fn catalog_json(channels: &[Channel]) -> Result<String> {
    serde_json::to_string_pretty(channels).context("serialize catalog fixture")
}

/// A generateContent response whose single part carries `text`.
pub fn gemini_text_response(text: &str) -> String {
    serde_json::json!({
        "candidates": [
            {
                "content": {
                    "parts": [{ "text": text }],
                    "role": "model"
                },
                "finishReason": "STOP"
            }
        ]
    })
    .to_string()
}

/// The JSON payload a grounded latest-upload lookup returns, wrapped
/// in a markdown fence the way the live API tends to answer.
pub fn fenced_latest_upload_payload(title: &str) -> String {
    format!("```json\n{{\"latestVideoTitle\": \"{title}\"}}\n```")
}

pub fn bare_latest_upload_payload(title: &str) -> String {
    format!("{{\"latestVideoTitle\": \"{title}\"}}")
}

pub fn null_latest_upload_payload() -> String {
    "{\"latestVideoTitle\": null}".to_owned()
}

pub fn prediction_payload(title: &str, description: &str) -> String {
    serde_json::json!({ "title": title, "description": description }).to_string()
}

pub fn gemini_error_response(message: &str) -> String {
    serde_json::json!({
        "error": {
            "code": 400,
            "message": message,
            "status": "INVALID_ARGUMENT"
        }
    })
    .to_string()
}
