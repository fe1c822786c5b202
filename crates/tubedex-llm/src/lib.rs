// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tubedex_app::{Channel, Prediction};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Blocking client for the Gemini generateContent API. One instance is
/// shared by every worker thread; reqwest's blocking client is Clone
/// and pools connections internally.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, model: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("llm.base_url must not be empty");
        }
        Url::parse(&base_url)
            .map_err(|error| anyhow!("llm.base_url {base_url:?} is not a valid URL: {error}"))?;
        if model.trim().is_empty() {
            bail!("llm.model must not be empty");
        }
        if api_key.trim().is_empty() {
            bail!("no API key configured; set llm.api_key or the GEMINI_API_KEY environment variable");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            model: model.to_owned(),
            api_key: api_key.to_owned(),
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Cheap reachability and credential check: fetches the configured
    /// model's metadata without generating anything.
    pub fn ping(&self) -> Result<()> {
        let response = self
            .http
            .get(format!("{}/models/{}", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(())
    }

    /// Generation with Google Search grounding enabled, used for the
    /// latest-upload lookups. The response text is free-form; callers
    /// run it through [`extract_json`].
    pub fn generate_grounded(&self, prompt: &str) -> Result<String> {
        self.generate(json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "tools": [{ "googleSearch": {} }],
        }))
    }

    /// Generation constrained to a JSON response matching `schema`.
    pub fn generate_structured(&self, prompt: &str, schema: &Value) -> Result<String> {
        self.generate(json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        }))
    }

    fn generate(&self, body: Value) -> Result<String> {
        let response = self
            .http
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: GenerateContentResponse =
            response.json().context("decode generateContent response")?;
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no candidates in generateContent response"))?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        if text.trim().is_empty() {
            bail!("generateContent response contained no text");
        }
        Ok(text)
    }
}

pub fn build_latest_upload_prompt(channel: &Channel) -> String {
    format!(
        "Search Google for the official YouTube channel named \"{}\" with channel ID \"{}\". \
         Find the title of its most recently uploaded video. Return this data as a single, \
         compact, valid JSON object with ONLY the key \"latestVideoTitle\". If a value cannot \
         be found, use a value of null for that key.",
        channel.title,
        channel.id.as_str(),
    )
}

pub fn build_prediction_prompt(channel: &Channel) -> String {
    format!(
        "You are a YouTube expert. Based on the following channel information, generate a \
         plausible and engaging title and a short, one-paragraph description for their next \
         video upload. The channel is: Title: '{}', Category: '{}', Description: '{}'.",
        channel.title, channel.category, channel.description,
    )
}

pub fn prediction_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {
                "type": "STRING",
                "description": "The predicted video title."
            },
            "description": {
                "type": "STRING",
                "description": "The predicted video description."
            }
        },
        "required": ["title", "description"]
    })
}

/// Pulls the JSON object out of a model response that may wrap it in a
/// markdown fence or surround it with prose.
pub fn extract_json(raw: &str) -> String {
    let trimmed = raw.trim();

    if trimmed.starts_with("```") {
        let mut lines: Vec<&str> = trimmed.lines().collect();
        if !lines.is_empty() {
            lines.remove(0);
        }
        if let Some(idx) = lines.iter().rposition(|line| line.trim() == "```") {
            lines.truncate(idx);
        }
        return lines.join("\n").trim().to_owned();
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && start < end
    {
        return trimmed[start..=end].to_owned();
    }

    trimmed.to_owned()
}

/// Decodes a latest-upload lookup. `Ok(None)` means the lookup worked
/// but no latest upload is known, which is not an error.
pub fn parse_latest_upload(raw: &str) -> Result<Option<String>> {
    let cleaned = extract_json(raw);
    let parsed: LatestUploadPayload = serde_json::from_str(&cleaned)
        .with_context(|| format!("latest-upload response is not valid JSON: {raw:?}"))?;
    Ok(parsed
        .latest_video_title
        .map(|title| title.trim().to_owned())
        .filter(|title| !title.is_empty()))
}

pub fn parse_prediction(raw: &str) -> Result<Prediction> {
    let cleaned = extract_json(raw);
    let prediction: Prediction = serde_json::from_str(&cleaned)
        .with_context(|| format!("prediction response is not valid JSON: {raw:?}"))?;
    if prediction.title.trim().is_empty() {
        bail!("prediction response has an empty title");
    }
    Ok(prediction)
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check the network and llm.base_url ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<GeminiErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), error.message);
    }

    if body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body);
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LatestUploadPayload {
    #[serde(rename = "latestVideoTitle")]
    latest_video_title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    message: String,
}
