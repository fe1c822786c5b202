// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::sync::mpsc::Sender;
use std::thread;
use tubedex_app::{Channel, Prediction};
use tubedex_llm::{
    Client, build_latest_upload_prompt, build_prediction_prompt, parse_latest_upload,
    parse_prediction, prediction_response_schema,
};
use tubedex_tui::{AppRuntime, InternalEvent};

const DISABLED_MESSAGE: &str =
    "predictions are disabled; set llm.enabled = true and configure an API key";

/// Runtime backed by the Gemini client. `client` is `None` when the
/// [llm] section is disabled or no API key is available; cards then
/// resolve empty and predictions fail with an actionable message.
pub struct LlmRuntime {
    client: Option<Client>,
}

impl LlmRuntime {
    pub fn new(client: Option<Client>) -> Self {
        Self { client }
    }
}

fn fetch_latest_upload_with(client: &Client, channel: &Channel) -> Result<Option<String>> {
    let text = client.generate_grounded(&build_latest_upload_prompt(channel))?;
    parse_latest_upload(&text)
}

fn predict_next_upload_with(client: &Client, channel: &Channel) -> Result<Prediction> {
    let text =
        client.generate_structured(&build_prediction_prompt(channel), &prediction_response_schema())?;
    parse_prediction(&text)
}

impl AppRuntime for LlmRuntime {
    fn fetch_latest_upload(&mut self, channel: &Channel) -> Result<Option<String>> {
        match &self.client {
            Some(client) => fetch_latest_upload_with(client, channel),
            None => Ok(None),
        }
    }

    fn predict_next_upload(&mut self, channel: &Channel) -> Result<Prediction> {
        match &self.client {
            Some(client) => predict_next_upload_with(client, channel),
            None => Err(anyhow!(DISABLED_MESSAGE)),
        }
    }

    fn spawn_latest_upload(&mut self, channel: &Channel, tx: Sender<InternalEvent>) -> Result<()> {
        let Some(client) = self.client.clone() else {
            // No lookups without a client; the card settles empty.
            tx.send(InternalEvent::CardFetch {
                id: channel.id.clone(),
                outcome: Ok(None),
            })
            .map_err(|_| anyhow!("internal event channel closed"))?;
            return Ok(());
        };

        let channel = channel.clone();
        thread::spawn(move || {
            let outcome =
                fetch_latest_upload_with(&client, &channel).map_err(|error| error.to_string());
            let _ = tx.send(InternalEvent::CardFetch {
                id: channel.id.clone(),
                outcome,
            });
        });
        Ok(())
    }

    fn spawn_prediction(
        &mut self,
        request_id: u64,
        channel: &Channel,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let Some(client) = self.client.clone() else {
            tx.send(InternalEvent::Prediction {
                request_id,
                outcome: Err(DISABLED_MESSAGE.to_owned()),
            })
            .map_err(|_| anyhow!("internal event channel closed"))?;
            return Ok(());
        };

        let channel = channel.clone();
        thread::spawn(move || {
            let outcome =
                predict_next_upload_with(&client, &channel).map_err(|error| error.to_string());
            let _ = tx.send(InternalEvent::Prediction {
                request_id,
                outcome,
            });
        });
        Ok(())
    }
}
