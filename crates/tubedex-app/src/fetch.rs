// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Channel, ChannelId, Prediction};
use std::collections::BTreeMap;

/// Lifecycle of one card's latest-upload lookup. A card with no entry
/// in the tracker has not been seen yet (idle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardFetchState {
    Loading,
    /// `None` means the lookup succeeded but no latest upload is known.
    Resolved(Option<String>),
    Failed(String),
}

/// One-shot fetch bookkeeping for every card in the session. The
/// entry is created the first time a card becomes visible and is only
/// dropped when the channel itself is removed, so scrolling a card out
/// and back in can never refire its request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CardTracker {
    states: BTreeMap<ChannelId, CardFetchState>,
}

impl CardTracker {
    /// Returns true exactly once per card lifetime: the caller must
    /// start a fetch if and only if this returns true.
    pub fn begin(&mut self, id: &ChannelId) -> bool {
        if self.states.contains_key(id) {
            return false;
        }
        self.states.insert(id.clone(), CardFetchState::Loading);
        true
    }

    pub fn resolve(&mut self, id: &ChannelId, title: Option<String>) -> bool {
        self.settle(id, CardFetchState::Resolved(title))
    }

    pub fn fail(&mut self, id: &ChannelId, message: impl Into<String>) -> bool {
        self.settle(id, CardFetchState::Failed(message.into()))
    }

    fn settle(&mut self, id: &ChannelId, next: CardFetchState) -> bool {
        match self.states.get_mut(id) {
            Some(state @ CardFetchState::Loading) => {
                *state = next;
                true
            }
            _ => false,
        }
    }

    pub fn state(&self, id: &ChannelId) -> Option<&CardFetchState> {
        self.states.get(id)
    }

    /// Drops the entry for a removed channel. If the channel comes
    /// back (randomize restores it), that is a fresh card lifetime.
    pub fn forget(&mut self, id: &ChannelId) {
        self.states.remove(id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictionPhase {
    Loading,
    Resolved(Prediction),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePrediction {
    pub channel: Channel,
    pub phase: PredictionPhase,
    request_id: u64,
}

impl ActivePrediction {
    pub const fn request_id(&self) -> u64 {
        self.request_id
    }
}

/// The single prediction-modal slot. Opening for a new channel
/// overwrites whatever was there (last-open-wins); completions are
/// gated on the request id so a stale response can never land on a
/// newer request's state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PredictionSlot {
    active: Option<ActivePrediction>,
    next_request_id: u64,
}

impl PredictionSlot {
    /// Opens the modal for `channel`, discarding any previous result
    /// immediately, and returns the id the eventual completion must
    /// carry.
    pub fn open(&mut self, channel: Channel) -> u64 {
        self.next_request_id = self.next_request_id.saturating_add(1);
        if self.next_request_id == 0 {
            self.next_request_id = 1;
        }
        let request_id = self.next_request_id;
        self.active = Some(ActivePrediction {
            channel,
            phase: PredictionPhase::Loading,
            request_id,
        });
        request_id
    }

    pub fn close(&mut self) {
        self.active = None;
    }

    pub fn complete(&mut self, request_id: u64, prediction: Prediction) -> bool {
        self.settle(request_id, PredictionPhase::Resolved(prediction))
    }

    pub fn fail(&mut self, request_id: u64, message: impl Into<String>) -> bool {
        self.settle(request_id, PredictionPhase::Failed(message.into()))
    }

    fn settle(&mut self, request_id: u64, phase: PredictionPhase) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if active.request_id != request_id || active.phase != PredictionPhase::Loading {
            return false;
        }
        active.phase = phase;
        true
    }

    pub fn active(&self) -> Option<&ActivePrediction> {
        self.active.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }
}
