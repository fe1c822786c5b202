// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ALL_CATEGORIES, ChannelId, SortMode, ViewMode};
use std::collections::BTreeSet;

/// Session state. Lives in memory for one run of the browser; nothing
/// here survives a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub search_term: String,
    pub selected_category: String,
    pub sort_mode: SortMode,
    pub view_mode: ViewMode,
    pub removed: BTreeSet<ChannelId>,
    pub summary_visible: bool,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            selected_category: ALL_CATEGORIES.to_owned(),
            sort_mode: SortMode::TitleAsc,
            view_mode: ViewMode::Grid,
            removed: BTreeSet::new(),
            summary_visible: false,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    SetSearchTerm(String),
    SelectCategory(String),
    SetSortMode(SortMode),
    SetViewMode(ViewMode),
    RemoveChannel(ChannelId),
    Randomize,
    ToggleSummary,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    SearchChanged(String),
    CategoryChanged(String),
    SortChanged(SortMode),
    ViewChanged(ViewMode),
    ChannelRemoved(ChannelId),
    RemovalsCleared,
    SummaryToggled(bool),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::SetSearchTerm(term) => {
                self.search_term = term.clone();
                vec![AppEvent::SearchChanged(term)]
            }
            AppCommand::SelectCategory(category) => {
                self.selected_category = category.clone();
                let mut events = vec![AppEvent::CategoryChanged(category)];
                // Picking a category while shuffled falls back to A-Z.
                if self.sort_mode == SortMode::Random {
                    self.sort_mode = SortMode::TitleAsc;
                    events.push(AppEvent::SortChanged(self.sort_mode));
                }
                events
            }
            AppCommand::SetSortMode(mode) => {
                self.sort_mode = mode;
                vec![AppEvent::SortChanged(mode)]
            }
            AppCommand::SetViewMode(mode) => {
                self.view_mode = mode;
                vec![AppEvent::ViewChanged(mode)]
            }
            AppCommand::RemoveChannel(id) => {
                if self.removed.insert(id.clone()) {
                    vec![AppEvent::ChannelRemoved(id)]
                } else {
                    Vec::new()
                }
            }
            AppCommand::Randomize => {
                let mut events = Vec::new();
                if !self.removed.is_empty() {
                    self.removed.clear();
                    events.push(AppEvent::RemovalsCleared);
                }
                self.sort_mode = SortMode::Random;
                self.selected_category = ALL_CATEGORIES.to_owned();
                self.search_term.clear();
                events.push(AppEvent::SortChanged(self.sort_mode));
                events.push(AppEvent::CategoryChanged(self.selected_category.clone()));
                events.push(AppEvent::SearchChanged(String::new()));
                events
            }
            AppCommand::ToggleSummary => {
                self.summary_visible = !self.summary_visible;
                vec![AppEvent::SummaryToggled(self.summary_visible)]
            }
            AppCommand::SetStatus(message) => {
                self.status_line = Some(message.clone());
                vec![AppEvent::StatusUpdated(message)]
            }
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }
}
