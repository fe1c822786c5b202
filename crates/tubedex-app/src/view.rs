// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ALL_CATEGORIES, AppState, Channel, SortMode};
use rand::Rng;
use rand::seq::SliceRandom;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Everything the presentation layer needs, derived fresh from the
/// catalog and session state on every change. Counts cover all active
/// channels regardless of the current category/search selection, so
/// the summary panel always shows full standing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelView {
    pub displayed: Vec<Channel>,
    pub categories: Vec<String>,
    pub counts: BTreeMap<String, usize>,
}

pub fn derive_view<R: Rng>(channels: &[Channel], state: &AppState, rng: &mut R) -> ChannelView {
    let mut active: Vec<&Channel> = channels
        .iter()
        .filter(|channel| !state.removed.contains(&channel.id))
        .collect();

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for channel in &active {
        *counts.entry(channel.category.clone()).or_insert(0) += 1;
    }
    let mut categories = Vec::with_capacity(counts.len() + 1);
    categories.push(ALL_CATEGORIES.to_owned());
    categories.extend(counts.keys().cloned());

    if state.selected_category != ALL_CATEGORIES {
        active.retain(|channel| channel.category == state.selected_category);
    }

    if !state.search_term.is_empty() {
        let needle = state.search_term.to_lowercase();
        active.retain(|channel| {
            channel.title.to_lowercase().contains(&needle)
                || channel.description.to_lowercase().contains(&needle)
        });
    }

    let mut displayed: Vec<Channel> = active.into_iter().cloned().collect();
    match state.sort_mode {
        SortMode::TitleAsc => displayed.sort_by(|a, b| title_order(a, b)),
        SortMode::TitleDesc => displayed.sort_by(|a, b| title_order(b, a)),
        SortMode::Random => displayed.shuffle(rng),
    }

    ChannelView {
        displayed,
        categories,
        counts,
    }
}

// Case-insensitive on title, with the raw title as tiebreak so the
// ordering stays total and descending is the exact reverse of
// ascending.
fn title_order(a: &Channel, b: &Channel) -> Ordering {
    a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then_with(|| a.title.cmp(&b.title))
}

/// Summary rows for the category panel: counts sorted by count
/// descending, label ascending as tiebreak.
pub fn summary_rows(counts: &BTreeMap<String, usize>) -> Vec<(String, usize)> {
    let mut rows: Vec<(String, usize)> = counts
        .iter()
        .map(|(category, count)| (category.clone(), *count))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

#[cfg(test)]
mod tests {
    use super::{derive_view, summary_rows};
    use crate::{ALL_CATEGORIES, AppCommand, AppState, Channel, ChannelId, SortMode};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn channel(id: &str, title: &str, category: &str) -> Channel {
        Channel {
            id: ChannelId::new(id),
            title: title.to_owned(),
            description: String::new(),
            category: category.to_owned(),
        }
    }

    fn sample() -> Vec<Channel> {
        vec![
            channel("a", "Beta", "Tech"),
            channel("b", "Alpha", "Tech"),
            channel("c", "Zed", "Music"),
        ]
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn titles(view: &super::ChannelView) -> Vec<&str> {
        view.displayed
            .iter()
            .map(|channel| channel.title.as_str())
            .collect()
    }

    #[test]
    fn default_view_sorts_titles_ascending() {
        let view = derive_view(&sample(), &AppState::default(), &mut rng());
        assert_eq!(titles(&view), vec!["Alpha", "Beta", "Zed"]);
        assert_eq!(view.categories, vec![ALL_CATEGORIES, "Music", "Tech"]);
        assert_eq!(view.counts.get("Tech"), Some(&2));
        assert_eq!(view.counts.get("Music"), Some(&1));
    }

    #[test]
    fn descending_is_exact_reverse_of_ascending() {
        let mut state = AppState::default();
        let asc = derive_view(&sample(), &state, &mut rng());

        state.dispatch(AppCommand::SetSortMode(SortMode::TitleDesc));
        let desc = derive_view(&sample(), &state, &mut rng());

        let mut reversed = asc.displayed.clone();
        reversed.reverse();
        assert_eq!(desc.displayed, reversed);
    }

    #[test]
    fn title_sort_ignores_case() {
        let channels = vec![
            channel("a", "beta", "Tech"),
            channel("b", "Alpha", "Tech"),
            channel("c", "GAMMA", "Tech"),
        ];
        let view = derive_view(&channels, &AppState::default(), &mut rng());
        assert_eq!(titles(&view), vec!["Alpha", "beta", "GAMMA"]);
    }

    #[test]
    fn category_filter_is_exact_and_counts_stay_global() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::SelectCategory("Music".to_owned()));

        let view = derive_view(&sample(), &state, &mut rng());
        assert_eq!(titles(&view), vec!["Zed"]);
        assert!(
            view.displayed
                .iter()
                .all(|channel| channel.category == "Music")
        );
        // Counts reflect the whole active set, not the filtered one.
        assert_eq!(view.counts.get("Tech"), Some(&2));
        assert_eq!(view.counts.get("Music"), Some(&1));
    }

    #[test]
    fn category_labels_are_case_sensitive() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::SelectCategory("tech".to_owned()));
        let view = derive_view(&sample(), &state, &mut rng());
        assert!(view.displayed.is_empty());
    }

    #[test]
    fn search_matches_title_or_description_case_insensitively() {
        let channels = vec![
            Channel {
                id: ChannelId::new("a"),
                title: "Deep Dives".to_owned(),
                description: "long-form ESSAYS about cinema".to_owned(),
                category: "Film".to_owned(),
            },
            channel("b", "Quick Cuts", "Film"),
        ];

        let mut state = AppState::default();
        state.dispatch(AppCommand::SetSearchTerm("essay".to_owned()));
        let view = derive_view(&channels, &state, &mut rng());
        assert_eq!(titles(&view), vec!["Deep Dives"]);

        state.dispatch(AppCommand::SetSearchTerm("QUICK".to_owned()));
        let view = derive_view(&channels, &state, &mut rng());
        assert_eq!(titles(&view), vec!["Quick Cuts"]);
    }

    #[test]
    fn search_result_is_subset_with_term_contained() {
        let channels = sample();
        let mut state = AppState::default();
        state.dispatch(AppCommand::SetSearchTerm("e".to_owned()));
        let view = derive_view(&channels, &state, &mut rng());

        for shown in &view.displayed {
            assert!(channels.contains(shown));
            assert!(
                shown.title.to_lowercase().contains('e')
                    || shown.description.to_lowercase().contains('e')
            );
        }
    }

    #[test]
    fn empty_search_result_is_not_an_error() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::SetSearchTerm("zzzzz".to_owned()));
        let view = derive_view(&sample(), &state, &mut rng());
        assert!(view.displayed.is_empty());
        assert_eq!(view.counts.len(), 2);
    }

    #[test]
    fn removed_channel_vanishes_from_list_and_counts() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::RemoveChannel(ChannelId::new("a")));

        let view = derive_view(&sample(), &state, &mut rng());
        assert_eq!(titles(&view), vec!["Alpha", "Zed"]);
        assert_eq!(view.counts.get("Tech"), Some(&1));
    }

    #[test]
    fn removing_the_last_channel_of_a_category_drops_its_label() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::RemoveChannel(ChannelId::new("c")));

        let view = derive_view(&sample(), &state, &mut rng());
        assert_eq!(view.categories, vec![ALL_CATEGORIES, "Tech"]);
        assert!(!view.counts.contains_key("Music"));
    }

    #[test]
    fn randomize_restores_removed_channels() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::RemoveChannel(ChannelId::new("a")));
        state.dispatch(AppCommand::Randomize);

        let view = derive_view(&sample(), &state, &mut rng());
        assert_eq!(view.displayed.len(), 3);
        assert_eq!(view.counts.get("Tech"), Some(&2));
    }

    #[test]
    fn random_sort_keeps_membership_and_is_seed_deterministic() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::SetSortMode(SortMode::Random));

        let first = derive_view(&sample(), &state, &mut StdRng::seed_from_u64(99));
        let second = derive_view(&sample(), &state, &mut StdRng::seed_from_u64(99));
        assert_eq!(first.displayed, second.displayed);

        let mut sorted = titles(&first);
        sorted.sort_unstable();
        assert_eq!(sorted, vec!["Alpha", "Beta", "Zed"]);
    }

    #[test]
    fn summary_rows_sort_by_count_descending() {
        let view = derive_view(&sample(), &AppState::default(), &mut rng());
        let rows = summary_rows(&view.counts);
        assert_eq!(
            rows,
            vec![("Tech".to_owned(), 2), ("Music".to_owned(), 1)],
        );
    }
}
