use std::collections::{BTreeMap, BTreeSet};

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::lineage::Graph;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    /// Queries shorter than this (after trimming) match every node.
    pub min_query_len: usize,
    /// Attribute names searched in addition to the id and display name.
    pub fields: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: 2,
            fields: ["classification", "manufacturer", "productCode", "panel"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }
}

/// Lower-cased searchable values mapped to the nodes carrying them.
///
/// Built once per graph; queries never mutate it.
#[derive(Clone, Debug, Default)]
pub struct SearchIndex {
    values: BTreeMap<String, BTreeSet<usize>>,
    ids: Vec<String>,
    labels: Vec<String>,
    min_query_len: usize,
}

impl SearchIndex {
    pub fn build(graph: &Graph, config: &SearchConfig) -> Self {
        let mut values: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();

        for (index, node) in graph.nodes().iter().enumerate() {
            let fields = config
                .fields
                .iter()
                .filter_map(|field| node.attributes.get(field));

            for value in [&node.id, &node.label].into_iter().chain(fields) {
                let value = value.trim().to_lowercase();
                if !value.is_empty() {
                    values.entry(value).or_default().insert(index);
                }
            }
        }

        debug!(
            nodes = graph.node_count(),
            values = values.len(),
            "built search index"
        );

        Self {
            values,
            ids: graph.nodes().iter().map(|node| node.id.clone()).collect(),
            labels: graph.nodes().iter().map(|node| node.label.clone()).collect(),
            min_query_len: config.min_query_len,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether `text` is long enough to narrow the node set at all.
    pub fn is_filtering(&self, text: &str) -> bool {
        text.trim().chars().count() >= self.min_query_len.max(1)
    }

    /// Case-insensitive substring match, as node indices.
    ///
    /// Leading and trailing whitespace is trimmed before both the length check
    /// and the match, so `"k9 "` behaves like `"k9"`. Inner whitespace is kept.
    pub fn query_indices(&self, text: &str) -> BTreeSet<usize> {
        if !self.is_filtering(text) {
            return (0..self.ids.len()).collect();
        }

        let needle = text.trim().to_lowercase();
        self.values
            .iter()
            .filter(|(value, _)| value.contains(&needle))
            .flat_map(|(_, nodes)| nodes.iter().copied())
            .collect()
    }

    /// Case-insensitive substring match, as node ids.
    pub fn query(&self, text: &str) -> BTreeSet<String> {
        self.query_indices(text)
            .into_iter()
            .map(|index| self.ids[index].clone())
            .collect()
    }

    /// The same membership as [`Self::query_indices`], best fuzzy score on
    /// label or id first. Ties keep input order.
    pub fn ranked(&self, text: &str) -> Vec<usize> {
        let matches = self.query_indices(text);
        if !self.is_filtering(text) {
            return matches.into_iter().collect();
        }

        let query = text.trim();
        let matcher = SkimMatcherV2::default();
        let mut scored = matches
            .into_iter()
            .map(|index| {
                let score = fuzzy_match_score(&matcher, &self.labels[index], query)
                    .max(fuzzy_match_score(&matcher, &self.ids[index], query))
                    .unwrap_or(0);
                (score, index)
            })
            .collect::<Vec<_>>();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        scored.into_iter().map(|(_, index)| index).collect()
    }
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}
