// src/report/stats.rs

//! Aggregate statistics over every stored quotation.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::Quote;

/// A name with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranked {
    pub name: String,
    pub count: usize,
}

/// Contents of `stats.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteStats {
    pub total_quotes: usize,
    pub top_authors: Vec<Ranked>,
    pub top_tags: Vec<Ranked>,
    pub quotes_per_author_distribution: BTreeMap<String, usize>,
}

impl QuoteStats {
    /// Count authors and tags across `quotes`, keeping `limit` of each in
    /// the rankings.
    pub fn collect(quotes: &[Quote], limit: usize) -> Self {
        let mut authors: HashMap<&str, usize> = HashMap::new();
        let mut tags: HashMap<&str, usize> = HashMap::new();

        for quote in quotes {
            *authors.entry(quote.author_name.as_str()).or_default() += 1;
            for tag in &quote.tags {
                *tags.entry(tag.as_str()).or_default() += 1;
            }
        }

        let distribution = authors
            .iter()
            .map(|(name, count)| (name.to_string(), *count))
            .collect();

        Self {
            total_quotes: quotes.len(),
            top_authors: rank(authors, limit),
            top_tags: rank(tags, limit),
            quotes_per_author_distribution: distribution,
        }
    }
}

/// Count descending, then name ascending.
fn rank(counts: HashMap<&str, usize>, limit: usize) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = counts
        .into_iter()
        .map(|(name, count)| Ranked {
            name: name.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(limit);
    ranked
}
