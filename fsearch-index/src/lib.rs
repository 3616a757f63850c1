//! Tokenizing inverted index: token -> append-only posting list of FileIDs,
//! with ranked multi-term search by distinct-term occurrence count.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use fsearch_store::FileId;

/// Split on ASCII whitespace, strip everything but ASCII letters from each
/// span, lowercase, drop empties. Order is preserved, duplicates kept.
pub fn tokenize(content: &[u8]) -> Vec<String> {
    content
        .split(|b: &u8| b.is_ascii_whitespace())
        .filter_map(|span| {
            let normalized: String = span
                .iter()
                .filter(|b| b.is_ascii_alphabetic())
                .map(|b| b.to_ascii_lowercase() as char)
                .collect();
            if normalized.is_empty() {
                None
            } else {
                Some(normalized)
            }
        })
        .collect()
}

fn dedup_preserve_order(tokens: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

#[derive(Default)]
pub struct Index {
    postings: RwLock<HashMap<String, Vec<FileId>>>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize `content`, dedup within this one call, and append `file_id`
    /// to every surviving token's posting list. A file already indexed that
    /// is added again contributes a second entry to affected posting
    /// lists, which only inflates its own occurrence count on future
    /// searches — callers rely on [`fsearch_store::Store`] to prevent
    /// re-ingestion of the same path in the first place.
    pub fn add(&self, file_id: FileId, content: &[u8]) {
        let tokens = dedup_preserve_order(tokenize(content));
        if tokens.is_empty() {
            return;
        }
        let mut postings = self.postings.write().unwrap();
        for token in tokens {
            postings.entry(token).or_default().push(file_id);
        }
    }

    /// Tokenize and dedup the query, then rank FileIDs by the number of
    /// distinct query terms each one contains, descending. Ties keep the
    /// order in which a FileID was first encountered scanning the query
    /// terms, which is stable for a fixed index state and a fixed query.
    pub fn search(&self, query: &[u8]) -> Vec<FileId> {
        let terms = dedup_preserve_order(tokenize(query));
        if terms.is_empty() {
            return Vec::new();
        }

        let postings = self.postings.read().unwrap();
        let mut order: Vec<FileId> = Vec::new();
        let mut counts: HashMap<FileId, usize> = HashMap::new();
        for term in &terms {
            let Some(list) = postings.get(term) else {
                continue;
            };
            for &id in list {
                *counts.entry(id).or_insert_with(|| {
                    order.push(id);
                    0
                }) += 1;
            }
        }

        let mut ranked: Vec<(FileId, usize)> =
            order.into_iter().map(|id| (id, counts[&id])).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.into_iter().map(|(id, _)| id).collect()
    }
}
