use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use super::catalog::{BiasEntry, MarketingCatalog, ServiceEntry};
use super::domain::AnswerSet;

/// Fallback token used when an answer set yields no scalar fields.
const EMPTY_QUERY_TOKEN: &str = "query";

const MIN_CONTEXT: usize = 3;
const MAX_CONTEXT: usize = 8;

/// Top-k catalog entries that lexically resemble the answer set. This is a
/// plain term-overlap ranking, not a semantic search: the catalog is small
/// enough that bag-of-words cosine keeps the prompt context relevant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedContext {
    pub services: Vec<ServiceEntry>,
    pub biases: Vec<BiasEntry>,
}

/// Rank services and biases against the answers, independently, returning
/// the top `clamp(k, 3, 8)` of each. Ties keep catalog order.
pub fn retrieve_context(
    catalog: &MarketingCatalog,
    answers: &AnswerSet,
    k: usize,
) -> RetrievedContext {
    let query = query_text(answers);
    let query_vector = term_frequencies(&query);
    let limit = k.clamp(MIN_CONTEXT, MAX_CONTEXT);

    let services = rank_entries(catalog.services(), &query_vector, limit, service_text);
    let biases = rank_entries(catalog.biases(), &query_vector, limit, bias_text);

    RetrievedContext { services, biases }
}

fn query_text(answers: &AnswerSet) -> String {
    let query = answers
        .scalar_pairs()
        .into_iter()
        .map(|(key, value)| format!("{key}:{value}"))
        .collect::<Vec<_>>()
        .join(" ");

    if query.is_empty() {
        EMPTY_QUERY_TOKEN.to_string()
    } else {
        query
    }
}

fn rank_entries<T: Clone>(
    entries: &[T],
    query_vector: &HashMap<String, f64>,
    limit: usize,
    text: fn(&T) -> String,
) -> Vec<T> {
    let mut scored: Vec<(T, f64)> = entries
        .iter()
        .map(|entry| {
            let score = cosine(query_vector, &term_frequencies(&text(entry)));
            (entry.clone(), score)
        })
        .collect();

    // Stable sort keeps catalog order between equal scores.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(limit);
    scored.into_iter().map(|(entry, _)| entry).collect()
}

fn service_text(entry: &ServiceEntry) -> String {
    format!("{} {}", entry.name, entry.deliverables.join(" "))
}

fn bias_text(entry: &BiasEntry) -> String {
    format!(
        "{} {} {}",
        entry.name,
        entry.definition,
        entry.copy_patterns.join(" ")
    )
}

fn term_frequencies(text: &str) -> HashMap<String, f64> {
    let mut vector = HashMap::new();
    for token in text.split_whitespace() {
        *vector.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
    }
    vector
}

fn cosine(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(token, weight)| b.get(token).map(|other| weight * other))
        .sum();
    let norm_a = norm_or_one(a);
    let norm_b = norm_or_one(b);
    dot / (norm_a * norm_b)
}

fn norm_or_one(vector: &HashMap<String, f64>) -> f64 {
    let norm = vector.values().map(|weight| weight * weight).sum::<f64>().sqrt();
    if norm == 0.0 {
        1.0
    } else {
        norm
    }
}
