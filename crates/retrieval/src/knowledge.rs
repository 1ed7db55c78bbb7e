//! Static-knowledge selection.
//!
//! Snippets are ranked by keyword overlap against a fixed domain
//! vocabulary: a query term only counts when it is a known formation term,
//! so generic words never pull in unrelated snippets.

use dg_domain::record::KnowledgeSnippet;

/// The formation-domain vocabulary. Multi-word terms are matched as
/// substrings; single words by whole-word containment.
const VOCABULARY: &[&str] = &[
    "llc",
    "corporation",
    "corp",
    "s-corp",
    "c-corp",
    "partnership",
    "sole proprietor",
    "entity",
    "formation",
    "filing",
    "file",
    "state",
    "secretary of state",
    "registered agent",
    "ein",
    "tax",
    "irs",
    "bank",
    "name",
    "trademark",
    "timeline",
    "expedite",
    "fee",
    "liability",
];

fn terms_in(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
        .collect();
    VOCABULARY
        .iter()
        .filter(|term| {
            if term.contains(' ') {
                lower.contains(*term)
            } else {
                words.iter().any(|w| w == *term)
            }
        })
        .copied()
        .collect()
}

/// Score snippets by shared vocabulary terms with the query and return the
/// best `top_k`. Snippets with no overlap are dropped entirely.
pub fn select<'a>(
    query: &str,
    snippets: &'a [KnowledgeSnippet],
    top_k: usize,
) -> Vec<&'a KnowledgeSnippet> {
    let query_terms = terms_in(query);
    if query_terms.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, &KnowledgeSnippet)> = snippets
        .iter()
        .filter_map(|snippet| {
            let haystack = format!("{} {}", snippet.category, snippet.content);
            let snippet_terms = terms_in(&haystack);
            let overlap = query_terms
                .iter()
                .filter(|t| snippet_terms.contains(t))
                .count();
            (overlap > 0).then_some((overlap, snippet))
        })
        .collect();

    // Stable sort keeps the seeded ordering among equal scores.
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(top_k).map(|(_, s)| s).collect()
}
