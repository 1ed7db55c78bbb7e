//! Deterministic regex fact extraction.
//!
//! Used when no LLM provider is configured or the provider's output cannot
//! be parsed. Total: always returns a schema-complete [`ExtractedFacts`]
//! tagged `fallback`, never an error. Voice transcripts spell punctuation
//! out loud, so the email heuristics repair spoken "at"/"dot" forms.

use std::sync::LazyLock;

use regex::Regex;

use dg_domain::record::{ExtractedFacts, ExtractionMethod};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Patterns
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:(?i)my name is|(?i)this is|(?i)i am|(?i)i'm)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,2})")
        .expect("name pattern")
});

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("email pattern")
});

// "jane at acme dot com" — local part, spoken at, domain labels joined by
// spoken dots.
static SPOKEN_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z0-9._%+\-]+)\s+at\s+([a-z0-9\-]+(?:\s+dot\s+[a-z0-9\-]+)+)\b")
        .expect("spoken email pattern")
});

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?1?[\s.\-(]*\d{3}[\s.\-)]*\d{3}[\s.\-]*\d{4}").expect("phone pattern")
});

static BUSINESS_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:(?i)business is called|(?i)company is called|(?i)call it|(?i)business name is)\s+([A-Z][A-Za-z0-9&' ]{1,40}?)(?:[.,!?]|$)",
    )
    .expect("business name pattern")
});

static TIMELINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(as soon as possible|right away|next week|next month|this week|this month|within \d+ (?:days?|weeks?|months?)|in \d+ (?:days?|weeks?|months?))\b",
    )
    .expect("timeline pattern")
});

const STATES: [&str; 50] = [
    "Alabama", "Alaska", "Arizona", "Arkansas", "California", "Colorado",
    "Connecticut", "Delaware", "Florida", "Georgia", "Hawaii", "Idaho",
    "Illinois", "Indiana", "Iowa", "Kansas", "Kentucky", "Louisiana",
    "Maine", "Maryland", "Massachusetts", "Michigan", "Minnesota",
    "Mississippi", "Missouri", "Montana", "Nebraska", "Nevada",
    "New Hampshire", "New Jersey", "New Mexico", "New York",
    "North Carolina", "North Dakota", "Ohio", "Oklahoma", "Oregon",
    "Pennsylvania", "Rhode Island", "South Carolina", "South Dakota",
    "Tennessee", "Texas", "Utah", "Vermont", "Virginia", "Washington",
    "West Virginia", "Wisconsin", "Wyoming",
];

// Checked in order; the first match wins.
const ENTITY_KEYWORDS: [(&str, &str); 7] = [
    ("s-corp", "S-Corp"),
    ("s corp", "S-Corp"),
    ("c-corp", "C-Corp"),
    ("c corp", "C-Corp"),
    ("llc", "LLC"),
    ("limited liability", "LLC"),
    ("sole proprietor", "Sole Proprietorship"),
];

const ENTITY_KEYWORDS_TAIL: [(&str, &str); 3] = [
    ("corporation", "Corporation"),
    ("incorporate", "Corporation"),
    ("partnership", "Partnership"),
];

const BUSINESS_TYPES: [(&str, &str); 8] = [
    ("consulting", "consulting"),
    ("restaurant", "restaurant"),
    ("e-commerce", "e-commerce"),
    ("online store", "e-commerce"),
    ("real estate", "real estate"),
    ("construction", "construction"),
    ("landscaping", "landscaping"),
    ("coaching", "coaching"),
];

const URGENCY_HIGH: [&str; 4] = ["asap", "as soon as possible", "urgent", "right away"];
const URGENCY_LOW: [&str; 3] = ["no rush", "no hurry", "whenever"];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Extraction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn find_email(text: &str) -> Option<String> {
    if let Some(m) = EMAIL.find(text) {
        return Some(m.as_str().to_owned());
    }
    SPOKEN_EMAIL.captures(text).map(|caps| {
        let local = caps[1].to_lowercase();
        let domain = caps[2]
            .to_lowercase()
            .split_whitespace()
            .filter(|w| *w != "dot")
            .collect::<Vec<_>>()
            .join(".");
        format!("{local}@{domain}")
    })
}

fn find_state(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    STATES
        .iter()
        .find(|state| {
            let needle = state.to_lowercase();
            lower
                .match_indices(&needle)
                .any(|(i, _)| word_bounded(&lower, i, needle.len()))
        })
        .map(|s| (*s).to_owned())
}

fn word_bounded(text: &str, start: usize, len: usize) -> bool {
    let before_ok = start == 0
        || !text[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric());
    let after_ok = !text[start + len..]
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric());
    before_ok && after_ok
}

fn find_keyword<'a>(text_lower: &str, table: &[(&str, &'a str)]) -> Option<&'a str> {
    table
        .iter()
        .find(|(needle, _)| text_lower.contains(needle))
        .map(|(_, label)| *label)
}

fn find_urgency(text_lower: &str) -> Option<String> {
    if URGENCY_HIGH.iter().any(|k| text_lower.contains(k)) {
        Some("high".into())
    } else if URGENCY_LOW.iter().any(|k| text_lower.contains(k)) {
        Some("low".into())
    } else if TIMELINE.is_match(text_lower) {
        Some("medium".into())
    } else {
        None
    }
}

/// Extract what the heuristics can find from user-side transcript text.
pub fn extract(user_text: &str) -> ExtractedFacts {
    let lower = user_text.to_lowercase();

    let entity_type = find_keyword(&lower, &ENTITY_KEYWORDS)
        .or_else(|| find_keyword(&lower, &ENTITY_KEYWORDS_TAIL))
        .map(str::to_owned);

    ExtractedFacts {
        customer_name: NAME
            .captures(user_text)
            .map(|c| c[1].trim().to_owned()),
        customer_email: find_email(user_text),
        customer_phone: PHONE.find(user_text).map(|m| m.as_str().trim().to_owned()),
        business_name: BUSINESS_NAME
            .captures(user_text)
            .map(|c| c[1].trim().to_owned()),
        business_type: find_keyword(&lower, &BUSINESS_TYPES).map(str::to_owned),
        state_of_operation: find_state(user_text),
        entity_type,
        timeline: TIMELINE
            .find(&lower)
            .map(|m| m.as_str().to_owned()),
        urgency_level: find_urgency(&lower),
        extraction_method: Some(ExtractionMethod::Fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_name_spoken_email_state_and_entity() {
        let facts =
            extract("My name is Jane Doe, email jane at acme dot com, I want an LLC in Texas");
        assert_eq!(facts.customer_name.as_deref(), Some("Jane Doe"));
        assert_eq!(facts.customer_email.as_deref(), Some("jane@acme.com"));
        assert_eq!(facts.state_of_operation.as_deref(), Some("Texas"));
        assert_eq!(facts.entity_type.as_deref(), Some("LLC"));
        assert_eq!(facts.extraction_method, Some(ExtractionMethod::Fallback));
    }

    #[test]
    fn written_email_preferred_over_spoken_repair() {
        let facts = extract("reach me at bob@example.org");
        assert_eq!(facts.customer_email.as_deref(), Some("bob@example.org"));
    }

    #[test]
    fn spoken_email_with_multiple_dots() {
        let facts = extract("it's mary at mail dot co dot uk");
        assert_eq!(facts.customer_email.as_deref(), Some("mary@mail.co.uk"));
    }

    #[test]
    fn phone_number_variants() {
        for text in [
            "call me at +1 (555) 123-4567",
            "my number is 555-123-4567",
            "it's 555.123.4567",
        ] {
            let facts = extract(text);
            assert!(facts.customer_phone.is_some(), "no phone in {text:?}");
        }
    }

    #[test]
    fn state_match_is_word_bounded() {
        // "Georgian" must not match Georgia.
        let facts = extract("I run a Georgian bakery");
        assert!(facts.state_of_operation.is_none());
        let facts = extract("we operate in Georgia");
        assert_eq!(facts.state_of_operation.as_deref(), Some("Georgia"));
    }

    #[test]
    fn urgency_keywords() {
        assert_eq!(extract("I need this ASAP").urgency_level.as_deref(), Some("high"));
        assert_eq!(extract("no rush at all").urgency_level.as_deref(), Some("low"));
        assert_eq!(
            extract("hoping to launch next month").urgency_level.as_deref(),
            Some("medium")
        );
    }

    #[test]
    fn empty_text_yields_schema_complete_empty_result() {
        let facts = extract("");
        assert_eq!(facts.fields_present(), 0);
        assert_eq!(facts.extraction_method, Some(ExtractionMethod::Fallback));
    }
}
