//! The `normalize` module folds raw address text into the canonical forms used as table keys.
//!
//! All BAN names pass through [`uniform`] before anything else: NFD decomposition, diacritic
//! stripping, upper-casing, and collapsing of separator runs to single spaces. The two
//! specialized forms, [`uniform_commune`] and [`uniform_adresse`], build on it with the lexical
//! rules that make hash-equality work between what users type and what the BAN publishes.
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Tokens dropped from commune names. French commune names repeat these so often
/// ("Saint-X-sur-Y-les-Z") that keeping them drowns the discriminating tokens.
const COMMUNE_STOPWORDS: &[&str] = &[
    "SAINT", "SAINTE", "ST", "STE", "LE", "LA", "LES", "DE", "DU", "DES", "D", "L", "SUR", "SOUS",
    "EN", "AUX",
];

/// Street-type prefixes collapsed to their canonical short form.
const STREET_TYPES: &[(&str, &str)] = &[
    ("RUE", "R"),
    ("AVENUE", "AV"),
    ("BOULEVARD", "BD"),
    ("PLACE", "PL"),
    ("CHEMIN", "CH"),
    ("ROUTE", "RT"),
    ("ALLEE", "AL"),
    ("IMPASSE", "IMP"),
];

/// The `uniform` function case-folds to upper, strips diacritics (NFD decomposition, then
/// dropping combining marks), replaces every run of non-ASCII-alphanumeric characters with a
/// single space, and trims. The result is idempotent and is also the display form stored in the
/// database tables.
pub fn uniform(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_uppercase());
        } else if !out.is_empty() && !out.ends_with(' ') {
            out.push(' ');
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// The `uniform_commune` function normalizes a commune name: [`uniform`], then dropping
/// stopwords that appear as whole tokens. A name made only of stopwords keeps its [`uniform`]
/// form unchanged, so Le Saint in Morbihan still resolves.
pub fn uniform_commune(text: &str) -> String {
    let base = uniform(text);
    let kept = base
        .split(' ')
        .filter(|token| !COMMUNE_STOPWORDS.contains(token))
        .collect::<Vec<&str>>();
    if kept.is_empty() {
        base
    } else {
        kept.join(" ")
    }
}

/// The `uniform_adresse` function normalizes a street name or free-form address line:
/// [`uniform`], then stripping the house number at the head (a bis/ter marker attached to the
/// number reduces to its single letter and stays), then collapsing a street-type prefix to its
/// canonical short form, so "12bis Rue de la Paix" and "Rue de la Paix" meet on the same key.
pub fn uniform_adresse(text: &str) -> String {
    let base = uniform(text);
    let mut tokens = base
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect::<Vec<String>>();

    // Strip the house number at the head.
    if tokens
        .first()
        .is_some_and(|token| token.starts_with(|c: char| c.is_ascii_digit()))
    {
        let first = tokens.remove(0);
        let rest = first.trim_start_matches(|c: char| c.is_ascii_digit());
        if let Some(marker) = repetition_letter(rest) {
            // "12BIS" keeps its marker as a single letter.
            tokens.insert(0, marker);
        } else if rest.is_empty() {
            // "12 bis Rue ..." spells the marker as its own token.
            if let Some(marker) = tokens.first().and_then(|token| repetition_letter(token)) {
                tokens[0] = marker;
            }
        }
    }

    // Collapse the street-type prefix. A kept repetition letter may sit in front of it.
    let prefix = match tokens.first() {
        Some(token) if token.len() == 1 && tokens.len() > 1 => 1,
        _ => 0,
    };
    if let Some(token) = tokens.get_mut(prefix) {
        if let Some(&(_, short)) = STREET_TYPES.iter().find(|(long, _)| *long == token.as_str()) {
            *token = short.to_string();
        }
    }

    tokens.join(" ")
}

/// The `uniform_repetition` function normalizes the BAN `repetition` column (the marker after a
/// house number): [`uniform`], spelled-out markers reduced to a letter, truncated to the
/// two bytes the Localisation record stores.
pub fn uniform_repetition(text: &str) -> String {
    let base = uniform(text);
    match base.as_str() {
        "BIS" => "B".to_string(),
        "TER" => "T".to_string(),
        "QUATER" => "Q".to_string(),
        _ => base.chars().take(2).collect(),
    }
}

/// The `repetition_letter` function reduces a repetition marker to its single-letter form:
/// "BIS" and "TER" map to "B" and "T", a lone letter stands for itself. Expects upper-case
/// input, as produced by [`uniform`].
pub fn repetition_letter(token: &str) -> Option<String> {
    match token {
        "BIS" => Some("B".to_string()),
        "TER" => Some("T".to_string()),
        _ => {
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => Some(c.to_string()),
                _ => None,
            }
        }
    }
}
