//! Heuristic mapping generation.
//!
//! [`auto_map`] pairs declared target paths with table headers by name. Matching runs in stages,
//! first hit wins:
//!
//! 1. exact name
//! 2. case-insensitive name
//! 3. known header spellings for a handful of common targets (`zip_code` <- `PLZ`, ...)
//! 4. direct synonym (`city` <- `stadt`)
//! 5. token overlap over synonym-expanded `_`-separated tokens, scored
//!    `common / max(|target tokens|, |source tokens|)` (x1.5 when more than one token overlaps);
//!    the best score above 0.3 wins
//!
//! A dotted target that finds nothing is retried with its last segment. Each source column is
//! used at most once, by the first target (in target order) that claims it.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::types::Mapping;

const MIN_SCORE: f64 = 0.3;

const STRIPPED_SUFFIXES: [&str; 6] = ["_id", "_name", "_nr", "_no", "_num", "_number"];

/// Canonical word -> spellings seen in English, German and French headers.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("address", &["adresse", "addr", "adr"]),
    ("street", &["strasse", "straße", "str"]),
    ("city", &["stadt", "ort", "place"]),
    ("zip", &["zipcode", "postal", "postcode", "plz", "postleitzahl", "zip_code", "postal_code"]),
    ("plz", &["zip", "zipcode", "postal", "postcode", "postleitzahl", "zip_code", "postal_code"]),
    ("name", &["nom", "namen"]),
    ("first", &["vorname", "firstname", "first_name", "given"]),
    ("last", &["nachname", "lastname", "last_name", "surname", "family"]),
    ("phone", &["telefon", "tel", "telephone", "mobile", "cell"]),
    ("email", &["e-mail", "mail", "e_mail"]),
    ("country", &["land", "pays", "nation"]),
    ("state", &["bundesland", "province", "region"]),
    ("company", &["firma", "organization", "organisation", "business"]),
    ("date", &["datum", "day", "tag"]),
    ("number", &["nummer", "no", "num", "nr"]),
    ("price", &["preis", "cost", "prix"]),
    ("amount", &["betrag", "sum", "quantity", "menge"]),
];

/// Exact header spellings accepted for some lowercase target names.
const SPECIAL_CASES: &[(&str, &[&str])] = &[
    ("zip_code", &["PLZ", "ZIP", "PostalCode"]),
    ("address", &["Adresse", "Anschrift", "ADRESSE"]),
    ("city", &["Stadt", "Ort", "CITY"]),
    ("country", &["Land", "COUNTRY"]),
    ("phone", &["Telefon", "Tel", "PHONE"]),
    ("email", &["Email", "E-Mail", "EMAIL"]),
];

/// Any spelling (lowercase) -> canonical word.
static CANONICAL: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut lookup = HashMap::new();
    for (main, variants) in SYNONYMS {
        for variant in *variants {
            lookup.insert(*variant, *main);
        }
        lookup.insert(*main, *main);
    }
    lookup
});

/// Generate a mapping from `source_columns` to `target_paths`.
///
/// Entries follow `target_paths` order. Targets without a match are left out.
///
/// ```rust
/// use csv2json::automap::auto_map;
///
/// let mapping = auto_map(
///     &["id", "address.city", "address.zip_code"],
///     &["ID".to_string(), "Stadt".to_string(), "PLZ".to_string()],
/// );
/// assert_eq!(mapping.target_of("ID"), Some("id"));
/// assert_eq!(mapping.target_of("Stadt"), Some("address.city"));
/// assert_eq!(mapping.target_of("PLZ"), Some("address.zip_code"));
/// ```
pub fn auto_map<T: AsRef<str>>(target_paths: &[T], source_columns: &[String]) -> Mapping {
    let mut mapping = Mapping::new();
    let mut claimed: HashSet<&str> = HashSet::new();

    for target in target_paths.iter().map(AsRef::as_ref) {
        let available: Vec<&str> = source_columns
            .iter()
            .map(String::as_str)
            .filter(|s| !claimed.contains(s))
            .collect();

        let last_segment = target.rsplit('.').next().filter(|last| *last != target);
        let found = match_name(target, &available)
            .or_else(|| last_segment.and_then(|last| match_name(last, &available)));

        match found {
            Some(source) => {
                tracing::debug!(target_path = target, source_column = source, "auto-mapped field");
                claimed.insert(source);
                mapping.insert(source, target);
            }
            None => tracing::debug!(target_path = target, "no source column matched"),
        }
    }
    mapping
}

/// Map every column to a top-level key of the same name.
pub fn identity_mapping(columns: &[String]) -> Mapping {
    columns.iter().map(|c| (c.as_str(), c.as_str())).collect()
}

fn match_name<'s>(target: &str, sources: &[&'s str]) -> Option<&'s str> {
    if let Some(exact) = sources.iter().find(|s| **s == target) {
        return Some(*exact);
    }

    let target_lower = target.to_lowercase();
    if let Some(ci) = sources.iter().find(|s| s.to_lowercase() == target_lower) {
        return Some(*ci);
    }

    let target_base = strip_suffix(&target_lower);
    let target_tokens = expand_tokens(target_base);
    let special = SPECIAL_CASES
        .iter()
        .find(|(name, _)| *name == target_lower)
        .map(|(_, spellings)| *spellings);

    let mut best: Option<(&'s str, f64)> = None;
    for &source in sources {
        if special.is_some_and(|spellings| spellings.contains(&source)) {
            return Some(source);
        }

        let source_lower = source.to_lowercase();
        let source_base = strip_suffix(&source_lower);
        if is_synonym_of(target_base, &source_lower) || is_synonym_of(source_base, &target_lower) {
            return Some(source);
        }

        let source_tokens = expand_tokens(source_base);
        let common = target_tokens.intersection(&source_tokens).count();
        if common == 0 {
            continue;
        }
        let mut score = common as f64 / target_tokens.len().max(source_tokens.len()) as f64;
        if common > 1 {
            score *= 1.5;
        }
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((source, score));
        }
    }

    best.filter(|(_, score)| *score > MIN_SCORE).map(|(source, _)| source)
}

fn strip_suffix(name: &str) -> &str {
    STRIPPED_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or(name)
}

/// Tokens of `base` plus the canonical word for each token that has one.
fn expand_tokens(base: &str) -> HashSet<&str> {
    let mut tokens = HashSet::new();
    for part in base.split('_') {
        tokens.insert(part);
        if let Some(main) = CANONICAL.get(part) {
            tokens.insert(*main);
        }
    }
    tokens
}

/// Whether `candidate` (lowercase) is a listed spelling of canonical word `word`.
fn is_synonym_of(word: &str, candidate: &str) -> bool {
    SYNONYMS
        .iter()
        .find(|(main, _)| *main == word)
        .is_some_and(|(_, variants)| variants.contains(&candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_and_case_insensitive_matches() {
        let mapping = auto_map(&["id", "name"], &cols(&["NAME", "id"]));
        assert_eq!(mapping.target_of("id"), Some("id"));
        assert_eq!(mapping.target_of("NAME"), Some("name"));
    }

    #[test]
    fn special_cases_and_synonyms() {
        let mapping = auto_map(
            &["zip_code", "city", "phone", "street"],
            &cols(&["PLZ", "Ort", "Telefon", "Strasse"]),
        );
        assert_eq!(mapping.target_of("PLZ"), Some("zip_code"));
        assert_eq!(mapping.target_of("Ort"), Some("city"));
        assert_eq!(mapping.target_of("Telefon"), Some("phone"));
        assert_eq!(mapping.target_of("Strasse"), Some("street"));
    }

    #[test]
    fn token_overlap_with_suffix_stripping() {
        let mapping = auto_map(&["company_name"], &cols(&["firma", "unrelated"]));
        assert_eq!(mapping.target_of("firma"), Some("company_name"));

        let mapping = auto_map(&["last_name"], &cols(&["nachname_kunde", "vorname_kunde"]));
        assert_eq!(mapping.target_of("nachname_kunde"), Some("last_name"));
    }

    #[test]
    fn dotted_targets_fall_back_to_last_segment() {
        let mapping = auto_map(&["customer.address.city", "customer.email"], &cols(&["Stadt", "E-Mail"]));
        assert_eq!(mapping.target_of("Stadt"), Some("customer.address.city"));
        assert_eq!(mapping.target_of("E-Mail"), Some("customer.email"));
    }

    #[test]
    fn unmatched_targets_are_skipped_and_sources_used_once() {
        let mapping = auto_map(&["city", "town_city", "weight"], &cols(&["city"]));
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.target_of("city"), Some("city"));
    }

    #[test]
    fn identity_maps_headers_to_themselves() {
        let mapping = identity_mapping(&cols(&["a", "b c"]));
        assert_eq!(mapping.target_of("a"), Some("a"));
        assert_eq!(mapping.target_of("b c"), Some("b c"));
        assert_eq!(mapping.len(), 2);
    }
}
