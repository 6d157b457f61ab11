//! Heuristic place-name extraction from news text.
//!
//! There is no trained model here: capitalised phrases are collected from
//! the text and kept when the context suggests a place. A phrase counts as
//! a place when any of these hold:
//!
//! - it is in the built-in gazetteer of countries, regions and logistics hubs
//! - it follows a locative preposition ("in Rotterdam", "from Busan")
//! - it precedes a facility noun ("Felixstowe port", "Tema terminal")
//! - it starts with a geographic head word ("Port of Santos", "Strait of Hormuz")
//!
//! Recall and precision are both best effort. Downstream code must cope
//! with zero candidates as well as spurious ones, and the geocoder's
//! importance score does the real disambiguation.
//!
//! [`extract_locations`] is total: every input, including malformed HTML
//! and empty strings, yields a (possibly empty) list.

use crate::utils::strip_html;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}\p{N}](?:[\p{L}\p{N}\p{M}'’\-]*[\p{L}\p{N}\p{M}])?")
        .expect("word pattern is valid")
});

const LOCATIVES: &[&str] = &[
    "in", "at", "from", "to", "near", "across", "via", "into", "off", "outside", "inside",
    "towards", "toward", "through", "throughout", "around", "between", "within",
];

const FACILITY_NOUNS: &[&str] = &[
    "port", "ports", "terminal", "terminals", "harbour", "harbor", "airport", "hub", "canal",
    "strait", "warehouse", "depot", "rail", "railway", "corridor", "province", "region", "city",
    "state", "county",
];

const GEOGRAPHIC_HEADS: &[&str] = &[
    "port", "gulf", "strait", "straits", "canal", "cape", "bay", "lake", "mount", "sea", "isle",
    "island", "islands", "river",
];

const CONNECTORS: &[&str] = &["of", "de", "del", "da", "do", "la", "le", "al", "el", "upon"];

const ARTICLES: &[&str] = &["the", "a", "an"];

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "it", "its", "he", "she", "they", "we",
    "i", "you", "our", "their", "his", "her", "but", "and", "or", "if", "as", "so", "new",
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "monday", "tuesday", "wednesday", "thursday", "friday",
    "saturday", "sunday", "today", "tomorrow", "yesterday", "q1", "q2", "q3", "q4", "ceo",
    "cfo", "mr", "mrs", "ms", "dr", "read", "more", "news", "update", "report", "week",
];

const GAZETTEER: &[&str] = &[
    // countries and territories
    "afghanistan", "albania", "algeria", "angola", "argentina", "australia", "austria",
    "bahrain", "bangladesh", "belgium", "brazil", "bulgaria", "cambodia", "cameroon", "canada",
    "chile", "china", "colombia", "croatia", "cyprus", "czech republic", "denmark", "djibouti",
    "ecuador", "egypt", "estonia", "ethiopia", "finland", "france", "germany", "ghana", "greece",
    "hong kong", "hungary", "iceland", "india", "indonesia", "iran", "iraq", "ireland", "israel",
    "italy", "ivory coast", "jamaica", "japan", "jordan", "kazakhstan", "kenya", "kuwait",
    "latvia", "lebanon", "libya", "lithuania", "malaysia", "malta", "mexico", "morocco",
    "mozambique", "myanmar", "namibia", "netherlands", "new zealand", "nigeria", "north korea",
    "norway", "oman", "pakistan", "panama", "peru", "philippines", "poland", "portugal", "qatar",
    "romania", "russia", "saudi arabia", "senegal", "singapore", "slovakia", "slovenia",
    "somalia", "south africa", "south korea", "spain", "sri lanka", "sudan", "sweden",
    "switzerland", "syria", "taiwan", "tanzania", "thailand", "tunisia", "turkey", "türkiye",
    "uae", "uk", "ukraine", "united arab emirates", "united kingdom", "united states",
    "uruguay", "us", "usa", "venezuela", "vietnam", "yemen",
    // regions and waterways
    "africa", "asia", "europe", "latin america", "middle east", "north america",
    "south america", "scandinavia", "baltic", "mediterranean", "red sea", "black sea",
    "north sea", "south china sea", "suez canal", "panama canal", "strait of hormuz",
    "bab el-mandeb", "malacca strait", "english channel", "gulf of aden", "persian gulf",
    // logistics hubs
    "rotterdam", "antwerp", "hamburg", "bremerhaven", "felixstowe", "southampton", "london",
    "le havre", "valencia", "algeciras", "barcelona", "genoa", "piraeus", "gdansk",
    "shanghai", "ningbo", "shenzhen", "guangzhou", "qingdao", "tianjin", "busan", "tokyo",
    "yokohama", "kaohsiung", "port klang", "tanjung pelepas", "jebel ali", "dubai",
    "abu dhabi", "colombo", "mumbai", "chennai", "karachi", "jeddah", "durban", "mombasa",
    "lagos", "tema", "tangier", "los angeles", "long beach", "oakland", "seattle", "tacoma",
    "vancouver", "montreal", "houston", "savannah", "charleston", "new york", "new jersey",
    "baltimore", "norfolk", "miami", "chicago", "memphis", "santos", "manzanillo", "callao",
    "cartagena", "balboa", "colon",
];

static GAZETTEER_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| GAZETTEER.iter().copied().collect());

/// A word of the input plus what separates it from the previous word.
#[derive(Debug)]
struct Word<'a> {
    text: &'a str,
    /// Punctuation between this word and the previous one ends a phrase.
    breaks_before: bool,
}

impl Word<'_> {
    fn is_capitalised(&self) -> bool {
        self.text.chars().next().is_some_and(char::is_uppercase)
    }

    fn lower(&self) -> String {
        self.text.to_lowercase()
    }
}

#[derive(Debug)]
struct Phrase<'a> {
    words: Vec<&'a str>,
    before: Option<String>,
    after: Option<String>,
}

fn split_words(text: &str) -> Vec<Word<'_>> {
    let mut last_end = 0;
    WORD.find_iter(text)
        .map(|m| {
            let gap = &text[last_end..m.start()];
            last_end = m.end();
            Word {
                text: m.as_str(),
                breaks_before: gap.chars().any(|c| ".,;:!?()[]{}\"“”|/\n".contains(c)),
            }
        })
        .collect()
}

fn collect_phrases<'a>(words: &[Word<'a>]) -> Vec<Phrase<'a>> {
    let mut phrases: Vec<Phrase<'a>> = Vec::new();
    let mut open: Option<Phrase<'a>> = None;

    for (i, word) in words.iter().enumerate() {
        if word.is_capitalised() {
            if !word.breaks_before {
                if let Some(phrase) = open.as_mut() {
                    phrase.words.push(word.text);
                    continue;
                }
            }
            phrases.extend(open.take());
            let before = (i > 0 && !word.breaks_before).then(|| words[i - 1].lower());
            open = Some(Phrase {
                words: vec![word.text],
                before,
                after: None,
            });
        } else if let Some(mut phrase) = open.take() {
            let lower = word.lower();
            let bridges = CONNECTORS.contains(&lower.as_str())
                && !word.breaks_before
                && words
                    .get(i + 1)
                    .is_some_and(|next| next.is_capitalised() && !next.breaks_before);
            if bridges {
                phrase.words.push(word.text);
                open = Some(phrase);
            } else {
                if !word.breaks_before {
                    phrase.after = Some(lower);
                }
                phrases.push(phrase);
            }
        }
    }
    phrases.extend(open);
    phrases
}

fn strip_possessive(word: &str) -> &str {
    word.strip_suffix("'s")
        .or_else(|| word.strip_suffix("’s"))
        .unwrap_or(word)
}

fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word.to_lowercase().as_str())
}

fn is_article(word: &str) -> bool {
    ARTICLES.contains(&word.to_lowercase().as_str())
}

fn in_gazetteer(words: &[&str]) -> bool {
    GAZETTEER_SET.contains(words.join(" ").to_lowercase().as_str())
}

/// Clean a phrase and decide whether it names a place.
fn place_name(phrase: &Phrase<'_>) -> Option<String> {
    let mut words: Vec<&str> = phrase.words.clone();
    if let Some(last) = words.last_mut() {
        *last = strip_possessive(*last);
    }
    // Whole-phrase match first: "New York" must not lose its "New"
    if in_gazetteer(&words) {
        return Some(words.join(" "));
    }
    while words.len() > 1 && is_article(words[0]) {
        words.remove(0);
    }
    if in_gazetteer(&words) {
        return Some(words.join(" "));
    }
    if words.iter().all(|w| is_stopword(w)) {
        return None;
    }

    let name = words.join(" ");
    // Lone initials and short acronyms are organisations far more often
    if name.chars().count() < 3 || (words.len() == 1 && name.chars().all(|c| !c.is_lowercase())) {
        return None;
    }

    let first = words[0].to_lowercase();
    let after_locative = phrase
        .before
        .as_deref()
        .is_some_and(|w| LOCATIVES.contains(&w));
    let before_facility = phrase
        .after
        .as_deref()
        .is_some_and(|w| FACILITY_NOUNS.contains(&w));
    let geographic_head = words.len() > 1 && GEOGRAPHIC_HEADS.contains(&first.as_str());

    (after_locative || before_facility || geographic_head).then_some(name)
}

/// Extract candidate place names from free text.
///
/// HTML markup is stripped first. Candidates come back in order of first
/// appearance with duplicates removed; that order is a priority hint only.
///
/// # Examples
///
/// ```ignore
/// let places = extract_locations("Congestion at Rotterdam spills over to Antwerp");
/// assert_eq!(places, vec!["Rotterdam", "Antwerp"]);
/// ```
pub fn extract_locations(text: &str) -> Vec<String> {
    let plain = strip_html(text);
    let words = split_words(&plain);
    collect_phrases(&words)
        .iter()
        .filter_map(place_name)
        .unique()
        .collect()
}
