//! Text normalisation applied to every collected mention before it is
//! classified and stored.

use std::collections::HashSet;
use std::sync::LazyLock;

use estatepulse_core::CollectedMention;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"http\S+|www\S+").expect("valid url regex"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+").expect("valid email regex"));
static HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[@#]\w+").expect("valid handle regex"));
static NON_LETTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z\s]").expect("valid non-letter regex"));

/// English stopwords (the NLTK list).
const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "youre", "youve",
    "youll", "youd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "shes", "her", "hers", "herself", "it", "its", "itself", "they", "them", "their",
    "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "thatll", "these",
    "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "dont", "should", "shouldve", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "arent", "couldn", "couldnt", "didn",
    "didnt", "doesn", "doesnt", "hadn", "hadnt", "hasn", "hasnt", "haven", "havent", "isn",
    "isnt", "ma", "mightn", "mightnt", "mustn", "mustnt", "needn", "neednt", "shan", "shant",
    "shouldn", "shouldnt", "wasn", "wasnt", "weren", "werent", "won", "wont", "wouldn",
    "wouldnt",
];

static STOPWORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOPWORDS.iter().copied().collect());

static STEMMER: LazyLock<Stemmer> = LazyLock::new(|| Stemmer::create(Algorithm::English));

/// A collected mention that passed the length filter, with its cleaned text.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedMention {
    pub mention: CollectedMention,
    pub clean_text: String,
}

/// Normalise `text` for classification and keyword analysis.
///
/// Lowercases, removes URLs, e-mail addresses, `@handles` and `#hashtags`,
/// drops everything but ASCII letters, removes stopwords and tokens of two
/// characters or fewer, then stems what is left (Snowball English).
#[must_use]
pub fn clean_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let lowered = text.to_lowercase();
    let no_urls = URL_RE.replace_all(&lowered, " ");
    let no_emails = EMAIL_RE.replace_all(&no_urls, " ");
    let no_handles = HANDLE_RE.replace_all(&no_emails, " ");
    let letters = NON_LETTER_RE.replace_all(&no_handles, "");

    letters
        .split_whitespace()
        .filter(|token| token.len() > 2 && !STOPWORD_SET.contains(token))
        .map(|token| STEMMER.stem(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop texts shorter than `min_len` characters (after trimming), truncate
/// the rest to `max_len` characters, and attach the cleaned text.
#[must_use]
pub fn prepare(
    mentions: Vec<CollectedMention>,
    min_len: usize,
    max_len: usize,
) -> Vec<PreparedMention> {
    mentions
        .into_iter()
        .filter_map(|mut mention| {
            let trimmed = mention.text.trim();
            if trimmed.chars().count() < min_len {
                return None;
            }
            mention.text = truncate_chars(trimmed, max_len);
            let clean_text = clean_text(&mention.text);
            Some(PreparedMention {
                mention,
                clean_text,
            })
        })
        .collect()
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use estatepulse_core::{Engagement, SourceKind};

    use super::*;

    fn collected(text: &str) -> CollectedMention {
        CollectedMention {
            source: SourceKind::Reddit,
            external_id: "t3_x".to_string(),
            author: None,
            url: None,
            text: text.to_string(),
            engagement: Engagement::default(),
            published_at: None,
        }
    }

    #[test]
    fn strips_urls_emails_handles_and_hashtags() {
        let cleaned = clean_text(
            "Check https://example.com/flat and www.homes.in, mail sales@builder.com \
             @agent #KondapurHomes flats",
        );
        assert_eq!(cleaned, "check mail flat");
    }

    #[test]
    fn drops_digits_punctuation_stopwords_and_short_tokens() {
        let cleaned = clean_text("The 3BHK flat is NOT cheap!!! Rs 95 lakh, on a 12th floor.");
        assert_eq!(cleaned, "bhk flat cheap lakh floor");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(clean_text("  great \n\n\t deal  "), "great deal");
    }

    #[test]
    fn stems_inflected_tokens() {
        assert_eq!(clean_text("Flat prices rising"), "flat price rise");
        assert_eq!(clean_text("homes"), "home");
    }

    #[test]
    fn empty_input_returns_empty() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn prepare_filters_short_texts_and_truncates_long_ones() {
        let long = "a".repeat(50);
        let prepared = prepare(
            vec![
                collected("too short"),
                collected("   long enough text for homes   "),
                collected(&long),
            ],
            20,
            30,
        );

        assert_eq!(prepared.len(), 2);
        assert_eq!(prepared[0].mention.text, "long enough text for homes");
        assert_eq!(prepared[0].clean_text, "long enough text home");
        assert_eq!(prepared[1].mention.text.chars().count(), 30);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
