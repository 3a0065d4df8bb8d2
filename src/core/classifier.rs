/// Keyword classifier: tokenization and category matching over free text.
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::schema::character::CharacterType;

/// Tokens shorter than this are discarded.
pub const MIN_TOKEN_LEN: usize = 3;

/// Punctuation trimmed from both ends of a token after splitting.
const EDGE_PUNCTUATION: &[char] = &['.', '!', '?', ';', ':', '"', '\'', '(', ')'];

/// Keywords signalling one genre.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeKeywords {
    pub genre: CharacterType,
    pub keywords: Vec<String>,
}

/// Keywords recognizing a well-known franchise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FranchiseKeywords {
    /// Canonical lowercase name, also matched as a substring of the raw text.
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Two tokens that together identify the franchise ("star" + "wars").
    #[serde(default)]
    pub conjunction: Option<(String, String)>,
}

/// Static keyword tables. Loaded from `lexicon.ron`.
///
/// `themes` is in priority order: the first matching entry decides a genre.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Lexicon {
    pub themes: Vec<ThemeKeywords>,
    pub archetypes: Vec<String>,
    pub traits: Vec<String>,
    pub franchises: Vec<FranchiseKeywords>,
    /// Tokens never used as scenario subjects.
    #[serde(default)]
    pub stopwords: Vec<String>,
}

impl Lexicon {
    pub fn parse_ron(input: &str) -> Result<Lexicon, ron::error::SpannedError> {
        ron::from_str(input)
    }

    pub(crate) fn lint(&self, issues: &mut Vec<String>) {
        if self.themes.is_empty() {
            issues.push("lexicon: no theme keyword sets".to_string());
        }
        for theme in &self.themes {
            if theme.keywords.is_empty() {
                issues.push(format!("lexicon: theme '{}' has no keywords", theme.genre));
            }
            for kw in &theme.keywords {
                if kw.chars().count() < MIN_TOKEN_LEN {
                    issues.push(format!(
                        "lexicon: theme keyword '{}' is shorter than {} characters and can never match",
                        kw, MIN_TOKEN_LEN
                    ));
                }
            }
        }
        for franchise in &self.franchises {
            if franchise.name.trim().is_empty() {
                issues.push("lexicon: franchise with empty name".to_string());
            }
            if franchise.name != franchise.name.to_lowercase() {
                issues.push(format!(
                    "lexicon: franchise name '{}' must be lowercase",
                    franchise.name
                ));
            }
        }
    }
}

/// Which keyword table a match came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeywordCategory {
    Theme(CharacterType),
    Archetype,
    Trait,
    Franchise,
}

/// Result of classifying a piece of text.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Normalized tokens in input order, without duplicates.
    pub tokens: Vec<String>,
    pub matched: BTreeMap<KeywordCategory, BTreeSet<String>>,
    /// Canonical name of the recognized franchise.
    pub franchise: Option<String>,
    token_set: FxHashSet<String>,
    text: String,
}

impl Classification {
    /// Returns true if the exact token is present.
    pub fn contains(&self, token: &str) -> bool {
        self.token_set.contains(token)
    }

    /// Returns true if any of the keywords is present as a token.
    pub fn contains_any<S: AsRef<str>>(&self, keywords: &[S]) -> bool {
        keywords.iter().any(|k| self.token_set.contains(k.as_ref()))
    }

    /// Returns true if the phrase occurs anywhere in the lowercased text.
    pub fn mentions(&self, phrase: &str) -> bool {
        !phrase.is_empty() && self.text.contains(&phrase.to_lowercase())
    }

    /// The lowercased input text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn matches(&self, category: KeywordCategory) -> Option<&BTreeSet<String>> {
        self.matched.get(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Lowercase, split on whitespace and commas, trim edge punctuation and
/// drop tokens shorter than [`MIN_TOKEN_LEN`].
pub fn tokenize(text: &str) -> Vec<String> {
    let mut seen = FxHashSet::default();
    text.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|t| t.trim_matches(EDGE_PUNCTUATION))
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}

/// Returns true if `phrase` occurs in `text` as a run of whole words.
/// Both sides are compared case-insensitively on alphanumeric words.
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    let words = |s: &str| -> Vec<String> {
        s.split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect()
    };
    let needle = words(phrase);
    if needle.is_empty() {
        return false;
    }
    words(text).windows(needle.len()).any(|w| w == needle.as_slice())
}

/// Stateless classifier over a [`Lexicon`].
#[derive(Debug, Clone, Copy)]
pub struct KeywordClassifier<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> KeywordClassifier<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn classify(&self, text: &str) -> Classification {
        let tokens = tokenize(text);
        let token_set: FxHashSet<String> = tokens.iter().cloned().collect();
        let lowered = text.to_lowercase();

        let mut matched: BTreeMap<KeywordCategory, BTreeSet<String>> = BTreeMap::new();
        for theme in &self.lexicon.themes {
            record_hits(
                &mut matched,
                KeywordCategory::Theme(theme.genre),
                &token_set,
                &theme.keywords,
            );
        }
        record_hits(
            &mut matched,
            KeywordCategory::Archetype,
            &token_set,
            &self.lexicon.archetypes,
        );
        record_hits(
            &mut matched,
            KeywordCategory::Trait,
            &token_set,
            &self.lexicon.traits,
        );

        let franchise = self.detect_franchise(&token_set, &lowered);
        if let Some(ref name) = franchise {
            matched
                .entry(KeywordCategory::Franchise)
                .or_default()
                .insert(name.clone());
        }

        tracing::trace!(
            tokens = tokens.len(),
            categories = matched.len(),
            franchise = ?franchise,
            "classified keywords"
        );

        Classification {
            tokens,
            matched,
            franchise,
            token_set,
            text: lowered,
        }
    }

    /// Franchise detection: keyword intersection, then the name as a
    /// whole-word phrase, then the two-token conjunction.
    fn detect_franchise(&self, tokens: &FxHashSet<String>, lowered: &str) -> Option<String> {
        self.lexicon
            .franchises
            .iter()
            .find(|f| {
                f.keywords.iter().any(|k| tokens.contains(k))
                    || contains_phrase(lowered, &f.name)
                    || f
                        .conjunction
                        .as_ref()
                        .is_some_and(|(a, b)| tokens.contains(a) && tokens.contains(b))
            })
            .map(|f| f.name.clone())
    }
}

fn record_hits(
    matched: &mut BTreeMap<KeywordCategory, BTreeSet<String>>,
    category: KeywordCategory,
    tokens: &FxHashSet<String>,
    keywords: &[String],
) {
    let hits: BTreeSet<String> = keywords
        .iter()
        .filter(|k| tokens.contains(k.as_str()))
        .cloned()
        .collect();
    if !hits.is_empty() {
        matched.entry(category).or_default().extend(hits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_lexicon() -> Lexicon {
        Lexicon::parse_ron(
            r#"(
                themes: [
                    (genre: combat, keywords: ["battle", "ninja"]),
                    (genre: fantasy, keywords: ["dragon", "wizard"]),
                    (genre: scifi, keywords: ["space", "robot"]),
                ],
                archetypes: ["ninja", "wizard"],
                traits: ["angry", "quiet"],
                franchises: [
                    (name: "star wars", keywords: ["jedi"], conjunction: Some(("star", "wars"))),
                    (name: "harry potter", keywords: ["hogwarts"]),
                ],
                stopwords: ["the", "and"],
            )"#,
        )
        .unwrap()
    }

    #[test]
    fn tokenize_normalizes_and_filters() {
        let tokens = tokenize("Ninja, ANGRY  ox   the wizard! wizard");
        assert_eq!(tokens, vec!["ninja", "angry", "the", "wizard"]);
    }

    #[test]
    fn tokenize_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ,, ").is_empty());
    }

    #[test]
    fn classify_matches_categories() {
        let lexicon = make_lexicon();
        let c = KeywordClassifier::new(&lexicon).classify("angry ninja in a space battle");
        assert!(c.contains("ninja"));
        let combat = c.matches(KeywordCategory::Theme(CharacterType::Combat)).unwrap();
        assert!(combat.contains("battle") && combat.contains("ninja"));
        assert!(c.matches(KeywordCategory::Theme(CharacterType::Scifi)).is_some());
        assert!(c.matches(KeywordCategory::Theme(CharacterType::Fantasy)).is_none());
        assert_eq!(
            c.matches(KeywordCategory::Trait).unwrap().iter().collect::<Vec<_>>(),
            vec!["angry"]
        );
        assert!(c.franchise.is_none());
    }

    #[test]
    fn classify_empty_has_no_matches() {
        let lexicon = make_lexicon();
        let c = KeywordClassifier::new(&lexicon).classify("");
        assert!(c.is_empty());
        assert!(c.matched.is_empty());
        assert!(c.franchise.is_none());
    }

    #[test]
    fn franchise_by_conjunction_substring_and_keyword() {
        let lexicon = make_lexicon();
        let classifier = KeywordClassifier::new(&lexicon);
        assert_eq!(
            classifier.classify("wars among the star systems").franchise.as_deref(),
            Some("star wars")
        );
        assert_eq!(
            classifier.classify("Star Wars battle").franchise.as_deref(),
            Some("star wars")
        );
        assert_eq!(
            classifier.classify("a young jedi").franchise.as_deref(),
            Some("star wars")
        );
        assert_eq!(
            classifier.classify("hogwarts express").franchise.as_deref(),
            Some("harry potter")
        );
        assert!(classifier.classify("a star in the sky").franchise.is_none());
        assert!(classifier.classify("superstar warsaw").franchise.is_none());
    }

    #[test]
    fn phrase_matching_respects_word_boundaries() {
        assert!(contains_phrase("a star wars battle", "star wars"));
        assert!(contains_phrase("Star-Wars fan", "star wars"));
        assert!(!contains_phrase("superstar warsaw", "star wars"));
        assert!(!contains_phrase("murder at blackwood manor", "man"));
        assert!(!contains_phrase("anything", ""));
    }

    #[test]
    fn lint_flags_unmatchable_keywords() {
        let mut lexicon = make_lexicon();
        lexicon.themes[0].keywords.push("ai".to_string());
        let mut issues = Vec::new();
        lexicon.lint(&mut issues);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("'ai'"));
    }
}
