use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use rayon::prelude::*;
use strsim::normalized_levenshtein;
use tracing::debug;

/// Scores how alike two free-text names are, from 0 (unrelated) to 100 (identical).
pub trait SimilarityScorer: Sync {
    fn score(&self, query: &str, candidate: &str) -> f64;
}

/// Levenshtein ratio over accent-folded names, also tried with tokens sorted so that
/// "Martinez Lautaro" scores like "Lautaro Martinez".
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenRatioScorer;

impl SimilarityScorer for TokenRatioScorer {
    fn score(&self, query: &str, candidate: &str) -> f64 {
        let a = fold_name(query);
        let b = fold_name(candidate);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let plain = normalized_levenshtein(&a, &b);
        let sorted = normalized_levenshtein(&sorted_tokens(&a), &sorted_tokens(&b));
        (plain.max(sorted) * 100.0).round()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Exact(String),
    Fuzzy { name: String, score: f64 },
    Unresolved,
}

impl Resolution {
    pub fn canonical(&self) -> Option<&str> {
        match self {
            Self::Exact(name) | Self::Fuzzy { name, .. } => Some(name),
            Self::Unresolved => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappingStats {
    pub distinct: usize,
    pub exact: usize,
    pub fuzzy: usize,
    pub unresolved: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IdentityMapping {
    entries: HashMap<String, Resolution>,
}

impl IdentityMapping {
    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.entries.get(name).and_then(Resolution::canonical)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> MappingStats {
        let mut stats = MappingStats {
            distinct: self.entries.len(),
            ..Default::default()
        };
        for res in self.entries.values() {
            match res {
                Resolution::Exact(_) => stats.exact += 1,
                Resolution::Fuzzy { .. } => stats.fuzzy += 1,
                Resolution::Unresolved => stats.unresolved += 1,
            }
        }
        stats
    }

    /// Source names that could not be resolved, sorted.
    pub fn unresolved_names(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, r)| matches!(r, Resolution::Unresolved))
            .map(|(k, _)| k.as_str())
            .collect();
        out.sort_unstable();
        out
    }
}

pub struct NameResolver<S = TokenRatioScorer> {
    vocabulary: Vec<String>,
    exact: HashMap<String, usize>,
    scorer: S,
    threshold: f64,
}

impl<S: SimilarityScorer> NameResolver<S> {
    /// Vocabulary order is kept (duplicates dropped); on equal scores the earlier name wins.
    pub fn new<I, T>(vocabulary: I, scorer: S, threshold: f64) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        let mut exact = HashMap::new();
        for name in vocabulary {
            let name = name.as_ref().trim();
            if name.is_empty() || !seen.insert(name.to_string()) {
                continue;
            }
            exact.entry(normalize_name(name)).or_insert(names.len());
            names.push(name.to_string());
        }
        Self {
            vocabulary: names,
            exact,
            scorer,
            threshold,
        }
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn resolve(&self, name: &str) -> Resolution {
        let key = normalize_name(name);
        if key.is_empty() {
            return Resolution::Unresolved;
        }
        if let Some(&idx) = self.exact.get(&key) {
            return Resolution::Exact(self.vocabulary[idx].clone());
        }

        let mut best: Option<(usize, f64)> = None;
        for (idx, candidate) in self.vocabulary.iter().enumerate() {
            let score = self.scorer.score(name, candidate);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((idx, score));
            }
        }
        match best {
            Some((idx, score)) if score >= self.threshold => Resolution::Fuzzy {
                name: self.vocabulary[idx].clone(),
                score,
            },
            _ => Resolution::Unresolved,
        }
    }

    /// Resolves every distinct name once. Cost is distinct names x vocabulary, not rows.
    pub fn build_mapping<'a, I>(&self, names: I) -> IdentityMapping
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let distinct: Vec<&str> = names
            .into_iter()
            .filter(|n| seen.insert(*n))
            .collect();
        let entries: HashMap<String, Resolution> = distinct
            .par_iter()
            .map(|name| (name.to_string(), self.resolve(name)))
            .collect();
        let mapping = IdentityMapping { entries };
        debug!("name mapping built: {:?}", mapping.stats());
        mapping
    }
}

#[derive(Debug, Clone, Default)]
pub struct TeamAliases {
    map: HashMap<String, String>,
}

static BUNDLED_ALIASES: Lazy<TeamAliases> = Lazy::new(|| {
    TeamAliases::from_json(include_str!("../assets/team_aliases.json")).unwrap_or_default()
});

impl TeamAliases {
    pub fn bundled() -> &'static TeamAliases {
        &BUNDLED_ALIASES
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let parsed: HashMap<String, String> = serde_json::from_str(raw)?;
        let mut out = Self::default();
        out.extend(parsed);
        Ok(out)
    }

    pub fn extend<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (alias, canonical) in entries {
            let key = normalize_name(&alias);
            let value = normalize_name(&canonical);
            if !key.is_empty() && !value.is_empty() {
                self.map.insert(key, value);
            }
        }
    }

    /// Entries of `other` override existing aliases.
    pub fn merge(&mut self, other: TeamAliases) {
        self.map.extend(other.map);
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.map.get(&normalize_name(name)).map(String::as_str)
    }

    /// Canonical key of a name: its alias target, or the normalized name itself.
    pub fn canonical_key(&self, name: &str) -> String {
        self.lookup(name)
            .map(str::to_string)
            .unwrap_or_else(|| normalize_name(name))
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Team names resolved against the canonical keys of a reference team list: alias table
/// first, then exact key, then similarity.
pub struct TeamResolver<S = TokenRatioScorer> {
    aliases: TeamAliases,
    resolver: NameResolver<S>,
}

impl<S: SimilarityScorer> TeamResolver<S> {
    pub fn new<'a, I>(reference_teams: I, aliases: TeamAliases, scorer: S, threshold: f64) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keys: Vec<String> = reference_teams
            .into_iter()
            .map(|t| aliases.canonical_key(t))
            .collect();
        Self {
            resolver: NameResolver::new(keys, scorer, threshold),
            aliases,
        }
    }

    pub fn resolve(&self, name: &str) -> Resolution {
        if let Some(canonical) = self.aliases.lookup(name) {
            return Resolution::Exact(canonical.to_string());
        }
        self.resolver.resolve(name)
    }

    pub fn canonical(&self, name: &str) -> Option<String> {
        self.resolve(name).canonical().map(str::to_string)
    }

    pub fn build_mapping<'a, I>(&self, names: I) -> IdentityMapping
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let distinct: Vec<&str> = names
            .into_iter()
            .filter(|n| seen.insert(*n))
            .collect();
        let entries = distinct
            .par_iter()
            .map(|name| (name.to_string(), self.resolve(name)))
            .collect();
        IdentityMapping { entries }
    }
}

/// Exact-match key: lowercased, trimmed, inner whitespace collapsed.
pub fn normalize_name(input: &str) -> String {
    input
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Similarity key: lowercased, accents folded, punctuation turned into token breaks.
pub fn fold_name(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;
    let mut buf = [0u8; 4];
    for ch in input.chars().flat_map(char::to_lowercase) {
        let piece: &str = match fold_char(ch) {
            Some(s) => s,
            None if ch.is_alphanumeric() => ch.encode_utf8(&mut buf),
            None => {
                pending_space = true;
                continue;
            }
        };
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push_str(piece);
    }
    out
}

fn sorted_tokens(folded: &str) -> String {
    let mut tokens: Vec<&str> = folded.split(' ').filter(|t| !t.is_empty()).collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn fold_char(ch: char) -> Option<&'static str> {
    let s = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ğ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ı' | 'ī' => "i",
        'ł' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ő' | 'ō' => "o",
        'œ' => "oe",
        'ř' => "r",
        'ś' | 'š' | 'ş' => "s",
        'ß' => "ss",
        'ť' | 'ţ' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ů' | 'ű' | 'ū' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        _ => return None,
    };
    Some(s)
}
