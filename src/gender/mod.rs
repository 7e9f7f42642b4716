//! Heuristic gender classification and the inclusive filter.
//!
//! Pure functions, no I/O. Classification tries, in order: gendered title
//! tokens in either string, name-table lookups on the display name, then
//! name-table lookups on the username. The filter is advisory, so an
//! `Unknown` classification is always retained.

mod names;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Classification outcome for one profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

/// Filter target. Only two values are accepted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetGender {
    Male,
    Female,
}

impl TargetGender {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            other => Err(Error::validation(format!(
                "invalid target gender '{other}', must be 'male' or 'female'"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    /// Inclusive retention rule: the target gender plus unknown.
    pub fn retains(self, gender: Gender) -> bool {
        match self {
            Self::Male => matches!(gender, Gender::Male | Gender::Unknown),
            Self::Female => matches!(gender, Gender::Female | Gender::Unknown),
        }
    }
}

const MALE_KEYWORDS: &[&str] = &["king", "prince", "sir", "mr", "lord", "duke"];
const FEMALE_KEYWORDS: &[&str] = &["queen", "princess", "lady", "mrs", "ms", "miss", "duchess"];

/// Generic words that show up in handles but are never given names.
const STOPLIST: &[&str] = &[
    "the", "and", "official", "real", "true", "page", "account", "profile", "fitness", "gym",
    "workout", "life", "love", "style", "blog", "shop",
];

static TITLE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(mrs?|ms|dr|prof|sir|lady|miss)\.?\s+").expect("title prefix regex")
});

static NAME_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]{2,20}").expect("name token regex"));

/// Check a string for gendered title tokens.
///
/// Tokenized comparison, not substring: "mrs_smith" must not trip the male
/// "mr" keyword, and "princess" must not trip "prince".
fn check_keywords(text: &str) -> Gender {
    for token in text
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|t| !t.is_empty())
    {
        let lower = token.to_ascii_lowercase();
        if MALE_KEYWORDS.contains(&lower.as_str()) {
            return Gender::Male;
        }
        if FEMALE_KEYWORDS.contains(&lower.as_str()) {
            return Gender::Female;
        }
    }
    Gender::Unknown
}

/// Extract candidate name tokens from a display name or username.
fn extract_names(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let cleaned = TITLE_PREFIX_RE.replace(text, "");

    NAME_TOKEN_RE
        .find_iter(&cleaned)
        .map(|m| m.as_str().to_string())
        .filter(|name| !STOPLIST.contains(&name.to_ascii_lowercase().as_str()))
        .collect()
}

/// Classify one profile from its username and display name.
pub fn classify(username: &str, display_name: &str) -> Gender {
    // Gendered titles are the strongest signal, in either field.
    for text in [display_name, username] {
        let keyword = check_keywords(text);
        if keyword != Gender::Unknown {
            return keyword;
        }
    }

    for text in [display_name, username] {
        for name in extract_names(text) {
            let gender = names::lookup(&name);
            if gender != Gender::Unknown {
                return gender;
            }
        }
    }

    Gender::Unknown
}

/// Retain the profiles matching the inclusive filter rule.
///
/// The predicate receives `(username, display_name)` per item so callers
/// can filter any profile-shaped collection.
pub fn filter_inclusive<T, F>(items: Vec<T>, target: TargetGender, fields: F) -> Vec<T>
where
    F: Fn(&T) -> (&str, &str),
{
    items
        .into_iter()
        .filter(|item| {
            let (username, display_name) = fields(item);
            target.retains(classify(username, display_name))
        })
        .collect()
}
