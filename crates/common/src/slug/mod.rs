//! Slug derivation core
//!
//! Turns free text into URL-safe identifiers:
//! - ASCII transliteration first, with a Unicode-preserving fallback for
//!   text that transliterates to nothing
//! - Per-entity-kind length limits, fallback tokens, and charsets
//! - Deterministic collision handling with numeric suffixes
//!
//! Everything here is pure over the answers of the caller-supplied
//! scope predicate; no randomness, no timestamps.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Slug-bearing entity kinds
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Country,
    Tag,
    Post,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Country => "country",
            EntityKind::Tag => "tag",
            EntityKind::Post => "post",
        }
    }

    /// Slug derivation parameters for this kind
    pub fn rules(&self) -> SlugRules {
        match self {
            EntityKind::Country => COUNTRY_RULES,
            EntityKind::Tag => TAG_RULES,
            EntityKind::Post => POST_RULES,
        }
    }
}

/// Allowed character repertoire for a kind's slugs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Charset {
    /// Lowercase ASCII letters, digits, hyphen, underscore
    Ascii,
    /// Unicode letters and digits plus hyphen and underscore
    Unicode,
}

/// Per-kind slug derivation parameters
#[derive(Clone, Copy, Debug)]
pub struct SlugRules {
    /// Maximum slug length in characters (not bytes)
    pub max_len: usize,

    /// Token used when normalization produces nothing usable
    pub fallback: &'static str,

    /// Charset mode for normalization and validity checks
    pub charset: Charset,
}

pub const COUNTRY_RULES: SlugRules = SlugRules {
    max_len: 50,
    fallback: "country",
    charset: Charset::Ascii,
};

pub const TAG_RULES: SlugRules = SlugRules {
    max_len: 60,
    fallback: "tag",
    charset: Charset::Unicode,
};

pub const POST_RULES: SlugRules = SlugRules {
    max_len: 220,
    fallback: "post",
    charset: Charset::Ascii,
};

/// Normalize free text into a slug candidate under the given charset.
///
/// ASCII mode transliterates via the `slug` crate; when transliteration
/// yields nothing the Unicode-preserving mode is tried before giving up.
/// Returns an empty string when no character survives.
pub fn slugify_for(charset: Charset, text: &str) -> String {
    match charset {
        Charset::Ascii => {
            let s = slug::slugify(text);
            if s.is_empty() {
                unicode_slugify(text)
            } else {
                s
            }
        }
        Charset::Unicode => unicode_slugify(text),
    }
}

/// Unicode-preserving slugification: lowercase, keep letters/digits/
/// underscore, collapse whitespace and hyphen runs into single hyphens,
/// trim edge hyphens and underscores.
pub fn unicode_slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut prev_hyphen = false;

    for ch in lowered.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            out.push(ch);
            prev_hyphen = false;
        } else if ch.is_whitespace() || ch == '-' {
            if !out.is_empty() && !prev_hyphen {
                out.push('-');
                prev_hyphen = true;
            }
        }
        // anything else is dropped
    }

    out.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Charset validity rule for stored slugs, shared with the history sweep
pub fn is_valid_slug(charset: Charset, s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    match charset {
        Charset::Ascii => s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
        Charset::Unicode => s.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_'),
    }
}

/// Truncate to at most `max` characters without splitting a character
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Derive a unique slug for `base` under `rules`.
///
/// `taken` answers whether a candidate is already in use within the target
/// scope, excluding the entity being written. Collisions are resolved by
/// appending `-2`, `-3`, ... with the base truncated so the suffixed
/// candidate still fits `max_len`. Deterministic over the predicate's
/// answers; the predicate is the only await point.
pub async fn generate<F, Fut>(base: &str, rules: SlugRules, mut taken: F) -> Result<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let normalized = slugify_for(rules.charset, base);
    let stem = if normalized.is_empty() {
        rules.fallback.to_string()
    } else {
        normalized
    };
    let stem = truncate_chars(&stem, rules.max_len);

    if !taken(stem.clone()).await? {
        return Ok(stem);
    }

    let mut n: u64 = 2;
    loop {
        let suffix = format!("-{}", n);
        let cut = rules.max_len.saturating_sub(suffix.len());
        let mut candidate = truncate_chars(&stem, cut);
        candidate.push_str(&suffix);

        if !taken(candidate.clone()).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    async fn gen(base: &str, rules: SlugRules, taken: &[&str]) -> String {
        let set: HashSet<String> = taken.iter().map(|s| s.to_string()).collect();
        generate(base, rules, |candidate| {
            let hit = set.contains(&candidate);
            async move { Ok(hit) }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_basic_derivation() {
        assert_eq!(gen("Korea", COUNTRY_RULES, &[]).await, "korea");
        assert_eq!(gen("  Seoul Trip 2024  ", POST_RULES, &[]).await, "seoul-trip-2024");
    }

    #[tokio::test]
    async fn test_collision_suffixes_are_deterministic() {
        assert_eq!(gen("Korea", COUNTRY_RULES, &["korea"]).await, "korea-2");
        assert_eq!(
            gen("Korea", COUNTRY_RULES, &["korea", "korea-2"]).await,
            "korea-3"
        );
    }

    #[tokio::test]
    async fn test_fallback_tokens() {
        assert_eq!(gen("", POST_RULES, &[]).await, "post");
        assert_eq!(gen("???", COUNTRY_RULES, &[]).await, "country");
        assert_eq!(gen("!!!", TAG_RULES, &[]).await, "tag");
    }

    #[tokio::test]
    async fn test_suffix_fits_max_len() {
        let rules = SlugRules {
            max_len: 10,
            fallback: "post",
            charset: Charset::Ascii,
        };
        // Base fills the whole budget; the suffix must displace base chars.
        assert_eq!(gen("abcdefghij", rules, &[]).await, "abcdefghij");
        assert_eq!(gen("abcdefghij", rules, &["abcdefghij"]).await, "abcdefgh-2");
        assert_eq!(
            gen("abcdefghij", rules, &["abcdefghij", "abcdefgh-2"]).await,
            "abcdefgh-3"
        );
    }

    #[tokio::test]
    async fn test_unicode_tag_slugs_preserved() {
        assert_eq!(gen("서울 여행", TAG_RULES, &[]).await, "서울-여행");
    }

    #[test]
    fn test_unicode_slugify_rules() {
        assert_eq!(unicode_slugify("Hello,  World!"), "hello-world");
        assert_eq!(unicode_slugify("--한국- 여행--"), "한국-여행");
        assert_eq!(unicode_slugify("_under_"), "under");
        assert_eq!(unicode_slugify("***"), "");
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let rules = SlugRules {
            max_len: 3,
            fallback: "tag",
            charset: Charset::Unicode,
        };
        let out = slugify_for(rules.charset, "서울여행기");
        assert_eq!(truncate_chars(&out, rules.max_len), "서울여");
    }

    #[test]
    fn test_slug_validity() {
        assert!(is_valid_slug(Charset::Ascii, "seoul-trip_2024"));
        assert!(!is_valid_slug(Charset::Ascii, "서울"));
        assert!(!is_valid_slug(Charset::Ascii, "has space"));
        assert!(!is_valid_slug(Charset::Ascii, ""));
        assert!(is_valid_slug(Charset::Unicode, "서울-여행"));
        assert!(!is_valid_slug(Charset::Unicode, "a/b"));
    }
}
