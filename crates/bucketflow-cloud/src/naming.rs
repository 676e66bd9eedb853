//! Logical name → provider-legal resource identifier
//!
//! Normalization is deterministic: the same logical name and rules always
//! produce the same [`CanonicalId`]. Providers that need globally unique names
//! get a suffix derived from a SHA-256 digest of the logical name, never from
//! time or randomness, so repeated runs target the same physical resource.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of hex digits appended for globally unique names
pub const UNIQUE_SUFFIX_LEN: usize = 8;

/// Character classes accepted by provider naming schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// `[a-z0-9]` (Azure storage accounts)
    LowerAlphanumeric,
    /// `[a-z0-9-]` (Azure blob containers)
    LowerAlphanumericHyphen,
    /// `[a-z0-9.-]` (S3 buckets)
    LowerAlphanumericHyphenDot,
    /// `[a-z0-9._-]` (GCS buckets)
    LowerAlphanumericHyphenDotUnderscore,
}

impl Charset {
    pub fn allows(&self, c: char) -> bool {
        c.is_ascii_lowercase() || c.is_ascii_digit() || self.is_separator(c)
    }

    pub fn is_separator(&self, c: char) -> bool {
        match self {
            Charset::LowerAlphanumeric => false,
            Charset::LowerAlphanumericHyphen => c == '-',
            Charset::LowerAlphanumericHyphenDot => c == '-' || c == '.',
            Charset::LowerAlphanumericHyphenDotUnderscore => c == '-' || c == '.' || c == '_',
        }
    }

    fn suffix_joiner(&self) -> Option<char> {
        match self {
            Charset::LowerAlphanumeric => None,
            _ => Some('-'),
        }
    }
}

/// Provider naming constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamingRules {
    pub min_length: usize,
    pub max_length: usize,
    pub charset: Charset,
    pub must_be_globally_unique: bool,
    pub requires_lowercase: bool,
}

impl NamingRules {
    pub const fn new(min_length: usize, max_length: usize, charset: Charset) -> Self {
        Self {
            min_length,
            max_length,
            charset,
            must_be_globally_unique: false,
            requires_lowercase: true,
        }
    }

    /// Same rules, with a content-derived uniqueness suffix.
    pub const fn globally_unique(mut self) -> Self {
        self.must_be_globally_unique = true;
        self
    }

    /// Same rules, without the uniqueness suffix.
    ///
    /// Used for names the caller chose explicitly.
    pub const fn without_unique_suffix(mut self) -> Self {
        self.must_be_globally_unique = false;
        self
    }
}

/// Provider-legal identifier derived from a logical name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for CanonicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map a logical name onto a provider-legal identifier.
///
/// Fails with [`CloudError::InvalidName`] when nothing legal is left after
/// stripping, or when the remainder is shorter than `min_length`.
pub fn normalize(logical_name: &str, rules: &NamingRules) -> Result<CanonicalId> {
    let cased = if rules.requires_lowercase {
        logical_name.to_lowercase()
    } else {
        logical_name.to_string()
    };

    let charset = rules.charset;
    let mut name = String::with_capacity(cased.len());
    for c in cased.chars().filter(|c| charset.allows(*c)) {
        // leading and doubled separators are dropped
        if charset.is_separator(c) && name.chars().last().is_none_or(|p| charset.is_separator(p))
        {
            continue;
        }
        name.push(c);
    }
    trim_trailing_separators(&mut name, charset);

    if name.is_empty() || name.len() < rules.min_length {
        return Err(CloudError::InvalidName(format!(
            "'{}' must contain at least {} valid character(s) ({:?})",
            logical_name,
            rules.min_length.max(1),
            charset
        )));
    }

    let suffix = rules
        .must_be_globally_unique
        .then(|| unique_suffix(logical_name));
    let reserved = suffix
        .as_ref()
        .map(|s| s.len() + usize::from(charset.suffix_joiner().is_some()))
        .unwrap_or(0);

    // the charset is ASCII-only, so byte length equals char count
    name.truncate(rules.max_length.saturating_sub(reserved));
    trim_trailing_separators(&mut name, charset);

    if let Some(suffix) = suffix {
        if let Some(joiner) = charset.suffix_joiner() {
            if !name.is_empty() {
                name.push(joiner);
            }
        }
        name.push_str(&suffix);
    }

    Ok(CanonicalId(name))
}

/// Stable hex suffix for a logical name
pub fn unique_suffix(logical_name: &str) -> String {
    let digest = Sha256::digest(logical_name.as_bytes());
    digest
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
        .chars()
        .take(UNIQUE_SUFFIX_LEN)
        .collect()
}

fn trim_trailing_separators(name: &mut String, charset: Charset) {
    while name.chars().last().is_some_and(|c| charset.is_separator(c)) {
        name.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUCKET: NamingRules = NamingRules::new(3, 63, Charset::LowerAlphanumericHyphenDot);
    const ACCOUNT: NamingRules =
        NamingRules::new(3, 24, Charset::LowerAlphanumeric).globally_unique();

    #[test]
    fn test_lowercases_and_strips() {
        let id = normalize("My_Data Set!", &BUCKET).unwrap();
        assert_eq!(id.as_str(), "mydataset");
    }

    #[test]
    fn test_collapses_and_trims_separators() {
        let id = normalize("--my--data..", &BUCKET).unwrap();
        assert_eq!(id.as_str(), "my-data");
    }

    #[test]
    fn test_deterministic() {
        let a = normalize("my-data", &ACCOUNT).unwrap();
        let b = normalize("my-data", &ACCOUNT).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unique_suffix_is_appended_within_limit() {
        let id = normalize("a-very-long-container-name-indeed", &ACCOUNT).unwrap();
        assert_eq!(id.as_str().len(), 24);
        assert!(id.as_str().starts_with("averylongcontai"));
        assert!(id.as_str().ends_with(&unique_suffix("a-very-long-container-name-indeed")));
    }

    #[test]
    fn test_suffix_distinguishes_names_with_same_prefix() {
        let a = normalize("my-data", &ACCOUNT).unwrap();
        let b = normalize("mydata", &ACCOUNT).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_truncates_to_max_length() {
        let long = "x".repeat(100);
        let id = normalize(&long, &BUCKET).unwrap();
        assert_eq!(id.as_str().len(), 63);
    }

    #[test]
    fn test_joiner_used_for_hyphenated_charsets() {
        let rules = BUCKET.globally_unique();
        let id = normalize("logs", &rules).unwrap();
        assert_eq!(id.as_str(), format!("logs-{}", unique_suffix("logs")));
    }

    #[test]
    fn test_empty_after_stripping_is_invalid() {
        let err = normalize("!!!", &BUCKET).unwrap_err();
        assert!(matches!(err, CloudError::InvalidName(_)));
    }

    #[test]
    fn test_below_min_length_is_invalid() {
        let err = normalize("a-", &BUCKET).unwrap_err();
        assert!(matches!(err, CloudError::InvalidName(_)));
    }

    #[test]
    fn test_suffix_is_hex() {
        let suffix = unique_suffix("my-data");
        assert_eq!(suffix.len(), UNIQUE_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
