//! Spam signatures: ordered regex rules plus exact SHA-256 phrase hashes

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use sha2::{Digest, Sha256};

/// Which signature caught a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureKind {
    Url,
    Phishing,
    CryptoScam,
    KnownPhrase,
}

impl SignatureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureKind::Url => "url",
            SignatureKind::Phishing => "phishing",
            SignatureKind::CryptoScam => "crypto-scam",
            SignatureKind::KnownPhrase => "known-phrase",
        }
    }
}

impl fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static RULES: Lazy<Vec<(SignatureKind, Regex)>> = Lazy::new(|| {
    [
        (
            SignatureKind::Url,
            r"(?i)\b(?:https?://|www\.|bit\.ly|t\.co)\S+\b",
        ),
        (
            SignatureKind::Phishing,
            r"(?i)(?:banking|password|login|verify)\s+portal",
        ),
        (
            SignatureKind::CryptoScam,
            r"(?i)\b(?:bitcoin|eth|nft|airdrop)\s+(?:free|claim)\b",
        ),
    ]
    .into_iter()
    .map(|(kind, pattern)| {
        let regex = Regex::new(pattern).expect("built-in spam pattern compiles");
        (kind, regex)
    })
    .collect()
});

/// SHA-256 of "Free Bitcoin" and "Click here for discount"
const DEFAULT_HASHES: &[&str] = &[
    "410675e366b8afb18986802a3ed157d070e40a1a23889381430ed136a8ecea17",
    "48c9778652561aa5feac2fe818390b13cb124b103608b7a47e99ceda9bb2c487",
];

/// Lowercase hex SHA-256 of the text
pub fn fingerprint(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Compiled signature set
#[derive(Debug, Clone)]
pub struct SpamSignatures {
    hashes: HashSet<String>,
}

impl Default for SpamSignatures {
    fn default() -> Self {
        Self {
            hashes: DEFAULT_HASHES.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl SpamSignatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add exact phrases; they are stored only as hashes.
    pub fn with_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for phrase in phrases {
            self.hashes.insert(fingerprint(phrase.as_ref()));
        }
        self
    }

    pub fn hash_count(&self) -> usize {
        self.hashes.len()
    }

    /// First matching signature, rules in order, then the hash set.
    pub fn detect(&self, text: &str) -> Option<SignatureKind> {
        if let Some((kind, _)) = RULES.iter().find(|(_, rule)| rule.is_match(text)) {
            return Some(*kind);
        }
        if self.hashes.contains(&fingerprint(text)) {
            return Some(SignatureKind::KnownPhrase);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_catch_the_usual_suspects() {
        let sigs = SpamSignatures::new();
        assert_eq!(sigs.detect("see https://evil.example/x now"), Some(SignatureKind::Url));
        assert_eq!(sigs.detect("go to www.win.biz"), Some(SignatureKind::Url));
        assert_eq!(sigs.detect("please VERIFY   portal access"), Some(SignatureKind::Phishing));
        assert_eq!(sigs.detect("bitcoin free claim now"), Some(SignatureKind::CryptoScam));
        assert_eq!(sigs.detect("AIRDROP claim"), Some(SignatureKind::CryptoScam));
    }

    #[test]
    fn ordinary_chat_is_clean() {
        let sigs = SpamSignatures::new();
        for text in ["", "good morning", ".ping", "I lost my password again", "ethics class"] {
            assert_eq!(sigs.detect(text), None, "{text:?}");
        }
    }

    #[test]
    fn known_phrases_match_exactly() {
        let sigs = SpamSignatures::new().with_phrases(["join my channel"]);
        assert_eq!(sigs.detect("Free Bitcoin"), Some(SignatureKind::KnownPhrase));
        assert_eq!(sigs.detect("join my channel"), Some(SignatureKind::KnownPhrase));
        assert_eq!(sigs.detect("join my channel!"), None);
        assert_eq!(sigs.hash_count(), 3);
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        assert_eq!(fingerprint("Free Bitcoin"), DEFAULT_HASHES[0]);
        assert_eq!(fingerprint("").len(), 64);
    }
}
