// src/lexer/fold.rs
use serde::{Deserialize, Serialize};

/// Case mapping applied by `lower()`/`upper()` token extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseFold {
    #[default]
    Ascii,
    /// ISO 8859-1: also folds the accented letters in `0xC0..=0xFE`.
    Latin1,
}

impl CaseFold {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ascii" => Some(CaseFold::Ascii),
            "latin1" | "latin-1" | "iso-8859-1" => Some(CaseFold::Latin1),
            _ => None,
        }
    }

    #[inline]
    pub fn lower(self, b: u8) -> u8 {
        match self {
            CaseFold::Latin1 if matches!(b, 0xC0..=0xDE) && b != 0xD7 => b + 0x20,
            _ => b.to_ascii_lowercase(),
        }
    }

    #[inline]
    pub fn upper(self, b: u8) -> u8 {
        match self {
            CaseFold::Latin1 if matches!(b, 0xE0..=0xFE) && b != 0xF7 => b - 0x20,
            _ => b.to_ascii_uppercase(),
        }
    }

    pub fn to_lower(self, bytes: &[u8]) -> Vec<u8> {
        bytes.iter().map(|&b| self.lower(b)).collect()
    }

    pub fn to_upper(self, bytes: &[u8]) -> Vec<u8> {
        bytes.iter().map(|&b| self.upper(b)).collect()
    }
}
