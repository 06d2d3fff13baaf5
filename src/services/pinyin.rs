//! Pinyin lookup for single characters.
//!
//! A hand-maintained override table wins over generated data; generated
//! readings are filtered through a strict syllable grammar and only the
//! primary one is kept.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pinyin::ToPinyinMulti;

/// Vowels with tone marks, plus `ü`, accepted in addition to ASCII letters.
const TONE_LETTERS: &[char] = &[
    'ü', 'ǖ', 'ǘ', 'ǚ', 'ǜ', 'ā', 'á', 'ǎ', 'à', 'ē', 'é', 'ě', 'è', 'ī', 'í', 'ǐ', 'ì', 'ō', 'ó',
    'ǒ', 'ò', 'ū', 'ú', 'ǔ', 'ù',
];

/// Source of generated readings, in tone-mark notation, most common first.
pub trait PinyinBackend: Send + Sync {
    fn romanize(&self, glyph: char) -> Vec<String>;
}

/// Readings from the `pinyin` crate's bundled dictionary.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeneratedPinyin;

impl PinyinBackend for GeneratedPinyin {
    fn romanize(&self, glyph: char) -> Vec<String> {
        match glyph.to_pinyin_multi() {
            Some(multi) => multi
                .into_iter()
                .map(|reading| reading.with_tone().to_string())
                .collect(),
            // Unknown glyphs come back as themselves and are dropped by the filter.
            None => vec![glyph.to_string()],
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct PinyinOverrides {
    entries: HashMap<String, Vec<String>>,
}

impl PinyinOverrides {
    pub fn from_map(entries: HashMap<String, Vec<String>>) -> Self {
        Self { entries }
    }

    /// Reads a JSON object mapping glyph to readings. A missing or malformed
    /// file yields an empty table.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "pinyin overrides not loaded");
                return Self::default();
            }
        };

        match serde_json::from_str::<HashMap<String, Vec<String>>>(&content) {
            Ok(entries) => {
                tracing::info!(path = %path.display(), count = entries.len(), "pinyin overrides loaded");
                Self { entries }
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "pinyin overrides malformed");
                Self::default()
            }
        }
    }

    pub fn get(&self, glyph: &str) -> Option<&[String]> {
        self.entries.get(glyph).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct PinyinResolver {
    overrides_path: Option<PathBuf>,
    overrides: OnceLock<PinyinOverrides>,
    backend: Box<dyn PinyinBackend>,
}

impl PinyinResolver {
    /// Overrides are read from `overrides_path` on first use.
    pub fn new(overrides_path: impl Into<PathBuf>) -> Self {
        Self {
            overrides_path: Some(overrides_path.into()),
            overrides: OnceLock::new(),
            backend: Box::new(GeneratedPinyin),
        }
    }

    pub fn with_overrides(overrides: PinyinOverrides) -> Self {
        Self {
            overrides_path: None,
            overrides: OnceLock::from(overrides),
            backend: Box::new(GeneratedPinyin),
        }
    }

    pub fn with_backend(mut self, backend: impl PinyinBackend + 'static) -> Self {
        self.backend = Box::new(backend);
        self
    }

    pub fn overrides(&self) -> &PinyinOverrides {
        self.overrides.get_or_init(|| match &self.overrides_path {
            Some(path) => PinyinOverrides::load(path),
            None => PinyinOverrides::default(),
        })
    }

    /// Readings for one character. Never fails: anything that is not exactly
    /// one code point, or has no valid reading, yields an empty list.
    pub fn resolve(&self, input: &str) -> Vec<String> {
        let Some(glyph) = single_code_point(input.trim()) else {
            return Vec::new();
        };

        if let Some(custom) = self.overrides().get(input.trim()) {
            return custom.to_vec();
        }

        // Polyphonic characters outside the override table keep only their
        // primary reading.
        self.backend
            .romanize(glyph)
            .into_iter()
            .find(|candidate| is_valid_syllable(candidate))
            .map(|reading| vec![reading])
            .unwrap_or_default()
    }
}

impl Default for PinyinResolver {
    fn default() -> Self {
        Self::with_overrides(PinyinOverrides::default())
    }
}

pub fn single_code_point(input: &str) -> Option<char> {
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

pub fn is_valid_syllable(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.chars().all(|c| {
            c.is_ascii_alphabetic() || c.to_lowercase().all(|lower| TONE_LETTERS.contains(&lower))
        })
}
