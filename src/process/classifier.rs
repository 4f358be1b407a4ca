//! Region classification for grouping memory mappings into categories.
//!
//! A mapping is classified by its display name (the trailing field of an
//! smaps header) and its inode. The result is a category key of the form
//! `"<page class>#<label>"`, e.g. `"File-backed Page#.so"`.
//!
//! Suffix rules are evaluated before prefix rules, and within each table the
//! first matching rule wins. Tables can be replaced from a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{DumpError, Result};

/// Page class for mappings backed by a file (inode > 0).
pub const FILE_PAGE_TAG: &str = "File-backed Page";
/// Page class for anonymous mappings (inode == 0).
pub const ANON_PAGE_TAG: &str = "Anonymous Page";
/// Label used when no rule matches.
pub const OTHER_LABEL: &str = "other";
/// Separator between page class and label in a category key.
pub const CATEGORY_SEPARATOR: char = '#';

const BUILTIN_SUFFIX_RULES: &[(&str, &str)] = &[
    (".so", ".so"),
    (".so.1", ".so"),
    (".apk", ".apk"),
    (".hap", ".hap"),
    (".abc", ".abc"),
    (".dex", ".dex"),
    (".jar", ".jar"),
    (".ttf", ".ttf"),
    (".otf", ".ttf"),
    (".db", ".db"),
    (".db-shm", ".db"),
    (".db-wal", ".db"),
];

const BUILTIN_PREFIX_RULES: &[(&str, &str)] = &[
    ("[heap]", "native heap"),
    ("[anon:native_heap:", "native heap"),
    ("[anon:libc_malloc", "native heap"),
    ("[stack]", "stack"),
    ("[anon:stack", "stack"),
    ("[anon:signal_stack", "stack"),
    ("[anon:ArkJS Heap]", "ark js heap"),
    ("[anon:guard", "guard"),
    ("/dev", "dev"),
    ("/dmabuf", "dmabuf"),
    ("/data/storage", ".hap"),
];

/// A single `pattern -> label` rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRule {
    pub pattern: String,
    pub label: String,
}

impl RegionRule {
    fn from_pair((pattern, label): &(&str, &str)) -> Self {
        Self {
            pattern: (*pattern).to_string(),
            label: (*label).to_string(),
        }
    }
}

/// Root structure of a rules override file.
#[derive(Deserialize)]
struct RulesFile {
    suffix: Option<Vec<RegionRule>>,
    prefix: Option<Vec<RegionRule>>,
}

/// Immutable classification tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionClassifier {
    suffix_rules: Vec<RegionRule>,
    prefix_rules: Vec<RegionRule>,
}

impl Default for RegionClassifier {
    fn default() -> Self {
        Self {
            suffix_rules: BUILTIN_SUFFIX_RULES.iter().map(RegionRule::from_pair).collect(),
            prefix_rules: BUILTIN_PREFIX_RULES.iter().map(RegionRule::from_pair).collect(),
        }
    }
}

impl RegionClassifier {
    /// Builds a classifier from TOML. Tables absent from the file keep
    /// their built-in contents.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let parsed: RulesFile =
            toml::from_str(content).map_err(|e| DumpError::Rules(e.to_string()))?;
        let mut classifier = Self::default();
        if let Some(suffix) = parsed.suffix {
            classifier.suffix_rules = suffix;
        }
        if let Some(prefix) = parsed.prefix {
            classifier.prefix_rules = prefix;
        }
        for rule in classifier.rules() {
            if rule.pattern.is_empty() || rule.label.is_empty() {
                return Err(DumpError::Rules(
                    "rules need a non-empty pattern and label".to_string(),
                ));
            }
        }
        Ok(classifier)
    }

    /// Loads rule overrides from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| DumpError::source_unavailable(path, e))?;
        let classifier = Self::from_toml_str(&content)?;
        info!("Loaded region rules from {}", path.display());
        Ok(classifier)
    }

    pub fn suffix_rules(&self) -> &[RegionRule] {
        &self.suffix_rules
    }

    pub fn prefix_rules(&self) -> &[RegionRule] {
        &self.prefix_rules
    }

    fn rules(&self) -> impl Iterator<Item = &RegionRule> {
        self.suffix_rules.iter().chain(self.prefix_rules.iter())
    }

    /// Returns the label for `name` without the page class.
    pub fn label_for(&self, name: &str) -> &str {
        if let Some(rule) = self.suffix_rules.iter().find(|r| name.ends_with(&r.pattern)) {
            return &rule.label;
        }
        if let Some(rule) = self.prefix_rules.iter().find(|r| name.starts_with(&r.pattern)) {
            return &rule.label;
        }
        OTHER_LABEL
    }

    /// Classifies a mapping into its category key.
    pub fn classify(&self, name: &str, inode: u64) -> String {
        format!(
            "{}{}{}",
            page_tag(inode),
            CATEGORY_SEPARATOR,
            self.label_for(name)
        )
    }
}

/// Page class for a mapping with the given inode.
pub fn page_tag(inode: u64) -> &'static str {
    if inode > 0 {
        FILE_PAGE_TAG
    } else {
        ANON_PAGE_TAG
    }
}

/// Splits a category key into `(page class, label)`.
pub fn split_category(key: &str) -> (&str, &str) {
    key.split_once(CATEGORY_SEPARATOR).unwrap_or((key, ""))
}
