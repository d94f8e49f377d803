//! Platform table: which searches to issue and which URL shapes to keep.
//!
//! Each [`PlatformSpec`] pairs a chat search query (the text the remote
//! search index is asked for) with a regular expression that recognizes the
//! share-sheet URL shape of that platform inside a message body.

use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::traits::ScanError;

/// Reference platforms as `(name, query, pattern)`.
const BUILTIN_PLATFORMS: &[(&str, &str, &str)] = &[
    (
        "instagram",
        "https://www.instagram.com/ igsh",
        r#"https?://(?:www\.)?instagram\.com/[^\s<>"]+"#,
    ),
    (
        "tiktok",
        "https://vm.tiktok.com",
        r#"https?://vm\.tiktok\.com/[^\s<>"]+"#,
    ),
    (
        "facebook",
        "?mibextid=",
        r#"https?://(?:www\.)?facebook\.com/[^\s<>"]*\?mibextid=[^\s<>"]+"#,
    ),
];

/// One tracked sharing destination.
#[derive(Debug, Clone)]
pub struct PlatformSpec {
    name: String,
    query: String,
    pattern: Regex,
}

impl PlatformSpec {
    /// Compiles `pattern` for the platform `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidPattern`] if the expression does not compile.
    pub fn new(
        name: impl Into<String>,
        query: impl Into<String>,
        pattern: &str,
    ) -> Result<Self, ScanError> {
        let name = name.into();
        let pattern = Regex::new(pattern).map_err(|source| ScanError::InvalidPattern {
            platform: name.clone(),
            source,
        })?;
        Ok(Self {
            name,
            query: query.into(),
            pattern,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Name as shown in reports: first letter upper-cased, rest lower-cased.
    pub fn display_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlatformDef {
    name: String,
    query: String,
    pattern: String,
}

/// Ordered set of platforms with unique names.
///
/// Iteration order is insertion order and drives both scan order and report
/// layout.
#[derive(Debug, Clone)]
pub struct PlatformTable {
    specs: Vec<PlatformSpec>,
}

impl PlatformTable {
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidConfig`] when two specs share a name.
    pub fn new(specs: Vec<PlatformSpec>) -> Result<Self, ScanError> {
        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name()) {
                return Err(ScanError::InvalidConfig(format!(
                    "duplicate platform '{}'",
                    spec.name()
                )));
            }
        }
        Ok(Self { specs })
    }

    /// Parses a JSON array of `{ "name", "query", "pattern" }` objects.
    pub fn from_json(json: &str) -> Result<Self, ScanError> {
        let defs: Vec<PlatformDef> = serde_json::from_str(json)?;
        let specs = defs
            .into_iter()
            .map(|def| PlatformSpec::new(def.name, def.query, &def.pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(specs)
    }

    pub async fn load(path: &Path) -> Result<Self, ScanError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    /// Instagram, TikTok and Facebook share-sheet links.
    pub fn builtin() -> Result<Self, ScanError> {
        let specs = BUILTIN_PLATFORMS
            .iter()
            .map(|(name, query, pattern)| PlatformSpec::new(*name, *query, pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(specs)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlatformSpec> {
        self.specs.iter()
    }

    pub fn get(&self, name: &str) -> Option<&PlatformSpec> {
        self.specs.iter().find(|spec| spec.name() == name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
