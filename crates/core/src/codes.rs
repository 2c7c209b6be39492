//! CID-10 and TUSS reference lists and the substring matcher behind autocomplete.
//!
//! Reference lists are loaded once and never mutated. Searching is a linear scan in list
//! order: the lists are small and static, and suggestions are shown in the order the list
//! defines rather than ranked.

use crate::constants::{MAX_SUGGESTIONS, MIN_QUERY_CHARS};
use crate::error::{LaudoError, LaudoResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// One entry of a reference list. Identity is the `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeEntry {
    pub code: String,
    pub description: String,
}

impl CodeEntry {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }

    /// The description without its leading `"<code> - "` part, for suggestion display.
    ///
    /// Descriptions in the shipped lists read `"A00.0 - Cólera ..."`; when there is no
    /// separator the whole description is returned.
    pub fn short_description(&self) -> &str {
        self.description
            .split_once(" - ")
            .map(|(_, rest)| rest)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.description)
    }

    fn matches(&self, needle: &str) -> bool {
        self.code.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

/// Which reference list a field searches, and how its selections are labelled in the letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeKind {
    /// Diagnosis codes.
    Cid,
    /// Procedure codes.
    Tuss,
}

impl CodeKind {
    /// Prefix used for each line of this kind in the letter.
    pub fn label(&self) -> &'static str {
        match self {
            CodeKind::Cid => "CID",
            CodeKind::Tuss => "TUSS",
        }
    }
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CodeKind::Cid => "cid",
            CodeKind::Tuss => "tuss",
        })
    }
}

impl FromStr for CodeKind {
    type Err = LaudoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cid" | "cid10" | "cid-10" => Ok(CodeKind::Cid),
            "tuss" => Ok(CodeKind::Tuss),
            other => Err(LaudoError::InvalidInput(format!(
                "unknown code list '{}' (expected 'cid' or 'tuss')",
                other
            ))),
        }
    }
}

/// An ordered, read-only reference list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeList {
    entries: Vec<CodeEntry>,
}

impl CodeList {
    pub fn new(entries: Vec<CodeEntry>) -> Self {
        Self { entries }
    }

    /// Parses a JSON array of `{ "code": ..., "description": ... }` objects.
    ///
    /// # Errors
    ///
    /// Returns [`LaudoError::CodeList`] naming the failing path (e.g. `[3].description`) when
    /// the document does not match.
    pub fn from_json_str(json: &str) -> LaudoResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json);
        let entries: Vec<CodeEntry> = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|err| {
                let path = err.path().to_string();
                let path = if path.is_empty() || path == "." {
                    "<root>".to_string()
                } else {
                    path
                };
                LaudoError::CodeList(format!("schema mismatch at {}: {}", path, err.into_inner()))
            })?;

        Ok(Self::new(entries))
    }

    /// Reads and parses a reference list file.
    ///
    /// # Errors
    ///
    /// Returns [`LaudoError::FileRead`] when the file cannot be read, or
    /// [`LaudoError::CodeList`] when it does not parse.
    pub fn load(path: &Path) -> LaudoResult<Self> {
        let text = std::fs::read_to_string(path).map_err(LaudoError::FileRead)?;
        let list = Self::from_json_str(&text)?;
        tracing::debug!("loaded {} codes from {}", list.len(), path.display());
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks an entry up by exact code.
    pub fn get(&self, code: &str) -> Option<&CodeEntry> {
        self.entries.iter().find(|e| e.code == code)
    }

    /// Returns at most 10 entries whose code or description contains `query`,
    /// case-insensitively, in list order.
    ///
    /// The query is trimmed first; fewer than 2 remaining characters yields nothing.
    pub fn search(&self, query: &str) -> Vec<&CodeEntry> {
        let needle = query.trim().to_lowercase();
        if needle.chars().count() < MIN_QUERY_CHARS {
            return Vec::new();
        }

        self.entries
            .iter()
            .filter(|entry| entry.matches(&needle))
            .take(MAX_SUGGESTIONS)
            .collect()
    }
}

impl From<Vec<CodeEntry>> for CodeList {
    fn from(entries: Vec<CodeEntry>) -> Self {
        Self::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CodeList {
        CodeList::new(vec![
            CodeEntry::new("A00.0", "A00.0 - Cólera devida a Vibrio cholerae 01, biovar cholerae"),
            CodeEntry::new("A00.1", "A00.1 - Cólera devida a Vibrio cholerae 01, biovar El Tor"),
            CodeEntry::new("J18.9", "J18.9 - Pneumonia não especificada"),
            CodeEntry::new("M17.1", "M17.1 - Outras gonartroses primárias"),
        ])
    }

    #[test]
    fn short_queries_return_nothing() {
        let list = sample();
        assert!(list.search("").is_empty());
        assert!(list.search("a").is_empty());
        assert!(list.search("  j  ").is_empty());
    }

    #[test]
    fn matches_code_case_insensitively() {
        let list = sample();
        let codes: Vec<&str> = list.search("a00").iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["A00.0", "A00.1"]);
    }

    #[test]
    fn matches_description_with_accents() {
        let list = sample();
        let found = list.search("CÓLERA");
        assert_eq!(found.len(), 2);
        let found = list.search("pneumonia");
        assert_eq!(found[0].code, "J18.9");
    }

    #[test]
    fn no_match_returns_empty() {
        assert!(sample().search("zzz").is_empty());
    }

    #[test]
    fn results_capped_at_ten_in_list_order() {
        let entries: Vec<CodeEntry> = (0..25)
            .map(|i| CodeEntry::new(format!("X{:02}", i), format!("Item {}", i)))
            .collect();
        let list = CodeList::new(entries);

        let found = list.search("item");
        assert_eq!(found.len(), 10);
        let codes: Vec<&str> = found.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes[0], "X00");
        assert_eq!(codes[9], "X09");
    }

    #[test]
    fn order_follows_list_not_relevance() {
        let list = CodeList::new(vec![
            CodeEntry::new("B1", "Rinite alérgica"),
            CodeEntry::new("RI", "Outro"),
        ]);
        let codes: Vec<&str> = list.search("ri").iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["B1", "RI"]);
    }

    #[test]
    fn search_does_not_mutate_list() {
        let list = sample();
        let before = list.clone();
        let _ = list.search("cólera");
        assert_eq!(list, before);
    }

    #[test]
    fn short_description_strips_code_prefix() {
        let entry = CodeEntry::new("J18.9", "J18.9 - Pneumonia não especificada");
        assert_eq!(entry.short_description(), "Pneumonia não especificada");

        let nested = CodeEntry::new("E11.9", "E11.9 - Diabetes mellitus - sem complicações");
        assert_eq!(nested.short_description(), "Diabetes mellitus - sem complicações");

        let bare = CodeEntry::new("10101012", "Consulta em consultório");
        assert_eq!(bare.short_description(), "Consulta em consultório");
    }

    #[test]
    fn from_json_reports_failing_path() {
        let json = r#"[{"code": "A00.0", "description": "ok"}, {"code": "A00.1"}]"#;
        let err = CodeList::from_json_str(json).expect_err("missing description");
        match err {
            LaudoError::CodeList(msg) => assert!(msg.contains("[1]"), "{msg}"),
            other => panic!("expected CodeList error, got {other:?}"),
        }
    }

    #[test]
    fn from_json_parses_entries() {
        let json = r#"[{"code": "10101012", "description": "Consulta em consultório"}]"#;
        let list = CodeList::from_json_str(json).expect("valid list");
        assert_eq!(list.len(), 1);
        assert_eq!(list.get("10101012").map(|e| e.description.as_str()), Some("Consulta em consultório"));
    }

    #[test]
    fn code_kind_parses_names() {
        assert_eq!("CID".parse::<CodeKind>().unwrap(), CodeKind::Cid);
        assert_eq!("tuss".parse::<CodeKind>().unwrap(), CodeKind::Tuss);
        assert!("icd".parse::<CodeKind>().is_err());
    }
}
