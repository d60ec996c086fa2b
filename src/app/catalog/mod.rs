//! Database file decoding
//!
//! The database bundle is a script made of `var NAME = { ... }` declarations.
//! [`CatalogDatabase`] locates the outermost balanced-brace body of every
//! declaration and parses it as generic JSON. Bodies that are not valid JSON
//! are skipped with a warning; only an unreadable file or a file with no
//! usable declaration at all is an error.
//!
//! The font list lives in one of those declarations and is expanded by
//! [`font::expand`] into full [`FontRecord`]s.

pub mod font;

pub use font::{expand, FontExpansion, FontRecord, FontState};

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};

use crate::constants::fonts;
use crate::errors::{CatalogError, CatalogResult};

const DECLARATION_PATTERN: &str = r"\b(?:var|let|const)\s+([A-Za-z_$][\w$]*)\s*=\s*\{";

/// Parsed declarations of one database file, keyed by variable name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogDatabase {
    variables: BTreeMap<String, Value>,
}

impl CatalogDatabase {
    /// Reads and decodes a database file
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or when not a single declaration
    /// could be parsed from it
    pub async fn load(path: &Path) -> CatalogResult<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CatalogError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;

        let database = Self::decode(&text);
        if database.is_empty() {
            return Err(CatalogError::Empty {
                path: path.to_path_buf(),
            });
        }

        info!(
            "Successfully parsed {} variables from {}.",
            database.len(),
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        );
        Ok(database)
    }

    /// Decodes every declaration in `text`, skipping the ones that fail
    pub fn decode(text: &str) -> Self {
        let mut variables = BTreeMap::new();

        for declaration in declarations(text) {
            match declaration {
                Ok((name, value)) => {
                    variables.insert(name, value);
                }
                Err(e) => {
                    if declaration_name(&e) == Some(fonts::CATALOG_VARIABLE) {
                        warn!(
                            "Unable to parse font list '{}', font phases will be skipped: {}",
                            fonts::CATALOG_VARIABLE,
                            e
                        );
                    } else {
                        warn!("Skipping declaration: {}", e);
                    }
                }
            }
        }

        Self { variables }
    }

    /// Value of one declared variable
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Names of every decoded variable
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Number of decoded variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether nothing was decoded
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// The compact font list, if the catalog variable decoded
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::MissingFontList` when the variable is absent or
    /// has no list field
    pub fn font_catalog(&self) -> CatalogResult<FontCatalog> {
        let list = self
            .get(fonts::CATALOG_VARIABLE)
            .and_then(|v| v.get(fonts::LIST_FIELD))
            .and_then(Value::as_array)
            .ok_or_else(|| CatalogError::MissingFontList {
                name: fonts::CATALOG_VARIABLE.to_string(),
            })?;

        let entries = list
            .iter()
            .map(|entry| match entry {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        Ok(FontCatalog { entries })
    }
}

fn declaration_name(error: &CatalogError) -> Option<&str> {
    match error {
        CatalogError::InvalidDeclaration { name, .. }
        | CatalogError::UnbalancedDeclaration { name } => Some(name),
        _ => None,
    }
}

/// Yields every declaration in document order as (name, parsed body)
fn declarations(text: &str) -> Vec<CatalogResult<(String, Value)>> {
    let regex = match Regex::new(DECLARATION_PATTERN) {
        Ok(regex) => regex,
        Err(e) => {
            warn!("Invalid declaration pattern: {}", e);
            return Vec::new();
        }
    };

    let mut found = Vec::new();
    let mut position = 0;

    while let Some(captures) = regex.captures_at(text, position) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            break;
        };
        let name = name.as_str().to_string();
        // The match ends just past the opening brace
        let open = whole.end() - 1;

        match balanced_end(text, open) {
            Some(close) => {
                let body = &text[open..=close];
                found.push(
                    serde_json::from_str(body)
                        .map(|value| (name.clone(), value))
                        .map_err(|source| CatalogError::InvalidDeclaration { name, source }),
                );
                position = close + 1;
            }
            None => {
                found.push(Err(CatalogError::UnbalancedDeclaration { name }));
                position = whole.end();
            }
        }
    }

    found
}

/// Byte index of the brace closing the one at `open`
///
/// Braces inside string literals are ignored. Returns `None` when the text
/// ends first.
fn balanced_end(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (offset, byte) in text.as_bytes()[open..].iter().copied().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == q {
                quote = None;
            }
            continue;
        }

        match byte {
            b'"' | b'\'' | b'`' => quote = Some(byte),
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }

    None
}

/// Ordered compact font entries taken from the database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontCatalog {
    entries: Vec<String>,
}

impl FontCatalog {
    /// Wraps already-extracted compact entries
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    /// Compact entries in catalog order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of compact entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lazily expands the entries; every call starts from the beginning
    pub fn records(&self) -> FontExpansion<std::slice::Iter<'_, String>> {
        expand(self.entries.iter())
    }

    /// Every record that decodes, warning about the entries that do not
    pub fn fonts(&self) -> Vec<FontRecord> {
        self.records()
            .filter_map(|record| match record {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping font entry: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::progress::capture_logs;
    use tempfile::tempdir;

    const DATABASE: &str = r#"var LANG = {
  "en": "English",
  "note": "braces } inside { strings"
};
var BROKEN = { unquoted: 1 };
var FNTS = {
  "list": [
    "Open Sans,Regular,,0,1,",
    ",Bold,,,,",
    "DejaVu Sans,,a,2,3,a"
  ]
}
var TAIL = {"x": {"y": [1, 2]}}
"#;

    #[test]
    fn test_decode_skips_invalid_declarations() {
        let db = CatalogDatabase::decode(DATABASE);

        let names: Vec<&str> = db.names().collect();
        assert_eq!(names, vec!["FNTS", "LANG", "TAIL"]);
        assert_eq!(
            db.get("LANG").and_then(|v| v.get("note")).and_then(Value::as_str),
            Some("braces } inside { strings")
        );
        assert_eq!(db.get("TAIL").unwrap()["x"]["y"][1], 2);
    }

    #[test]
    fn test_font_catalog_extraction() {
        let db = CatalogDatabase::decode(DATABASE);
        let catalog = db.font_catalog().unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.entries()[1], ",Bold,,,,");

        let fonts = catalog.fonts();
        assert_eq!(fonts[1].post_script_name, "OpenSans-Bold");
        assert_eq!(fonts[2].source_path, "gf/DejaVuSans.otf");
    }

    #[test]
    fn test_missing_font_list_is_reported() {
        let db = CatalogDatabase::decode(r#"var FNTS = { "list": [ oops ] }; var A = {"b":1}"#);

        assert_eq!(db.len(), 1);
        assert!(matches!(
            db.font_catalog(),
            Err(CatalogError::MissingFontList { .. })
        ));
    }

    #[test]
    fn test_invalid_declarations_are_warned_about() {
        let (db, logs) = capture_logs(|| {
            CatalogDatabase::decode(
                r#"var FNTS = { "list": [ oops ] }; var BAD = { nope }; var A = {"b":1}"#,
            )
        });

        assert_eq!(db.len(), 1);
        let warnings: Vec<&str> = logs.lines().filter(|l| l.contains("WARN")).collect();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("Unable to parse font list 'FNTS'"));
        assert!(warnings[1].contains("Skipping declaration"));
        assert!(warnings[1].contains("BAD"));
    }

    #[test]
    fn test_unbalanced_declaration_does_not_hide_later_ones() {
        let db = CatalogDatabase::decode("var A = { \"open\": 1\n");
        assert!(db.is_empty());

        let db = CatalogDatabase::decode("let A = {\"a\": \"\\\"}\"}; const B = {\"b\": 2}");
        assert_eq!(db.get("A").unwrap()["a"], "\"}");
        assert_eq!(db.get("B").unwrap()["b"], 2);
    }

    #[test]
    fn test_balanced_end_ignores_quoted_braces() {
        let text = r#"{"a": "}", "b": {'c': "{"}}"#;
        assert_eq!(balanced_end(text, 0), Some(text.len() - 1));
        assert_eq!(balanced_end("{ { }", 0), None);
    }

    #[tokio::test]
    async fn test_load_errors() {
        let temp_dir = tempdir().unwrap();

        let missing = temp_dir.path().join("DBS1.js");
        assert!(matches!(
            CatalogDatabase::load(&missing).await,
            Err(CatalogError::Unreadable { .. })
        ));

        let empty = temp_dir.path().join("DBS2.js");
        tokio::fs::write(&empty, "console.log(1);").await.unwrap();
        assert!(matches!(
            CatalogDatabase::load(&empty).await,
            Err(CatalogError::Empty { .. })
        ));

        let good = temp_dir.path().join("DBS3.js");
        tokio::fs::write(&good, DATABASE).await.unwrap();
        let db = CatalogDatabase::load(&good).await.unwrap();
        assert_eq!(db.len(), 3);
    }
}
