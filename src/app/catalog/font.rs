//! Compact font entry expansion
//!
//! Each compact entry is six comma-separated fields:
//! `family,subfamily,postScriptName,flags,category,sourcePath`. Empty family,
//! subfamily, flags and category fields inherit the previous record's value.
//! The post script name and source path are derived when empty or set to the
//! sentinel `a`.
//!
//! Expansion is a fold over [`FontState`]: [`FontState::step`] is pure, and
//! [`FontExpansion`] only threads the state through the entries.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::fonts;
use crate::errors::{CatalogError, CatalogResult};

/// One fully resolved font
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontRecord {
    #[serde(rename = "ff")]
    pub family: String,
    #[serde(rename = "fsf")]
    pub subfamily: String,
    #[serde(rename = "psn")]
    pub post_script_name: String,
    #[serde(rename = "flg")]
    pub flags: i64,
    #[serde(rename = "cat")]
    pub category: i64,
    /// Path relative to the font directory
    #[serde(rename = "url")]
    pub source_path: String,
}

impl FontRecord {
    /// Whether this is one of the default family's faces
    ///
    /// Matches the family itself and its `-Style` faces, not sibling
    /// families sharing the prefix.
    pub fn is_default_face(&self) -> bool {
        let psn = self.post_script_name.as_str();
        psn == fonts::DEFAULT_FAMILY
            || psn
                .strip_prefix(fonts::DEFAULT_FAMILY)
                .is_some_and(|rest| rest.starts_with('-'))
    }

    /// Path of the font file relative to the mirror root
    pub fn relative_path(&self) -> String {
        format!("{}{}", fonts::FONT_DIR, self.source_path)
    }
}

/// Values carried from one record to the next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontState {
    family: String,
    subfamily: String,
    flags: String,
    category: String,
}

impl Default for FontState {
    fn default() -> Self {
        Self {
            family: String::new(),
            subfamily: String::new(),
            flags: "0".to_string(),
            category: "0".to_string(),
        }
    }
}

impl FontState {
    /// Decodes entry number `index` against this state
    ///
    /// Returns the record and the state for the next entry. A malformed entry
    /// is an error and the caller keeps the current state.
    pub fn step(&self, index: usize, entry: &str) -> CatalogResult<(FontState, FontRecord)> {
        let fields: Vec<&str> = entry.split(',').collect();
        let [family, subfamily, psn, flags, category, url] = fields[..] else {
            return Err(CatalogError::MalformedEntry {
                index,
                fields: fields.len(),
                entry: entry.to_string(),
            });
        };

        let next = FontState {
            family: inherit(family, &self.family),
            subfamily: inherit(subfamily, &self.subfamily),
            flags: inherit(flags, &self.flags),
            category: inherit(category, &self.category),
        };

        let post_script_name = match psn {
            "" => format!("{}-{}", next.family, next.subfamily).replace(' ', ""),
            fonts::SENTINEL => next.family.replace(' ', ""),
            given => given.to_string(),
        };
        if next.family.is_empty() && (psn.is_empty() || psn == fonts::SENTINEL) {
            warn!(
                "Font entry #{} derives its name without a family: {}",
                index, entry
            );
        }

        let source_path = match url {
            "" => format!(
                "{}{}{}",
                fonts::LOCAL_FONT_PREFIX,
                post_script_name,
                fonts::FONT_EXTENSION
            ),
            fonts::SENTINEL => format!(
                "{}{}{}",
                fonts::WEB_FONT_PREFIX,
                post_script_name,
                fonts::FONT_EXTENSION
            ),
            given => given.to_string(),
        };

        let record = FontRecord {
            family: next.family.clone(),
            subfamily: next.subfamily.clone(),
            post_script_name,
            flags: parse_number(index, "flags", &next.flags)?,
            category: parse_number(index, "category", &next.category)?,
            source_path,
        };

        Ok((next, record))
    }
}

fn inherit(field: &str, previous: &str) -> String {
    if field.is_empty() {
        previous.to_string()
    } else {
        field.to_string()
    }
}

fn parse_number(index: usize, field: &'static str, value: &str) -> CatalogResult<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| CatalogError::InvalidNumber {
            index,
            field,
            value: value.to_string(),
        })
}

/// Lazy expansion of compact entries, in input order
#[derive(Debug, Clone)]
pub struct FontExpansion<I> {
    entries: I,
    state: FontState,
    index: usize,
}

impl<'a, I, S> Iterator for FontExpansion<I>
where
    I: Iterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    type Item = CatalogResult<FontRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.next()?;
        let index = self.index;
        self.index += 1;

        match self.state.step(index, entry.as_ref()) {
            Ok((next, record)) => {
                self.state = next;
                Some(Ok(record))
            }
            Err(e) => Some(Err(e)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

/// Expands compact entries starting from the default state
pub fn expand<'a, I, S>(entries: I) -> FontExpansion<I::IntoIter>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    FontExpansion {
        entries: entries.into_iter(),
        state: FontState::default(),
        index: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(entries: &[&str]) -> Vec<FontRecord> {
        expand(entries.iter().copied())
            .collect::<CatalogResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_empty_fields_inherit_previous_record() {
        let fonts = decode(&["Open Sans,Regular,,4,2,", ",,,,,", ",Bold,,,7,"]);

        assert_eq!(fonts[1].family, fonts[0].family);
        assert_eq!(fonts[1].subfamily, "Regular");
        assert_eq!(fonts[1].flags, 4);
        assert_eq!(fonts[2].family, "Open Sans");
        assert_eq!(fonts[2].subfamily, "Bold");
        assert_eq!(fonts[2].flags, 4);
        assert_eq!(fonts[2].category, 7);
    }

    #[test]
    fn test_post_script_name_derivation() {
        let fonts = decode(&["Open Sans,Bold,,0,0,", "Open Sans,Bold,a,0,0,", ",,Custom-Name,,,"]);

        assert_eq!(fonts[0].post_script_name, "OpenSans-Bold");
        assert_eq!(fonts[1].post_script_name, "OpenSans");
        assert_eq!(fonts[2].post_script_name, "Custom-Name");
    }

    #[test]
    fn test_source_path_derivation() {
        let fonts = decode(&[
            "Open Sans,Bold,,0,0,",
            "Open Sans,Bold,,0,0,a",
            "Open Sans,Bold,,0,0,other/OpenSans.ttf",
        ]);

        assert_eq!(fonts[0].source_path, "fs/OpenSans-Bold.otf");
        assert_eq!(fonts[1].source_path, "gf/OpenSans-Bold.otf");
        assert_eq!(fonts[2].source_path, "other/OpenSans.ttf");
        assert_eq!(fonts[0].relative_path(), "rsrc/fonts/fs/OpenSans-Bold.otf");
    }

    #[test]
    fn test_initial_state_defaults() {
        let fonts = decode(&[",,x,,,"]);

        assert_eq!(fonts[0].family, "");
        assert_eq!(fonts[0].flags, 0);
        assert_eq!(fonts[0].category, 0);
    }

    #[test]
    fn test_malformed_entry_does_not_advance_state() {
        let entries = ["Roboto,Light,,1,1,", "broken,entry", ",Bold,,,,"];
        let results: Vec<_> = expand(entries.iter().copied()).collect();

        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(CatalogError::MalformedEntry {
                index: 1,
                fields: 2,
                ..
            })
        ));
        let third = results[2].as_ref().unwrap();
        assert_eq!(third.family, "Roboto");
        assert_eq!(third.post_script_name, "Roboto-Bold");
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let entries = ["Roboto,Light,,x,1,"];
        let result = expand(entries.iter().copied()).next().unwrap();

        assert!(matches!(
            result,
            Err(CatalogError::InvalidNumber { field: "flags", .. })
        ));
    }

    #[test]
    fn test_expansion_is_restartable() {
        let entries: Vec<String> = vec![
            "A Font,Regular,,1,2,".to_string(),
            ",Italic,,,,a".to_string(),
        ];

        let first: Vec<_> = expand(entries.iter()).collect::<Result<_, _>>().unwrap();
        let second: Vec<_> = expand(entries.iter()).collect::<Result<_, _>>().unwrap();
        assert_eq!(first, second);
        assert_eq!(first[1].source_path, "gf/AFont-Italic.otf");
    }

    #[test]
    fn test_step_is_pure() {
        let state = FontState::default();
        let (next, record) = state.step(0, "Lato,Black,,3,4,").unwrap();

        assert_eq!(state, FontState::default());
        assert_eq!(record.post_script_name, "Lato-Black");
        let (_, again) = next.step(1, ",,,,,").unwrap();
        assert_eq!(again.post_script_name, "Lato-Black");
    }

    #[test]
    fn test_default_face_selection() {
        let fonts = decode(&[
            "DejaVu Sans,Book,DejaVuSans,0,0,",
            ",Bold,DejaVuSans-Bold,,,",
            "DejaVu Sans Condensed,Book,DejaVuSansCondensed,,,",
            "DejaVu Sans Condensed,Bold,DejaVuSansCondensed-Bold,,,",
        ]);
        let defaults: Vec<&str> = fonts
            .iter()
            .filter(|f| f.is_default_face())
            .map(|f| f.post_script_name.as_str())
            .collect();

        assert_eq!(defaults, vec!["DejaVuSans", "DejaVuSans-Bold"]);
    }

    #[test]
    fn test_manifest_field_names() {
        let fonts = decode(&["Lato,Black,,3,4,"]);
        let json = serde_json::to_value(&fonts[0]).unwrap();

        assert_eq!(json["ff"], "Lato");
        assert_eq!(json["fsf"], "Black");
        assert_eq!(json["psn"], "Lato-Black");
        assert_eq!(json["flg"], 3);
        assert_eq!(json["cat"], 4);
        assert_eq!(json["url"], "fs/Lato-Black.otf");
    }
}
