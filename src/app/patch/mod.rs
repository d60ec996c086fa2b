//! Idempotent find/replace patches over mirrored files
//!
//! Patches are declarative [`PatchRule`]s applied by one routine,
//! [`apply_all`]. Every rule fails soft: a missing or unreadable target is
//! logged and skipped, and a target without the find text is left untouched.
//!
//! Re-running the full rule set over an already patched tree changes nothing.
//! For rules whose replacement contains the find text (`x` -> `x||true`), an
//! occurrence of the find text that already sits inside a replacement counts
//! as applied.

pub mod rules;

pub use rules::RULES;

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::app::client::download::temp_path_for;
use crate::app::resolver::{DynamicAsset, DynamicPathSet};
use crate::constants::origin;
use crate::errors::{PatchError, PatchResult};

/// File a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchTarget {
    /// The bootstrap document
    Bootstrap,
    /// A version-stamped bundle discovered at resolve time
    Dynamic(DynamicAsset),
    /// A fixed path relative to the mirror root
    File(&'static str),
}

impl PatchTarget {
    /// Absolute path of the target for this session
    pub fn resolve(self, local_root: &Path, paths: &DynamicPathSet) -> PatchResult<PathBuf> {
        match self {
            PatchTarget::Bootstrap => Ok(local_root.join(origin::BOOTSTRAP_DOCUMENT)),
            PatchTarget::Dynamic(asset) => paths
                .get(asset)
                .map(|path| local_root.join(path))
                .ok_or_else(|| PatchError::UnresolvedTarget {
                    target: asset.name().to_string(),
                }),
            PatchTarget::File(path) => Ok(local_root.join(path)),
        }
    }
}

impl fmt::Display for PatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchTarget::Bootstrap => f.write_str(origin::BOOTSTRAP_DOCUMENT),
            PatchTarget::Dynamic(asset) => write!(f, "{}", asset),
            PatchTarget::File(path) => f.write_str(path),
        }
    }
}

/// One exact-substring replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchRule {
    /// What the rule is for
    pub description: &'static str,
    /// File the rule edits
    pub target: PatchTarget,
    /// Exact text to find
    pub find: &'static str,
    /// Replacement text
    pub replace: &'static str,
}

/// Result of applying one rule
#[derive(Debug)]
pub enum PatchOutcome {
    /// The file was rewritten with `count` replacements
    Applied { count: usize },
    /// Nothing left to replace
    AlreadyApplied,
    /// The rule could not run
    Skipped(PatchError),
}

/// Outcomes of a full rule set, in rule order
#[derive(Debug, Default)]
pub struct PatchReport {
    pub outcomes: Vec<(PatchRule, PatchOutcome)>,
}

impl PatchReport {
    /// Number of rules that changed a file
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, PatchOutcome::Applied { .. }))
    }

    /// Number of rules with nothing to do
    pub fn already_applied(&self) -> usize {
        self.count(|o| matches!(o, PatchOutcome::AlreadyApplied))
    }

    /// Number of rules that could not run
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, PatchOutcome::Skipped(_)))
    }

    fn count(&self, predicate: impl Fn(&PatchOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| predicate(o)).count()
    }
}

/// Replaces every unpatched occurrence of `find` in `content`
///
/// Returns the new content and the number of replacements, or `None` when
/// there is nothing to replace.
pub fn patch_text(content: &str, find: &str, replace: &str) -> Option<(String, usize)> {
    if find.is_empty() {
        return None;
    }

    // Offsets of `find` inside `replace`, when the replacement keeps it
    let anchors: Vec<usize> = replace.match_indices(find).map(|(i, _)| i).collect();
    let mut patched = String::with_capacity(content.len());
    let mut last = 0;
    let mut count = 0;

    for (position, _) in content.match_indices(find) {
        let already = anchors.iter().any(|&offset| {
            position >= offset
                && content
                    .get(position - offset..)
                    .is_some_and(|rest| rest.starts_with(replace))
        });
        if already {
            continue;
        }

        patched.push_str(&content[last..position]);
        patched.push_str(replace);
        last = position + find.len();
        count += 1;
    }

    if count == 0 {
        return None;
    }
    patched.push_str(&content[last..]);
    Some((patched, count))
}

/// Applies one rule to its file
pub async fn apply(rule: &PatchRule, local_root: &Path, paths: &DynamicPathSet) -> PatchOutcome {
    match try_apply(rule, local_root, paths).await {
        Ok(Some(count)) => PatchOutcome::Applied { count },
        Ok(None) => PatchOutcome::AlreadyApplied,
        Err(e) => PatchOutcome::Skipped(e),
    }
}

async fn try_apply(
    rule: &PatchRule,
    local_root: &Path,
    paths: &DynamicPathSet,
) -> PatchResult<Option<usize>> {
    let path = rule.target.resolve(local_root, paths)?;
    let io_error = |source: std::io::Error| PatchError::Io {
        path: path.clone(),
        source,
    };

    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| match source.kind() {
            ErrorKind::NotFound => PatchError::TargetMissing { path: path.clone() },
            _ => io_error(source),
        })?;

    let Some((patched, count)) = patch_text(&content, rule.find, rule.replace) else {
        return Ok(None);
    };

    let temp_path = temp_path_for(&path);
    tokio::fs::write(&temp_path, patched)
        .await
        .map_err(io_error)?;
    if let Err(source) = tokio::fs::rename(&temp_path, &path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(io_error(source));
    }

    Ok(Some(count))
}

/// Applies `rules` in order; a failing rule never stops the others
pub async fn apply_all(
    rules: &[PatchRule],
    local_root: &Path,
    paths: &DynamicPathSet,
) -> PatchReport {
    info!(
        "Applying patches to {}, {}, and others...",
        paths.app_logic(),
        origin::BOOTSTRAP_DOCUMENT
    );

    let mut report = PatchReport::default();
    for rule in rules {
        let outcome = apply(rule, local_root, paths).await;
        match &outcome {
            PatchOutcome::Applied { count } => {
                info!("Patched {} ({} in {})", rule.description, count, rule.target)
            }
            PatchOutcome::AlreadyApplied => {
                debug!("{}: nothing to do in {}", rule.description, rule.target)
            }
            PatchOutcome::Skipped(e) => warn!("Skipped {}: {}", rule.description, e),
        }
        report.outcomes.push((*rule, outcome));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::{tempdir, TempDir};
    use tokio::fs;

    const APP_LOGIC: &str = r#"if(h.indexOf("'$!|"))x();var u="mirror.php?url="+encodeURIComponent(s);
open("templates/?type="+t+"&rsrc=");load("https://f000.backblazeb2.com/file/"+f);
if(ft("~yy"))bg();if(ft("~yy"))rm();"#;
    const BOOTSTRAP: &str = r#"<script src="//www.google-analytics.com/analytics.js"></script>
<link href="//www.googletagmanager.com/gtm.js">
<img src="https://www.facebook.com/tr?id=1"><script src="https://connect.facebook.net/sdk.js">"#;
    const DROPBOX: &str = "<script>var redirectUri = window.location.href;</script>";

    fn paths() -> DynamicPathSet {
        DynamicPathSet::new(BTreeMap::from([
            (DynamicAsset::Database, "code/dbs/DBS7.js".to_string()),
            (DynamicAsset::AppLogic, "code/pp/pp7.js".to_string()),
        ]))
        .unwrap()
    }

    async fn mirror_tree() -> TempDir {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("code/pp")).await.unwrap();
        fs::create_dir_all(root.join("code/storages")).await.unwrap();
        fs::write(root.join("code/pp/pp7.js"), APP_LOGIC).await.unwrap();
        fs::write(root.join("index.html"), BOOTSTRAP).await.unwrap();
        fs::write(root.join("code/storages/dropboxStorage.html"), DROPBOX)
            .await
            .unwrap();
        temp_dir
    }

    async fn digest(path: &Path) -> md5::Digest {
        md5::compute(fs::read(path).await.unwrap())
    }

    #[test]
    fn test_patch_text_replaces_every_occurrence() {
        let (patched, count) = patch_text("a.b.a", "a", "c").unwrap();
        assert_eq!(patched, "c.b.c");
        assert_eq!(count, 2);
    }

    #[test]
    fn test_patch_text_absent_find_is_none() {
        assert!(patch_text("nothing here", "missing", "x").is_none());
        assert!(patch_text("anything", "", "x").is_none());
    }

    #[test]
    fn test_self_containing_replacement_is_idempotent() {
        let once = patch_text(r#"f("~yy");g("~yy")||true"#, r#"("~yy")"#, r#"("~yy")||true"#)
            .unwrap();
        assert_eq!(once.0, r#"f("~yy")||true;g("~yy")||true"#);
        assert_eq!(once.1, 1);

        assert!(patch_text(&once.0, r#"("~yy")"#, r#"("~yy")||true"#).is_none());
    }

    #[test]
    fn test_replacement_with_find_in_the_middle() {
        let (patched, _) = patch_text("x", "x", "[x]").unwrap();
        assert_eq!(patched, "[x]");
        assert!(patch_text(&patched, "x", "[x]").is_none());
    }

    #[test]
    fn test_replacement_containing_find_twice() {
        let (patched, count) = patch_text("x;", "x", "x||x").unwrap();
        assert_eq!(patched, "x||x;");
        assert_eq!(count, 1);
        assert!(patch_text(&patched, "x", "x||x").is_none());

        let (patched, count) = patch_text("x||x;x", "x", "x||x").unwrap();
        assert_eq!(patched, "x||x;x||x");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_rules_rewrite_targets() {
        let temp_dir = mirror_tree().await;
        let root = temp_dir.path();

        let report = apply_all(RULES, root, &paths()).await;
        assert_eq!(report.applied(), RULES.len());
        assert_eq!(report.skipped(), 0);

        let app = fs::read_to_string(root.join("code/pp/pp7.js")).await.unwrap();
        assert!(app.contains(r#""'$!|"))||true"#));
        assert!(!app.contains("mirror.php"));
        assert!(app.contains(r#""templates/index.html?type=""#));
        assert!(app.contains(r#""templates/file/""#));
        assert_eq!(app.matches(r#"("~yy")||true"#).count(), 2);

        let index = fs::read_to_string(root.join("index.html")).await.unwrap();
        assert!(!index.contains("google-analytics"));
        assert!(!index.contains("facebook"));
        assert!(index.contains("href=\"#/gtm.js\""));

        let dropbox = fs::read_to_string(root.join("code/storages/dropboxStorage.html"))
            .await
            .unwrap();
        assert!(dropbox.contains("https://www.photopea.com/code/storages/dropboxStorage.html"));
    }

    #[tokio::test]
    async fn test_applying_twice_is_byte_identical() {
        let temp_dir = mirror_tree().await;
        let root = temp_dir.path();
        let files = [
            root.join("code/pp/pp7.js"),
            root.join("index.html"),
            root.join("code/storages/dropboxStorage.html"),
        ];

        apply_all(RULES, root, &paths()).await;
        let mut first = Vec::new();
        for file in &files {
            first.push(digest(file).await);
        }

        let report = apply_all(RULES, root, &paths()).await;
        assert_eq!(report.applied(), 0);
        assert_eq!(report.already_applied(), RULES.len());
        for (file, before) in files.iter().zip(first) {
            assert_eq!(digest(file).await, before, "{}", file.display());
        }
    }

    #[tokio::test]
    async fn test_absent_find_leaves_file_untouched() {
        let temp_dir = mirror_tree().await;
        let root = temp_dir.path();
        let target = root.join("index.html");
        fs::write(&target, "<html>clean</html>").await.unwrap();
        let before = digest(&target).await;
        let modified = fs::metadata(&target).await.unwrap().modified().unwrap();

        let rule = RULES[1];
        let outcome = apply(&rule, root, &paths()).await;

        assert!(matches!(outcome, PatchOutcome::AlreadyApplied));
        assert_eq!(digest(&target).await, before);
        assert_eq!(fs::metadata(&target).await.unwrap().modified().unwrap(), modified);
    }

    #[tokio::test]
    async fn test_missing_target_is_skipped() {
        let temp_dir = tempdir().unwrap();
        let report = apply_all(RULES, temp_dir.path(), &paths()).await;

        assert_eq!(report.skipped(), RULES.len());
        assert!(report.outcomes.iter().all(|(_, outcome)| matches!(
            outcome,
            PatchOutcome::Skipped(PatchError::TargetMissing { .. })
        )));
    }

    #[tokio::test]
    async fn test_unresolved_dynamic_target() {
        let temp_dir = tempdir().unwrap();
        let rule = PatchRule {
            description: "style tweak",
            target: PatchTarget::Dynamic(DynamicAsset::Style),
            find: "a",
            replace: "b",
        };

        let outcome = apply(&rule, temp_dir.path(), &paths()).await;
        assert!(matches!(
            outcome,
            PatchOutcome::Skipped(PatchError::UnresolvedTarget { .. })
        ));
    }
}
