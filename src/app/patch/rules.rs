//! Offline compatibility rules, applied in order

use super::{PatchRule, PatchTarget};
use crate::app::resolver::DynamicAsset;

const APP_LOGIC: PatchTarget = PatchTarget::Dynamic(DynamicAsset::AppLogic);
const BOOTSTRAP: PatchTarget = PatchTarget::Bootstrap;
const DROPBOX_STORAGE: PatchTarget = PatchTarget::File("code/storages/dropboxStorage.html");

/// Every rule applied to a fresh mirror
pub const RULES: &[PatchRule] = &[
    PatchRule {
        description: "Accept any local port",
        target: APP_LOGIC,
        find: r#""'$!|"))"#,
        replace: r#""'$!|"))||true"#,
    },
    PatchRule {
        description: "Do not load Google Analytics",
        target: BOOTSTRAP,
        find: "//www.google-analytics.com/analytics.js",
        replace: "",
    },
    PatchRule {
        description: "Do not load Google Tag Manager",
        target: BOOTSTRAP,
        find: "//www.googletagmanager.com",
        replace: "#",
    },
    PatchRule {
        description: "Import pictures from URLs directly instead of through mirror.php",
        target: APP_LOGIC,
        find: r#""mirror.php?url="+encodeURIComponent"#,
        replace: "",
    },
    PatchRule {
        description: "Fixed Dropbox redirect target",
        target: DROPBOX_STORAGE,
        find: "var redirectUri = window.location.href;",
        replace: r#"var redirectUri = "https://www.photopea.com/code/storages/dropboxStorage.html";"#,
    },
    PatchRule {
        description: "Remove Facebook pixel domain (connect)",
        target: BOOTSTRAP,
        find: "https://connect.facebook.net",
        replace: "",
    },
    PatchRule {
        description: "Remove Facebook pixel domain (www)",
        target: BOOTSTRAP,
        find: "https://www.facebook.com",
        replace: "",
    },
    PatchRule {
        description: "Drop the dynamic resource query",
        target: APP_LOGIC,
        find: r#""&rsrc=""#,
        replace: r#""""#,
    },
    PatchRule {
        description: "Serve the template gallery from its static page",
        target: APP_LOGIC,
        find: r#""templates/?type=""#,
        replace: r#""templates/index.html?type=""#,
    },
    PatchRule {
        description: "Load templates from the local mirror",
        target: APP_LOGIC,
        find: r#""https://f000.backblazeb2.com/file/""#,
        replace: r#""templates/file/""#,
    },
    // Brittle: depends on how the bundle spells the feature check
    PatchRule {
        description: "Force-enable features disabled on self-hosted instances",
        target: APP_LOGIC,
        find: r#"("~yy")"#,
        replace: r#"("~yy")||true"#,
    },
];
