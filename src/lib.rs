////////////////////////////////////////////////
// silkpatch
// * Reclassifies KiCad silkscreen materials in exported glTF/GLB boards
//   from BLEND to OPAQUE, fixing the angle-dependent see-through artifacts
//   WebGL viewers show on translucent ink.
//
// * Mirrors `<build>/<board>/documentation` trees into a static site's
//   file list so generated docs ship with the site.
////////////////////////////////////////////////

pub mod document;
pub mod error;
pub mod logging;
pub mod material;
pub mod mirror;
pub mod patch;

pub use document::{ContainerKind, GltfDocument};
pub use error::{MirrorError, PatchError};
pub use logging::init_logging;
pub use material::{
    AlphaMode, Classifier, MatchPolicy, MatchReason, Material, NameHints, Thresholds,
    looks_like_silkscreen, make_opaque,
};
pub use mirror::{FileRegistry, GeneratedFile, MirrorConfig, SiteConfig, on_files};
pub use patch::{OutputTarget, PatchOptions, PatchReport, Written, replace_atomically, run};
