use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::MirrorError;

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_dest_prefix() -> String {
    "assets/projects".to_string()
}

fn default_doc_dir_name() -> String {
    "documentation".to_string()
}

/// A build output file and the site URI it should be served under.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct GeneratedFile {
    pub dest_uri: String,
    pub src_path: PathBuf,
}

/// Receives each file the mirror discovers. The site generator owns the actual copy.
pub trait FileRegistry {
    fn register(&mut self, file: GeneratedFile);
}

impl FileRegistry for Vec<GeneratedFile> {
    fn register(&mut self, file: GeneratedFile) {
        self.push(file);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Relative to the site config's directory.
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
    #[serde(default = "default_dest_prefix")]
    pub dest_prefix: String,
    #[serde(default = "default_doc_dir_name")]
    pub doc_dir_name: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            build_dir: default_build_dir(),
            dest_prefix: default_dest_prefix(),
            doc_dir_name: default_doc_dir_name(),
        }
    }
}

/// The parts of an mkdocs-style YAML config the mirror cares about.
#[derive(Debug, Default, Deserialize)]
struct SiteConfigFile {
    #[serde(default)]
    generated_files: Option<MirrorConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SiteConfig {
    pub config_file_path: PathBuf,
    pub mirror: MirrorConfig,
}

impl SiteConfig {
    pub fn new(config_file_path: impl Into<PathBuf>, mirror: MirrorConfig) -> Self {
        Self {
            config_file_path: config_file_path.into(),
            mirror,
        }
    }

    /// Reads mirror settings from the optional `generated_files:` section.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MirrorError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| MirrorError::io(path, source))?;
        let file: SiteConfigFile = if raw.trim().is_empty() {
            SiteConfigFile::default()
        } else {
            serde_yaml::from_str(&raw).map_err(|source| MirrorError::Config {
                path: path.to_path_buf(),
                source,
            })?
        };

        Ok(Self::new(path, file.generated_files.unwrap_or_default()))
    }

    /// Directory holding the config file. Canonical when the file exists, absolute otherwise.
    pub fn root_dir(&self) -> Result<PathBuf, MirrorError> {
        let path = match fs::canonicalize(&self.config_file_path) {
            Ok(path) => path,
            Err(_) => std::path::absolute(&self.config_file_path)
                .map_err(|source| MirrorError::io(&self.config_file_path, source))?,
        };
        Ok(path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(path))
    }
}

/// Site build hook: registers `<build>/<board>/documentation/**` under
/// `<prefix>/<board>/...` and hands the registry back.
///
/// A missing build directory is not an error; `files` comes back untouched.
pub fn on_files<R: FileRegistry>(mut files: R, site: &SiteConfig) -> Result<R, MirrorError> {
    let root = site.root_dir()?;
    let candidate = root.join(&site.mirror.build_dir);
    let build_root = match fs::canonicalize(&candidate) {
        Ok(path) if path.is_dir() => path,
        _ => {
            debug!(resource = "mirror", build_root = %candidate.display(), source = "missing");
            return Ok(files);
        }
    };

    mirror_generated_files(&build_root, &site.mirror, &mut files)?;
    Ok(files)
}

/// Walks an explicit build root. Returns how many files were registered.
pub fn mirror_generated_files<R: FileRegistry + ?Sized>(
    build_root: &Path,
    config: &MirrorConfig,
    registry: &mut R,
) -> Result<usize, MirrorError> {
    if !build_root.is_dir() {
        return Ok(0);
    }

    let mut count = 0;
    for board_dir in sorted_entries(build_root)? {
        let doc_dir = board_dir.join(&config.doc_dir_name);
        if !board_dir.is_dir() || !doc_dir.is_dir() {
            continue;
        }
        let Some(board) = board_dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };

        let mut files = Vec::new();
        collect_files(&doc_dir, &mut files)?;
        for src in files {
            let Ok(rel) = src.strip_prefix(&doc_dir) else {
                continue;
            };
            let dest_uri = dest_uri(&config.dest_prefix, &board, rel);
            debug!(resource = "mirror", entry = %dest_uri, source = %src.display());
            registry.register(GeneratedFile {
                dest_uri,
                src_path: src,
            });
            count += 1;
        }
    }

    info!(resource = "mirror", build_root = %build_root.display(), registered = count);
    Ok(count)
}

fn dest_uri(prefix: &str, board: &str, rel: &Path) -> String {
    let mut parts: Vec<String> = prefix
        .split('/')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();
    parts.push(board.to_string());
    parts.extend(
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, MirrorError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|source| MirrorError::io(dir, source))? {
        let entry = entry.map_err(|source| MirrorError::io(dir, source))?;
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

/// Regular files (or symlinks to them) under `dir`. Symlinked directories are not followed.
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), MirrorError> {
    for path in sorted_entries(dir)? {
        let link_meta =
            fs::symlink_metadata(&path).map_err(|source| MirrorError::io(&path, source))?;
        if link_meta.is_dir() {
            collect_files(&path, out)?;
        } else if path.is_file() {
            out.push(path);
        }
    }
    Ok(())
}
