use std::{
    fmt,
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::info;

use crate::{
    document::GltfDocument,
    error::PatchError,
    material::{AlphaMode, Classifier, MatchPolicy, MatchReason, NameHints, Thresholds, make_opaque},
};

#[derive(Clone, Debug, Default)]
pub struct PatchOptions {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub in_place: bool,
    pub thresholds: Thresholds,
    pub hints: Vec<String>,
    pub policy: MatchPolicy,
    pub dry_run: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OutputTarget {
    File(PathBuf),
    InPlace,
}

impl OutputTarget {
    /// Exactly one of an explicit output path or in-place mode must be requested.
    pub fn resolve(output: Option<&Path>, in_place: bool) -> Result<Self, PatchError> {
        match (output, in_place) {
            (Some(_), true) => Err(PatchError::usage(
                "Provide either OUT_GLB or --inplace, not both.",
            )),
            (None, false) => Err(PatchError::usage(
                "You must provide OUT_GLB unless using --inplace.",
            )),
            (Some(path), false) => Ok(OutputTarget::File(path.to_path_buf())),
            (None, true) => Ok(OutputTarget::InPlace),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReportedMaterial {
    pub index: usize,
    pub name: Option<String>,
    pub alpha_mode: Option<AlphaMode>,
    pub base_color_factor: Option<Vec<f64>>,
    pub reason: MatchReason,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Written {
    DryRun,
    File(PathBuf),
    InPlace(PathBuf),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PatchReport {
    pub matches: Vec<ReportedMaterial>,
    pub written: Written,
}

impl PatchReport {
    pub fn indices(&self) -> Vec<usize> {
        self.matches.iter().map(|m| m.index).collect()
    }
}

impl fmt::Display for PatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.matches.is_empty() {
            writeln!(f, "No silkscreen-like materials matched.")?;
            writeln!(
                f,
                "Tip: lower --white-thresh (e.g. 0.9) or --min-alpha, or add --name-hint."
            )?;
        } else {
            writeln!(f, "Matched materials: {:?}", self.indices())?;
            for m in &self.matches {
                let name = match &m.name {
                    Some(name) => format!("'{name}'"),
                    None => "None".to_string(),
                };
                let mode = match &m.alpha_mode {
                    Some(mode) => format!("'{mode}'"),
                    None => "None".to_string(),
                };
                let factor = match &m.base_color_factor {
                    Some(factor) => format!("{factor:?}"),
                    None => "None".to_string(),
                };
                writeln!(
                    f,
                    "  {}: name={name} alphaMode={mode} baseColorFactor={factor}",
                    m.index
                )?;
            }
        }

        match &self.written {
            Written::DryRun => write!(f, "Dry-run: no file written."),
            Written::File(path) => write!(f, "Wrote: {}", path.display()),
            Written::InPlace(path) => write!(f, "Wrote in-place: {}", path.display()),
        }
    }
}

/// Classifies, rewrites and persists the materials of `opts.input`.
pub fn run(opts: &PatchOptions) -> Result<PatchReport, PatchError> {
    let target = OutputTarget::resolve(opts.output.as_deref(), opts.in_place)?;

    let mut doc = GltfDocument::load(&opts.input)?;
    let classifier = Classifier::new(
        opts.thresholds,
        NameHints::new(&opts.hints),
        opts.policy,
    );
    let selected = classifier.select(doc.materials());

    let materials = doc.materials_mut();
    let mut matches = Vec::with_capacity(selected.len());
    for m in selected {
        let mat = &mut materials[m.index];
        if !opts.dry_run {
            make_opaque(mat);
        }
        info!(resource = "material", index = m.index, reason = %m.reason, dry_run = opts.dry_run);
        matches.push(ReportedMaterial {
            index: m.index,
            name: mat.name.clone(),
            alpha_mode: mat.alpha_mode.clone(),
            base_color_factor: mat
                .pbr_metallic_roughness
                .as_ref()
                .and_then(|pbr| pbr.base_color_factor.clone()),
            reason: m.reason,
        });
    }

    if opts.dry_run {
        return Ok(PatchReport {
            matches,
            written: Written::DryRun,
        });
    }

    let written = match target {
        OutputTarget::File(path) => {
            doc.save(&path)?;
            Written::File(path)
        }
        OutputTarget::InPlace => {
            let path = std::path::absolute(&opts.input)
                .map_err(|source| PatchError::io(&opts.input, source))?;
            let payload = doc.to_vec()?;
            replace_atomically(&path, |file| {
                file.write_all(&payload)
                    .map_err(|source| PatchError::io(&path, source))
            })?;
            Written::InPlace(path)
        }
    };
    info!(resource = "document", output = ?written);

    Ok(PatchReport { matches, written })
}

/// Replaces `path` with whatever `write` produces, all or nothing.
///
/// The payload goes to `<name>.<random>.glb` next to `path` and is renamed over it.
/// Any failure before the rename drops the temp file, which deletes it.
pub fn replace_atomically<F>(path: &Path, write: F) -> Result<(), PatchError>
where
    F: FnOnce(&mut File) -> Result<(), PatchError>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let base = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            PatchError::io(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "path does not name a file"),
            )
        })?;

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!("{base}."))
        .suffix(".glb")
        .tempfile_in(dir)
        .map_err(|source| PatchError::io(dir, source))?;
    let tmp_path = tmp.path().to_path_buf();

    write(tmp.as_file_mut())?;
    tmp.as_file_mut()
        .flush()
        .map_err(|source| PatchError::io(&tmp_path, source))?;
    set_readable(&tmp_path)?;

    tmp.persist(path)
        .map_err(|err| PatchError::io(path, err.error))?;
    Ok(())
}

#[cfg(unix)]
fn set_readable(path: &Path) -> Result<(), PatchError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))
        .map_err(|source| PatchError::io(path, source))
}

#[cfg(not(unix))]
fn set_readable(_path: &Path) -> Result<(), PatchError> {
    Ok(())
}
