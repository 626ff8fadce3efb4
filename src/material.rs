use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

pub const DEFAULT_WHITE_THRESH: f64 = 0.95;
pub const DEFAULT_MIN_ALPHA: f64 = 0.7;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlphaMode {
    Opaque,
    Blend,
    Mask,
    /// Any other spelling (`"blend"`, exporter typos), kept verbatim. Never counts as BLEND.
    #[serde(untagged)]
    Other(String),
}

impl AlphaMode {
    pub fn as_str(&self) -> &str {
        match self {
            AlphaMode::Opaque => "OPAQUE",
            AlphaMode::Blend => "BLEND",
            AlphaMode::Mask => "MASK",
            AlphaMode::Other(raw) => raw,
        }
    }
}

impl fmt::Display for AlphaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color_factor: Option<Vec<f64>>,
    /// Texture references, metallic/roughness factors, extensions.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of a glTF `materials` array.
///
/// Only the members involved in transparency handling are typed. Everything
/// else rides along in `extra` so a load/save cycle leaves it untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_mode: Option<AlphaMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_cutoff: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_sided: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Material {
    /// Declared alpha mode, or OPAQUE when the member is absent.
    pub fn effective_alpha_mode(&self) -> AlphaMode {
        self.alpha_mode.clone().unwrap_or(AlphaMode::Opaque)
    }

    /// RGBA factor, present only when the PBR block carries exactly four components.
    pub fn base_color_factor(&self) -> Option<[f64; 4]> {
        let factor = self.pbr_metallic_roughness.as_ref()?.base_color_factor.as_ref()?;
        match factor.as_slice() {
            [r, g, b, a] => Some([*r, *g, *b, *a]),
            _ => None,
        }
    }

    pub fn is_double_sided(&self) -> bool {
        self.double_sided.unwrap_or(false)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    /// Lower bound applied to each of R, G and B.
    pub white: f64,
    /// Lower bound applied to A.
    pub min_alpha: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            white: DEFAULT_WHITE_THRESH,
            min_alpha: DEFAULT_MIN_ALPHA,
        }
    }
}

/// Case-insensitive material name substrings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameHints {
    hints: Vec<String>,
}

impl NameHints {
    pub fn new<I, S>(hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hints: hints
                .into_iter()
                .map(|hint| hint.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }

    /// An absent name is matched as the empty string.
    pub fn matches(&self, name: Option<&str>) -> bool {
        if self.hints.is_empty() {
            return false;
        }
        let name = name.unwrap_or_default().to_lowercase();
        self.hints.iter().any(|hint| name.contains(hint.as_str()))
    }
}

/// How name-hint and heuristic results combine.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MatchPolicy {
    /// Either signal alone selects the material.
    #[default]
    Either,
    /// Both signals are required. With no hints configured only the heuristic counts.
    Both,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchReason {
    NameHint,
    Heuristic,
    Both,
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchReason::NameHint => write!(f, "name hint"),
            MatchReason::Heuristic => write!(f, "heuristic"),
            MatchReason::Both => write!(f, "name hint + heuristic"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MaterialMatch {
    pub index: usize,
    pub reason: MatchReason,
}

/// Near-white, mostly opaque BLEND material: how KiCad exports silkscreen ink.
pub fn looks_like_silkscreen(mat: Option<&Material>, thresholds: &Thresholds) -> bool {
    let Some(mat) = mat else {
        return false;
    };

    if mat.alpha_mode != Some(AlphaMode::Blend) {
        return false;
    }

    let Some([r, g, b, a]) = mat.base_color_factor() else {
        return false;
    };

    if a < thresholds.min_alpha {
        return false;
    }

    r >= thresholds.white && g >= thresholds.white && b >= thresholds.white
}

/// Forces a material to render as opaque, double-sided ink.
pub fn make_opaque(mat: &mut Material) {
    if let Some(factor) = mat
        .pbr_metallic_roughness
        .as_mut()
        .and_then(|pbr| pbr.base_color_factor.as_mut())
    {
        if factor.len() == 4 {
            factor[3] = 1.0;
        }
    }

    mat.alpha_mode = Some(AlphaMode::Opaque);
    mat.alpha_cutoff = None;
    mat.double_sided = Some(true);
}

#[derive(Clone, Debug, Default)]
pub struct Classifier {
    pub thresholds: Thresholds,
    pub hints: NameHints,
    pub policy: MatchPolicy,
}

impl Classifier {
    pub fn new(thresholds: Thresholds, hints: NameHints, policy: MatchPolicy) -> Self {
        Self {
            thresholds,
            hints,
            policy,
        }
    }

    pub fn classify(&self, mat: Option<&Material>) -> Option<MatchReason> {
        let mat = mat?;
        let by_name = self.hints.matches(mat.name.as_deref());
        let by_heuristic = looks_like_silkscreen(Some(mat), &self.thresholds);

        match self.policy {
            MatchPolicy::Either => match (by_name, by_heuristic) {
                (true, true) => Some(MatchReason::Both),
                (true, false) => Some(MatchReason::NameHint),
                (false, true) => Some(MatchReason::Heuristic),
                (false, false) => None,
            },
            MatchPolicy::Both if self.hints.is_empty() => {
                by_heuristic.then_some(MatchReason::Heuristic)
            }
            MatchPolicy::Both => (by_name && by_heuristic).then_some(MatchReason::Both),
        }
    }

    /// Indices of matching materials, ascending.
    pub fn select(&self, materials: &[Material]) -> Vec<MaterialMatch> {
        materials
            .iter()
            .enumerate()
            .filter_map(|(index, mat)| {
                let reason = self.classify(Some(mat));
                debug!(
                    resource = "material",
                    index,
                    name = mat.name.as_deref().unwrap_or_default(),
                    matched = reason.is_some()
                );
                reason.map(|reason| MaterialMatch { index, reason })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material(name: Option<&str>, mode: Option<AlphaMode>, factor: Option<Vec<f64>>) -> Material {
        Material {
            name: name.map(str::to_string),
            alpha_mode: mode,
            pbr_metallic_roughness: factor.map(|factor| PbrMetallicRoughness {
                base_color_factor: Some(factor),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn silk_top_matches_and_is_rewritten() {
        let mut mat = material(
            Some("Silk_Top"),
            Some(AlphaMode::Blend),
            Some(vec![0.96, 0.97, 0.98, 0.9]),
        );
        mat.alpha_cutoff = Some(0.5);

        let classifier = Classifier::default();
        assert_eq!(classifier.classify(Some(&mat)), Some(MatchReason::Heuristic));

        make_opaque(&mut mat);
        assert_eq!(mat.alpha_mode, Some(AlphaMode::Opaque));
        assert_eq!(mat.base_color_factor(), Some([0.96, 0.97, 0.98, 1.0]));
        assert_eq!(mat.alpha_cutoff, None);
        assert!(mat.is_double_sided());
    }

    #[test]
    fn glass_alpha_is_too_low() {
        let mat = material(
            Some("Glass"),
            Some(AlphaMode::Blend),
            Some(vec![0.9, 0.9, 0.9, 0.3]),
        );
        assert!(!looks_like_silkscreen(Some(&mat), &Thresholds::default()));
        assert_eq!(Classifier::default().classify(Some(&mat)), None);
    }

    #[test]
    fn absent_material_never_matches() {
        let classifier = Classifier::new(
            Thresholds::default(),
            NameHints::new([""]),
            MatchPolicy::Either,
        );
        assert!(!looks_like_silkscreen(None, &Thresholds::default()));
        assert_eq!(classifier.classify(None), None);
    }

    #[test]
    fn non_blend_modes_never_match_without_hint() {
        let classifier = Classifier::new(
            Thresholds::default(),
            NameHints::new(["silk"]),
            MatchPolicy::Either,
        );
        let factors = [
            vec![1.0, 1.0, 1.0, 1.0],
            vec![0.99, 0.96, 0.95, 0.7],
            vec![0.0, 0.0, 0.0, 0.0],
        ];

        let modes = [
            None,
            Some(AlphaMode::Opaque),
            Some(AlphaMode::Mask),
            Some(AlphaMode::Other("blend".to_string())),
        ];
        for mode in modes {
            for factor in &factors {
                let mat = material(Some("F.Cu"), mode.clone(), Some(factor.clone()));
                assert_eq!(classifier.classify(Some(&mat)), None, "{mode:?} {factor:?}");
            }
        }
    }

    #[test]
    fn missing_or_short_factor_fails_heuristic() {
        let thresholds = Thresholds::default();
        let no_pbr = material(None, Some(AlphaMode::Blend), None);
        let short = material(None, Some(AlphaMode::Blend), Some(vec![1.0, 1.0, 1.0]));
        let mut no_factor = material(None, Some(AlphaMode::Blend), None);
        no_factor.pbr_metallic_roughness = Some(PbrMetallicRoughness::default());

        assert_eq!(no_pbr.base_color_factor(), None);
        assert_eq!(short.base_color_factor(), None);
        assert_eq!(no_factor.base_color_factor(), None);
        assert!(!looks_like_silkscreen(Some(&no_pbr), &thresholds));
        assert!(!looks_like_silkscreen(Some(&short), &thresholds));
        assert!(!looks_like_silkscreen(Some(&no_factor), &thresholds));
    }

    #[test]
    fn thresholds_are_inclusive() {
        let mat = material(None, Some(AlphaMode::Blend), Some(vec![0.95, 0.95, 0.95, 0.7]));
        assert!(looks_like_silkscreen(Some(&mat), &Thresholds::default()));

        let grey = material(None, Some(AlphaMode::Blend), Some(vec![0.95, 0.94, 0.95, 1.0]));
        assert!(!looks_like_silkscreen(Some(&grey), &Thresholds::default()));
    }

    #[test]
    fn name_hints_are_case_insensitive() {
        let hints = NameHints::new(["SILK", "screen"]);
        assert!(hints.matches(Some("F.SilkS")));
        assert!(hints.matches(Some("ScreenPrint")));
        assert!(!hints.matches(Some("F.Mask")));
        assert!(!hints.matches(None));
        assert!(!NameHints::default().matches(Some("silk")));
    }

    #[test]
    fn name_hint_alone_selects_opaque_material() {
        let classifier = Classifier::new(
            Thresholds::default(),
            NameHints::new(["silk"]),
            MatchPolicy::Either,
        );
        let mat = material(Some("B.SilkS"), Some(AlphaMode::Opaque), None);
        assert_eq!(classifier.classify(Some(&mat)), Some(MatchReason::NameHint));
    }

    #[test]
    fn both_policy_requires_name_and_heuristic() {
        let white = vec![1.0, 1.0, 1.0, 0.9];
        let classifier = Classifier::new(
            Thresholds::default(),
            NameHints::new(["silk"]),
            MatchPolicy::Both,
        );

        let heuristic_only = material(Some("Paint"), Some(AlphaMode::Blend), Some(white.clone()));
        let name_only = material(Some("silk"), Some(AlphaMode::Opaque), Some(white.clone()));
        let both = material(Some("silk"), Some(AlphaMode::Blend), Some(white.clone()));

        assert_eq!(classifier.classify(Some(&heuristic_only)), None);
        assert_eq!(classifier.classify(Some(&name_only)), None);
        assert_eq!(classifier.classify(Some(&both)), Some(MatchReason::Both));

        let no_hints = Classifier {
            policy: MatchPolicy::Both,
            ..Default::default()
        };
        assert_eq!(
            no_hints.classify(Some(&heuristic_only)),
            Some(MatchReason::Heuristic)
        );
    }

    #[test]
    fn select_reports_ascending_indices() {
        let materials = vec![
            material(Some("Copper"), Some(AlphaMode::Opaque), Some(vec![0.8, 0.5, 0.2, 1.0])),
            material(Some("Silk"), Some(AlphaMode::Blend), Some(vec![1.0, 1.0, 1.0, 0.9])),
            material(Some("Glass"), Some(AlphaMode::Blend), Some(vec![0.9, 0.9, 0.9, 0.3])),
            material(None, Some(AlphaMode::Blend), Some(vec![0.97, 0.97, 0.97, 0.8])),
        ];

        let selected: Vec<usize> = Classifier::default()
            .select(&materials)
            .into_iter()
            .map(|m| m.index)
            .collect();
        assert_eq!(selected, vec![1, 3]);
    }

    #[test]
    fn make_opaque_leaves_short_factor_alone() {
        let mut mat = material(Some("odd"), Some(AlphaMode::Mask), Some(vec![0.5, 0.5]));
        mat.alpha_cutoff = Some(0.25);
        make_opaque(&mut mat);

        assert_eq!(
            mat.pbr_metallic_roughness.unwrap().base_color_factor,
            Some(vec![0.5, 0.5])
        );
        assert_eq!(mat.alpha_mode, Some(AlphaMode::Opaque));
        assert_eq!(mat.alpha_cutoff, None);
        assert_eq!(mat.double_sided, Some(true));
    }

    #[test]
    fn unknown_alpha_mode_parses_and_only_name_hint_selects_it() {
        let raw = r#"{"name": "Odd_Silk", "alphaMode": "blend",
            "pbrMetallicRoughness": {"baseColorFactor": [1.0, 1.0, 1.0, 0.9]}}"#;
        let mut mat: Material = serde_json::from_str(raw).expect("lenient alpha mode");
        assert_eq!(mat.alpha_mode, Some(AlphaMode::Other("blend".to_string())));
        assert_eq!(mat.effective_alpha_mode().as_str(), "blend");
        assert_eq!(serde_json::to_value(&mat).unwrap()["alphaMode"], "blend");

        assert_eq!(Classifier::default().classify(Some(&mat)), None);
        let hinted = Classifier::new(
            Thresholds::default(),
            NameHints::new(["silk"]),
            MatchPolicy::Either,
        );
        assert_eq!(hinted.classify(Some(&mat)), Some(MatchReason::NameHint));

        make_opaque(&mut mat);
        assert_eq!(mat.alpha_mode, Some(AlphaMode::Opaque));
    }
}
