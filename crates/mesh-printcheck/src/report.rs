//! Running several checks at once.
//!
//! [`CheckConfig`] holds every threshold; [`check_all`] runs the full set of
//! checks on one mesh and [`check_source`] builds the right mesh for each
//! requested check from a host source. The self-intersection and thickness
//! checks share one BVH per mesh.

use std::cell::OnceCell;
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bvh::Bvh;
use crate::error::{CheckError, CheckResult, require_in_range, require_non_negative};
use crate::finding::Finding;
use crate::intersect::check_self_intersect_with;
use crate::metrics::{check_degenerate, check_nonplanar, check_sharp};
use crate::overhang::evaluate_overhang;
use crate::source::{BuildOptions, MeshSource, TransformMode, build};
use crate::thickness::check_thickness_with;
use crate::topology::check_manifold;
use crate::tracing_ext::{OperationTimer, log_mesh_stats};
use crate::types::Mesh;

/// Thresholds for every check.
///
/// Angles are in radians, lengths and areas in mesh units.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CheckConfig {
    /// Area and length at or below which faces and edges are degenerate.
    pub threshold_zero: f64,
    /// Largest corner deviation of a flat face.
    pub angle_nonplanar: f64,
    /// Minimum wall thickness.
    pub thickness_min: f64,
    /// Dihedral angle above which an edge is sharp.
    pub angle_sharp: f64,
    /// Overhang limit measured from vertical.
    pub angle_overhang: f64,
    /// Overhang limit used by the orientation search.
    pub overhang_optimize_angle: f64,
    /// Candidate rotations tried by the orientation search.
    pub overhang_optimize_iterations: usize,
    /// Overrides the per-check transform mode when set.
    pub transform_mode: Option<TransformMode>,
    /// Split n-gons into triangles before analysis.
    pub triangulate: bool,
    /// Analyze the deformed geometry instead of the base mesh.
    pub apply_modifiers: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            threshold_zero: 1e-4,
            angle_nonplanar: 5f64.to_radians(),
            thickness_min: 0.001,
            angle_sharp: 160f64.to_radians(),
            angle_overhang: 45f64.to_radians(),
            overhang_optimize_angle: 45f64.to_radians(),
            overhang_optimize_iterations: 48,
            transform_mode: None,
            triangulate: false,
            apply_modifiers: true,
        }
    }
}

impl CheckConfig {
    /// Reject out-of-range thresholds.
    ///
    /// # Errors
    ///
    /// [`CheckError::InvalidParameter`] naming the first bad field.
    pub fn validate(&self) -> CheckResult<()> {
        require_non_negative("threshold_zero", self.threshold_zero)?;
        require_in_range("angle_nonplanar", self.angle_nonplanar, 0.0, PI)?;
        require_non_negative("thickness_min", self.thickness_min)?;
        require_in_range("angle_sharp", self.angle_sharp, 0.0, PI)?;
        require_in_range("angle_overhang", self.angle_overhang, 0.0, FRAC_PI_2)?;
        require_in_range(
            "overhang_optimize_angle",
            self.overhang_optimize_angle,
            0.0,
            FRAC_PI_2,
        )?;
        if self.overhang_optimize_iterations == 0 {
            return Err(CheckError::invalid_parameter(
                "overhang_optimize_iterations",
                0.0,
                "at least one candidate is required",
            ));
        }
        Ok(())
    }

    /// Build options for one check.
    pub fn build_options(&self, kind: CheckKind) -> BuildOptions {
        BuildOptions::default()
            .with_transform(self.transform_mode.unwrap_or(kind.transform_mode()))
            .with_apply_modifiers(self.apply_modifiers)
            .with_triangulate(self.triangulate)
    }
}

#[cfg(feature = "config")]
impl CheckConfig {
    /// Parse and validate a TOML configuration. Missing fields keep their
    /// defaults.
    ///
    /// ```
    /// use mesh_printcheck::CheckConfig;
    ///
    /// let config = CheckConfig::from_toml("thickness_min = 0.8").unwrap();
    /// assert_eq!(config.thickness_min, 0.8);
    /// assert_eq!(config.overhang_optimize_iterations, 48);
    /// ```
    pub fn from_toml(toml_str: &str) -> CheckResult<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| CheckError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML configuration file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> CheckResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| CheckError::IoRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> CheckResult<String> {
        toml::to_string_pretty(self).map_err(|e| CheckError::config(e.to_string()))
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json_str: &str) -> CheckResult<Self> {
        let config: Self =
            serde_json::from_str(json_str).map_err(|e| CheckError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> CheckResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CheckError::config(e.to_string()))
    }
}

/// One of the checks run by [`check_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CheckKind {
    Solid,
    Intersections,
    Degenerate,
    NonPlanar,
    Thickness,
    Sharp,
    Overhang,
}

impl CheckKind {
    /// Every check, in report order.
    pub fn all() -> [CheckKind; 7] {
        [
            CheckKind::Solid,
            CheckKind::Intersections,
            CheckKind::Degenerate,
            CheckKind::NonPlanar,
            CheckKind::Thickness,
            CheckKind::Sharp,
            CheckKind::Overhang,
        ]
    }

    /// How much of the world transform this check sees by default.
    ///
    /// Topology, intersections and degenerate geometry are judged in object
    /// space; checks that depend on real sizes and directions see the
    /// placed object.
    pub fn transform_mode(self) -> TransformMode {
        match self {
            CheckKind::Solid | CheckKind::Intersections | CheckKind::Degenerate => {
                TransformMode::None
            }
            CheckKind::NonPlanar | CheckKind::Thickness | CheckKind::Sharp | CheckKind::Overhang => {
                TransformMode::Full
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CheckKind::Solid => "solid",
            CheckKind::Intersections => "intersections",
            CheckKind::Degenerate => "degenerate",
            CheckKind::NonPlanar => "nonplanar",
            CheckKind::Thickness => "thickness",
            CheckKind::Sharp => "sharp",
            CheckKind::Overhang => "overhang",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CheckKind {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CheckKind::all()
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CheckError::config(format!("unknown check '{}'", s)))
    }
}

/// One finding in a report, tagged with the check that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReportEntry {
    pub kind: CheckKind,
    pub finding: Finding,
}

impl ReportEntry {
    pub fn label(&self) -> &str {
        self.finding.label()
    }
}

/// Ordered findings of several checks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Report {
    entries: Vec<ReportEntry>,
}

impl Report {
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry with the given label.
    pub fn get(&self, label: &str) -> Option<&Finding> {
        self.entries
            .iter()
            .find(|e| e.label() == label)
            .map(|e| &e.finding)
    }

    /// Entries produced by one check.
    pub fn for_kind(&self, kind: CheckKind) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// Total number of flagged elements across entries.
    pub fn flagged_count(&self) -> usize {
        self.entries.iter().map(|e| e.finding.len()).sum()
    }

    /// True if no entry flagged anything.
    pub fn is_clean(&self) -> bool {
        self.flagged_count() == 0
    }

    fn push(&mut self, kind: CheckKind, finding: Finding) {
        self.entries.push(ReportEntry { kind, finding });
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry.finding)?;
        }
        Ok(())
    }
}

/// Run every check on `mesh` with the thresholds in `config`.
///
/// The mesh is used as given; the per-check transform modes only apply
/// when building from a source with [`check_source`].
///
/// # Errors
///
/// [`CheckError::InvalidParameter`] if `config` does not validate.
pub fn check_all(mesh: &Mesh, config: &CheckConfig) -> CheckResult<Report> {
    check_mesh(mesh, config, &CheckKind::all())
}

/// Run the selected checks on `mesh`, in report order.
pub fn check_mesh(mesh: &Mesh, config: &CheckConfig, kinds: &[CheckKind]) -> CheckResult<Report> {
    config.validate()?;
    let _timer = OperationTimer::with_context("check_all", mesh);
    log_mesh_stats(mesh, "check_all");

    let bvh = OnceCell::new();
    let mut report = Report::default();
    for kind in ordered(kinds) {
        run_check(kind, mesh, config, &bvh, &mut report)?;
    }
    info!(
        entries = report.len(),
        flagged = report.flagged_count(),
        "Checks complete"
    );
    Ok(report)
}

/// Build a mesh from `source` for each transform mode the selected checks
/// need, and run them in report order.
///
/// # Errors
///
/// Mesh construction errors from [`build`] and invalid thresholds.
pub fn check_source<S>(source: &S, config: &CheckConfig, kinds: &[CheckKind]) -> CheckResult<Report>
where
    S: MeshSource + ?Sized,
{
    config.validate()?;
    let _timer = OperationTimer::new("check_source");

    let mut meshes: Vec<(BuildOptions, Mesh, OnceCell<Bvh>)> = Vec::new();
    let mut report = Report::default();
    for kind in ordered(kinds) {
        let options = config.build_options(kind);
        let slot = match meshes.iter().position(|(o, _, _)| *o == options) {
            Some(slot) => slot,
            None => {
                debug!(check = %kind, transform = ?options.transform, "Building analysis mesh");
                meshes.push((options, build(source, &options)?, OnceCell::new()));
                meshes.len() - 1
            }
        };
        let (_, mesh, bvh) = &meshes[slot];
        run_check(kind, mesh, config, bvh, &mut report)?;
    }
    Ok(report)
}

fn ordered(kinds: &[CheckKind]) -> Vec<CheckKind> {
    let mut kinds = kinds.to_vec();
    kinds.sort_unstable();
    kinds.dedup();
    kinds
}

fn run_check(
    kind: CheckKind,
    mesh: &Mesh,
    config: &CheckConfig,
    bvh: &OnceCell<Bvh>,
    report: &mut Report,
) -> CheckResult<()> {
    match kind {
        CheckKind::Solid => {
            let (non_manifold, non_contiguous) = check_manifold(mesh);
            report.push(kind, non_manifold);
            report.push(kind, non_contiguous);
        }
        CheckKind::Intersections => {
            let bvh = bvh.get_or_init(|| Bvh::build(mesh));
            report.push(kind, check_self_intersect_with(mesh, bvh));
        }
        CheckKind::Degenerate => {
            let (faces, edges) = check_degenerate(mesh, config.threshold_zero, config.threshold_zero)?;
            report.push(kind, faces);
            report.push(kind, edges);
        }
        CheckKind::NonPlanar => {
            report.push(kind, check_nonplanar(mesh, config.angle_nonplanar)?);
        }
        CheckKind::Thickness => {
            let bvh = bvh.get_or_init(|| Bvh::build(mesh));
            report.push(kind, check_thickness_with(mesh, bvh, config.thickness_min)?);
        }
        CheckKind::Sharp => {
            report.push(kind, check_sharp(mesh, config.angle_sharp)?);
        }
        CheckKind::Overhang => {
            let outcome = evaluate_overhang(mesh, config.angle_overhang)?;
            report.push(kind, outcome.into_finding());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{PrintObject, SourceMesh};
    use crate::thickness::LABEL_THIN;
    use crate::topology::LABEL_NON_MANIFOLD;
    use nalgebra::{Matrix4, Point3, Vector3};

    fn tetra_source() -> SourceMesh {
        SourceMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            vec![vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3], vec![0, 3, 2]],
        )
    }

    fn tetrahedron() -> Mesh {
        build(&tetra_source(), &BuildOptions::default()).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = CheckConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.overhang_optimize_iterations, 48);
        assert!((config.angle_sharp.to_degrees() - 160.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_config_names_field() {
        let config = CheckConfig {
            angle_overhang: 2.0,
            ..CheckConfig::default()
        };
        match config.validate() {
            Err(CheckError::InvalidParameter { name, .. }) => assert_eq!(name, "angle_overhang"),
            other => panic!("expected InvalidParameter, got {:?}", other),
        }

        let config = CheckConfig {
            overhang_optimize_iterations: 0,
            ..CheckConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_check_all_order_and_labels() {
        let report = check_all(&tetrahedron(), &CheckConfig::default()).unwrap();
        let labels: Vec<&str> = report.entries().iter().map(|e| e.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Non-manifold Edges",
                "Bad Contiguous Edges",
                "Intersect Face",
                "Zero Faces",
                "Zero Edges",
                "Non-flat Faces",
                "Thin Faces",
                "Sharp Edge",
                "Overhang Face",
            ]
        );
        assert!(report.get(LABEL_NON_MANIFOLD).unwrap().is_empty());
        assert!(report.get(LABEL_THIN).unwrap().is_empty());
    }

    #[test]
    fn test_tetrahedron_report() {
        let report = check_all(&tetrahedron(), &CheckConfig::default()).unwrap();
        // Only the base face points down.
        assert_eq!(report.get("Overhang Face").unwrap().indices(), &[0]);
        assert_eq!(report.flagged_count(), 1);
        assert!(!report.is_clean());
        assert!(report.to_string().starts_with("Non-manifold Edges: 0\n"));
    }

    #[test]
    fn test_skipped_overhang_entry() {
        let config = CheckConfig {
            angle_overhang: FRAC_PI_2,
            ..CheckConfig::default()
        };
        let report = check_mesh(&tetrahedron(), &config, &[CheckKind::Overhang]).unwrap();
        assert_eq!(report.len(), 1);
        let finding = &report.entries()[0].finding;
        assert!(finding.is_scalar());
        assert_eq!(report.to_string(), "Skipping Overhang\n");
        assert!(report.is_clean());
    }

    #[test]
    fn test_selected_checks_run_in_report_order() {
        let kinds = [CheckKind::Overhang, CheckKind::Solid, CheckKind::Overhang];
        let report = check_mesh(&tetrahedron(), &CheckConfig::default(), &kinds).unwrap();
        let kinds: Vec<CheckKind> = report.entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![CheckKind::Solid, CheckKind::Solid, CheckKind::Overhang]);
        assert_eq!(report.for_kind(CheckKind::Solid).count(), 2);
    }

    #[test]
    fn test_check_source_uses_transform_per_check() {
        // Upside down: the world transform flips the tetrahedron over.
        let flip = Matrix4::new_translation(&Vector3::new(5.0, 0.0, 2.0))
            * Matrix4::from_axis_angle(&Vector3::x_axis(), PI);
        let object = PrintObject::new("tetra", tetra_source()).with_transform(flip);

        let report = check_source(&object, &CheckConfig::default(), &CheckKind::all()).unwrap();
        // Overhang sees the placed object: the base now faces up.
        assert!(!report.get("Overhang Face").unwrap().contains(0));
        assert!(report.get("Non-manifold Edges").unwrap().is_empty());

        let local = CheckConfig {
            transform_mode: Some(TransformMode::None),
            ..CheckConfig::default()
        };
        let report = check_source(&object, &local, &[CheckKind::Overhang]).unwrap();
        assert_eq!(report.get("Overhang Face").unwrap().indices(), &[0]);
    }

    #[test]
    fn test_check_kind_parse() {
        assert_eq!("thickness".parse::<CheckKind>().unwrap(), CheckKind::Thickness);
        assert_eq!("NonPlanar".parse::<CheckKind>().unwrap(), CheckKind::NonPlanar);
        assert!("bogus".parse::<CheckKind>().is_err());
        assert_eq!(CheckKind::Sharp.to_string(), "sharp");
    }

    #[test]
    fn test_check_idempotent() {
        let mesh = tetrahedron();
        let config = CheckConfig::default();
        assert_eq!(check_all(&mesh, &config).unwrap(), check_all(&mesh, &config).unwrap());
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_config_toml_roundtrip() {
        let config = CheckConfig {
            thickness_min: 0.8,
            transform_mode: Some(TransformMode::Linear),
            ..CheckConfig::default()
        };
        let toml_str = config.to_toml().unwrap();
        assert_eq!(CheckConfig::from_toml(&toml_str).unwrap(), config);

        let json = config.to_json().unwrap();
        assert_eq!(CheckConfig::from_json(&json).unwrap(), config);
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("check.toml");
        std::fs::write(&path, "angle_sharp = 2.0\ntriangulate = true\n").unwrap();
        let config = CheckConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.angle_sharp, 2.0);
        assert!(config.triangulate);

        std::fs::write(&path, "angle_overhang = 3.0\n").unwrap();
        assert!(CheckConfig::from_toml_file(&path).is_err());
        assert!(CheckConfig::from_toml_file(dir.path().join("missing.toml")).is_err());
    }
}
