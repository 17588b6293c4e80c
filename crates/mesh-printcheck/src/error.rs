//! Error types for printability analysis with rich diagnostics.
//!
//! Every error carries a machine-readable code, an optional location in the
//! mesh and a recovery suggestion, and renders through miette.
//!
//! # Error Codes
//!
//! Each error has a unique code in the format `CHECK-XXXX`:
//! - `CHECK-1xxx`: configuration and I/O errors
//! - `CHECK-2xxx`: mesh construction errors (empty input, bad indices, NaN)
//! - `CHECK-3xxx`: parameter errors (thresholds out of range)
//! - `CHECK-4xxx`: finding errors (results used against a changed mesh)
//!
//! # Example
//!
//! ```
//! use mesh_printcheck::{CheckError, ErrorCode};
//!
//! let err = CheckError::invalid_parameter("min_thickness", -1.0, "must not be negative");
//! assert_eq!(err.code(), ErrorCode::InvalidParameter);
//! assert_eq!(err.code().as_str(), "CHECK-3001");
//! ```

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::finding::ElementKind;

/// Result type alias for analysis operations.
pub type CheckResult<T> = Result<T, CheckError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Configuration (1xxx)
    /// CHECK-1001: Failed to read a configuration file
    IoRead = 1001,
    /// CHECK-1002: Configuration could not be parsed or serialized
    Config = 1002,

    // Mesh construction (2xxx)
    /// CHECK-2001: Mesh is empty or has malformed faces
    InvalidMesh = 2001,
    /// CHECK-2002: Face references a vertex that does not exist
    InvalidVertexIndex = 2002,
    /// CHECK-2003: Vertex has a NaN or infinite coordinate
    InvalidCoordinate = 2003,

    // Parameters (3xxx)
    /// CHECK-3001: Threshold or count outside its valid range
    InvalidParameter = 3001,

    // Findings (4xxx)
    /// CHECK-4001: Finding no longer matches the mesh it is resolved against
    StaleFinding = 4001,
}

impl ErrorCode {
    /// Returns the error code as a string in the format `CHECK-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::IoRead => "CHECK-1001",
            ErrorCode::Config => "CHECK-1002",
            ErrorCode::InvalidMesh => "CHECK-2001",
            ErrorCode::InvalidVertexIndex => "CHECK-2002",
            ErrorCode::InvalidCoordinate => "CHECK-2003",
            ErrorCode::InvalidParameter => "CHECK-3001",
            ErrorCode::StaleFinding => "CHECK-4001",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery suggestions for analysis errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Re-run the analysis on the current mesh.
    RerunCheck { check: String },
    /// Check the source mesh for the listed problems.
    CheckSourceMesh { checks: Vec<String> },
    /// Adjust the named parameter.
    AdjustParameters { parameters: Vec<(String, String)> },
    /// Fix the configuration file.
    FixConfig { path: Option<PathBuf> },
    /// No automatic recovery available.
    None,
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoverySuggestion::RerunCheck { check } => {
                write!(f, "Report is out of date, re-run the {} check", check)
            }
            RecoverySuggestion::CheckSourceMesh { checks } => {
                write!(f, "Check the source mesh for: {}", checks.join(", "))
            }
            RecoverySuggestion::AdjustParameters { parameters } => {
                let params: Vec<String> = parameters
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, v))
                    .collect();
                write!(f, "Try adjusting: {}", params.join(", "))
            }
            RecoverySuggestion::FixConfig { path } => match path {
                Some(p) => write!(f, "Fix the configuration in {}", p.display()),
                None => write!(f, "Fix the configuration values"),
            },
            RecoverySuggestion::None => write!(f, "No automatic recovery available"),
        }
    }
}

/// Location information for analysis errors.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckLocation {
    /// Error at a specific vertex.
    Vertex { index: usize },
    /// Error at a specific face.
    Face { index: usize },
    /// Error at an element of the given kind.
    Element { kind: ElementKind, index: usize },
    /// Error in a file.
    File { path: PathBuf },
}

impl std::fmt::Display for CheckLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckLocation::Vertex { index } => write!(f, "vertex {}", index),
            CheckLocation::Face { index } => write!(f, "face {}", index),
            CheckLocation::Element { kind, index } => write!(f, "{} {}", kind, index),
            CheckLocation::File { path } => write!(f, "{}", path.display()),
        }
    }
}

/// Errors that can occur while building a mesh or running an analysis.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckError {
    /// Error reading a configuration file.
    #[error("failed to read configuration from {path}")]
    #[diagnostic(
        code(check::io::read),
        help("Check that the file exists and is readable")
    )]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be parsed or written.
    #[error("invalid configuration: {details}")]
    #[diagnostic(code(check::config), help("Compare field names and value types against the default configuration"))]
    Config { details: String },

    /// The source mesh cannot be turned into an analysis mesh.
    #[error("invalid mesh: {details}")]
    #[diagnostic(
        code(check::mesh::invalid),
        help("The mesh needs at least one vertex and one face, and every face needs three distinct corners.")
    )]
    InvalidMesh { details: String },

    /// A face references a vertex that does not exist.
    #[error(
        "invalid vertex index: face {face_index} references vertex {vertex_index}, but mesh only has {vertex_count} vertices"
    )]
    #[diagnostic(
        code(check::mesh::vertex_index),
        help("Check the mesh export settings; the face list does not match the vertex list.")
    )]
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },

    /// A vertex coordinate is NaN or infinite.
    #[error("invalid coordinate at vertex {vertex_index}: {coordinate} is {value}")]
    #[diagnostic(
        code(check::mesh::coordinate),
        help("Check for numerical issues in the source data or its world transform.")
    )]
    InvalidCoordinate {
        vertex_index: usize,
        coordinate: &'static str,
        value: f64,
    },

    /// A threshold, count or dimension is outside its valid range.
    #[error("invalid parameter {name} = {value}: {reason}")]
    #[diagnostic(code(check::parameter))]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: String,
    },

    /// A finding was resolved against a mesh that no longer matches it.
    #[error("stale finding: {kind} index {index} cannot be resolved against {count} elements")]
    #[diagnostic(code(check::finding::stale), help("Report is out of date, re-run check"))]
    StaleFinding {
        kind: ElementKind,
        index: usize,
        count: usize,
    },
}

impl CheckError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            CheckError::IoRead { .. } => ErrorCode::IoRead,
            CheckError::Config { .. } => ErrorCode::Config,
            CheckError::InvalidMesh { .. } => ErrorCode::InvalidMesh,
            CheckError::InvalidVertexIndex { .. } => ErrorCode::InvalidVertexIndex,
            CheckError::InvalidCoordinate { .. } => ErrorCode::InvalidCoordinate,
            CheckError::InvalidParameter { .. } => ErrorCode::InvalidParameter,
            CheckError::StaleFinding { .. } => ErrorCode::StaleFinding,
        }
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            CheckError::IoRead { path, .. } => RecoverySuggestion::FixConfig {
                path: Some(path.clone()),
            },
            CheckError::Config { .. } => RecoverySuggestion::FixConfig { path: None },
            CheckError::InvalidMesh { .. } => RecoverySuggestion::CheckSourceMesh {
                checks: vec!["mesh has geometry".into(), "faces have 3+ corners".into()],
            },
            CheckError::InvalidVertexIndex { .. } => RecoverySuggestion::CheckSourceMesh {
                checks: vec!["face vertex indices".into()],
            },
            CheckError::InvalidCoordinate { .. } => RecoverySuggestion::CheckSourceMesh {
                checks: vec!["coordinate values".into(), "object transform".into()],
            },
            CheckError::InvalidParameter { name, reason, .. } => {
                RecoverySuggestion::AdjustParameters {
                    parameters: vec![((*name).to_string(), reason.clone())],
                }
            }
            CheckError::StaleFinding { kind, .. } => RecoverySuggestion::RerunCheck {
                check: kind.to_string(),
            },
        }
    }

    /// Returns location information if available.
    pub fn location(&self) -> Option<CheckLocation> {
        match self {
            CheckError::InvalidVertexIndex { face_index, .. } => Some(CheckLocation::Face {
                index: *face_index,
            }),
            CheckError::InvalidCoordinate { vertex_index, .. } => Some(CheckLocation::Vertex {
                index: *vertex_index,
            }),
            CheckError::StaleFinding { kind, index, .. } => Some(CheckLocation::Element {
                kind: *kind,
                index: *index,
            }),
            CheckError::IoRead { path, .. } => Some(CheckLocation::File { path: path.clone() }),
            _ => None,
        }
    }

    /// Returns true if the caller can recover by re-running the analysis.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CheckError::StaleFinding { .. })
    }

    /// Create an InvalidMesh error.
    pub fn invalid_mesh(details: impl Into<String>) -> Self {
        CheckError::InvalidMesh {
            details: details.into(),
        }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter(name: &'static str, value: f64, reason: impl Into<String>) -> Self {
        CheckError::InvalidParameter {
            name,
            value,
            reason: reason.into(),
        }
    }

    /// Create a Config error.
    pub fn config(details: impl Into<String>) -> Self {
        CheckError::Config {
            details: details.into(),
        }
    }
}

/// Rejects NaN and negative values.
pub(crate) fn require_non_negative(name: &'static str, value: f64) -> CheckResult<()> {
    if value.is_nan() || value < 0.0 {
        return Err(CheckError::invalid_parameter(
            name,
            value,
            "must be a non-negative number",
        ));
    }
    Ok(())
}

/// Rejects values outside `[min, max]`, including NaN.
pub(crate) fn require_in_range(name: &'static str, value: f64, min: f64, max: f64) -> CheckResult<()> {
    if !(min..=max).contains(&value) {
        return Err(CheckError::invalid_parameter(
            name,
            value,
            format!("must be within [{}, {}]", min, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = CheckError::invalid_mesh("no faces");
        assert_eq!(err.code(), ErrorCode::InvalidMesh);
        assert_eq!(err.code().as_str(), "CHECK-2001");

        let err = CheckError::InvalidVertexIndex {
            face_index: 3,
            vertex_index: 9,
            vertex_count: 4,
        };
        assert_eq!(err.code().as_str(), "CHECK-2002");

        let err = CheckError::StaleFinding {
            kind: ElementKind::Face,
            index: 12,
            count: 6,
        };
        assert_eq!(err.code().to_string(), "CHECK-4001");
    }

    #[test]
    fn test_error_display() {
        let err = CheckError::InvalidVertexIndex {
            face_index: 3,
            vertex_index: 9,
            vertex_count: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("face 3"));
        assert!(msg.contains("vertex 9"));
        assert!(msg.contains("4 vertices"));

        let err = CheckError::invalid_parameter("angle_limit", 4.0, "must be within [0, 3.14]");
        assert_eq!(
            err.to_string(),
            "invalid parameter angle_limit = 4: must be within [0, 3.14]"
        );
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = CheckError::StaleFinding {
            kind: ElementKind::Edge,
            index: 40,
            count: 12,
        };
        assert!(err.is_recoverable());
        let suggestion = err.recovery_suggestion();
        assert_eq!(
            suggestion,
            RecoverySuggestion::RerunCheck {
                check: "edge".into()
            }
        );
        assert!(suggestion.to_string().contains("re-run"));

        let err = CheckError::invalid_mesh("empty");
        assert!(!err.is_recoverable());
        assert!(matches!(
            err.recovery_suggestion(),
            RecoverySuggestion::CheckSourceMesh { .. }
        ));
    }

    #[test]
    fn test_location() {
        let err = CheckError::InvalidCoordinate {
            vertex_index: 7,
            coordinate: "y",
            value: f64::NAN,
        };
        assert_eq!(err.location(), Some(CheckLocation::Vertex { index: 7 }));
        assert_eq!(err.location().map(|l| l.to_string()), Some("vertex 7".into()));

        assert!(CheckError::config("bad").location().is_none());
    }

    #[test]
    fn test_parameter_guards() {
        assert!(require_non_negative("eps", 0.0).is_ok());
        assert!(require_non_negative("eps", -1e-9).is_err());
        assert!(require_non_negative("eps", f64::NAN).is_err());

        assert!(require_in_range("angle", 1.0, 0.0, 2.0).is_ok());
        assert!(require_in_range("angle", 2.5, 0.0, 2.0).is_err());
        assert!(require_in_range("angle", f64::NAN, 0.0, 2.0).is_err());
    }
}
