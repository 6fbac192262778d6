//! Error types with machine-readable codes and recovery hints.
//!
//! Each error has a code in the format `PRINT-XXXX`:
//! - `PRINT-1xxx`: I/O errors (reading, writing, parsing)
//! - `PRINT-2xxx`: Validation errors (indices, coordinates)
//! - `PRINT-3xxx`: Operator errors (repair or transform could not run)
//! - `PRINT-4xxx`: Format errors
//! - `PRINT-5xxx`: Settings and report errors
//!
//! Conditions that the toolbox reports to the user as warnings (zero volume,
//! nothing selected, stale report) are not errors; operators return them as
//! [`Notice`](crate::Notice)s.
//!
//! ```rust,ignore
//! use print3d_toolbox::{PrintError, ErrorCode};
//!
//! let err = PrintError::invalid_vertex_index(5, 100, 50);
//! assert_eq!(err.code().as_str(), "PRINT-2001");
//! ```

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for toolbox operations.
pub type PrintResult<T> = Result<T, PrintError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // I/O errors (1xxx)
    /// PRINT-1001: Failed to read file
    IoRead = 1001,
    /// PRINT-1002: Failed to write file
    IoWrite = 1002,
    /// PRINT-1003: Failed to parse file contents
    ParseError = 1003,

    // Validation errors (2xxx)
    /// PRINT-2001: Face references invalid vertex index
    InvalidVertexIndex = 2001,
    /// PRINT-2002: Vertex has NaN or Infinity coordinate
    InvalidCoordinate = 2002,
    /// PRINT-2003: Mesh has no geometry
    EmptyMesh = 2003,

    // Operator errors (3xxx)
    /// PRINT-3002: Element selection does not fit the mesh
    InvalidSelection = 3002,
    /// PRINT-3003: Operator argument out of range
    InvalidArgument = 3003,

    // Format errors (4xxx)
    /// PRINT-4001: Unsupported file format
    UnsupportedFormat = 4001,

    // Settings and report errors (5xxx)
    /// PRINT-5001: Setting outside its allowed range
    InvalidSetting = 5001,
    /// PRINT-5002: Settings file could not be parsed
    ConfigParse = 5002,
    /// PRINT-5003: Report has no entry at the requested index
    ReportIndexOutOfRange = 5003,
    /// PRINT-5004: Report could not be (de)serialized
    ReportFormat = 5004,
}

impl ErrorCode {
    /// Returns the error code as a string in the format `PRINT-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::IoRead => "PRINT-1001",
            ErrorCode::IoWrite => "PRINT-1002",
            ErrorCode::ParseError => "PRINT-1003",
            ErrorCode::InvalidVertexIndex => "PRINT-2001",
            ErrorCode::InvalidCoordinate => "PRINT-2002",
            ErrorCode::EmptyMesh => "PRINT-2003",
            ErrorCode::InvalidSelection => "PRINT-3002",
            ErrorCode::InvalidArgument => "PRINT-3003",
            ErrorCode::UnsupportedFormat => "PRINT-4001",
            ErrorCode::InvalidSetting => "PRINT-5001",
            ErrorCode::ConfigParse => "PRINT-5002",
            ErrorCode::ReportIndexOutOfRange => "PRINT-5003",
            ErrorCode::ReportFormat => "PRINT-5004",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery suggestions attached to errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Re-export the file from the modelling software.
    ReexportFile { format: Option<String> },
    /// Use a different file format.
    UseDifferentFormat { suggested: Vec<String> },
    /// Check the environment or the input.
    CheckInput { checks: Vec<String> },
    /// Adjust a parameter.
    AdjustParameters { parameters: Vec<(String, String)> },
    /// Re-run the checks that produced the report.
    RerunChecks,
    /// No automatic recovery available.
    None,
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoverySuggestion::ReexportFile { format } => match format {
                Some(fmt) => write!(f, "Try re-exporting the mesh as {}", fmt),
                None => write!(f, "Try re-exporting the mesh"),
            },
            RecoverySuggestion::UseDifferentFormat { suggested } => {
                write!(f, "Try using a different format: {}", suggested.join(", "))
            }
            RecoverySuggestion::CheckInput { checks } => {
                write!(f, "Check: {}", checks.join(", "))
            }
            RecoverySuggestion::AdjustParameters { parameters } => {
                let params: Vec<String> = parameters
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, v))
                    .collect();
                write!(f, "Try adjusting: {}", params.join(", "))
            }
            RecoverySuggestion::RerunChecks => write!(f, "Re-run the checks to refresh the report"),
            RecoverySuggestion::None => write!(f, "No automatic recovery available"),
        }
    }
}

/// Where an error happened.
#[derive(Debug, Clone)]
pub enum MeshLocation {
    Vertex { index: usize },
    Face { index: usize },
    File { path: PathBuf },
    Setting { name: String },
}

impl std::fmt::Display for MeshLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshLocation::Vertex { index } => write!(f, "vertex {}", index),
            MeshLocation::Face { index } => write!(f, "face {}", index),
            MeshLocation::File { path } => write!(f, "{}", path.display()),
            MeshLocation::Setting { name } => write!(f, "setting `{}`", name),
        }
    }
}

/// Errors raised by toolbox operations.
#[derive(Debug, Error, Diagnostic)]
pub enum PrintError {
    #[error("failed to read mesh from {path}")]
    #[diagnostic(
        code(print3d::io::read),
        help("Check that the file exists and is readable")
    )]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write mesh to {path}")]
    #[diagnostic(
        code(print3d::io::write),
        help("Check that the directory exists and is writable")
    )]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {details}")]
    #[diagnostic(
        code(print3d::parse::error),
        help("The file may be corrupted or use an unsupported variant of the format")
    )]
    ParseError { path: PathBuf, details: String },

    #[error("unsupported mesh format: {extension:?}")]
    #[diagnostic(
        code(print3d::format::unsupported),
        help("Supported formats: STL, OBJ, PLY (read and write), X3D (write only)")
    )]
    UnsupportedFormat { extension: Option<String> },

    #[error("mesh is empty: {details}")]
    #[diagnostic(code(print3d::validation::empty))]
    EmptyMesh { details: String },

    #[error(
        "invalid vertex index: face {face_index} references vertex {vertex_index}, but mesh only has {vertex_count} vertices"
    )]
    #[diagnostic(
        code(print3d::validation::vertex_index),
        help("Check the mesh export settings")
    )]
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },

    #[error("invalid coordinate at vertex {vertex_index}: {coordinate} is {value}")]
    #[diagnostic(code(print3d::validation::coordinate))]
    InvalidCoordinate {
        vertex_index: usize,
        coordinate: &'static str,
        value: f64,
    },

    #[error("invalid selection: {details}")]
    #[diagnostic(
        code(print3d::operator::selection),
        help("Element indices must refer to the current mesh")
    )]
    InvalidSelection { details: String },

    #[error("invalid argument `{name}`: {details}")]
    #[diagnostic(code(print3d::operator::argument))]
    InvalidArgument { name: &'static str, details: String },

    #[error("setting `{name}` = {value} is outside [{min}, {max}]")]
    #[diagnostic(code(print3d::settings::range))]
    InvalidSetting {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("failed to parse settings from {path}: {details}")]
    #[diagnostic(
        code(print3d::settings::parse),
        help("Settings files are TOML; unknown keys are rejected")
    )]
    ConfigParse { path: PathBuf, details: String },

    #[error("report has {len} entries, no entry {index}")]
    #[diagnostic(code(print3d::report::index))]
    ReportIndexOutOfRange { index: usize, len: usize },

    #[error("report format error: {details}")]
    #[diagnostic(code(print3d::report::format))]
    ReportFormat { details: String },
}

impl PrintError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            PrintError::IoRead { .. } => ErrorCode::IoRead,
            PrintError::IoWrite { .. } => ErrorCode::IoWrite,
            PrintError::ParseError { .. } => ErrorCode::ParseError,
            PrintError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            PrintError::EmptyMesh { .. } => ErrorCode::EmptyMesh,
            PrintError::InvalidVertexIndex { .. } => ErrorCode::InvalidVertexIndex,
            PrintError::InvalidCoordinate { .. } => ErrorCode::InvalidCoordinate,
            PrintError::InvalidSelection { .. } => ErrorCode::InvalidSelection,
            PrintError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            PrintError::InvalidSetting { .. } => ErrorCode::InvalidSetting,
            PrintError::ConfigParse { .. } => ErrorCode::ConfigParse,
            PrintError::ReportIndexOutOfRange { .. } => ErrorCode::ReportIndexOutOfRange,
            PrintError::ReportFormat { .. } => ErrorCode::ReportFormat,
        }
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            PrintError::IoRead { .. } => RecoverySuggestion::CheckInput {
                checks: vec!["file exists".into(), "file permissions".into()],
            },
            PrintError::IoWrite { .. } => RecoverySuggestion::CheckInput {
                checks: vec!["directory exists".into(), "write permissions".into()],
            },
            PrintError::ParseError { .. } => RecoverySuggestion::ReexportFile {
                format: Some("binary STL or OBJ".into()),
            },
            PrintError::UnsupportedFormat { .. } => RecoverySuggestion::UseDifferentFormat {
                suggested: vec!["STL".into(), "OBJ".into(), "PLY".into()],
            },
            PrintError::EmptyMesh { .. } => RecoverySuggestion::CheckInput {
                checks: vec!["mesh has geometry".into()],
            },
            PrintError::InvalidVertexIndex { .. } | PrintError::InvalidCoordinate { .. } => {
                RecoverySuggestion::ReexportFile { format: None }
            }
            PrintError::InvalidSelection { .. } => RecoverySuggestion::CheckInput {
                checks: vec!["face indices".into()],
            },
            PrintError::InvalidArgument { name, .. } => RecoverySuggestion::AdjustParameters {
                parameters: vec![((*name).into(), "use a positive value".into())],
            },
            PrintError::InvalidSetting { name, min, max, .. } => {
                RecoverySuggestion::AdjustParameters {
                    parameters: vec![((*name).into(), format!("a value in [{}, {}]", min, max))],
                }
            }
            PrintError::ConfigParse { .. } => RecoverySuggestion::CheckInput {
                checks: vec!["TOML syntax".into(), "setting names".into()],
            },
            PrintError::ReportIndexOutOfRange { .. } | PrintError::ReportFormat { .. } => {
                RecoverySuggestion::RerunChecks
            }
        }
    }

    /// Returns location information if available.
    pub fn location(&self) -> Option<MeshLocation> {
        match self {
            PrintError::InvalidVertexIndex { face_index, .. } => {
                Some(MeshLocation::Face { index: *face_index })
            }
            PrintError::InvalidCoordinate { vertex_index, .. } => Some(MeshLocation::Vertex {
                index: *vertex_index,
            }),
            PrintError::IoRead { path, .. }
            | PrintError::IoWrite { path, .. }
            | PrintError::ParseError { path, .. }
            | PrintError::ConfigParse { path, .. } => {
                Some(MeshLocation::File { path: path.clone() })
            }
            PrintError::InvalidSetting { name, .. } => Some(MeshLocation::Setting {
                name: (*name).into(),
            }),
            _ => None,
        }
    }

    pub fn io_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PrintError::IoRead {
            path: path.into(),
            source,
        }
    }

    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PrintError::IoWrite {
            path: path.into(),
            source,
        }
    }

    pub fn parse_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        PrintError::ParseError {
            path: path.into(),
            details: details.into(),
        }
    }

    pub fn invalid_vertex_index(face_index: usize, vertex_index: u32, vertex_count: usize) -> Self {
        PrintError::InvalidVertexIndex {
            face_index,
            vertex_index,
            vertex_count,
        }
    }

    pub fn invalid_coordinate(vertex_index: usize, coordinate: &'static str, value: f64) -> Self {
        PrintError::InvalidCoordinate {
            vertex_index,
            coordinate,
            value,
        }
    }

    pub fn empty_mesh(details: impl Into<String>) -> Self {
        PrintError::EmptyMesh {
            details: details.into(),
        }
    }

    pub fn invalid_selection(details: impl Into<String>) -> Self {
        PrintError::InvalidSelection {
            details: details.into(),
        }
    }

    pub fn invalid_argument(name: &'static str, details: impl Into<String>) -> Self {
        PrintError::InvalidArgument {
            name,
            details: details.into(),
        }
    }

    pub fn unsupported_format(extension: Option<String>) -> Self {
        PrintError::UnsupportedFormat { extension }
    }
}
