// Allow unused_assignments lint for error struct fields that are used in thiserror Display macros
// but appear as "never read" to the compiler.
#![allow(unused_assignments)]

//! Error types for base generation.
//!
//! Codes follow the pattern `BASE-XXXX`:
//! - 1xxx = parameter errors
//! - 2xxx = geometry errors raised while building the base
//! - 3xxx = errors passed through from the toolbox

use miette::Diagnostic;
use print3d_toolbox::PrintError;
use thiserror::Error;

/// Result type alias for base operations.
pub type BaseResult<T> = Result<T, BaseError>;

/// Machine-readable error codes for base operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseErrorCode {
    /// BASE-1001: Invalid parameters
    InvalidParams = 1001,
    /// BASE-1002: Target object has no geometry
    EmptyTarget = 1002,

    /// BASE-2001: Voxel grid too large
    GridTooLarge = 2001,
    /// BASE-2002: Projection left no faces after trimming
    EmptyProjection = 2002,
    /// BASE-2003: Isosurface extraction produced nothing
    EmptyIsosurface = 2003,

    /// BASE-3001: Toolbox operation failed
    Toolbox = 3001,
}

impl BaseErrorCode {
    /// Returns the error code as a string in the format `BASE-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseErrorCode::InvalidParams => "BASE-1001",
            BaseErrorCode::EmptyTarget => "BASE-1002",
            BaseErrorCode::GridTooLarge => "BASE-2001",
            BaseErrorCode::EmptyProjection => "BASE-2002",
            BaseErrorCode::EmptyIsosurface => "BASE-2003",
            BaseErrorCode::Toolbox => "BASE-3001",
        }
    }
}

impl std::fmt::Display for BaseErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery suggestions for base errors.
#[derive(Debug, Clone, PartialEq)]
pub enum BaseRecoverySuggestion {
    /// Use a coarser voxel size.
    IncreaseVoxelSize { current: f64, suggested: f64 },
    /// Check that the object sits under the projection plane.
    CheckPlacement,
    /// Use finer voxels or a thicker base.
    FinerVoxels { current: f64 },
    /// Repair the target mesh first.
    RepairTarget,
    /// No specific suggestion.
    None,
}

impl std::fmt::Display for BaseRecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BaseRecoverySuggestion::IncreaseVoxelSize { current, suggested } => {
                write!(f, "Increase voxel size from {:.3} to {:.3}", current, suggested)
            }
            BaseRecoverySuggestion::CheckPlacement => {
                write!(f, "Make sure the object has faces facing up toward the base")
            }
            BaseRecoverySuggestion::FinerVoxels { current } => {
                write!(
                    f,
                    "Use a voxel size below {:.3} or a thicker base",
                    current
                )
            }
            BaseRecoverySuggestion::RepairTarget => {
                write!(f, "Run `print3d clean` on the object first")
            }
            BaseRecoverySuggestion::None => {
                write!(f, "No specific suggestion available")
            }
        }
    }
}

/// Errors that can occur while generating a base.
#[derive(Debug, Error, Diagnostic)]
pub enum BaseError {
    /// Parameters out of range.
    #[error("invalid base parameters: {details}")]
    #[diagnostic(
        code(base::params::invalid),
        help("Check parameter values: voxel_size > 0, thickness > 0, margin >= 1")
    )]
    InvalidParams {
        details: String,
        param_name: Option<String>,
    },

    /// Target object has no faces.
    #[error("object '{name}' has no geometry")]
    #[diagnostic(code(base::target::empty))]
    EmptyTarget { name: String },

    /// Grid would exceed the voxel budget.
    #[error("voxel grid too large: {dims:?} = {total} voxels exceeds limit of {max}")]
    #[diagnostic(
        code(base::grid::too_large),
        help("Use a coarser voxel size or raise max_voxels")
    )]
    GridTooLarge {
        dims: [usize; 3],
        total: usize,
        max: usize,
        voxel_size: f64,
    },

    /// Nothing survived the trim step.
    #[error("projection of '{name}' left no faces after trimming")]
    #[diagnostic(
        code(base::projection::empty),
        help("The object must be hit by rays cast straight down from above")
    )]
    EmptyProjection { name: String },

    /// Remesh produced nothing.
    #[error("voxel remesh produced an empty mesh")]
    #[diagnostic(
        code(base::remesh::empty),
        help("The base may be thinner than one voxel. Try a thicker base or a smaller voxel size.")
    )]
    EmptyIsosurface { voxel_size: f64 },

    /// Underlying toolbox error.
    #[error("toolbox operation failed: {0}")]
    #[diagnostic(code(base::toolbox::error))]
    Toolbox(#[from] PrintError),
}

impl BaseError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> BaseErrorCode {
        match self {
            BaseError::InvalidParams { .. } => BaseErrorCode::InvalidParams,
            BaseError::EmptyTarget { .. } => BaseErrorCode::EmptyTarget,
            BaseError::GridTooLarge { .. } => BaseErrorCode::GridTooLarge,
            BaseError::EmptyProjection { .. } => BaseErrorCode::EmptyProjection,
            BaseError::EmptyIsosurface { .. } => BaseErrorCode::EmptyIsosurface,
            BaseError::Toolbox(_) => BaseErrorCode::Toolbox,
        }
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> BaseRecoverySuggestion {
        match self {
            BaseError::InvalidParams { .. } => BaseRecoverySuggestion::None,
            BaseError::EmptyTarget { .. } => BaseRecoverySuggestion::RepairTarget,
            BaseError::GridTooLarge {
                total,
                max,
                voxel_size,
                ..
            } => {
                let scale = (*total as f64 / *max as f64).cbrt();
                BaseRecoverySuggestion::IncreaseVoxelSize {
                    current: *voxel_size,
                    suggested: voxel_size * scale * 1.05,
                }
            }
            BaseError::EmptyProjection { .. } => BaseRecoverySuggestion::CheckPlacement,
            BaseError::EmptyIsosurface { voxel_size } => BaseRecoverySuggestion::FinerVoxels {
                current: *voxel_size,
            },
            BaseError::Toolbox(_) => BaseRecoverySuggestion::RepairTarget,
        }
    }

    // Constructor helpers

    /// Create an invalid params error naming the parameter.
    pub fn invalid_param(param_name: impl Into<String>, details: impl Into<String>) -> Self {
        BaseError::InvalidParams {
            details: details.into(),
            param_name: Some(param_name.into()),
        }
    }

    /// Create a grid too large error.
    pub fn grid_too_large(dims: [usize; 3], max: usize, voxel_size: f64) -> Self {
        BaseError::GridTooLarge {
            dims,
            total: dims[0] * dims[1] * dims[2],
            max,
            voxel_size,
        }
    }

    /// Create an empty projection error.
    pub fn empty_projection(name: impl Into<String>) -> Self {
        BaseError::EmptyProjection { name: name.into() }
    }
}
