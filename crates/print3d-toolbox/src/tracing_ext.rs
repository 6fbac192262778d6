//! Tracing helpers shared by the operators.
//!
//! Events are emitted under these targets:
//!
//! - `print3d_toolbox::timing`: operation durations
//! - `print3d_toolbox::mesh_state`: mesh dimensions before/after an operator
//! - `print3d_toolbox::report`: check results
//! - `print3d_toolbox::io`: file reads and writes
//!
//! Set `RUST_LOG=print3d_toolbox=debug` to see all of them.

use std::time::Instant;
use tracing::{Span, debug, info, warn};

use crate::report::Report;

/// Logs the duration of an operation when dropped.
///
/// ```rust,ignore
/// fn clean(mesh: &mut Mesh) {
///     let _timer = OperationTimer::new("clean_non_manifold");
///     // ...
/// }
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTimer {
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!("print3d_operation", operation = name);
        debug!(target: "print3d_toolbox::timing", operation = name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Timer whose span also records the mesh size.
    pub fn with_mesh(name: &'static str, mesh: &crate::Mesh) -> Self {
        let span = tracing::info_span!(
            "print3d_operation",
            operation = name,
            faces = mesh.face_count(),
            vertices = mesh.vertex_count()
        );
        debug!(
            target: "print3d_toolbox::timing",
            operation = name,
            faces = mesh.face_count(),
            vertices = mesh.vertex_count(),
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        info!(
            target: "print3d_toolbox::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", self.elapsed_ms()),
            "Operation completed"
        );
    }
}

/// Log mesh dimensions at debug level.
pub fn log_mesh_stats(mesh: &crate::Mesh, context: &str) {
    let (min_bounds, max_bounds) = mesh.bounds().unwrap_or_default();
    let dims = max_bounds - min_bounds;

    debug!(
        target: "print3d_toolbox::mesh_state",
        context = context,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        loose_edges = mesh.loose_edges.len(),
        dimensions = format!("{:.4} x {:.4} x {:.4}", dims.x, dims.y, dims.z),
        "Mesh state"
    );
}

/// Log a finished check run.
pub fn log_report(report: &Report) {
    let flagged = report.flagged_count();
    if flagged == 0 {
        info!(
            target: "print3d_toolbox::report",
            entries = report.entries.len(),
            "No printability issues found"
        );
    } else {
        warn!(
            target: "print3d_toolbox::report",
            entries = report.entries.len(),
            flagged_elements = flagged,
            "Printability issues found"
        );
    }
}

/// Log a file I/O operation.
pub fn log_io_operation(operation: &str, path: &std::path::Path, format: &str) {
    info!(
        target: "print3d_toolbox::io",
        operation = operation,
        path = path.display().to_string(),
        format = format,
        "I/O operation completed"
    );
}

/// Create a span carrying the mesh size.
#[macro_export]
macro_rules! mesh_span {
    ($name:expr, $mesh:expr) => {
        tracing::info_span!(
            $name,
            vertices = $mesh.vertex_count(),
            faces = $mesh.face_count()
        )
    };
}
