//! Defect reports.
//!
//! A [`Report`] is the value returned by a check run: an ordered list of
//! messages, each optionally pointing at the mesh elements it talks about.
//! Selectors carry the [`TopologyKey`] of the mesh they were computed on, so
//! resolving one against an edited mesh is detected instead of selecting the
//! wrong elements.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::adjacency::{EdgeTable, TopologyKey};
use crate::error::{PrintError, PrintResult};
use crate::types::Mesh;

/// Warning shown when a selector no longer matches the mesh.
pub const STALE_REPORT: &str = "report is stale, re-run checks";

/// Kind of mesh element a selector refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Vertex,
    Edge,
    Face,
}

/// Elements flagged by a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    pub kind: ElementKind,
    /// Element indices in ascending order. Edge indices follow
    /// [`EdgeTable`] order.
    pub indices: Vec<usize>,
    pub topology: TopologyKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub message: String,
    pub selector: Option<Selector>,
}

impl ReportEntry {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            selector: None,
        }
    }

    pub fn with_elements(
        message: impl Into<String>,
        kind: ElementKind,
        indices: Vec<usize>,
        topology: TopologyKey,
    ) -> Self {
        Self {
            message: message.into(),
            selector: Some(Selector {
                kind,
                indices,
                topology,
            }),
        }
    }
}

/// Result of resolving a report entry against a mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The entry has nothing to select.
    Nothing,
    /// The selector does not fit the mesh any more.
    Stale,
    Elements {
        kind: ElementKind,
        indices: Vec<usize>,
    },
}

/// Ordered check results for one object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Name of the evaluated object.
    pub object: Option<String>,
    pub entries: Vec<ReportEntry>,
}

impl Report {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: Some(object.into()),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of flagged elements over all entries.
    pub fn flagged_count(&self) -> usize {
        self.entries
            .iter()
            .filter_map(|e| e.selector.as_ref())
            .map(|s| s.indices.len())
            .sum()
    }

    /// Resolve entry `index` against `mesh`.
    pub fn select(&self, index: usize, mesh: &Mesh) -> PrintResult<Selection> {
        let entry = self
            .entries
            .get(index)
            .ok_or(PrintError::ReportIndexOutOfRange {
                index,
                len: self.entries.len(),
            })?;
        let Some(selector) = &entry.selector else {
            return Ok(Selection::Nothing);
        };

        if selector.topology != TopologyKey::of(mesh) {
            tracing::warn!(entry = index, "{}", STALE_REPORT);
            return Ok(Selection::Stale);
        }

        let limit = match selector.kind {
            ElementKind::Vertex => mesh.vertex_count(),
            ElementKind::Edge => EdgeTable::build(mesh).edge_count(),
            ElementKind::Face => mesh.face_count(),
        };
        if selector.indices.iter().any(|&i| i >= limit) {
            tracing::warn!(entry = index, "{}", STALE_REPORT);
            return Ok(Selection::Stale);
        }

        Ok(Selection::Elements {
            kind: selector.kind,
            indices: selector.indices.clone(),
        })
    }

    pub fn to_json(&self) -> PrintResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PrintError::ReportFormat {
            details: e.to_string(),
        })
    }

    pub fn from_json(text: &str) -> PrintResult<Self> {
        serde_json::from_str(text).map_err(|e| PrintError::ReportFormat {
            details: e.to_string(),
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> PrintResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|e| PrintError::io_write(path, e))
    }

    pub fn load(path: impl AsRef<Path>) -> PrintResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| PrintError::io_read(path, e))?;
        Self::from_json(&text)
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(name) = &self.object {
            writeln!(f, "{}:", name)?;
        }
        for (i, entry) in self.entries.iter().enumerate() {
            writeln!(f, "  [{}] {}", i, entry.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::make_unit_cube;

    fn sample(mesh: &Mesh) -> Report {
        let mut report = Report::new("cube");
        report.push(ReportEntry::with_elements(
            "Zero Faces: 1",
            ElementKind::Face,
            vec![5],
            TopologyKey::of(mesh),
        ));
        report.push(ReportEntry::text("Skipping Overhang"));
        report
    }

    #[test]
    fn test_select_resolves_elements() {
        let cube = make_unit_cube();
        let report = sample(&cube);
        assert_eq!(
            report.select(0, &cube).unwrap(),
            Selection::Elements {
                kind: ElementKind::Face,
                indices: vec![5]
            }
        );
        assert_eq!(report.select(1, &cube).unwrap(), Selection::Nothing);
        assert_eq!(report.flagged_count(), 1);
    }

    #[test]
    fn test_select_detects_stale_topology() {
        let cube = make_unit_cube();
        let report = sample(&cube);
        let mut edited = cube.clone();
        edited.faces.pop();
        assert_eq!(report.select(0, &edited).unwrap(), Selection::Stale);

        // moving vertices keeps the report valid
        let mut moved = cube.clone();
        moved.scale(2.0);
        assert!(matches!(
            report.select(0, &moved).unwrap(),
            Selection::Elements { .. }
        ));
    }

    #[test]
    fn test_out_of_range_index_is_stale() {
        let cube = make_unit_cube();
        let mut report = Report::default();
        report.push(ReportEntry::with_elements(
            "Sharp Edge: 1",
            ElementKind::Edge,
            vec![12],
            TopologyKey::of(&cube),
        ));
        assert_eq!(report.select(0, &cube).unwrap(), Selection::Stale);
    }

    #[test]
    fn test_missing_entry_is_an_error() {
        let cube = make_unit_cube();
        let err = sample(&cube).select(7, &cube).unwrap_err();
        assert!(matches!(
            err,
            PrintError::ReportIndexOutOfRange { index: 7, len: 2 }
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let cube = make_unit_cube();
        let report = sample(&cube);
        let back = Report::from_json(&report.to_json().unwrap()).unwrap();
        assert_eq!(back, report);
        assert!(Report::from_json("{not json").is_err());
    }
}
