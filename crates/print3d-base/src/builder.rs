//! Fluent builder for vacuum-forming bases.
//!
//! ```no_run
//! use print3d_base::{BaseBuilder, BaseOutcome};
//! use print3d_toolbox::{Mesh, MeshObject};
//!
//! let object = MeshObject::new("part", Mesh::load("part.stl").unwrap());
//! match BaseBuilder::new(&object).thickness(1.0).build().unwrap() {
//!     BaseOutcome::Created(result) => result.object.world_mesh().save("part_base.stl").unwrap(),
//!     BaseOutcome::TooSmall { .. } => eprintln!("object too small"),
//! }
//! ```

use tracing::{error, info, warn};

use print3d_toolbox::transform::{NO_OBJECTS_SELECTED, recenter_origin, unique_name};
use print3d_toolbox::{
    MeshObject, Notice, OperationTimer, OperatorResult, PrintSettings, Scene, log_mesh_stats,
};

use crate::error::{BaseError, BaseResult};
use crate::sheet::{PlaneRect, densified_plane, shrinkwrap_down, trim_above};
use crate::shell::solidify;
use crate::voxel::{RemeshStats, voxel_remesh};

/// Warning for targets whose footprint is below `min_footprint`.
pub const TOO_SMALL: &str = "Selected object width or height too small";

/// Error notice for a base that failed part way through.
pub const CREATION_FAILED: &str = "Bottom mesh creation failed";

/// `bottom_thickness` values at or below this keep the default thickness.
const BOTTOM_THICKNESS_MIN: f64 = 0.05;

/// Parameters for base generation.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseParams {
    /// Cell size of the densified plane and of the final remesh.
    pub voxel_size: f64,
    /// Wall thickness used when `bottom_thickness` does not override it.
    pub thickness: f64,
    /// User-set wall thickness; half of it is used when above 0.05.
    pub bottom_thickness: f64,
    /// Height of the plane above the target's top.
    pub lift: f64,
    /// Plane size relative to the target footprint.
    pub margin: f64,
    /// Smallest accepted footprint extent along x and y.
    pub min_footprint: f64,
    /// Voxel budget for the plane grid and the remesh grid.
    pub max_voxels: usize,
}

impl Default for BaseParams {
    fn default() -> Self {
        Self {
            voxel_size: 0.3,
            thickness: 0.7,
            bottom_thickness: 0.0,
            lift: 5.0,
            margin: 1.1,
            min_footprint: 0.1,
            max_voxels: 50_000_000,
        }
    }
}

impl BaseParams {
    /// Finer voxels for small parts.
    pub fn high_quality() -> Self {
        Self {
            voxel_size: 0.15,
            max_voxels: 80_000_000,
            ..Default::default()
        }
    }

    /// Coarse voxels for quick previews.
    pub fn fast() -> Self {
        Self {
            voxel_size: 0.6,
            ..Default::default()
        }
    }

    /// Defaults with the thickness taken from the toolbox settings.
    pub fn from_settings(settings: &PrintSettings) -> Self {
        Self {
            bottom_thickness: settings.bottom_thickness,
            ..Default::default()
        }
    }

    /// The wall thickness actually applied.
    pub fn effective_thickness(&self) -> f64 {
        if self.bottom_thickness > BOTTOM_THICKNESS_MIN {
            self.bottom_thickness / 2.0
        } else {
            self.thickness
        }
    }

    pub fn validate(&self) -> BaseResult<()> {
        let positive = [
            ("voxel_size", self.voxel_size),
            ("thickness", self.thickness),
            ("margin", self.margin),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(BaseError::invalid_param(
                    name,
                    format!("{} must be a positive number", value),
                ));
            }
        }
        if !self.lift.is_finite() || self.lift < 0.0 {
            return Err(BaseError::invalid_param(
                "lift",
                format!("{} must not be negative", self.lift),
            ));
        }
        Ok(())
    }
}

/// Counts from a successful build.
#[derive(Debug, Clone)]
pub struct BaseStats {
    pub plane_faces: usize,
    pub projected_vertices: usize,
    pub trimmed_faces: usize,
    pub thickness: f64,
    pub remesh: RemeshStats,
}

/// A generated base.
#[derive(Debug, Clone)]
pub struct BaseBuildResult {
    /// `{target}_base`, origin at its bounding-box center.
    pub object: MeshObject,
    pub stats: BaseStats,
}

/// What [`BaseBuilder::build`] produced.
#[derive(Debug, Clone)]
pub enum BaseOutcome {
    Created(Box<BaseBuildResult>),
    /// Footprint below `min_footprint`; nothing was built.
    TooSmall { size_x: f64, size_y: f64 },
}

/// Fluent builder for a single target object.
pub struct BaseBuilder<'a> {
    target: &'a MeshObject,
    params: BaseParams,
}

impl<'a> BaseBuilder<'a> {
    pub fn new(target: &'a MeshObject) -> Self {
        Self {
            target,
            params: BaseParams::default(),
        }
    }

    /// Replace every parameter at once.
    pub fn params(mut self, params: BaseParams) -> Self {
        self.params = params;
        self
    }

    pub fn voxel_size(mut self, size: f64) -> Self {
        self.params.voxel_size = size;
        self
    }

    pub fn thickness(mut self, thickness: f64) -> Self {
        self.params.thickness = thickness;
        self
    }

    /// See [`BaseParams::bottom_thickness`].
    pub fn bottom_thickness(mut self, thickness: f64) -> Self {
        self.params.bottom_thickness = thickness;
        self
    }

    pub fn lift(mut self, lift: f64) -> Self {
        self.params.lift = lift;
        self
    }

    pub fn margin(mut self, margin: f64) -> Self {
        self.params.margin = margin;
        self
    }

    pub fn min_footprint(mut self, extent: f64) -> Self {
        self.params.min_footprint = extent;
        self
    }

    pub fn max_voxels(mut self, max: usize) -> Self {
        self.params.max_voxels = max;
        self
    }

    /// Run the pipeline: plane, densify, shrinkwrap, trim, solidify,
    /// remesh, recenter.
    pub fn build(self) -> BaseResult<BaseOutcome> {
        let params = &self.params;
        params.validate()?;
        let name = &self.target.name;
        let _timer = OperationTimer::new("create_base");

        let bounds = self
            .target
            .world_bounds()
            .ok_or_else(|| BaseError::EmptyTarget { name: name.clone() })?;
        let extents = bounds.extents();
        if extents.x < params.min_footprint || extents.y < params.min_footprint {
            warn!(object = %name, x = extents.x, y = extents.y, "footprint too small");
            return Ok(BaseOutcome::TooSmall {
                size_x: extents.x,
                size_y: extents.y,
            });
        }

        let rect = PlaneRect::above(&bounds, params.margin, params.lift);
        let mut sheet = densified_plane(&rect, params.voxel_size, params.max_voxels)?;
        let plane_faces = sheet.face_count();

        let target = self.target.world_mesh().triangulated().mesh;
        if target.face_count() == 0 {
            return Err(BaseError::EmptyTarget { name: name.clone() });
        }
        let projected_vertices = shrinkwrap_down(&mut sheet, &target);

        let trimmed_faces = trim_above(&mut sheet, bounds.max.z);
        if sheet.face_count() == 0 {
            return Err(BaseError::empty_projection(name.as_str()));
        }

        let thickness = params.effective_thickness();
        let (solid, _) = solidify(&sheet, thickness);
        let (remeshed, remesh) = voxel_remesh(&solid, params.voxel_size, params.max_voxels)?;
        log_mesh_stats(&remeshed, "base");

        let mut object = MeshObject::new(format!("{}_base", name), remeshed);
        recenter_origin(&mut object);

        info!(
            object = %object.name,
            faces = object.mesh.face_count(),
            thickness,
            "base created"
        );

        Ok(BaseOutcome::Created(Box::new(BaseBuildResult {
            object,
            stats: BaseStats {
                plane_faces,
                projected_vertices,
                trimmed_faces,
                thickness,
                remesh,
            },
        })))
    }
}

/// Build a base under every selected object and add it to the scene.
///
/// A target that is too small gets a warning, a target that fails part
/// way gets an error notice; either way the next target is still processed.
pub fn create_bases(scene: &mut Scene, params: &BaseParams) -> OperatorResult {
    if scene.selected.is_empty() {
        return OperatorResult::cancelled(Notice::warning(NO_OBJECTS_SELECTED));
    }

    let targets = scene.selected.clone();
    let mut notices = Vec::new();

    for idx in targets {
        let Some(target) = scene.objects.get(idx) else {
            continue;
        };
        let target_name = target.name.clone();
        let outcome = BaseBuilder::new(target).params(params.clone()).build();
        match outcome {
            Ok(BaseOutcome::Created(result)) => {
                let mut object = result.object;
                object.name = unique_name(scene, &object.name);
                scene.add_object(object);
            }
            Ok(BaseOutcome::TooSmall { .. }) => {
                notices.push(Notice::warning(TOO_SMALL));
            }
            Err(err) => {
                error!(object = %target_name, code = %err.code(), error = %err, "base creation failed");
                notices.push(Notice::error(CREATION_FAILED));
            }
        }
    }

    OperatorResult::finished(notices)
}
