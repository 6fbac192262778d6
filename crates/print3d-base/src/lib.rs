//! Vacuum-forming bases for printable meshes.
//!
//! A base is a thin shell that follows the upper surface of an object, the
//! way a heated sheet drapes over a mould. It is built in stages:
//!
//! 1. a plane slightly larger than the object's footprint is placed above it
//!    and densified into a regular grid,
//! 2. every grid vertex is projected straight down onto the object,
//! 3. vertices that missed are pushed below the floor and the faces they
//!    drag under it are trimmed away,
//! 4. the remaining sheet is given a uniform thickness,
//! 5. the slab is voxel-remeshed to clean up folds at the edges,
//! 6. the result's origin is moved to its bounding-box center.
//!
//! # Quick Start
//!
//! ```no_run
//! use print3d_base::{BaseParams, create_bases};
//! use print3d_toolbox::{Mesh, MeshObject, Scene};
//!
//! let mesh = Mesh::load("mould.stl").unwrap();
//! let mut scene = Scene::new(vec![MeshObject::new("mould", mesh)]);
//!
//! let result = create_bases(&mut scene, &BaseParams::default());
//! for notice in &result.notices {
//!     eprintln!("{}", notice);
//! }
//! if let Some(base) = scene.active_object() {
//!     base.world_mesh().save("mould_base.stl").unwrap();
//! }
//! ```
//!
//! For a single object with custom settings use [`BaseBuilder`].

mod builder;
mod error;
pub mod sheet;
pub mod shell;
pub mod voxel;

pub use builder::{
    BaseBuildResult, BaseBuilder, BaseOutcome, BaseParams, BaseStats, CREATION_FAILED, TOO_SMALL,
    create_bases,
};
pub use error::{BaseError, BaseErrorCode, BaseRecoverySuggestion, BaseResult};
pub use shell::{SolidifyStats, solidify};
pub use voxel::{RemeshStats, voxel_remesh};
