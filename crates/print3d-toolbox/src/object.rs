//! Scene objects: meshes placed in the world.

use nalgebra::{Matrix4, Point3, Translation3, UnitQuaternion, Vector3};

use crate::types::{BoundingBox, Mesh};

/// A named mesh with an object transform and a face selection.
#[derive(Debug, Clone)]
pub struct MeshObject {
    pub name: String,
    /// Geometry in object-local space.
    pub mesh: Mesh,
    pub location: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub scale: Vector3<f64>,
    /// Selected face indices, used by face-driven operators.
    pub selected_faces: Vec<usize>,
}

impl MeshObject {
    /// Object at the origin with identity rotation and unit scale.
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            mesh,
            location: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            selected_faces: Vec::new(),
        }
    }

    /// `translation * rotation * scale`.
    pub fn matrix_world(&self) -> Matrix4<f64> {
        Translation3::from(self.location).to_homogeneous()
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// Copy of the mesh in world space.
    pub fn world_mesh(&self) -> Mesh {
        let mut mesh = self.mesh.clone();
        mesh.transform(&self.matrix_world());
        mesh
    }

    /// World-space bounds of the eight local bounding-box corners.
    pub fn world_bounds(&self) -> Option<BoundingBox> {
        let local = self.mesh.bounding_box()?;
        let m = self.matrix_world();
        let corners: Vec<Point3<f64>> = local
            .corners()
            .iter()
            .map(|c| m.transform_point(c))
            .collect();
        BoundingBox::from_points(&corners)
    }

    /// Exact world-space bounds of the vertices.
    pub fn world_vertex_bounds(&self) -> Option<BoundingBox> {
        let m = self.matrix_world();
        let points: Vec<Point3<f64>> = self
            .mesh
            .vertices
            .iter()
            .map(|v| m.transform_point(&v.position))
            .collect();
        BoundingBox::from_points(&points)
    }

    /// Bake the object transform into the mesh and reset it to identity.
    pub fn apply_transform(&mut self) {
        self.mesh = self.world_mesh();
        self.location = Vector3::zeros();
        self.rotation = UnitQuaternion::identity();
        self.scale = Vector3::new(1.0, 1.0, 1.0);
    }
}

/// Interaction mode, mirroring object mode versus mesh edit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Object,
    /// Operators act on the active object's mesh only.
    EditMesh,
}

/// Objects plus selection state.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub objects: Vec<MeshObject>,
    pub selected: Vec<usize>,
    pub active: Option<usize>,
    pub mode: Mode,
}

impl Scene {
    /// Scene with every object selected and the first one active.
    pub fn new(objects: Vec<MeshObject>) -> Self {
        let selected = (0..objects.len()).collect();
        let active = (!objects.is_empty()).then_some(0);
        Self {
            objects,
            selected,
            active,
            mode: Mode::Object,
        }
    }

    pub fn active_object(&self) -> Option<&MeshObject> {
        self.active.and_then(|i| self.objects.get(i))
    }

    pub fn active_object_mut(&mut self) -> Option<&mut MeshObject> {
        self.active.and_then(|i| self.objects.get_mut(i))
    }

    pub fn selected_objects(&self) -> impl Iterator<Item = &MeshObject> {
        self.selected.iter().filter_map(|&i| self.objects.get(i))
    }

    /// Add an object, select it and make it active.
    pub fn add_object(&mut self, object: MeshObject) -> usize {
        self.objects.push(object);
        let idx = self.objects.len() - 1;
        self.selected.push(idx);
        self.active = Some(idx);
        idx
    }

    pub fn find(&self, name: &str) -> Option<&MeshObject> {
        self.objects.iter().find(|o| o.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::make_unit_cube;
    use approx::assert_relative_eq;

    #[test]
    fn test_world_mesh_applies_trs() {
        let mut obj = MeshObject::new("cube", make_unit_cube());
        obj.scale = Vector3::new(2.0, 2.0, 2.0);
        obj.location = Vector3::new(10.0, 0.0, 0.0);
        let world = obj.world_mesh();
        assert_relative_eq!(world.volume(), 8.0, epsilon = 1e-9);
        let bb = world.bounding_box().unwrap();
        assert_relative_eq!(bb.min.x, 10.0);
        assert_relative_eq!(bb.max.x, 12.0);
    }

    #[test]
    fn test_world_bounds_rotated() {
        let mut obj = MeshObject::new("cube", make_unit_cube());
        obj.rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_4);
        let bb = obj.world_bounds().unwrap();
        assert_relative_eq!(bb.extents().x, 2f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(bb.extents().z, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_apply_transform_resets() {
        let mut obj = MeshObject::new("cube", make_unit_cube());
        obj.location = Vector3::new(0.0, 0.0, 3.0);
        obj.apply_transform();
        assert_eq!(obj.location, Vector3::zeros());
        assert_relative_eq!(obj.mesh.bounding_box().unwrap().min.z, 3.0);
    }

    #[test]
    fn test_scene_selection() {
        let mut scene = Scene::new(vec![MeshObject::new("a", Mesh::new())]);
        assert_eq!(scene.active_object().unwrap().name, "a");
        scene.add_object(MeshObject::new("b", Mesh::new()));
        assert_eq!(scene.active_object().unwrap().name, "b");
        assert_eq!(scene.selected_objects().count(), 2);
        assert!(scene.find("c").is_none());
    }
}
