pub mod camera;
pub mod geometry;
pub mod math;
pub mod post;
pub mod raycast;
pub mod scene;
pub mod subset;

pub use camera::{CameraRig, OrbitCamera, Projection};
pub use geometry::{Color, Geometry, Material, MaterialKind, VertexSource};
pub use math::{Aabb, Matrix4, Point3, Quaternion, Ray, Transform, Vector3, point};
pub use post::{PostProcessState, PostProduction};
pub use raycast::{Face, MeshRayCaster, RayHit, RayHitProvider};
pub use scene::{MemoryScene, Node, NodeKind, SceneGraph};
pub use subset::{ElementIdentity, HighlightRequest, SubsetManager};
