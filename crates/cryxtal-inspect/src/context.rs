use cryxtal_base::{Error, Result};
use cryxtal_scene::{CameraRig, ElementIdentity, PostProduction, RayHitProvider, SceneGraph};

pub struct Context<'a> {
    pub scene: &'a mut dyn SceneGraph,
    pub camera: &'a mut dyn CameraRig,
    pub rays: &'a dyn RayHitProvider,
    pub identity: &'a mut dyn ElementIdentity,
    pub post: &'a mut dyn PostProduction,
}

impl<'a> Context<'a> {
    pub fn new(
        scene: &'a mut dyn SceneGraph,
        camera: &'a mut dyn CameraRig,
        rays: &'a dyn RayHitProvider,
        identity: &'a mut dyn ElementIdentity,
        post: &'a mut dyn PostProduction,
    ) -> Self {
        Self {
            scene,
            camera,
            rays,
            identity,
            post,
        }
    }

    pub fn builder() -> ContextBuilder<'a> {
        ContextBuilder::default()
    }
}

#[derive(Default)]
pub struct ContextBuilder<'a> {
    scene: Option<&'a mut dyn SceneGraph>,
    camera: Option<&'a mut dyn CameraRig>,
    rays: Option<&'a dyn RayHitProvider>,
    identity: Option<&'a mut dyn ElementIdentity>,
    post: Option<&'a mut dyn PostProduction>,
}

impl<'a> ContextBuilder<'a> {
    pub fn scene(mut self, scene: &'a mut dyn SceneGraph) -> Self {
        self.scene = Some(scene);
        self
    }

    pub fn camera(mut self, camera: &'a mut dyn CameraRig) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn rays(mut self, rays: &'a dyn RayHitProvider) -> Self {
        self.rays = Some(rays);
        self
    }

    pub fn identity(mut self, identity: &'a mut dyn ElementIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn post(mut self, post: &'a mut dyn PostProduction) -> Self {
        self.post = Some(post);
        self
    }

    pub fn build(self) -> Result<Context<'a>> {
        Ok(Context {
            scene: self.scene.ok_or(Error::MissingCollaborator("scene graph"))?,
            camera: self.camera.ok_or(Error::MissingCollaborator("camera"))?,
            rays: self.rays.ok_or(Error::MissingCollaborator("ray caster"))?,
            identity: self
                .identity
                .ok_or(Error::MissingCollaborator("element identity"))?,
            post: self.post.ok_or(Error::MissingCollaborator("post-production"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryxtal_scene::{MemoryScene, MeshRayCaster, OrbitCamera, PostProcessState, SubsetManager, point};

    #[test]
    fn builder_reports_the_missing_piece() {
        let mut scene = MemoryScene::new();
        let mut camera = OrbitCamera::new(point(0.0, 0.0, 10.0), point(0.0, 0.0, 0.0));
        let rays = MeshRayCaster::new();
        let mut identity = SubsetManager::new();

        let result = Context::builder()
            .scene(&mut scene)
            .camera(&mut camera)
            .rays(&rays)
            .identity(&mut identity)
            .build();
        assert!(matches!(
            result,
            Err(Error::MissingCollaborator("post-production"))
        ));
    }

    #[test]
    fn builder_with_everything_succeeds() {
        let mut scene = MemoryScene::new();
        let mut camera = OrbitCamera::new(point(0.0, 0.0, 10.0), point(0.0, 0.0, 0.0));
        let rays = MeshRayCaster::new();
        let mut identity = SubsetManager::new();
        let mut post = PostProcessState::default();

        let ctx = Context::builder()
            .scene(&mut scene)
            .camera(&mut camera)
            .rays(&rays)
            .identity(&mut identity)
            .post(&mut post)
            .build();
        assert!(ctx.is_ok());
    }
}
