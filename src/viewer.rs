use glam::{Quat, Vec3};

use crate::{
    animation::AnimationMixer,
    asset_pipeline::gltf_asset::GltfAsset,
    camera::Camera,
    config::ViewerConfig,
    controls::OrbitControls,
    lights::SceneLights,
    loader::{AssetLoader, LoadEvent, LoadHandle},
    math::bounds::AABB,
    render_loop::RenderLoop,
    scene_graph::Scene,
};

/// Whatever draws the scene into the window. Detaching releases the surface.
pub trait FrameRenderer {
    fn render(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        lights: &SceneLights,
    ) -> Result<(), wgpu::SurfaceError>;

    fn resize(&mut self, width: u32, height: u32);

    fn detach(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Placement that fits a model's bounds into view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewFit {
    /// Bounds center before scaling.
    pub center: Vec3,
    pub size: Vec3,
    pub scale: f32,
    pub eye: Vec3,
    pub target: Vec3,
}

impl ViewFit {
    /// Model translation that puts the scaled bounds' center at the origin.
    pub fn translation(&self) -> Vec3 {
        -self.center * self.scale
    }
}

pub fn fit_to_view(bounds: &AABB, fit_size: f32, camera_distance: f32) -> ViewFit {
    let center = bounds.center();
    let size = bounds.size();
    let max_dimension = size.max_element();

    let scale = if max_dimension > 0.0 && max_dimension.is_finite() {
        fit_size / max_dimension
    } else {
        log::warn!("Model bounds are degenerate ({size}), leaving it unscaled");
        1.0
    };

    ViewFit {
        center,
        size,
        scale,
        eye: Vec3::new(0.0, center.y, center.z + camera_distance),
        target: Vec3::new(0.0, center.y, 0.0),
    }
}

/// Owns everything the load completion and the frame tick share.
pub struct Viewer<R: FrameRenderer> {
    config: ViewerConfig,

    pub scene: Scene,
    pub camera: Camera,
    pub controls: OrbitControls,
    pub lights: SceneLights,

    mixer: Option<AnimationMixer>,

    load: Option<LoadHandle>,
    load_state: LoadState,

    render_loop: RenderLoop,
    renderer: Option<R>,
    viewport: (u32, u32),
}

impl<R: FrameRenderer> Viewer<R> {
    pub fn new(config: ViewerConfig, width: u32, height: u32) -> Self {
        let camera = Camera::from_config(&config, width, height);
        let controls = OrbitControls::new(Vec3::ZERO).with_damping(config.damping_factor);
        let lights = SceneLights::from_config(&config);

        Self {
            config,
            scene: Scene::new(),
            camera,
            controls,
            lights,
            mixer: None,
            load: None,
            load_state: LoadState::Idle,
            render_loop: RenderLoop::new(),
            renderer: None,
            viewport: (width, height),
        }
    }

    /// Attaches the renderer and starts the render loop.
    pub fn mount(&mut self, renderer: R) {
        self.renderer = Some(renderer);
        self.render_loop.start();
    }

    pub fn start_loading(&mut self, loader: &impl AssetLoader) {
        log::info!("Loading {}", self.config.model_path.display());
        self.load = Some(loader.load(&self.config.model_path));
        self.load_state = LoadState::Loading;
    }

    pub fn poll_load(&mut self) {
        let Some(load) = self.load.as_mut() else {
            return;
        };

        let events = load.poll();
        if load.is_finished() {
            self.load = None;
        }

        for event in events {
            self.handle_load_event(event);
        }
    }

    pub fn handle_load_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Progress(progress) => {
                log::info!("{:.0}% loaded", progress.fraction() * 100.0);
            }
            LoadEvent::Loaded(asset) => {
                self.on_model_loaded(asset);
                self.load_state = LoadState::Loaded;
            }
            LoadEvent::Failed(error) => {
                log::error!("An error occurred while loading the model: {error:#}");
                self.load_state = LoadState::Failed;
            }
        }
    }

    fn on_model_loaded(&mut self, asset: GltfAsset) {
        let name = asset.name.clone();
        let spawned = self.scene.spawn_gltf_asset(asset);
        let root = spawned.root;

        let bounds = self.scene.compute_bounding_box(root);
        let fit = fit_to_view(&bounds, self.config.fit_size, self.config.camera_distance);

        self.scene.set_object_transform(
            root,
            fit.translation(),
            Quat::IDENTITY,
            Vec3::splat(fit.scale),
        );

        self.camera.eye = fit.eye;
        self.camera.look_at(fit.target);
        self.controls.target = fit.target;
        self.controls.update(&mut self.camera);

        let clip_count = spawned.clips.len();
        if clip_count > 0 {
            let mut mixer = AnimationMixer::new();

            for clip in spawned.clips {
                let action = mixer.clip_action(clip, &spawned.node_objects);
                if let Some(action) = mixer.action_mut(action) {
                    action.play();
                }
            }

            self.mixer = Some(mixer);
        }

        log::info!(
            "Loaded {name}: size {}, scale {:.4}, {clip_count} animation clip(s)",
            fit.size,
            fit.scale
        );
    }

    /// One frame of the render loop with the given time step.
    pub fn frame(&mut self, delta: f32) -> Result<(), wgpu::SurfaceError> {
        self.poll_load();

        if let Some(mixer) = self.mixer.as_mut() {
            mixer.update(delta, &mut self.scene);
        }

        self.controls.update(&mut self.camera);
        self.scene.update_transforms();

        match self.renderer.as_mut() {
            Some(renderer) => renderer.render(&self.scene, &self.camera, &self.lights),
            None => Ok(()),
        }
    }

    /// Runs a render loop iteration if the loop is still running:
    /// `reschedule` arms the next one before the frame is produced.
    pub fn run_frame(
        &mut self,
        reschedule: impl FnOnce(),
    ) -> Option<Result<(), wgpu::SurfaceError>> {
        let delta = self.render_loop.run_frame(reschedule, |delta| delta)?;
        Some(self.frame(delta))
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.viewport = (width, height);
        self.camera.set_aspect(width, height);

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(width, height);
        }
    }

    /// Stops the render loop, cancels any in-flight load and detaches the
    /// renderer. Safe to call more than once.
    pub fn teardown(&mut self) {
        self.render_loop.stop();

        if let Some(load) = self.load.take() {
            load.cancel();
        }

        if let Some(mut renderer) = self.renderer.take() {
            renderer.detach();
            log::info!(
                "Viewer detached after {} frames (model {:?})",
                self.render_loop.frames(),
                self.load_state
            );
        }
    }

    pub fn viewport_height(&self) -> f32 {
        self.viewport.1 as f32
    }

    #[cfg(test)]
    pub fn mixer(&self) -> Option<&AnimationMixer> {
        self.mixer.as_ref()
    }

    #[cfg(test)]
    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.render_loop.is_running()
    }

    #[cfg(test)]
    pub fn renderer(&self) -> Option<&R> {
        self.renderer.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::Cell,
        path::Path,
        rc::Rc,
        sync::{atomic::AtomicBool, mpsc, Arc},
        time::{Duration, Instant},
    };

    use super::*;
    use crate::{
        loader::GltfLoader,
        scene_graph::ObjectId,
        test_util::{box_asset, capture_logs, captured_logs, write_triangle_gltf},
    };

    #[derive(Default)]
    struct Counters {
        renders: Cell<usize>,
        detaches: Cell<usize>,
    }

    struct MockRenderer(Rc<Counters>);

    impl FrameRenderer for MockRenderer {
        fn render(&mut self, _: &Scene, _: &Camera, _: &SceneLights) -> Result<(), wgpu::SurfaceError> {
            self.0.renders.set(self.0.renders.get() + 1);
            Ok(())
        }

        fn resize(&mut self, _width: u32, _height: u32) {}

        fn detach(&mut self) {
            self.0.detaches.set(self.0.detaches.get() + 1);
        }
    }

    /// Loader that hands out a fixed sequence of events.
    struct ScriptedLoader(std::cell::RefCell<Vec<LoadEvent>>);

    impl ScriptedLoader {
        fn new(events: Vec<LoadEvent>) -> Self {
            Self(std::cell::RefCell::new(events))
        }
    }

    impl AssetLoader for ScriptedLoader {
        fn load(&self, _path: &Path) -> LoadHandle {
            let (sender, receiver) = mpsc::channel();
            for event in self.0.borrow_mut().drain(..) {
                let _ = sender.send(event);
            }
            LoadHandle::new(receiver, Arc::new(AtomicBool::new(false)))
        }
    }

    fn mounted_viewer() -> (Viewer<MockRenderer>, Rc<Counters>) {
        let counters = Rc::new(Counters::default());
        let mut viewer = Viewer::new(ViewerConfig::default(), 800, 600);
        viewer.mount(MockRenderer(counters.clone()));
        (viewer, counters)
    }

    /// The loaded model's root, the only parentless object in the scene.
    fn model_root(viewer: &Viewer<MockRenderer>) -> Option<ObjectId> {
        viewer
            .scene
            .objects
            .iter()
            .find(|(_, object)| object.parent_id.is_none())
            .map(|(id, _)| id)
    }

    fn load_box(viewer: &mut Viewer<MockRenderer>, min: Vec3, max: Vec3, clips: usize) {
        viewer.handle_load_event(LoadEvent::Loaded(box_asset(min, max, clips)));
    }

    #[test]
    fn fit_scales_largest_dimension_to_five_units() {
        let bounds = AABB::new(Vec3::new(-1.0, 0.0, -2.0), Vec3::new(3.0, 4.0, 6.0));

        let fit = fit_to_view(&bounds, 5.0, 10.0);

        assert_eq!(fit.scale, 5.0 / 8.0);
        assert_eq!(fit.center, Vec3::new(1.0, 2.0, 2.0));
        assert_eq!(fit.eye, Vec3::new(0.0, 2.0, 12.0));
        assert_eq!(fit.target, Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn degenerate_bounds_keep_unit_scale() {
        capture_logs();

        let fit = fit_to_view(&AABB::new(Vec3::ONE, Vec3::ONE), 5.0, 10.0);

        assert_eq!(fit.scale, 1.0);
        assert_eq!(captured_logs(log::Level::Warn).len(), 1);
        assert!(fit.translation().is_finite());
    }

    #[test]
    fn loaded_model_is_scaled_and_centered() {
        let (mut viewer, _) = mounted_viewer();
        let min = Vec3::new(-1.0, 0.0, -2.0);
        let max = Vec3::new(3.0, 4.0, 6.0);

        load_box(&mut viewer, min, max, 0);

        let root = model_root(&viewer).unwrap();
        let transform = viewer.scene.get_object_transform(root).unwrap();
        assert_eq!(transform.scale(), Vec3::splat(5.0 / 8.0));

        let bounds = viewer.scene.compute_bounding_box(root);
        assert!(bounds.center().length() < 1e-5);
        assert!((bounds.size().max_element() - 5.0).abs() < 1e-5);
        assert_eq!(viewer.load_state(), LoadState::Loaded);
    }

    #[test]
    fn camera_and_orbit_target_follow_pre_scale_center() {
        let (mut viewer, _) = mounted_viewer();

        load_box(&mut viewer, Vec3::new(-1.0, 0.0, -2.0), Vec3::new(3.0, 4.0, 6.0), 0);

        // Center is (1, 2, 2)
        assert!(viewer.camera.eye.distance(Vec3::new(0.0, 2.0, 12.0)) < 1e-4);
        assert_eq!(viewer.camera.target, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(viewer.controls.target, Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn no_clips_means_no_mixer() {
        let (mut viewer, counters) = mounted_viewer();

        load_box(&mut viewer, Vec3::ZERO, Vec3::ONE, 0);
        viewer.frame(0.016).unwrap();
        viewer.frame(0.016).unwrap();

        assert!(viewer.mixer().is_none());
        assert_eq!(counters.renders.get(), 2);
    }

    #[test]
    fn every_clip_is_started_and_advanced_per_frame() {
        let (mut viewer, _) = mounted_viewer();

        load_box(&mut viewer, Vec3::ZERO, Vec3::ONE, 3);
        let mixer = viewer.mixer().unwrap();
        assert_eq!(mixer.actions().count(), 3);
        assert!(mixer.actions().all(|action| action.is_playing()));

        viewer.frame(0.016).unwrap();

        let mixer = viewer.mixer().unwrap();
        assert!((mixer.time() - 0.016).abs() < 1e-7);
        assert!(mixer
            .actions()
            .all(|action| (action.time() - 0.016).abs() < 1e-7));
    }

    #[test]
    fn failed_load_logs_once_and_leaves_scene_empty() {
        capture_logs();
        let (mut viewer, counters) = mounted_viewer();
        let loader = ScriptedLoader::new(vec![LoadEvent::Failed(anyhow::anyhow!("404"))]);

        viewer.start_loading(&loader);
        viewer.frame(0.016).unwrap();
        viewer.frame(0.016).unwrap();

        let errors = captured_logs(log::Level::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("404"));
        assert_eq!(viewer.load_state(), LoadState::Failed);
        assert_eq!(viewer.scene.model_object_count(), 0);
        assert_eq!(viewer.scene.objects.len(), 0);
        assert!(model_root(&viewer).is_none());
        assert_eq!(counters.renders.get(), 2);
    }

    #[test]
    fn progress_events_only_log() {
        capture_logs();
        let (mut viewer, _) = mounted_viewer();
        let loader = ScriptedLoader::new(vec![LoadEvent::Progress(crate::loader::LoadProgress {
            loaded: 1,
            total: 4,
        })]);

        viewer.start_loading(&loader);
        viewer.frame(0.016).unwrap();

        assert_eq!(viewer.load_state(), LoadState::Loading);
        assert!(captured_logs(log::Level::Info)
            .iter()
            .any(|message| message == "25% loaded"));
    }

    #[test]
    fn teardown_detaches_once_and_stops_the_loop() {
        let (mut viewer, counters) = mounted_viewer();
        let reschedules = Cell::new(0);

        assert!(viewer.run_frame(|| reschedules.set(reschedules.get() + 1)).is_some());

        viewer.teardown();
        viewer.teardown();

        assert_eq!(counters.detaches.get(), 1);
        assert!(viewer.renderer().is_none());
        assert!(!viewer.is_running());
        assert!(viewer.run_frame(|| reschedules.set(reschedules.get() + 1)).is_none());
        assert_eq!(reschedules.get(), 1);
        assert_eq!(counters.renders.get(), 1);
    }

    #[test]
    fn teardown_cancels_inflight_load() {
        let (mut viewer, _) = mounted_viewer();
        let (_sender, receiver) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));

        struct PendingLoader(std::cell::RefCell<Option<LoadHandle>>);
        impl AssetLoader for PendingLoader {
            fn load(&self, _path: &Path) -> LoadHandle {
                self.0.borrow_mut().take().unwrap()
            }
        }

        let loader = PendingLoader(std::cell::RefCell::new(Some(LoadHandle::new(
            receiver,
            cancelled.clone(),
        ))));
        viewer.start_loading(&loader);

        viewer.teardown();

        assert!(cancelled.load(std::sync::atomic::Ordering::Relaxed));
    }

    #[test]
    fn resize_updates_aspect() {
        let (mut viewer, _) = mounted_viewer();

        viewer.resize(1000, 500);
        assert_eq!(viewer.camera.aspect, 2.0);
        assert_eq!(viewer.viewport_height(), 500.0);

        viewer.resize(0, 0);
        assert_eq!(viewer.camera.aspect, 2.0);
    }

    #[test]
    fn loads_real_gltf_through_worker_thread() {
        let path = write_triangle_gltf("viewer-triangle");
        let config = ViewerConfig {
            model_path: path,
            ..Default::default()
        };
        let mut viewer: Viewer<MockRenderer> = Viewer::new(config, 800, 600);
        viewer.mount(MockRenderer(Rc::new(Counters::default())));

        viewer.start_loading(&GltfLoader);

        let deadline = Instant::now() + Duration::from_secs(10);
        while viewer.load_state() == LoadState::Loading && Instant::now() < deadline {
            viewer.frame(0.0).unwrap();
            std::thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(viewer.load_state(), LoadState::Loaded);
        // Triangle spans (0,0,0)..(2,1,0)
        let root = model_root(&viewer).unwrap();
        assert_eq!(
            viewer.scene.get_object_transform(root).unwrap().scale(),
            Vec3::splat(2.5)
        );
        assert!(viewer.camera.eye.distance(Vec3::new(0.0, 0.5, 10.0)) < 1e-4);
        assert_eq!(viewer.mixer().unwrap().actions().count(), 1);
    }
}
