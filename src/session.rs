//! The AR session context shared by the sensor, UI and render threads.
//!
//! All mutable state lives behind one mutex. Sensor callbacks only store the
//! latest sample, the UI only edits the selection and raises request flags,
//! and the render thread alone runs capture and merge from [`ArSession::render_tick`].
//! Request flags are levels: two requests before a tick produce one capture.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::camera_model::{DeviceExtrinsics, Intrinsics};
use crate::capture::capture;
use crate::config::SessionConfig;
use crate::error::CaptureError;
use crate::keyframe::{Keyframe, KeyframeStore, MergeResult, RawPointCloud};
use crate::region::{DragSelection, Resolution, SelectionRegion};
use crate::types::{FramePair, Pose, PoseData, RenderPose};

/// Motion-tracking and depth-sensing service.
pub trait SensorProvider: Send + Sync {
    /// Color camera intrinsics, `None` until the service is ready.
    fn intrinsics(&self) -> Option<Intrinsics>;

    fn pose_at_time(&self, timestamp: f64, frames: FramePair) -> PoseData;

    /// Binds the renderer texture the color camera streams into.
    fn connect_texture(&self, texture_id: u32);

    /// Latches the newest color frame into the connected texture, returns its timestamp.
    fn update_texture(&self) -> f64;

    fn disconnect(&self) {}
}

/// Scene that shows the camera feed and the captured clouds.
///
/// Only called from the render thread.
pub trait SceneRenderer {
    fn update_point_cloud(&mut self, cloud: &RawPointCloud, world_t_depth: &Pose);
    fn add_keyframe(&mut self, index: usize, keyframe: &Keyframe);
    fn add_bounding_box(&mut self, merge: &MergeResult);
    fn set_camera_pose(&mut self, pose: &RenderPose);
    fn configure_camera(&mut self, intrinsics: &Intrinsics, near: f64, far: f64);
    fn set_point_cloud_visible(&mut self, visible: bool);

    /// Texture the color camera should stream into, if the renderer has one.
    fn texture_id(&self) -> Option<u32> {
        None
    }
}

/// What happened to the pending requests during one render tick.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Index of the new keyframe.
    pub capture: Option<Result<usize, CaptureError>>,
    pub merge: Option<Result<MergeResult, CaptureError>>,
}

#[derive(Debug, Clone, Copy)]
struct Connection {
    intrinsics: Intrinsics,
    extrinsics: DeviceExtrinsics,
}

struct SessionState {
    connection: Option<Connection>,
    /// Committed drag rectangle in UI pixels, `None` accepts everything.
    ui_region: Option<SelectionRegion>,
    /// `ui_region` rescaled to the depth resolution.
    region: SelectionRegion,
    drag: DragSelection,
    capture_requested: bool,
    merge_requested: bool,
    latest_cloud: Option<Arc<RawPointCloud>>,
    /// Device pose at the timestamp of the last cloud pushed to the renderer.
    cloud_pose: Option<(f64, Pose)>,
    keyframes: KeyframeStore,
    camera_configured: bool,
    connected_texture_id: Option<u32>,
    rgb_timestamp: f64,
    camera_pose_timestamp: f64,
    render_pose: Option<RenderPose>,
    point_cloud_visible: bool,
    visibility_dirty: bool,
    last_merge: Option<MergeResult>,
}

impl SessionState {
    fn new() -> SessionState {
        SessionState {
            connection: None,
            ui_region: None,
            region: SelectionRegion::UNBOUNDED,
            drag: DragSelection::new(),
            capture_requested: false,
            merge_requested: false,
            latest_cloud: None,
            cloud_pose: None,
            keyframes: KeyframeStore::new(),
            camera_configured: false,
            connected_texture_id: None,
            rgb_timestamp: 0.0,
            camera_pose_timestamp: 0.0,
            render_pose: None,
            point_cloud_visible: true,
            visibility_dirty: false,
            last_merge: None,
        }
    }

    fn drop_connection(&mut self) {
        self.connection = None;
        self.latest_cloud = None;
        self.cloud_pose = None;
        self.capture_requested = false;
        self.merge_requested = false;
        // the renderer may hand out a new texture after resume
        self.connected_texture_id = None;
        self.camera_configured = false;
    }

    /// Depth resolution the selection is rescaled to: the sensor's once
    /// connected, the configured fallback before that.
    fn depth_resolution(&self, config: &SessionConfig) -> Resolution {
        self.connection
            .map(|c| Resolution::new(c.intrinsics.width, c.intrinsics.height))
            .unwrap_or(config.depth_resolution)
    }

    fn rescale_selection(&mut self, config: &SessionConfig) -> SelectionRegion {
        let target = self.depth_resolution(config);
        self.region = match self.ui_region {
            Some(ui_region) => {
                let region = ui_region.rescale(config.ui_resolution, target);
                log::debug!(
                    "selection {:?}..{:?} -> {:?}..{:?}",
                    ui_region.min,
                    ui_region.max,
                    region.min,
                    region.max
                );
                region
            }
            None => SelectionRegion::UNBOUNDED,
        };
        self.region
    }

    fn update_render_pose<R: SceneRenderer + ?Sized>(&mut self, renderer: &mut R, pose: &Pose) {
        let render_pose = RenderPose::from_pose(pose);
        renderer.set_camera_pose(&render_pose);
        self.render_pose = Some(render_pose);
    }

    fn pre_frame<S, R>(
        &mut self,
        sensor: &S,
        frame_available: &AtomicBool,
        config: &SessionConfig,
        connection: &Connection,
        renderer: &mut R,
    ) where
        S: SensorProvider + ?Sized,
        R: SceneRenderer + ?Sized,
    {
        if let Some(cloud) = self.latest_cloud.clone() {
            let fresh = self.cloud_pose.is_none_or(|(t, _)| t != cloud.timestamp);
            if fresh {
                match sensor
                    .pose_at_time(cloud.timestamp, FramePair::WORLD_FROM_DEVICE)
                    .into_valid()
                {
                    Ok(pose) => {
                        self.cloud_pose = Some((cloud.timestamp, pose));
                        let world_t_depth = connection.extrinsics.world_t_depth(&pose);
                        renderer.update_point_cloud(&cloud, &world_t_depth);
                    }
                    Err(e) => log::warn!("keeping previous point cloud pose: {}", e),
                }
            }
        }

        if !self.camera_configured {
            renderer.configure_camera(&connection.intrinsics, config.camera_near, config.camera_far);
            self.camera_configured = true;
        }

        if let Some(texture_id) = renderer.texture_id() {
            if self.connected_texture_id != Some(texture_id) {
                sensor.connect_texture(texture_id);
                self.connected_texture_id = Some(texture_id);
                log::debug!("connected to texture id: {}", texture_id);
            }
        }

        if frame_available
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.rgb_timestamp = sensor.update_texture();
        }

        if self.rgb_timestamp > self.camera_pose_timestamp {
            match sensor
                .pose_at_time(self.rgb_timestamp, FramePair::WORLD_FROM_COLOR)
                .into_valid()
            {
                Ok(pose) => {
                    self.update_render_pose(renderer, &pose);
                    self.camera_pose_timestamp = self.rgb_timestamp;
                }
                Err(_) => log::warn!("can't get camera pose at time: {}", self.rgb_timestamp),
            }
        }

        if self.visibility_dirty {
            renderer.set_point_cloud_visible(self.point_cloud_visible);
            self.visibility_dirty = false;
        }
    }

    fn run_capture<R: SceneRenderer + ?Sized>(
        &mut self,
        connection: &Connection,
        renderer: &mut R,
    ) -> Result<usize, CaptureError> {
        let cloud = self
            .latest_cloud
            .clone()
            .ok_or(CaptureError::ResourceUnavailable("no point cloud received yet"))?;
        let pose = match self.cloud_pose {
            Some((t, pose)) if t == cloud.timestamp => pose,
            _ => {
                return Err(CaptureError::InvalidPose {
                    timestamp: cloud.timestamp,
                });
            }
        };
        let out = capture(
            &cloud,
            &pose,
            &connection.extrinsics,
            &connection.intrinsics,
            &self.region,
        );
        let index = self.keyframes.push(out.keyframe);
        if let Some(keyframe) = self.keyframes.get(index) {
            renderer.add_keyframe(index, keyframe);
        }
        Ok(index)
    }

    fn run_merge<R: SceneRenderer + ?Sized>(
        &mut self,
        renderer: &mut R,
    ) -> Result<MergeResult, CaptureError> {
        let merged = self.keyframes.merge()?;
        renderer.add_bounding_box(&merged);
        self.last_merge = Some(merged);
        Ok(merged)
    }
}

/// One AR session: created at start, torn down at end under the same lock
/// the render thread holds while it works.
pub struct ArSession<S> {
    config: SessionConfig,
    sensor: S,
    state: Mutex<SessionState>,
    frame_available: AtomicBool,
}

impl<S: SensorProvider> ArSession<S> {
    pub fn new(config: SessionConfig, sensor: S) -> ArSession<S> {
        ArSession {
            config,
            sensor,
            state: Mutex::new(SessionState::new()),
            frame_available: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Reads intrinsics and extrinsics from the sensor.
    pub fn connect(&self) -> Result<(), CaptureError> {
        let mut state = self.lock();
        let intrinsics = self
            .sensor
            .intrinsics()
            .ok_or(CaptureError::ResourceUnavailable("sensor intrinsics"))?;
        let extrinsics = DeviceExtrinsics::query(|t, frames| self.sensor.pose_at_time(t, frames))?;
        log::info!(
            "connected: {}x{} fx {:.2} fy {:.2}",
            intrinsics.width,
            intrinsics.height,
            intrinsics.fx,
            intrinsics.fy
        );
        state.connection = Some(Connection {
            intrinsics,
            extrinsics,
        });
        state.camera_configured = false;
        state.rescale_selection(&self.config);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connection.is_some()
    }

    /// Stops using the sensor. Keyframes are kept so the session can resume.
    pub fn disconnect(&self) {
        let mut state = self.lock();
        state.drop_connection();
        self.sensor.disconnect();
        log::info!("disconnected");
    }

    /// Ends the session and hands back every keyframe it captured.
    pub fn teardown(&self) -> Vec<Keyframe> {
        let mut state = self.lock();
        if state.connection.is_some() {
            self.sensor.disconnect();
        }
        state.drop_connection();
        state.last_merge = None;
        let keyframes = std::mem::take(&mut state.keyframes).into_vec();
        log::info!("teardown with {} keyframes", keyframes.len());
        keyframes
    }

    // sensor thread

    /// Stores the newest depth sample. Never runs capture.
    pub fn on_point_cloud_available(&self, cloud: RawPointCloud) {
        self.lock().latest_cloud = Some(Arc::new(cloud));
    }

    /// Marks a new color frame for the next render tick. Does not lock.
    pub fn on_frame_available(&self) {
        self.frame_available.store(true, Ordering::Release);
    }

    pub fn latest_point_cloud(&self) -> Option<Arc<RawPointCloud>> {
        self.lock().latest_cloud.clone()
    }

    // UI thread

    pub fn begin_drag_selection(&self) {
        self.lock().drag.begin();
    }

    pub fn record_drag_point(&self, x: i32, y: i32) {
        self.lock().drag.record(x, y);
    }

    /// Installs the bounding rectangle of the recorded drag as the active
    /// selection, rescaled from the UI to the depth resolution.
    ///
    /// The UI rectangle is kept and rescaled again on the next `connect`, so a
    /// selection made before the sensor reports its intrinsics still lands in
    /// depth pixels. An empty drag resets the selection to accept everything.
    pub fn commit_selection(&self) -> SelectionRegion {
        let mut state = self.lock();
        state.ui_region = state.drag.commit();
        state.rescale_selection(&self.config)
    }

    pub fn selection(&self) -> SelectionRegion {
        self.lock().region
    }

    pub fn request_capture(&self) {
        self.lock().capture_requested = true;
    }

    pub fn request_merge(&self) {
        self.lock().merge_requested = true;
    }

    pub fn toggle_visibility(&self) -> bool {
        let mut state = self.lock();
        state.point_cloud_visible = !state.point_cloud_visible;
        state.visibility_dirty = true;
        state.point_cloud_visible
    }

    // render thread

    /// Synchronizes the renderer with the sensor, then serves at most one
    /// capture and one merge request.
    ///
    /// Requests made while disconnected are dropped with `ResourceUnavailable`.
    pub fn render_tick<R: SceneRenderer + ?Sized>(&self, renderer: &mut R) -> TickOutcome {
        let mut state = self.lock();
        let mut outcome = TickOutcome::default();

        let Some(connection) = state.connection else {
            if std::mem::take(&mut state.capture_requested) {
                log::warn!("capture ignored, session not connected");
                outcome.capture = Some(Err(CaptureError::ResourceUnavailable("session not connected")));
            }
            if std::mem::take(&mut state.merge_requested) {
                log::warn!("merge ignored, session not connected");
                outcome.merge = Some(Err(CaptureError::ResourceUnavailable("session not connected")));
            }
            return outcome;
        };

        log::trace!("render tick");
        state.pre_frame(
            &self.sensor,
            &self.frame_available,
            &self.config,
            &connection,
            renderer,
        );

        if std::mem::take(&mut state.capture_requested) {
            let result = state.run_capture(&connection, renderer);
            match &result {
                Ok(index) => log::debug!("keyframe {} done", index),
                Err(e) => log::warn!("capture failed: {}", e),
            }
            outcome.capture = Some(result);
        }

        if std::mem::take(&mut state.merge_requested) {
            let result = state.run_merge(renderer);
            if let Err(e) = &result {
                log::warn!("merge failed: {}", e);
            }
            outcome.merge = Some(result);
        }

        outcome
    }

    /// Replaces the render camera with `pose`. Render thread only.
    pub fn update_render_pose<R: SceneRenderer + ?Sized>(&self, renderer: &mut R, pose: &Pose) {
        self.lock().update_render_pose(renderer, pose);
    }

    pub fn render_pose(&self) -> Option<RenderPose> {
        self.lock().render_pose
    }

    pub fn keyframe_count(&self) -> usize {
        self.lock().keyframes.len()
    }

    pub fn keyframes(&self) -> Vec<Keyframe> {
        self.lock().keyframes.as_slice().to_vec()
    }

    pub fn last_merge(&self) -> Option<MergeResult> {
        self.lock().last_merge
    }
}
