use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, TryRecvError},
        Arc,
    },
};

use anyhow::Context;

use crate::asset_pipeline::gltf_asset::GltfAsset;

const READ_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl LoadProgress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }

        (self.loaded as f64 / self.total as f64) as f32
    }
}

pub enum LoadEvent {
    Progress(LoadProgress),
    Loaded(GltfAsset),
    Failed(anyhow::Error),
}

impl LoadEvent {
    pub fn is_final(&self) -> bool {
        !matches!(self, LoadEvent::Progress(_))
    }
}

/// Receiving end of an in-flight load. Dropping the handle cancels the load.
pub struct LoadHandle {
    receiver: mpsc::Receiver<LoadEvent>,
    cancelled: Arc<AtomicBool>,
    finished: bool,
}

impl LoadHandle {
    pub fn new(receiver: mpsc::Receiver<LoadEvent>, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            receiver,
            cancelled,
            finished: false,
        }
    }

    /// Drains pending events without blocking. A loader that goes away
    /// without a final event is reported as a failure.
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let mut events = Vec::new();

        if self.finished {
            return events;
        }

        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let is_final = event.is_final();
                    events.push(event);

                    if is_final {
                        self.finished = true;
                        break;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.finished = true;
                    events.push(LoadEvent::Failed(anyhow::anyhow!(
                        "Asset loader stopped without a result"
                    )));
                    break;
                }
            }
        }

        events
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl Drop for LoadHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub trait AssetLoader {
    fn load(&self, path: &Path) -> LoadHandle;
}

/// Loads glTF/GLB files on a worker thread.
pub struct GltfLoader;

impl AssetLoader for GltfLoader {
    fn load(&self, path: &Path) -> LoadHandle {
        let (sender, receiver) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));

        let worker_cancelled = cancelled.clone();
        let path = path.to_path_buf();

        let spawned = std::thread::Builder::new()
            .name("asset-loader".to_string())
            .spawn(move || {
                let progress_sender = sender.clone();
                let result = load_gltf(&path, &worker_cancelled, |progress| {
                    let _ = progress_sender.send(LoadEvent::Progress(progress));
                });

                let event = match result {
                    Ok(Some(asset)) => LoadEvent::Loaded(asset),
                    Ok(None) => {
                        log::debug!("Load of {} cancelled", path.display());
                        return;
                    }
                    Err(error) => LoadEvent::Failed(error),
                };

                // The viewer may already be gone
                let _ = sender.send(event);
            });

        // On spawn failure the sender is dropped with the closure, which the
        // handle reports as a failed load.
        if let Err(error) = spawned {
            log::error!("Failed to spawn asset loader thread: {error}");
        }

        LoadHandle::new(receiver, cancelled)
    }
}

/// Reads and decodes a glTF asset. Returns `Ok(None)` if `cancelled` was set
/// before the asset was complete.
pub fn load_gltf(
    path: &Path,
    cancelled: &AtomicBool,
    mut on_progress: impl FnMut(LoadProgress),
) -> anyhow::Result<Option<GltfAsset>> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let file_size = file
        .metadata()
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();

    let mut bytes = Vec::with_capacity(file_size as usize);
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    loop {
        if cancelled.load(Ordering::Relaxed) {
            return Ok(None);
        }

        let read = file
            .read(&mut chunk)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        if read == 0 {
            break;
        }

        bytes.extend_from_slice(&chunk[..read]);

        // Completion is reported once, after the external buffers
        if (bytes.len() as u64) < file_size {
            on_progress(LoadProgress {
                loaded: bytes.len() as u64,
                total: file_size,
            });
        }
    }

    let gltf = gltf::Gltf::from_slice(&bytes)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let external_buffer_bytes: u64 = gltf
        .document
        .buffers()
        .filter(|buffer| matches!(buffer.source(), gltf::buffer::Source::Uri(_)))
        .map(|buffer| buffer.length() as u64)
        .sum();
    let total = bytes.len() as u64 + external_buffer_bytes;

    if external_buffer_bytes > 0 {
        on_progress(LoadProgress {
            loaded: bytes.len() as u64,
            total,
        });
    }

    let base = path.parent().map(PathBuf::from);

    if cancelled.load(Ordering::Relaxed) {
        return Ok(None);
    }

    let buffers = gltf::import_buffers(&gltf.document, base.as_deref(), gltf.blob)
        .with_context(|| format!("Failed to load buffers of {}", path.display()))?;

    on_progress(LoadProgress {
        loaded: total,
        total,
    });

    if cancelled.load(Ordering::Relaxed) {
        return Ok(None);
    }

    let images = gltf::import_images(&gltf.document, base.as_deref(), &buffers)
        .with_context(|| format!("Failed to load images of {}", path.display()))?;

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let asset = GltfAsset::from_gltf(name, &gltf.document, &buffers, &images)?;

    if cancelled.load(Ordering::Relaxed) {
        return Ok(None);
    }

    Ok(Some(asset))
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::test_util::write_triangle_gltf;

    fn wait_for_events(handle: &mut LoadHandle) -> Vec<LoadEvent> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut events = Vec::new();

        while !handle.is_finished() && Instant::now() < deadline {
            events.extend(handle.poll());
            std::thread::sleep(Duration::from_millis(5));
        }

        events
    }

    #[test]
    fn loads_triangle_with_animation() {
        let path = write_triangle_gltf("loader-triangle");
        let mut handle = GltfLoader.load(&path);

        let events = wait_for_events(&mut handle);

        let progress: Vec<LoadProgress> = events
            .iter()
            .filter_map(|event| match event {
                LoadEvent::Progress(progress) => Some(*progress),
                _ => None,
            })
            .collect();
        // The JSON fits one read chunk, then the external .bin follows
        assert_eq!(progress.len(), 2);
        assert!(progress[0].fraction() < 1.0);
        assert_eq!(progress[0].total, progress[1].total);
        let complete = progress
            .iter()
            .filter(|progress| progress.fraction() == 1.0)
            .count();
        assert_eq!(complete, 1);
        assert_eq!(progress.last().unwrap().fraction(), 1.0);

        let Some(LoadEvent::Loaded(asset)) = events.into_iter().last() else {
            panic!("expected a loaded asset");
        };
        assert_eq!(asset.roots, vec![0]);
        assert_eq!(asset.nodes[0].name, "Triangle");
        assert_eq!(asset.clips.len(), 1);
        assert_eq!(asset.clips[0].duration, 1.0);

        let model = asset.meshes[0].as_ref().unwrap();
        assert_eq!(model.primitives[0].indices, vec![0, 1, 2]);
        // Generated normals face +Z for a counter-clockwise triangle in XY
        assert!((model.primitives[0].vertices[0].normal - glam::Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn missing_file_fails() {
        let mut handle = GltfLoader.load(Path::new("does/not/exist.gltf"));

        let events = wait_for_events(&mut handle);

        assert_eq!(events.len(), 1);
        let LoadEvent::Failed(error) = &events[0] else {
            panic!("expected failure");
        };
        assert!(format!("{error:#}").contains("exist.gltf"));
    }

    #[test]
    fn cancelled_load_returns_nothing() {
        let path = write_triangle_gltf("loader-cancelled");
        let cancelled = AtomicBool::new(true);

        let result = load_gltf(&path, &cancelled, |_| {}).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn disconnected_loader_reports_failure_once() {
        let (sender, receiver) = mpsc::channel();
        let mut handle = LoadHandle::new(receiver, Arc::new(AtomicBool::new(false)));
        drop(sender);

        let events = handle.poll();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LoadEvent::Failed(_)));
        assert!(handle.poll().is_empty());
    }

    #[test]
    fn dropping_handle_sets_cancel_flag() {
        let (_sender, receiver) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let handle = LoadHandle::new(receiver, cancelled.clone());

        drop(handle);

        assert!(cancelled.load(Ordering::Relaxed));
    }
}
