use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use motion_highlight_common::config::{CameraConfig, HighlightConfig};
use motion_highlight_common::frame::{CameraFrame, Dimensions, DisplayFrame};
use motion_highlight_processor::{MotionHighlighter, Phase, ProcessError, RejectedFrame};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::camera::FrameSource;
use crate::display::FrameSink;

/// What travels from the capture task to the processing thread.
///
/// Lifecycle messages are always delivered; frames are dropped when the
/// processing side has not caught up.
enum Feed {
    Started(Dimensions),
    Frame(CameraFrame),
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewState {
    Enabled,
    Disabled,
    Closed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames taken from the source.
    pub captured: u64,
    /// Frames discarded because processing was still busy.
    pub dropped: u64,
    /// Frames handed to the display, annotated or not.
    pub displayed: u64,
    /// Frames the highlighter refused and that were shown unannotated.
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct CaptureStats {
    captured: u64,
    dropped: u64,
}

#[derive(Debug, Default)]
struct ProcessingStats {
    displayed: u64,
    skipped: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{0} task failed: {1}")]
    Task(&'static str, tokio::task::JoinError),
}

/// Runs a camera feed through a [`MotionHighlighter`] and into a display.
///
/// Capture is paced on the async runtime; processing owns the highlighter on
/// a dedicated blocking thread. The two are joined by a bounded channel of
/// `queue_depth` frames, so a slow processor costs dropped frames rather
/// than growing latency.
pub struct Viewfinder {
    camera: CameraConfig,
    highlight: HighlightConfig,
}

impl Viewfinder {
    pub fn new(camera: CameraConfig, highlight: HighlightConfig) -> Self {
        Self { camera, highlight }
    }

    /// Open the camera view and start delivering frames. Must be called from
    /// within a tokio runtime.
    pub fn spawn<S: FrameSource, D: FrameSink>(self, source: S, sink: D) -> ViewfinderHandle {
        let (tx, rx) = mpsc::channel(self.camera.queue_depth);
        let (control_tx, control_rx) = watch::channel(ViewState::Enabled);

        info!(
            source = source.name(),
            fps = self.camera.fps,
            queue_depth = self.camera.queue_depth,
            max_frames = ?self.camera.max_frames,
            "starting viewfinder"
        );

        let period = self.camera.frame_period().unwrap_or_else(|| {
            warn!(fps = self.camera.fps, "fps gives no usable frame period, capturing at 30 fps");
            Duration::from_secs(1) / 30
        });

        let highlighter = MotionHighlighter::new(self.highlight);
        let processing = tokio::task::spawn_blocking(move || run_processing(rx, highlighter, sink));
        let capture = tokio::spawn(run_capture(
            source,
            tx,
            control_rx,
            period,
            self.camera.max_frames,
        ));

        ViewfinderHandle {
            control: ViewControl {
                state: Arc::new(control_tx),
            },
            capture,
            processing,
        }
    }
}

/// Cloneable switch for the camera view, mirroring the host lifecycle:
/// pause when backgrounded, resume when foregrounded, close on teardown.
#[derive(Clone)]
pub struct ViewControl {
    state: Arc<watch::Sender<ViewState>>,
}

impl ViewControl {
    pub fn pause(&self) {
        self.set(ViewState::Disabled);
    }

    pub fn resume(&self) {
        self.set(ViewState::Enabled);
    }

    pub fn close(&self) {
        self.set(ViewState::Closed);
    }

    fn set(&self, next: ViewState) {
        self.state.send_if_modified(|current| {
            // closing is final
            if *current == ViewState::Closed || *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

pub struct ViewfinderHandle {
    control: ViewControl,
    capture: JoinHandle<CaptureStats>,
    processing: JoinHandle<ProcessingStats>,
}

impl ViewfinderHandle {
    pub fn control(&self) -> ViewControl {
        self.control.clone()
    }

    pub fn pause(&self) {
        self.control.pause();
    }

    pub fn resume(&self) {
        self.control.resume();
    }

    pub fn close(&self) {
        self.control.close();
    }

    /// Wait for the source to run out or the view to be closed, then for the
    /// processing thread to drain.
    pub async fn join(self) -> Result<SessionStats, SessionError> {
        let ViewfinderHandle {
            control,
            capture,
            processing,
        } = self;
        let captured = capture.await.map_err(|e| SessionError::Task("capture", e))?;
        let processed = processing
            .await
            .map_err(|e| SessionError::Task("processing", e))?;
        drop(control);

        let stats = SessionStats {
            captured: captured.captured,
            dropped: captured.dropped,
            displayed: processed.displayed,
            skipped: processed.skipped,
        };
        info!(
            captured = stats.captured,
            dropped = stats.dropped,
            displayed = stats.displayed,
            skipped = stats.skipped,
            "viewfinder closed"
        );
        Ok(stats)
    }
}

async fn run_capture<S: FrameSource>(
    mut source: S,
    tx: mpsc::Sender<Feed>,
    mut control: watch::Receiver<ViewState>,
    period: Duration,
    max_frames: Option<u64>,
) -> CaptureStats {
    let mut stats = CaptureStats::default();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut seq: u64 = 0;

    'view: loop {
        let state = *control.borrow_and_update();
        match state {
            ViewState::Closed => break,
            ViewState::Disabled => {
                if control.changed().await.is_err() {
                    break;
                }
                continue;
            }
            ViewState::Enabled => {}
        }

        let dims = source.resolution();
        info!(%dims, "camera view enabled");
        if tx.send(Feed::Started(dims)).await.is_err() {
            break;
        }

        loop {
            tokio::select! {
                changed = control.changed() => {
                    let next = if changed.is_err() {
                        ViewState::Closed
                    } else {
                        *control.borrow()
                    };
                    if next == ViewState::Enabled {
                        continue;
                    }
                    info!(?next, "camera view disabled");
                    let _ = tx.send(Feed::Stopped).await;
                    if next == ViewState::Closed {
                        break 'view;
                    }
                    continue 'view;
                }
                _ = ticker.tick() => {
                    if max_frames.is_some_and(|max| stats.captured >= max) {
                        info!(captured = stats.captured, "frame limit reached");
                        let _ = tx.send(Feed::Stopped).await;
                        break 'view;
                    }
                    let Some(frame) = source.capture(seq, Utc::now().timestamp_millis()) else {
                        info!(captured = stats.captured, "camera source exhausted");
                        let _ = tx.send(Feed::Stopped).await;
                        break 'view;
                    };
                    seq += 1;
                    stats.captured += 1;

                    let frame_seq = frame.seq;
                    match tx.try_send(Feed::Frame(frame)) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            stats.dropped += 1;
                            debug!(seq = frame_seq, dropped = stats.dropped, "processing busy, dropping frame");
                        }
                        Err(TrySendError::Closed(_)) => {
                            warn!("processing thread gone, stopping capture");
                            break 'view;
                        }
                    }
                }
            }
        }
    }

    stats
}

fn run_processing<D: FrameSink>(
    mut rx: mpsc::Receiver<Feed>,
    mut highlighter: MotionHighlighter,
    mut sink: D,
) -> ProcessingStats {
    let mut stats = ProcessingStats::default();

    while let Some(feed) = rx.blocking_recv() {
        match feed {
            Feed::Started(dims) => highlighter.on_start(dims.width, dims.height),
            Feed::Stopped => highlighter.on_stop(),
            Feed::Frame(frame) => {
                let shown = match highlighter.process_frame(frame) {
                    Ok(shown) => shown,
                    Err(RejectedFrame { error, frame }) => {
                        warn!(seq = frame.seq, error = %error, "skipping frame, showing it unannotated");
                        stats.skipped += 1;
                        if let ProcessError::DimensionMismatch { actual, .. } = error {
                            info!(dims = %actual, "resolution changed, reopening camera view session");
                            highlighter.on_stop();
                            highlighter.on_start(actual.width, actual.height);
                        }
                        DisplayFrame::unannotated(frame)
                    }
                };
                stats.displayed += 1;
                sink.show(shown);
            }
        }
    }

    if highlighter.phase() != Phase::Stopped {
        highlighter.on_stop();
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::SyntheticCamera;
    use image::{GrayImage, Luma, RgbaImage};
    use motion_highlight_common::frame::DisplayImage;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedSource {
        dims: Dimensions,
        grays: VecDeque<GrayImage>,
    }

    impl FrameSource for ScriptedSource {
        fn resolution(&self) -> Dimensions {
            self.grays.front().map(Dimensions::of).unwrap_or(self.dims)
        }

        fn capture(&mut self, seq: u64, captured_at_ms: i64) -> Option<CameraFrame> {
            let gray = self.grays.pop_front()?;
            let (w, h) = gray.dimensions();
            let color = RgbaImage::new(w, h);
            Some(CameraFrame::new(gray, color, seq, captured_at_ms).unwrap())
        }
    }

    #[derive(Clone, Default)]
    struct CollectingSink {
        frames: Arc<Mutex<Vec<DisplayFrame>>>,
    }

    impl FrameSink for CollectingSink {
        fn show(&mut self, frame: DisplayFrame) {
            self.frames.lock().unwrap().push(frame);
        }
    }

    /// Blocks every `show` until the test drops the sender.
    struct GatedSink {
        gate: std::sync::mpsc::Receiver<()>,
    }

    impl FrameSink for GatedSink {
        fn show(&mut self, _frame: DisplayFrame) {
            let _ = self.gate.recv();
        }
    }

    fn block_gray(w: u32, h: u32, block: Option<(u32, u32)>) -> GrayImage {
        let mut gray = GrayImage::from_pixel(w, h, Luma([30]));
        if let Some((x0, y0)) = block {
            for y in y0..y0 + 4 {
                for x in x0..x0 + 4 {
                    gray.put_pixel(x, y, Luma([230]));
                }
            }
        }
        gray
    }

    fn camera_config(queue_depth: usize) -> CameraConfig {
        CameraConfig {
            fps: 1000.0,
            queue_depth,
            ..CameraConfig::default()
        }
    }

    #[tokio::test]
    async fn frames_flow_through_in_order() {
        let source = ScriptedSource {
            dims: Dimensions::new(16, 16),
            grays: VecDeque::from(vec![
                block_gray(16, 16, None),
                block_gray(16, 16, Some((4, 4))),
                block_gray(16, 16, Some((4, 4))),
            ]),
        };
        let sink = CollectingSink::default();
        let frames = Arc::clone(&sink.frames);

        let handle = Viewfinder::new(camera_config(8), HighlightConfig::default()).spawn(source, sink);
        let stats = handle.join().await.unwrap();

        assert_eq!(
            stats,
            SessionStats {
                captured: 3,
                dropped: 0,
                displayed: 3,
                skipped: 0
            }
        );
        let frames = frames.lock().unwrap();
        let seqs: Vec<u64> = frames.iter().map(|f| f.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert!(matches!(frames[0].image, DisplayImage::Gray(_)));
        assert_eq!(frames[1].regions, 1);
        assert_eq!(frames[2].regions, 0);
    }

    #[tokio::test]
    async fn busy_processing_drops_frames() {
        let source = ScriptedSource {
            dims: Dimensions::new(8, 8),
            grays: (0..10).map(|_| block_gray(8, 8, None)).collect(),
        };
        let (release, gate) = std::sync::mpsc::channel();
        let handle =
            Viewfinder::new(camera_config(1), HighlightConfig::default()).spawn(source, GatedSink { gate });

        tokio::time::sleep(Duration::from_millis(200)).await;
        drop(release);

        let stats = handle.join().await.unwrap();
        assert_eq!(stats.captured, 10);
        assert!(stats.dropped > 0);
        assert_eq!(stats.displayed + stats.dropped, stats.captured);
    }

    #[tokio::test]
    async fn resolution_change_reopens_session() {
        let source = ScriptedSource {
            dims: Dimensions::new(16, 16),
            grays: VecDeque::from(vec![
                block_gray(16, 16, None),
                block_gray(16, 16, None),
                block_gray(20, 16, None),
                block_gray(20, 16, None),
                block_gray(20, 16, Some((10, 6))),
            ]),
        };
        let sink = CollectingSink::default();
        let frames = Arc::clone(&sink.frames);

        let handle = Viewfinder::new(camera_config(8), HighlightConfig::default()).spawn(source, sink);
        let stats = handle.join().await.unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.displayed, 5);

        let frames = frames.lock().unwrap();
        let kinds: Vec<&str> = frames
            .iter()
            .map(|f| match f.image {
                DisplayImage::Gray(_) => "gray",
                DisplayImage::Color(_) => "color",
            })
            .collect();
        assert_eq!(kinds, vec!["gray", "color", "color", "gray", "color"]);
        assert_eq!(frames[2].regions, 0);
        assert_eq!(frames[2].image.dimensions(), Dimensions::new(20, 16));
        assert_eq!(frames[4].regions, 1);
    }

    #[tokio::test]
    async fn pause_and_resume_restart_the_reference() {
        let camera = SyntheticCamera::new(Dimensions::new(32, 24), 2);
        let sink = CollectingSink::default();
        let frames = Arc::clone(&sink.frames);
        let config = CameraConfig {
            fps: 200.0,
            queue_depth: 4,
            ..CameraConfig::default()
        };

        let handle = Viewfinder::new(config, HighlightConfig::default()).spawn(camera, sink);
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.pause();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.resume();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.close();

        let stats = handle.join().await.unwrap();
        assert!(stats.captured > 0);
        assert_eq!(stats.skipped, 0);

        let frames = frames.lock().unwrap();
        let bootstraps = frames
            .iter()
            .filter(|f| matches!(f.image, DisplayImage::Gray(_)))
            .count();
        assert_eq!(bootstraps, 2);
        assert!(matches!(frames[0].image, DisplayImage::Gray(_)));
    }

    #[tokio::test]
    async fn unusable_fps_falls_back_instead_of_panicking() {
        let camera = SyntheticCamera::new(Dimensions::new(16, 12), 1);
        let config = CameraConfig {
            fps: 1e12,
            queue_depth: 16,
            max_frames: Some(3),
            ..CameraConfig::default()
        };
        let handle =
            Viewfinder::new(config, HighlightConfig::default()).spawn(camera, CollectingSink::default());
        let stats = handle.join().await.unwrap();
        assert_eq!(stats.captured, 3);
    }

    #[tokio::test]
    async fn frame_limit_stops_capture() {
        let camera = SyntheticCamera::new(Dimensions::new(16, 12), 1);
        let config = CameraConfig {
            fps: 1000.0,
            queue_depth: 16,
            max_frames: Some(5),
            ..CameraConfig::default()
        };
        let handle =
            Viewfinder::new(config, HighlightConfig::default()).spawn(camera, CollectingSink::default());
        let stats = handle.join().await.unwrap();
        assert_eq!(stats.captured, 5);
    }
}
