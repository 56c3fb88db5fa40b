use super::*;
use crate::relay_supervisor::{OnvifSource, StreamInfo};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex as StdMutex;

/// What a scripted source does on each call
#[derive(Clone)]
enum Read {
    Frame,
    Fail,
}

#[derive(Default)]
struct ScriptState {
    opens: VecDeque<bool>,
    reads: VecDeque<Read>,
    open_calls: usize,
    close_calls: usize,
    urls: Vec<String>,
    /// Reported by `is_open` while a read is pending
    report_open: bool,
}

/// Scripted capture shared between the test and every source it creates
#[derive(Clone, Default)]
struct Script(Arc<StdMutex<ScriptState>>);

impl Script {
    fn new(opens: &[bool], reads: &[Read]) -> Self {
        let script = Script::default();
        {
            let mut s = script.0.lock().unwrap();
            s.opens = opens.iter().copied().collect();
            s.reads = reads.iter().cloned().collect();
            s.report_open = true;
        }
        script
    }

    fn frames(n: usize) -> Vec<Read> {
        vec![Read::Frame; n]
    }

    fn set_report_open(&self, open: bool) {
        self.0.lock().unwrap().report_open = open;
    }

    fn open_calls(&self) -> usize {
        self.0.lock().unwrap().open_calls
    }

    fn close_calls(&self) -> usize {
        self.0.lock().unwrap().close_calls
    }

    fn urls(&self) -> Vec<String> {
        self.0.lock().unwrap().urls.clone()
    }
}

struct ScriptedSource {
    script: Script,
    open: bool,
    delay: Duration,
}

#[async_trait]
impl FrameSource for ScriptedSource {
    async fn open(&mut self) -> Result<()> {
        let ok = {
            let mut s = self.script.0.lock().unwrap();
            s.open_calls += 1;
            s.opens.pop_front().unwrap_or(false)
        };
        self.open = ok;
        if ok {
            Ok(())
        } else {
            Err(Error::FrameSource("connection refused".to_string()))
        }
    }

    async fn read_frame(&mut self) -> Result<Frame> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        loop {
            let next = self.script.0.lock().unwrap().reads.pop_front();
            match next {
                Some(Read::Frame) => return Ok(Frame::new(vec![0xFF, 0xD8, 1, 0xFF, 0xD9])),
                Some(Read::Fail) => {
                    self.open = false;
                    return Err(Error::FrameSource("read failed".to_string()));
                }
                // nothing scripted yet: behave like a quiet stream
                None => tokio::time::sleep(Duration::from_millis(5)).await,
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open && self.script.0.lock().unwrap().report_open
    }

    async fn close(&mut self) {
        if self.open {
            self.script.0.lock().unwrap().close_calls += 1;
        }
        self.open = false;
    }
}

struct ScriptedFactory {
    script: Script,
    delay: Duration,
}

impl FrameSourceFactory for ScriptedFactory {
    fn create(&self, _camera_id: &str, url: &str) -> Box<dyn FrameSource> {
        self.script.0.lock().unwrap().urls.push(url.to_string());
        Box::new(ScriptedSource {
            script: self.script.clone(),
            open: false,
            delay: self.delay,
        })
    }
}

/// Relay double: running flag, optional rejection, registration log
#[derive(Default)]
struct FakeRelay {
    running: bool,
    reject: bool,
    /// Latency of each registration
    add_delay: Duration,
    add_calls: StdMutex<usize>,
    streams: StdMutex<HashMap<String, String>>,
}

#[async_trait]
impl StreamRelay for FakeRelay {
    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    async fn restart(&self) -> Result<()> {
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    async fn add_stream(&self, name: &str, source: &str) -> Result<()> {
        *self.add_calls.lock().unwrap() += 1;
        if !self.add_delay.is_zero() {
            tokio::time::sleep(self.add_delay).await;
        }
        if self.reject {
            return Err(Error::Relay("rejected".to_string()));
        }
        self.streams
            .lock()
            .unwrap()
            .insert(name.to_string(), source.to_string());
        Ok(())
    }

    async fn remove_stream(&self, name: &str) -> Result<()> {
        self.streams.lock().unwrap().remove(name);
        Ok(())
    }

    async fn get_streams(&self) -> Result<HashMap<String, StreamInfo>> {
        Ok(HashMap::new())
    }

    async fn get_stream_info(&self, name: &str) -> Result<StreamInfo> {
        Err(Error::NotFound(name.to_string()))
    }

    fn get_stream_url(&self, name: &str, protocol: StreamProtocol) -> String {
        format!("{}://relay/{}", protocol, name)
    }

    async fn probe_onvif(&self, _source: &str) -> Result<Vec<OnvifSource>> {
        Ok(Vec::new())
    }
}

struct AlwaysMotion;

#[async_trait]
impl MotionDetector for AlwaysMotion {
    async fn detect_motion(&self, _prev: &Frame, _curr: &Frame) -> Result<bool> {
        Ok(true)
    }
}

#[derive(Default)]
struct CountingDetector {
    calls: StdMutex<usize>,
}

#[async_trait]
impl ObjectDetector for CountingDetector {
    async fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>> {
        *self.calls.lock().unwrap() += 1;
        let bbox = BoundingBox {
            x1: 0.1,
            y1: 0.1,
            x2: 0.5,
            y2: 0.9,
        };
        Ok(vec![
            Detection {
                label: "person".to_string(),
                confidence: 0.9,
                bbox,
            },
            Detection {
                label: "cat".to_string(),
                confidence: 0.3,
                bbox,
            },
        ])
    }
}

fn test_config() -> StreamingConfig {
    StreamingConfig {
        reconnect_delay: Duration::from_millis(10),
        ..StreamingConfig::default()
    }
}

fn server_with(relay: FakeRelay, script: &Script) -> StreamingServer {
    StreamingServer::new(
        Arc::new(relay),
        test_config(),
        Arc::new(ScriptedFactory {
            script: script.clone(),
            delay: Duration::ZERO,
        }),
    )
}

async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

async fn wait_for_status(server: &StreamingServer, id: &str, status: CameraStatus) {
    wait_until(|| async move { server.get_camera_status(id).await.unwrap().status == status })
        .await;
}

async fn wait_for_frames(server: &StreamingServer, id: &str, frames: u64) {
    wait_until(|| async move {
        server.get_camera_status(id).await.unwrap().frame_count == frames
    })
    .await;
}

fn drain_events(rx: &mut broadcast::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test]
async fn test_single_read_failure_keeps_counter() {
    let mut reads = Script::frames(3);
    reads.push(Read::Fail);
    reads.extend(Script::frames(3));
    let script = Script::new(&[true, true], &reads);
    let server = server_with(FakeRelay::default(), &script);

    server.add_camera("cam1", "rtsp://10.0.0.5/live").await.unwrap();
    wait_for_frames(&server, "cam1", 6).await;

    let status = server.get_camera_status("cam1").await.unwrap();
    assert_eq!(status.status, CameraStatus::Online);
    assert_eq!(status.frame_count, 6);
    assert_eq!(script.open_calls(), 2);
    server.shutdown().await;
}

#[tokio::test]
async fn test_failed_reconnect_is_terminal() {
    let script = Script::new(&[true, false], &[Read::Frame, Read::Fail]);
    let server = server_with(FakeRelay::default(), &script);

    server.add_camera("cam1", "rtsp://10.0.0.5/live").await.unwrap();
    wait_for_status(&server, "cam1", CameraStatus::Error).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    let status = server.get_camera_status("cam1").await.unwrap();
    assert_eq!(status.status, CameraStatus::Error);
    assert_eq!(status.frame_count, 1);
    assert!(status.last_error.is_some());
    assert!(!status.capture_open);
    assert_eq!(script.open_calls(), 2);
}

#[tokio::test]
async fn test_initial_connect_failure_skips_reconnect() {
    let script = Script::new(&[false, true, true], &Script::frames(5));
    let server = server_with(FakeRelay::default(), &script);

    server.add_camera("cam1", "rtsp://10.0.0.5/live").await.unwrap();
    wait_for_status(&server, "cam1", CameraStatus::Error).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(script.open_calls(), 1);
    assert_eq!(
        server.get_camera_status("cam1").await.unwrap().frame_count,
        0
    );
}

#[tokio::test(start_paused = true)]
async fn test_motion_events_are_rate_limited() {
    let script = Script::new(&[true], &Script::frames(12));
    let server = StreamingServer::with_analysis(
        Arc::new(FakeRelay::default()),
        test_config(),
        Arc::new(ScriptedFactory {
            script: script.clone(),
            delay: Duration::from_secs(1),
        }),
        Some(Arc::new(AlwaysMotion)),
        None,
    );
    let mut rx = server.subscribe();

    server.add_camera("cam1", "rtsp://10.0.0.5/live").await.unwrap();
    tokio::time::sleep(Duration::from_secs(20)).await;

    let motions = drain_events(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            StreamEvent::Motion { frame, .. } => Some(frame),
            _ => None,
        })
        .collect::<Vec<_>>();
    // one frame per second, 5s cooldown, first frame has no predecessor
    assert_eq!(motions, vec![2, 7, 12]);
    assert!(server
        .get_camera_status("cam1")
        .await
        .unwrap()
        .last_motion_at
        .is_some());
}

#[tokio::test]
async fn test_motion_disabled_per_camera() {
    let script = Script::new(&[true], &[]);
    let server = StreamingServer::with_analysis(
        Arc::new(FakeRelay::default()),
        test_config(),
        Arc::new(ScriptedFactory {
            script: script.clone(),
            delay: Duration::ZERO,
        }),
        Some(Arc::new(AlwaysMotion)),
        None,
    );
    let mut rx = server.subscribe();

    server.add_camera("cam1", "rtsp://10.0.0.5/live").await.unwrap();
    server.update_camera_settings("cam1", false, true).await.unwrap();
    script.0.lock().unwrap().reads.extend(Script::frames(10));
    wait_for_frames(&server, "cam1", 10).await;

    assert!(!drain_events(&mut rx)
        .iter()
        .any(|e| matches!(e, StreamEvent::Motion { .. })));
}

#[tokio::test]
async fn test_ai_runs_every_interval_above_threshold() {
    let script = Script::new(&[true], &Script::frames(60));
    let detector = Arc::new(CountingDetector::default());
    let server = StreamingServer::with_analysis(
        Arc::new(FakeRelay::default()),
        test_config(),
        Arc::new(ScriptedFactory {
            script: script.clone(),
            delay: Duration::ZERO,
        }),
        None,
        Some(detector.clone()),
    );
    let mut rx = server.subscribe();

    server.add_camera("cam1", "rtsp://10.0.0.5/live").await.unwrap();
    wait_for_frames(&server, "cam1", 60).await;

    assert_eq!(*detector.calls.lock().unwrap(), 2);
    let detected: Vec<(u64, String)> = drain_events(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            StreamEvent::ObjectDetected {
                frame, detection, ..
            } => Some((frame, detection.label)),
            _ => None,
        })
        .collect();
    assert_eq!(
        detected,
        vec![(25, "person".to_string()), (50, "person".to_string())]
    );
}

#[tokio::test]
async fn test_ai_global_toggle_off() {
    let script = Script::new(&[true], &Script::frames(50));
    let detector = Arc::new(CountingDetector::default());
    let server = StreamingServer::with_analysis(
        Arc::new(FakeRelay::default()),
        test_config(),
        Arc::new(ScriptedFactory {
            script: script.clone(),
            delay: Duration::ZERO,
        }),
        None,
        Some(detector.clone()),
    );
    server.set_ai_detection(false);
    assert!(!server.ai_detection_enabled());

    server.add_camera("cam1", "rtsp://10.0.0.5/live").await.unwrap();
    wait_for_frames(&server, "cam1", 50).await;

    assert_eq!(*detector.calls.lock().unwrap(), 0);
}

#[test]
fn test_demote_rule_needs_both_conditions() {
    let threshold = Duration::from_secs(300);
    let idle = Duration::from_secs(301);
    let fresh = Duration::from_secs(10);

    assert!(should_demote(CameraStatus::Online, idle, false, threshold));
    assert!(!should_demote(CameraStatus::Online, idle, true, threshold));
    assert!(!should_demote(CameraStatus::Online, fresh, false, threshold));
    assert!(!should_demote(CameraStatus::Online, fresh, true, threshold));
    assert!(!should_demote(CameraStatus::Error, idle, false, threshold));
    assert!(!should_demote(CameraStatus::Online, threshold, false, threshold));
}

#[tokio::test]
async fn test_health_sweep_keeps_open_capture() {
    let script = Script::new(&[true], &[]);
    let server = server_with(FakeRelay::default(), &script);
    server.add_camera("cam1", "rtsp://10.0.0.5/live").await.unwrap();
    wait_for_status(&server, "cam1", CameraStatus::Online).await;

    let later = Utc::now() + chrono::Duration::minutes(10);
    assert!(server.run_health_sweep(later).await.is_empty());
    assert_eq!(
        server.get_camera_status("cam1").await.unwrap().status,
        CameraStatus::Online
    );
}

#[tokio::test]
async fn test_health_sweep_keeps_recent_camera() {
    let script = Script::new(&[true], &[]);
    script.set_report_open(false);
    let server = server_with(FakeRelay::default(), &script);
    server.add_camera("cam1", "rtsp://10.0.0.5/live").await.unwrap();
    wait_for_status(&server, "cam1", CameraStatus::Online).await;

    let soon = Utc::now() + chrono::Duration::minutes(1);
    assert!(server.run_health_sweep(soon).await.is_empty());
}

#[tokio::test]
async fn test_health_sweep_demotes_and_task_reconnects() {
    let script = Script::new(&[true, true], &[]);
    script.set_report_open(false);
    let server = server_with(FakeRelay::default(), &script);
    let mut rx = server.subscribe();
    server.add_camera("cam1", "rtsp://10.0.0.5/live").await.unwrap();
    wait_for_status(&server, "cam1", CameraStatus::Online).await;

    let later = Utc::now() + chrono::Duration::minutes(6);
    assert_eq!(server.run_health_sweep(later).await, vec!["cam1".to_string()]);

    let opens = &script;
    wait_until(|| async move { opens.open_calls() == 2 }).await;
    wait_for_status(&server, "cam1", CameraStatus::Online).await;

    let events = drain_events(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, StreamEvent::CameraLost { camera_id, .. } if camera_id == "cam1")));
    assert!(events.iter().any(|e| matches!(
        e,
        StreamEvent::StatusChanged {
            from: CameraStatus::Online,
            to: CameraStatus::Offline,
            ..
        }
    )));
    server.shutdown().await;
}

#[tokio::test]
async fn test_remove_camera_releases_everything() {
    let script = Script::new(&[true], &Script::frames(3));
    let relay = Arc::new(FakeRelay {
        running: true,
        ..FakeRelay::default()
    });
    let server = StreamingServer::new(
        relay.clone(),
        test_config(),
        Arc::new(ScriptedFactory {
            script: script.clone(),
            delay: Duration::ZERO,
        }),
    );

    server.add_camera("cam1", "rtsp://10.0.0.5/live").await.unwrap();
    wait_for_frames(&server, "cam1", 3).await;
    assert!(server.get_snapshot("cam1").await.is_ok());
    assert!(relay.streams.lock().unwrap().contains_key("camera_cam1"));

    server.remove_camera("cam1").await.unwrap();

    assert_eq!(script.close_calls(), 1);
    assert!(relay.streams.lock().unwrap().is_empty());
    assert!(server.list_cameras().await.is_empty());
    assert!(matches!(
        server.remove_camera("cam1").await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        server.get_snapshot("cam1").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_shutdown_cancels_all_cameras() {
    let script = Script::new(&[true, true], &[]);
    let server = server_with(FakeRelay::default(), &script);
    server.start().await;

    server.add_camera("a", "rtsp://10.0.0.5/live").await.unwrap();
    server.add_camera("b", "rtsp://10.0.0.6/live").await.unwrap();
    wait_for_status(&server, "a", CameraStatus::Online).await;
    wait_for_status(&server, "b", CameraStatus::Online).await;

    tokio::time::timeout(Duration::from_secs(5), server.shutdown())
        .await
        .expect("shutdown hung");

    assert_eq!(script.close_calls(), 2);
    assert!(server.list_cameras().await.is_empty());
    assert!(server.add_camera("c", "rtsp://10.0.0.7/live").await.is_err());
}

#[tokio::test]
async fn test_capture_reads_relay_restream_when_registered() {
    let script = Script::new(&[true, true, true], &[]);
    let server = server_with(
        FakeRelay {
            running: true,
            ..FakeRelay::default()
        },
        &script,
    );

    let info = server.add_camera("cam1", "rtsp://10.0.0.5/live").await.unwrap();

    assert_eq!(info.relay_stream.as_deref(), Some("camera_cam1"));
    assert_eq!(info.capture_url, "rtsp://relay/camera_cam1");
    assert_eq!(script.urls(), vec!["rtsp://relay/camera_cam1".to_string()]);

    let urls = server.camera_stream_urls("cam1").await.unwrap();
    assert_eq!(urls.hls, "hls://relay/camera_cam1");
    server.shutdown().await;
}

#[tokio::test]
async fn test_capture_falls_back_to_source() {
    let script = Script::new(&[true, true], &[]);

    let stopped = server_with(FakeRelay::default(), &script);
    let info = stopped.add_camera("cam1", "rtsp://10.0.0.5/live").await.unwrap();
    assert_eq!(info.capture_url, "rtsp://10.0.0.5/live");
    assert!(info.relay_stream.is_none());
    assert!(matches!(
        stopped.camera_stream_urls("cam1").await,
        Err(Error::NotFound(_))
    ));

    let rejecting = server_with(
        FakeRelay {
            running: true,
            reject: true,
            ..FakeRelay::default()
        },
        &script,
    );
    let info = rejecting.add_camera("cam2", "rtsp://10.0.0.6/live").await.unwrap();
    assert_eq!(info.capture_url, "rtsp://10.0.0.6/live");

    stopped.shutdown().await;
    rejecting.shutdown().await;
}

#[tokio::test]
async fn test_add_camera_validation() {
    let script = Script::new(&[true], &[]);
    let server = server_with(FakeRelay::default(), &script);

    assert!(matches!(
        server.add_camera("", "rtsp://x").await,
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        server.add_camera("cam1", " ").await,
        Err(Error::Validation(_))
    ));
    server.add_camera("cam1", "rtsp://x").await.unwrap();
    assert!(matches!(
        server.add_camera("cam1", "rtsp://y").await,
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        server.get_camera_status("nope").await,
        Err(Error::NotFound(_))
    ));
    server.shutdown().await;
}

fn require_send<F: std::future::Future + Send>(_: &F) {}

#[test]
fn test_camera_task_future_is_send() {
    let script = Script::new(&[true], &[]);
    let (events, _) = broadcast::channel(16);
    let handle = Arc::new(CameraHandle::new(
        "cam1",
        "rtsp://10.0.0.5/live",
        "rtsp://10.0.0.5/live",
        None,
        events,
    ));
    let ctx = Arc::new(TaskContext {
        config: test_config(),
        motion: Some(Arc::new(AlwaysMotion)),
        detector: Some(Arc::new(CountingDetector::default())),
        ai_global: Arc::new(AtomicBool::new(true)),
    });
    let (_camera_tx, camera_rx) = watch::channel(false);
    let (_server_tx, server_rx) = watch::channel(false);
    let source = ScriptedFactory {
        script,
        delay: Duration::ZERO,
    }
    .create("cam1", "rtsp://10.0.0.5/live");

    let task = CameraTask::new(handle, source, ctx, Cancellation::new(camera_rx, server_rx));
    require_send(&task.run());
}

#[tokio::test]
async fn test_health_ticker_demotes_idle_camera() {
    let script = Script::new(&[true, true, true, true], &[]);
    script.set_report_open(false);
    let config = StreamingConfig {
        health_interval: Duration::from_millis(20),
        health_idle_threshold: Duration::ZERO,
        ..test_config()
    };
    let server = StreamingServer::new(
        Arc::new(FakeRelay::default()),
        config,
        Arc::new(ScriptedFactory {
            script: script.clone(),
            delay: Duration::ZERO,
        }),
    );
    let mut rx = server.subscribe();
    server.start().await;

    server.add_camera("cam1", "rtsp://10.0.0.5/live").await.unwrap();
    let opens = &script;
    wait_until(|| async move { opens.open_calls() >= 2 }).await;

    assert!(drain_events(&mut rx)
        .iter()
        .any(|e| matches!(e, StreamEvent::CameraLost { camera_id, .. } if camera_id == "cam1")));
    tokio::time::timeout(Duration::from_secs(5), server.shutdown())
        .await
        .expect("shutdown hung");
}

#[tokio::test]
async fn test_concurrent_duplicate_add_keeps_relay_stream() {
    let script = Script::new(&[true, true], &[]);
    let relay = Arc::new(FakeRelay {
        running: true,
        add_delay: Duration::from_millis(20),
        ..FakeRelay::default()
    });
    let server = StreamingServer::new(
        relay.clone(),
        test_config(),
        Arc::new(ScriptedFactory {
            script: script.clone(),
            delay: Duration::ZERO,
        }),
    );

    let (a, b) = tokio::join!(
        server.add_camera("cam1", "rtsp://10.0.0.5/live"),
        server.add_camera("cam1", "rtsp://10.0.0.6/live"),
    );

    assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
    assert!(matches!(
        a.as_ref().err().or(b.as_ref().err()),
        Some(Error::Validation(_))
    ));
    // the losing add never reached the relay
    assert_eq!(*relay.add_calls.lock().unwrap(), 1);
    assert!(relay.streams.lock().unwrap().contains_key("camera_cam1"));

    let info = server.get_camera_status("cam1").await.unwrap();
    assert_eq!(info.relay_stream.as_deref(), Some("camera_cam1"));
    assert_eq!(info.capture_url, "rtsp://relay/camera_cam1");
    assert_eq!(script.urls().len(), 1);
    server.shutdown().await;
}

#[tokio::test]
async fn test_demotion_during_reconnect_delay_reconnects_once() {
    let script = Script::new(&[true, true, true], &[Read::Frame, Read::Fail]);
    let config = StreamingConfig {
        reconnect_delay: Duration::from_millis(300),
        ..test_config()
    };
    let server = StreamingServer::new(
        Arc::new(FakeRelay::default()),
        config,
        Arc::new(ScriptedFactory {
            script: script.clone(),
            delay: Duration::ZERO,
        }),
    );

    server.add_camera("cam1", "rtsp://10.0.0.5/live").await.unwrap();
    wait_for_frames(&server, "cam1", 1).await;
    let srv = &server;
    wait_until(|| async move { !srv.get_camera_status("cam1").await.unwrap().capture_open }).await;

    // capture closed and waiting to reconnect, status still online
    let later = Utc::now() + chrono::Duration::minutes(6);
    assert_eq!(server.run_health_sweep(later).await, vec!["cam1".to_string()]);

    let opens = &script;
    wait_until(|| async move { opens.open_calls() == 2 }).await;
    wait_for_status(&server, "cam1", CameraStatus::Online).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(script.open_calls(), 2);
    assert_eq!(
        server.get_camera_status("cam1").await.unwrap().status,
        CameraStatus::Online
    );
    server.shutdown().await;
}
