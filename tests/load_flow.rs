//! 加载 → 绑定 → 呈现 全链路测试
//!
//! 使用软件渲染器与内存字节来源，不依赖窗口与网络。

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use cat_viewer::app::{LoadPhase, Reaction, ViewerApp, ViewerEvent};
use cat_viewer::config::ViewerConfig;
use cat_viewer::image_pipeline::{
    ByteOrigin, ByteSource, DecodeError, DecodeLimits, DecodedFrame, FetchError, ImageId, ImageLoader,
    LoadError, RawImageBytes,
};
use cat_viewer::render::{
    Backend, Painter, PresentOutcome, SoftwareBitmap, SoftwarePainter, SurfaceError, SurfaceId, SurfaceSize,
};

/// 内存字节来源：固定返回同一份字节（或固定失败），并统计调用次数。
struct FakeSource {
    bytes: Option<Vec<u8>>,
    fetches: AtomicUsize,
}

impl FakeSource {
    fn serving(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Some(bytes),
            fetches: AtomicUsize::new(0),
        }
    }

    fn unreachable() -> Self {
        Self {
            bytes: None,
            fetches: AtomicUsize::new(0),
        }
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ByteSource for FakeSource {
    async fn fetch(&self, _identifier: ImageId, offline: bool) -> Result<RawImageBytes, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let origin = if offline { ByteOrigin::Disk } else { ByteOrigin::Network };
        match &self.bytes {
            Some(bytes) => RawImageBytes::new(bytes.clone(), origin).ok_or(FetchError::Empty),
            None => Err(FetchError::Network("无法连接：connection refused".to_string())),
        }
    }
}

/// 可以模拟设备丢失或拒绝创建位图的渲染器。
struct FlakyPainter {
    inner: SoftwarePainter,
    lose_device_on_next_present: bool,
    refuse_bitmaps: bool,
    surfaces_created: usize,
}

impl FlakyPainter {
    fn new(backend: Backend) -> Self {
        Self {
            inner: SoftwarePainter::new(backend, SurfaceSize::new(900, 600)),
            lose_device_on_next_present: false,
            refuse_bitmaps: false,
            surfaces_created: 0,
        }
    }
}

impl Painter for FlakyPainter {
    type Bitmap = SoftwareBitmap;

    fn backend(&self) -> Backend {
        self.inner.backend()
    }

    fn ensure_surface(&mut self) -> Result<SurfaceId, SurfaceError> {
        if !self.inner.has_surface() {
            self.surfaces_created += 1;
        }
        self.inner.ensure_surface()
    }

    fn has_surface(&self) -> bool {
        self.inner.has_surface()
    }

    fn surface_size(&self) -> Option<SurfaceSize> {
        self.inner.surface_size()
    }

    fn resize(&mut self, size: SurfaceSize) -> Result<(), SurfaceError> {
        self.inner.resize(size)
    }

    fn set_client_size(&mut self, size: SurfaceSize) {
        self.inner.set_client_size(size);
    }

    fn create_bitmap(&mut self, frame: &DecodedFrame) -> Result<SoftwareBitmap, DecodeError> {
        if self.refuse_bitmaps {
            return Err(DecodeError::Materialize("test refusal".to_string()));
        }
        self.inner.create_bitmap(frame)
    }

    fn present(&mut self, bitmap: Option<&SoftwareBitmap>) -> Result<PresentOutcome, SurfaceError> {
        if self.lose_device_on_next_present {
            self.lose_device_on_next_present = false;
            self.inner.release_surface();
            return Ok(PresentOutcome::DeviceLost);
        }
        self.inner.present(bitmap)
    }

    fn release_surface(&mut self) {
        self.inner.release_surface();
    }
}

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40]));
    let mut buffer = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Jpeg)
        .expect("encode jpeg failed");
    buffer
}

fn id(value: u32) -> ImageId {
    ImageId::new(value).expect("valid id")
}

fn software_viewer() -> ViewerApp<SoftwarePainter, SoftwarePainter> {
    let config = ViewerConfig::default();
    ViewerApp::new(
        &config,
        SoftwarePainter::new(Backend::Modern, SurfaceSize::new(900, 600)),
        SoftwarePainter::new(Backend::Legacy, SurfaceSize::new(900, 600)),
    )
}

fn loader<S: ByteSource>(source: S) -> ImageLoader<S> {
    ImageLoader::new(source, DecodeLimits::default())
}

/// 执行 `StartLoad` 并把结果交回应用。
async fn run_load<M, L, S>(app: &mut ViewerApp<M, L>, loader: &ImageLoader<S>, reaction: Reaction) -> Reaction
where
    M: Painter,
    L: Painter,
    S: ByteSource,
{
    let Reaction::StartLoad(request) = reaction else {
        panic!("expected StartLoad, got {:?}", reaction);
    };
    let outcome = loader.load(request).await;
    app.complete_load(outcome)
}

#[tokio::test]
async fn online_load_of_seven_updates_state_and_title() {
    let loader = loader(FakeSource::serving(jpeg_bytes(32, 24)));
    let mut app = software_viewer();

    let reaction = app.handle_event(ViewerEvent::SetIdentifier(id(7)));
    assert!(matches!(reaction, Reaction::StartLoad(request) if !request.offline && request.identifier == id(7)));

    let applied = run_load(&mut app, &loader, reaction).await;

    assert_eq!(applied, Reaction::Repaint);
    assert_eq!(app.phase(), LoadPhase::Loaded);
    assert_eq!(app.state().current, id(7));
    assert!(app.title().contains('7'));
    assert_eq!(app.title(), "Gary Viewer - #7 [Direct2D]");
    assert_eq!(app.modern().frame().map(DecodedFrame::dimensions), Some((32, 24)));
    assert_eq!(app.legacy().frame().map(DecodedFrame::dimensions), Some((32, 24)));
    assert_eq!(loader.source().fetch_count(), 1);
}

#[tokio::test]
async fn failed_offline_load_leaves_previous_image_in_place() {
    let good = loader(FakeSource::serving(jpeg_bytes(16, 16)));
    let broken = loader(FakeSource::unreachable());
    let mut app = software_viewer();

    let first = app.handle_event(ViewerEvent::SetIdentifier(id(3)));
    run_load(&mut app, &good, first).await;
    let before = app.modern().frame().cloned();

    let toggle = app.handle_event(ViewerEvent::ToggleOffline);
    assert_eq!(run_load(&mut app, &broken, toggle).await, Reaction::Nothing);

    let reaction = app.handle_event(ViewerEvent::SetIdentifier(id(7)));
    assert!(matches!(reaction, Reaction::StartLoad(request) if request.offline));
    let applied = run_load(&mut app, &broken, reaction).await;

    assert_eq!(applied, Reaction::Nothing);
    assert_eq!(app.phase(), LoadPhase::FailedNoChange);
    assert_eq!(app.state().current, id(3));
    assert!(app.state().offline);
    assert_eq!(app.modern().frame().cloned(), before);
    assert!(app.legacy().bitmap().is_some());
}

#[tokio::test]
async fn backend_toggle_repaints_without_fetching() {
    let loader = loader(FakeSource::serving(jpeg_bytes(8, 8)));
    let mut app = software_viewer();

    let created = app.handle_event(ViewerEvent::Created);
    run_load(&mut app, &loader, created).await;
    assert_eq!(loader.source().fetch_count(), 1);

    assert_eq!(app.handle_event(ViewerEvent::ToggleBackend), Reaction::Repaint);
    assert_eq!(app.state().backend, Backend::Legacy);
    assert_eq!(app.paint().expect("paint failed"), PresentOutcome::Presented);

    assert_eq!(app.handle_event(ViewerEvent::ToggleBackend), Reaction::Repaint);
    assert_eq!(app.paint().expect("paint failed"), PresentOutcome::Presented);

    assert_eq!(loader.source().fetch_count(), 1);
    assert_eq!(app.legacy().painter().present_count(), 1);
    assert_eq!(app.modern().painter().present_count(), 1);
}

#[tokio::test]
async fn resize_stretches_existing_bitmap_without_refetch_or_redecode() {
    let loader = loader(FakeSource::serving(jpeg_bytes(20, 10)));
    let mut app = software_viewer();

    let created = app.handle_event(ViewerEvent::Created);
    run_load(&mut app, &loader, created).await;
    app.paint().expect("first paint failed");
    let surface = app.modern().painter().surface_size();
    assert_eq!(surface, Some(SurfaceSize::new(900, 600)));

    let reaction = app.handle_event(ViewerEvent::Resized(SurfaceSize::new(400, 300)));
    assert_eq!(reaction, Reaction::Repaint);
    app.paint().expect("second paint failed");

    let painter = app.modern().painter();
    assert_eq!(painter.surface_size(), Some(SurfaceSize::new(400, 300)));
    assert_eq!(painter.bitmaps_created(), 1);
    assert_eq!(painter.present_count(), 2);
    assert_eq!(loader.source().fetch_count(), 1);

    // 右下角也被图片覆盖，而非白色背景
    let corner = painter.pixel_at(399, 299).expect("corner pixel");
    assert_ne!(corner, [0xFF, 0xFF, 0xFF, 0xFF]);
    assert_eq!(corner[3], 0xFF);
}

#[tokio::test]
async fn paint_before_any_load_clears_to_white() {
    let mut app = software_viewer();

    assert_eq!(app.paint().expect("paint failed"), PresentOutcome::Presented);
    let painter = app.modern().painter();
    assert_eq!(painter.pixel_at(0, 0), Some([0xFF, 0xFF, 0xFF, 0xFF]));
    assert_eq!(painter.pixel_at(899, 599), Some([0xFF, 0xFF, 0xFF, 0xFF]));
}

#[tokio::test]
async fn stale_load_outcome_is_ignored() {
    let loader = loader(FakeSource::serving(jpeg_bytes(8, 8)));
    let mut app = software_viewer();

    let Reaction::StartLoad(first) = app.handle_event(ViewerEvent::SetIdentifier(id(5))) else {
        panic!("expected StartLoad");
    };
    let Reaction::StartLoad(second) = app.handle_event(ViewerEvent::SetIdentifier(id(9))) else {
        panic!("expected StartLoad");
    };

    let stale = loader.load(first).await;
    assert_eq!(app.complete_load(stale), Reaction::Nothing);
    assert_eq!(app.phase(), LoadPhase::Loading { generation: second.generation });
    assert!(app.modern().frame().is_none());

    let latest = loader.load(second).await;
    assert_eq!(app.complete_load(latest), Reaction::Repaint);
    assert_eq!(app.state().current, id(9));
}

#[tokio::test]
async fn non_image_payload_fails_without_assigning_bitmaps() {
    let loader = loader(FakeSource::serving(b"<html><body>502 Bad Gateway</body></html>".to_vec()));
    let mut app = software_viewer();

    let reaction = app.handle_event(ViewerEvent::SetIdentifier(id(12)));
    let Reaction::StartLoad(request) = reaction else {
        panic!("expected StartLoad");
    };
    let outcome = loader.load(request).await;
    assert!(matches!(outcome.result, Err(LoadError::Decode(_))));

    assert_eq!(app.complete_load(outcome), Reaction::Nothing);
    assert_eq!(app.phase(), LoadPhase::FailedNoChange);
    assert_eq!(app.state().current, ImageId::MIN);
    assert!(app.modern().bitmap().is_none());
    assert!(app.legacy().bitmap().is_none());
}

#[tokio::test]
async fn offline_and_online_bytes_decode_to_identical_frames() {
    let bytes = jpeg_bytes(33, 17);
    let loader = loader(FakeSource::serving(bytes.clone()));

    let mut app = software_viewer();
    let Reaction::StartLoad(online) = app.handle_event(ViewerEvent::SetIdentifier(id(4))) else {
        panic!("expected StartLoad");
    };
    let offline = cat_viewer::image_pipeline::LoadRequest { offline: true, ..online };

    let online = loader.load(online).await.result.expect("online load failed");
    let offline = loader.load(offline).await.result.expect("offline load failed");

    assert_eq!(online.origin, ByteOrigin::Network);
    assert_eq!(offline.origin, ByteOrigin::Disk);
    assert_eq!(online.modern.dimensions(), (33, 17));
    assert_eq!(online.modern.dimensions(), offline.modern.dimensions());
    assert_eq!(online.modern, offline.legacy);
    assert_eq!(online.byte_len, bytes.len());
    assert_eq!(offline.byte_len, bytes.len());
}

#[tokio::test]
async fn device_loss_recreates_surface_and_rebinds_bitmap() {
    let config = ViewerConfig::default();
    let mut app = ViewerApp::new(&config, FlakyPainter::new(Backend::Modern), FlakyPainter::new(Backend::Legacy));
    let loader = loader(FakeSource::serving(jpeg_bytes(8, 8)));

    let created = app.handle_event(ViewerEvent::Created);
    run_load(&mut app, &loader, created).await;
    assert_eq!(app.paint().expect("paint failed"), PresentOutcome::Presented);

    app.modern_mut().painter_mut().lose_device_on_next_present = true;
    assert_eq!(app.paint().expect("paint failed"), PresentOutcome::DeviceLost);
    assert!(app.modern().bitmap().is_none());
    assert!(app.modern().frame().is_some());

    assert_eq!(app.paint().expect("paint failed"), PresentOutcome::Presented);
    let painter = app.modern().painter();
    assert_eq!(painter.surfaces_created, 2);
    assert_eq!(painter.inner.bitmaps_created(), 2);
    assert!(app.modern().bitmap().is_some());
    assert_eq!(loader.source().fetch_count(), 1);
}

#[tokio::test]
async fn bitmap_failure_on_one_backend_keeps_both_slots() {
    let config = ViewerConfig::default();
    let mut app = ViewerApp::new(&config, FlakyPainter::new(Backend::Modern), FlakyPainter::new(Backend::Legacy));
    let loader = loader(FakeSource::serving(jpeg_bytes(8, 8)));

    let first = app.handle_event(ViewerEvent::SetIdentifier(id(2)));
    run_load(&mut app, &loader, first).await;

    app.legacy_mut().painter_mut().refuse_bitmaps = true;
    let second = app.handle_event(ViewerEvent::SetIdentifier(id(6)));
    let applied = run_load(&mut app, &loader, second).await;

    assert_eq!(applied, Reaction::Nothing);
    assert_eq!(app.phase(), LoadPhase::FailedNoChange);
    assert_eq!(app.state().current, id(2));
    assert_eq!(app.modern().painter().inner.bitmaps_created(), 2);
    assert!(app.modern().bitmap().is_some());
    assert!(app.legacy().bitmap().is_some());
}

#[test]
fn refresh_picks_identifier_within_configured_range() {
    let mut app = software_viewer();
    for _ in 0..50 {
        let Reaction::StartLoad(request) = app.handle_event(ViewerEvent::Refresh) else {
            panic!("expected StartLoad");
        };
        assert!((1..=640).contains(&request.identifier.get()));
    }
}

#[test]
fn about_does_not_touch_state() {
    let mut app = software_viewer();
    let before = *app.state();
    assert_eq!(app.handle_event(ViewerEvent::About), Reaction::ShowAbout);
    assert_eq!(*app.state(), before);
    assert_eq!(app.phase(), LoadPhase::Idle);
}
