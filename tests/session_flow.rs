use framebooth::{
    BoothResult, CaptureConstraints, CaptureDevice, CaptureStream, Compositor, Controller, Facing,
    FrameVariant, GesturePhase, ImageSource, OverlayStore, Point, SessionMode, Viewport,
};

struct FakeDevice {
    fail: bool,
}

struct FakeStream {
    width: u32,
    height: u32,
}

impl CaptureDevice for FakeDevice {
    fn open(&mut self, constraints: &CaptureConstraints) -> BoothResult<Box<dyn CaptureStream>> {
        if self.fail {
            return Err(framebooth::BoothError::device_access("permission denied"));
        }
        // The device ignores the exact requested resolution, as real ones may.
        Ok(Box::new(FakeStream {
            width: constraints.resolution.width / 2,
            height: constraints.resolution.height / 2,
        }))
    }
}

impl CaptureStream for FakeStream {
    fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn grab_frame(&mut self) -> BoothResult<ImageSource> {
        let buf = [200u8, 180, 160, 255].repeat((self.width * self.height) as usize);
        ImageSource::from_premul_parts(self.width, self.height, buf)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn capture_to_export_end_to_end() {
    init_tracing();
    let mut device = FakeDevice { fail: false };
    let mut ctl = Controller::new();

    let ticket = ctl.open_camera();
    let stream = device.open(&ctl.constraints());
    ctl.attach_stream(ticket, stream).unwrap();

    let still = ctl.capture().unwrap();
    assert_eq!(ctl.mode(), SessionMode::Frozen);
    assert_eq!((still.width(), still.height()), (1080, 1350));
    ctl.edit();

    let mut compositor = Compositor::new();
    compositor.ingest(still, ctl.mirror_default());
    compositor.measure_viewport(Viewport::new(360.0, 450.0, 1.0).unwrap());
    compositor.apply_pan(12.0, -8.0);
    compositor.wheel(-120.0);
    compositor.finish();

    let mut overlays = OverlayStore::new("assets");
    overlays.insert(
        FrameVariant::Feed,
        ImageSource::from_premul_parts(1, 1, vec![0, 0, 0, 0]).unwrap(),
    );

    let artifact = compositor.render(&mut overlays).unwrap().unwrap();
    assert_eq!(artifact.filename, "photobooth-post.png");
    assert_eq!((artifact.width, artifact.height), (1080, 1350));
    assert!(!artifact.png.is_empty());
}

#[test]
fn front_camera_sets_the_mirror_default() {
    let mut ctl = Controller::new();
    assert_eq!(ctl.facing(), Facing::User);

    let mut compositor = Compositor::new();
    compositor.ingest(
        ImageSource::from_premul_parts(2, 2, vec![9u8; 16]).unwrap(),
        ctl.mirror_default(),
    );
    assert!(compositor.transform().mirrored);

    ctl.toggle_facing();
    compositor.ingest(
        ImageSource::from_premul_parts(2, 2, vec![9u8; 16]).unwrap(),
        ctl.mirror_default(),
    );
    assert!(!compositor.transform().mirrored);
}

#[test]
fn device_failure_surfaces_notice_and_returns_to_idle() {
    let mut device = FakeDevice { fail: true };
    let mut ctl = Controller::new();

    let ticket = ctl.open_camera();
    let stream = device.open(&ctl.constraints());
    let err = ctl.attach_stream(ticket, stream).unwrap_err();
    assert!(matches!(err, framebooth::BoothError::DeviceAccess(_)));
    assert_eq!(ctl.mode(), SessionMode::Idle);
}

#[test]
fn pinch_then_single_release_goes_idle() {
    let mut c = Compositor::new();
    c.ingest(
        ImageSource::from_premul_parts(2, 2, vec![9u8; 16]).unwrap(),
        false,
    );

    // Two sequential pointer-downs start a pinch.
    c.pointer_down(1, Point::new(0.0, 0.0));
    c.pointer_down(2, Point::new(100.0, 0.0));

    // One pointer-up: the machine must go Idle, not Dragging.
    c.pointer_up(1);

    // The remaining pointer's position must not act as a drag anchor.
    let before = *c.transform();
    c.pointer_move(2, Point::new(250.0, 250.0));
    assert_eq!(*c.transform(), before);
}

#[test]
fn gestures_drive_the_compositor_transform() {
    let mut c = Compositor::new();
    c.ingest(
        ImageSource::from_premul_parts(2, 2, vec![9u8; 16]).unwrap(),
        false,
    );

    c.pointer_down(7, Point::new(40.0, 40.0));
    c.pointer_move(7, Point::new(90.0, 65.0));
    c.pointer_up(7);
    assert_eq!(c.transform().offset, framebooth::Vec2::new(50.0, 25.0));

    c.pointer_down(7, Point::new(0.0, 0.0));
    c.pointer_down(8, Point::new(100.0, 0.0));
    c.pointer_move(8, Point::new(200.0, 0.0));
    assert!((c.transform().scale - 2.0).abs() < 1e-12);
    c.pointer_up(7);
    c.pointer_up(8);

    // A later pinch baselines against the scale captured at its own start.
    c.pointer_down(7, Point::new(0.0, 0.0));
    c.pointer_down(8, Point::new(100.0, 0.0));
    c.pointer_move(8, Point::new(150.0, 0.0));
    assert!((c.transform().scale - 3.0).abs() < 1e-12);
}

#[test]
fn gesture_phase_is_observable_through_the_machine() {
    let mut g = framebooth::GestureMachine::new();
    let mut t = framebooth::TransformState::default();

    g.pointer_down(1, Point::new(0.0, 0.0), &mut t, true);
    assert!(matches!(g.phase(), GesturePhase::Dragging { .. }));

    g.pointer_down(2, Point::new(50.0, 0.0), &mut t, true);
    assert!(matches!(g.phase(), GesturePhase::Pinching { .. }));

    g.pointer_up(2);
    assert_eq!(g.phase(), GesturePhase::Idle);
}
