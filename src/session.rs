use tracing::debug;

use crate::{
    error::{BoothError, BoothResult},
    export,
    frame::{CaptureResolution, FrameSpec, FrameVariant},
    source::ImageSource,
};

/// Coarse session mode owned by the controller. The compositor's
/// Editing/Finished lifecycle is a substate of `Edit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Idle,
    LiveCapture,
    Frozen,
    Edit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    User,
    Environment,
}

impl Facing {
    pub fn toggled(self) -> Self {
        match self {
            Facing::User => Facing::Environment,
            Facing::Environment => Facing::User,
        }
    }
}

/// What the controller asks of the capture device. The device is free to
/// deliver a different frame size; the actual size is read back from the
/// stream before rasterizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CaptureConstraints {
    pub resolution: CaptureResolution,
    pub facing: Facing,
}

/// Seam to the platform's capture machinery. Opening may fail (permission
/// denied, no device) with [`BoothError::DeviceAccess`].
pub trait CaptureDevice {
    fn open(&mut self, constraints: &CaptureConstraints) -> BoothResult<Box<dyn CaptureStream>>;
}

/// A live video stream; one frame can be grabbed at a time.
pub trait CaptureStream {
    fn frame_size(&self) -> (u32, u32);
    fn grab_frame(&mut self) -> BoothResult<ImageSource>;
}

/// Identifies one device-open request. Device acquisition resolves
/// asynchronously; a resolution carrying a stale ticket is discarded so a
/// late callback cannot clobber a session the user has already left.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamTicket(u64);

/// Capture/Session Controller.
///
/// Acquires exactly one still image — from a live stream or an upload — and
/// manages the coarse mode machine:
/// `Idle → LiveCapture → Frozen → Edit`, with upload jumping `Idle → Edit`
/// and reset returning to `Idle` from anywhere.
pub struct Controller {
    mode: SessionMode,
    facing: Facing,
    resolution: CaptureResolution,
    spec: FrameSpec,
    stream: Option<Box<dyn CaptureStream>>,
    still: Option<ImageSource>,
    generation: u64,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        Self {
            mode: SessionMode::Idle,
            facing: Facing::User,
            resolution: CaptureResolution::default(),
            spec: FrameSpec::default(),
            stream: None,
            still: None,
            generation: 0,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn active_spec(&self) -> &FrameSpec {
        &self.spec
    }

    /// Pre-capture aspect toggle; determines the still's rasterization
    /// target and the initial frame selection handed to the compositor.
    pub fn set_frame_variant(&mut self, variant: FrameVariant) {
        self.spec = FrameSpec::for_variant(variant);
    }

    pub fn constraints(&self) -> CaptureConstraints {
        CaptureConstraints {
            resolution: self.resolution,
            facing: self.facing,
        }
    }

    /// Uploaded stills are never mirrored; live captures from the
    /// front-facing camera are mirrored at export time only, so the stored
    /// still stays canonical.
    pub fn mirror_default(&self) -> bool {
        self.facing == Facing::User
    }

    /// Enter live capture and request the device. The returned ticket must
    /// accompany the asynchronous resolution in [`Controller::attach_stream`].
    pub fn open_camera(&mut self) -> StreamTicket {
        self.mode = SessionMode::LiveCapture;
        self.stream = None;
        self.generation += 1;
        debug!(generation = self.generation, facing = ?self.facing, "open camera");
        StreamTicket(self.generation)
    }

    /// Flip between the user- and environment-facing device. Re-requests the
    /// stream when live; last applied wins.
    pub fn toggle_facing(&mut self) -> Option<StreamTicket> {
        self.facing = self.facing.toggled();
        if self.mode == SessionMode::LiveCapture {
            self.stream = None;
            self.generation += 1;
            debug!(generation = self.generation, facing = ?self.facing, "re-request stream");
            Some(StreamTicket(self.generation))
        } else {
            None
        }
    }

    /// Deliver the result of an asynchronous device acquisition.
    ///
    /// A resolution that arrives after the user navigated away (mode no
    /// longer `LiveCapture`) or after a newer request (stale ticket) is
    /// silently discarded. A device failure returns the controller to `Idle`
    /// and propagates as a user-visible notice; there is no retry loop.
    pub fn attach_stream(
        &mut self,
        ticket: StreamTicket,
        result: BoothResult<Box<dyn CaptureStream>>,
    ) -> BoothResult<()> {
        if self.mode != SessionMode::LiveCapture || ticket.0 != self.generation {
            debug!(ticket = ticket.0, generation = self.generation, "discard stale stream resolution");
            return Ok(());
        }
        match result {
            Ok(stream) => {
                self.stream = Some(stream);
                Ok(())
            }
            Err(err) => {
                self.mode = SessionMode::Idle;
                Err(err)
            }
        }
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Freeze the live feed: grab the current frame and rasterize it
    /// cover-cropped at the active frame's output resolution, so no further
    /// upscaling is needed downstream. The still is stored unmirrored.
    pub fn capture(&mut self) -> BoothResult<ImageSource> {
        if self.mode != SessionMode::LiveCapture {
            return Err(BoothError::validation("capture requires live mode"));
        }
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| BoothError::device_access("no live stream attached"))?;

        let frame = stream.grab_frame()?;
        let still = export::rasterize_cover(&frame, self.spec.output)?;
        self.still = Some(still.clone());
        self.mode = SessionMode::Frozen;
        debug!(
            width = still.width(),
            height = still.height(),
            "captured still"
        );
        Ok(still)
    }

    /// Decode an uploaded file and make it the session still.
    pub fn upload(&mut self, bytes: &[u8]) -> BoothResult<ImageSource> {
        let still = ImageSource::decode(bytes)?;
        self.still = Some(still.clone());
        self.stream = None;
        self.mode = SessionMode::Edit;
        debug!(
            width = still.width(),
            height = still.height(),
            "uploaded still"
        );
        Ok(still)
    }

    /// Hand the frozen still over to editing.
    pub fn edit(&mut self) {
        if self.mode == SessionMode::Frozen {
            self.mode = SessionMode::Edit;
        }
    }

    pub fn still(&self) -> Option<&ImageSource> {
        self.still.as_ref()
    }

    /// Back to `Idle` from any state, discarding the still and the stream.
    /// The frame selection returns to its default; the facing preference is
    /// kept.
    pub fn reset(&mut self) {
        debug!("reset session");
        self.mode = SessionMode::Idle;
        self.stream = None;
        self.still = None;
        self.spec = FrameSpec::default();
    }
}
