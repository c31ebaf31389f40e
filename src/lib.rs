#![forbid(unsafe_code)]

//! Photobooth compositing: a session controller that produces one still
//! image (live capture or upload) and a pan-zoom compositor that replays the
//! interactive preview transform pixel-exactly onto a fixed-resolution PNG
//! export with a decorative frame overlay.

pub mod composite;
pub mod compositor;
pub mod core;
pub mod error;
pub mod export;
pub mod frame;
pub mod gesture;
pub mod session;
pub mod source;
pub mod transform;

pub use compositor::{Compositor, EditPhase};
pub use crate::core::{Affine, OutputSize, Point, Rect, Rgba8Premul, Vec2, Viewport};
pub use error::{BoothError, BoothResult};
pub use export::{ExportArtifact, cover_crop, photo_affine, preview_to_output_scale};
pub use frame::{CaptureResolution, FrameSpec, FrameVariant};
pub use gesture::{GestureMachine, GesturePhase, PointerId};
pub use session::{
    CaptureConstraints, CaptureDevice, CaptureStream, Controller, Facing, SessionMode,
    StreamTicket,
};
pub use source::{ImageSource, OverlayStore};
pub use transform::{SCALE_MAX, SCALE_MIN, TransformState, WHEEL_ZOOM_STEP};
