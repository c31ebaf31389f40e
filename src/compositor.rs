use tracing::debug;

use crate::{
    core::{Point, Viewport},
    error::BoothResult,
    export::{self, ExportArtifact},
    frame::{FrameSpec, FrameVariant},
    gesture::{GestureMachine, PointerId},
    source::{ImageSource, OverlayStore},
    transform::TransformState,
};

/// Compositor lifecycle inside the controller's single "Edit" mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditPhase {
    /// No image ingested yet (or the session was reset).
    Inactive,
    /// Interactive: pan/zoom gestures are accepted.
    Editing,
    /// Frozen by `finish()`: the transform is locked in, ready to export.
    Finished,
}

/// Pan-Zoom Compositor.
///
/// Consumes the still image produced by the session controller, tracks the
/// user's transform against the measured preview viewport, and on demand
/// replays that transform pixel-exactly onto an offscreen raster via
/// [`export::compose`].
///
/// Preview and export both use the "cover" fill policy, so the preview is
/// what the export produces.
#[derive(Debug)]
pub struct Compositor {
    source: Option<ImageSource>,
    spec: FrameSpec,
    viewport: Option<Viewport>,
    transform: TransformState,
    gestures: GestureMachine,
    phase: EditPhase,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    pub fn new() -> Self {
        Self {
            source: None,
            spec: FrameSpec::default(),
            viewport: None,
            transform: TransformState::default(),
            gestures: GestureMachine::new(),
            phase: EditPhase::Inactive,
        }
    }

    /// Take ownership of a new still for one editing session. Always resets
    /// the transform to identity, whatever the prior state.
    pub fn ingest(&mut self, source: ImageSource, mirror_default: bool) {
        debug!(
            width = source.width(),
            height = source.height(),
            mirror_default,
            "ingest image source"
        );
        self.transform.reset(mirror_default);
        self.gestures.clear();
        self.source = Some(source);
        self.phase = EditPhase::Editing;
    }

    /// Switch the active frame variant. The transform state is intentionally
    /// preserved so the user can re-crop without losing their pan position.
    pub fn set_frame_variant(&mut self, variant: FrameVariant) {
        self.spec = FrameSpec::for_variant(variant);
    }

    /// Record the on-screen preview box. Export is a silent no-op until the
    /// viewport has been measured.
    pub fn measure_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    pub fn editable(&self) -> bool {
        self.phase == EditPhase::Editing && self.source.is_some()
    }

    pub fn phase(&self) -> EditPhase {
        self.phase
    }

    pub fn spec(&self) -> &FrameSpec {
        &self.spec
    }

    pub fn transform(&self) -> &TransformState {
        &self.transform
    }

    pub fn source(&self) -> Option<&ImageSource> {
        self.source.as_ref()
    }

    /// Programmatic pan in preview pixels. Unbounded, like the gestures.
    pub fn apply_pan(&mut self, dx: f64, dy: f64) {
        if self.editable() {
            self.transform.pan_by(dx, dy);
        }
    }

    /// Programmatic wheel-style zoom in notches (±0.1 scale per notch).
    pub fn apply_zoom(&mut self, notches: f64) {
        if self.editable() {
            self.transform.zoom_step(notches);
        }
    }

    pub fn pointer_down(&mut self, id: PointerId, pos: Point) {
        let editable = self.editable();
        self.gestures
            .pointer_down(id, pos, &mut self.transform, editable);
    }

    pub fn pointer_move(&mut self, id: PointerId, pos: Point) {
        let editable = self.editable();
        self.gestures
            .pointer_move(id, pos, &mut self.transform, editable);
    }

    pub fn pointer_up(&mut self, id: PointerId) {
        self.gestures.pointer_up(id);
    }

    pub fn pointer_cancel(&mut self, id: PointerId) {
        self.gestures.pointer_cancel(id);
    }

    pub fn wheel(&mut self, delta_y: f64) {
        let editable = self.editable();
        self.gestures.wheel(delta_y, &mut self.transform, editable);
    }

    /// Freeze interactivity; further pan/zoom input is ignored.
    pub fn finish(&mut self) {
        if self.phase == EditPhase::Editing {
            debug!("finish editing");
            self.gestures.clear();
            self.phase = EditPhase::Finished;
        }
    }

    /// Back to interactive editing without losing the transform.
    pub fn reopen(&mut self) {
        if self.phase == EditPhase::Finished {
            self.phase = EditPhase::Editing;
        }
    }

    /// Produce the final composite.
    ///
    /// Returns `Ok(None)` when preconditions are missing (no ingested image,
    /// or the viewport has not been measured) — disallowed UI sequencing is
    /// not a fault. A broken overlay graphic aborts with
    /// [`crate::BoothError::Decode`] and leaves all state untouched so the
    /// export can be retried.
    pub fn render(&self, overlays: &mut OverlayStore) -> BoothResult<Option<ExportArtifact>> {
        let (Some(source), Some(viewport)) = (self.source.as_ref(), self.viewport) else {
            debug!("render skipped: missing source or viewport");
            return Ok(None);
        };

        let overlay = overlays.get_or_load(&self.spec)?;
        let artifact = export::compose(source, overlay, &self.spec, viewport, &self.transform)?;
        Ok(Some(artifact))
    }

    /// Discard the session: image source, transform, and frame selection all
    /// return to defaults. The measured viewport survives (the widget is
    /// still on screen).
    pub fn reset(&mut self) {
        debug!("reset compositor");
        self.source = None;
        self.transform = TransformState::default();
        self.spec = FrameSpec::default();
        self.gestures.clear();
        self.phase = EditPhase::Inactive;
    }
}
