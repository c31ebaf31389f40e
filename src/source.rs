use std::{collections::HashMap, path::PathBuf, sync::Arc};

use anyhow::Context;

use crate::{
    composite::PremulRgba8,
    error::{BoothError, BoothResult},
    frame::{FrameSpec, FrameVariant},
};

/// An immutable decoded raster image, premultiplied RGBA8.
///
/// One of these is produced per editing session (by capture or upload) and
/// owned by the compositor until reset. Overlay graphics use the same type.
#[derive(Clone, Debug)]
pub struct ImageSource {
    width: u32,
    height: u32,
    rgba8_premul: Arc<Vec<u8>>,
}

impl ImageSource {
    /// Decode an encoded image (PNG, JPEG, ...) into premultiplied RGBA8.
    pub fn decode(bytes: &[u8]) -> BoothResult<Self> {
        let dyn_img = image::load_from_memory(bytes)
            .context("decode image from memory")
            .map_err(|e| BoothError::decode(format!("{e:#}")))?;
        let rgba = dyn_img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let mut rgba8_premul = rgba.into_raw();
        premultiply_rgba8_in_place(&mut rgba8_premul);

        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Wrap an already premultiplied RGBA8 buffer.
    pub fn from_premul_parts(width: u32, height: u32, rgba8_premul: Vec<u8>) -> BoothResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| BoothError::validation("image byte length overflow"))?;
        if width == 0 || height == 0 {
            return Err(BoothError::validation("image must be > 0 on both axes"));
        }
        if rgba8_premul.len() != expected {
            return Err(BoothError::validation(
                "image byte length must be width*height*4",
            ));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    pub fn rgba8_premul(&self) -> &[u8] {
        &self.rgba8_premul
    }

    fn pixel(&self, x: u32, y: u32) -> PremulRgba8 {
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = &self.rgba8_premul[idx..idx + 4];
        [px[0], px[1], px[2], px[3]]
    }

    /// Bilinear sample at continuous source coordinates (pixel centers at
    /// integer+0.5). Coordinates outside the image clamp to the edge texel.
    pub fn sample_bilinear(&self, x: f64, y: f64) -> PremulRgba8 {
        let max_x = (self.width - 1) as f64;
        let max_y = (self.height - 1) as f64;

        let fx = (x - 0.5).clamp(0.0, max_x);
        let fy = (y - 0.5).clamp(0.0, max_y);

        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;

        let x0 = x0 as u32;
        let y0 = y0 as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let p00 = self.pixel(x0, y0);
        let p10 = self.pixel(x1, y0);
        let p01 = self.pixel(x0, y1);
        let p11 = self.pixel(x1, y1);

        let mut out = [0u8; 4];
        for i in 0..4 {
            let top = lerp(f64::from(p00[i]), f64::from(p10[i]), tx);
            let bot = lerp(f64::from(p01[i]), f64::from(p11[i]), tx);
            out[i] = lerp(top, bot, ty).round().clamp(0.0, 255.0) as u8;
        }
        out
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Per-variant cache of decoded frame overlay graphics.
///
/// Overlays live at fixed well-known paths under one assets root; a decode
/// failure surfaces as [`BoothError::Decode`] so the caller can distinguish a
/// broken asset from a successful export.
#[derive(Debug, Default)]
pub struct OverlayStore {
    root: PathBuf,
    cache: HashMap<FrameVariant, ImageSource>,
}

impl OverlayStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    /// Preload an already decoded overlay (tests, embedded assets).
    pub fn insert(&mut self, variant: FrameVariant, overlay: ImageSource) {
        self.cache.insert(variant, overlay);
    }

    pub fn get_or_load(&mut self, spec: &FrameSpec) -> BoothResult<&ImageSource> {
        if !self.cache.contains_key(&spec.variant) {
            let path = self.root.join(&spec.overlay_path);
            let bytes = std::fs::read(&path)
                .with_context(|| format!("read overlay graphic {}", path.display()))
                .map_err(|e| BoothError::decode(format!("{e:#}")))?;
            let overlay = ImageSource::decode(&bytes)?;
            self.cache.insert(spec.variant, overlay);
        }
        Ok(&self.cache[&spec.variant])
    }
}
