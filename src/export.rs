use crate::{
    composite,
    core::{Affine, OutputSize, Point, Rect, Rgba8Premul, Viewport},
    error::{BoothError, BoothResult},
    frame::FrameSpec,
    source::ImageSource,
    transform::TransformState,
};

/// Opaque background behind the photo layer. Prevents transparent gaps when
/// the panned photo no longer covers the whole frame.
pub const BACKGROUND: Rgba8Premul = Rgba8Premul {
    r: 0,
    g: 0,
    b: 0,
    a: 255,
};

/// Final composite, sized exactly to the frame's output resolution times the
/// device pixel ratio, losslessly encoded.
#[derive(Clone, Debug)]
pub struct ExportArtifact {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Source crop rectangle for the "cover" fill policy: the image is scaled
/// uniformly until it covers the output box on both axes, then center-cropped
/// on the overflowing axis.
pub fn cover_crop(natural_width: u32, natural_height: u32, output_aspect: f64) -> Rect {
    let iw = f64::from(natural_width);
    let ih = f64::from(natural_height);
    let image_aspect = iw / ih;

    if image_aspect > output_aspect {
        let crop_w = ih * output_aspect;
        let x = (iw - crop_w) / 2.0;
        Rect::new(x, 0.0, x + crop_w, ih)
    } else {
        let crop_h = iw / output_aspect;
        let y = (ih - crop_h) / 2.0;
        Rect::new(0.0, y, iw, y + crop_h)
    }
}

/// Uniform conversion factor from preview pixels to logical output pixels.
/// The preview box is laid out to the output's aspect ratio, so one scalar
/// covers both axes.
pub fn preview_to_output_scale(output: OutputSize, viewport: Viewport) -> f64 {
    f64::from(output.width) / viewport.width
}

/// The transform applied to the photo layer only, in logical output
/// coordinates: horizontal mirror about the output's vertical center line,
/// then the pan offset scaled up from preview pixels, then the zoom pivoted
/// on the output center.
pub fn photo_affine(output: OutputSize, viewport: Viewport, transform: &TransformState) -> Affine {
    let w = f64::from(output.width);
    let h = f64::from(output.height);

    let mirror = if transform.mirrored {
        Affine::translate((w, 0.0)) * Affine::scale_non_uniform(-1.0, 1.0)
    } else {
        Affine::IDENTITY
    };

    let s = preview_to_output_scale(output, viewport);
    let pan = Affine::translate(transform.offset * s);

    let center = kurbo::Vec2::new(w / 2.0, h / 2.0);
    let zoom =
        Affine::translate(center) * Affine::scale(transform.scale) * Affine::translate(-center);

    mirror * pan * zoom
}

/// Replay the interactive transform onto an offscreen raster and composite
/// the frame overlay on top.
///
/// Draw order:
/// 1. opaque background fill,
/// 2. the cover-cropped photo under [`photo_affine`] (transform bracketed
///    around this draw only),
/// 3. the overlay stretched to full output, untransformed.
///
/// The overlay is a fixed decorative layer and must never be affected by the
/// user's pan/zoom/mirror.
#[tracing::instrument(skip_all, fields(variant = %spec.variant))]
pub fn compose(
    photo: &ImageSource,
    overlay: &ImageSource,
    spec: &FrameSpec,
    viewport: Viewport,
    transform: &TransformState,
) -> BoothResult<ExportArtifact> {
    spec.validate()?;

    let out_w = f64::from(spec.output.width);
    let out_h = f64::from(spec.output.height);
    let dpr = viewport.device_pixel_ratio;

    let surface_w = (out_w * dpr).round() as u32;
    let surface_h = (out_h * dpr).round() as u32;
    if surface_w == 0 || surface_h == 0 {
        return Err(BoothError::export("export surface collapsed to zero size"));
    }

    let mut surface = vec![0u8; surface_w as usize * surface_h as usize * 4];
    composite::fill(&mut surface, BACKGROUND.to_array());

    // Device pixels -> logical output coordinates -> photo layer space.
    let device = Affine::scale(dpr) * photo_affine(spec.output, viewport, transform);
    let inverse = device.inverse();

    let crop = cover_crop(photo.width(), photo.height(), spec.output.aspect());

    for py in 0..surface_h {
        for px in 0..surface_w {
            let p = Point::new(f64::from(px) + 0.5, f64::from(py) + 0.5);
            let q = inverse * p;
            if q.x < 0.0 || q.x >= out_w || q.y < 0.0 || q.y >= out_h {
                continue;
            }
            let u = crop.x0 + (q.x / out_w) * crop.width();
            let v = crop.y0 + (q.y / out_h) * crop.height();
            let src = photo.sample_bilinear(u, v);

            let idx = (py as usize * surface_w as usize + px as usize) * 4;
            let dst = [
                surface[idx],
                surface[idx + 1],
                surface[idx + 2],
                surface[idx + 3],
            ];
            surface[idx..idx + 4].copy_from_slice(&composite::over(dst, src));
        }
    }

    draw_stretched_over(&mut surface, surface_w, surface_h, overlay);

    let png = encode_png_straight(&surface, surface_w, surface_h)?;
    Ok(ExportArtifact {
        filename: spec.download_filename().to_string(),
        width: surface_w,
        height: surface_h,
        png,
    })
}

/// Rasterize a source frame cover-cropped at the output resolution, with no
/// user transform. Used when freezing a live capture so the stored still
/// needs no later upscaling.
pub fn rasterize_cover(src: &ImageSource, output: OutputSize) -> BoothResult<ImageSource> {
    let w = output.width;
    let h = output.height;
    let crop = cover_crop(src.width(), src.height(), output.aspect());

    let mut buf = vec![0u8; w as usize * h as usize * 4];
    for y in 0..h {
        for x in 0..w {
            let u = crop.x0 + ((f64::from(x) + 0.5) / f64::from(w)) * crop.width();
            let v = crop.y0 + ((f64::from(y) + 0.5) / f64::from(h)) * crop.height();
            let px = src.sample_bilinear(u, v);
            let idx = (y as usize * w as usize + x as usize) * 4;
            buf[idx..idx + 4].copy_from_slice(&px);
        }
    }
    ImageSource::from_premul_parts(w, h, buf)
}

fn draw_stretched_over(dst: &mut [u8], dst_w: u32, dst_h: u32, src: &ImageSource) {
    let sx = f64::from(src.width()) / f64::from(dst_w);
    let sy = f64::from(src.height()) / f64::from(dst_h);

    for y in 0..dst_h {
        for x in 0..dst_w {
            let u = (f64::from(x) + 0.5) * sx;
            let v = (f64::from(y) + 0.5) * sy;
            let s = src.sample_bilinear(u, v);
            if s[3] == 0 {
                continue;
            }
            let idx = (y as usize * dst_w as usize + x as usize) * 4;
            let d = [dst[idx], dst[idx + 1], dst[idx + 2], dst[idx + 3]];
            dst[idx..idx + 4].copy_from_slice(&composite::over(d, s));
        }
    }
}

fn encode_png_straight(premul: &[u8], width: u32, height: u32) -> BoothResult<Vec<u8>> {
    let mut straight = premul.to_vec();
    for px in straight.chunks_exact_mut(4) {
        let a = px[3];
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        if a == 255 {
            continue;
        }
        for c in px.iter_mut().take(3) {
            *c = ((u32::from(*c) * 255 + u32::from(a) / 2) / u32::from(a)).min(255) as u8;
        }
    }

    let img = image::RgbaImage::from_raw(width, height, straight)
        .ok_or_else(|| BoothError::export("surface byte length mismatch"))?;
    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| BoothError::export(format!("png encode: {e}")))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Vec2;

    #[test]
    fn cover_crop_wide_image_crops_width() {
        // imgRatio 2.0 > outputRatio 0.8: full height, width = 1000*0.8.
        let crop = cover_crop(2000, 1000, 0.8);
        assert_eq!(crop.y0, 0.0);
        assert_eq!(crop.height(), 1000.0);
        assert!((crop.width() - 800.0).abs() < 1e-9);
        assert!((crop.x0 - 600.0).abs() < 1e-9);
    }

    #[test]
    fn cover_crop_tall_image_crops_height() {
        let crop = cover_crop(1000, 4000, 0.8);
        assert_eq!(crop.x0, 0.0);
        assert_eq!(crop.width(), 1000.0);
        assert!((crop.height() - 1250.0).abs() < 1e-9);
        assert!((crop.y0 - (4000.0 - 1250.0) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn cover_crop_invariants_over_dimension_sweep() {
        let aspects = [0.8, 9.0 / 16.0];
        let dims = [
            (1, 1),
            (10, 3000),
            (3000, 10),
            (1080, 1350),
            (1920, 1080),
            (997, 1231),
        ];
        for &aspect in &aspects {
            for &(w, h) in &dims {
                let crop = cover_crop(w, h, aspect);
                assert!(crop.width() <= f64::from(w) + 1e-9);
                assert!(crop.height() <= f64::from(h) + 1e-9);
                assert!((crop.width() / crop.height() - aspect).abs() < 1e-9);
                // Centered on whichever axis was cropped.
                assert!((crop.x0 - (f64::from(w) - crop.width()) / 2.0).abs() < 1e-9);
                assert!((crop.y0 - (f64::from(h) - crop.height()) / 2.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn preview_scale_is_output_width_over_viewport_width() {
        let output = OutputSize {
            width: 1080,
            height: 1350,
        };
        let viewport = Viewport::new(400.0, 500.0, 1.0).unwrap();
        assert!((preview_to_output_scale(output, viewport) - 2.7).abs() < 1e-12);
    }

    #[test]
    fn photo_affine_identity_transform_is_identity() {
        let output = OutputSize {
            width: 1080,
            height: 1350,
        };
        let viewport = Viewport::new(400.0, 500.0, 1.0).unwrap();
        let a = photo_affine(output, viewport, &TransformState::default());
        assert_eq!(a, Affine::IDENTITY);
    }

    #[test]
    fn photo_affine_pan_scales_preview_offset() {
        // Pan (50,50) at viewport width 400 and output width 1080
        // translates by (135,135).
        let output = OutputSize {
            width: 1080,
            height: 1350,
        };
        let viewport = Viewport::new(400.0, 500.0, 1.0).unwrap();
        let t = TransformState {
            offset: Vec2::new(50.0, 50.0),
            scale: 1.0,
            mirrored: false,
        };
        let a = photo_affine(output, viewport, &t);
        let moved = a * Point::new(0.0, 0.0);
        assert!((moved.x - 135.0).abs() < 1e-9);
        assert!((moved.y - 135.0).abs() < 1e-9);
    }

    #[test]
    fn photo_affine_zoom_pivots_on_output_center() {
        let output = OutputSize {
            width: 1080,
            height: 1350,
        };
        let viewport = Viewport::new(400.0, 500.0, 1.0).unwrap();
        let t = TransformState {
            offset: Vec2::ZERO,
            scale: 2.0,
            mirrored: false,
        };
        let a = photo_affine(output, viewport, &t);
        let center = Point::new(540.0, 675.0);
        let mapped = a * center;
        assert!((mapped - center).hypot() < 1e-9);

        let corner = a * Point::new(0.0, 0.0);
        assert!((corner.x - -540.0).abs() < 1e-9);
        assert!((corner.y - -675.0).abs() < 1e-9);
    }

    #[test]
    fn photo_affine_mirror_flips_about_vertical_center() {
        let output = OutputSize {
            width: 1080,
            height: 1350,
        };
        let viewport = Viewport::new(400.0, 500.0, 1.0).unwrap();
        let t = TransformState {
            offset: Vec2::ZERO,
            scale: 1.0,
            mirrored: true,
        };
        let a = photo_affine(output, viewport, &t);
        let mapped = a * Point::new(0.0, 10.0);
        assert!((mapped.x - 1080.0).abs() < 1e-9);
        assert!((mapped.y - 10.0).abs() < 1e-9);

        let center = a * Point::new(540.0, 0.0);
        assert!((center.x - 540.0).abs() < 1e-9);
    }

    #[test]
    fn rasterize_cover_output_dimensions_and_center_pixel() {
        let mut buf = vec![0u8; 4 * 2 * 4];
        // 4x2 image, left half red, right half blue.
        for x in 0..4usize {
            for y in 0..2usize {
                let idx = (y * 4 + x) * 4;
                let px: [u8; 4] = if x < 2 { [255, 0, 0, 255] } else { [0, 0, 255, 255] };
                buf[idx..idx + 4].copy_from_slice(&px);
            }
        }
        let src = ImageSource::from_premul_parts(4, 2, buf).unwrap();
        let out = rasterize_cover(
            &src,
            OutputSize {
                width: 8,
                height: 8,
            },
        )
        .unwrap();
        assert_eq!(out.width(), 8);
        assert_eq!(out.height(), 8);

        // Square output from a 2:1 source crops width, keeping the middle:
        // left columns sample red, right columns blue.
        assert_eq!(out.sample_bilinear(1.0, 4.0)[0], 255);
        assert_eq!(out.sample_bilinear(7.0, 4.0)[2], 255);
    }
}
