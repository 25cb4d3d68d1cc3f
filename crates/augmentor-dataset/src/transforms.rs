//! Geometric transforms for dataset augmentation.
//!
//! Each transform is a pure function from one image to a new image. The
//! parameterized forms ([`flip`], [`rotate`], [`scale`], [`translate`]) are
//! deterministic; [`random_augment`] picks one of them uniformly and draws
//! its parameters from the random source passed in by the caller.
//!
//! # Fill policy
//!
//! Rotate and translate sample the input through an inverse mapping with
//! bilinear interpolation. Output pixels whose source position falls outside
//! the input are left at zero in every channel: black, and fully transparent
//! when the image has an alpha channel.

use augmentor_core::{Error, ImageDimensions, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageBuffer, Pixel};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Rotation angles are drawn from `[-MAX_ROTATION_DEGREES, MAX_ROTATION_DEGREES]`
pub const MAX_ROTATION_DEGREES: f32 = 30.0;

/// Scale factors are drawn from this inclusive range
pub const SCALE_RANGE: (f32, f32) = (0.5, 1.5);

/// Translation offsets are drawn from `±MAX_TRANSLATION_FRACTION` of each side
pub const MAX_TRANSLATION_FRACTION: f32 = 0.2;

/// Slack allowed when a source position lands just outside the last pixel
const EDGE_EPSILON: f32 = 1e-4;

/// Mirror axis of a flip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlipAxis {
    /// Mirror left to right
    Horizontal,
    /// Mirror top to bottom
    Vertical,
    /// Mirror along both axes
    Both,
}

impl FlipAxis {
    pub const ALL: [FlipAxis; 3] = [FlipAxis::Horizontal, FlipAxis::Vertical, FlipAxis::Both];
}

impl std::fmt::Display for FlipAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlipAxis::Horizontal => write!(f, "horizontal"),
            FlipAxis::Vertical => write!(f, "vertical"),
            FlipAxis::Both => write!(f, "both"),
        }
    }
}

/// The four transform families an augmentation is chosen from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    Flip,
    Rotate,
    Scale,
    Translate,
}

impl TransformKind {
    pub const ALL: [TransformKind; 4] = [
        TransformKind::Flip,
        TransformKind::Rotate,
        TransformKind::Scale,
        TransformKind::Translate,
    ];

    /// Picks one kind uniformly at random.
    ///
    /// Every call is independent: no memory of earlier picks and no
    /// balancing across a dataset.
    pub fn choose<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// Draws concrete parameters for this kind.
    ///
    /// Translation offsets depend on the size of `image`.
    pub fn draw<R: Rng>(self, image: &DynamicImage, rng: &mut R) -> AppliedTransform {
        match self {
            TransformKind::Flip => AppliedTransform::Flip {
                axis: FlipAxis::ALL[rng.gen_range(0..FlipAxis::ALL.len())],
            },
            TransformKind::Rotate => AppliedTransform::Rotate {
                degrees: rng.gen_range(-MAX_ROTATION_DEGREES..=MAX_ROTATION_DEGREES),
            },
            TransformKind::Scale => AppliedTransform::Scale {
                factor: rng.gen_range(SCALE_RANGE.0..=SCALE_RANGE.1),
            },
            TransformKind::Translate => {
                let (width, height) = image.dimensions();
                let max_dx = MAX_TRANSLATION_FRACTION * width as f32;
                let max_dy = MAX_TRANSLATION_FRACTION * height as f32;
                AppliedTransform::Translate {
                    dx: rng.gen_range(-max_dx..=max_dx),
                    dy: rng.gen_range(-max_dy..=max_dy),
                }
            }
        }
    }
}

impl std::fmt::Display for TransformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformKind::Flip => write!(f, "flip"),
            TransformKind::Rotate => write!(f, "rotate"),
            TransformKind::Scale => write!(f, "scale"),
            TransformKind::Translate => write!(f, "translate"),
        }
    }
}

/// A transform kind together with the parameters drawn for one image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppliedTransform {
    Flip { axis: FlipAxis },
    Rotate { degrees: f32 },
    Scale { factor: f32 },
    Translate { dx: f32, dy: f32 },
}

impl AppliedTransform {
    pub fn kind(&self) -> TransformKind {
        match self {
            AppliedTransform::Flip { .. } => TransformKind::Flip,
            AppliedTransform::Rotate { .. } => TransformKind::Rotate,
            AppliedTransform::Scale { .. } => TransformKind::Scale,
            AppliedTransform::Translate { .. } => TransformKind::Translate,
        }
    }

    /// Applies the transform to `image`, producing a new image
    pub fn apply(&self, image: &DynamicImage) -> Result<DynamicImage> {
        match *self {
            AppliedTransform::Flip { axis } => flip(image, axis),
            AppliedTransform::Rotate { degrees } => rotate(image, degrees),
            AppliedTransform::Scale { factor } => scale(image, factor),
            AppliedTransform::Translate { dx, dy } => translate(image, dx, dy),
        }
    }
}

impl std::fmt::Display for AppliedTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppliedTransform::Flip { axis } => write!(f, "flip({})", axis),
            AppliedTransform::Rotate { degrees } => write!(f, "rotate({:.2}°)", degrees),
            AppliedTransform::Scale { factor } => write!(f, "scale({:.3}x)", factor),
            AppliedTransform::Translate { dx, dy } => {
                write!(f, "translate({:.2}, {:.2})", dx, dy)
            }
        }
    }
}

/// Picks one transform uniformly, draws its parameters and applies it
pub fn random_augment<R: Rng>(
    image: &DynamicImage,
    rng: &mut R,
) -> Result<(AppliedTransform, DynamicImage)> {
    validate_image(image)?;
    let transform = TransformKind::choose(rng).draw(image, rng);
    let augmented = transform.apply(image)?;
    Ok((transform, augmented))
}

/// Rejects images without at least one pixel
pub fn validate_image(image: &DynamicImage) -> Result<()> {
    let dims = ImageDimensions::of(image);
    if dims.is_degenerate() {
        return Err(Error::InvalidImage(format!(
            "image must be at least 1x1, got {}x{}",
            dims.width, dims.height
        )));
    }
    Ok(())
}

/// Mirrors the image along `axis`
pub fn flip(image: &DynamicImage, axis: FlipAxis) -> Result<DynamicImage> {
    validate_image(image)?;
    Ok(match axis {
        FlipAxis::Horizontal => image.fliph(),
        FlipAxis::Vertical => image.flipv(),
        FlipAxis::Both => image.rotate180(),
    })
}

/// Rotates about the image center by `degrees` (counter-clockwise).
///
/// The canvas keeps the input size; corners that rotate out are clipped and
/// revealed areas are filled with zero.
pub fn rotate(image: &DynamicImage, degrees: f32) -> Result<DynamicImage> {
    validate_image(image)?;
    ensure_finite("rotation angle", degrees)?;

    let (width, height) = image.dimensions();
    let cx = (width - 1) as f32 / 2.0;
    let cy = (height - 1) as f32 / 2.0;
    let (sin_a, cos_a) = degrees.to_radians().sin_cos();

    Ok(warp_dynamic(image, |x, y| {
        let dx = x - cx;
        let dy = y - cy;
        (cx + dx * cos_a - dy * sin_a, cy + dx * sin_a + dy * cos_a)
    }))
}

/// Resizes by `factor` to `round(W·factor) x round(H·factor)`
pub fn scale(image: &DynamicImage, factor: f32) -> Result<DynamicImage> {
    validate_image(image)?;
    if !(factor.is_finite() && factor > 0.0) {
        return Err(Error::InvalidInput(format!(
            "scale factor must be positive and finite, got {}",
            factor
        )));
    }

    let (width, height) = scaled_dimensions(image.dimensions(), factor);
    Ok(image.resize_exact(width, height, FilterType::Triangle))
}

/// Output size of [`scale`]; each side is at least one pixel
pub fn scaled_dimensions((width, height): (u32, u32), factor: f32) -> (u32, u32) {
    let scaled = |side: u32| ((side as f64 * factor as f64).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Shifts the content by `(dx, dy)` pixels on an unchanged canvas
pub fn translate(image: &DynamicImage, dx: f32, dy: f32) -> Result<DynamicImage> {
    validate_image(image)?;
    ensure_finite("horizontal offset", dx)?;
    ensure_finite("vertical offset", dy)?;

    Ok(warp_dynamic(image, |x, y| (x - dx, y - dy)))
}

fn ensure_finite(what: &str, value: f32) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::InvalidInput(format!(
            "{} must be finite, got {}",
            what, value
        )));
    }
    Ok(())
}

/// Runs [`warp`] on the 8-bit buffer behind `image`.
///
/// 16-bit and float images are converted to 8-bit RGB(A) first.
fn warp_dynamic<F>(image: &DynamicImage, inverse: F) -> DynamicImage
where
    F: Fn(f32, f32) -> (f32, f32),
{
    match image {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(warp(buf, inverse)),
        DynamicImage::ImageLumaA8(buf) => DynamicImage::ImageLumaA8(warp(buf, inverse)),
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(warp(buf, inverse)),
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(warp(buf, inverse)),
        other if other.color().has_alpha() => {
            DynamicImage::ImageRgba8(warp(&other.to_rgba8(), inverse))
        }
        other => DynamicImage::ImageRgb8(warp(&other.to_rgb8(), inverse)),
    }
}

/// Builds a same-size image where each output pixel `(x, y)` is sampled from
/// the input at `inverse(x, y)`
fn warp<P, F>(src: &ImageBuffer<P, Vec<u8>>, inverse: F) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
    F: Fn(f32, f32) -> (f32, f32),
{
    let (width, height) = src.dimensions();
    let mut output = ImageBuffer::new(width, height);

    for (x, y, pixel) in output.enumerate_pixels_mut() {
        let (src_x, src_y) = inverse(x as f32, y as f32);
        if let Some(sampled) = bilinear_sample(src, src_x, src_y) {
            *pixel = sampled;
        }
    }

    output
}

/// Sample a pixel using bilinear interpolation, `None` outside the image
fn bilinear_sample<P>(img: &ImageBuffer<P, Vec<u8>>, x: f32, y: f32) -> Option<P>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = img.dimensions();
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;

    // Written as a positive range check so NaN coordinates fall outside.
    let inside = x >= -EDGE_EPSILON
        && y >= -EDGE_EPSILON
        && x <= max_x + EDGE_EPSILON
        && y <= max_y + EDGE_EPSILON;
    if !inside {
        return None;
    }

    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0).channels();
    let p10 = img.get_pixel(x1, y0).channels();
    let p01 = img.get_pixel(x0, y1).channels();
    let p11 = img.get_pixel(x1, y1).channels();

    let mut result = *img.get_pixel(x0, y0);
    for (c, value) in result.channels_mut().iter_mut().enumerate() {
        let v = p00[c] as f32 * (1.0 - fx) * (1.0 - fy)
            + p10[c] as f32 * fx * (1.0 - fy)
            + p01[c] as f32 * (1.0 - fx) * fy
            + p11[c] as f32 * fx * fy;

        *value = v.round().clamp(0.0, 255.0) as u8;
    }

    Some(result)
}
