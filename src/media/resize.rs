use std::borrow::Cow;
use std::io::Cursor;

use gif::{ColorOutput, DecodeOptions, DisposalMethod, Encoder, Frame, Repeat};
use image::imageops::{self, ColorMap, FilterType};
use image::{DynamicImage, ImageFormat, ImageOutputFormat, Rgba, RgbaImage};
use log::debug;

use super::error::MediaError;

pub const JPEG_QUALITY: u8 = 100;
/// Widest output accepted. Anything wider is rejected instead of allocated.
pub const MAX_SCALED_WIDTH: u32 = 8192;
const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// Scales images to a fixed height, keeping the aspect ratio and the original encoding.
#[derive(Debug, Clone, Copy)]
pub struct Resizer {
    target_height: u32,
}

impl Resizer {
    pub fn new(target_height: u32) -> Self {
        Resizer { target_height }
    }

    /// Animations are stored at half the still image height.
    pub fn gif_height(&self) -> u32 {
        (self.target_height / 2).max(1)
    }

    pub fn resize(&self, data: &[u8]) -> Result<Vec<u8>, MediaError> {
        if data.is_empty() {
            return Err(MediaError::InvalidImage("empty image data".to_string()));
        }
        if self.target_height == 0 {
            return Err(MediaError::Resize("target height must be positive".to_string()));
        }

        let format = match image::guess_format(data) {
            Ok(format) => format,
            Err(_) if is_svg(data) => {
                debug!("Keeping vector image as is");
                return Ok(data.to_vec());
            }
            Err(e) => return Err(MediaError::InvalidImage(e.to_string())),
        };

        let output = match format {
            ImageFormat::Gif => resize_gif(data, self.gif_height())?,
            format => {
                let image = image::load_from_memory_with_format(data, format)?;
                let (width, height) =
                    scaled_dimensions(image.width(), image.height(), self.target_height)?;
                let resized = image.resize_exact(width, height, RESIZE_FILTER);
                encode_still(resized, format)?
            }
        };

        if output.is_empty() {
            return Err(MediaError::Resize("resize produced no data".to_string()));
        }
        Ok(output)
    }
}

fn is_svg(data: &[u8]) -> bool {
    let head = &data[..data.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}

fn scaled_dimensions(
    width: u32,
    height: u32,
    target_height: u32,
) -> Result<(u32, u32), MediaError> {
    if width == 0 || height == 0 {
        return Err(MediaError::InvalidImage(format!(
            "image has no pixels ({}x{})",
            width, height
        )));
    }
    let scaled = (width as f64 * target_height as f64 / height as f64).round();
    if scaled > MAX_SCALED_WIDTH as f64 {
        return Err(MediaError::InvalidImage(format!(
            "aspect ratio of {}x{} too extreme to scale to height {}",
            width, height, target_height
        )));
    }
    Ok((scaled.max(1.0) as u32, target_height))
}

fn encode_still(image: DynamicImage, format: ImageFormat) -> Result<Vec<u8>, MediaError> {
    let mut out = Cursor::new(Vec::new());
    match format {
        ImageFormat::Png => image.write_to(&mut out, ImageOutputFormat::Png)?,
        // Everything else, including decodable formats we do not re-encode, becomes JPEG.
        _ => DynamicImage::ImageRgb8(image.to_rgb8())
            .write_to(&mut out, ImageOutputFormat::Jpeg(JPEG_QUALITY))?,
    }
    Ok(out.into_inner())
}

/// 216 colour cube, 39 greys and one transparent slot.
pub struct FixedPalette {
    colors: Vec<[u8; 3]>,
}

const CUBE_STEP: u8 = 51;
const GREY_COUNT: usize = 39;
pub const TRANSPARENT_INDEX: u8 = 255;

impl Default for FixedPalette {
    fn default() -> Self {
        let mut colors = Vec::with_capacity(256);
        for r in 0..6u8 {
            for g in 0..6u8 {
                for b in 0..6u8 {
                    colors.push([r * CUBE_STEP, g * CUBE_STEP, b * CUBE_STEP]);
                }
            }
        }
        for i in 0..GREY_COUNT {
            let value = grey_level(i);
            colors.push([value, value, value]);
        }
        colors.push([0, 0, 0]);
        FixedPalette { colors }
    }
}

fn grey_level(i: usize) -> u8 {
    (((i + 1) * 255) as f64 / (GREY_COUNT + 1) as f64).round() as u8
}

fn distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = *x as i32 - *y as i32;
            (d * d) as u32
        })
        .sum()
}

impl FixedPalette {
    /// Flat RGB triples as expected by the GIF encoder.
    pub fn flat(&self) -> Vec<u8> {
        self.colors.iter().flatten().copied().collect()
    }

    fn nearest(&self, rgb: [u8; 3]) -> usize {
        let level = |c: u8| ((c as u32 + CUBE_STEP as u32 / 2) / CUBE_STEP as u32) as usize;
        let cube = level(rgb[0]) * 36 + level(rgb[1]) * 6 + level(rgb[2]);

        let mean = (rgb.iter().map(|c| *c as u32).sum::<u32>() / 3) as f64;
        let grey_slot = ((mean * (GREY_COUNT + 1) as f64 / 255.0).round() as usize)
            .clamp(1, GREY_COUNT)
            - 1;
        let grey = 216 + grey_slot;

        if distance(self.colors[grey], rgb) < distance(self.colors[cube], rgb) {
            grey
        } else {
            cube
        }
    }
}

impl ColorMap for FixedPalette {
    type Color = Rgba<u8>;

    fn index_of(&self, color: &Rgba<u8>) -> usize {
        if color.0[3] < 128 {
            return TRANSPARENT_INDEX as usize;
        }
        self.nearest([color.0[0], color.0[1], color.0[2]])
    }

    fn map_color(&self, color: &mut Rgba<u8>) {
        let index = self.index_of(color);
        let [r, g, b] = self.colors[index];
        let alpha = if index == TRANSPARENT_INDEX as usize { 0 } else { 255 };
        *color = Rgba([r, g, b, alpha]);
    }
}

/// Composites every frame onto a running canvas, scales the canvas and requantises it
/// to the fixed palette. Frame count, order and delays are preserved.
fn resize_gif(data: &[u8], target_height: u32) -> Result<Vec<u8>, MediaError> {
    let mut options = DecodeOptions::new();
    options.set_color_output(ColorOutput::RGBA);
    let mut decoder = options.read_info(Cursor::new(data))?;

    let (screen_width, screen_height) = (decoder.width() as u32, decoder.height() as u32);
    let (width, height) = scaled_dimensions(screen_width, screen_height, target_height)?;
    let width = width.min(u16::MAX as u32);
    let height = height.min(u16::MAX as u32);

    let palette = FixedPalette::default();
    let mut canvas = RgbaImage::new(screen_width, screen_height);
    let mut frames = Vec::new();

    while let Some(frame) = decoder.read_next_frame()? {
        let (left, top) = (frame.left as u32, frame.top as u32);
        let frame_image = RgbaImage::from_raw(
            frame.width as u32,
            frame.height as u32,
            frame.buffer.to_vec(),
        )
        .ok_or_else(|| MediaError::InvalidImage("truncated gif frame".to_string()))?;
        let previous = (frame.dispose == DisposalMethod::Previous).then(|| canvas.clone());
        imageops::overlay(&mut canvas, &frame_image, left as i64, top as i64);

        let mut scaled = imageops::resize(&canvas, width, height, RESIZE_FILTER);
        imageops::dither(&mut scaled, &palette);
        let indexed = imageops::index_colors(&scaled, &palette);
        frames.push((indexed.into_raw(), frame.delay));

        match (frame.dispose, previous) {
            (DisposalMethod::Background, _) => {
                clear_region(&mut canvas, left, top, frame_image.width(), frame_image.height())
            }
            (DisposalMethod::Previous, Some(previous)) => canvas = previous,
            _ => {}
        }
    }

    if frames.is_empty() {
        return Err(MediaError::InvalidImage("gif has no frames".to_string()));
    }

    let mut out = Vec::new();
    {
        let flat_palette = palette.flat();
        let mut encoder = Encoder::new(&mut out, width as u16, height as u16, &flat_palette)?;
        encoder.set_repeat(Repeat::Infinite)?;
        for (indices, delay) in frames {
            let frame = Frame {
                width: width as u16,
                height: height as u16,
                buffer: Cow::Owned(indices),
                delay,
                transparent: Some(TRANSPARENT_INDEX),
                dispose: DisposalMethod::Background,
                ..Frame::default()
            };
            encoder.write_frame(&frame)?;
        }
    }
    Ok(out)
}

/// Resets a frame rectangle to transparent, clipped to the canvas.
fn clear_region(canvas: &mut RgbaImage, left: u32, top: u32, width: u32, height: u32) {
    let right = left.saturating_add(width).min(canvas.width());
    let bottom = top.saturating_add(height).min(canvas.height());
    for y in top..bottom {
        for x in left..right {
            canvas.put_pixel(x, y, Rgba([0, 0, 0, 0]));
        }
    }
}
