//! Pixel normalization into the layouts the encoder accepts natively.
//!
//! A decoded image is probed in priority order:
//!
//! ```text
//! memory layout (8-bit, 1/3/4 channels) → native Gray8 → native RGBA8 → convert
//! ```
//!
//! The first three probes borrow the source pixels. Only the last one copies,
//! reading every pixel through the generic 16-bit query, so it is paid only
//! when no directly usable byte layout exists.

use image::{DynamicImage, GrayImage, Pixel, RgbaImage};
use std::borrow::Cow;

/// Native pixel layouts accepted by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Gray8,
    Rgb8,
    Rgba8,
}

impl PixelLayout {
    /// Bytes per pixel for this layout.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Gray8 => 1,
            PixelLayout::Rgb8 => 3,
            PixelLayout::Rgba8 => 4,
        }
    }

    fn from_channels(channels: usize) -> Option<Self> {
        match channels {
            1 => Some(PixelLayout::Gray8),
            3 => Some(PixelLayout::Rgb8),
            4 => Some(PixelLayout::Rgba8),
            _ => None,
        }
    }
}

/// Which path [`normalize`] takes for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativePath {
    DirectGray8,
    DirectRgb8,
    DirectRgba8,
    NeedsConversion,
}

/// Element type of a self-describing pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    U8,
    U16,
    F32,
}

impl ElementKind {
    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            ElementKind::U8 => 1,
            ElementKind::U16 => 2,
            ElementKind::F32 => 4,
        }
    }
}

/// Raw memory description exposed by images that know their own layout.
#[derive(Debug, Clone, Copy)]
pub struct MemoryLayout<'a> {
    pub channels: usize,
    pub element: ElementKind,
    pub pixels: &'a [u8],
    /// Bytes between vertically adjacent pixels.
    pub stride: usize,
}

/// A decoded image as seen by the normalizer.
///
/// Only `dimensions` and `rgba16` are required. The optional probes let an
/// image hand its pixels to the encoder without conversion.
pub trait SourceImage {
    /// Width and height in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Channel count, element type, bytes and stride, if known.
    fn memory_layout(&self) -> Option<MemoryLayout<'_>> {
        None
    }

    /// The image, if it is natively an 8-bit grayscale bitmap.
    fn as_gray8(&self) -> Option<&GrayImage> {
        None
    }

    /// The image, if it is natively an 8-bit RGBA bitmap.
    fn as_rgba8(&self) -> Option<&RgbaImage> {
        None
    }

    /// Straight (non-premultiplied) RGBA at `(x, y)`, each channel in `0..=0xFFFF`.
    fn rgba16(&self, x: u32, y: u32) -> [u16; 4];
}

/// Pixel bytes in a native layout, ready for the encoder.
#[derive(Debug, Clone)]
pub struct NativeBuffer<'a> {
    pixels: Cow<'a, [u8]>,
    width: u32,
    height: u32,
    stride: usize,
    layout: PixelLayout,
}

impl<'a> NativeBuffer<'a> {
    /// Wrap an existing buffer.
    ///
    /// Returns `None` if the stride is narrower than a row or the buffer is
    /// too short to hold `height` rows (the last row may be width-trimmed).
    pub fn new(
        pixels: impl Into<Cow<'a, [u8]>>,
        width: u32,
        height: u32,
        stride: usize,
        layout: PixelLayout,
    ) -> Option<Self> {
        let pixels = pixels.into();
        let row_bytes = width as usize * layout.bytes_per_pixel();
        if stride < row_bytes {
            return None;
        }
        let required = match height {
            0 => 0,
            h => stride * (h as usize - 1) + row_bytes,
        };
        if pixels.len() < required {
            return None;
        }
        Some(Self {
            pixels,
            width,
            height,
            stride,
            layout,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// True when the bytes are borrowed from the source image.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.pixels, Cow::Borrowed(_))
    }

    /// Iterate over rows, each trimmed to `width * bytes_per_pixel`.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        let row_bytes = self.width as usize * self.layout.bytes_per_pixel();
        (0..self.height as usize).map(move |y| &self.pixels[y * self.stride..][..row_bytes])
    }

    fn path(&self) -> NativePath {
        match self.layout {
            PixelLayout::Gray8 => NativePath::DirectGray8,
            PixelLayout::Rgb8 => NativePath::DirectRgb8,
            PixelLayout::Rgba8 => NativePath::DirectRgba8,
        }
    }
}

type Probe = for<'a> fn(&'a dyn SourceImage) -> Option<NativeBuffer<'a>>;

const PROBES: [Probe; 3] = [probe_memory_layout, probe_gray8, probe_rgba8];

fn probe_memory_layout<'a>(image: &'a dyn SourceImage) -> Option<NativeBuffer<'a>> {
    let layout = image.memory_layout()?;
    if layout.element != ElementKind::U8 {
        return None;
    }
    let pixel_layout = PixelLayout::from_channels(layout.channels)?;
    let (width, height) = image.dimensions();
    NativeBuffer::new(layout.pixels, width, height, layout.stride, pixel_layout)
}

fn probe_gray8<'a>(image: &'a dyn SourceImage) -> Option<NativeBuffer<'a>> {
    let gray = image.as_gray8()?;
    let (width, height) = gray.dimensions();
    NativeBuffer::new(
        gray.as_raw().as_slice(),
        width,
        height,
        width as usize,
        PixelLayout::Gray8,
    )
}

fn probe_rgba8<'a>(image: &'a dyn SourceImage) -> Option<NativeBuffer<'a>> {
    let rgba = image.as_rgba8()?;
    let (width, height) = rgba.dimensions();
    NativeBuffer::new(
        rgba.as_raw().as_slice(),
        width,
        height,
        width as usize * 4,
        PixelLayout::Rgba8,
    )
}

fn probe(image: &dyn SourceImage) -> Option<NativeBuffer<'_>> {
    PROBES.iter().find_map(|probe| probe(image))
}

/// Decide which path [`normalize`] would take, without converting.
pub fn classify(image: &dyn SourceImage) -> NativePath {
    probe(image)
        .map(|buffer| buffer.path())
        .unwrap_or(NativePath::NeedsConversion)
}

/// Produce a native buffer for the encoder. Never fails.
pub fn normalize(image: &dyn SourceImage) -> NativeBuffer<'_> {
    match probe(image) {
        Some(buffer) => buffer,
        None => {
            tracing::trace!("No native layout, converting to RGBA8");
            convert_to_rgba8(image)
        }
    }
}

/// Copy an image into a packed RGBA8 buffer through the generic query.
///
/// Each 16-bit channel is truncated to its high byte (`v >> 8`).
fn convert_to_rgba8(image: &dyn SourceImage) -> NativeBuffer<'static> {
    let (width, height) = image.dimensions();
    let stride = width as usize * 4;
    let mut pixels = vec![0u8; stride * height as usize];

    if stride > 0 {
        for (y, row) in pixels.chunks_exact_mut(stride).enumerate() {
            for (x, out) in row.chunks_exact_mut(4).enumerate() {
                let px = image.rgba16(x as u32, y as u32);
                for (dst, src) in out.iter_mut().zip(px) {
                    *dst = (src >> 8) as u8;
                }
            }
        }
    }

    NativeBuffer {
        pixels: Cow::Owned(pixels),
        width,
        height,
        stride,
        layout: PixelLayout::Rgba8,
    }
}

#[inline]
fn widen8(v: u8) -> u16 {
    u16::from(v) * 0x0101
}

#[inline]
fn widen_f32(v: f32) -> u16 {
    (v.clamp(0.0, 1.0) * 65535.0 + 0.5) as u16
}

impl SourceImage for DynamicImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn memory_layout(&self) -> Option<MemoryLayout<'_>> {
        let color = self.color();
        let channels = color.channel_count() as usize;
        let bytes_per_pixel = color.bytes_per_pixel() as usize;
        let element = match bytes_per_pixel / channels {
            1 => ElementKind::U8,
            2 => ElementKind::U16,
            4 => ElementKind::F32,
            _ => return None,
        };
        Some(MemoryLayout {
            channels,
            element,
            pixels: self.as_bytes(),
            stride: self.width() as usize * bytes_per_pixel,
        })
    }

    fn as_gray8(&self) -> Option<&GrayImage> {
        self.as_luma8()
    }

    fn as_rgba8(&self) -> Option<&RgbaImage> {
        DynamicImage::as_rgba8(self)
    }

    fn rgba16(&self, x: u32, y: u32) -> [u16; 4] {
        match self {
            DynamicImage::ImageLuma8(b) => b.get_pixel(x, y).to_rgba().0.map(widen8),
            DynamicImage::ImageLumaA8(b) => b.get_pixel(x, y).to_rgba().0.map(widen8),
            DynamicImage::ImageRgb8(b) => b.get_pixel(x, y).to_rgba().0.map(widen8),
            DynamicImage::ImageRgba8(b) => b.get_pixel(x, y).0.map(widen8),
            DynamicImage::ImageLuma16(b) => b.get_pixel(x, y).to_rgba().0,
            DynamicImage::ImageLumaA16(b) => b.get_pixel(x, y).to_rgba().0,
            DynamicImage::ImageRgb16(b) => b.get_pixel(x, y).to_rgba().0,
            DynamicImage::ImageRgba16(b) => b.get_pixel(x, y).0,
            DynamicImage::ImageRgb32F(b) => b.get_pixel(x, y).to_rgba().0.map(widen_f32),
            DynamicImage::ImageRgba32F(b) => b.get_pixel(x, y).0.map(widen_f32),
            other => {
                use image::GenericImageView;
                other.get_pixel(x, y).0.map(widen8)
            }
        }
    }
}

impl SourceImage for GrayImage {
    fn dimensions(&self) -> (u32, u32) {
        image::ImageBuffer::dimensions(self)
    }

    fn as_gray8(&self) -> Option<&GrayImage> {
        Some(self)
    }

    fn rgba16(&self, x: u32, y: u32) -> [u16; 4] {
        self.get_pixel(x, y).to_rgba().0.map(widen8)
    }
}

impl SourceImage for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        image::ImageBuffer::dimensions(self)
    }

    fn as_rgba8(&self) -> Option<&RgbaImage> {
        Some(self)
    }

    fn rgba16(&self, x: u32, y: u32) -> [u16; 4] {
        self.get_pixel(x, y).0.map(widen8)
    }
}

/// A strided, self-describing pixel buffer (native endian elements).
///
/// Channel counts 1 to 4 map to gray, gray+alpha, RGB and RGBA.
#[derive(Debug, Clone)]
pub struct MemImage {
    width: u32,
    height: u32,
    channels: usize,
    element: ElementKind,
    stride: usize,
    pixels: Vec<u8>,
}

impl MemImage {
    /// Wrap a pixel buffer. Returns `None` if the geometry does not fit the bytes.
    pub fn new(
        width: u32,
        height: u32,
        channels: usize,
        element: ElementKind,
        stride: usize,
        pixels: Vec<u8>,
    ) -> Option<Self> {
        if !(1..=4).contains(&channels) {
            return None;
        }
        let row_bytes = width as usize * channels * element.size();
        if stride < row_bytes {
            return None;
        }
        if height > 0 && pixels.len() < stride * (height as usize - 1) + row_bytes {
            return None;
        }
        Some(Self {
            width,
            height,
            channels,
            element,
            stride,
            pixels,
        })
    }

    fn sample(&self, x: u32, y: u32, channel: usize) -> u16 {
        let size = self.element.size();
        let offset = y as usize * self.stride + (x as usize * self.channels + channel) * size;
        let bytes = &self.pixels[offset..offset + size];
        match self.element {
            ElementKind::U8 => widen8(bytes[0]),
            ElementKind::U16 => u16::from_ne_bytes([bytes[0], bytes[1]]),
            ElementKind::F32 => {
                widen_f32(f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
        }
    }
}

impl SourceImage for MemImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn memory_layout(&self) -> Option<MemoryLayout<'_>> {
        Some(MemoryLayout {
            channels: self.channels,
            element: self.element,
            pixels: &self.pixels,
            stride: self.stride,
        })
    }

    fn rgba16(&self, x: u32, y: u32) -> [u16; 4] {
        let s = |c| self.sample(x, y, c);
        match self.channels {
            1 => [s(0), s(0), s(0), u16::MAX],
            2 => [s(0), s(0), s(0), s(1)],
            3 => [s(0), s(1), s(2), u16::MAX],
            _ => [s(0), s(1), s(2), s(3)],
        }
    }
}
