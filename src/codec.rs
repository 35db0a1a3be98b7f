use crate::config::CompressionLevel;
use crate::constants::{LIBDEFLATER_LEVEL_OFFSET, MAX_LEVEL, MAX_OXIPNG_PRESET, ZOPFLI_ITERATIONS};
use crate::error::{CompressionError, Result};
use image::{DynamicImage, ImageFormat};
use oxipng::{Deflaters, Options};
use std::fs;
use std::io::Cursor;
use std::num::NonZeroU8;
use std::path::Path;

/// Raw file bytes plus the container format sniffed from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub format: ImageFormat,
    pub data: Vec<u8>,
}

impl SourceImage {
    pub fn is_png(&self) -> bool {
        self.format == ImageFormat::Png
    }
}

/// Image decode/encode capability used by the compressor.
///
/// Implementations must be shareable across worker threads.
pub trait Codec: Send + Sync {
    /// Reads a file and identifies its container format from its contents.
    fn read(&self, path: &Path) -> Result<SourceImage>;

    /// Converts a non-PNG source to an RGBA PNG. Lossless.
    fn normalize(&self, source: SourceImage) -> Result<SourceImage>;

    /// Produces optimized PNG bytes from PNG input at the given effort level.
    fn encode(&self, png: &[u8], level: CompressionLevel) -> Result<Vec<u8>>;
}

/// Default codec: `image` for decoding, `oxipng` for lossless optimization.
#[derive(Debug, Default, Clone, Copy)]
pub struct OxipngCodec;

impl OxipngCodec {
    pub fn new() -> Self {
        Self
    }

    fn options_for(level: CompressionLevel) -> Options {
        let level = level.get();
        let mut options = Options::from_preset(level.min(MAX_OXIPNG_PRESET));

        options.deflate = if level >= MAX_LEVEL {
            Deflaters::Zopfli {
                iterations: NonZeroU8::new(ZOPFLI_ITERATIONS).unwrap_or(NonZeroU8::MIN),
            }
        } else {
            Deflaters::Libdeflater {
                compression: level + LIBDEFLATER_LEVEL_OFFSET,
            }
        };
        options
    }
}

impl Codec for OxipngCodec {
    fn read(&self, path: &Path) -> Result<SourceImage> {
        let data = fs::read(path)?;
        let format = image::guess_format(&data)?;
        Ok(SourceImage { format, data })
    }

    fn normalize(&self, source: SourceImage) -> Result<SourceImage> {
        if source.is_png() {
            return Ok(source);
        }

        let decoded = image::load_from_memory_with_format(&source.data, source.format)?;
        let rgba = DynamicImage::ImageRgba8(decoded.to_rgba8());

        let mut data = Vec::new();
        rgba.write_to(&mut Cursor::new(&mut data), ImageFormat::Png)?;

        Ok(SourceImage {
            format: ImageFormat::Png,
            data,
        })
    }

    fn encode(&self, png: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
        // Without `force`, oxipng hands back the input when it cannot shrink it.
        oxipng::optimize_from_memory(png, &Self::options_for(level))
            .map_err(|e| CompressionError::Optimize(e.to_string()))
    }
}
