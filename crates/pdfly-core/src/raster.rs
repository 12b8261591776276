//! Raster image encoding into PDF image XObjects
//!
//! JPEG data is embedded untouched behind a `DCTDecode` filter; only the frame
//! header is read to learn the geometry. PNG data is decoded to 8-bit samples,
//! split into colour and alpha planes and re-deflated for `FlateDecode`.

use crate::error::PdfError;
use crate::input::ImageFormat;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Object, Stream};
use std::io::{Cursor, Write};

/// An image ready to be inserted into a document
pub(crate) struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub xobject: Stream,
    /// Soft mask carrying the alpha channel, if the source had one
    pub smask: Option<Stream>,
}

pub(crate) fn encode_image(bytes: &[u8], format: ImageFormat) -> Result<EncodedImage, PdfError> {
    match format {
        ImageFormat::Jpeg => encode_jpeg(bytes),
        ImageFormat::Png => encode_png(bytes),
    }
}

struct JpegFrame {
    width: u32,
    height: u32,
    bits_per_component: u8,
    components: u8,
}

fn encode_jpeg(bytes: &[u8]) -> Result<EncodedImage, PdfError> {
    let frame = read_jpeg_frame(bytes)?;

    let color_space: &[u8] = match frame.components {
        1 => b"DeviceGray",
        3 => b"DeviceRGB",
        4 => b"DeviceCMYK",
        n => {
            return Err(PdfError::CorruptDocument(format!(
                "JPEG has unsupported component count {}",
                n
            )))
        }
    };

    let mut dict = image_dict(frame.width, frame.height, color_space, frame.bits_per_component);
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    if frame.components == 4 {
        // Adobe CMYK JPEGs store inverted samples
        dict.set(
            "Decode",
            Object::Array([1, 0, 1, 0, 1, 0, 1, 0].iter().map(|&v| Object::Integer(v)).collect()),
        );
    }

    Ok(EncodedImage {
        width: frame.width,
        height: frame.height,
        xobject: Stream::new(dict, bytes.to_vec()).with_compression(false),
        smask: None,
    })
}

/// Scan JPEG markers up to the first start-of-frame segment
fn read_jpeg_frame(bytes: &[u8]) -> Result<JpegFrame, PdfError> {
    let corrupt = |msg: &str| PdfError::CorruptDocument(format!("invalid JPEG data: {}", msg));

    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return Err(corrupt("missing SOI marker"));
    }

    let mut pos = 2;
    while pos + 1 < bytes.len() {
        if bytes[pos] != 0xFF {
            return Err(corrupt("expected marker"));
        }
        let marker = bytes[pos + 1];
        pos += 2;

        match marker {
            // Fill byte
            0xFF => {
                pos -= 1;
                continue;
            }
            // Standalone markers carry no length
            0x01 | 0xD0..=0xD8 => continue,
            0xD9 => break,
            _ => {}
        }

        if pos + 2 > bytes.len() {
            break;
        }
        let length = u16::from_be_bytes([bytes[pos], bytes[pos + 1]]) as usize;

        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            if pos + 8 > bytes.len() {
                return Err(corrupt("truncated frame header"));
            }
            let height = u16::from_be_bytes([bytes[pos + 3], bytes[pos + 4]]) as u32;
            let width = u16::from_be_bytes([bytes[pos + 5], bytes[pos + 6]]) as u32;
            if width == 0 || height == 0 {
                return Err(corrupt("zero image dimension"));
            }
            return Ok(JpegFrame {
                width,
                height,
                bits_per_component: bytes[pos + 2],
                components: bytes[pos + 7],
            });
        }

        if length < 2 {
            return Err(corrupt("bad segment length"));
        }
        pos += length;
    }

    Err(corrupt("no frame header found"))
}

fn encode_png(bytes: &[u8]) -> Result<EncodedImage, PdfError> {
    let corrupt =
        |e: png::DecodingError| PdfError::CorruptDocument(format!("invalid PNG data: {}", e));

    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    // Palette, low bit depth and tRNS all expand to plain 8-bit samples
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(corrupt)?;
    let mut buffer = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buffer).map_err(corrupt)?;
    let samples = &buffer[..frame.buffer_size()];

    let (color_space, channels, has_alpha): (&[u8], usize, bool) = match frame.color_type {
        png::ColorType::Grayscale => (b"DeviceGray", 1, false),
        png::ColorType::GrayscaleAlpha => (b"DeviceGray", 1, true),
        png::ColorType::Rgb => (b"DeviceRGB", 3, false),
        png::ColorType::Rgba => (b"DeviceRGB", 3, true),
        png::ColorType::Indexed => {
            return Err(PdfError::CorruptDocument(
                "invalid PNG data: palette was not expanded".into(),
            ))
        }
    };

    let (color, alpha) = if has_alpha {
        split_alpha(samples, channels)
    } else {
        (samples.to_vec(), Vec::new())
    };

    let mut dict = image_dict(frame.width, frame.height, color_space, 8);
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    let xobject = Stream::new(dict, deflate(&color)?).with_compression(false);

    let smask = if has_alpha {
        let mut mask = image_dict(frame.width, frame.height, b"DeviceGray", 8);
        mask.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        Some(Stream::new(mask, deflate(&alpha)?).with_compression(false))
    } else {
        None
    };

    Ok(EncodedImage {
        width: frame.width,
        height: frame.height,
        xobject,
        smask,
    })
}

/// Separate interleaved colour+alpha samples into two planes
fn split_alpha(samples: &[u8], color_channels: usize) -> (Vec<u8>, Vec<u8>) {
    let stride = color_channels + 1;
    let pixels = samples.len() / stride;
    let mut color = Vec::with_capacity(pixels * color_channels);
    let mut alpha = Vec::with_capacity(pixels);
    for pixel in samples.chunks_exact(stride) {
        color.extend_from_slice(&pixel[..color_channels]);
        alpha.push(pixel[color_channels]);
    }
    (color, alpha)
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, PdfError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| PdfError::Serialization(format!("deflate failed: {}", e)))
}

fn image_dict(width: u32, height: u32, color_space: &[u8], bits: u8) -> Dictionary {
    Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(width as i64)),
        ("Height", Object::Integer(height as i64)),
        ("ColorSpace", Object::Name(color_space.to_vec())),
        ("BitsPerComponent", Object::Integer(bits as i64)),
    ])
}
