//! Native TIFF stack reading/writing
//!
//! Uses the `tiff` crate. Pages map to slices; calibration travels in the
//! `ImageDescription` tag as `key=value` lines (`unit`, `spacing`,
//! `pixel_width`, `pixel_height`), which is also how ImageJ stores the
//! unit and slice spacing of a stack.

use crate::error::{Error, Result};
use crate::raster::{Calibration, Raster, RasterElement};
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray16, Gray8};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tiff::ColorType;

/// Options for writing TIFF stacks
#[derive(Debug, Clone)]
pub struct StackOptions {
    /// Store the raster calibration in the first page's description
    pub write_calibration: bool,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            write_calibration: true,
        }
    }
}

/// Sample types that can be written as grayscale TIFF pages
pub trait StackSample: RasterElement {
    #[doc(hidden)]
    fn encode_page<W: Write + Seek>(
        encoder: &mut TiffEncoder<W>,
        width: u32,
        height: u32,
        data: &[Self],
        description: Option<&str>,
    ) -> Result<()>;
}

macro_rules! impl_stack_sample {
    ($t:ty, $color:ty) => {
        impl StackSample for $t {
            fn encode_page<W: Write + Seek>(
                encoder: &mut TiffEncoder<W>,
                width: u32,
                height: u32,
                data: &[Self],
                description: Option<&str>,
            ) -> Result<()> {
                let mut image = encoder.new_image::<$color>(width, height)?;
                if let Some(text) = description {
                    image.encoder().write_tag(Tag::ImageDescription, text)?;
                }
                image.write_data(data)?;
                Ok(())
            }
        }
    };
}

impl_stack_sample!(u8, Gray8);
impl_stack_sample!(u16, Gray16);

/// Read an 8-bit single or multi-page TIFF into a 3D raster
pub fn read_stack<P: AsRef<Path>>(path: P) -> Result<Raster<u8>> {
    let file = File::open(path.as_ref())?;
    decode_stack(file)
}

/// Read an 8-bit TIFF stack from an in-memory buffer
pub fn read_stack_from_buffer(data: &[u8]) -> Result<Raster<u8>> {
    decode_stack(Cursor::new(data))
}

fn decode_stack<R: Read + Seek>(reader: R) -> Result<Raster<u8>> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let description = decoder.get_tag_ascii_string(Tag::ImageDescription).ok();

    let mut data = Vec::new();
    let mut depth = 0usize;
    loop {
        let page_dims = decoder.dimensions()?;
        if page_dims != (width, height) {
            return Err(Error::SizeMismatch {
                expected: (width as usize, height as usize, 1),
                actual: (page_dims.0 as usize, page_dims.1 as usize, 1),
            });
        }

        let color = decoder.colortype()?;
        if color != ColorType::Gray(8) {
            return Err(Error::UnsupportedDataType(format!(
                "page {} has color type {:?}, expected 8-bit grayscale",
                depth + 1,
                color
            )));
        }

        match decoder.read_image()? {
            DecodingResult::U8(buf) => data.extend_from_slice(&buf),
            _ => {
                return Err(Error::UnsupportedDataType(format!(
                    "page {} is not 8-bit",
                    depth + 1
                )))
            }
        }
        depth += 1;

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    let raster = Raster::from_vec(data, width as usize, height as usize, depth)?;
    Ok(match description.as_deref().and_then(parse_calibration) {
        Some(cal) => raster.with_calibration(cal),
        None => raster,
    })
}

/// Write a raster as a multi-page grayscale TIFF, one page per slice
pub fn write_stack<T, P>(raster: &Raster<T>, path: P, options: Option<StackOptions>) -> Result<()>
where
    T: StackSample,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    encode_stack(raster, file, &options.unwrap_or_default())
}

/// Write a raster as a multi-page grayscale TIFF into a buffer
pub fn write_stack_to_buffer<T: StackSample>(
    raster: &Raster<T>,
    options: Option<StackOptions>,
) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_stack(raster, Cursor::new(&mut buf), &options.unwrap_or_default())?;
    Ok(buf)
}

fn encode_stack<T, W>(raster: &Raster<T>, writer: W, options: &StackOptions) -> Result<()>
where
    T: StackSample,
    W: Write + Seek,
{
    if raster.is_empty() {
        let (width, height, depth) = raster.shape();
        return Err(Error::InvalidDimensions {
            width,
            height,
            depth,
        });
    }

    let mut encoder = TiffEncoder::new(writer)?;
    let width = raster.width() as u32;
    let height = raster.height() as u32;
    let description = options
        .write_calibration
        .then(|| format_calibration(raster.calibration(), raster.depth()));

    for z in 0..raster.depth() {
        let page: Vec<T> = raster.slice(z)?.iter().copied().collect();
        let text = if z == 0 { description.as_deref() } else { None };
        T::encode_page(&mut encoder, width, height, &page, text)?;
    }

    Ok(())
}

fn format_calibration(cal: &Calibration, depth: usize) -> String {
    format!(
        "images={}\nslices={}\nunit={}\nspacing={}\npixel_width={}\npixel_height={}\n",
        depth, depth, cal.unit, cal.voxel_depth, cal.pixel_width, cal.pixel_height
    )
}

fn parse_calibration(text: &str) -> Option<Calibration> {
    let mut cal = Calibration::default();
    let mut found = false;
    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "unit" => {
                cal.unit = value.to_string();
                found = true;
            }
            "spacing" => {
                cal.voxel_depth = value.parse().ok()?;
                found = true;
            }
            "pixel_width" => {
                cal.pixel_width = value.parse().ok()?;
                found = true;
            }
            "pixel_height" => {
                cal.pixel_height = value.parse().ok()?;
                found = true;
            }
            _ => {}
        }
    }
    found.then_some(cal)
}
