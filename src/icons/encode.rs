use std::io::{self, Write};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ico::{IconDir, IconDirEntry, IconImage, ResourceType};
use icns::{IconFamily, PixelFormat};
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use log::debug;

/// Square sizes an ICNS family can hold a single RGBA image at, largest first.
const ICNS_SIZES: [u32; 7] = [1024, 512, 256, 128, 48, 32, 16];

/// Square Lanczos resize of the source.
#[must_use]
pub fn resized(source: &RgbaImage, size: u32) -> RgbaImage {
    imageops::resize(source, size, size, FilterType::Lanczos3)
}

/// Largest ICNS slot the source can fill without upscaling.
#[must_use]
pub fn icns_size_for(width: u32, height: u32) -> u32 {
    let edge = width.min(height);
    ICNS_SIZES
        .into_iter()
        .find(|&size| size <= edge)
        .unwrap_or(ICNS_SIZES[ICNS_SIZES.len() - 1])
}

pub fn write_png<W: Write>(image: &RgbaImage, writer: W) -> io::Result<()> {
    PngEncoder::new(writer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(io::Error::other)
}

/// One ICO container holding a resized copy of `source` per entry in `sizes`.
pub fn write_ico<W: Write>(source: &RgbaImage, sizes: &[u32], writer: W) -> io::Result<()> {
    let mut icon_dir = IconDir::new(ResourceType::Icon);
    for &size in sizes {
        let layer = resized(source, size);
        let image = IconImage::from_rgba_data(size, size, layer.into_raw());
        icon_dir.add_entry(IconDirEntry::encode(&image)?);
    }
    icon_dir.write(writer)
}

/// Single-image ICNS family at the size picked by [`icns_size_for`].
pub fn write_icns<W: Write>(source: &RgbaImage, writer: W) -> io::Result<()> {
    let size = icns_size_for(source.width(), source.height());
    debug!("icons: encoding ICNS at {size}x{size}");

    let layer = resized(source, size);
    let image = icns::Image::from_data(PixelFormat::RGBA, size, size, layer.into_raw())?;
    let mut family = IconFamily::new();
    family.add_icon(&image)?;
    family.write(writer)
}

/// SVG document of `size`×`size` wrapping a PNG of the source as a base64 data URI.
pub fn svg_document(source: &RgbaImage, size: u32) -> io::Result<String> {
    let mut png = Vec::new();
    write_png(&resized(source, size), &mut png)?;
    let encoded = STANDARD.encode(&png);

    let svg = format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" "#,
            r#"width="{size}" height="{size}" viewBox="0 0 {size} {size}">"#,
            "\n",
            r#"    <image width="{size}" height="{size}" xlink:href="data:image/png;base64,{encoded}"/>"#,
            "\n",
            "</svg>"
        ),
        size = size,
        encoded = encoded,
    );
    Ok(svg)
}
