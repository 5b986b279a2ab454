use std::fmt::{self, Display};
use std::io;
use std::path::{Path, PathBuf};

use image::{ImageError, ImageReader, RgbaImage};
use log::{debug, error, info};

use crate::util;

pub mod encode;

/// Sizes baked into the Windows icon, largest first.
pub const ICO_SIZES: [u32; 6] = [256, 128, 64, 48, 32, 16];
/// WiX installer banner logo.
pub const WIX_PNG_SIZE: u32 = 64;
/// Steam Link launcher tile.
pub const STEAM_PNG_SIZE: u32 = 116;
/// Raster embedded in the scalable app icon.
pub const SVG_SIZE: u32 = 512;

#[derive(Debug)]
pub enum IconError {
    SourceNotFound(PathBuf),
    Decode { path: PathBuf, source: ImageError },
    UnsupportedFormat(PathBuf),
    Write { path: PathBuf, source: io::Error },
}

impl Display for IconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IconError::SourceNotFound(path) => {
                write!(f, "Source image {} not found.", path.display())
            }
            IconError::Decode { path, source } => {
                write!(f, "Error opening source image {}: {source}", path.display())
            }
            IconError::UnsupportedFormat(path) => {
                write!(f, "no encoder for {}", path.display())
            }
            IconError::Write { source, .. } => write!(f, "{source}"),
        }
    }
}

impl std::error::Error for IconError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IconError::Decode { source, .. } => Some(source),
            IconError::Write { source, .. } => Some(source),
            IconError::SourceNotFound(_) | IconError::UnsupportedFormat(_) => None,
        }
    }
}

/// Container a derived asset is encoded into, chosen from the destination extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetFormat {
    Ico,
    Icns,
    Png,
    Svg,
}

impl AssetFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ico" => Some(AssetFormat::Ico),
            "icns" => Some(AssetFormat::Icns),
            "png" => Some(AssetFormat::Png),
            "svg" => Some(AssetFormat::Svg),
            _ => None,
        }
    }
}

/// One derived file: where it goes and the square pixel sizes it carries.
///
/// ICO uses every size, PNG and SVG use the first, ICNS picks its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub path: PathBuf,
    pub sizes: Vec<u32>,
}

impl Asset {
    pub fn new(path: impl Into<PathBuf>, sizes: &[u32]) -> Self {
        Self {
            path: path.into(),
            sizes: sizes.to_vec(),
        }
    }

    pub fn format(&self) -> Option<AssetFormat> {
        AssetFormat::from_path(&self.path)
    }

    fn primary_size(&self) -> Option<u32> {
        self.sizes.first().copied()
    }
}

/// Result of exporting one asset.
#[derive(Debug)]
pub struct AssetReport {
    pub path: PathBuf,
    pub result: Result<(), IconError>,
}

impl AssetReport {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// The five files regenerated for a DancherLink release, relative to `project_root`.
pub fn standard_assets(project_root: &Path) -> Vec<Asset> {
    let app = project_root.join("app");
    vec![
        Asset::new(app.join("dancherlink.ico"), &ICO_SIZES),
        Asset::new(app.join("dancherlink.icns"), &[]),
        Asset::new(app.join("dancherlink_wix.png"), &[WIX_PNG_SIZE]),
        Asset::new(
            app.join("deploy").join("steamlink").join("dancherlink.png"),
            &[STEAM_PNG_SIZE],
        ),
        Asset::new(app.join("res").join("dancherlink.svg"), &[SVG_SIZE]),
    ]
}

/// Decode the source image and normalize it to RGBA.
///
/// # Errors
/// [`IconError::SourceNotFound`] if `path` does not exist, [`IconError::Decode`] if it
/// cannot be read as an image.
pub fn load_source(path: &Path) -> Result<RgbaImage, IconError> {
    if !path.exists() {
        return Err(IconError::SourceNotFound(path.to_path_buf()));
    }

    let decoded = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(ImageError::from)
        .and_then(|reader| reader.decode())
        .map_err(|source| IconError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("icons: decoded {:?} from {}", decoded.color(), path.display());

    let rgba = decoded.into_rgba8();
    info!(
        "Loaded source image: {} size=({}, {})",
        path.display(),
        rgba.width(),
        rgba.height()
    );
    Ok(rgba)
}

/// Encode `source` into `asset`, replacing any previous file.
///
/// The destination directory must already exist.
///
/// # Errors
/// [`IconError::UnsupportedFormat`] for unknown extensions or missing sizes,
/// [`IconError::Write`] when encoding or writing fails.
pub fn export(source: &RgbaImage, asset: &Asset) -> Result<(), IconError> {
    let unsupported = || IconError::UnsupportedFormat(asset.path.clone());
    let format = asset.format().ok_or_else(unsupported)?;

    let written = match format {
        AssetFormat::Ico => {
            if asset.sizes.is_empty() {
                return Err(unsupported());
            }
            util::write_atomic_with(&asset.path, |file| {
                encode::write_ico(source, &asset.sizes, file)
            })
        }
        AssetFormat::Icns => {
            util::write_atomic_with(&asset.path, |file| encode::write_icns(source, file))
        }
        AssetFormat::Png => {
            let size = asset.primary_size().ok_or_else(unsupported)?;
            let image = encode::resized(source, size);
            util::write_atomic_with(&asset.path, |file| encode::write_png(&image, file))
        }
        AssetFormat::Svg => {
            let size = asset.primary_size().ok_or_else(unsupported)?;
            encode::svg_document(source, size)
                .and_then(|svg| util::write_atomic(&asset.path, svg.as_bytes()))
        }
    };

    written.map_err(|source| IconError::Write {
        path: asset.path.clone(),
        source,
    })
}

/// Export every asset in order. A failing asset is logged and skipped.
pub fn regenerate(source: &RgbaImage, assets: &[Asset]) -> Vec<AssetReport> {
    assets
        .iter()
        .map(|asset| {
            let result = export(source, asset);
            match &result {
                Ok(()) => info!("{}", describe_success(asset)),
                Err(err) => error!("Failed to update {}: {err}", asset.path.display()),
            }
            AssetReport {
                path: asset.path.clone(),
                result,
            }
        })
        .collect()
}

fn describe_success(asset: &Asset) -> String {
    let path = asset.path.display();
    match (asset.format(), asset.primary_size()) {
        (Some(AssetFormat::Png), Some(size)) => {
            format!("Updated {path} with size ({size}, {size})")
        }
        (Some(AssetFormat::Svg), _) => format!("Updated {path} (embedded PNG)"),
        _ => format!("Updated {path}"),
    }
}
