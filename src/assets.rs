use crate::arena::ArenaConfig;
use crate::error::{ConfigError, FloorError};
use crate::floor::FloorMap;
use log::info;
use rust_embed::RustEmbed;
use std::borrow::Cow;
use std::fs;
use std::path::Path;

pub const FLOOR_ASSET: &str = "floor.bmp";
pub const POSITIONS_ASSET: &str = "robot_positions.txt";

#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Asset;

pub fn get_asset_bytes(name: &str) -> Option<Cow<'static, [u8]>> {
    Asset::get(name).map(|f| f.data)
}

/// Decode a floor image into a bottom-up RGB floor map.
pub fn decode_floor(bytes: &[u8]) -> Result<FloorMap, FloorError> {
    // Decoded images are top-down; the floor map wants row 0 at the bottom
    let rgb = image::load_from_memory(bytes)?.flipv().into_rgb8();
    let (width, height) = rgb.dimensions();
    FloorMap::from_rgb(width as usize, height as usize, rgb.into_raw())
}

/// Load the floor from `path`, or the embedded default arena.
pub fn load_floor(path: Option<&Path>) -> Result<FloorMap, FloorError> {
    let floor = match path {
        Some(path) => {
            info!("Loading floor image from {}", path.display());
            let bytes = fs::read(path).map_err(|source| FloorError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            decode_floor(&bytes)?
        }
        None => {
            info!("Using built-in floor image");
            let bytes = get_asset_bytes(FLOOR_ASSET)
                .ok_or_else(|| FloorError::MissingAsset(FLOOR_ASSET.to_string()))?;
            decode_floor(&bytes)?
        }
    };
    info!("Floor is {}x{} pixels", floor.width(), floor.height());
    Ok(floor)
}

/// Load the arena configuration from `path`, or the embedded default.
pub fn load_arena_config(path: Option<&Path>) -> Result<ArenaConfig, ConfigError> {
    match path {
        Some(path) => {
            info!("Loading robot positions from {}", path.display());
            let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            ArenaConfig::parse(&text)
        }
        None => {
            info!("Using built-in robot positions");
            let bytes = get_asset_bytes(POSITIONS_ASSET)
                .ok_or_else(|| ConfigError::MissingAsset(POSITIONS_ASSET.to_string()))?;
            ArenaConfig::parse(&String::from_utf8_lossy(&bytes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    #[test]
    fn test_decode_flips_rows() {
        // Top row red, bottom row blue
        let mut img = RgbImage::new(2, 2);
        for x in 0..2 {
            img.put_pixel(x, 0, Rgb([255, 0, 0]));
            img.put_pixel(x, 1, Rgb([0, 0, 255]));
        }
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();

        let floor = decode_floor(&bytes).unwrap();
        assert_eq!(floor.rgb(0, 0), [0, 0, 255]);
        assert_eq!(floor.rgb(1, 1), [255, 0, 0]);
        // World +y is the top of the image
        assert_eq!(floor.intensity_at(0.0, 0.6), 85);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_floor(b"not an image"), Err(FloorError::Decode(_))));
    }

    #[test]
    fn test_builtin_assets_load() {
        let floor = load_floor(None).unwrap();
        assert_eq!((floor.width(), floor.height()), (512, 512));
        let config = load_arena_config(None).unwrap();
        assert!(config.start[0].x < config.start[1].x);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let missing = Path::new("/definitely/not/here.txt");
        assert!(matches!(load_arena_config(Some(missing)), Err(ConfigError::Io { .. })));
        assert!(matches!(load_floor(Some(missing)), Err(FloorError::Io { .. })));
    }
}
