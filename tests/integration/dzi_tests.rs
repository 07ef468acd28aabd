//! DZI serving integration tests.
//!
//! Tests verify:
//! - The `.dzi` document is byte-for-byte stable and parses back
//! - Tile paths resolve to tiles the way a tile server resolves them
//! - Malformed, negative and out-of-range paths are rejected as invalid
//!   arguments

use wsi_deepzoom::{
    parse_tile_path, DeepZoomError, DeepZoomGenerator, DziDescriptor, ImageSlide, TileFormat,
};

use super::test_utils::boxes;

const BOXES_DZI: &str = concat!(
    "<?xml version='1.0' encoding='UTF-8'?>\n",
    "<Image TileSize=\"254\" Overlap=\"1\" Format=\"jpeg\" ",
    "xmlns=\"http://schemas.microsoft.com/deepzoom/2008\">",
    "<Size Width=\"300\" Height=\"250\" /></Image>"
);

fn boxes_dz() -> DeepZoomGenerator<ImageSlide> {
    DeepZoomGenerator::new(ImageSlide::new(boxes()), 254, 1, false).unwrap()
}

/// Resolve a tile path the way a tile server does.
fn serve(dz: &DeepZoomGenerator<ImageSlide>, path: &str) -> Result<(u32, u32), DeepZoomError> {
    let tile = parse_tile_path(path).expect("well-formed path");
    let (level, address) = dz.checked_address(tile.level, tile.col, tile.row)?;
    Ok(dz.get_tile(level, address)?.dimensions())
}

#[test]
fn test_dzi_document() {
    let dz = boxes_dz();
    assert_eq!(dz.get_dzi("jpeg"), BOXES_DZI);

    let parsed = DziDescriptor::parse(&dz.get_dzi("png")).unwrap();
    assert_eq!(parsed, dz.dzi_descriptor("png"));
    assert_eq!(parsed.format, TileFormat::Png.to_string());
}

#[test]
fn test_dzi_custom_geometry() {
    let dz = DeepZoomGenerator::new(ImageSlide::new(boxes()), 510, 0, false).unwrap();
    let parsed = DziDescriptor::parse(&dz.get_dzi("jpeg")).unwrap();
    assert_eq!(parsed.tile_size, 510);
    assert_eq!(parsed.overlap, 0);
    assert_eq!((parsed.width, parsed.height), (300, 250));
}

#[test]
fn test_serve_valid_paths() {
    let dz = boxes_dz();
    assert_eq!(serve(&dz, "9/1_0.jpeg").unwrap(), (47, 250));
    assert_eq!(serve(&dz, "9/0_0.png").unwrap(), (255, 250));
    assert_eq!(serve(&dz, "0/0_0.jpeg").unwrap(), (1, 1));
}

#[test]
fn test_serve_every_tile() {
    let dz = boxes_dz();
    let mut served = 0;
    for (level, (col, row)) in dz.tile_addresses() {
        let path = format!("{level}/{col}_{row}.jpeg");
        assert_eq!(
            serve(&dz, &path).unwrap(),
            dz.get_tile_dimensions(level, (col, row)).unwrap()
        );
        served += 1;
    }
    assert_eq!(served, dz.tile_count());
}

#[test]
fn test_serve_invalid_paths() {
    let dz = boxes_dz();
    for path in ["10/0_0.jpeg", "-1/0_0.jpeg", "0/1_0.jpeg", "0/-1_0.jpeg", "9/0_1.jpeg"] {
        let err = serve(&dz, path).unwrap_err();
        assert!(err.is_invalid_argument(), "{path}: {err}");
    }

    assert!(matches!(
        serve(&dz, "0/-1_0.jpeg").unwrap_err(),
        DeepZoomError::InvalidAddress { col: -1, .. }
    ));
    assert!(matches!(
        serve(&dz, "10/0_0.jpeg").unwrap_err(),
        DeepZoomError::InvalidLevel { level: 10, .. }
    ));
}

#[test]
fn test_malformed_paths() {
    for path in ["9/1_0", "9/1_0.gif", "nine/1_0.jpeg", "9/1.0.jpeg", ""] {
        assert!(parse_tile_path(path).is_none(), "{path}");
    }
}
