//! Deep Zoom Image (DZI) descriptors and tile paths.
//!
//! A `.dzi` file tells a viewer the full image size, tile size, overlap and
//! tile format:
//!
//! ```xml
//! <?xml version='1.0' encoding='UTF-8'?>
//! <Image TileSize="254" Overlap="1" Format="jpeg" xmlns="http://schemas.microsoft.com/deepzoom/2008"><Size Width="300" Height="250" /></Image>
//! ```
//!
//! Viewers then request tiles from `{name}_files/{level}/{col}_{row}.{format}`.

use std::fmt;
use std::str::FromStr;

use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;

use crate::error::DziError;

/// XML namespace of Deep Zoom descriptors.
pub const DEEPZOOM_NAMESPACE: &str = "http://schemas.microsoft.com/deepzoom/2008";

const XML_DECLARATION: &str = "<?xml version='1.0' encoding='UTF-8'?>";

// =============================================================================
// Descriptor
// =============================================================================

/// Contents of a `.dzi` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DziDescriptor {
    pub tile_size: u32,
    pub overlap: u32,
    pub format: String,
    pub width: u32,
    pub height: u32,
}

impl DziDescriptor {
    /// Serialize as a single-line document after the XML declaration.
    ///
    /// Attribute order and spacing are fixed so that the output is
    /// byte-for-byte stable.
    pub fn to_xml(&self) -> String {
        format!(
            "{XML_DECLARATION}\n<Image TileSize=\"{}\" Overlap=\"{}\" Format=\"{}\" xmlns=\"{DEEPZOOM_NAMESPACE}\"><Size Width=\"{}\" Height=\"{}\" /></Image>",
            self.tile_size,
            self.overlap,
            escape(self.format.as_str()),
            self.width,
            self.height,
        )
    }

    /// Read a descriptor back from XML.
    pub fn parse(xml: &str) -> Result<Self, DziError> {
        let mut reader = Reader::from_reader(xml.as_bytes());
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();

        let mut image: Option<(u32, u32, String)> = None;
        let mut size: Option<(u32, u32)> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"Image" => {
                        let mut attrs = read_attributes(&reader, &e)?;
                        match take(&mut attrs, "xmlns") {
                            Some(ns) if ns != DEEPZOOM_NAMESPACE => {
                                return Err(DziError::Namespace(ns));
                            }
                            _ => {}
                        }
                        let tile_size = required_u32(&mut attrs, "Image", "TileSize")?;
                        let overlap = required_u32(&mut attrs, "Image", "Overlap")?;
                        let format = take(&mut attrs, "Format").ok_or(
                            DziError::MissingAttribute {
                                element: "Image",
                                attribute: "Format",
                            },
                        )?;
                        image = Some((tile_size, overlap, format));
                    }
                    b"Size" => {
                        let mut attrs = read_attributes(&reader, &e)?;
                        let width = required_u32(&mut attrs, "Size", "Width")?;
                        let height = required_u32(&mut attrs, "Size", "Height")?;
                        size = Some((width, height));
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let (tile_size, overlap, format) = image.ok_or(DziError::MissingElement("Image"))?;
        let (width, height) = size.ok_or(DziError::MissingElement("Size"))?;
        Ok(Self {
            tile_size,
            overlap,
            format,
            width,
            height,
        })
    }
}

/// Decoded, unescaped `(key, value)` attribute pairs of an element.
fn read_attributes<R>(
    reader: &Reader<R>,
    element: &BytesStart<'_>,
) -> Result<Vec<(String, String)>, DziError> {
    let decoder = reader.decoder();
    let mut out = Vec::new();
    for attr in element.attributes().flatten() {
        let key = decoder
            .decode(attr.key.as_ref())
            .map_err(|e| DziError::Xml(e.to_string()))?
            .into_owned();
        let raw = decoder
            .decode(&attr.value)
            .map_err(|e| DziError::Xml(e.to_string()))?;
        let value = unescape(&raw)
            .map_err(|e| DziError::Xml(e.to_string()))?
            .into_owned();
        out.push((key, value));
    }
    Ok(out)
}

fn take(attrs: &mut Vec<(String, String)>, key: &str) -> Option<String> {
    let index = attrs.iter().position(|(k, _)| k == key)?;
    Some(attrs.swap_remove(index).1)
}

fn required_u32(
    attrs: &mut Vec<(String, String)>,
    element: &'static str,
    attribute: &'static str,
) -> Result<u32, DziError> {
    let value = take(attrs, attribute).ok_or(DziError::MissingAttribute { element, attribute })?;
    value
        .trim()
        .parse()
        .map_err(|_| DziError::InvalidAttribute { attribute, value })
}

// =============================================================================
// Tile Paths
// =============================================================================

/// Tile image formats accepted in tile paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TileFormat {
    #[default]
    Jpeg,
    Png,
}

impl TileFormat {
    /// Extension written in `.dzi` files and tile URLs.
    pub fn extension(self) -> &'static str {
        match self {
            TileFormat::Jpeg => "jpeg",
            TileFormat::Png => "png",
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(TileFormat::Jpeg),
            "png" => Ok(TileFormat::Png),
            other => Err(format!("unsupported tile format '{other}' (use jpeg or png)")),
        }
    }
}

/// A parsed `{level}/{col}_{row}.{format}` tile path.
///
/// Numbers are kept signed so that negative values reach
/// `DeepZoomGenerator::checked_address` and are rejected there with the
/// usual address errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePath {
    pub level: i64,
    pub col: i64,
    pub row: i64,
    pub format: TileFormat,
}

/// Parse a tile path like `"9/1_0.jpeg"`.
///
/// Returns `None` for anything that is not a well-formed path with a
/// supported format.
pub fn parse_tile_path(path: &str) -> Option<TilePath> {
    let path = path.trim_start_matches('/');
    let (level, file) = path.split_once('/')?;
    let (stem, extension) = file.rsplit_once('.')?;
    let (col, row) = stem.split_once('_')?;

    Some(TilePath {
        level: level.parse().ok()?,
        col: col.parse().ok()?,
        row: row.parse().ok()?,
        format: extension.parse().ok()?,
    })
}
