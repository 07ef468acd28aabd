use thiserror::Error;

/// Errors raised by a slide source while opening or reading an image.
///
/// The Deep Zoom engine never reinterprets these; they are passed through
/// to the caller unchanged inside [`DeepZoomError::Slide`].
#[derive(Debug, Clone, Error)]
pub enum SlideError {
    /// The file could not be opened or read
    #[error("I/O error: {0}")]
    Io(String),

    /// The file was read but its pixel data could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// A read was requested with arguments the source cannot satisfy
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The named associated image does not exist
    #[error("Associated image not found: {0}")]
    AssociatedImageNotFound(String),

    /// The handle was closed explicitly
    #[error("Slide handle is closed")]
    Closed,

    /// A previous operation failed and the handle refuses further work
    #[error("Slide handle is in an error state: {0}")]
    Latched(String),
}

impl From<image::ImageError> for SlideError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => SlideError::Io(e.to_string()),
            other => SlideError::Decode(other.to_string()),
        }
    }
}

impl From<std::io::Error> for SlideError {
    fn from(err: std::io::Error) -> Self {
        SlideError::Io(err.to_string())
    }
}

/// Errors returned by the Deep Zoom engine.
#[derive(Debug, Clone, Error)]
pub enum DeepZoomError {
    /// Deep Zoom level outside `[0, level_count)`
    #[error("Invalid level: {level} (image has {level_count} Deep Zoom levels)")]
    InvalidLevel { level: i64, level_count: usize },

    /// Tile column or row outside the level's tile grid
    #[error("Invalid address: ({col}, {row}) at level {level}, level has {cols}x{rows} tiles")]
    InvalidAddress {
        level: usize,
        col: i64,
        row: i64,
        cols: u32,
        rows: u32,
    },

    /// Failure reported by the slide source
    #[error(transparent)]
    Slide(#[from] SlideError),

    /// The color transform collaborator rejected a tile
    #[error("Color transform failed: {0}")]
    ColorTransform(String),
}

impl DeepZoomError {
    /// True when the error was caused by the caller's level or address
    /// rather than by the slide source.
    ///
    /// Servers map these to 404 and everything else to 5xx.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            DeepZoomError::InvalidLevel { .. } | DeepZoomError::InvalidAddress { .. }
        )
    }
}

/// Errors from reading a `.dzi` descriptor.
#[derive(Debug, Clone, Error)]
pub enum DziError {
    /// The document is not well-formed XML
    #[error("XML error: {0}")]
    Xml(String),

    /// A required element is absent
    #[error("Missing element: {0}")]
    MissingElement(&'static str),

    /// A required attribute is absent
    #[error("Missing attribute {attribute} on {element}")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    /// An attribute is present but not a valid value
    #[error("Invalid value for {attribute}: {value}")]
    InvalidAttribute {
        attribute: &'static str,
        value: String,
    },

    /// The root element is not in the Deep Zoom namespace
    #[error("Unexpected namespace: {0}")]
    Namespace(String),
}

impl From<quick_xml::Error> for DziError {
    fn from(err: quick_xml::Error) -> Self {
        DziError::Xml(err.to_string())
    }
}
