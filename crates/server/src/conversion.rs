//! Decides which uploads need a web-viewable rendition.

/// Mime type recorded when the extension is not recognized.
pub const UNKNOWN_MIME_TYPE: &str = "unknown";

/// Kind of rendition a conversion job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    /// Office document rendered to PDF.
    Pdf,
    /// Raster image the browser cannot show, rendered to JPEG.
    Jpeg,
}

impl ConversionKind {
    /// Exact-match lookup on the mime type. No content inspection.
    pub fn for_mime(mime_type: &str) -> Option<Self> {
        match mime_type {
            "application/msword"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            | "application/vnd.ms-powerpoint"
            | "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
                Some(Self::Pdf)
            }
            "image/bmp" | "image/x-ms-bmp" | "image/tiff" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

/// Guesses the mime type from the file extension, without parameters.
pub fn mime_type_for(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| UNKNOWN_MIME_TYPE.to_string())
}
