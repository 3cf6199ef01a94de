use framestep_render::RenderError;
use std::path::Path;

/// Decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decode any format the `image` crate recognises into RGBA8.
pub fn decode_rgba(path: &Path) -> Result<DecodedImage, RenderError> {
    let image = image::open(path).map_err(|err| match err {
        image::ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
            RenderError::AssetNotFound(path.to_path_buf())
        }
        image::ImageError::IoError(io) => RenderError::Io(io),
        other => RenderError::Decode {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    })?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    tracing::debug!(path = %path.display(), width, height, "decoded texture");
    Ok(DecodedImage {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}
