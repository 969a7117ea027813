use std::io::Cursor;
use std::path::Path;

use image::ImageFormat;

use crate::error::AppError;

pub const THUMBNAIL_SIZE: u32 = 64;

/// Square PNG preview of an image artifact for the export list.
pub fn render_thumbnail(path: &Path) -> Result<Vec<u8>, AppError> {
    let thumb = image::open(path)?.thumbnail_exact(THUMBNAIL_SIZE, THUMBNAIL_SIZE);
    let mut bytes = Vec::new();
    thumb.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_is_64_square_png() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("chair.png");
        image::RgbaImage::from_pixel(200, 120, image::Rgba([200, 40, 40, 255]))
            .save(&source)
            .unwrap();

        let png = render_thumbnail(&source).unwrap();

        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
    }

    #[test]
    fn test_missing_image_is_an_error() {
        assert!(render_thumbnail(Path::new("/definitely/not/here.png")).is_err());
    }
}
