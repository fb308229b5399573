use crate::error::{IdenticonError, Result};
use crate::identicon::Identicon;
use crate::models::{CANVAS_SIZE, Rectangle};
use image::codecs::png::PngEncoder;
use image::{Rgba, RgbaImage};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Fills `rect` with `color`, clipped to the image bounds.
fn fill_rect(image: &mut RgbaImage, rect: &Rectangle, color: Rgba<u8>) {
    let x_end = rect.bottom_right.x.min(image.width());
    let y_end = rect.bottom_right.y.min(image.height());
    for y in rect.top_left.y..y_end {
        for x in rect.top_left.x..x_end {
            image.put_pixel(x, y, color);
        }
    }
}

impl Identicon {
    /// Paints the visible cells onto a transparent 250x250 canvas.
    pub fn rasterize(&self) -> RgbaImage {
        let mut image = RgbaImage::new(CANVAS_SIZE, CANVAS_SIZE);
        let color = Rgba(self.color().to_rgba());
        for rect in self.pixel_rectangles() {
            fill_rect(&mut image, rect, color);
        }
        image
    }

    /// Encodes the identicon as PNG into `sink`.
    ///
    /// A sink that rejects writes yields [`IdenticonError::Encode`]; whatever
    /// reached the sink before the failure is not a valid image.
    pub fn write_image<W: Write>(&self, sink: W) -> Result<()> {
        self.rasterize().write_with_encoder(PngEncoder::new(sink))?;
        Ok(())
    }

    /// Encodes the identicon as an in-memory PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_image(&mut buffer)?;
        Ok(buffer)
    }

    /// Output file name, `<name>.png`.
    pub fn file_name(&self) -> String {
        format!("{}.png", self.name())
    }

    /// Writes `<name>.png` into `dir` and returns its path.
    ///
    /// If writing fails after the file was created, the file is removed again.
    ///
    /// The name is joined onto `dir` unchanged. A name containing path
    /// separators or `..` resolves outside `dir`; callers exposing this to
    /// untrusted input must validate the name first.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.file_name());
        let file = File::create(&path).map_err(|source| IdenticonError::CreateOutput {
            path: path.clone(),
            source,
        })?;

        let mut writer = BufWriter::new(file);
        let written = self
            .write_image(&mut writer)
            .and_then(|()| writer.flush().map_err(IdenticonError::from));
        if let Err(e) = written {
            // Clean up the partially written file
            drop(writer);
            if let Err(remove_err) = fs::remove_file(&path) {
                warn!(
                    path = %path.display(),
                    error = %remove_err,
                    "failed removing partial output"
                );
            }
            return Err(e);
        }

        info!(path = %path.display(), "identicon written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CELL_SIZE;
    use std::io;

    /// Accepts `budget` bytes, then fails every write.
    struct FailingSink {
        budget: usize,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn rasterize_fills_visible_cells_only() {
        let identicon = Identicon::new("banner");
        let image = identicon.rasterize();
        assert_eq!(image.dimensions(), (CANVAS_SIZE, CANVAS_SIZE));

        let fill = Rgba([18, 223, 83, 255]);
        // cell 0 is visible, cell 1 (value 223) is not
        assert_eq!(*image.get_pixel(0, 0), fill);
        assert_eq!(*image.get_pixel(CELL_SIZE - 1, CELL_SIZE - 1), fill);
        assert_eq!(*image.get_pixel(CELL_SIZE, 0), Rgba([0, 0, 0, 0]));
        // cell 24 (value 221) is not visible, cell 23 is
        assert_eq!(*image.get_pixel(CANVAS_SIZE - 1, CANVAS_SIZE - 1), Rgba([0, 0, 0, 0]));
        assert_eq!(*image.get_pixel(199, 249), fill);
    }

    #[test]
    fn filled_pixel_count_matches_rectangles() {
        let identicon = Identicon::new("banner");
        let image = identicon.rasterize();
        let filled = image.pixels().filter(|p| p.0[3] == 255).count() as u32;
        let expected = identicon.pixel_rectangles().len() as u32 * CELL_SIZE * CELL_SIZE;
        assert_eq!(filled, expected);
    }

    #[test]
    fn fill_rect_clips_to_canvas() {
        let mut image = RgbaImage::new(10, 10);
        let rect = Rectangle {
            top_left: crate::models::Point::new(5, 5),
            bottom_right: crate::models::Point::new(50, 50),
        };
        fill_rect(&mut image, &rect, Rgba([1, 2, 3, 255]));
        assert_eq!(*image.get_pixel(9, 9), Rgba([1, 2, 3, 255]));
        assert_eq!(*image.get_pixel(4, 4), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn png_output_has_signature() {
        let png = Identicon::new("banner").to_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn write_failure_is_reported() {
        let identicon = Identicon::new("banner");
        let err = identicon.write_image(FailingSink { budget: 0 }).unwrap_err();
        assert!(matches!(err, IdenticonError::Encode(_)));

        let err = identicon.write_image(FailingSink { budget: 64 }).unwrap_err();
        assert!(matches!(err, IdenticonError::Encode(_)));
    }

    #[test]
    fn file_name_appends_png_suffix() {
        assert_eq!(Identicon::new("alice").file_name(), "alice.png");
    }
}
