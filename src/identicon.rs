use crate::models::{CELL_COUNT, DIGEST_LEN, GridCell, Rectangle, Rgb};
use md5::{Digest, Md5};
use serde::Serialize;
use tracing::debug;

/// A stage of the generation pipeline. Each stage fills in exactly one field.
pub type Stage = fn(Identicon) -> Identicon;

/// Stages run after hashing, in order.
pub const PIPELINE: [Stage; 4] = [pick_color, build_grid, filter_odd_squares, build_pixel_map];

/// The aggregate produced by one generation request.
///
/// Built once by [`generate`] and read-only afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Identicon {
    name: String,
    #[serde(serialize_with = "serialize_hex")]
    digest: [u8; DIGEST_LEN],
    color: Rgb,
    grid: Vec<u8>,
    visible_cells: Vec<GridCell>,
    pixel_rectangles: Vec<Rectangle>,
}

fn serialize_hex<S>(digest: &[u8; DIGEST_LEN], s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_str(&to_hex(digest))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

impl Identicon {
    /// Generates the identicon for a name.
    pub fn new(name: &str) -> Self {
        generate(name.as_bytes())
    }

    /// The original input, used to name output artifacts.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// Lowercase hex rendering of the digest.
    pub fn digest_hex(&self) -> String {
        to_hex(&self.digest)
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn grid(&self) -> &[u8] {
        &self.grid
    }

    pub fn visible_cells(&self) -> &[GridCell] {
        &self.visible_cells
    }

    pub fn pixel_rectangles(&self) -> &[Rectangle] {
        &self.pixel_rectangles
    }
}

/// Runs the whole pipeline over raw input bytes.
pub fn generate(input: &[u8]) -> Identicon {
    let identicon = PIPELINE.iter().fold(hash_input(input), |identicon, stage| stage(identicon));
    debug!(
        name = %identicon.name,
        digest = %identicon.digest_hex(),
        visible = identicon.visible_cells.len(),
        "identicon generated"
    );
    identicon
}

/// Hashes the input with MD5 and starts a fresh aggregate.
pub fn hash_input(input: &[u8]) -> Identicon {
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&Md5::digest(input));
    Identicon {
        name: String::from_utf8_lossy(input).into_owned(),
        digest,
        ..Default::default()
    }
}

/// Takes the first three digest bytes as red, green and blue.
pub fn pick_color(identicon: Identicon) -> Identicon {
    let [r, g, b, ..] = identicon.digest;
    Identicon {
        color: Rgb::new(r, g, b),
        ..identicon
    }
}

/// Expands the digest into 25 values, five mirrored rows of `[a, b, c, b, a]`.
///
/// Windows start at 0, 3, 6, 9 and 12; the last digest byte never starts or
/// joins a window and is dropped. Existing identicons depend on this.
pub fn build_grid(identicon: Identicon) -> Identicon {
    let mut grid = Vec::with_capacity(CELL_COUNT);
    for window in identicon.digest[..DIGEST_LEN - 1].chunks_exact(3) {
        let (a, b, c) = (window[0], window[1], window[2]);
        grid.extend_from_slice(&[a, b, c, b, a]);
    }
    Identicon { grid, ..identicon }
}

/// Keeps the cells whose value is even, in grid order.
pub fn filter_odd_squares(identicon: Identicon) -> Identicon {
    let visible_cells = identicon
        .grid
        .iter()
        .enumerate()
        .filter(|&(_, &value)| value % 2 == 0)
        .map(|(index, &value)| GridCell { value, index })
        .collect();
    Identicon {
        visible_cells,
        ..identicon
    }
}

/// Maps every visible cell to its block on the canvas.
pub fn build_pixel_map(identicon: Identicon) -> Identicon {
    let pixel_rectangles = identicon.visible_cells.iter().map(Rectangle::for_cell).collect();
    Identicon {
        pixel_rectangles,
        ..identicon
    }
}
