/// Placement of the finished codeword stream into the physical module
/// grid: central finder pattern, vertical guide bars, spigot bumps, and
/// the version-specific quadrant copies of the data bits.
use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};
use image;

use std::io::Cursor;

use crate::config::Version;
use crate::tables::lookup_version;

pub const BIT_WHITE: image::Luma<u8> = image::Luma([255u8]);
pub const BIT_BLACK: image::Luma<u8> = image::Luma([0u8]);

/// A finished symbol: the module grid plus the version it was built for.
/// Modules are exposed as booleans; `to_image` renders pixels for callers
/// that want them.
#[derive(Debug, Clone)]
pub struct Symbol {
    canvas: image::GrayImage,
    version: Version,
}

impl Symbol {
    pub fn version(&self) -> Version {
        self.version
    }

    /// Number of module rows.
    pub fn rows(&self) -> u32 {
        self.canvas.height()
    }

    /// Number of module columns.
    pub fn cols(&self) -> u32 {
        self.canvas.width()
    }

    /// Whether the module at (row, col) is dark.
    pub fn module(&self, row: u32, col: u32) -> bool {
        self.canvas[(col, row)] == BIT_BLACK
    }

    /// Relative height of each module row; uniform for this symbology.
    pub fn row_heights(&self) -> Vec<f32> {
        vec![1.0; self.rows() as usize]
    }

    /// The grid as nested booleans, row major.
    pub fn to_modules(&self) -> Vec<Vec<bool>> {
        (0..self.rows())
            .map(|r| (0..self.cols()).map(|c| self.module(r, c)).collect())
            .collect()
    }

    /// Render the grid at `scale` pixels per module (black on white, no
    /// quiet zone).
    pub fn to_image(&self, scale: u32) -> image::GrayImage {
        let scale = scale.max(1);
        image::GrayImage::from_fn(self.cols() * scale, self.rows() * scale, |x, y| {
            if self.module(y / scale, x / scale) {
                BIT_BLACK
            } else {
                BIT_WHITE
            }
        })
    }
}

//-------------------------------------------------------------------------------------------------
// drawing primitives

fn set(canvas: &mut image::GrayImage, row: u32, col: u32) {
    canvas[(col, row)] = BIT_BLACK;
}

fn is_set(canvas: &image::GrayImage, row: u32, col: u32) -> bool {
    canvas[(col, row)] == BIT_BLACK
}

/// Solid horizontal bar over the full width, or inset by one module at
/// both ends for the broken finder rows.
fn horiz(canvas: &mut image::GrayImage, row: u32, full: bool) {
    let w = canvas.width();
    let (from, to) = if full { (0, w) } else { (1, w - 1) };
    for col in from..to {
        set(canvas, row, col);
    }
}

/// Vertical guide bar of `len` modules hanging from the top edge or
/// standing on the bottom edge.
fn vert(canvas: &mut image::GrayImage, col: u32, len: u32, from_top: bool) {
    let h = canvas.height();
    for i in 0..len {
        let row = if from_top { i } else { h - 1 - i };
        set(canvas, row, col);
    }
}

/// Extend every dark run in the row by one module to the right; on the
/// edge rows this turns the guide bars into their recognition bumps.
fn spigot(canvas: &mut image::GrayImage, row: u32) {
    for col in (1..canvas.width()).rev() {
        if is_set(canvas, row, col - 1) {
            set(canvas, row, col);
        }
    }
}

/// The central recognition pattern: `full` solid bar rows followed by
/// broken bar rows.
fn central_finder(canvas: &mut image::GrayImage, start_row: u32, rows: u32, full: u32) {
    for i in 0..rows {
        horiz(canvas, start_row + i, i < full);
    }
}

/// Copy a rectangle of the expanded data grid onto the canvas at the
/// version's quadrant offset. Only dark modules are written.
#[allow(clippy::too_many_arguments)]
fn block_copy(
    canvas: &mut image::GrayImage,
    grid: &[Vec<bool>],
    src_row: u32,
    src_col: u32,
    height: u32,
    width: u32,
    row_offset: u32,
    col_offset: u32,
) {
    for r in 0..height {
        for c in 0..width {
            if grid[(src_row + r) as usize][(src_col + c) as usize] {
                set(canvas, src_row + r + row_offset, src_col + c + col_offset);
            }
        }
    }
}

/// Expand the codeword stream into the data grid: every codeword fills a
/// cell four modules wide and two rows tall, most significant bit first
/// (top nibble, then bottom nibble).
fn expand_datagrid(stream: &[u8], grid_width: usize, grid_height: usize) -> Vec<Vec<bool>> {
    let mut grid = vec![vec![false; 4 * grid_width]; 2 * grid_height];
    let mut reader = BitReader::endian(Cursor::new(stream), BigEndian);
    for r in 0..grid_height {
        for c in 0..grid_width {
            for bit in 0..8usize {
                if reader.read_bit().unwrap() {
                    grid[2 * r + bit / 4][4 * c + bit % 4] = true;
                }
            }
        }
    }
    grid
}

//-------------------------------------------------------------------------------------------------
// per-version drawing programs

struct Layout {
    finder: (u32, u32, u32), // start row, rows, solid rows
    verts: &'static [(u32, u32, bool)],
    spigots: &'static [u32],
    blocks: &'static [(u32, u32, u32, u32, u32, u32)],
}

fn layout(version: Version) -> Layout {
    match version {
        Version::A => Layout {
            finder: (6, 3, 1),
            verts: &[(4, 6, true), (12, 5, false)],
            spigots: &[0, 15],
            blocks: &[
                (0, 0, 5, 4, 0, 0),
                (0, 4, 5, 12, 0, 2),
                (5, 0, 5, 12, 6, 0),
                (5, 12, 5, 4, 6, 2),
            ],
        },
        Version::B => Layout {
            finder: (8, 4, 2),
            verts: &[(4, 8, true), (16, 7, false)],
            spigots: &[0, 21],
            blocks: &[
                (0, 0, 7, 4, 0, 0),
                (0, 4, 7, 16, 0, 2),
                (7, 0, 7, 16, 8, 0),
                (7, 16, 7, 4, 8, 2),
            ],
        },
        Version::C => Layout {
            finder: (11, 4, 2),
            verts: &[
                (4, 11, true),
                (26, 11, true),
                (4, 10, false),
                (26, 10, false),
            ],
            spigots: &[0, 27],
            blocks: &[
                (0, 0, 10, 4, 0, 0),
                (0, 4, 10, 20, 0, 2),
                (0, 24, 10, 4, 0, 4),
                (10, 0, 10, 4, 8, 0),
                (10, 4, 10, 20, 8, 2),
                (10, 24, 10, 4, 8, 4),
            ],
        },
        Version::D => Layout {
            finder: (16, 5, 3),
            verts: &[
                (4, 16, true),
                (22, 16, true),
                (36, 16, true),
                (4, 15, false),
                (22, 15, false),
                (36, 15, false),
            ],
            spigots: &[0, 39],
            blocks: &[
                (0, 0, 15, 4, 0, 0),
                (0, 4, 15, 16, 0, 2),
                (0, 20, 15, 12, 0, 4),
                (0, 32, 15, 4, 0, 6),
                (15, 0, 15, 4, 10, 0),
                (15, 4, 15, 16, 10, 2),
                (15, 20, 15, 12, 10, 4),
                (15, 32, 15, 4, 10, 6),
            ],
        },
        Version::E => Layout {
            finder: (22, 5, 3),
            verts: &[
                (4, 22, true),
                (26, 22, true),
                (48, 22, true),
                (4, 21, false),
                (26, 21, false),
                (48, 21, false),
            ],
            spigots: &[0, 51],
            blocks: &[
                (0, 0, 21, 4, 0, 0),
                (0, 4, 21, 20, 0, 2),
                (0, 24, 21, 20, 0, 4),
                (0, 44, 21, 4, 0, 6),
                (21, 0, 21, 4, 10, 0),
                (21, 4, 21, 20, 10, 2),
                (21, 24, 21, 20, 10, 4),
                (21, 44, 21, 4, 10, 6),
            ],
        },
        Version::F => Layout {
            finder: (31, 5, 3),
            verts: &[
                (4, 31, true),
                (26, 31, true),
                (48, 31, true),
                (70, 31, true),
                (4, 30, false),
                (26, 30, false),
                (48, 30, false),
                (70, 30, false),
            ],
            spigots: &[0, 69],
            blocks: &[
                (0, 0, 30, 4, 0, 0),
                (0, 4, 30, 20, 0, 2),
                (0, 24, 30, 20, 0, 4),
                (0, 44, 30, 20, 0, 6),
                (0, 64, 30, 4, 0, 8),
                (30, 0, 30, 4, 10, 0),
                (30, 4, 30, 20, 10, 2),
                (30, 24, 30, 20, 10, 4),
                (30, 44, 30, 20, 10, 6),
                (30, 64, 30, 4, 10, 8),
            ],
        },
        Version::G => Layout {
            finder: (48, 6, 4),
            verts: &[
                (4, 47, true),
                (26, 47, true),
                (48, 47, true),
                (70, 47, true),
                (92, 47, true),
                (4, 46, false),
                (26, 46, false),
                (48, 46, false),
                (70, 46, false),
                (92, 46, false),
            ],
            spigots: &[0, 103],
            blocks: &[
                (0, 0, 46, 4, 0, 0),
                (0, 4, 46, 20, 0, 2),
                (0, 24, 46, 20, 0, 4),
                (0, 44, 46, 20, 0, 6),
                (0, 64, 46, 20, 0, 8),
                (0, 84, 46, 4, 0, 10),
                (46, 0, 46, 4, 12, 0),
                (46, 4, 46, 20, 12, 2),
                (46, 24, 46, 20, 12, 4),
                (46, 44, 46, 20, 12, 6),
                (46, 64, 46, 20, 12, 8),
                (46, 84, 46, 4, 12, 10),
            ],
        },
        Version::H => Layout {
            finder: (70, 6, 4),
            verts: &[
                (12, 69, true),
                (30, 69, true),
                (48, 69, true),
                (66, 69, true),
                (84, 69, true),
                (102, 69, true),
                (120, 69, true),
                (12, 68, false),
                (30, 68, false),
                (48, 68, false),
                (66, 68, false),
                (84, 68, false),
                (102, 68, false),
                (120, 68, false),
            ],
            spigots: &[0, 147],
            blocks: &[
                (0, 0, 68, 12, 0, 0),
                (0, 12, 68, 16, 0, 2),
                (0, 28, 68, 16, 0, 4),
                (0, 44, 68, 16, 0, 6),
                (0, 60, 68, 16, 0, 8),
                (0, 76, 68, 16, 0, 10),
                (0, 92, 68, 16, 0, 12),
                (0, 108, 68, 12, 0, 14),
                (68, 0, 68, 12, 12, 0),
                (68, 12, 68, 16, 12, 2),
                (68, 28, 68, 16, 12, 4),
                (68, 44, 68, 16, 12, 6),
                (68, 60, 68, 16, 12, 8),
                (68, 76, 68, 16, 12, 10),
                (68, 92, 68, 16, 12, 12),
                (68, 108, 68, 12, 12, 14),
            ],
        },
        Version::T(1) => Layout {
            finder: (7, 3, 1),
            verts: &[],
            spigots: &[0, 15],
            blocks: &[(0, 0, 6, 16, 0, 0), (6, 0, 4, 16, 6, 0)],
        },
        Version::T(2) => Layout {
            finder: (7, 3, 1),
            verts: &[],
            spigots: &[0, 15],
            blocks: &[(0, 0, 6, 32, 0, 0), (6, 0, 4, 32, 6, 0)],
        },
        Version::T(_) => Layout {
            finder: (7, 3, 1),
            verts: &[],
            spigots: &[0, 15],
            blocks: &[(0, 0, 6, 48, 0, 0), (6, 0, 4, 48, 6, 0)],
        },
        Version::S(_) => unreachable!("Version S uses the bit raster path"),
    }
}

fn build_general(stream: &[u8], version: Version) -> Symbol {
    let info = lookup_version(version);
    assert_eq!(stream.len(), info.total_length());

    let mut canvas = image::GrayImage::from_pixel(info.width, info.height, BIT_WHITE);
    let plan = layout(version);

    let (start, rows, full) = plan.finder;
    central_finder(&mut canvas, start, rows, full);
    for &(col, len, top) in plan.verts {
        vert(&mut canvas, col, len, top);
    }
    for &row in plan.spigots {
        spigot(&mut canvas, row);
    }

    let grid = expand_datagrid(stream, info.grid_width, info.grid_height);
    for &(sr, sc, h, w, ro, co) in plan.blocks {
        block_copy(&mut canvas, &grid, sr, sc, h, w, ro, co);
    }

    Symbol { canvas, version }
}

/// Version S places its 5-bit words as a plain bit raster into the two
/// three-row bands around the central bar, leaving the rightmost column
/// to the guide bar.
fn build_version_s(stream: &[u8], version: Version) -> Symbol {
    let info = lookup_version(version);
    assert_eq!(stream.len(), info.total_length());

    let mut canvas = image::GrayImage::from_pixel(info.width, info.height, BIT_WHITE);
    let w = info.width;

    horiz(&mut canvas, 3, true);
    horiz(&mut canvas, 4, false);
    vert(&mut canvas, w - 1, 3, true);
    vert(&mut canvas, w - 1, 3, false);
    spigot(&mut canvas, 0);
    spigot(&mut canvas, 7);

    let mut packed: Vec<u8> = Vec::new();
    {
        let mut writer = BitWriter::endian(&mut packed, BigEndian);
        for &word in stream {
            writer.write(5, word as u32).unwrap();
        }
        writer.byte_align().unwrap();
    }

    let total_bits = stream.len() * 5;
    let mut reader = BitReader::endian(Cursor::new(&packed), BigEndian);
    let mut placed = 0usize;
    'rows: for &row in &[0u32, 1, 2, 5, 6, 7] {
        for col in 0..w - 1 {
            if placed == total_bits {
                break 'rows;
            }
            if reader.read_bit().unwrap() {
                set(&mut canvas, row, col);
            }
            placed += 1;
        }
    }

    Symbol { canvas, version }
}

/// Build the module grid for a sealed codeword stream.
pub fn build_symbol(stream: &[u8], version: Version) -> Symbol {
    match version {
        Version::S(_) => build_version_s(stream, version),
        _ => build_general(stream, version),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::VERSION_TABLE;

    #[test]
    fn test_every_version_builds_in_bounds() {
        // a panic here means a drawing program writes outside its canvas
        for (&v, info) in VERSION_TABLE.iter() {
            let stream: Vec<u8> = (0..info.total_length())
                .map(|i| {
                    if info.field_poly == 0x25 {
                        (i % 32) as u8
                    } else {
                        (i % 251) as u8
                    }
                })
                .collect();
            let symbol = build_symbol(&stream, v);
            assert_eq!(symbol.cols(), info.width);
            assert_eq!(symbol.rows(), info.height);
        }
    }

    #[test]
    fn test_finder_row_is_solid() {
        let stream = vec![0u8; 20];
        let symbol = build_symbol(&stream, Version::A);
        for col in 0..symbol.cols() {
            assert!(symbol.module(6, col));
        }
        // broken row is inset at both ends
        assert!(!symbol.module(7, 0));
        assert!(symbol.module(7, 1));
        assert!(!symbol.module(7, symbol.cols() - 1));
    }

    #[test]
    fn test_all_zero_stream_leaves_data_area_blank() {
        let stream = vec![0u8; 20];
        let symbol = build_symbol(&stream, Version::A);
        // top-left data cell of an all-zero stream stays white
        assert!(!symbol.module(0, 0));
        assert!(!symbol.module(1, 3));
    }

    #[test]
    fn test_datagrid_expansion_is_msb_first() {
        let grid = expand_datagrid(&[0b1001_0110], 1, 1);
        assert_eq!(grid[0], vec![true, false, false, true]);
        assert_eq!(grid[1], vec![false, true, true, false]);
    }

    #[test]
    fn test_codeword_lands_in_top_left_cell() {
        let mut stream = vec![0u8; 20];
        stream[0] = 0b1000_0000;
        let symbol = build_symbol(&stream, Version::A);
        assert!(symbol.module(0, 0));
        assert!(!symbol.module(0, 1));
    }

    #[test]
    fn test_spigot_extends_guide_bar() {
        let stream = vec![0u8; 20];
        let symbol = build_symbol(&stream, Version::A);
        // the top guide bar at column 4 grows a one-module bump at row 0
        assert!(symbol.module(0, 4));
        assert!(symbol.module(0, 5));
        assert!(!symbol.module(1, 5));
    }

    #[test]
    fn test_version_s_geometry() {
        let stream = vec![0u8; 8];
        let symbol = build_symbol(&stream, Version::S(1));
        assert_eq!((symbol.cols(), symbol.rows()), (11, 8));
        for col in 0..11 {
            assert!(symbol.module(3, col));
        }
        assert!(!symbol.module(4, 0));
        // right guide bar
        assert!(symbol.module(0, 10));
        assert!(symbol.module(7, 10));
    }

    #[test]
    fn test_version_s_bits_fill_top_band_first() {
        // first word 0b10110 lands at the start of row 0
        let mut stream = vec![0u8; 8];
        stream[0] = 0b10110;
        let symbol = build_symbol(&stream, Version::S(1));
        assert!(symbol.module(0, 0));
        assert!(!symbol.module(0, 1));
        assert!(symbol.module(0, 2));
        assert!(symbol.module(0, 3));
        assert!(!symbol.module(0, 4));
    }

    #[test]
    fn test_row_heights_are_uniform() {
        let stream = vec![0u8; 20];
        let symbol = build_symbol(&stream, Version::A);
        let heights = symbol.row_heights();
        assert_eq!(heights.len(), 16);
        assert!(heights.iter().all(|&h| (h - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn test_to_image_scales_modules() {
        let stream = vec![0u8; 20];
        let symbol = build_symbol(&stream, Version::A);
        let img = symbol.to_image(3);
        assert_eq!(img.dimensions(), (18 * 3, 16 * 3));
        assert_eq!(img[(6, 6 * 3)], BIT_BLACK); // finder row
    }
}
