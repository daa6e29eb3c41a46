//! Threat box and label overlay.

use image::{Rgb, RgbImage};
use sentinel_types::{BoundingBox, Frame};

pub const ANNOTATION_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const BOX_THICKNESS: i32 = 2;
/// Pixel size of one glyph cell.
pub const TEXT_SCALE: i32 = 2;
/// Baseline of the label sits this far above the top edge of the box.
pub const LABEL_OFFSET: i32 = 10;

const GLYPH_WIDTH: i32 = 5;
const GLYPH_HEIGHT: i32 = 7;
const GLYPH_ADVANCE: i32 = GLYPH_WIDTH + 1;

/// Copy of `frame` with `bounds` outlined and `label` written above its
/// top-left corner.  Drawing is clipped to the frame.
pub fn annotate_threat(frame: &Frame, bounds: &BoundingBox, label: &str) -> Frame {
    let mut img = frame.pixels().clone();
    draw_rectangle(&mut img, bounds);
    draw_label(&mut img, bounds.min_x, bounds.min_y - LABEL_OFFSET, label);
    frame.derive(img)
}

fn put(img: &mut RgbImage, x: i32, y: i32) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, ANNOTATION_COLOR);
    }
}

fn draw_rectangle(img: &mut RgbImage, b: &BoundingBox) {
    for t in 0..BOX_THICKNESS {
        for x in b.min_x..=b.max_x {
            put(img, x, b.min_y + t);
            put(img, x, b.max_y - t);
        }
        for y in b.min_y..=b.max_y {
            put(img, b.min_x + t, y);
            put(img, b.max_x - t, y);
        }
    }
}

/// Bitmap text with its bottom-left corner at `(x, baseline)`.
fn draw_label(img: &mut RgbImage, x: i32, baseline: i32, label: &str) {
    let top = baseline - GLYPH_HEIGHT * TEXT_SCALE;
    for (i, ch) in label.chars().enumerate() {
        let Some(rows) = glyph(ch) else { continue };
        let origin_x = x + i as i32 * GLYPH_ADVANCE * TEXT_SCALE;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..TEXT_SCALE {
                    for dx in 0..TEXT_SCALE {
                        put(
                            img,
                            origin_x + col * TEXT_SCALE + dx,
                            top + row as i32 * TEXT_SCALE + dy,
                        );
                    }
                }
            }
        }
    }
}

/// 5×7 glyph rows, most significant of the low five bits is the leftmost
/// column.  Unsupported characters render as blanks.
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        _ => return None,
    };
    Some(rows)
}
