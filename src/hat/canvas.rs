use std::convert::Infallible;

use embedded_graphics::{
    mono_font::{MonoTextStyle, ascii::FONT_5X7},
    pixelcolor::Gray8,
    prelude::*,
    text::{Baseline, Text},
};

use super::{HatFont, MATRIX_HEIGHT};
use crate::clock_font::clock_font;

/// Off-screen buffer the text views render into. It grows to the right as
/// text is written, so a string wider than the matrix can be scrolled across
/// the visible window, scrollbot-style. One byte per pixel (PWM level).
#[derive(Debug, Clone)]
pub struct Canvas {
    min_width: u32,
    width: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(min_width: u32) -> Self {
        Canvas {
            min_width,
            width: min_width,
            pixels: vec![0; (min_width * MATRIX_HEIGHT) as usize],
        }
    }

    #[allow(dead_code)]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Blank the canvas and drop any growth from previous text.
    pub fn clear(&mut self) {
        self.width = self.min_width;
        self.pixels = vec![0; (self.min_width * MATRIX_HEIGHT) as usize];
    }

    /// Widen the canvas, preserving existing rows. Never shrinks.
    fn grow_to(&mut self, width: u32) {
        if width <= self.width {
            return;
        }
        let mut pixels = vec![0u8; (width * MATRIX_HEIGHT) as usize];
        for y in 0..MATRIX_HEIGHT {
            let src = (y * self.width) as usize;
            let dst = (y * width) as usize;
            pixels[dst..dst + self.width as usize]
                .copy_from_slice(&self.pixels[src..src + self.width as usize]);
        }
        self.width = width;
        self.pixels = pixels;
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, level: u8) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= MATRIX_HEIGHT as i32 {
            return;
        }
        self.pixels[(y as u32 * self.width + x as u32) as usize] = level;
    }

    /// PWM level at (x, y); anything outside the canvas is dark.
    pub fn pixel(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= MATRIX_HEIGHT as i32 {
            return 0;
        }
        self.pixels[(y as u32 * self.width + x as u32) as usize]
    }

    /// Render `text` starting at column `x` and return its pixel width.
    pub fn write_text(&mut self, text: &str, x: i32, font: HatFont, level: u8) -> u32 {
        match font {
            HatFont::Text => {
                let advance = FONT_5X7.character_size.width + FONT_5X7.character_spacing;
                let width = text.chars().count() as u32 * advance;
                self.grow_to((x.max(0) as u32).saturating_add(width));

                let style = MonoTextStyle::new(&FONT_5X7, Gray8::new(level));
                let _ = Text::with_baseline(text, Point::new(x, 0), style, Baseline::Top)
                    .draw(self);
                width
            }
            HatFont::Clock => self.write_clock_text(text, x, level),
        }
    }

    // 3x5 digits, vertically centered on the 7-row matrix
    fn write_clock_text(&mut self, text: &str, x: i32, level: u8) -> u32 {
        let font = clock_font();
        let y_offset = ((MATRIX_HEIGHT - font.digit_height) / 2) as i32;
        let mut cursor = x;
        for character in text.chars() {
            let Some((rows, advance)) = font.glyph(character) else {
                continue;
            };
            self.grow_to((cursor.max(0) as u32).saturating_add(advance));
            for (dy, row) in rows.iter().enumerate() {
                for dx in 0..advance {
                    if row & (0x80 >> dx) != 0 {
                        self.set_pixel(cursor + dx as i32, y_offset + dy as i32, level);
                    }
                }
            }
            cursor += advance as i32 + 1;
        }
        (cursor - x - 1).max(0) as u32
    }
}

impl DrawTarget for Canvas {
    type Color = Gray8;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, color.luma());
        }
        Ok(())
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.width, MATRIX_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hat::MATRIX_WIDTH;

    #[test]
    fn starts_dark() {
        let canvas = Canvas::new(MATRIX_WIDTH);
        for x in 0..MATRIX_WIDTH as i32 {
            for y in 0..MATRIX_HEIGHT as i32 {
                assert_eq!(canvas.pixel(x, y), 0);
            }
        }
    }

    #[test]
    fn text_lights_pixels_and_reports_width() {
        let mut canvas = Canvas::new(MATRIX_WIDTH);
        let width = canvas.write_text("1013", 0, HatFont::Text, 255);
        assert_eq!(width, 4 * 5);
        let lit = (0..canvas.width() as i32)
            .flat_map(|x| (0..MATRIX_HEIGHT as i32).map(move |y| (x, y)))
            .filter(|&(x, y)| canvas.pixel(x, y) > 0)
            .count();
        assert!(lit > 0);
    }

    #[test]
    fn canvas_grows_for_wide_text() {
        let mut canvas = Canvas::new(MATRIX_WIDTH);
        let width = canvas.write_text(" VERY HIGH ", 0, HatFont::Text, 255);
        assert_eq!(width, 11 * 5);
        assert!(canvas.width() >= width);
        // pixels past the visible window exist and are addressable
        assert_eq!(canvas.pixel(width as i32 + 5, 0), 0);
    }

    #[test]
    fn clock_text_fills_the_matrix_exactly() {
        let mut canvas = Canvas::new(MATRIX_WIDTH);
        let width = canvas.write_text("14:07", 0, HatFont::Clock, 255);
        assert_eq!(width, MATRIX_WIDTH);
        assert_eq!(canvas.width(), MATRIX_WIDTH);
        // rows 0 and 6 stay dark: the 5-tall glyphs sit one row down
        for x in 0..MATRIX_WIDTH as i32 {
            assert_eq!(canvas.pixel(x, 0), 0);
            assert_eq!(canvas.pixel(x, 6), 0);
        }
    }

    #[test]
    fn out_of_range_pixels_are_ignored() {
        let mut canvas = Canvas::new(MATRIX_WIDTH);
        canvas.set_pixel(-1, 0, 255);
        canvas.set_pixel(0, 50, 255);
        assert_eq!(canvas.pixel(-1, 0), 0);
        assert_eq!(canvas.pixel(0, 50), 0);
    }

    #[test]
    fn clear_resets_after_growth() {
        let mut canvas = Canvas::new(MATRIX_WIDTH);
        canvas.write_text("MODERATE", 0, HatFont::Text, 200);
        canvas.clear();
        for x in 0..canvas.width() as i32 {
            for y in 0..MATRIX_HEIGHT as i32 {
                assert_eq!(canvas.pixel(x, y), 0);
            }
        }
    }
}
