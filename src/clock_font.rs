/// A compact digit font for the clock view. The matrix is 17 pixels wide;
/// four 3x5 digits, a 1-pixel colon and four 1-pixel gaps render "HH:MM" at
/// exactly 17 pixels, which the stock 5x7 text font cannot do.
///
/// Glyph rows are bitmasks with the leftmost pixel in bit 7.
pub struct ClockFontData {
    pub digit_width: u32,
    pub digit_height: u32,
    digits: [[u8; 5]; 10],
    colon: [u8; 5],
    space: [u8; 5],
}

const DIGITS_3X5: [[u8; 5]; 10] = [
    [0xE0, 0xA0, 0xA0, 0xA0, 0xE0], // 0
    [0x40, 0xC0, 0x40, 0x40, 0xE0], // 1
    [0xE0, 0x20, 0xE0, 0x80, 0xE0], // 2
    [0xE0, 0x20, 0xE0, 0x20, 0xE0], // 3
    [0xA0, 0xA0, 0xE0, 0x20, 0x20], // 4
    [0xE0, 0x80, 0xE0, 0x20, 0xE0], // 5
    [0xE0, 0x80, 0xE0, 0xA0, 0xE0], // 6
    [0xE0, 0x20, 0x20, 0x40, 0x40], // 7
    [0xE0, 0xA0, 0xE0, 0xA0, 0xE0], // 8
    [0xE0, 0xA0, 0xE0, 0x20, 0xE0], // 9
];

const COLON_1X5: [u8; 5] = [0x00, 0x80, 0x00, 0x80, 0x00];

static CLOCK_FONT: ClockFontData = ClockFontData {
    digit_width: 3,
    digit_height: 5,
    digits: DIGITS_3X5,
    colon: COLON_1X5,
    space: [0; 5],
};

pub fn clock_font() -> &'static ClockFontData {
    &CLOCK_FONT
}

impl ClockFontData {
    /// Row data and advance width for a character, or `None` if this font
    /// doesn't carry it.
    pub fn glyph(&self, character: char) -> Option<(&[u8; 5], u32)> {
        match character {
            '0'..='9' => {
                let d = character.to_digit(10).unwrap() as usize;
                Some((&self.digits[d], self.digit_width))
            }
            ':' => Some((&self.colon, 1)),
            ' ' => Some((&self.space, self.digit_width)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hhmm_is_exactly_matrix_width() {
        let font = clock_font();
        let width: u32 = "14:07"
            .chars()
            .map(|c| font.glyph(c).unwrap().1 + 1)
            .sum::<u32>()
            - 1; // no gap after the last glyph
        assert_eq!(width, 17);
    }

    #[test]
    fn unsupported_characters_are_none() {
        assert!(clock_font().glyph('A').is_none());
        assert!(clock_font().glyph('-').is_none());
    }

    #[test]
    fn digit_rows_stay_in_three_columns() {
        for rows in DIGITS_3X5.iter() {
            for row in rows {
                assert_eq!(row & 0x1F, 0, "pixel outside the 3-wide glyph box");
            }
        }
    }
}
