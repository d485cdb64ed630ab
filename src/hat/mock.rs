/*
 *  hat/mock.rs
 *
 *  DataBot - atmospheric data on a Pimoroni ScrollBot
 *	(c) 2020-26 Stuart Hunter
 *
 *	Recording hat for display-cycle tests, no hardware required
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */
use std::sync::{Arc, Mutex};

use super::canvas::Canvas;
use super::{Hat, HatError, HatFont, MATRIX_HEIGHT, MATRIX_WIDTH};

/// Every operation the display cycle performed, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum HatOp {
    Clear,
    Write { text: String, font: HatFont, level: u8 },
    ScrollTo(i32),
    Brightness(u8),
    Rotation(u16),
    Show,
}

/// A `Hat` that renders into a real canvas (so reported text widths are
/// honest) and records the operation stream for assertions.
pub struct MockHat {
    canvas: Canvas,
    ops: Arc<Mutex<Vec<HatOp>>>,
}

impl MockHat {
    pub fn new() -> (Self, Arc<Mutex<Vec<HatOp>>>) {
        let ops = Arc::new(Mutex::new(Vec::new()));
        let hat = MockHat {
            canvas: Canvas::new(MATRIX_WIDTH),
            ops: Arc::clone(&ops),
        };
        (hat, ops)
    }
}

impl Hat for MockHat {
    fn width(&self) -> u32 {
        MATRIX_WIDTH
    }

    fn height(&self) -> u32 {
        MATRIX_HEIGHT
    }

    fn clear(&mut self) {
        self.canvas.clear();
        self.ops.lock().unwrap().push(HatOp::Clear);
    }

    fn write_string(&mut self, text: &str, x: i32, font: HatFont, level: u8) -> u32 {
        self.ops.lock().unwrap().push(HatOp::Write {
            text: text.to_string(),
            font,
            level,
        });
        self.canvas.write_text(text, x, font, level)
    }

    fn scroll_to(&mut self, offset: i32) {
        self.ops.lock().unwrap().push(HatOp::ScrollTo(offset));
    }

    fn set_brightness(&mut self, level: u8) {
        self.ops.lock().unwrap().push(HatOp::Brightness(level));
    }

    fn set_rotation(&mut self, degrees: u16) -> Result<(), HatError> {
        if degrees != 0 && degrees != 180 {
            return Err(HatError::InvalidRotation(degrees));
        }
        self.ops.lock().unwrap().push(HatOp::Rotation(degrees));
        Ok(())
    }

    fn show(&mut self) -> Result<(), HatError> {
        self.ops.lock().unwrap().push(HatOp::Show);
        Ok(())
    }
}
