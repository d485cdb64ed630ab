/*
 *  hat/scrollphat.rs
 *
 *  DataBot - atmospheric data on a Pimoroni ScrollBot
 *	(c) 2020-26 Stuart Hunter
 *
 *	IS31FL3731 driver for the Pimoroni Scroll pHAT HD
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
use std::thread;
use std::time::Duration;

use embedded_hal::i2c::I2c;
use log::debug;

use super::canvas::Canvas;
use super::{Hat, HatError, HatFont, MATRIX_HEIGHT, MATRIX_WIDTH};

pub const I2C_ADDR: u8 = 0x74;

// IS31FL3731 register map
const REG_BANK_SELECT: u8 = 0xFD;
const CONFIG_BANK: u8 = 0x0B;
const REG_MODE: u8 = 0x00;
const REG_FRAME: u8 = 0x01;
const REG_AUDIOSYNC: u8 = 0x06;
const REG_SHUTDOWN: u8 = 0x0A;
const MODE_PICTURE: u8 = 0x00;
const OFFSET_ENABLE: u8 = 0x00;
const OFFSET_PWM: u8 = 0x24;

const PWM_REGISTERS: usize = 144;
const CHUNK: usize = 32;

/// Scroll pHAT HD over I2C. Owns the grow-on-write canvas and a scroll
/// offset; `show` maps the visible 17x7 window onto the controller's PWM
/// registers, writing to the back frame and flipping, so a partially
/// transferred frame is never displayed.
pub struct ScrollPhatHd<I2C> {
    i2c: I2C,
    canvas: Canvas,
    offset: i32,
    frame: u8,
    brightness: u8,
    rotate180: bool,
}

impl<I2C: I2c> ScrollPhatHd<I2C> {
    pub fn new(i2c: I2C) -> Result<Self, HatError> {
        let mut hat = ScrollPhatHd {
            i2c,
            canvas: Canvas::new(MATRIX_WIDTH),
            offset: 0,
            frame: 0,
            brightness: 255,
            rotate180: false,
        };
        hat.init()?;
        Ok(hat)
    }

    fn init(&mut self) -> Result<(), HatError> {
        self.bank(CONFIG_BANK)?;
        self.write_reg(REG_SHUTDOWN, 0)?;
        thread::sleep(Duration::from_millis(1));
        self.write_reg(REG_SHUTDOWN, 1)?;
        self.write_reg(REG_MODE, MODE_PICTURE)?;
        self.write_reg(REG_AUDIOSYNC, 0)?;

        // enable the full LED grid and blank both frames
        for frame in 0..2 {
            self.bank(frame)?;
            let mut enable = [0xFF_u8; 19];
            enable[0] = OFFSET_ENABLE;
            self.i2c
                .write(I2C_ADDR, &enable)
                .map_err(|e| HatError::I2c(format!("{e:?}")))?;
            self.write_block(OFFSET_PWM, &[0; PWM_REGISTERS])?;
        }

        self.bank(CONFIG_BANK)?;
        self.write_reg(REG_FRAME, 0)?;
        debug!("scroll phat hd initialized");
        Ok(())
    }

    fn bank(&mut self, bank: u8) -> Result<(), HatError> {
        self.write_reg(REG_BANK_SELECT, bank)
    }

    fn write_reg(&mut self, register: u8, value: u8) -> Result<(), HatError> {
        self.i2c
            .write(I2C_ADDR, &[register, value])
            .map_err(|e| HatError::I2c(format!("{e:?}")))
    }

    // the controller accepts at most ~32 data bytes per transaction
    fn write_block(&mut self, offset: u8, data: &[u8]) -> Result<(), HatError> {
        for (i, chunk) in data.chunks(CHUNK).enumerate() {
            let mut buf = Vec::with_capacity(chunk.len() + 1);
            buf.push(offset + (i * CHUNK) as u8);
            buf.extend_from_slice(chunk);
            self.i2c
                .write(I2C_ADDR, &buf)
                .map_err(|e| HatError::I2c(format!("{e:?}")))?;
        }
        Ok(())
    }
}

/// Register offset of matrix position (x, y). The Scroll pHAT HD wires its
/// two 8-column halves to the controller mirrored from each other; this is
/// the layout the Pimoroni firmware documents.
fn pixel_addr(x: i32, y: i32) -> usize {
    let (x, y) = if x > 8 {
        (x - 8, 6 - (y + 8))
    } else {
        (8 - x, y)
    };
    (x * 16 + y) as usize
}

impl<I2C: I2c + Send> Hat for ScrollPhatHd<I2C> {
    fn width(&self) -> u32 {
        MATRIX_WIDTH
    }

    fn height(&self) -> u32 {
        MATRIX_HEIGHT
    }

    fn clear(&mut self) {
        self.canvas.clear();
        self.offset = 0;
    }

    fn write_string(&mut self, text: &str, x: i32, font: HatFont, level: u8) -> u32 {
        self.canvas.write_text(text, x, font, level)
    }

    fn scroll_to(&mut self, offset: i32) {
        self.offset = offset;
    }

    fn set_brightness(&mut self, level: u8) {
        self.brightness = level;
    }

    fn set_rotation(&mut self, degrees: u16) -> Result<(), HatError> {
        match degrees {
            0 => self.rotate180 = false,
            180 => self.rotate180 = true,
            other => return Err(HatError::InvalidRotation(other)),
        }
        Ok(())
    }

    fn show(&mut self) -> Result<(), HatError> {
        let next = 1 - self.frame;
        let mut pwm = [0u8; PWM_REGISTERS];

        for x in 0..MATRIX_WIDTH as i32 {
            for y in 0..MATRIX_HEIGHT as i32 {
                let (sx, sy) = if self.rotate180 {
                    (MATRIX_WIDTH as i32 - 1 - x, MATRIX_HEIGHT as i32 - 1 - y)
                } else {
                    (x, y)
                };
                let raw = self.canvas.pixel(self.offset + sx, sy);
                let scaled = (raw as u16 * self.brightness as u16 / 255) as u8;
                pwm[pixel_addr(x, y)] = scaled;
            }
        }

        self.bank(next)?;
        self.write_block(OFFSET_PWM, &pwm)?;
        self.bank(CONFIG_BANK)?;
        self.write_reg(REG_FRAME, next)?;
        self.frame = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_addr_covers_all_positions_without_collision() {
        let mut seen = std::collections::HashSet::new();
        for x in 0..MATRIX_WIDTH as i32 {
            for y in 0..MATRIX_HEIGHT as i32 {
                let addr = pixel_addr(x, y);
                assert!(addr < PWM_REGISTERS, "addr {addr} out of range at ({x},{y})");
                assert!(seen.insert(addr), "duplicate addr {addr} at ({x},{y})");
            }
        }
        assert_eq!(seen.len(), (MATRIX_WIDTH * MATRIX_HEIGHT) as usize);
    }
}
