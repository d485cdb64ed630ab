/*
 *  hat/mod.rs
 *
 *  DataBot - atmospheric data on a Pimoroni ScrollBot
 *	(c) 2020-26 Stuart Hunter
 *
 *	Render collaborator abstraction for the Scroll pHAT HD LED matrix
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
use thiserror::Error;

pub mod canvas;
#[cfg(test)]
pub mod mock;
pub mod scrollphat;

/// The Scroll pHAT HD is a 17x7 matrix.
pub const MATRIX_WIDTH: u32 = 17;
pub const MATRIX_HEIGHT: u32 = 7;

#[derive(Debug, Error)]
pub enum HatError {
    #[error("I2C communication error: {0}")]
    I2c(String),
    #[error("invalid rotation angle: {0} (must be 0 or 180)")]
    InvalidRotation(u16),
}

/// Font selector for `Hat::write_string`. `Text` is the general 5x7 mono
/// font; `Clock` is the compact 3x5 digit font that fits HH:MM on the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HatFont {
    Text,
    Clock,
}

/// The display cycle's view of the LED matrix: a scrollable off-screen
/// canvas plus a flush. Hardware lives behind this seam so the cycle can be
/// exercised against a recording mock.
pub trait Hat: Send {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Blank the canvas and reset the scroll offset.
    fn clear(&mut self);

    /// Render `text` at canvas column `x`, growing the canvas as needed.
    /// Returns the rendered width in pixels; `level` is the per-pixel PWM
    /// value before global brightness scaling.
    fn write_string(&mut self, text: &str, x: i32, font: HatFont, level: u8) -> u32;

    /// Move the visible window to canvas column `offset`.
    fn scroll_to(&mut self, offset: i32);

    /// Global brightness, applied at flush time.
    fn set_brightness(&mut self, level: u8);

    /// Orientation is configured once at startup; only 0 and 180 exist on
    /// this hardware.
    fn set_rotation(&mut self, degrees: u16) -> Result<(), HatError>;

    /// Push the visible window to the LEDs.
    fn show(&mut self) -> Result<(), HatError>;
}
