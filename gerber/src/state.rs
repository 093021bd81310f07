//! The modal graphics state carried between data blocks.
//!
//! A plain record mutated by the interpreter; no inheritance, no methods
//! beyond simple accessors. The state machine itself lives in
//! [`crate::interpreter`] as a function `(state, block) -> (state', primitives)`.

use crate::aperture::ApertureId;
use crate::coord::{CoordUnit, CoordinateFormat, Unit};
use crate::primitive::PathCommand;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InterpolationMode {
    Linear,
    CwCircular,
    CcwCircular,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum QuadrantMode {
    Single,
    Multi,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegionMode {
    Off,
    On,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Polarity {
    Dark,
    Clear,
}

/// The accumulating boundary of a region opened by `G36`, closed by `G37`.
#[derive(Clone, Debug)]
pub struct RegionPath {
    pub start: (CoordUnit, CoordUnit),
    pub commands: Vec<PathCommand>,
}

/// Modal state carried between Gerber data blocks for the lifetime of one
/// file parse.
#[derive(Clone, Debug)]
pub struct GraphicsState {
    pub current_aperture: Option<ApertureId>,
    pub interp_mode: InterpolationMode,
    pub quadrant_mode: QuadrantMode,
    pub region_mode: RegionMode,
    pub polarity: Polarity,
    pub current_point: (CoordUnit, CoordUnit),
    pub format: Option<CoordinateFormat>,
    pub unit: Option<Unit>,
    pub in_region_path: Option<RegionPath>,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            current_aperture: None,
            interp_mode: InterpolationMode::Linear,
            quadrant_mode: QuadrantMode::Single,
            region_mode: RegionMode::Off,
            polarity: Polarity::Dark,
            current_point: (0, 0),
            format: None,
            unit: None,
            in_region_path: None,
        }
    }
}

impl GraphicsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn polarity_color<'a>(&self, dark: &'a str, clear: &'a str) -> &'a str {
        match self.polarity {
            Polarity::Dark => dark,
            Polarity::Clear => clear,
        }
    }
}
