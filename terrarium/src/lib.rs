#![deny(clippy::all)]
#![forbid(unsafe_code)]

//! A population of tape-driven creatures living in a bounded 2D terrarium.

mod creature;
mod population;
mod world;

pub use creature::{
    Creature, CreatureSnapshot, DEFAULT_TAPE_LENGTH, Effect, Effects, Heading, Instruction, Tape,
};
pub use population::{CreatureId, Neighborhood, Population};
pub use world::{FrameSummary, Terrarium};

use rand::distr::uniform::{SampleRange, SampleUniform};
use rand::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

pub const MAX_POPULATION: usize = 2000;
pub const INITIAL_POPULATION: usize = 2000;

/// Paints one frame of the terrarium. Coordinates have their origin at the
/// top left and match the world size.
pub trait Surface {
    fn clear(&mut self, width: u32, height: u32);
    fn fill_square(&mut self, x: i32, y: i32, half_size: f32, color: [u8; 3]);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldSize {
    pub width: u32,
    pub height: u32,
}

impl WorldSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Snaps an out-of-bounds coordinate to the opposite edge. This is not
    /// modulo: a coordinate past the far edge becomes 0 however far past it
    /// is, and a negative one becomes the last cell.
    pub fn wrapped(self, size: WorldSize) -> Self {
        Self::new(
            Self::wrap_coord(self.x, size.width),
            Self::wrap_coord(self.y, size.height),
        )
    }

    fn wrap_coord(coord: i32, bound: u32) -> i32 {
        let bound = bound as i32;
        if coord >= bound {
            0
        } else if coord < 0 {
            bound - 1
        } else {
            coord
        }
    }

    /// Open square neighborhood test: offsets equal to `radius` are outside.
    pub fn is_within(self, center: Position, radius: i32) -> bool {
        (self.x - center.x).abs() < radius && (self.y - center.y).abs() < radius
    }
}

#[derive(Debug)]
pub struct Random {
    rng: SmallRng,
}

impl Random {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_rng(&mut rand::rng()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn next_bool(&mut self, p: f64) -> bool {
        self.rng.random_bool(p)
    }

    pub fn next_in_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rng.random_range(range)
    }

    pub fn next_color_rgb(&mut self) -> [u8; 3] {
        [self.rng.random(), self.rng.random(), self.rng.random()]
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new()
    }
}
