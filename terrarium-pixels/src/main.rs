#![deny(clippy::all)]
#![forbid(unsafe_code)]

use pixels_main_support::{AnimateError, animate, window_size_to_world_size};
use terrarium::{Random, Terrarium};

const CELL_PIXEL_WIDTH: u32 = 4;

fn main() -> Result<(), AnimateError> {
    env_logger::init();
    animate(|window_size| {
        Terrarium::new(
            window_size_to_world_size(window_size, CELL_PIXEL_WIDTH),
            Random::new(),
        )
    })
}
