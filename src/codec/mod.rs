pub mod game_float;

pub use game_float::{decode, encode, GAME_FLOAT_MARKER};
