//! Fixed-point coordinate tokens and block instruction decoding.

mod core;

pub use core::{Block, DecodeError, NumberFormat, decode_block, decode_number, parse_block_number};
