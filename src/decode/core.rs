use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Point;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty coordinate token")]
    Empty,
    #[error("malformed coordinate token `{0}`")]
    Malformed(String),
    #[error("not a block instruction: `{0}`")]
    NotABlock(String),
    #[error("block number out of range in `{0}`")]
    BlockNumber(String),
}

/// Decimal convention of machine coordinate tokens without a decimal point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "zeros")]
pub enum NumberFormat {
    /// Leading zeros kept: the first `integer_digits` digits are the integer part.
    LeadingZero { integer_digits: u32 },
    /// Trailing zeros kept: the last `decimals` digits are the fraction.
    TrailingZero { decimals: u32 },
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat::TrailingZero { decimals: 3 }
    }
}

/// Decode one coordinate token into machine units.
pub fn decode_number(token: &str, format: NumberFormat) -> Result<f64, DecodeError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(DecodeError::Empty);
    }
    let malformed = || DecodeError::Malformed(token.to_string());

    if token.contains('.') {
        return token.parse::<f64>().map_err(|_| malformed());
    }

    let (sign, digits) = match token.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, token),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    let magnitude = match format {
        NumberFormat::LeadingZero { integer_digits } => {
            let width = integer_digits as usize;
            if digits.len() < width {
                let value: f64 = digits.parse().map_err(|_| malformed())?;
                value * 10f64.powi((width - digits.len()) as i32)
            } else {
                let (integer, fraction) = digits.split_at(width);
                let integer = if integer.is_empty() { "0" } else { integer };
                let fraction = if fraction.is_empty() { "0" } else { fraction };
                format!("{integer}.{fraction}")
                    .parse::<f64>()
                    .map_err(|_| malformed())?
            }
        }
        NumberFormat::TrailingZero { decimals } => {
            let value: f64 = digits.parse().map_err(|_| malformed())?;
            value / 10f64.powi(decimals as i32)
        }
    };

    Ok(sign * magnitude)
}

/// Positioned block instruction: sequence number plus canonical position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub number: u32,
    pub position: Point,
}

struct BlockFields<'a> {
    number: &'a str,
    x: &'a str,
    y: &'a str,
}

/// Split `N<digits>G1X<-?digits>Y<-?digits>` at the start of `text`.
fn split_block(text: &str) -> Option<BlockFields<'_>> {
    let rest = text.strip_prefix('N')?;
    let (number, rest) = take_digits(rest, false)?;
    let rest = rest.strip_prefix("G1X")?;
    let (x, rest) = take_digits(rest, true)?;
    let rest = rest.strip_prefix('Y')?;
    let (y, _) = take_digits(rest, true)?;
    Some(BlockFields { number, x, y })
}

fn take_digits(text: &str, signed: bool) -> Option<(&str, &str)> {
    let sign = usize::from(signed && text.starts_with('-'));
    let digits = text[sign..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    Some(text.split_at(sign + digits))
}

/// Sequence number of a block instruction, or `None` when `text` is not one.
pub fn parse_block_number(text: &str) -> Option<Result<u32, DecodeError>> {
    let fields = split_block(text)?;
    Some(
        fields
            .number
            .parse()
            .map_err(|_| DecodeError::BlockNumber(text.to_string())),
    )
}

/// Decode a block instruction such as `N1G1X10Y300`.
///
/// The machine's axes are turned a quarter into the canonical quadrant, so
/// the returned position is `(-y, x)` of the decoded tokens.
pub fn decode_block(text: &str, format: NumberFormat) -> Result<Block, DecodeError> {
    let fields = split_block(text).ok_or_else(|| DecodeError::NotABlock(text.to_string()))?;
    let number = fields
        .number
        .parse()
        .map_err(|_| DecodeError::BlockNumber(text.to_string()))?;
    let raw = Point::new(
        decode_number(fields.x, format)?,
        decode_number(fields.y, format)?,
    );
    Ok(Block {
        number,
        position: raw.rotate_quarter(),
    })
}
