use crate::decode::{Block, DecodeError, NumberFormat, decode_block, parse_block_number};

/// Execute instruction written after every block.
pub const EXECUTE: &str = "M300";

/// One source line, classified by what the conversion does with it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction {
    /// `M1NN` with `NN` in `01..=50`.
    ToolChange(u8),
    /// `N<n>G1X<x>Y<y>`, decoded.
    Block(Block),
    /// Exactly `M300`.
    Execute,
    /// `M9NN`: following blocks belong to output segment `NN`.
    SegmentSwitch(usize),
    /// Anything else; passed through untouched.
    Other,
}

impl Instruction {
    /// Classify a trimmed line. Only block lines can fail, when their
    /// coordinates do not decode.
    pub fn classify(line: &str, format: NumberFormat) -> Result<Self, DecodeError> {
        if let Some(tool) = two_digit_suffix(line, "M1").filter(|tool| (1..=50).contains(tool)) {
            return Ok(Instruction::ToolChange(tool as u8));
        }
        if parse_block_number(line).is_some() {
            return decode_block(line, format).map(Instruction::Block);
        }
        if line == EXECUTE {
            return Ok(Instruction::Execute);
        }
        if let Some(segment) = two_digit_suffix(line, "M9") {
            return Ok(Instruction::SegmentSwitch(segment as usize));
        }
        Ok(Instruction::Other)
    }
}

fn two_digit_suffix(line: &str, prefix: &str) -> Option<u32> {
    let digits = line.strip_prefix(prefix)?.get(..2)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub fn tool_change_line(tool: u8) -> String {
    format!("M1{tool:02}")
}

pub fn segment_switch_line(segment: usize) -> String {
    format!("M9{segment:02}")
}
