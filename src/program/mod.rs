//! Laser drilling program text: instruction classes, side detection, and the
//! structural checks and header edits applied before conversion.

mod checks;
mod instruction;

pub use checks::{
    BoardThickness, OPTIMIZED_MARKER, PreconditionError, Side, check_preconditions, header_line,
    prepare,
};
pub use instruction::{EXECUTE, Instruction, segment_switch_line, tool_change_line};
