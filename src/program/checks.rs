use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::peel::{MirrorAxis, Orientation};

/// Comment line appended once a program has been reordered.
pub const OPTIMIZED_MARKER: &str = "(Drilling Path Optimized)";

const DIVISION_MARKER: &str = "(BEST DIVISION:SP1_DIV)";
const SCAN_AREA_MARKER: &str = "(Area:X=30.000,Y=30.000)";
const MIRROR_ON: &str = "(X MIRROR:ON)";
const MIRROR_OFF: &str = "(X MIRROR:OFF)";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("program is empty")]
    EmptyProgram,
    #[error("first line is not `%`; not a laser drilling program")]
    NotMachineProgram,
    #[error("program was not converted with the SP1_DIV ring division")]
    MissingDivision,
    #[error("program was not converted with a 30mm x 30mm scan area")]
    WrongScanArea,
    #[error("{side} side program has the wrong X mirror setting")]
    MirrorMismatch { side: Side },
    #[error("program path has already been optimized")]
    AlreadyOptimized,
    #[error("cannot tell the board side from `{0}`; expected `lsrNNMM` in the file name")]
    UnknownSide(String),
    #[error("unsupported board thickness `{0}`; expected 2 or 2.3 mil")]
    InvalidThickness(String),
}

/// Board side a program drills, which fixes the ring orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Top,
    Bottom,
}

impl Side {
    /// Reads the `lsr<AA><BB>` layer pair from the file name: the top side
    /// drills from a lower layer towards a higher one.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PreconditionError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (from, to) = find_layer_pair(&name)
            .ok_or_else(|| PreconditionError::UnknownSide(path.display().to_string()))?;
        Ok(if from < to { Side::Top } else { Side::Bottom })
    }

    pub fn orientation(self) -> Orientation {
        match self {
            Side::Top => Orientation::Clockwise,
            Side::Bottom => Orientation::CounterClockwise(MirrorAxis::X),
        }
    }

    fn ordinal(self) -> &'static str {
        match self {
            Side::Top => "1st",
            Side::Bottom => "2nd",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Top => f.write_str("top"),
            Side::Bottom => f.write_str("bottom"),
        }
    }
}

fn find_layer_pair(name: &str) -> Option<(u8, u8)> {
    name.match_indices("lsr").find_map(|(at, _)| {
        let digits = name.get(at + 3..at + 7)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some((digits[..2].parse().ok()?, digits[2..].parse().ok()?))
    })
}

/// Core thickness written into the program header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoardThickness {
    #[default]
    #[serde(rename = "2")]
    Mil2,
    #[serde(rename = "2.3")]
    Mil2_3,
}

impl fmt::Display for BoardThickness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardThickness::Mil2 => f.write_str("2"),
            BoardThickness::Mil2_3 => f.write_str("2.3"),
        }
    }
}

impl FromStr for BoardThickness {
    type Err = PreconditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace("mil", "");
        match normalized.trim() {
            "" | "2" | "2.0" => Ok(BoardThickness::Mil2),
            "2.3" => Ok(BoardThickness::Mil2_3),
            _ => Err(PreconditionError::InvalidThickness(s.to_string())),
        }
    }
}

/// Structural checks run before any line is converted.
pub fn check_preconditions<S: AsRef<str>>(lines: &[S], side: Side) -> Result<(), PreconditionError> {
    let first = lines.first().ok_or(PreconditionError::EmptyProgram)?;
    if first.as_ref() != "%" {
        return Err(PreconditionError::NotMachineProgram);
    }

    let has = |marker: &str| lines.iter().any(|line| line.as_ref() == marker);

    if !has(DIVISION_MARKER) {
        return Err(PreconditionError::MissingDivision);
    }
    if !has(SCAN_AREA_MARKER) {
        return Err(PreconditionError::WrongScanArea);
    }
    let wrong_mirror = match side {
        Side::Top => MIRROR_ON,
        Side::Bottom => MIRROR_OFF,
    };
    if has(wrong_mirror) {
        return Err(PreconditionError::MirrorMismatch { side });
    }
    if has(OPTIMIZED_MARKER) {
        return Err(PreconditionError::AlreadyOptimized);
    }
    Ok(())
}

/// Header parameter line naming the side and core thickness.
pub fn header_line(side: Side, thickness: BoardThickness) -> String {
    format!("M100({}-ldd8um-{thickness}mil-core-2'4mil)", side.ordinal())
}

/// Insert the header parameter after the first line and the optimized
/// marker before the last one.
pub fn prepare(lines: &mut Vec<String>, side: Side, thickness: BoardThickness) {
    let header_at = lines.len().min(1);
    lines.insert(header_at, header_line(side, thickness));
    let marker_at = lines.len().saturating_sub(1);
    lines.insert(marker_at, OPTIMIZED_MARKER.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(extra: &[&str]) -> Vec<String> {
        let mut lines = vec!["%", DIVISION_MARKER, SCAN_AREA_MARKER];
        lines.extend_from_slice(extra);
        lines.push("M30");
        lines.into_iter().map(String::from).collect()
    }

    #[test]
    fn side_comes_from_layer_pair() {
        assert_eq!(Side::from_path("jobs/A123lsr0102.prg").unwrap(), Side::Top);
        assert_eq!(Side::from_path("A123lsr0201.prg").unwrap(), Side::Bottom);
        assert_eq!(Side::from_path("lsr0303").unwrap(), Side::Bottom);
        assert!(matches!(
            Side::from_path("A123.prg"),
            Err(PreconditionError::UnknownSide(_))
        ));
        assert!(Side::from_path("lsr01x2.prg").is_err());
    }

    #[test]
    fn side_picks_orientation() {
        assert_eq!(Side::Top.orientation(), Orientation::Clockwise);
        assert_eq!(
            Side::Bottom.orientation(),
            Orientation::CounterClockwise(MirrorAxis::X)
        );
    }

    #[test]
    fn accepts_well_formed_program() {
        assert_eq!(check_preconditions(&program(&["(X MIRROR:OFF)"]), Side::Top), Ok(()));
        assert_eq!(check_preconditions(&program(&["(X MIRROR:ON)"]), Side::Bottom), Ok(()));
    }

    #[test]
    fn rejects_structural_problems() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(check_preconditions(&empty, Side::Top), Err(PreconditionError::EmptyProgram));

        let mut lines = program(&[]);
        lines[0] = "O1000".to_string();
        assert_eq!(
            check_preconditions(&lines, Side::Top),
            Err(PreconditionError::NotMachineProgram)
        );

        let lines: Vec<&str> = vec!["%", SCAN_AREA_MARKER];
        assert_eq!(
            check_preconditions(&lines, Side::Top),
            Err(PreconditionError::MissingDivision)
        );

        let lines: Vec<&str> = vec!["%", DIVISION_MARKER];
        assert_eq!(
            check_preconditions(&lines, Side::Top),
            Err(PreconditionError::WrongScanArea)
        );
    }

    #[test]
    fn rejects_mirror_mismatch_per_side() {
        assert_eq!(
            check_preconditions(&program(&["(X MIRROR:ON)"]), Side::Top),
            Err(PreconditionError::MirrorMismatch { side: Side::Top })
        );
        assert_eq!(
            check_preconditions(&program(&["(X MIRROR:OFF)"]), Side::Bottom),
            Err(PreconditionError::MirrorMismatch { side: Side::Bottom })
        );
    }

    #[test]
    fn rejects_already_optimized_program() {
        assert_eq!(
            check_preconditions(&program(&[OPTIMIZED_MARKER]), Side::Top),
            Err(PreconditionError::AlreadyOptimized)
        );
    }

    #[test]
    fn thickness_accepts_loose_spellings() {
        for text in ["", "2", "2.0", "2mil", " 2 MIL "] {
            assert_eq!(text.parse::<BoardThickness>().unwrap(), BoardThickness::Mil2, "{text}");
        }
        assert_eq!("2.3mil".parse::<BoardThickness>().unwrap(), BoardThickness::Mil2_3);
        assert!(matches!(
            "3".parse::<BoardThickness>(),
            Err(PreconditionError::InvalidThickness(_))
        ));
    }

    #[test]
    fn prepare_inserts_header_and_marker() {
        let mut lines = program(&[]);
        prepare(&mut lines, Side::Bottom, BoardThickness::Mil2_3);
        assert_eq!(lines[0], "%");
        assert_eq!(lines[1], "M100(2nd-ldd8um-2.3mil-core-2'4mil)");
        assert_eq!(lines[lines.len() - 2], OPTIMIZED_MARKER);
        assert_eq!(lines[lines.len() - 1], "M30");
        assert_eq!(header_line(Side::Top, BoardThickness::Mil2), "M100(1st-ldd8um-2mil-core-2'4mil)");
    }
}
