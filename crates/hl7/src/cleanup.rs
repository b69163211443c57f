//! Input normalisation.
//!
//! Messages arrive from HTML text areas and uploaded files, so line endings are whatever the
//! client produced. Some files still carry MLLP framing bytes from the interface engine they were
//! captured from.

use crate::SEGMENT_SEPARATOR;

/// MLLP start-of-block.
const MLLP_START: char = '\u{0b}';
/// MLLP end-of-block.
const MLLP_END: char = '\u{1c}';

/// Normalise raw text into a `\r`-separated HL7 message.
///
/// - strips MLLP framing characters and a leading byte-order mark
/// - treats `\r\n`, `\n` and `\r` all as segment boundaries
/// - trims surrounding whitespace from each segment and drops blank lines
///
/// The result has no trailing separator. Empty input yields an empty string.
pub fn cleanup(input: &str) -> String {
    let stripped: String = input
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| *c != MLLP_START && *c != MLLP_END)
        .collect();

    let normalised = stripped.replace("\r\n", "\n").replace('\r', "\n");

    normalised
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(&SEGMENT_SEPARATOR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_mixed_line_endings() {
        let input = "MSH|^~\\&|A\r\nPID|1\nPV1|1\rOBX|1";
        assert_eq!(cleanup(input), "MSH|^~\\&|A\rPID|1\rPV1|1\rOBX|1");
    }

    #[test]
    fn strips_mllp_framing_and_blank_lines() {
        let input = "\u{0b}MSH|^~\\&|A\r\r\nPID|1\r\u{1c}\r";
        assert_eq!(cleanup(input), "MSH|^~\\&|A\rPID|1");
    }

    #[test]
    fn trims_indentation_from_pasted_text() {
        let input = "   MSH|^~\\&|A  \n   PID|1   \n";
        assert_eq!(cleanup(input), "MSH|^~\\&|A\rPID|1");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(cleanup(""), "");
        assert_eq!(cleanup(" \r\n \n"), "");
    }

    #[test]
    fn strips_byte_order_mark() {
        assert_eq!(cleanup("\u{feff}MSH|^~\\&|A"), "MSH|^~\\&|A");
    }
}
