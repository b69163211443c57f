//! Delimiters and escape sequences.

use crate::{Hl7Error, Hl7Result};

/// The five separator characters declared in MSH-1 and MSH-2.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delimiters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
        }
    }
}

impl Delimiters {
    /// Read the delimiters from an MSH segment line.
    ///
    /// MSH-2 may carry a fifth truncation character (v2.7+), which is accepted and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Hl7Error::InvalidEncodingCharacters`] if the field separator or encoding
    /// characters are missing, alphanumeric, whitespace, or repeated.
    pub fn from_msh(line: &str) -> Hl7Result<Self> {
        let mut chars = line.chars().skip(3);
        let field = chars.next().ok_or_else(|| {
            Hl7Error::InvalidEncodingCharacters("MSH is missing its field separator".into())
        })?;

        let encoding: Vec<char> = chars.take_while(|c| *c != field).collect();
        if encoding.len() != 4 && encoding.len() != 5 {
            return Err(Hl7Error::InvalidEncodingCharacters(format!(
                "expected 4 encoding characters, found {}",
                encoding.len()
            )));
        }

        let mut all = vec![field];
        all.extend_from_slice(&encoding);
        if let Some(bad) = all
            .iter()
            .find(|c| c.is_alphanumeric() || c.is_whitespace())
        {
            return Err(Hl7Error::InvalidEncodingCharacters(format!(
                "'{bad}' cannot be used as a delimiter"
            )));
        }
        for (i, c) in all.iter().enumerate() {
            if all[i + 1..].contains(c) {
                return Err(Hl7Error::InvalidEncodingCharacters(format!(
                    "delimiter '{c}' is declared more than once"
                )));
            }
        }

        Ok(Self {
            field,
            component: encoding[0],
            repetition: encoding[1],
            escape: encoding[2],
            subcomponent: encoding[3],
        })
    }

    /// Replace HL7 escape sequences in a leaf value.
    ///
    /// Formatting sequences (`\H\`, `\N\`) are dropped. Unknown sequences and an unterminated
    /// trailing escape are kept verbatim.
    pub fn unescape(&self, value: &str) -> String {
        if !value.contains(self.escape) {
            return value.to_string();
        }

        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find(self.escape) {
            out.push_str(&rest[..start]);
            let after = &rest[start + self.escape.len_utf8()..];
            let Some(end) = after.find(self.escape) else {
                out.push_str(&rest[start..]);
                return out;
            };
            let sequence = &after[..end];
            match sequence {
                "F" => out.push(self.field),
                "S" => out.push(self.component),
                "T" => out.push(self.subcomponent),
                "R" => out.push(self.repetition),
                "E" => out.push(self.escape),
                ".br" => out.push('\n'),
                "H" | "N" => {}
                hex if hex.starts_with('X') && hex.len() > 1 => match decode_hex(&hex[1..]) {
                    Some(decoded) => out.push_str(&decoded),
                    None => {
                        out.push(self.escape);
                        out.push_str(sequence);
                        out.push(self.escape);
                    }
                },
                _ => {
                    out.push(self.escape);
                    out.push_str(sequence);
                    out.push(self.escape);
                }
            }
            rest = &after[end + self.escape.len_utf8()..];
        }
        out.push_str(rest);
        out
    }
}

fn decode_hex(hex: &str) -> Option<String> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_standard_delimiters() {
        let d = Delimiters::from_msh("MSH|^~\\&|LAB").expect("valid msh");
        assert_eq!(d, Delimiters::default());
    }

    #[test]
    fn reads_custom_delimiters_and_truncation_character() {
        let d = Delimiters::from_msh("MSH#$*!%@#LAB").expect("valid msh");
        assert_eq!(d.field, '#');
        assert_eq!(d.component, '$');
        assert_eq!(d.repetition, '*');
        assert_eq!(d.escape, '!');
        assert_eq!(d.subcomponent, '%');
    }

    #[test]
    fn rejects_short_or_repeated_encoding_characters() {
        assert!(matches!(
            Delimiters::from_msh("MSH|^~|LAB"),
            Err(Hl7Error::InvalidEncodingCharacters(_))
        ));
        assert!(matches!(
            Delimiters::from_msh("MSH|^^\\&|LAB"),
            Err(Hl7Error::InvalidEncodingCharacters(_))
        ));
        assert!(matches!(
            Delimiters::from_msh("MSH"),
            Err(Hl7Error::InvalidEncodingCharacters(_))
        ));
        assert!(matches!(
            Delimiters::from_msh("MSHA^~\\&ALAB"),
            Err(Hl7Error::InvalidEncodingCharacters(_))
        ));
    }

    #[test]
    fn unescapes_delimiter_sequences() {
        let d = Delimiters::default();
        assert_eq!(d.unescape("A\\F\\B\\S\\C\\T\\D\\R\\E\\E\\"), "A|B^C&D~E\\");
        assert_eq!(d.unescape("line1\\.br\\line2"), "line1\nline2");
        assert_eq!(d.unescape("\\H\\bold\\N\\"), "bold");
        assert_eq!(d.unescape("\\X4869\\"), "Hi");
    }

    #[test]
    fn keeps_unknown_and_unterminated_sequences() {
        let d = Delimiters::default();
        assert_eq!(d.unescape("a\\Z\\b"), "a\\Z\\b");
        assert_eq!(d.unescape("trailing\\"), "trailing\\");
        assert_eq!(d.unescape("\\XZZ\\"), "\\XZZ\\");
    }
}
