//! Segment and field parsing.
//!
//! Field positions are 1-based, as in the HL7 standard. For MSH, field 1 is the field separator
//! itself and field 2 is the encoding characters, so `MSH-9` lines up with the standard's
//! numbering.

use crate::encoding::Delimiters;

/// A single field, split into repetitions, components and subcomponents.
///
/// Leaf values are stored unescaped. The message's component and subcomponent separators are
/// kept so [`Field::text`] re-joins with them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    raw: String,
    repetitions: Vec<Vec<Vec<String>>>,
    component_separator: char,
    subcomponent_separator: char,
}

impl Field {
    fn parse(raw: &str, delimiters: &Delimiters) -> Self {
        let repetitions = raw
            .split(delimiters.repetition)
            .map(|rep| {
                rep.split(delimiters.component)
                    .map(|comp| {
                        comp.split(delimiters.subcomponent)
                            .map(|sub| delimiters.unescape(sub))
                            .collect()
                    })
                    .collect()
            })
            .collect();

        Self {
            raw: raw.to_string(),
            repetitions,
            component_separator: delimiters.component,
            subcomponent_separator: delimiters.subcomponent,
        }
    }

    /// A field whose content is taken literally (MSH-1, MSH-2).
    fn literal(raw: &str, delimiters: &Delimiters) -> Self {
        Self {
            raw: raw.to_string(),
            repetitions: vec![vec![vec![raw.to_string()]]],
            component_separator: delimiters.component,
            subcomponent_separator: delimiters.subcomponent,
        }
    }

    /// The field exactly as it appeared on the wire.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Number of repetitions (an empty field still counts as one).
    pub fn repetition_count(&self) -> usize {
        self.repetitions.len()
    }

    /// First subcomponent of a component, 1-based, in the given 0-based repetition.
    pub fn component(&self, repetition: usize, component: usize) -> Option<&str> {
        self.subcomponent(repetition, component, 1)
    }

    /// A leaf value by 0-based repetition and 1-based component/subcomponent.
    pub fn subcomponent(
        &self,
        repetition: usize,
        component: usize,
        subcomponent: usize,
    ) -> Option<&str> {
        if component == 0 || subcomponent == 0 {
            return None;
        }
        self.repetitions
            .get(repetition)?
            .get(component - 1)?
            .get(subcomponent - 1)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// The unescaped text of the first repetition, re-joined with the message's own component
    /// and subcomponent separators.
    pub fn text(&self) -> Option<String> {
        let first = self.repetitions.first()?;
        let component = self.component_separator.to_string();
        let subcomponent = self.subcomponent_separator.to_string();
        let joined = first
            .iter()
            .map(|comp| comp.join(&subcomponent))
            .collect::<Vec<_>>()
            .join(&component);
        let trimmed =
            joined.trim_end_matches([self.component_separator, self.subcomponent_separator]);
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// A parsed segment line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    id: String,
    fields: Vec<Field>,
}

impl Segment {
    /// Parse a single segment line using the message's delimiters.
    pub fn parse(line: &str, delimiters: &Delimiters) -> Self {
        let mut parts = line.split(delimiters.field);
        let id = parts.next().unwrap_or_default().to_string();

        let fields = if id == "MSH" {
            let mut fields = vec![Field::literal(&delimiters.field.to_string(), delimiters)];
            let mut rest = parts;
            if let Some(encoding) = rest.next() {
                fields.push(Field::literal(encoding, delimiters));
            }
            fields.extend(rest.map(|raw| Field::parse(raw, delimiters)));
            fields
        } else {
            parts.map(|raw| Field::parse(raw, delimiters)).collect()
        };

        Self { id, fields }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field by 1-based position.
    pub fn field(&self, position: usize) -> Option<&Field> {
        position.checked_sub(1).and_then(|i| self.fields.get(i))
    }

    /// First component of the first repetition of a field, if non-empty.
    pub fn value(&self, position: usize) -> Option<String> {
        self.component(position, 1)
    }

    /// A component of the first repetition of a field, if non-empty.
    pub fn component(&self, position: usize, component: usize) -> Option<String> {
        self.field(position)?
            .component(0, component)
            .map(str::to_string)
    }
}
