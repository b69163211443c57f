//! Structured projection of parsed messages.
//!
//! [`ParsedMessage`] is what the lab checker hands back to callers. It keeps every segment in
//! raw form and additionally lifts the parts a reviewer usually looks for (header, patient,
//! visit, orders and their results) into named fields.

use serde::Serialize;

use crate::datetime;
use crate::encoding::Delimiters;
use crate::segment::{Field, Segment};
use crate::{Hl7Error, Hl7Result, SEGMENT_SEPARATOR};

/// A coded element (`CE`/`CWE`): code, display text and coding system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CodedValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl CodedValue {
    fn from_field(field: Option<&Field>) -> Option<Self> {
        let field = field?;
        let value = Self {
            code: field.component(0, 1).map(str::to_string),
            text: field.component(0, 2).map(str::to_string),
            system: field.component(0, 3).map(str::to_string),
        };
        (value.code.is_some() || value.text.is_some()).then_some(value)
    }
}

/// A person name taken from an `XPN` or `XCN` field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PersonName {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle: Option<String>,
}

impl PersonName {
    /// `XPN`: family^given^middle.
    fn from_xpn(field: Option<&Field>) -> Option<Self> {
        Self::at_offset(field, None, 1)
    }

    /// `XCN`: id^family^given^middle.
    fn from_xcn(field: Option<&Field>) -> Option<Self> {
        let field = field?;
        Self::at_offset(Some(field), field.component(0, 1), 2)
    }

    fn at_offset(field: Option<&Field>, id: Option<&str>, family_at: usize) -> Option<Self> {
        let field = field?;
        let name = Self {
            id: id.map(str::to_string),
            family: field.component(0, family_at).map(str::to_string),
            given: field.component(0, family_at + 1).map(str::to_string),
            middle: field.component(0, family_at + 2).map(str::to_string),
        };
        (name.id.is_some() || name.family.is_some() || name.given.is_some()).then_some(name)
    }
}

/// A patient identifier from PID-3.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Identifier {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigning_authority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_code: Option<String>,
}

/// Patient demographics from PID.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PatientSummary {
    pub identifiers: Vec<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<PersonName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Visit details from PV1.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VisitSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attending_doctor: Option<PersonName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admit_datetime: Option<String>,
}

/// A single result from OBX.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Observation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<CodedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abnormal_flags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation_datetime: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// An order from OBR with the results that follow it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Order {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placer_order_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filler_order_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub universal_service: Option<CodedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation_datetime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering_provider: Option<PersonName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_status: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    pub observations: Vec<Observation>,
}

/// A segment as it appeared on the wire.
///
/// `fields[0]` is field 1 of the segment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RawSegment {
    pub id: String,
    pub fields: Vec<String>,
}

/// One parsed message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ParsedMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sending_application: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sending_facility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiving_application: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiving_facility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_datetime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit: Option<VisitSummary>,
    pub orders: Vec<Order>,
    /// Results that appear before any OBR.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<Observation>,
    /// Notes that appear before any OBR or OBX.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    pub segments: Vec<RawSegment>,
}

/// Parse cleaned text into one [`ParsedMessage`] per MSH.
///
/// Callers are expected to run [`crate::cleanup`] and [`crate::validate`] first; this function
/// only fails when the input does not even have the shape of an HL7 batch.
///
/// # Errors
///
/// - [`Hl7Error::NoMessages`] if the input has no segments
/// - [`Hl7Error::MissingHeader`] if segments appear before the first MSH
/// - [`Hl7Error::InvalidEncodingCharacters`] if an MSH declares unusable delimiters
pub fn parse_message(text: &str) -> Hl7Result<Vec<ParsedMessage>> {
    let mut messages = Vec::new();
    let mut builder: Option<MessageBuilder> = None;

    for line in text.split(SEGMENT_SEPARATOR).filter(|l| !l.is_empty()) {
        if line.starts_with("MSH") {
            if let Some(done) = builder.take() {
                messages.push(done.finish());
            }
            builder = Some(MessageBuilder::new(line)?);
            continue;
        }

        match builder.as_mut() {
            Some(current) => current.push(line),
            None => {
                let found: String = line.chars().take(3).collect();
                return Err(Hl7Error::MissingHeader(found));
            }
        }
    }

    if let Some(done) = builder {
        messages.push(done.finish());
    }
    if messages.is_empty() {
        return Err(Hl7Error::NoMessages);
    }

    tracing::debug!("parsed {} hl7 message(s)", messages.len());
    Ok(messages)
}

/// Accumulates segments for one message.
struct MessageBuilder {
    delimiters: Delimiters,
    message: ParsedMessage,
}

impl MessageBuilder {
    fn new(msh_line: &str) -> Hl7Result<Self> {
        let delimiters = Delimiters::from_msh(msh_line)?;
        let msh = Segment::parse(msh_line, &delimiters);

        let message = ParsedMessage {
            message_type: msh.field(9).and_then(Field::text),
            message_code: msh.component(9, 1),
            trigger_event: msh.component(9, 2),
            control_id: msh.value(10),
            processing_id: msh.value(11),
            version: msh.value(12),
            sending_application: msh.value(3),
            sending_facility: msh.value(4),
            receiving_application: msh.value(5),
            receiving_facility: msh.value(6),
            message_datetime: msh.value(7).map(|v| datetime::to_iso8601(&v)),
            segments: vec![raw(&msh)],
            ..ParsedMessage::default()
        };

        Ok(Self {
            delimiters,
            message,
        })
    }

    fn push(&mut self, line: &str) {
        let segment = Segment::parse(line, &self.delimiters);
        match segment.id() {
            "PID" => self.message.patient = Some(patient(&segment)),
            "PV1" => self.message.visit = Some(visit(&segment)),
            "OBR" => self.message.orders.push(order(&segment)),
            "OBX" => {
                let obx = observation(&segment);
                match self.message.orders.last_mut() {
                    Some(order) => order.observations.push(obx),
                    None => self.message.observations.push(obx),
                }
            }
            "NTE" => self.attach_note(&segment),
            _ => {}
        }
        self.message.segments.push(raw(&segment));
    }

    /// NTE belongs to the closest preceding OBX, else OBR, else the message.
    fn attach_note(&mut self, segment: &Segment) {
        let Some(comment) = note_text(segment) else {
            return;
        };
        let message = &mut self.message;
        if let Some(order) = message.orders.last_mut() {
            match order.observations.last_mut() {
                Some(obx) => obx.notes.push(comment),
                None => order.notes.push(comment),
            }
        } else if let Some(obx) = message.observations.last_mut() {
            obx.notes.push(comment);
        } else {
            message.notes.push(comment);
        }
    }

    fn finish(self) -> ParsedMessage {
        self.message
    }
}

fn raw(segment: &Segment) -> RawSegment {
    RawSegment {
        id: segment.id().to_string(),
        fields: segment.fields().iter().map(|f| f.raw().to_string()).collect(),
    }
}

fn timestamp(segment: &Segment, position: usize) -> Option<String> {
    segment.value(position).map(|v| datetime::to_iso8601(&v))
}

fn patient(pid: &Segment) -> PatientSummary {
    let identifiers = pid
        .field(3)
        .map(|field| {
            (0..field.repetition_count())
                .filter_map(|rep| {
                    Some(Identifier {
                        value: field.component(rep, 1)?.to_string(),
                        assigning_authority: field.component(rep, 4).map(str::to_string),
                        type_code: field.component(rep, 5).map(str::to_string),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let address = pid.field(11).and_then(|field| {
        let parts: Vec<&str> = [1, 2, 3, 4, 5]
            .iter()
            .filter_map(|c| field.component(0, *c))
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    });

    PatientSummary {
        identifiers,
        name: PersonName::from_xpn(pid.field(5)),
        birth_date: timestamp(pid, 7),
        sex: pid.value(8),
        address,
        phone: pid.value(13),
    }
}

fn visit(pv1: &Segment) -> VisitSummary {
    VisitSummary {
        patient_class: pv1.value(2),
        assigned_location: pv1.field(3).and_then(Field::text),
        attending_doctor: PersonName::from_xcn(pv1.field(7)),
        visit_number: pv1.value(19),
        admit_datetime: timestamp(pv1, 44),
    }
}

fn order(obr: &Segment) -> Order {
    Order {
        set_id: obr.value(1),
        placer_order_number: obr.value(2),
        filler_order_number: obr.value(3),
        universal_service: CodedValue::from_field(obr.field(4)),
        observation_datetime: timestamp(obr, 7),
        ordering_provider: PersonName::from_xcn(obr.field(16)),
        result_status: obr.value(25),
        ..Order::default()
    }
}

fn observation(obx: &Segment) -> Observation {
    Observation {
        set_id: obx.value(1),
        value_type: obx.value(2),
        identifier: CodedValue::from_field(obx.field(3)),
        sub_id: obx.value(4),
        value: obx.field(5).and_then(Field::text),
        units: obx.value(6),
        reference_range: obx.value(7),
        abnormal_flags: obx.field(8).and_then(Field::text),
        result_status: obx.value(11),
        observation_datetime: timestamp(obx, 14),
        notes: Vec::new(),
    }
}

fn note_text(nte: &Segment) -> Option<String> {
    let field = nte.field(3)?;
    let text = field.text()?;
    Some(text)
}
