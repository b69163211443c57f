//! Section entry mapping.
//!
//! Sections are recognised by their LOINC `code`. Each `entry` holds one clinical statement;
//! concern acts (allergies, problems) wrap the real observations in `entryRelationship`s and
//! result organizers wrap them in `component`s.

use roxmltree::Node;

use crate::cda::{
    self, attr, child, children, codeable_concept, effective_datetime, effective_period,
    first_element, identifiers, is_negated, path, status_code, text, xsi_type,
};
use crate::codesystems;
use crate::renderer::RenderContext;
use crate::resources::{
    AllergyIntolerance, AllergyReaction, CodeableConcept, Coding, Condition, DiagnosticReport,
    DoseAndRate, Dosage, Immunization, MedicationStatement, Observation, Period, Procedure,
    Quantity, Range, Reference, Resource, Timing, TimingRepeat,
};

pub(crate) const ALLERGIES: &str = "48765-2";
pub(crate) const PROBLEMS: &str = "11450-4";
pub(crate) const MEDICATIONS: &str = "10160-0";
pub(crate) const RESULTS: &str = "30954-2";
pub(crate) const VITAL_SIGNS: &str = "8716-3";
pub(crate) const IMMUNIZATIONS: &str = "11369-6";
pub(crate) const PROCEDURES: &str = "47519-4";

/// Render every entry of a section and return references to the created resources.
///
/// Unrecognised sections produce no entries; their narrative is still carried by the
/// Composition.
pub(crate) fn render_entries(ctx: &mut RenderContext<'_, '_>, section: Node<'_, '_>) -> Vec<Reference> {
    let Some(code) = child(section, "code").and_then(|c| attr(c, "code")) else {
        return Vec::new();
    };

    let statements: Vec<Node<'_, '_>> = children(section, "entry")
        .filter_map(first_element)
        .collect();

    let mut refs = Vec::new();
    for statement in statements {
        match code.as_str() {
            ALLERGIES => refs.extend(allergies(ctx, statement)),
            PROBLEMS => refs.extend(problems(ctx, statement)),
            MEDICATIONS => refs.extend(medication(ctx, statement)),
            RESULTS => refs.extend(results(ctx, statement, "laboratory", "Laboratory")),
            VITAL_SIGNS => refs.extend(results(ctx, statement, "vital-signs", "Vital Signs")),
            IMMUNIZATIONS => refs.extend(immunization(ctx, statement)),
            PROCEDURES => refs.extend(procedure(ctx, statement)),
            _ => {}
        }
    }

    if !refs.is_empty() {
        tracing::debug!("section {code}: {} entries", refs.len());
    }
    refs
}

fn is_named(node: Node<'_, '_>, name: &str) -> bool {
    node.has_tag_name((cda::V3_NS, name))
}

/// The observations a statement carries, plus the concern act's status when wrapped.
fn concern_observations<'a, 'input>(
    statement: Node<'a, 'input>,
) -> (Option<String>, Vec<Node<'a, 'input>>) {
    if is_named(statement, "observation") {
        return (None, vec![statement]);
    }
    if is_named(statement, "act") {
        let observations = children(statement, "entryRelationship")
            .filter_map(|rel| child(rel, "observation"))
            .collect();
        return (status_code(statement), observations);
    }
    (None, Vec::new())
}

fn concept(system: &str, code: &str, display: &str) -> CodeableConcept {
    CodeableConcept::from_coding(Coding::new(system, code, display))
}

fn unknown_concept() -> CodeableConcept {
    CodeableConcept {
        coding: vec![Coding::new(codesystems::DATA_ABSENT_REASON, "unknown", "Unknown")],
        text: None,
    }
}

// ============================================================================
// Allergies
// ============================================================================

fn allergies(ctx: &mut RenderContext<'_, '_>, statement: Node<'_, '_>) -> Vec<Reference> {
    let doc = ctx.doc;
    let (concern_status, observations) = concern_observations(statement);

    observations
        .into_iter()
        .map(|obs| {
            let entity = path(obs, &["participant", "participantRole", "playingEntity"]);
            let substance = entity.and_then(|e| {
                child(e, "code")
                    .and_then(|c| codeable_concept(doc, c))
                    .or_else(|| {
                        child(e, "name").and_then(text).map(|name| CodeableConcept {
                            coding: Vec::new(),
                            text: Some(name),
                        })
                    })
            });

            let allergy_type = child(obs, "value").and_then(|v| attr(v, "code"));
            let category = allergy_type
                .as_deref()
                .and_then(allergy_category)
                .into_iter()
                .collect();

            let (status_code, status_display) = match concern_status.as_deref() {
                Some("completed") | Some("aborted") | Some("suspended") => ("inactive", "Inactive"),
                _ => ("active", "Active"),
            };
            let (verification, verification_display) = if is_negated(obs) {
                ("refuted", "Refuted")
            } else {
                ("confirmed", "Confirmed")
            };

            let reaction = children(obs, "entryRelationship")
                .filter(|rel| rel.attribute("typeCode") == Some("MFST"))
                .filter_map(|rel| child(rel, "observation"))
                .filter_map(|reaction| {
                    let manifestation = child(reaction, "value").and_then(|v| codeable_concept(doc, v))?;
                    Some(AllergyReaction {
                        manifestation: vec![manifestation],
                        severity: reaction_severity(reaction),
                    })
                })
                .collect();

            let resource = AllergyIntolerance {
                id: String::new(),
                identifier: identifiers(obs),
                clinical_status: Some(concept(codesystems::ALLERGY_CLINICAL, status_code, status_display)),
                verification_status: concept(
                    codesystems::ALLERGY_VERIFICATION,
                    verification,
                    verification_display,
                ),
                category,
                code: substance,
                patient: ctx.patient.clone(),
                onset_date_time: effective_datetime(obs),
                reaction,
            };
            ctx.add(|id| Resource::AllergyIntolerance(AllergyIntolerance { id, ..resource }))
        })
        .collect()
}

fn allergy_category(code: &str) -> Option<&'static str> {
    match code {
        "414285001" | "235719002" | "418471000" => Some("food"),
        "416098002" | "419511003" | "59037007" => Some("medication"),
        "426232007" | "232347008" => Some("environment"),
        _ => None,
    }
}

/// Severity from a nested SEV observation on a reaction.
fn reaction_severity(reaction: Node<'_, '_>) -> Option<&'static str> {
    children(reaction, "entryRelationship")
        .filter_map(|rel| child(rel, "observation"))
        .find(|obs| child(*obs, "code").and_then(|c| attr(c, "code")).as_deref() == Some("SEV"))
        .and_then(|obs| child(obs, "value"))
        .and_then(|v| attr(v, "code"))
        .and_then(|code| match code.as_str() {
            "255604002" => Some("mild"),
            "6736007" => Some("moderate"),
            "24484000" => Some("severe"),
            _ => None,
        })
}

// ============================================================================
// Problems
// ============================================================================

fn problems(ctx: &mut RenderContext<'_, '_>, statement: Node<'_, '_>) -> Vec<Reference> {
    let doc = ctx.doc;
    let (concern_status, observations) = concern_observations(statement);

    observations
        .into_iter()
        .map(|obs| {
            let code = child(obs, "value")
                .and_then(|v| codeable_concept(doc, v))
                .or_else(|| child(obs, "code").and_then(|c| codeable_concept(doc, c)));

            let abatement = child(obs, "effectiveTime")
                .and_then(|t| child(t, "high"))
                .and_then(|h| attr(h, "value"))
                .and_then(|v| cda::fhir_datetime(&v));

            let (clinical, clinical_display) = if abatement.is_some() {
                ("resolved", "Resolved")
            } else {
                match concern_status.as_deref() {
                    Some("completed") | Some("aborted") => ("resolved", "Resolved"),
                    Some("suspended") => ("inactive", "Inactive"),
                    _ => ("active", "Active"),
                }
            };
            let (verification, verification_display) = if is_negated(obs) {
                ("refuted", "Refuted")
            } else {
                ("confirmed", "Confirmed")
            };

            let resource = Condition {
                id: String::new(),
                identifier: identifiers(obs),
                clinical_status: concept(codesystems::CONDITION_CLINICAL, clinical, clinical_display),
                verification_status: concept(
                    codesystems::CONDITION_VERIFICATION,
                    verification,
                    verification_display,
                ),
                category: vec![concept(
                    codesystems::CONDITION_CATEGORY,
                    "problem-list-item",
                    "Problem List Item",
                )],
                code,
                subject: ctx.patient.clone(),
                onset_date_time: effective_datetime(obs),
                abatement_date_time: abatement,
            };
            ctx.add(|id| Resource::Condition(Condition { id, ..resource }))
        })
        .collect()
}

// ============================================================================
// Medications and immunizations
// ============================================================================

fn manufactured_material<'a, 'input>(statement: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    path(statement, &["consumable", "manufacturedProduct", "manufacturedMaterial"])
}

fn material_concept(ctx: &RenderContext<'_, '_>, statement: Node<'_, '_>) -> Option<CodeableConcept> {
    let material = manufactured_material(statement)?;
    child(material, "code")
        .and_then(|c| codeable_concept(ctx.doc, c))
        .or_else(|| {
            child(material, "name").and_then(text).map(|name| CodeableConcept {
                coding: Vec::new(),
                text: Some(name),
            })
        })
}

fn medication(ctx: &mut RenderContext<'_, '_>, statement: Node<'_, '_>) -> Option<Reference> {
    if !is_named(statement, "substanceAdministration") {
        return None;
    }
    let doc = ctx.doc;

    let status = if is_negated(statement) {
        "not-taken"
    } else {
        match status_code(statement).as_deref() {
            Some("completed") => "completed",
            Some("aborted") | Some("cancelled") => "stopped",
            Some("suspended") | Some("held") => "on-hold",
            Some("active") if statement.attribute("moodCode") == Some("INT") => "intended",
            Some("active") => "active",
            _ => "unknown",
        }
    };

    let timing = children(statement, "effectiveTime")
        .find(|t| xsi_type(*t).as_deref() == Some("PIVL_TS"))
        .and_then(|t| child(t, "period"))
        .map(|period| Timing {
            repeat: TimingRepeat {
                period: attr(period, "value").and_then(|v| v.parse().ok()),
                period_unit: attr(period, "unit"),
            },
        });

    let dosage = Dosage {
        text: None,
        timing,
        route: child(statement, "routeCode").and_then(|r| codeable_concept(doc, r)),
        dose_and_rate: child(statement, "doseQuantity")
            .and_then(quantity)
            .map(|dose_quantity| DoseAndRate { dose_quantity })
            .into_iter()
            .collect(),
    };
    let has_dosage =
        dosage.timing.is_some() || dosage.route.is_some() || !dosage.dose_and_rate.is_empty();

    let resource = MedicationStatement {
        id: String::new(),
        identifier: identifiers(statement),
        status,
        medication_codeable_concept: material_concept(ctx, statement).unwrap_or_else(unknown_concept),
        subject: ctx.patient.clone(),
        effective_period: effective_period(statement),
        dosage: if has_dosage { vec![dosage] } else { Vec::new() },
    };
    Some(ctx.add(|id| Resource::MedicationStatement(MedicationStatement { id, ..resource })))
}

fn immunization(ctx: &mut RenderContext<'_, '_>, statement: Node<'_, '_>) -> Option<Reference> {
    if !is_named(statement, "substanceAdministration") {
        return None;
    }

    let occurrence = effective_datetime(statement);
    let resource = Immunization {
        id: String::new(),
        identifier: identifiers(statement),
        status: if is_negated(statement) { "not-done" } else { "completed" },
        vaccine_code: material_concept(ctx, statement).unwrap_or_else(unknown_concept),
        patient: ctx.patient.clone(),
        occurrence_string: occurrence.is_none().then(|| "unknown".to_string()),
        occurrence_date_time: occurrence,
        lot_number: manufactured_material(statement)
            .and_then(|m| child(m, "lotNumberText"))
            .and_then(text),
    };
    Some(ctx.add(|id| Resource::Immunization(Immunization { id, ..resource })))
}

// ============================================================================
// Results and vital signs
// ============================================================================

fn results(
    ctx: &mut RenderContext<'_, '_>,
    statement: Node<'_, '_>,
    category: &'static str,
    category_display: &'static str,
) -> Vec<Reference> {
    let category_concept = concept(codesystems::OBSERVATION_CATEGORY, category, category_display);

    if is_named(statement, "observation") {
        return vec![observation(ctx, statement, &category_concept)];
    }
    if !is_named(statement, "organizer") {
        return Vec::new();
    }

    let members: Vec<Reference> = children(statement, "component")
        .filter_map(|c| child(c, "observation"))
        .map(|obs| observation(ctx, obs, &category_concept))
        .collect();

    if category != "laboratory" || members.is_empty() {
        return members;
    }

    let doc = ctx.doc;
    let report = DiagnosticReport {
        id: String::new(),
        identifier: identifiers(statement),
        status: observation_status(statement),
        category: vec![concept(codesystems::DIAGNOSTIC_SERVICE, "LAB", "Laboratory")],
        code: child(statement, "code")
            .and_then(|c| codeable_concept(doc, c))
            .unwrap_or_else(unknown_concept),
        subject: ctx.patient.clone(),
        effective_date_time: effective_datetime(statement),
        result: members.clone(),
    };
    let mut refs = members;
    refs.push(ctx.add(|id| Resource::DiagnosticReport(DiagnosticReport { id, ..report })));
    refs
}

fn observation_status(node: Node<'_, '_>) -> &'static str {
    match status_code(node).as_deref() {
        Some("active") => "preliminary",
        Some("aborted") | Some("cancelled") => "cancelled",
        Some("nullified") => "entered-in-error",
        _ => "final",
    }
}

fn observation(
    ctx: &mut RenderContext<'_, '_>,
    obs: Node<'_, '_>,
    category: &CodeableConcept,
) -> Reference {
    let doc = ctx.doc;
    let mut resource = Observation {
        id: String::new(),
        identifier: identifiers(obs),
        status: observation_status(obs),
        category: vec![category.clone()],
        code: child(obs, "code")
            .and_then(|c| codeable_concept(doc, c))
            .unwrap_or_else(unknown_concept),
        subject: ctx.patient.clone(),
        effective_date_time: effective_datetime(obs),
        value_quantity: None,
        value_codeable_concept: None,
        value_string: None,
        value_integer: None,
        value_boolean: None,
        interpretation: children(obs, "interpretationCode")
            .filter_map(|c| codeable_concept(doc, c))
            .collect(),
        reference_range: children(obs, "referenceRange")
            .filter_map(|r| child(r, "observationRange"))
            .filter_map(reference_range)
            .collect(),
    };

    if let Some(value) = child(obs, "value") {
        match xsi_type(value).as_deref() {
            Some("PQ") => resource.value_quantity = quantity(value),
            Some("CD") | Some("CE") | Some("CO") | Some("CV") => {
                resource.value_codeable_concept = codeable_concept(doc, value)
            }
            Some("INT") => resource.value_integer = attr(value, "value").and_then(|v| v.parse().ok()),
            Some("BL") => resource.value_boolean = attr(value, "value").and_then(|v| v.parse().ok()),
            Some("IVL_PQ") => resource.value_string = interval_text(value),
            _ => resource.value_string = text(value).or_else(|| attr(value, "value")),
        }
    }

    ctx.add(|id| Resource::Observation(Observation { id, ..resource }))
}

/// A PQ element as a UCUM quantity.
fn quantity(node: Node<'_, '_>) -> Option<Quantity> {
    let value = attr(node, "value").and_then(|v| v.parse::<serde_json::Number>().ok())?;
    let unit = attr(node, "unit").filter(|u| u != "1");
    Some(Quantity {
        value: Some(value),
        system: unit.as_ref().map(|_| codesystems::UCUM.to_string()),
        code: unit.clone(),
        unit,
    })
}

fn interval_text(node: Node<'_, '_>) -> Option<String> {
    let bound = |name: &str| child(node, name).and_then(|b| attr(b, "value"));
    let unit = child(node, "low")
        .or_else(|| child(node, "high"))
        .and_then(|b| attr(b, "unit"))
        .map(|u| format!(" {u}"))
        .unwrap_or_default();
    match (bound("low"), bound("high")) {
        (Some(low), Some(high)) => Some(format!("{low}-{high}{unit}")),
        (Some(low), None) => Some(format!(">={low}{unit}")),
        (None, Some(high)) => Some(format!("<={high}{unit}")),
        (None, None) => None,
    }
}

fn reference_range(range: Node<'_, '_>) -> Option<Range> {
    if let Some(value) = child(range, "value") {
        let low = child(value, "low").and_then(quantity);
        let high = child(value, "high").and_then(quantity);
        if low.is_some() || high.is_some() {
            return Some(Range {
                low,
                high,
                text: None,
            });
        }
    }
    child(range, "text").and_then(text).map(|t| Range {
        text: Some(t),
        ..Range::default()
    })
}

// ============================================================================
// Procedures
// ============================================================================

fn procedure(ctx: &mut RenderContext<'_, '_>, statement: Node<'_, '_>) -> Option<Reference> {
    let doc = ctx.doc;
    let code = child(statement, "code").and_then(|c| codeable_concept(doc, c))?;

    let status = match status_code(statement).as_deref() {
        Some("completed") => "completed",
        Some("active") => "in-progress",
        Some("aborted") => "stopped",
        Some("cancelled") => "not-done",
        _ => "unknown",
    };

    let effective = child(statement, "effectiveTime");
    let single = effective
        .and_then(|t| attr(t, "value"))
        .and_then(|v| cda::fhir_datetime(&v));
    let period = match single {
        Some(_) => None,
        None => effective_period(statement).filter(|p: &Period| !p.is_empty()),
    };

    let resource = Procedure {
        id: String::new(),
        identifier: identifiers(statement),
        status,
        code,
        subject: ctx.patient.clone(),
        performed_date_time: single,
        performed_period: period,
    };
    Some(ctx.add(|id| Resource::Procedure(Procedure { id, ..resource })))
}

#[cfg(test)]
mod tests {
    use crate::{CcdaRenderer, DocumentType};
    use serde_json::Value;

    const CCD: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<ClinicalDocument xmlns="urn:hl7-org:v3" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <id root="2.16.840.1.113883.19.5.99999.1" extension="TT988"/>
  <code code="34133-9" codeSystem="2.16.840.1.113883.6.1" displayName="Summarization of Episode Note"/>
  <title>Community Health and Hospitals: Health Summary</title>
  <effectiveTime value="20120912000000-0400"/>
  <recordTarget>
    <patientRole>
      <id root="2.16.840.1.113883.19.5.99999.2" extension="998991"/>
      <patient>
        <name use="L"><given>Eve</given><family>Everywoman</family></name>
        <administrativeGenderCode code="F" codeSystem="2.16.840.1.113883.5.1"/>
        <birthTime value="19750501"/>
      </patient>
    </patientRole>
  </recordTarget>
  <author>
    <time value="20120912"/>
    <assignedAuthor>
      <id root="2.16.840.1.113883.4.6" extension="99999999"/>
      <assignedPerson><name><given>Henry</given><family>Seven</family></name></assignedPerson>
    </assignedAuthor>
  </author>
  <component>
    <structuredBody>
      <component>
        <section>
          <code code="48765-2" codeSystem="2.16.840.1.113883.6.1"/>
          <title>Allergies</title>
          <text>Penicillin: hives</text>
          <entry>
            <act classCode="ACT" moodCode="EVN">
              <statusCode code="active"/>
              <entryRelationship typeCode="SUBJ">
                <observation classCode="OBS" moodCode="EVN">
                  <id root="4adc1020-7b14-11db-9fe1-0800200c9a66"/>
                  <effectiveTime><low value="20070501"/></effectiveTime>
                  <value xsi:type="CD" code="416098002" codeSystem="2.16.840.1.113883.6.96"/>
                  <participant typeCode="CSM">
                    <participantRole><playingEntity>
                      <code code="7980" codeSystem="2.16.840.1.113883.6.88" displayName="Penicillin G benzathine"/>
                    </playingEntity></participantRole>
                  </participant>
                  <entryRelationship typeCode="MFST">
                    <observation classCode="OBS" moodCode="EVN">
                      <value xsi:type="CD" code="247472004" codeSystem="2.16.840.1.113883.6.96" displayName="Hives"/>
                      <entryRelationship typeCode="SUBJ">
                        <observation classCode="OBS" moodCode="EVN">
                          <code code="SEV" codeSystem="2.16.840.1.113883.5.4"/>
                          <value xsi:type="CD" code="6736007" codeSystem="2.16.840.1.113883.6.96"/>
                        </observation>
                      </entryRelationship>
                    </observation>
                  </entryRelationship>
                </observation>
              </entryRelationship>
            </act>
          </entry>
        </section>
      </component>
      <component>
        <section>
          <code code="11450-4" codeSystem="2.16.840.1.113883.6.1"/>
          <title>Problems</title>
          <entry>
            <act classCode="ACT" moodCode="EVN">
              <statusCode code="completed"/>
              <entryRelationship typeCode="SUBJ">
                <observation classCode="OBS" moodCode="EVN">
                  <effectiveTime><low value="20080103"/><high value="20080110"/></effectiveTime>
                  <value xsi:type="CD" code="233604007" codeSystem="2.16.840.1.113883.6.96" displayName="Pneumonia"/>
                </observation>
              </entryRelationship>
            </act>
          </entry>
        </section>
      </component>
      <component>
        <section>
          <code code="10160-0" codeSystem="2.16.840.1.113883.6.1"/>
          <title>Medications</title>
          <entry>
            <substanceAdministration classCode="SBADM" moodCode="EVN">
              <statusCode code="active"/>
              <effectiveTime xsi:type="IVL_TS"><low value="20120806"/></effectiveTime>
              <effectiveTime xsi:type="PIVL_TS" operator="A"><period value="12" unit="h"/></effectiveTime>
              <routeCode code="C38216" codeSystem="2.16.840.1.113883.3.26.1.1" displayName="RESPIRATORY (INHALATION)"/>
              <doseQuantity value="1"/>
              <consumable><manufacturedProduct><manufacturedMaterial>
                <code code="573621" codeSystem="2.16.840.1.113883.6.88" displayName="Albuterol 0.09 MG/ACTUAT"/>
              </manufacturedMaterial></manufacturedProduct></consumable>
            </substanceAdministration>
          </entry>
        </section>
      </component>
      <component>
        <section>
          <code code="30954-2" codeSystem="2.16.840.1.113883.6.1"/>
          <title>Results</title>
          <entry>
            <organizer classCode="BATTERY" moodCode="EVN">
              <code code="57021-8" codeSystem="2.16.840.1.113883.6.1" displayName="CBC W Auto Differential panel"/>
              <statusCode code="completed"/>
              <component>
                <observation classCode="OBS" moodCode="EVN">
                  <code code="718-7" codeSystem="2.16.840.1.113883.6.1" displayName="Hemoglobin"/>
                  <statusCode code="completed"/>
                  <effectiveTime value="200803190830-0800"/>
                  <value xsi:type="PQ" value="13.2" unit="g/dL"/>
                  <interpretationCode code="N" codeSystem="2.16.840.1.113883.5.83"/>
                  <referenceRange><observationRange>
                    <value xsi:type="IVL_PQ"><low value="12.0" unit="g/dL"/><high value="15.5" unit="g/dL"/></value>
                  </observationRange></referenceRange>
                </observation>
              </component>
            </organizer>
          </entry>
        </section>
      </component>
      <component>
        <section>
          <code code="29762-2" codeSystem="2.16.840.1.113883.6.1"/>
          <title>Social History</title>
        </section>
      </component>
    </structuredBody>
  </component>
</ClinicalDocument>"##;

    fn render() -> Value {
        let json = CcdaRenderer::new()
            .render_fhir_string(DocumentType::Ccd, CCD)
            .expect("renders");
        serde_json::from_str(&json).expect("valid json")
    }

    fn resources<'a>(bundle: &'a Value, resource_type: &str) -> Vec<&'a Value> {
        bundle["entry"]
            .as_array()
            .expect("entries")
            .iter()
            .map(|e| &e["resource"])
            .filter(|r| r["resourceType"] == resource_type)
            .collect()
    }

    #[test]
    fn renders_document_bundle_with_composition_first() {
        let bundle = render();
        assert_eq!(bundle["resourceType"], "Bundle");
        assert_eq!(bundle["type"], "document");
        assert_eq!(bundle["timestamp"], "2012-09-12T00:00:00-04:00");

        let composition = &bundle["entry"][0]["resource"];
        assert_eq!(composition["resourceType"], "Composition");
        assert_eq!(composition["title"], "Community Health and Hospitals: Health Summary");
        assert_eq!(composition["type"]["coding"][0]["code"], "34133-9");
        assert_eq!(composition["section"].as_array().map(Vec::len), Some(5));

        let patient = resources(&bundle, "Patient");
        assert_eq!(patient[0]["gender"], "female");
        assert_eq!(patient[0]["birthDate"], "1975-05-01");
        assert_eq!(composition["subject"]["reference"], bundle["entry"][1]["fullUrl"]);

        let author = resources(&bundle, "Practitioner");
        assert_eq!(author[0]["identifier"][0]["system"], "http://hl7.org/fhir/sid/us-npi");
    }

    #[test]
    fn output_is_deterministic() {
        assert_eq!(render(), render());
    }

    #[test]
    fn maps_allergy_with_reaction_severity() {
        let bundle = render();
        let allergy = resources(&bundle, "AllergyIntolerance");
        assert_eq!(allergy.len(), 1);
        assert_eq!(allergy[0]["category"][0], "medication");
        assert_eq!(allergy[0]["clinicalStatus"]["coding"][0]["code"], "active");
        assert_eq!(allergy[0]["code"]["coding"][0]["code"], "7980");
        assert_eq!(allergy[0]["onsetDateTime"], "2007-05-01");
        assert_eq!(allergy[0]["reaction"][0]["severity"], "moderate");
        assert_eq!(allergy[0]["reaction"][0]["manifestation"][0]["text"], "Hives");
    }

    #[test]
    fn maps_resolved_problem() {
        let bundle = render();
        let condition = resources(&bundle, "Condition");
        assert_eq!(condition[0]["clinicalStatus"]["coding"][0]["code"], "resolved");
        assert_eq!(condition[0]["abatementDateTime"], "2008-01-10");
        assert_eq!(condition[0]["code"]["coding"][0]["code"], "233604007");
    }

    #[test]
    fn maps_medication_dosage() {
        let bundle = render();
        let medication = resources(&bundle, "MedicationStatement");
        assert_eq!(medication[0]["status"], "active");
        assert_eq!(medication[0]["effectivePeriod"]["start"], "2012-08-06");
        let dosage = &medication[0]["dosage"][0];
        assert_eq!(dosage["timing"]["repeat"]["period"], 12);
        assert_eq!(dosage["timing"]["repeat"]["periodUnit"], "h");
        assert_eq!(dosage["doseAndRate"][0]["doseQuantity"]["value"], 1);
        assert_eq!(dosage["route"]["coding"][0]["system"], "http://ncimeta.nci.nih.gov");
    }

    #[test]
    fn maps_results_into_observations_and_report() {
        let bundle = render();
        let observation = resources(&bundle, "Observation");
        assert_eq!(observation.len(), 1);
        assert_eq!(observation[0]["status"], "final");
        assert_eq!(observation[0]["valueQuantity"]["unit"], "g/dL");
        assert_eq!(observation[0]["valueQuantity"]["system"], "http://unitsofmeasure.org");
        assert_eq!(observation[0]["referenceRange"][0]["low"]["value"], 12.0);
        assert_eq!(observation[0]["category"][0]["coding"][0]["code"], "laboratory");

        let report = resources(&bundle, "DiagnosticReport");
        assert_eq!(report[0]["code"]["coding"][0]["code"], "57021-8");
        assert_eq!(report[0]["result"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn empty_section_carries_empty_reason() {
        let bundle = render();
        let social = &bundle["entry"][0]["resource"]["section"][4];
        assert_eq!(social["title"], "Social History");
        assert_eq!(social["emptyReason"]["coding"][0]["code"], "unavailable");
    }

    #[test]
    fn rejects_non_cda_documents() {
        let renderer = CcdaRenderer::new();
        let err = renderer
            .render_fhir_string(DocumentType::Ccd, "<note><to>Tove</to></note>")
            .expect_err("not CDA");
        assert_eq!(err.kind(), "InvalidDocument");

        let err = renderer
            .render_fhir_string(DocumentType::Ccd, "<ClinicalDocument")
            .expect_err("malformed");
        assert_eq!(err.kind(), "XmlParseError");

        let err = renderer
            .render_fhir_string(
                DocumentType::Ccd,
                r#"<ClinicalDocument xmlns="urn:hl7-org:v3"><title>x</title></ClinicalDocument>"#,
            )
            .expect_err("no patient");
        assert_eq!(err.kind(), "MissingElement");
    }
}
