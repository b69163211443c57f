//! OID to FHIR URI mapping and CDA vocabulary translation.

/// Code systems with a canonical FHIR URI. Anything else becomes `urn:oid:<oid>`.
const CODE_SYSTEMS: &[(&str, &str)] = &[
    ("2.16.840.1.113883.6.1", "http://loinc.org"),
    ("2.16.840.1.113883.6.96", "http://snomed.info/sct"),
    ("2.16.840.1.113883.6.88", "http://www.nlm.nih.gov/research/umls/rxnorm"),
    ("2.16.840.1.113883.12.292", "http://hl7.org/fhir/sid/cvx"),
    ("2.16.840.1.113883.6.103", "http://hl7.org/fhir/sid/icd-9-cm"),
    ("2.16.840.1.113883.6.90", "http://hl7.org/fhir/sid/icd-10-cm"),
    ("2.16.840.1.113883.6.12", "http://www.ama-assn.org/go/cpt"),
    ("2.16.840.1.113883.6.8", "http://unitsofmeasure.org"),
    ("2.16.840.1.113883.3.26.1.1", "http://ncimeta.nci.nih.gov"),
    ("2.16.840.1.113883.5.1", "http://terminology.hl7.org/CodeSystem/v3-AdministrativeGender"),
    ("2.16.840.1.113883.5.2", "http://terminology.hl7.org/CodeSystem/v3-MaritalStatus"),
    ("2.16.840.1.113883.5.83", "http://terminology.hl7.org/CodeSystem/v3-ObservationInterpretation"),
    ("2.16.840.1.113883.5.112", "http://terminology.hl7.org/CodeSystem/v3-RouteOfAdministration"),
    ("2.16.840.1.113883.5.4", "http://terminology.hl7.org/CodeSystem/v3-ActCode"),
];

/// Identifier assigners with a canonical FHIR system.
const IDENTIFIER_SYSTEMS: &[(&str, &str)] = &[
    ("2.16.840.1.113883.4.1", "http://hl7.org/fhir/sid/us-ssn"),
    ("2.16.840.1.113883.4.6", "http://hl7.org/fhir/sid/us-npi"),
];

pub const LOINC: &str = "http://loinc.org";
pub const UCUM: &str = "http://unitsofmeasure.org";
pub const OBSERVATION_CATEGORY: &str =
    "http://terminology.hl7.org/CodeSystem/observation-category";
pub const CONDITION_CATEGORY: &str = "http://terminology.hl7.org/CodeSystem/condition-category";
pub const CONDITION_CLINICAL: &str = "http://terminology.hl7.org/CodeSystem/condition-clinical";
pub const CONDITION_VERIFICATION: &str =
    "http://terminology.hl7.org/CodeSystem/condition-ver-status";
pub const ALLERGY_CLINICAL: &str =
    "http://terminology.hl7.org/CodeSystem/allergyintolerance-clinical";
pub const ALLERGY_VERIFICATION: &str =
    "http://terminology.hl7.org/CodeSystem/allergyintolerance-verification";
pub const DIAGNOSTIC_SERVICE: &str = "http://terminology.hl7.org/CodeSystem/v2-0074";
pub const DATA_ABSENT_REASON: &str = "http://terminology.hl7.org/CodeSystem/data-absent-reason";
pub const LIST_EMPTY_REASON: &str = "http://terminology.hl7.org/CodeSystem/list-empty-reason";
pub const US_CORE_RACE: &str = "http://hl7.org/fhir/us/core/StructureDefinition/us-core-race";
pub const US_CORE_ETHNICITY: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-ethnicity";

/// FHIR `system` for a CDA `codeSystem` OID.
pub fn system_uri(oid: &str) -> String {
    CODE_SYSTEMS
        .iter()
        .find(|(known, _)| *known == oid)
        .map(|(_, uri)| uri.to_string())
        .unwrap_or_else(|| format!("urn:oid:{oid}"))
}

/// FHIR identifier `system` for an `id/@root`.
pub fn identifier_system(root: &str) -> String {
    if let Some((_, uri)) = IDENTIFIER_SYSTEMS.iter().find(|(known, _)| *known == root) {
        return uri.to_string();
    }
    if uuid::Uuid::parse_str(root).is_ok() {
        return format!("urn:uuid:{}", root.to_ascii_lowercase());
    }
    format!("urn:oid:{root}")
}

/// `administrativeGenderCode/@code` to FHIR `gender`.
pub fn gender(code: &str) -> &'static str {
    match code {
        "M" => "male",
        "F" => "female",
        "UN" => "other",
        _ => "unknown",
    }
}

pub fn name_use(code: &str) -> Option<String> {
    let mapped = match code {
        "L" | "C" => "official",
        "P" => "nickname",
        "A" => "anonymous",
        "ASGN" => "usual",
        _ => return None,
    };
    Some(mapped.to_string())
}

pub fn address_use(code: &str) -> Option<String> {
    let mapped = match code {
        "H" | "HP" | "HV" => "home",
        "WP" | "DIR" | "PUB" => "work",
        "TMP" => "temp",
        "OLD" | "BAD" => "old",
        _ => return None,
    };
    Some(mapped.to_string())
}

pub fn telecom_use(code: &str) -> Option<String> {
    let mapped = match code {
        "H" | "HP" | "HV" => "home",
        "WP" | "DIR" | "PUB" => "work",
        "MC" | "PG" => "mobile",
        "TMP" => "temp",
        _ => return None,
    };
    Some(mapped.to_string())
}
