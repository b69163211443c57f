//! Read helpers for C-CDA documents.
//!
//! CDA elements all live in the `urn:hl7-org:v3` namespace; these helpers take local names and
//! add the namespace so call sites read like the CDA paths they follow.

use roxmltree::{Document, Node};

use crate::codesystems;
use crate::resources::{Address, CodeableConcept, Coding, ContactPoint, HumanName, Identifier, Period};

pub(crate) const V3_NS: &str = "urn:hl7-org:v3";
pub(crate) const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// First child element with the given CDA local name.
pub(crate) fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name((V3_NS, name)))
}

/// All child elements with the given CDA local name.
pub(crate) fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| n.has_tag_name((V3_NS, name)))
}

/// Follow a chain of child names.
pub(crate) fn path<'a, 'input>(node: Node<'a, 'input>, names: &[&str]) -> Option<Node<'a, 'input>> {
    names.iter().try_fold(node, |current, name| child(current, name))
}

/// First element child regardless of name (the clinical statement inside `entry`).
pub(crate) fn first_element<'a, 'input>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.is_element())
}

/// Whitespace-normalised text content of an element and its descendants.
pub(crate) fn text(node: Node<'_, '_>) -> Option<String> {
    let joined = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<Vec<_>>()
        .join(" ");
    let normalised = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    (!normalised.is_empty()).then_some(normalised)
}

pub(crate) fn attr(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// `xsi:type` of a value element, without any namespace prefix.
pub(crate) fn xsi_type(node: Node<'_, '_>) -> Option<String> {
    let value = node.attribute((XSI_NS, "type"))?;
    Some(value.rsplit(':').next().unwrap_or(value).to_string())
}

pub(crate) fn is_negated(node: Node<'_, '_>) -> bool {
    node.attribute("negationInd") == Some("true")
}

/// `statusCode/@code` of a clinical statement.
pub(crate) fn status_code(node: Node<'_, '_>) -> Option<String> {
    child(node, "statusCode").and_then(|s| attr(s, "code"))
}

/// Resolve `originalText`, following a `<reference value="#id"/>` into the section narrative.
fn original_text(doc: &Document<'_>, node: Node<'_, '_>) -> Option<String> {
    let original = child(node, "originalText")?;
    if let Some(reference) = child(original, "reference").and_then(|r| attr(r, "value")) {
        let id = reference.trim_start_matches('#');
        if let Some(target) = doc.descendants().find(|n| n.attribute("ID") == Some(id)) {
            return text(target);
        }
    }
    original
        .children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

fn coding(node: Node<'_, '_>) -> Option<Coding> {
    let code = attr(node, "code")?;
    Some(Coding {
        system: attr(node, "codeSystem").map(|oid| codesystems::system_uri(&oid)),
        code: Some(code),
        display: attr(node, "displayName"),
    })
}

/// Build a CodeableConcept from a CD/CE element, including translations.
///
/// Returns `None` when the element has neither a code nor any text.
pub(crate) fn codeable_concept(doc: &Document<'_>, node: Node<'_, '_>) -> Option<CodeableConcept> {
    let mut codings: Vec<Coding> = coding(node).into_iter().collect();
    codings.extend(children(node, "translation").filter_map(coding));

    let text = original_text(doc, node)
        .or_else(|| codings.iter().find_map(|c| c.display.clone()));

    if codings.is_empty() && text.is_none() {
        return None;
    }
    Some(CodeableConcept {
        coding: codings,
        text,
    })
}

/// `id` elements as FHIR identifiers.
pub(crate) fn identifiers(node: Node<'_, '_>) -> Vec<Identifier> {
    children(node, "id")
        .filter_map(|id| {
            let root = attr(id, "root")?;
            Some(match attr(id, "extension") {
                Some(extension) => Identifier {
                    system: Some(codesystems::identifier_system(&root)),
                    value: Some(extension),
                },
                None => Identifier {
                    system: Some("urn:ietf:rfc:3986".to_string()),
                    value: Some(codesystems::identifier_system(&root)),
                },
            })
        })
        .collect()
}

pub(crate) fn human_name(node: Node<'_, '_>) -> Option<HumanName> {
    let parts = |name: &'static str| -> Vec<String> {
        children(node, name).filter_map(text).collect()
    };
    let given = parts("given");
    let family = children(node, "family").find_map(text);
    let name = HumanName {
        use_type: attr(node, "use").and_then(|u| codesystems::name_use(&u)),
        family,
        given,
        prefix: parts("prefix"),
        suffix: parts("suffix"),
        text: None,
    };

    if name.family.is_none() && name.given.is_empty() {
        // Unstructured name such as <name>Good Health Clinic</name>.
        return text(node).map(|t| HumanName {
            text: Some(t),
            ..HumanName::default()
        });
    }
    Some(name)
}

pub(crate) fn addresses(node: Node<'_, '_>) -> Vec<Address> {
    children(node, "addr")
        .filter(|addr| addr.attribute("nullFlavor").is_none())
        .map(|addr| Address {
            use_type: attr(addr, "use").and_then(|u| codesystems::address_use(&u)),
            line: children(addr, "streetAddressLine").filter_map(text).collect(),
            city: child(addr, "city").and_then(text),
            state: child(addr, "state").and_then(text),
            postal_code: child(addr, "postalCode").and_then(text),
            country: child(addr, "country").and_then(text),
        })
        .filter(|a| !a.line.is_empty() || a.city.is_some() || a.postal_code.is_some())
        .collect()
}

pub(crate) fn telecoms(node: Node<'_, '_>) -> Vec<ContactPoint> {
    children(node, "telecom")
        .filter_map(|telecom| {
            let value = attr(telecom, "value")?;
            let (system, value) = match value.split_once(':') {
                Some(("tel", rest)) => ("phone", rest.to_string()),
                Some(("fax", rest)) => ("fax", rest.to_string()),
                Some(("mailto", rest)) => ("email", rest.to_string()),
                Some(("http" | "https", _)) => ("url", value.clone()),
                _ => ("other", value.clone()),
            };
            Some(ContactPoint {
                system: system.to_string(),
                value: value.trim().to_string(),
                use_type: attr(telecom, "use").and_then(|u| codesystems::telecom_use(&u)),
            })
        })
        .collect()
}

/// `effectiveTime` as a single FHIR dateTime: `@value`, else `low/@value`.
pub(crate) fn effective_datetime(node: Node<'_, '_>) -> Option<String> {
    let effective = child(node, "effectiveTime")?;
    attr(effective, "value")
        .or_else(|| child(effective, "low").and_then(|low| attr(low, "value")))
        .and_then(|v| fhir_datetime(&v))
}

/// `effectiveTime` low/high as a FHIR Period.
pub(crate) fn effective_period(node: Node<'_, '_>) -> Option<Period> {
    let effective = children(node, "effectiveTime")
        .find(|e| xsi_type(*e).map_or(true, |t| t == "IVL_TS"))?;
    let bound = |name: &str| {
        child(effective, name)
            .and_then(|b| attr(b, "value"))
            .and_then(|v| fhir_datetime(&v))
    };
    let period = Period {
        start: bound("low").or_else(|| attr(effective, "value").and_then(|v| fhir_datetime(&v))),
        end: bound("high"),
    };
    (!period.is_empty()).then_some(period)
}

pub(crate) fn fhir_datetime(value: &str) -> Option<String> {
    hl7::Hl7Timestamp::parse(value).map(|ts| ts.to_fhir_datetime())
}

pub(crate) fn fhir_date(value: &str) -> Option<String> {
    hl7::Hl7Timestamp::parse(value).map(|ts| ts.date_part())
}
