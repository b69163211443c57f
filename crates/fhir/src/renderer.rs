//! Document-level rendering: header, participants and the bundle itself.

use roxmltree::{Document, Node};
use uuid::Uuid;

use crate::cda::{self, attr, child, children, path, text, V3_NS};
use crate::codesystems;
use crate::document_type::DocumentType;
use crate::resources::{
    Bundle, BundleEntry, CodeableConcept, Coding, Composition, CompositionSection, Extension,
    Narrative, Organization, Patient, PatientCommunication, Practitioner, Reference, Resource,
};
use crate::sections;
use crate::{FhirError, FhirResult};

/// Renders C-CDA XML into FHIR.
///
/// The renderer holds no state between calls; one instance can be shared freely.
#[derive(Clone, Copy, Debug, Default)]
pub struct CcdaRenderer;

impl CcdaRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render a C-CDA document into a FHIR `Bundle` serialised as compact JSON.
    ///
    /// # Arguments
    ///
    /// * `document_type` - Template to assume when the document header lacks a code or title.
    /// * `xml` - The C-CDA document text.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the text is not well-formed XML (`XmlParse`, with the parser error as its source),
    /// - the root is not a `ClinicalDocument` in the `urn:hl7-org:v3` namespace,
    /// - the header has no `recordTarget/patientRole`,
    /// - serialisation fails.
    pub fn render_fhir_string(&self, document_type: DocumentType, xml: &str) -> FhirResult<String> {
        let bundle = self.render_bundle(document_type, xml)?;
        Ok(serde_json::to_string(&bundle)?)
    }

    /// Render a C-CDA document into a [`Bundle`].
    ///
    /// # Errors
    ///
    /// See [`CcdaRenderer::render_fhir_string`].
    pub fn render_bundle(&self, document_type: DocumentType, xml: &str) -> FhirResult<Bundle> {
        let doc = Document::parse(xml.trim_start_matches('\u{feff}'))?;
        let root = doc.root_element();
        if !root.has_tag_name((V3_NS, "ClinicalDocument")) {
            let namespace = root.tag_name().namespace().unwrap_or("no namespace");
            return Err(FhirError::InvalidDocument(format!(
                "root element is '{}' ({namespace}), expected ClinicalDocument in {V3_NS}",
                root.tag_name().name()
            )));
        }

        let patient_role = path(root, &["recordTarget", "patientRole"])
            .ok_or(FhirError::MissingElement("recordTarget/patientRole"))?;

        let document_id = cda::identifiers(root).into_iter().next();
        let seed = document_id
            .as_ref()
            .and_then(|id| id.value.clone())
            .unwrap_or_else(|| xml.to_string());

        let composition_id = Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes());
        let mut ctx = RenderContext::new(&doc, composition_id);

        let patient = ctx.add(|id| Resource::Patient(patient(&doc, patient_role, id)));
        ctx.patient = patient.clone();

        let mut authors: Vec<Reference> = children(root, "author")
            .filter_map(|author| child(author, "assignedAuthor"))
            .filter_map(|assigned| author_resource(assigned))
            .map(|resource| ctx.add(|id| with_id(resource, id)))
            .collect();

        let custodian = path(
            root,
            &["custodian", "assignedCustodian", "representedCustodianOrganization"],
        )
        .map(|org| {
            let organization = organization(org, String::new());
            ctx.add(|id| Resource::Organization(Organization { id, ..organization }))
        });

        if authors.is_empty() {
            authors.extend(custodian.clone());
        }

        let section_list: Vec<CompositionSection> = path(root, &["component", "structuredBody"])
            .map(|body| {
                children(body, "component")
                    .filter_map(|component| child(component, "section"))
                    .map(|section| composition_section(&mut ctx, section))
                    .collect()
            })
            .unwrap_or_default();

        let date = child(root, "effectiveTime")
            .and_then(|t| attr(t, "value"))
            .and_then(|v| cda::fhir_datetime(&v));

        let composition = Composition {
            id: composition_id.to_string(),
            identifier: document_id.clone(),
            status: "final",
            type_code: child(root, "code")
                .and_then(|c| cda::codeable_concept(&doc, c))
                .unwrap_or_else(|| {
                    CodeableConcept::from_coding(Coding::new(
                        codesystems::LOINC,
                        document_type.loinc_code(),
                        document_type.display(),
                    ))
                }),
            subject: patient,
            date: date.clone(),
            author: authors,
            title: child(root, "title")
                .and_then(text)
                .unwrap_or_else(|| document_type.display().to_string()),
            confidentiality: child(root, "confidentialityCode").and_then(|c| attr(c, "code")),
            custodian,
            section: section_list,
        };

        let mut entry = Vec::with_capacity(ctx.entries.len() + 1);
        entry.push(BundleEntry {
            full_url: format!("urn:uuid:{composition_id}"),
            resource: Resource::Composition(composition),
        });
        entry.append(&mut ctx.entries);

        tracing::debug!(
            "rendered {} document into {} bundle entries",
            document_type,
            entry.len()
        );

        Ok(Bundle {
            id: Uuid::new_v5(&composition_id, b"bundle").to_string(),
            identifier: document_id,
            bundle_type: "document",
            timestamp: date.filter(|d| d.contains('T')),
            entry,
        })
    }
}

/// Shared state while walking one document.
pub(crate) struct RenderContext<'a, 'input> {
    pub(crate) doc: &'a Document<'input>,
    pub(crate) patient: Reference,
    pub(crate) entries: Vec<BundleEntry>,
    namespace: Uuid,
}

impl<'a, 'input> RenderContext<'a, 'input> {
    fn new(doc: &'a Document<'input>, namespace: Uuid) -> Self {
        Self {
            doc,
            patient: Reference::to(""),
            entries: Vec::new(),
            namespace,
        }
    }

    /// Allocate the next deterministic id, build the resource with it and append it.
    pub(crate) fn add(&mut self, build: impl FnOnce(String) -> Resource) -> Reference {
        let id = Uuid::new_v5(&self.namespace, self.entries.len().to_string().as_bytes());
        let full_url = format!("urn:uuid:{id}");
        self.entries.push(BundleEntry {
            full_url: full_url.clone(),
            resource: build(id.to_string()),
        });
        Reference::to(&full_url)
    }
}

fn with_id(resource: Resource, id: String) -> Resource {
    match resource {
        Resource::Practitioner(p) => Resource::Practitioner(Practitioner { id, ..p }),
        Resource::Organization(o) => Resource::Organization(Organization { id, ..o }),
        other => other,
    }
}

fn patient(doc: &Document<'_>, role: Node<'_, '_>, id: String) -> Patient {
    let person = child(role, "patient");
    let coded = |name: &str| {
        person
            .and_then(|p| child(p, name))
            .and_then(|c| cda::codeable_concept(doc, c))
    };

    let mut extension = Vec::new();
    if let Some(race) = person.and_then(|p| child(p, "raceCode")) {
        extension.extend(us_core_category(codesystems::US_CORE_RACE, race));
    }
    if let Some(ethnicity) = person.and_then(|p| child(p, "ethnicGroupCode")) {
        extension.extend(us_core_category(codesystems::US_CORE_ETHNICITY, ethnicity));
    }

    Patient {
        id,
        extension,
        identifier: cda::identifiers(role),
        name: person
            .map(|p| children(p, "name").filter_map(cda::human_name).collect())
            .unwrap_or_default(),
        telecom: cda::telecoms(role),
        gender: person
            .and_then(|p| child(p, "administrativeGenderCode"))
            .and_then(|g| attr(g, "code"))
            .map(|code| codesystems::gender(&code).to_string()),
        birth_date: person
            .and_then(|p| child(p, "birthTime"))
            .and_then(|b| attr(b, "value"))
            .and_then(|v| cda::fhir_date(&v)),
        address: cda::addresses(role),
        marital_status: coded("maritalStatusCode"),
        communication: person
            .map(|p| {
                children(p, "languageCommunication")
                    .filter_map(|lc| child(lc, "languageCode"))
                    .filter_map(|code| attr(code, "code"))
                    .map(|code| PatientCommunication {
                        language: CodeableConcept::from_coding(Coding {
                            system: Some("urn:ietf:bcp:47".to_string()),
                            code: Some(code),
                            display: None,
                        }),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// US Core race/ethnicity extension with an `ombCategory` and `text`.
fn us_core_category(url: &str, code: Node<'_, '_>) -> Option<Extension> {
    let value = attr(code, "code")?;
    let display = attr(code, "displayName");
    let mut nested = vec![Extension {
        url: "ombCategory".to_string(),
        value_coding: Some(Coding {
            system: Some("urn:oid:2.16.840.1.113883.6.238".to_string()),
            code: Some(value.clone()),
            display: display.clone(),
        }),
        ..Extension::default()
    }];
    nested.push(Extension {
        url: "text".to_string(),
        value_string: Some(display.unwrap_or(value)),
        ..Extension::default()
    });
    Some(Extension {
        url: url.to_string(),
        extension: nested,
        ..Extension::default()
    })
}

/// A Practitioner for an assigned person, else an Organization for the represented organisation.
fn author_resource(assigned: Node<'_, '_>) -> Option<Resource> {
    if let Some(person) = child(assigned, "assignedPerson") {
        return Some(Resource::Practitioner(Practitioner {
            id: String::new(),
            identifier: cda::identifiers(assigned),
            name: children(person, "name").filter_map(cda::human_name).collect(),
            telecom: cda::telecoms(assigned),
            address: cda::addresses(assigned),
        }));
    }
    child(assigned, "representedOrganization")
        .map(|org| Resource::Organization(organization(org, String::new())))
}

fn organization(org: Node<'_, '_>, id: String) -> Organization {
    Organization {
        id,
        identifier: cda::identifiers(org),
        name: children(org, "name").find_map(text),
        telecom: cda::telecoms(org),
        address: cda::addresses(org),
    }
}

fn composition_section(ctx: &mut RenderContext<'_, '_>, section: Node<'_, '_>) -> CompositionSection {
    let doc = ctx.doc;
    let entry = sections::render_entries(ctx, section);
    let narrative = child(section, "text").and_then(text).map(|t| Narrative {
        status: "generated",
        div: format!(
            "<div xmlns=\"http://www.w3.org/1999/xhtml\">{}</div>",
            escape_xml(&t)
        ),
    });

    let empty_reason = (entry.is_empty() && narrative.is_none()).then(|| {
        CodeableConcept::from_coding(Coding::new(
            codesystems::LIST_EMPTY_REASON,
            "unavailable",
            "Unavailable",
        ))
    });

    CompositionSection {
        title: child(section, "title").and_then(text),
        code: child(section, "code").and_then(|c| cda::codeable_concept(doc, c)),
        text: narrative,
        entry,
        empty_reason,
    }
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
