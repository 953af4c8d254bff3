//! Form fill reconciler.
//!
//! Takes raw template bytes plus a derived field set, intersects the derived
//! names with the field schema the template actually declares, writes the
//! intersection into the document and produces a [`FillReport`]. Derived
//! fields the template does not know are reported, never fatal; a template
//! that cannot be loaded or serialized fails the whole request.

use crate::errors::AppError;
use crate::mapping::DerivedFields;
use crate::models::FillReport;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;

/// Result of one fill operation: the serialized document and its report.
#[derive(Debug)]
pub struct FillOutcome {
    /// Filled PDF, ready to write out.
    pub document: Vec<u8>,
    /// Completion report for the caller.
    pub report: FillReport,
}

/// Fills `derived` into the template and reports what matched.
///
/// When the template's AcroForm schema cannot be introspected the reconciler
/// runs in degraded mode: every derived field name is assumed present, values
/// are applied best-effort through a page-annotation scan, and the report
/// shows zero unmatched fields. Whether silently assuming full coverage is
/// the right product behavior is an open question (see DESIGN.md); until that
/// is settled the fallback stays, logged loudly.
pub fn fill(template: &[u8], derived: &DerivedFields) -> Result<FillOutcome, AppError> {
    let mut doc = Document::load_mem(template)
        .map_err(|e| AppError::FillOperation(format!("Failed to load template PDF: {}", e)))?;

    let (targets, degraded) = match form_field_targets(&doc) {
        Ok(targets) => {
            tracing::debug!("Template declares {} fillable fields", targets.len());
            (targets, false)
        }
        Err(e) => {
            tracing::warn!(
                "Template schema introspection failed ({}); assuming all {} derived fields are present",
                e,
                derived.len()
            );
            (annotation_targets(&doc), true)
        }
    };

    let mut matched: Vec<String> = Vec::new();
    let mut unmatched: Vec<String> = Vec::new();
    for name in derived.keys() {
        if degraded || targets.contains_key(name) {
            matched.push(name.clone());
        } else {
            unmatched.push(name.clone());
        }
    }

    let mut wrote_any = false;
    for name in &matched {
        let Some(id) = targets.get(name) else {
            // Degraded mode only: field assumed present but no widget found.
            continue;
        };
        let value = &derived[name];
        if degraded {
            if apply_value(&mut doc, *id, value).is_ok() {
                wrote_any = true;
            }
        } else {
            apply_value(&mut doc, *id, value).map_err(|e| {
                AppError::FillOperation(format!("Failed to set field '{}': {}", name, e))
            })?;
            wrote_any = true;
        }
    }
    if wrote_any {
        set_need_appearances(&mut doc)?;
    }

    let mut document = Vec::new();
    doc.save_to(&mut document).map_err(|e| {
        AppError::FillOperation(format!("Failed to serialize filled document: {}", e))
    })?;

    let report = FillReport::new(matched.len(), derived.len(), unmatched);
    tracing::info!(
        "Filled {}/{} fields ({:.1}%), {} unmatched{}",
        report.fields_filled,
        report.fields_total,
        report.completion_pct,
        report.fields_unmatched.len(),
        if degraded { " [degraded mode]" } else { "" }
    );

    Ok(FillOutcome { document, report })
}

/// Reads the template's declared field schema without filling anything.
///
/// Used by the `inspect_template` tool; the schema is the set of
/// fully-qualified field names the document's AcroForm declares.
pub fn field_schema(template: &[u8]) -> Result<Vec<String>, AppError> {
    let doc = Document::load_mem(template)
        .map_err(|e| AppError::FillOperation(format!("Failed to load template PDF: {}", e)))?;
    let targets = form_field_targets(&doc)
        .map_err(|e| AppError::FillOperation(format!("No field schema: {}", e)))?;
    Ok(targets.into_keys().collect())
}

/// Follows one level of indirection, which is all well-formed AcroForms use.
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object, lopdf::Error> {
    match object {
        Object::Reference(id) => doc.get_object(*id),
        other => Ok(other),
    }
}

/// The field's partial name (`/T`), when it has one.
fn partial_name(dict: &Dictionary) -> Option<String> {
    match dict.get(b"T") {
        Ok(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Walks `Root -> AcroForm -> Fields`, collecting fully-qualified field names
/// (dotted per the PDF spec) mapped to the object holding each field's value.
fn form_field_targets(doc: &Document) -> Result<BTreeMap<String, ObjectId>, lopdf::Error> {
    let catalog = doc.catalog()?;
    let acro_form = resolve(doc, catalog.get(b"AcroForm")?)?.as_dict()?;
    let fields = resolve(doc, acro_form.get(b"Fields")?)?.as_array()?;

    let mut targets = BTreeMap::new();
    for entry in fields {
        collect_field(doc, entry, None, &mut targets)?;
    }
    Ok(targets)
}

fn collect_field(
    doc: &Document,
    entry: &Object,
    prefix: Option<&str>,
    targets: &mut BTreeMap<String, ObjectId>,
) -> Result<(), lopdf::Error> {
    let Object::Reference(id) = entry else {
        // Inline field dictionaries are not addressable for value updates.
        return Ok(());
    };
    let dict = doc.get_object(*id)?.as_dict()?;

    let qualified = match partial_name(dict) {
        Some(name) => match prefix {
            Some(parent) => format!("{}.{}", parent, name),
            None => name,
        },
        // Nameless kids are widget annotations of their parent, not fields.
        None => return Ok(()),
    };

    if let Ok(kids_entry) = dict.get(b"Kids") {
        if let Ok(kids) = resolve(doc, kids_entry)?.as_array() {
            for kid in kids {
                collect_field(doc, kid, Some(&qualified), targets)?;
            }
        }
    }

    targets.insert(qualified, *id);
    Ok(())
}

/// Best-effort fallback used in degraded mode: scan page annotations for
/// named widgets. Never fails; an empty map simply means nothing can be
/// written.
fn annotation_targets(doc: &Document) -> BTreeMap<String, ObjectId> {
    let mut targets = BTreeMap::new();
    for (_, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_object(page_id).and_then(Object::as_dict) else {
            continue;
        };
        let Ok(annots_entry) = page.get(b"Annots") else {
            continue;
        };
        let Ok(annots) = resolve(doc, annots_entry).and_then(|o| o.as_array()) else {
            continue;
        };
        for annot in annots {
            let Object::Reference(id) = annot else {
                continue;
            };
            let Ok(dict) = doc.get_object(*id).and_then(Object::as_dict) else {
                continue;
            };
            if let Some(name) = partial_name(dict) {
                targets.insert(name, *id);
            }
        }
    }
    targets
}

/// Writes one field value and drops any stale appearance stream so viewers
/// re-render the new content.
fn apply_value(doc: &mut Document, id: ObjectId, value: &str) -> Result<(), lopdf::Error> {
    let dict = doc.get_object_mut(id)?.as_dict_mut()?;
    dict.set("V", Object::string_literal(value));
    dict.remove(b"AP");
    Ok(())
}

/// Asks viewers to regenerate field appearances after a programmatic fill.
fn set_need_appearances(doc: &mut Document) -> Result<(), lopdf::Error> {
    let acro_ref = {
        let catalog = doc.catalog()?;
        match catalog.get(b"AcroForm") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };
    if let Some(id) = acro_ref {
        let acro_form = doc.get_object_mut(id)?.as_dict_mut()?;
        acro_form.set("NeedAppearances", Object::Boolean(true));
    }
    Ok(())
}
