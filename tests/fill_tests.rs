/// Tests for the form fill reconciler
/// Uses minimal AcroForm documents built with lopdf to exercise the real
/// schema-introspection and fill paths, including degraded mode
use chrono::NaiveDate;
use kyc_pdf_api::errors::AppError;
use kyc_pdf_api::filler::{self, fill};
use kyc_pdf_api::mapping::{derive_with_date, DerivedFields};
use kyc_pdf_api::models::ClientRecord;
use kyc_pdf_api::registry::Registry;
use lopdf::{dictionary, Document, Object};
use std::collections::BTreeMap;
use std::collections::HashSet;

/// Builds a one-page PDF declaring the given text fields in its AcroForm.
fn build_form_pdf(field_names: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut field_refs: Vec<Object> = Vec::new();
    for name in field_names {
        let field_id = doc.add_object(dictionary! {
            "FT" => "Tx",
            "T" => Object::string_literal(*name),
            "V" => Object::string_literal(""),
        });
        field_refs.push(Object::Reference(field_id));
    }
    let acroform_id = doc.add_object(dictionary! {
        "Fields" => Object::Array(field_refs),
    });

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![Object::Reference(page_id)],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
        "AcroForm" => Object::Reference(acroform_id),
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize test PDF");
    bytes
}

/// Builds a valid PDF with no AcroForm, so schema introspection fails.
fn build_formless_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![Object::Reference(page_id)],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize test PDF");
    bytes
}

/// Reads back the field values of a filled document.
fn field_values(pdf: &[u8]) -> BTreeMap<String, String> {
    let doc = Document::load_mem(pdf).expect("load filled PDF");
    let catalog = doc.catalog().unwrap();
    let acroform = match catalog.get(b"AcroForm").unwrap() {
        Object::Reference(id) => doc.get_object(*id).unwrap().as_dict().unwrap(),
        Object::Dictionary(dict) => dict,
        other => panic!("unexpected AcroForm object: {:?}", other),
    };

    let mut values = BTreeMap::new();
    for entry in acroform.get(b"Fields").unwrap().as_array().unwrap() {
        let Object::Reference(id) = entry else {
            continue;
        };
        let dict = doc.get_object(*id).unwrap().as_dict().unwrap();
        let name = match dict.get(b"T") {
            Ok(Object::String(bytes, _)) => String::from_utf8_lossy(bytes).into_owned(),
            _ => continue,
        };
        let value = match dict.get(b"V") {
            Ok(Object::String(bytes, _)) => String::from_utf8_lossy(bytes).into_owned(),
            _ => String::new(),
        };
        values.insert(name, value);
    }
    values
}

fn derived(pairs: &[(&str, &str)]) -> DerivedFields {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn fills_the_intersection_and_reports_the_rest() {
    let template = build_form_pdf(&["nombre", "cedula", "telefono"]);
    let fields = derived(&[
        ("nombre", "Maria Lopez"),
        ("cedula", "8-123-4567"),
        ("fax", "no existe"),
        ("telex", ""),
    ]);

    let outcome = fill(&template, &fields).unwrap();

    assert_eq!(outcome.report.fields_filled, 2);
    assert_eq!(outcome.report.fields_total, 4);
    assert_eq!(outcome.report.fields_unmatched, vec!["fax", "telex"]);
    assert!((outcome.report.completion_pct - 50.0).abs() < f64::EPSILON);

    let values = field_values(&outcome.document);
    assert_eq!(values["nombre"], "Maria Lopez");
    assert_eq!(values["cedula"], "8-123-4567");
    assert_eq!(values["telefono"], "");
}

#[test]
fn applied_and_unmatched_partition_the_derived_set() {
    let template = build_form_pdf(&["a", "c"]);
    let fields = derived(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")]);

    let outcome = fill(&template, &fields).unwrap();
    let report = &outcome.report;

    let unmatched: HashSet<&str> = report.fields_unmatched.iter().map(String::as_str).collect();
    let applied: HashSet<&str> = fields
        .keys()
        .map(String::as_str)
        .filter(|name| !unmatched.contains(name))
        .collect();

    assert_eq!(applied.len(), report.fields_filled);
    assert_eq!(applied.len() + unmatched.len(), report.fields_total);
    assert!(applied.is_disjoint(&unmatched));

    let all: HashSet<&str> = applied.union(&unmatched).copied().collect();
    let derived_names: HashSet<&str> = fields.keys().map(String::as_str).collect();
    assert_eq!(all, derived_names);
}

#[test]
fn empty_derived_set_reports_zero_completion() {
    let template = build_form_pdf(&["nombre"]);
    let outcome = fill(&template, &DerivedFields::new()).unwrap();

    assert_eq!(outcome.report.fields_filled, 0);
    assert_eq!(outcome.report.fields_total, 0);
    assert!(outcome.report.fields_unmatched.is_empty());
    assert_eq!(outcome.report.completion_pct, 0.0);
}

#[test]
fn missing_schema_falls_back_to_assuming_all_fields_present() {
    // No AcroForm at all: introspection fails and the reconciler degrades to
    // assuming every derived field exists on the template
    let template = build_formless_pdf();
    let fields = derived(&[("nombre", "Maria"), ("cedula", "8-1-1")]);

    let outcome = fill(&template, &fields).unwrap();

    assert_eq!(outcome.report.fields_filled, 2);
    assert_eq!(outcome.report.fields_total, 2);
    assert!(outcome.report.fields_unmatched.is_empty());
    assert!((outcome.report.completion_pct - 100.0).abs() < f64::EPSILON);
    // The document still serializes even though nothing could be written
    assert!(!outcome.document.is_empty());
}

#[test]
fn corrupt_template_is_a_fatal_fill_error() {
    let fields = derived(&[("nombre", "Maria")]);

    let result = fill(b"definitely not a pdf", &fields);

    match result {
        Err(AppError::FillOperation(msg)) => {
            assert!(msg.contains("Failed to load template"), "msg: {}", msg)
        }
        other => panic!("expected FillOperation error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn need_appearances_is_set_after_writing() {
    let template = build_form_pdf(&["nombre"]);
    let fields = derived(&[("nombre", "Maria")]);

    let outcome = fill(&template, &fields).unwrap();

    let doc = Document::load_mem(&outcome.document).unwrap();
    let catalog = doc.catalog().unwrap();
    let Object::Reference(id) = catalog.get(b"AcroForm").unwrap() else {
        panic!("AcroForm should stay an indirect reference");
    };
    let acroform = doc.get_object(*id).unwrap().as_dict().unwrap();
    assert_eq!(
        acroform.get(b"NeedAppearances").unwrap(),
        &Object::Boolean(true)
    );
}

#[test]
fn field_schema_reads_declared_names() {
    let template = build_form_pdf(&["uno", "dos", "tres"]);
    let mut schema = filler::field_schema(&template).unwrap();
    schema.sort();
    assert_eq!(schema, vec!["dos", "tres", "uno"]);

    assert!(filler::field_schema(&build_formless_pdf()).is_err());
}

#[test]
fn derived_mmg_fields_land_on_a_matching_template() {
    let registry = Registry::new();
    let profile = registry.lookup("mmg_bank").unwrap();

    let client = ClientRecord {
        full_name: "Maria Ana Lopez Perez".to_string(),
        cedula: "8-123-4567".to_string(),
        passport: None,
        birth_date: "15/03/1985".to_string(),
        nationality: "Panameña".to_string(),
        marital_status: "Soltero".to_string(),
        address: "Calle 50".to_string(),
        province: "Panamá".to_string(),
        district: "Panamá".to_string(),
        corregimiento: "Bella Vista".to_string(),
        phone: "6123-4567".to_string(),
        email: "maria@example.com".to_string(),
        occupation: "Abogada".to_string(),
        employer: "Bufete Lopez".to_string(),
        job_title: "Socia".to_string(),
        monthly_income: 2000.0,
        source_of_funds: "Salario".to_string(),
        nit: None,
        ruc: None,
        is_pep: false,
    };

    let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
    let (fields, issues) = derive_with_date(profile, &client, today);
    assert!(issues.is_empty());

    // Template declaring every profile field: full completion
    let names: Vec<&str> = fields.keys().map(String::as_str).collect();
    let template = build_form_pdf(&names);

    let outcome = fill(&template, &fields).unwrap();
    assert_eq!(outcome.report.fields_filled, profile.field_count());
    assert_eq!(outcome.report.fields_total, profile.field_count());
    assert!(outcome.report.fields_unmatched.is_empty());
    assert!((outcome.report.completion_pct - 100.0).abs() < f64::EPSILON);

    let values = field_values(&outcome.document);
    assert_eq!(values["primer_nombre"], "Maria");
    assert_eq!(values["primer_apellido"], "Lopez");
    assert_eq!(values["genero_f"], "X");
    assert_eq!(values["genero_m"], "");
    assert_eq!(values["salario_bruto"], "$2,000.00");
    assert_eq!(values["ingreso_anual_menos_50k"], "X");
    assert_eq!(values["fecha_firma"], "07/08/2026");
}
