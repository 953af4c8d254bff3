//! Institution mapping registry.
//!
//! A fixed, closed set of mapping profiles, one per institution/form variant.
//! Each profile is a declarative table from target PDF field name to the
//! [`Rule`] that derives its value from a [`crate::models::ClientRecord`].
//! Profiles are process-wide static configuration: built into the binary,
//! loaded once at startup, read-only afterwards, shared across requests
//! without locking.
//!
//! Checkbox groups on the paper forms behave like radio buttons; the rule
//! engine does not enforce exclusivity, so each group is written as
//! complementary if-true/else-empty rule pairs. Fields the service has no
//! client data for (bank references, spouse name, expiry dates) are pinned to
//! the empty string so they stay blank on the filled form.

use crate::mapping::Bound::{Exclusive, Inclusive, Open};
use crate::mapping::ClientField::{self, *};
use crate::mapping::NamePosition::*;
use crate::mapping::{Bound, Bracket, NamePosition, Rule};
use std::collections::HashSet;

// Table constructors, so profile entries stay one line each.

const fn fixed(value: &'static str) -> Rule {
    Rule::Const(value)
}

const fn copy(field: ClientField) -> Rule {
    Rule::Copy(field)
}

const fn first_non_empty(fields: &'static [ClientField]) -> Rule {
    Rule::FirstNonEmpty(fields)
}

const fn name_part(position: NamePosition) -> Rule {
    Rule::NameToken(position)
}

const fn flag_any(field: ClientField, patterns: &'static [&'static str]) -> Rule {
    Rule::FlagIfContains { field, patterns }
}

const fn flag_none(field: ClientField, patterns: &'static [&'static str]) -> Rule {
    Rule::FlagIfNotContains { field, patterns }
}

const fn flag_other(field: ClientField, known: &'static [&'static str]) -> Rule {
    Rule::FlagIfOther { field, known }
}

const fn copy_other(field: ClientField, known: &'static [&'static str]) -> Rule {
    Rule::CopyIfOther { field, known }
}

const fn copy_when(field: ClientField, guard: ClientField, patterns: &'static [&'static str]) -> Rule {
    Rule::CopyIfContains {
        field,
        guard,
        patterns,
    }
}

const fn pep_flag(expected: bool) -> Rule {
    Rule::FlagIfPep { expected }
}

const fn bracket(lo: Bound, hi: Bound) -> Rule {
    Rule::IncomeBracket(Bracket { lo, hi })
}

const fn currency(factor: f64) -> Rule {
    Rule::Currency { factor }
}

/// Source-of-funds categories the Morgan & Morgan natural-person form
/// enumerates; anything else trips the "otro" checkbox.
const MORGAN_NATURAL_FUND_SOURCES: &[&str] =
    &["salario", "pension", "alquiler", "renta", "dividendo", "herencia"];

/// Morgan & Morgan, natural person ("Persona Natural") KYC declaration.
static MORGAN_MORGAN_NATURAL: &[(&str, Rule)] = &[
    ("nombre_completo", copy(FullName)),
    ("nacionalidad_origen", copy(Nationality)),
    ("otras_nacionalidades", fixed("")),
    ("telefono", copy(Phone)),
    ("email", copy(Email)),
    ("direccion_fisica", copy(Address)),
    ("ocupacion_actividad", copy(Occupation)),
    ("pais_ocupacion", fixed("Panamá")),
    ("requiere_licencia", fixed("NO")),
    ("numero_ruc", copy(Ruc)),
    ("dv", fixed("")),
    ("numero_tributario", copy(Nit)),
    ("pais_residencia_fiscal", fixed("Panamá")),
    ("origen_riqueza_salarios", flag_any(SourceOfFunds, &["salario"])),
    ("origen_riqueza_pensiones", flag_any(SourceOfFunds, &["pension"])),
    ("origen_riqueza_renta", flag_any(SourceOfFunds, &["alquiler", "renta"])),
    ("origen_riqueza_dividendos", flag_any(SourceOfFunds, &["dividendo"])),
    ("origen_riqueza_herencia", flag_any(SourceOfFunds, &["herencia"])),
    ("origen_riqueza_otro", flag_other(SourceOfFunds, MORGAN_NATURAL_FUND_SOURCES)),
    ("pais_origen_riqueza", fixed("Panamá")),
    ("referencia_banco_nombre", fixed("")),
    ("referencia_banco_contacto", fixed("")),
    ("referencia_banco_telefono", fixed("")),
    ("referencia_banco_email", fixed("")),
    ("nombre_declarante", copy(FullName)),
    ("cedula_declarante", copy(Cedula)),
    ("fecha_declaracion", Rule::Today),
];

/// Source-of-funds categories on the legal-entity variant. Note: no
/// "herencia", and share sales ("acciones") appear instead.
const MORGAN_JURIDICA_FUND_SOURCES: &[&str] =
    &["salario", "pension", "acciones", "alquiler", "renta", "dividendo"];

/// Morgan & Morgan, legal entity ("Persona Jurídica") KYC declaration.
///
/// The company name falls back to the client's full name for sole proprietors
/// that leave `employer` empty. Unlike the natural-person form, the "otro"
/// slot is a write-in line, so the raw source-of-funds text is copied through
/// instead of a checkbox flag.
static MORGAN_MORGAN_JURIDICA: &[(&str, Rule)] = &[
    ("nombre_completo_empresa", first_non_empty(&[Employer, FullName])),
    ("telefono", copy(Phone)),
    ("email", copy(Email)),
    ("actividad", copy(Occupation)),
    ("pais_actividad", fixed("Panamá")),
    ("direccion_actividad", copy(Address)),
    ("requiere_licencia", fixed("NO")),
    ("numero_ruc", copy(Ruc)),
    ("dv", fixed("")),
    ("numero_tributario", copy(Nit)),
    ("pais_residencia_fiscal", fixed("Panamá")),
    ("origen_fondos_salarios", flag_any(SourceOfFunds, &["salario"])),
    ("origen_fondos_pensiones", flag_any(SourceOfFunds, &["pension"])),
    ("origen_fondos_venta_acciones", flag_any(SourceOfFunds, &["acciones"])),
    ("origen_fondos_renta", flag_any(SourceOfFunds, &["alquiler", "renta"])),
    ("origen_fondos_dividendos", flag_any(SourceOfFunds, &["dividendo"])),
    ("origen_fondos_otro", copy_other(SourceOfFunds, MORGAN_JURIDICA_FUND_SOURCES)),
    ("pais_origen_fondos", fixed("Panamá")),
    ("referencia_banco_nombre", fixed("")),
    ("referencia_banco_contacto", fixed("")),
    ("referencia_banco_telefono", fixed("")),
    ("referencia_banco_email", fixed("")),
    ("nombre_declarante", copy(FullName)),
    ("cedula_declarante", copy(Cedula)),
    ("fecha_declaracion", Rule::Today),
];

/// Feminine given names used by the gender checkbox heuristic. Substring
/// match against the full name, so "Mariana" also matches "ana". Best-effort
/// only; the form has no better signal in the client record.
const FEMININE_NAME_HINTS: &[&str] = &["maria", "ana", "carmen"];

/// MMG Bank comprehensive natural-person account-opening form.
///
/// Income bracket table (annualized = monthly × 12), boundaries exactly as
/// printed on the form:
///   menos_50k    [0, 50 000)
///   50k_150k     [50 000, 150 000]
///   150k_250k    (150 000, 250 000]
///   250k_500k    (250 000, 500 000]
///   mas_500k     (500 000, ∞)
static MMG_BANK: &[(&str, Rule)] = &[
    ("primer_nombre", name_part(FirstGiven)),
    ("segundo_nombre", name_part(MiddleGiven)),
    ("primer_apellido", name_part(FirstSurname)),
    ("segundo_apellido", name_part(SecondSurname)),
    ("genero_f", flag_any(FullName, FEMININE_NAME_HINTS)),
    ("genero_m", flag_none(FullName, FEMININE_NAME_HINTS)),
    ("cedula", fixed("X")),
    ("pasaporte", fixed("")),
    ("numero_identificacion", copy(Cedula)),
    ("fecha_expiracion", fixed("")),
    ("fecha_nacimiento", copy(BirthDate)),
    ("pais_nacimiento", fixed("Panamá")),
    ("nacionalidad", copy(Nationality)),
    ("residencia_fiscal", fixed("Panamá")),
    ("numero_contribuyente", first_non_empty(&[Nit, Ruc])),
    ("direccion_residencial", copy(Address)),
    ("corregimiento", copy(Corregimiento)),
    ("provincia", copy(Province)),
    ("pais", fixed("Panamá")),
    ("correo", copy(Email)),
    ("telefono", copy(Phone)),
    ("celular", copy(Phone)),
    ("estado_civil_soltero", flag_any(MaritalStatus, &["soltero"])),
    ("estado_civil_casado", flag_any(MaritalStatus, &["casado"])),
    ("nombre_conyuge", fixed("")),
    ("dependientes", fixed("0")),
    ("sector_publico", fixed("")),
    ("sector_privado", fixed("X")),
    ("empleado_domestico", fixed("")),
    ("cuenta_propia", flag_any(Employer, &["independiente"])),
    ("patrono", fixed("")),
    ("trabajador_familiar", fixed("")),
    ("cooperativa", fixed("")),
    ("jubilado", fixed("")),
    ("desempleado", fixed("")),
    ("nivel_primaria", fixed("")),
    ("nivel_secundaria", fixed("")),
    ("nivel_tecnico", fixed("")),
    ("nivel_universitario_lic", fixed("X")),
    ("nivel_universitario_maestria", fixed("")),
    ("profesion", copy(Occupation)),
    ("cargo", copy(JobTitle)),
    ("empresa", copy(Employer)),
    ("tipo_negocio", fixed("")),
    ("telefono_empresa", copy(Phone)),
    ("celular_empresa", copy(Phone)),
    ("correo_empresa", copy(Email)),
    ("direccion_laboral", copy(Address)),
    ("pais_laboral", fixed("Panamá")),
    ("salario_bruto", currency(1.0)),
    // Net income approximated at 85% of gross; the bank accepts estimates.
    ("ingreso_neto", currency(0.85)),
    ("otros_ingresos", fixed("$0.00")),
    ("fecha_ingreso", fixed("")),
    ("ingreso_anual_menos_50k", bracket(Open, Exclusive(50_000.0))),
    ("ingreso_anual_50k_150k", bracket(Inclusive(50_000.0), Inclusive(150_000.0))),
    ("ingreso_anual_150k_250k", bracket(Exclusive(150_000.0), Inclusive(250_000.0))),
    ("ingreso_anual_250k_500k", bracket(Exclusive(250_000.0), Inclusive(500_000.0))),
    ("ingreso_anual_mas_500k", bracket(Exclusive(500_000.0), Open)),
    ("otras_nacionalidades_si", fixed("")),
    ("otras_nacionalidades_no", fixed("X")),
    ("renunciado_nacionalidad_si", fixed("")),
    ("renunciado_nacionalidad_no", fixed("X")),
    ("intermediario_si", fixed("")),
    ("intermediario_no", fixed("X")),
    ("pep_si", pep_flag(true)),
    ("pep_no", pep_flag(false)),
    ("referencia_banco_1", fixed("")),
    ("referencia_banco_1_contacto", fixed("")),
    ("referencia_banco_1_telefono", fixed("")),
    ("referencia_banco_1_email", fixed("")),
    ("referencia_banco_2", fixed("")),
    ("referencia_banco_2_contacto", fixed("")),
    ("referencia_banco_2_telefono", fixed("")),
    ("referencia_banco_2_email", fixed("")),
    ("nombre_firma", copy(FullName)),
    ("fecha_firma", Rule::Today),
];

/// Generic insurance natural-person KYC form.
///
/// Income bracket table (annualized = monthly × 12), all lower-inclusive:
///   menos_10k  [0, 10 000)
///   10k_30k    [10 000, 30 000)
///   30k_50k    [30 000, 50 000)
///   mas_50k    [50 000, ∞)
static SEGUROS_GENERICO: &[(&str, Rule)] = &[
    ("apellido_1", name_part(FirstSurname)),
    ("apellido_2", name_part(SecondSurname)),
    ("nombre_1", name_part(FirstGiven)),
    ("nombre_2", name_part(MiddleGiven)),
    ("fecha_nacimiento", copy(BirthDate)),
    ("pais_nacimiento", fixed("Panamá")),
    ("nacionalidad", copy(Nationality)),
    ("pais_residencia", fixed("Panamá")),
    ("cedula", copy(Cedula)),
    ("pasaporte", copy(Passport)),
    ("estado_civil", copy(MaritalStatus)),
    ("direccion_residencial", copy(Address)),
    ("pais_direccion", fixed("Panamá")),
    ("correo", copy(Email)),
    ("telefono_celular", copy(Phone)),
    ("telefono_residencial", copy(Phone)),
    ("pais_tributa", fixed("Panamá")),
    ("numero_tributario", first_non_empty(&[Nit, Ruc])),
    ("es_pep_si", pep_flag(true)),
    ("es_pep_no", pep_flag(false)),
    ("cargo_pep", Rule::CopyIfPep(JobTitle)),
    ("familiar_pep_si", fixed("")),
    ("familiar_pep_no", fixed("X")),
    ("nombre_pep_familiar", fixed("")),
    ("cargo_pep_familiar", fixed("")),
    ("relacion_pep", fixed("")),
    ("colaborador_pep_si", fixed("")),
    ("colaborador_pep_no", fixed("X")),
    ("nombre_pep_colaborador", fixed("")),
    ("cargo_pep_colaborador", fixed("")),
    ("relacion_pep_colaborador", fixed("")),
    ("ingreso_menos_10k", bracket(Open, Exclusive(10_000.0))),
    ("ingreso_10k_30k", bracket(Inclusive(10_000.0), Exclusive(30_000.0))),
    ("ingreso_30k_50k", bracket(Inclusive(30_000.0), Exclusive(50_000.0))),
    ("ingreso_mas_50k", bracket(Inclusive(50_000.0), Open)),
    ("otros_ingresos_detalle", fixed("")),
    ("otros_ingresos_monto", fixed("")),
    ("profesion", copy(Occupation)),
    ("ocupacion", copy(Occupation)),
    ("nombre_empresa", copy(Employer)),
    ("telefono_empresa", copy(Phone)),
    ("correo_empresa", copy(Email)),
    ("direccion_empresa", copy(Address)),
    ("actividad_independiente", copy_when(Occupation, Employer, &["independiente"])),
    ("nombre_firmante", copy(FullName)),
    ("firma_fecha", Rule::Today),
];

/// One institution's mapping profile: a named, ordered table of derivation
/// rules producing the PDF field values of one form variant.
#[derive(Debug, Clone, Copy)]
pub struct Profile {
    key: &'static str,
    display_name: &'static str,
    fields: &'static [(&'static str, Rule)],
}

impl Profile {
    /// Registry key.
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Human-readable form name.
    pub fn display_name(&self) -> &'static str {
        self.display_name
    }

    /// The rule table, in form order.
    pub fn fields(&self) -> &'static [(&'static str, Rule)] {
        self.fields
    }

    /// Number of target fields the profile produces.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Looks up the rule for one target field name.
    pub fn rule(&self, name: &str) -> Option<&'static Rule> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, rule)| rule)
    }

    /// Target field names whose rules are intentionally time-dependent.
    pub fn time_dependent_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|(_, rule)| !rule.is_pure())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Target field names that appear more than once. Must be empty for a
    /// well-formed profile.
    pub fn duplicate_field_names(&self) -> Vec<&'static str> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for (name, _) in self.fields {
            if !seen.insert(*name) && !duplicates.contains(name) {
                duplicates.push(*name);
            }
        }
        duplicates
    }
}

static PROFILES: &[Profile] = &[
    Profile {
        key: "morgan_morgan_natural",
        display_name: "Morgan & Morgan - Persona Natural",
        fields: MORGAN_MORGAN_NATURAL,
    },
    Profile {
        key: "morgan_morgan_juridica",
        display_name: "Morgan & Morgan - Persona Jurídica",
        fields: MORGAN_MORGAN_JURIDICA,
    },
    Profile {
        key: "mmg_bank",
        display_name: "MMG Bank - Persona Natural",
        fields: MMG_BANK,
    },
    Profile {
        key: "seguros_generico",
        display_name: "Seguros Genérico - Persona Natural",
        fields: SEGUROS_GENERICO,
    },
];

/// The closed, enumerable set of institution mapping profiles.
#[derive(Debug, Clone, Copy)]
pub struct Registry {
    profiles: &'static [Profile],
}

impl Registry {
    /// Builds the registry over the built-in profile set.
    pub fn new() -> Self {
        Self { profiles: PROFILES }
    }

    /// Looks up a profile by institution key.
    pub fn lookup(&self, key: &str) -> Option<&'static Profile> {
        self.profiles.iter().find(|p| p.key == key)
    }

    /// All profiles, in registration order.
    pub fn profiles(&self) -> &'static [Profile] {
        self.profiles
    }

    /// All institution keys, in registration order.
    pub fn keys(&self) -> Vec<&'static str> {
        self.profiles.iter().map(|p| p.key).collect()
    }

    /// Checks profile well-formedness: unique keys, unique target field names
    /// within each profile. Run once at startup; profiles are static data, so
    /// a failure here is a build defect, not a runtime condition.
    pub fn validate(&self) -> Result<(), String> {
        let mut keys = HashSet::new();
        for profile in self.profiles {
            if !keys.insert(profile.key) {
                return Err(format!("duplicate institution key '{}'", profile.key));
            }
            let duplicates = profile.duplicate_field_names();
            if !duplicates.is_empty() {
                return Err(format!(
                    "profile '{}' has duplicate target fields: {}",
                    profile.key,
                    duplicates.join(", ")
                ));
            }
        }
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
