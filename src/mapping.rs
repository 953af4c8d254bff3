//! Derivation rules and the engine that evaluates them.
//!
//! Each institution profile is a table of `(target_field_name, Rule)` entries.
//! A [`Rule`] is a declarative, side-effect-free description of how one PDF
//! field value is computed from a [`ClientRecord`]; one generic interpreter
//! ([`Rule::eval`]) covers every profile. The engine isolates per-field
//! failures: a rule that cannot produce a value contributes an empty string
//! and a logged [`FieldIssue`], never an aborted request.

use crate::models::ClientRecord;
use crate::registry::Profile;
use chrono::{Local, NaiveDate};
use std::collections::BTreeMap;
use std::fmt;

/// Flag token written into checkbox-like fields when a predicate matches.
pub const FLAG_TOKEN: &str = "X";

/// Mapping from target PDF field name to its derived string value.
///
/// Ephemeral, built fresh per request and discarded once the fill report is
/// produced. An empty string means "no value" / unchecked flag.
pub type DerivedFields = BTreeMap<String, String>;

/// Client attributes a rule can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientField {
    FullName,
    Cedula,
    Passport,
    BirthDate,
    Nationality,
    MaritalStatus,
    Address,
    Province,
    District,
    Corregimiento,
    Phone,
    Email,
    Occupation,
    Employer,
    JobTitle,
    SourceOfFunds,
    Nit,
    Ruc,
}

impl ClientField {
    /// Reads the attribute from a client record as a string slice.
    pub fn get<'a>(&self, client: &'a ClientRecord) -> &'a str {
        match self {
            ClientField::FullName => &client.full_name,
            ClientField::Cedula => &client.cedula,
            ClientField::Passport => client.passport_or_empty(),
            ClientField::BirthDate => &client.birth_date,
            ClientField::Nationality => &client.nationality,
            ClientField::MaritalStatus => &client.marital_status,
            ClientField::Address => &client.address,
            ClientField::Province => &client.province,
            ClientField::District => &client.district,
            ClientField::Corregimiento => &client.corregimiento,
            ClientField::Phone => &client.phone,
            ClientField::Email => &client.email,
            ClientField::Occupation => &client.occupation,
            ClientField::Employer => &client.employer,
            ClientField::JobTitle => &client.job_title,
            ClientField::SourceOfFunds => &client.source_of_funds,
            ClientField::Nit => client.nit_or_empty(),
            ClientField::Ruc => client.ruc_or_empty(),
        }
    }
}

/// Positional slot of the name-decomposition heuristic.
///
/// Tokens are whitespace-separated words of the full name. This is a
/// best-effort parse: compound surnames ("de la Cruz") and multi-word given
/// names land in the wrong slots. Known limitation, kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePosition {
    /// First token.
    FirstGiven,
    /// Second token, only when the name has at least three tokens.
    MiddleGiven,
    /// Second-to-last token, only when the name has at least two tokens.
    FirstSurname,
    /// Last token, only when the name has at least three tokens.
    SecondSurname,
}

/// One side of an income bracket boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// Unbounded on this side.
    Open,
    /// Boundary value included in the bracket.
    Inclusive(f64),
    /// Boundary value excluded from the bracket.
    Exclusive(f64),
}

/// Annualized-income bracket with per-profile open/closed boundaries.
///
/// Boundaries are reproduced exactly from each institution's bracket table;
/// the openness of each side differs between profiles and must not be
/// "normalized".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    /// Lower boundary.
    pub lo: Bound,
    /// Upper boundary.
    pub hi: Bound,
}

impl Bracket {
    /// Whether `value` falls inside the bracket.
    pub fn contains(&self, value: f64) -> bool {
        let lo_ok = match self.lo {
            Bound::Open => true,
            Bound::Inclusive(b) => value >= b,
            Bound::Exclusive(b) => value > b,
        };
        let hi_ok = match self.hi {
            Bound::Open => true,
            Bound::Inclusive(b) => value <= b,
            Bound::Exclusive(b) => value < b,
        };
        lo_ok && hi_ok
    }
}

/// Declarative derivation rule: a pure function of a client record, expressed
/// as data so profiles can be validated without a client instance.
///
/// All predicates on free text are case-insensitive. Every variant renders to
/// a `String`; "no value" is always the empty string, never a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Fixed institutional default, independent of client data.
    Const(&'static str),
    /// Verbatim copy of one client attribute.
    Copy(ClientField),
    /// First non-empty attribute of the list, empty if all are empty.
    FirstNonEmpty(&'static [ClientField]),
    /// Name token extracted by position (heuristic).
    NameToken(NamePosition),
    /// Flag when any pattern occurs as a substring of the attribute.
    FlagIfContains {
        field: ClientField,
        patterns: &'static [&'static str],
    },
    /// Flag when the attribute is non-empty and contains none of the patterns.
    /// Complementary half of an if-true/else-empty pair emulating radio
    /// buttons; the engine does not enforce exclusivity.
    FlagIfNotContains {
        field: ClientField,
        patterns: &'static [&'static str],
    },
    /// Flag when the whole lowercased attribute is non-empty and is not one of
    /// the profile's known categories.
    FlagIfOther {
        field: ClientField,
        known: &'static [&'static str],
    },
    /// Copies the raw attribute when its lowercased value is not one of the
    /// known categories, empty otherwise.
    CopyIfOther {
        field: ClientField,
        known: &'static [&'static str],
    },
    /// Copies `field` when `guard` contains any of the patterns.
    CopyIfContains {
        field: ClientField,
        guard: ClientField,
        patterns: &'static [&'static str],
    },
    /// Flag when the client's PEP classification equals `expected`.
    FlagIfPep { expected: bool },
    /// Copies the attribute only for PEP clients.
    CopyIfPep(ClientField),
    /// Flag when monthly income × 12 falls into the bracket.
    IncomeBracket(Bracket),
    /// Monthly income × `factor`, rendered as `$#,###.##`.
    Currency { factor: f64 },
    /// Current date as dd/mm/YYYY. The only rule that is not a pure function
    /// of the client record; excluded from determinism guarantees.
    Today,
}

impl Rule {
    /// Evaluates the rule against one client record.
    ///
    /// `today` is injected so callers (and tests) control the clock; only
    /// [`Rule::Today`] reads it.
    pub fn eval(&self, client: &ClientRecord, today: NaiveDate) -> Result<String, DeriveError> {
        let value = match self {
            Rule::Const(s) => (*s).to_string(),
            Rule::Copy(field) => field.get(client).to_string(),
            Rule::FirstNonEmpty(fields) => fields
                .iter()
                .map(|f| f.get(client))
                .find(|v| !v.is_empty())
                .unwrap_or("")
                .to_string(),
            Rule::NameToken(position) => name_token(&client.full_name, *position),
            Rule::FlagIfContains { field, patterns } => {
                let haystack = field.get(client).to_lowercase();
                flag(patterns.iter().any(|p| haystack.contains(p)))
            }
            Rule::FlagIfNotContains { field, patterns } => {
                let haystack = field.get(client).to_lowercase();
                flag(!haystack.is_empty() && !patterns.iter().any(|p| haystack.contains(p)))
            }
            Rule::FlagIfOther { field, known } => {
                let value = field.get(client).to_lowercase();
                flag(!value.is_empty() && !known.contains(&value.as_str()))
            }
            Rule::CopyIfOther { field, known } => {
                let lowered = field.get(client).to_lowercase();
                if known.contains(&lowered.as_str()) {
                    String::new()
                } else {
                    field.get(client).to_string()
                }
            }
            Rule::CopyIfContains {
                field,
                guard,
                patterns,
            } => {
                let haystack = guard.get(client).to_lowercase();
                if patterns.iter().any(|p| haystack.contains(p)) {
                    field.get(client).to_string()
                } else {
                    String::new()
                }
            }
            Rule::FlagIfPep { expected } => flag(client.is_pep == *expected),
            Rule::CopyIfPep(field) => {
                if client.is_pep {
                    field.get(client).to_string()
                } else {
                    String::new()
                }
            }
            Rule::IncomeBracket(bracket) => {
                let annual = client.monthly_income * 12.0;
                if !annual.is_finite() {
                    return Err(DeriveError::new(format!(
                        "annualized income is not finite: {}",
                        annual
                    )));
                }
                flag(bracket.contains(annual))
            }
            Rule::Currency { factor } => {
                let amount = client.monthly_income * factor;
                if !amount.is_finite() {
                    return Err(DeriveError::new(format!(
                        "currency amount is not finite: {}",
                        amount
                    )));
                }
                format_currency(amount)
            }
            Rule::Today => today.format("%d/%m/%Y").to_string(),
        };
        Ok(value)
    }

    /// Whether the rule is a pure function of the client record.
    pub fn is_pure(&self) -> bool {
        !matches!(self, Rule::Today)
    }
}

fn flag(active: bool) -> String {
    if active {
        FLAG_TOKEN.to_string()
    } else {
        String::new()
    }
}

/// Extracts one positional token from a whitespace-split full name.
fn name_token(full_name: &str, position: NamePosition) -> String {
    let tokens: Vec<&str> = full_name.split_whitespace().collect();
    let token = match position {
        NamePosition::FirstGiven => tokens.first().copied(),
        NamePosition::MiddleGiven => {
            if tokens.len() > 2 {
                Some(tokens[1])
            } else {
                None
            }
        }
        NamePosition::FirstSurname => {
            if tokens.len() > 1 {
                Some(tokens[tokens.len() - 2])
            } else {
                None
            }
        }
        NamePosition::SecondSurname => {
            if tokens.len() > 2 {
                Some(tokens[tokens.len() - 1])
            } else {
                None
            }
        }
    };
    token.unwrap_or("").to_string()
}

/// Renders a dollar amount with thousands separators, e.g. `$1,234.56`.
fn format_currency(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (int_part, dec_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, dec_part)
}

/// Failure of a single derivation rule. Absorbed by the engine, never fatal.
#[derive(Debug, Clone)]
pub struct DeriveError {
    message: String,
}

impl DeriveError {
    fn new(message: String) -> Self {
        Self { message }
    }
}

impl fmt::Display for DeriveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DeriveError {}

/// A field whose rule failed during derivation, for logs and diagnostics.
#[derive(Debug, Clone)]
pub struct FieldIssue {
    /// Target field name.
    pub field: String,
    /// What went wrong.
    pub message: String,
}

/// Derives every field of a profile from a client record.
///
/// Uses today's local date for declaration-date rules; use
/// [`derive_with_date`] in tests that need determinism.
pub fn derive(profile: &Profile, client: &ClientRecord) -> (DerivedFields, Vec<FieldIssue>) {
    derive_with_date(profile, client, Local::now().date_naive())
}

/// Derives every field of a profile with an explicit date for `Today` rules.
///
/// Rules are independent and side-effect-free, so evaluation order does not
/// matter; a failing rule contributes an empty string and is reported in the
/// issue list rather than aborting the operation.
pub fn derive_with_date(
    profile: &Profile,
    client: &ClientRecord,
    today: NaiveDate,
) -> (DerivedFields, Vec<FieldIssue>) {
    let mut values = DerivedFields::new();
    let mut issues = Vec::new();

    for (name, rule) in profile.fields() {
        match rule.eval(client, today) {
            Ok(value) => {
                values.insert((*name).to_string(), value);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to derive field '{}' for profile '{}': {}",
                    name,
                    profile.key(),
                    e
                );
                issues.push(FieldIssue {
                    field: (*name).to_string(),
                    message: e.to_string(),
                });
                values.insert((*name).to_string(), String::new());
            }
        }
    }

    (values, issues)
}
