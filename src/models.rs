use crate::errors::AppError;
use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============ Client Record ============

/// Validated KYC attributes of one natural or legal person.
///
/// Constructed once per incoming request, immutable while the request is
/// processed, never persisted. Every string field may be empty except
/// `full_name` and `cedula` (see [`ClientRecord::validate`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Full legal name, as printed on the identity document.
    pub full_name: String,
    /// Panamanian national identity number (cédula).
    pub cedula: String,
    /// Passport number, if any.
    #[serde(default)]
    pub passport: Option<String>,
    /// Birth date as a locale-formatted string (dd/mm/yyyy on the forms).
    pub birth_date: String,
    /// Nationality.
    pub nationality: String,
    /// Marital status free text (e.g. "Soltero", "Casada").
    pub marital_status: String,
    /// Full residential address.
    pub address: String,
    /// Province.
    pub province: String,
    /// District.
    pub district: String,
    /// Corregimiento (sub-district).
    pub corregimiento: String,
    /// Contact phone number.
    pub phone: String,
    /// Contact email address.
    pub email: String,
    /// Occupation / profession.
    pub occupation: String,
    /// Employer name ("Independiente" for self-employed clients).
    pub employer: String,
    /// Job title.
    pub job_title: String,
    /// Monthly income in USD. Must be finite and non-negative.
    pub monthly_income: f64,
    /// Source-of-funds free text (e.g. "Salario", "Herencia familiar").
    pub source_of_funds: String,
    /// NIT tax identifier, if any.
    #[serde(default)]
    pub nit: Option<String>,
    /// RUC tax identifier, if any.
    #[serde(default)]
    pub ruc: Option<String>,
    /// Politically-exposed-person classification.
    #[serde(default)]
    pub is_pep: bool,
}

impl ClientRecord {
    /// Validates the record before any I/O is performed.
    ///
    /// Hard invariants: `full_name` and `cedula` non-empty, `monthly_income`
    /// finite and non-negative. Everything else is best-effort data that the
    /// mapping profiles render as empty strings when absent, so malformed
    /// emails or phones only produce log diagnostics here.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.full_name.trim().is_empty() {
            return Err(AppError::BadRequest(
                "full_name must not be empty".to_string(),
            ));
        }
        if self.cedula.trim().is_empty() {
            return Err(AppError::BadRequest("cedula must not be empty".to_string()));
        }
        if !self.monthly_income.is_finite() || self.monthly_income < 0.0 {
            return Err(AppError::BadRequest(
                "monthly_income must be a non-negative number".to_string(),
            ));
        }

        if !self.email.is_empty() && !is_valid_email(&self.email) {
            tracing::warn!(
                "Client {} has a suspicious email address: {}",
                self.cedula,
                self.email
            );
        }
        if !self.phone.is_empty() {
            let (valid, detail) = validate_pa_phone(&self.phone);
            if !valid {
                tracing::warn!(
                    "Client {} has a suspicious phone number '{}': {}",
                    self.cedula,
                    self.phone,
                    detail
                );
            }
        }

        Ok(())
    }

    /// Passport number or empty string.
    pub fn passport_or_empty(&self) -> &str {
        self.passport.as_deref().unwrap_or("")
    }

    /// NIT or empty string.
    pub fn nit_or_empty(&self) -> &str {
        self.nit.as_deref().unwrap_or("")
    }

    /// RUC or empty string.
    pub fn ruc_or_empty(&self) -> &str {
        self.ruc.as_deref().unwrap_or("")
    }
}

/// Validate email address
///
/// Checks for:
/// - Basic email format (contains @ and .)
/// - Fake/placeholder patterns (repeated digits like 9999, 1111)
/// - Minimum length requirements
/// - Valid domain structure
pub fn is_valid_email(email: &str) -> bool {
    // Basic checks
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    // Detect fake patterns (repeated digits)
    let fake_patterns = [
        "999999",    // Common fake: 6999999999@gmail.com
        "111111",    // Common fake: 1111111111@
        "000000",    // Common fake: 000000@
        "123456789", // Sequential fake
    ];

    for pattern in &fake_patterns {
        if email.contains(pattern) {
            tracing::warn!(
                "Invalid email detected (fake pattern '{}'): {}",
                pattern,
                email
            );
            return false;
        }
    }

    // RFC 5322 simplified email regex
    // Matches: local@domain.tld
    let email_regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    if !email_regex.is_match(email) {
        tracing::warn!("Invalid email format: {}", email);
        return false;
    }

    true
}

/// Validate and normalize Panamanian phone number
///
/// Uses phonenumber library (port of Google's libphonenumber) to:
/// - Parse phone number with Panamanian region (PA)
/// - Validate if it's a valid Panamanian number
/// - Return normalized E.164 format (+50761234567)
///
/// Returns: (is_valid, normalized_phone_or_error_msg)
pub fn validate_pa_phone(raw: &str) -> (bool, String) {
    // Skip empty or very short strings
    if raw.trim().is_empty() || raw.len() < 7 {
        return (false, "Phone too short".to_string());
    }

    // Parse with Panamanian country code
    match phonenumber::parse(Some(CountryId::PA), raw) {
        Ok(number) => {
            // Check if valid
            if phonenumber::is_valid(&number) {
                // Format to E.164 (+50761234567)
                let formatted = number.format().mode(Mode::E164).to_string();
                tracing::debug!("Valid PA phone: {} -> {}", raw, formatted);
                (true, formatted)
            } else {
                tracing::warn!("Invalid PA phone number: {}", raw);
                (false, "Invalid Panamanian phone number".to_string())
            }
        }
        Err(e) => {
            tracing::warn!("Failed to parse PA phone '{}': {:?}", raw, e);
            (false, format!("Parse error: {:?}", e))
        }
    }
}

// ============ Request / Response Models ============

/// Body of `POST /api/v1/fill-form`.
#[derive(Debug, Clone, Deserialize)]
pub struct FillFormRequest {
    /// Institution key, one of the registry's keys.
    pub institution: String,
    /// Client data to map onto the form.
    pub client: ClientRecord,
    /// Optional per-request template source, overrides the configured default.
    #[serde(default)]
    pub template_url: Option<String>,
}

/// Summary statistics of one form-filling operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillReport {
    /// Fields successfully placed on the template.
    pub fields_filled: usize,
    /// Fields the mapping profile attempted to produce.
    pub fields_total: usize,
    /// Derived field names the template does not declare.
    pub fields_unmatched: Vec<String>,
    /// `fields_filled / fields_total * 100`; 0 when nothing was attempted.
    pub completion_pct: f64,
}

impl FillReport {
    /// Builds a report, defining completion as 0% when nothing was attempted.
    pub fn new(fields_filled: usize, fields_total: usize, fields_unmatched: Vec<String>) -> Self {
        let completion_pct = if fields_total == 0 {
            0.0
        } else {
            fields_filled as f64 / fields_total as f64 * 100.0
        };
        Self {
            fields_filled,
            fields_total,
            fields_unmatched,
            completion_pct,
        }
    }
}

/// Successful response of `POST /api/v1/fill-form`.
#[derive(Debug, Clone, Serialize)]
pub struct FillFormResponse {
    /// Always `true`; failures use the error surface instead.
    pub success: bool,
    /// Institution the form was filled for.
    pub institution: String,
    /// Client's full name, echoed for traceability.
    pub client_name: String,
    /// Unique identifier of the produced document.
    pub document_id: Uuid,
    /// File name of the produced document.
    pub filename: String,
    /// Path of the produced document on this host.
    pub filepath: String,
    /// Completion report.
    pub report: FillReport,
    /// Processing timestamp (`YYYYmmdd_HHMMSS`, also embedded in the filename).
    pub timestamp: String,
}

/// One entry of the institution listing.
#[derive(Debug, Clone, Serialize)]
pub struct InstitutionSummary {
    /// Registry key.
    pub key: String,
    /// Human-readable form name.
    pub display_name: String,
    /// Number of target fields the profile produces.
    pub field_count: usize,
}

/// Response of `GET /api/v1/institutions`.
#[derive(Debug, Clone, Serialize)]
pub struct InstitutionListResponse {
    /// All configured institution profiles.
    pub institutions: Vec<InstitutionSummary>,
}
