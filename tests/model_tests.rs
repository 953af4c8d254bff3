/// Unit tests for client record validation
/// Tests hard invariants plus the soft email/phone diagnostics
use kyc_pdf_api::errors::AppError;
use kyc_pdf_api::models::{is_valid_email, validate_pa_phone, ClientRecord};

fn valid_client() -> ClientRecord {
    ClientRecord {
        full_name: "Carlos Eduardo Diaz Moreno".to_string(),
        cedula: "8-765-4321".to_string(),
        passport: Some("PA1234567".to_string()),
        birth_date: "02/11/1979".to_string(),
        nationality: "Panameña".to_string(),
        marital_status: "Casado".to_string(),
        address: "Via España, Torre Delta".to_string(),
        province: "Panamá".to_string(),
        district: "Panamá".to_string(),
        corregimiento: "El Cangrejo".to_string(),
        phone: "6555-1234".to_string(),
        email: "carlos.diaz@example.com".to_string(),
        occupation: "Ingeniero".to_string(),
        employer: "Constructora Diaz".to_string(),
        job_title: "Director".to_string(),
        monthly_income: 4500.0,
        source_of_funds: "Salario".to_string(),
        nit: Some("NIT-4421".to_string()),
        ruc: None,
        is_pep: false,
    }
}

#[cfg(test)]
mod invariant_tests {
    use super::*;

    #[test]
    fn valid_record_passes() {
        assert!(valid_client().validate().is_ok());
    }

    #[test]
    fn name_and_cedula_are_mandatory() {
        let mut no_name = valid_client();
        no_name.full_name = String::new();
        assert!(matches!(no_name.validate(), Err(AppError::BadRequest(_))));

        let mut blank_name = valid_client();
        blank_name.full_name = "   ".to_string();
        assert!(matches!(blank_name.validate(), Err(AppError::BadRequest(_))));

        let mut no_cedula = valid_client();
        no_cedula.cedula = String::new();
        assert!(matches!(no_cedula.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn income_must_be_finite_and_non_negative() {
        let mut negative = valid_client();
        negative.monthly_income = -1.0;
        assert!(matches!(negative.validate(), Err(AppError::BadRequest(_))));

        let mut nan = valid_client();
        nan.monthly_income = f64::NAN;
        assert!(matches!(nan.validate(), Err(AppError::BadRequest(_))));

        let mut zero = valid_client();
        zero.monthly_income = 0.0;
        assert!(zero.validate().is_ok());
    }

    #[test]
    fn everything_else_may_be_empty() {
        let mut sparse = valid_client();
        sparse.passport = None;
        sparse.birth_date = String::new();
        sparse.marital_status = String::new();
        sparse.address = String::new();
        sparse.phone = String::new();
        sparse.email = String::new();
        sparse.occupation = String::new();
        sparse.employer = String::new();
        sparse.job_title = String::new();
        sparse.source_of_funds = String::new();
        sparse.nit = None;
        sparse.ruc = None;

        assert!(sparse.validate().is_ok());
    }

    #[test]
    fn suspicious_contact_data_is_diagnostic_only() {
        // Bad email or phone must never fail the request; the mapping engine
        // copies whatever text is there onto the form
        let mut odd = valid_client();
        odd.email = "not-an-email".to_string();
        odd.phone = "123".to_string();
        assert!(odd.validate().is_ok());
    }

    #[test]
    fn optional_tax_ids_default_to_empty() {
        let mut client = valid_client();
        client.nit = None;
        client.ruc = None;
        assert_eq!(client.nit_or_empty(), "");
        assert_eq!(client.ruc_or_empty(), "");

        client.ruc = Some("155612345-2-2015".to_string());
        assert_eq!(client.ruc_or_empty(), "155612345-2-2015");
    }
}

#[cfg(test)]
mod email_validation_tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("test.user@example.com"));
        assert!(is_valid_email("user+tag@example.co.uk"));
        assert!(is_valid_email("user_name@example-domain.com"));
    }

    #[test]
    fn test_invalid_emails_basic() {
        // Missing @ or .
        assert!(!is_valid_email("userexample.com"));
        assert!(!is_valid_email("user@examplecom"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));

        // Too short
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_invalid_emails_fake_patterns() {
        // Repeated digits (common fake patterns)
        assert!(!is_valid_email("6999999999@gmail.com"));
        assert!(!is_valid_email("user999999@example.com"));
        assert!(!is_valid_email("1111111111@gmail.com"));
        assert!(!is_valid_email("000000@example.com"));
        assert!(!is_valid_email("test123456789@example.com"));
    }
}

#[cfg(test)]
mod phone_validation_tests {
    use super::*;

    #[test]
    fn test_valid_panamanian_mobiles() {
        // Mobile numbers are 8 digits starting with 6
        let (valid, normalized) = validate_pa_phone("61234567");
        assert!(valid);
        assert_eq!(normalized, "+50761234567");

        // With formatting
        let (valid, normalized) = validate_pa_phone("6123-4567");
        assert!(valid);
        assert_eq!(normalized, "+50761234567");

        // With country code
        let (valid, normalized) = validate_pa_phone("+507 6123 4567");
        assert!(valid);
        assert_eq!(normalized, "+50761234567");
    }

    #[test]
    fn test_valid_panamanian_landlines() {
        // Landlines are 7 digits
        let (valid, normalized) = validate_pa_phone("2234567");
        assert!(valid);
        assert_eq!(normalized, "+5072234567");
    }

    #[test]
    fn test_invalid_phones() {
        // Too short
        let (valid, _) = validate_pa_phone("123");
        assert!(!valid);

        // Empty
        let (valid, _) = validate_pa_phone("");
        assert!(!valid);

        // Only spaces
        let (valid, _) = validate_pa_phone("   ");
        assert!(!valid);

        // Wrong country and wrong length
        let (valid, _) = validate_pa_phone("+1234567890");
        assert!(!valid);
    }
}
