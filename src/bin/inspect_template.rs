//! Utility to inspect a PDF template and print its declared field schema.
//!
//! Usage: `inspect_template <template.pdf> [institution_key]`
//!
//! With an institution key, also diffs the template's schema against that
//! profile's target fields, which is how new templates get vetted before
//! their URL goes into the environment.

use kyc_pdf_api::filler;
use kyc_pdf_api::registry::Registry;
use std::collections::HashSet;
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let path = args
        .next()
        .ok_or("usage: inspect_template <template.pdf> [institution_key]")?;
    let institution = args.next();

    let bytes = std::fs::read(&path)?;
    let mut schema = filler::field_schema(&bytes)?;
    schema.sort();

    println!("Template {} declares {} fields:", path, schema.len());
    for name in &schema {
        println!("- {}", name);
    }

    if let Some(key) = institution {
        let registry = Registry::new();
        let profile = registry
            .lookup(&key)
            .ok_or_else(|| format!("unknown institution '{}'", key))?;

        let declared: HashSet<&str> = schema.iter().map(String::as_str).collect();

        println!();
        println!(
            "Profile {} ({} fields) vs template:",
            profile.key(),
            profile.field_count()
        );
        let mut missing = 0;
        for (name, _) in profile.fields() {
            if declared.contains(name) {
                println!("  ok       {}", name);
            } else {
                println!("  MISSING  {}", name);
                missing += 1;
            }
        }
        println!();
        println!(
            "{} of {} profile fields present on the template",
            profile.field_count() - missing,
            profile.field_count()
        );
    }

    Ok(())
}
