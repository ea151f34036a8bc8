// xats-common/src/validation/limits.rs
use serde_json::Value;

use super::structural::Checker;
use super::ValidationReport;
use crate::model::limits::CompositionLimits;

const DEEP_NESTING_WARNING: usize = 64;

pub fn validate_limits_value(limits: &Value) -> ValidationReport {
    let mut c = Checker::default();
    if let Some(obj) = c.object(limits, "$") {
        c.unsigned(obj, "maxFileSize", "$", false);
        c.unsigned(obj, "maxTotalFiles", "$", false);
        c.unsigned(obj, "maxDepth", "$", false);
        c.string_array(obj, "allowedExtensions", "$", false);
    }
    if !c.errors.is_empty() {
        return ValidationReport::from_errors(c.errors);
    }
    match serde_json::from_value::<CompositionLimits>(limits.clone()) {
        Ok(parsed) => validate_limits(&parsed),
        Err(e) => ValidationReport::from_errors(vec![format!("limits: {e}")]),
    }
}

pub fn validate_limits(limits: &CompositionLimits) -> ValidationReport {
    let mut report = ValidationReport::ok();
    if limits.max_file_size == 0 {
        report.error("maxFileSize must be positive");
    }
    if limits.max_total_files == 0 {
        report.error("maxTotalFiles must be positive");
    }
    if limits.max_depth == 0 {
        report.error("maxDepth must be positive");
    } else if limits.max_depth > DEEP_NESTING_WARNING {
        report.warn(format!(
            "maxDepth {} allows unusually deep nesting",
            limits.max_depth
        ));
    }
    if limits.allowed_extensions.is_empty() {
        report.error("allowedExtensions must not be empty");
    }
    for ext in &limits.allowed_extensions {
        if !ext.starts_with('.') || ext.len() < 2 || ext.contains(['/', '\\']) {
            report.error(format!("allowed extension '{ext}' must look like '.json'"));
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_limits(&CompositionLimits::default()).valid);
        assert!(validate_limits_value(&json!({})).valid);
    }

    #[test]
    fn zero_and_malformed_values_fail() {
        let report = validate_limits_value(&json!({
            "maxDepth": 0,
            "allowedExtensions": ["json", ".xml"]
        }));
        assert_eq!(report.errors.len(), 2, "{:?}", report.errors);

        let typed = validate_limits_value(&json!({"maxFileSize": "big"}));
        assert!(!typed.valid);
    }
}
