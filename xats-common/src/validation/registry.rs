// xats-common/src/validation/registry.rs
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use super::structural::Checker;
use super::ValidationReport;
use crate::error::{Result, XatsError};
use crate::integrity::Integrity;
use crate::model::registry::{AuthKind, RegistryConfig, TrustLevel};
use crate::version::Constraint;

static MIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z0-9][a-z0-9!#$&^_.+-]*/[a-z0-9][a-z0-9!#$&^_.+-]*$").expect("mime pattern")
});

/// Validates a raw registry configuration document.
pub fn validate_registry(config: &Value) -> ValidationReport {
    let structural = check_structure(config);
    if !structural.is_empty() {
        debug!("Registry config failed structural validation with {} errors", structural.len());
        return ValidationReport::from_errors(structural);
    }
    match serde_json::from_value::<RegistryConfig>(config.clone()) {
        Ok(parsed) => validate_registry_config(&parsed),
        Err(e) => ValidationReport::from_errors(vec![format!("registry config: {e}")]),
    }
}

/// Validates, then deserializes. Warnings are logged; errors are returned together.
pub fn parse_registry_config(config: &Value) -> Result<RegistryConfig> {
    let report = validate_registry(config);
    for warning in &report.warnings {
        warn!("Registry config: {}", warning);
    }
    if !report.valid {
        return Err(XatsError::ValidationError(report.errors.join("; ")));
    }
    Ok(serde_json::from_value(config.clone())?)
}

/// Business rules over an already well-typed configuration.
pub fn validate_registry_config(config: &RegistryConfig) -> ValidationReport {
    let mut report = ValidationReport::ok();
    let mut registry_names = HashSet::new();

    for registry in &config.registries {
        let d = &registry.descriptor;
        let at = format!("registry '{}'", d.name);
        if !registry_names.insert(d.name.as_str()) {
            report.error(format!("{at}: duplicate registry name"));
        }
        if let Err(e) = Url::parse(&d.url) {
            report.error(format!("{at}: invalid url '{}': {e}", d.url));
        }
        if d.trust_level == TrustLevel::Verified
            && d.public_key.as_deref().is_none_or(|k| k.trim().is_empty())
        {
            report.error(format!("{at}: trust level 'verified' requires a publicKey"));
        }
        if d.public && d.authentication.is_none() {
            report.warn(format!("{at}: public registry has no authentication configured"));
        }

        let mut package_names = HashSet::new();
        for package in &registry.packages {
            let at = format!("{at} package '{}'", package.name);
            if !package_names.insert(package.name.as_str()) {
                report.error(format!("{at}: duplicate package name"));
            }
            if !package.versions.contains_key(&package.latest) {
                report.error(format!(
                    "{at}: latest '{}' is not one of its versions",
                    package.latest
                ));
            }
            for (key, record) in &package.versions {
                let at = format!("{at} version '{key}'");
                if &record.version != key {
                    report.error(format!(
                        "{at}: record declares version '{}'",
                        record.version
                    ));
                }
                if !Integrity::is_well_formed(&record.integrity) {
                    report.error(format!("{at}: invalid integrity '{}'", record.integrity));
                }
                if record.deprecated
                    && record
                        .deprecation_message
                        .as_deref()
                        .is_none_or(|m| m.trim().is_empty())
                {
                    report.warn(format!("{at}: deprecated without a deprecationMessage"));
                }
                for (dep, constraint) in &record.dependencies {
                    if Constraint::parse(constraint).is_err() {
                        report.error(format!(
                            "{at}: dependency '{dep}' has invalid constraint '{constraint}'"
                        ));
                    }
                }
                for file in &record.files {
                    if !Integrity::is_well_formed(&file.integrity) {
                        report.error(format!(
                            "{at} file '{}': invalid integrity '{}'",
                            file.path, file.integrity
                        ));
                    }
                    if let Some(mime) = &file.mime_type {
                        if !MIME_RE.is_match(mime) {
                            report.error(format!(
                                "{at} file '{}': invalid mimeType '{mime}'",
                                file.path
                            ));
                        }
                    }
                }
            }
        }
    }
    report
}

fn check_structure(config: &Value) -> Vec<String> {
    let mut c = Checker::default();
    let Some(root) = c.object(config, "$") else {
        return c.errors;
    };
    let Some(registries) = c.required(root, "registries", "$") else {
        return c.errors;
    };
    let Some(registries) = c.array(registries, "$.registries") else {
        return c.errors;
    };
    for (i, registry) in registries.iter().enumerate() {
        let at = format!("$.registries[{i}]");
        if let Some(obj) = c.object(registry, &at) {
            check_registry(&mut c, obj, &at);
        }
    }
    c.errors
}

fn check_registry(c: &mut Checker, obj: &Map<String, Value>, at: &str) {
    c.string(obj, "name", at, true);
    c.string(obj, "url", at, true);
    c.string(obj, "apiVersion", at, true);
    c.one_of(obj, "trustLevel", at, true, &TrustLevel::ALL);
    c.string(obj, "publicKey", at, false);
    c.boolean(obj, "public", at, false);
    if let Some(auth) = c.nested(obj, "authentication", at, false) {
        let at = format!("{at}.authentication");
        c.one_of(auth, "type", &at, true, &AuthKind::ALL);
        c.string(auth, "tokenEnv", &at, false);
    }
    let Some(packages) = obj.get("packages") else {
        return;
    };
    let Some(packages) = c.array(packages, &format!("{at}.packages")) else {
        return;
    };
    for (i, package) in packages.iter().enumerate() {
        let at = format!("{at}.packages[{i}]");
        let Some(pkg) = c.object(package, &at) else {
            continue;
        };
        c.string(pkg, "name", &at, true);
        c.string(pkg, "title", &at, true);
        c.string(pkg, "description", &at, false);
        c.string(pkg, "latest", &at, true);
        if let Some(versions) = c.nested(pkg, "versions", &at, true) {
            for (key, record) in versions {
                let at = format!("{at}.versions['{key}']");
                if let Some(rec) = c.object(record, &at) {
                    check_version(c, rec, &at);
                }
            }
        }
    }
}

fn check_version(c: &mut Checker, rec: &Map<String, Value>, at: &str) {
    c.string(rec, "version", at, true);
    c.string(rec, "integrity", at, true);
    c.unsigned(rec, "size", at, true);
    c.string(rec, "published", at, true);
    if let Some(published) = rec.get("published").and_then(Value::as_str) {
        if chrono::DateTime::parse_from_rfc3339(published).is_err() {
            c.errors
                .push(format!("{at}.published must be an RFC 3339 timestamp, got '{published}'"));
        }
    }
    c.boolean(rec, "deprecated", at, false);
    c.string(rec, "deprecationMessage", at, false);
    if let Some(deps) = c.nested(rec, "dependencies", at, false) {
        for key in deps.keys() {
            c.string(deps, key, &format!("{at}.dependencies"), true);
        }
    }
    if let Some(files) = rec.get("files") {
        if let Some(files) = c.array(files, &format!("{at}.files")) {
            for (i, file) in files.iter().enumerate() {
                let at = format!("{at}.files[{i}]");
                if let Some(f) = c.object(file, &at) {
                    c.string(f, "path", &at, true);
                    c.string(f, "type", &at, true);
                    c.unsigned(f, "size", &at, true);
                    c.string(f, "integrity", &at, true);
                    c.string(f, "mimeType", &at, false);
                }
            }
        }
    }
}
