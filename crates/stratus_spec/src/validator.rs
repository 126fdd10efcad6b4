//! Manifest validation utilities.

use std::collections::HashSet;

use regex::Regex;

use crate::catalog::KindCatalog;
use crate::models::Manifest;

/// Pattern a logical name must match.
const NAME_PATTERN: &str = r"^[a-z0-9][a-z0-9-]*$";

/// Validation result with details.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Validator for resource manifests.
pub struct ManifestValidator;

impl ManifestValidator {
    /// Validate a manifest against the given kind catalog.
    pub fn validate(manifest: &Manifest, catalog: &KindCatalog) -> ValidationResult {
        let mut result = ValidationResult::new();

        if manifest.name.is_empty() {
            result.add_error("Manifest name cannot be empty");
        }

        if manifest.resources.is_empty() {
            result.add_warning("Manifest declares no resources");
        }

        let name_re = Regex::new(NAME_PATTERN).ok();
        let mut seen: HashSet<&str> = HashSet::new();

        for node in &manifest.resources {
            if node.name.is_empty() {
                result.add_error("Resource with empty logical name");
                continue;
            }
            if let Some(re) = &name_re {
                if !re.is_match(&node.name) {
                    result.add_error(format!(
                        "Invalid logical name '{}' (expected lowercase letters, digits, dashes)",
                        node.name
                    ));
                }
            }
            if !seen.insert(node.name.as_str()) {
                result.add_error(format!("Duplicate logical name '{}'", node.name));
            }
            if node.kind.is_empty() {
                result.add_error(format!("Resource '{}' has no kind", node.name));
            } else if !catalog.contains(&node.kind) {
                result.add_warning(format!(
                    "Resource '{}' has unrecognized kind '{}' (planned with default schema)",
                    node.name, node.kind
                ));
            }
        }

        for lookup in &manifest.lookups {
            if lookup.name.is_empty() {
                result.add_error("Lookup with empty logical name");
                continue;
            }
            if !seen.insert(lookup.name.as_str()) {
                result.add_error(format!(
                    "Lookup '{}' collides with another declared name",
                    lookup.name
                ));
            }
        }

        result.merge(Self::validate_references(manifest, &seen));
        result
    }

    /// Cross-validate explicit dependencies and property references.
    fn validate_references(manifest: &Manifest, known: &HashSet<&str>) -> ValidationResult {
        let mut result = ValidationResult::new();
        let resource_names: HashSet<&str> =
            manifest.resources.iter().map(|r| r.name.as_str()).collect();

        for node in &manifest.resources {
            for dep in &node.depends_on {
                if dep == &node.name {
                    result.add_error(format!("Resource '{}' depends on itself", node.name));
                } else if !resource_names.contains(dep.as_str()) {
                    result.add_error(format!(
                        "Resource '{}' depends on unknown resource '{}'",
                        node.name, dep
                    ));
                }
            }
            for reference in node.references() {
                if reference.target == node.name {
                    result.add_error(format!("Resource '{}' references itself", node.name));
                } else if !known.contains(reference.target.as_str()) {
                    result.add_error(format!(
                        "Resource '{}' references unknown name '{}'",
                        node.name, reference.target
                    ));
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataLookup, ResourceNode};
    use serde_json::json;

    fn catalog() -> KindCatalog {
        KindCatalog::builtin()
    }

    #[test]
    fn test_valid_manifest() {
        let manifest = Manifest::new("webapp")
            .with_resource(ResourceNode::new("vpc", "network/vpc"))
            .with_resource(
                ResourceNode::new("db", "database/instance")
                    .with_property("vpc_id", json!("${vpc.id}")),
            );

        let result = ManifestValidator::validate(&manifest, &catalog());
        assert!(result.valid, "errors: {:?}", result.errors);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let manifest = Manifest::new("webapp")
            .with_resource(ResourceNode::new("vpc", "network/vpc"))
            .with_resource(ResourceNode::new("vpc", "network/subnet"));

        let result = ManifestValidator::validate(&manifest, &catalog());
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("Duplicate")));
    }

    #[test]
    fn test_missing_reference_rejected() {
        let manifest = Manifest::new("webapp").with_resource(
            ResourceNode::new("db", "database/instance")
                .with_property("vpc_id", json!("${vpc.id}")),
        );

        let result = ManifestValidator::validate(&manifest, &catalog());
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("unknown name 'vpc'")));
    }

    #[test]
    fn test_self_dependency_rejected() {
        let manifest = Manifest::new("webapp")
            .with_resource(ResourceNode::new("vpc", "network/vpc").with_dependency("vpc"));

        let result = ManifestValidator::validate(&manifest, &catalog());
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("depends on itself")));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let manifest =
            Manifest::new("webapp").with_resource(ResourceNode::new("My_VPC", "network/vpc"));

        let result = ManifestValidator::validate(&manifest, &catalog());
        assert!(!result.valid);
    }

    #[test]
    fn test_unknown_kind_is_warning() {
        let manifest =
            Manifest::new("webapp").with_resource(ResourceNode::new("bucket", "storage/bucket"));

        let result = ManifestValidator::validate(&manifest, &catalog());
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_lookup_name_collision() {
        let manifest = Manifest::new("webapp")
            .with_resource(ResourceNode::new("ami", "network/vpc"))
            .with_lookup(DataLookup::new("ami", "aws/ami"));

        let result = ManifestValidator::validate(&manifest, &catalog());
        assert!(!result.valid);
    }

    #[test]
    fn test_reference_to_lookup_is_valid() {
        let manifest = Manifest::new("webapp")
            .with_lookup(DataLookup::new("base-ami", "aws/ami"))
            .with_resource(
                ResourceNode::new("web", "compute/instance")
                    .with_property("ami_id", json!("${base-ami.id}")),
            );

        let result = ManifestValidator::validate(&manifest, &catalog());
        assert!(result.valid, "errors: {:?}", result.errors);
    }
}
