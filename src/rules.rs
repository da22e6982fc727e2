//! The rule table: every check the comparison can report, with its default
//! severity policy and message template.
//!
//! Rule names are a public contract. Once published, a name keeps its meaning;
//! new distinctions get new names.
//!
//! Severities are data, not code. A [`RuleTable`] starts from the defaults
//! below and can be overridden per rule, either programmatically or from a
//! YAML/JSON rules file:
//!
//! ```yaml
//! severity:
//!   path-removed: warning
//!   maximum-tightened: { request: error, response: error }
//!   parameter-removed: { optional: info, required: error }
//! ignore:
//!   - operation-id-changed
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{Direction, Severity};

/// Identifier of a single comparison rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    PathAdded,
    PathRemoved,
    OperationAdded,
    OperationRemoved,
    OperationIdChanged,
    DeprecatedAdded,
    DeprecatedRemoved,
    RequiredParameterAdded,
    OptionalParameterAdded,
    ParameterRemoved,
    ParameterBecameRequired,
    ParameterBecameOptional,
    ParameterSerializationChanged,
    RequestBodyAdded,
    RequestBodyRemoved,
    RequestBodyBecameRequired,
    RequestBodyBecameOptional,
    MediaTypeAdded,
    MediaTypeRemoved,
    ResponseAdded,
    ResponseRemoved,
    ResponseHeaderAdded,
    ResponseHeaderRemoved,
    ResponseHeaderBecameRequired,
    ResponseHeaderBecameOptional,
    TypeChanged,
    FormatChanged,
    NullableAdded,
    NullableRemoved,
    EnumValueAdded,
    EnumValueRemoved,
    EnumConstraintAdded,
    EnumConstraintRemoved,
    MaximumTightened,
    MaximumLoosened,
    MinimumTightened,
    MinimumLoosened,
    MaxLengthTightened,
    MaxLengthLoosened,
    MinLengthTightened,
    MinLengthLoosened,
    MaxItemsTightened,
    MaxItemsLoosened,
    MinItemsTightened,
    MinItemsLoosened,
    UniqueItemsAdded,
    UniqueItemsRemoved,
    PatternAdded,
    PatternRemoved,
    PatternChanged,
    MultipleOfChanged,
    DefaultValueChanged,
    AccessModeChanged,
    DiscriminatorChanged,
    PropertyAdded,
    RequiredRequestPropertyAdded,
    RequiredResponsePropertyAdded,
    PropertyRemoved,
    PropertyBecameRequired,
    PropertyBecameOptional,
    AdditionalPropertiesAdded,
    AdditionalPropertiesRemoved,
    CompositionChanged,
    SecurityRequirementAdded,
    SecurityRequirementRemoved,
    SecurityScopeAdded,
    SecurityScopeRemoved,
    SecuritySchemeTypeChanged,
    ServerAdded,
    ServerRemoved,
    ServerUrlChanged,
    UnresolvedReference,
    StructuralMismatch,
}

/// How the severity of a rule is chosen for a concrete change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeverityPolicy {
    /// Always the same severity.
    Fixed(Severity),
    /// Depends on whether the affected node is sent or received by the client.
    ByDirection {
        request: Severity,
        response: Severity,
    },
    /// Depends on whether the affected element was required.
    ByRequirement {
        optional: Severity,
        required: Severity,
    },
}

/// Constraint made stricter: rejects previously valid values.
const TIGHTENED: SeverityPolicy = SeverityPolicy::ByDirection {
    request: Severity::Warning,
    response: Severity::Error,
};

/// Constraint relaxed: accepts previously invalid values.
const LOOSENED: SeverityPolicy = SeverityPolicy::ByDirection {
    request: Severity::Info,
    response: Severity::Warning,
};

/// Facts about a change that a [`SeverityPolicy`] may depend on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleContext {
    pub direction: Option<Direction>,
    pub required: bool,
}

impl RuleContext {
    pub fn directional(direction: Direction) -> Self {
        Self {
            direction: Some(direction),
            required: false,
        }
    }

    pub fn requirement(required: bool) -> Self {
        Self {
            direction: None,
            required,
        }
    }
}

impl SeverityPolicy {
    /// Resolve the severity for a concrete change.
    ///
    /// A directional policy evaluated without a direction takes the stricter
    /// of its two severities.
    pub fn severity(&self, context: RuleContext) -> Severity {
        match *self {
            SeverityPolicy::Fixed(severity) => severity,
            SeverityPolicy::ByDirection { request, response } => match context.direction {
                Some(Direction::Request) => request,
                Some(Direction::Response) => response,
                None => request.max(response),
            },
            SeverityPolicy::ByRequirement { optional, required } => {
                if context.required {
                    required
                } else {
                    optional
                }
            }
        }
    }
}

impl fmt::Display for SeverityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeverityPolicy::Fixed(severity) => write!(f, "{}", severity),
            SeverityPolicy::ByDirection { request, response } => {
                write!(f, "request: {}, response: {}", request, response)
            }
            SeverityPolicy::ByRequirement { optional, required } => {
                write!(f, "optional: {}, required: {}", optional, required)
            }
        }
    }
}

/// Static description of one rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleDefinition {
    pub name: &'static str,
    pub policy: SeverityPolicy,
    /// Message with positional `{0}`, `{1}`, ... placeholders.
    pub template: &'static str,
}

impl RuleId {
    pub const ALL: &'static [RuleId] = &[
        RuleId::PathAdded,
        RuleId::PathRemoved,
        RuleId::OperationAdded,
        RuleId::OperationRemoved,
        RuleId::OperationIdChanged,
        RuleId::DeprecatedAdded,
        RuleId::DeprecatedRemoved,
        RuleId::RequiredParameterAdded,
        RuleId::OptionalParameterAdded,
        RuleId::ParameterRemoved,
        RuleId::ParameterBecameRequired,
        RuleId::ParameterBecameOptional,
        RuleId::ParameterSerializationChanged,
        RuleId::RequestBodyAdded,
        RuleId::RequestBodyRemoved,
        RuleId::RequestBodyBecameRequired,
        RuleId::RequestBodyBecameOptional,
        RuleId::MediaTypeAdded,
        RuleId::MediaTypeRemoved,
        RuleId::ResponseAdded,
        RuleId::ResponseRemoved,
        RuleId::ResponseHeaderAdded,
        RuleId::ResponseHeaderRemoved,
        RuleId::ResponseHeaderBecameRequired,
        RuleId::ResponseHeaderBecameOptional,
        RuleId::TypeChanged,
        RuleId::FormatChanged,
        RuleId::NullableAdded,
        RuleId::NullableRemoved,
        RuleId::EnumValueAdded,
        RuleId::EnumValueRemoved,
        RuleId::EnumConstraintAdded,
        RuleId::EnumConstraintRemoved,
        RuleId::MaximumTightened,
        RuleId::MaximumLoosened,
        RuleId::MinimumTightened,
        RuleId::MinimumLoosened,
        RuleId::MaxLengthTightened,
        RuleId::MaxLengthLoosened,
        RuleId::MinLengthTightened,
        RuleId::MinLengthLoosened,
        RuleId::MaxItemsTightened,
        RuleId::MaxItemsLoosened,
        RuleId::MinItemsTightened,
        RuleId::MinItemsLoosened,
        RuleId::UniqueItemsAdded,
        RuleId::UniqueItemsRemoved,
        RuleId::PatternAdded,
        RuleId::PatternRemoved,
        RuleId::PatternChanged,
        RuleId::MultipleOfChanged,
        RuleId::DefaultValueChanged,
        RuleId::AccessModeChanged,
        RuleId::DiscriminatorChanged,
        RuleId::PropertyAdded,
        RuleId::RequiredRequestPropertyAdded,
        RuleId::RequiredResponsePropertyAdded,
        RuleId::PropertyRemoved,
        RuleId::PropertyBecameRequired,
        RuleId::PropertyBecameOptional,
        RuleId::AdditionalPropertiesAdded,
        RuleId::AdditionalPropertiesRemoved,
        RuleId::CompositionChanged,
        RuleId::SecurityRequirementAdded,
        RuleId::SecurityRequirementRemoved,
        RuleId::SecurityScopeAdded,
        RuleId::SecurityScopeRemoved,
        RuleId::SecuritySchemeTypeChanged,
        RuleId::ServerAdded,
        RuleId::ServerRemoved,
        RuleId::ServerUrlChanged,
        RuleId::UnresolvedReference,
        RuleId::StructuralMismatch,
    ];

    /// The full rule table, one row per rule.
    pub fn definition(self) -> RuleDefinition {
        use Severity::{Error, Info, Warning};
        use SeverityPolicy::{ByDirection, ByRequirement, Fixed};

        let (name, policy, template) = match self {
            RuleId::PathAdded => ("path-added", Fixed(Info), "The path '{0}' was added."),
            RuleId::PathRemoved => ("path-removed", Fixed(Error), "The path '{0}' was removed."),
            RuleId::OperationAdded => (
                "operation-added",
                Fixed(Info),
                "The operation '{0}' was added.",
            ),
            RuleId::OperationRemoved => (
                "operation-removed",
                Fixed(Error),
                "The operation '{0}' was removed.",
            ),
            RuleId::OperationIdChanged => (
                "operation-id-changed",
                Fixed(Warning),
                "The operationId changed from '{0}' to '{1}'.",
            ),
            RuleId::DeprecatedAdded => (
                "deprecated-added",
                Fixed(Warning),
                "'{0}' is now deprecated.",
            ),
            RuleId::DeprecatedRemoved => (
                "deprecated-removed",
                Fixed(Info),
                "'{0}' is no longer deprecated.",
            ),
            RuleId::RequiredParameterAdded => (
                "required-parameter-added",
                Fixed(Error),
                "The required {1} parameter '{0}' was added.",
            ),
            RuleId::OptionalParameterAdded => (
                "optional-parameter-added",
                Fixed(Warning),
                "The optional {1} parameter '{0}' was added.",
            ),
            RuleId::ParameterRemoved => (
                "parameter-removed",
                ByRequirement {
                    optional: Warning,
                    required: Error,
                },
                "The {1} parameter '{0}' was removed.",
            ),
            RuleId::ParameterBecameRequired => (
                "parameter-became-required",
                Fixed(Error),
                "The {1} parameter '{0}' is now required.",
            ),
            RuleId::ParameterBecameOptional => (
                "parameter-became-optional",
                Fixed(Info),
                "The {1} parameter '{0}' is no longer required.",
            ),
            RuleId::ParameterSerializationChanged => (
                "parameter-serialization-changed",
                Fixed(Warning),
                "The serialization of the {1} parameter '{0}' changed: {2}.",
            ),
            RuleId::RequestBodyAdded => (
                "request-body-added",
                ByRequirement {
                    optional: Info,
                    required: Error,
                },
                "A request body was added to '{0}'.",
            ),
            RuleId::RequestBodyRemoved => (
                "request-body-removed",
                Fixed(Warning),
                "The request body of '{0}' was removed.",
            ),
            RuleId::RequestBodyBecameRequired => (
                "request-body-became-required",
                Fixed(Error),
                "The request body of '{0}' is now required.",
            ),
            RuleId::RequestBodyBecameOptional => (
                "request-body-became-optional",
                Fixed(Info),
                "The request body of '{0}' is no longer required.",
            ),
            RuleId::MediaTypeAdded => (
                "media-type-added",
                Fixed(Info),
                "The media type '{0}' is now supported.",
            ),
            RuleId::MediaTypeRemoved => (
                "media-type-removed",
                Fixed(Error),
                "The media type '{0}' is no longer supported.",
            ),
            RuleId::ResponseAdded => (
                "response-added",
                Fixed(Info),
                "The response '{0}' was added.",
            ),
            RuleId::ResponseRemoved => (
                "response-removed",
                Fixed(Error),
                "The response '{0}' was removed.",
            ),
            RuleId::ResponseHeaderAdded => (
                "response-header-added",
                Fixed(Info),
                "The response header '{0}' was added.",
            ),
            RuleId::ResponseHeaderRemoved => (
                "response-header-removed",
                ByRequirement {
                    optional: Warning,
                    required: Error,
                },
                "The response header '{0}' was removed.",
            ),
            RuleId::ResponseHeaderBecameRequired => (
                "response-header-became-required",
                Fixed(Info),
                "The response header '{0}' is now always sent.",
            ),
            RuleId::ResponseHeaderBecameOptional => (
                "response-header-became-optional",
                Fixed(Warning),
                "The response header '{0}' is no longer guaranteed.",
            ),
            RuleId::TypeChanged => (
                "type-changed",
                Fixed(Error),
                "The type changed from '{0}' to '{1}'.",
            ),
            RuleId::FormatChanged => (
                "format-changed",
                Fixed(Error),
                "The format changed from '{0}' to '{1}'.",
            ),
            RuleId::NullableAdded => ("nullable-added", Fixed(Info), "The value may now be null."),
            RuleId::NullableRemoved => (
                "nullable-removed",
                Fixed(Error),
                "The value may no longer be null.",
            ),
            RuleId::EnumValueAdded => (
                "enum-value-added",
                ByDirection {
                    request: Info,
                    response: Warning,
                },
                "The enum value {0} was added.",
            ),
            RuleId::EnumValueRemoved => (
                "enum-value-removed",
                Fixed(Error),
                "The enum value {0} was removed.",
            ),
            RuleId::EnumConstraintAdded => (
                "enum-constraint-added",
                TIGHTENED,
                "The value is now restricted to {0}.",
            ),
            RuleId::EnumConstraintRemoved => (
                "enum-constraint-removed",
                LOOSENED,
                "The value is no longer restricted to {0}.",
            ),
            RuleId::MaximumTightened => (
                "maximum-tightened",
                TIGHTENED,
                "The maximum changed from {0} to {1}.",
            ),
            RuleId::MaximumLoosened => (
                "maximum-loosened",
                LOOSENED,
                "The maximum changed from {0} to {1}.",
            ),
            RuleId::MinimumTightened => (
                "minimum-tightened",
                TIGHTENED,
                "The minimum changed from {0} to {1}.",
            ),
            RuleId::MinimumLoosened => (
                "minimum-loosened",
                LOOSENED,
                "The minimum changed from {0} to {1}.",
            ),
            RuleId::MaxLengthTightened => (
                "max-length-tightened",
                TIGHTENED,
                "The maxLength changed from {0} to {1}.",
            ),
            RuleId::MaxLengthLoosened => (
                "max-length-loosened",
                LOOSENED,
                "The maxLength changed from {0} to {1}.",
            ),
            RuleId::MinLengthTightened => (
                "min-length-tightened",
                TIGHTENED,
                "The minLength changed from {0} to {1}.",
            ),
            RuleId::MinLengthLoosened => (
                "min-length-loosened",
                LOOSENED,
                "The minLength changed from {0} to {1}.",
            ),
            RuleId::MaxItemsTightened => (
                "max-items-tightened",
                TIGHTENED,
                "The maxItems changed from {0} to {1}.",
            ),
            RuleId::MaxItemsLoosened => (
                "max-items-loosened",
                LOOSENED,
                "The maxItems changed from {0} to {1}.",
            ),
            RuleId::MinItemsTightened => (
                "min-items-tightened",
                TIGHTENED,
                "The minItems changed from {0} to {1}.",
            ),
            RuleId::MinItemsLoosened => (
                "min-items-loosened",
                LOOSENED,
                "The minItems changed from {0} to {1}.",
            ),
            RuleId::UniqueItemsAdded => (
                "unique-items-added",
                TIGHTENED,
                "Array items must now be unique.",
            ),
            RuleId::UniqueItemsRemoved => (
                "unique-items-removed",
                LOOSENED,
                "Array items no longer need to be unique.",
            ),
            RuleId::PatternAdded => (
                "pattern-added",
                TIGHTENED,
                "The value must now match the pattern '{0}'.",
            ),
            RuleId::PatternRemoved => (
                "pattern-removed",
                LOOSENED,
                "The value no longer needs to match the pattern '{0}'.",
            ),
            RuleId::PatternChanged => (
                "pattern-changed",
                Fixed(Warning),
                "The pattern changed from '{0}' to '{1}'.",
            ),
            RuleId::MultipleOfChanged => (
                "multiple-of-changed",
                Fixed(Warning),
                "The multipleOf changed from {0} to {1}.",
            ),
            RuleId::DefaultValueChanged => (
                "default-value-changed",
                Fixed(Warning),
                "The default value changed from {0} to {1}.",
            ),
            RuleId::AccessModeChanged => (
                "access-mode-changed",
                Fixed(Warning),
                "The access mode changed from '{0}' to '{1}'.",
            ),
            RuleId::DiscriminatorChanged => (
                "discriminator-changed",
                Fixed(Error),
                "The discriminator property changed from '{0}' to '{1}'.",
            ),
            RuleId::PropertyAdded => (
                "property-added",
                Fixed(Info),
                "The optional property '{0}' was added.",
            ),
            RuleId::RequiredRequestPropertyAdded => (
                "required-request-property-added",
                Fixed(Error),
                "The required property '{0}' was added to the request.",
            ),
            RuleId::RequiredResponsePropertyAdded => (
                "required-response-property-added",
                Fixed(Warning),
                "The required property '{0}' was added to the response.",
            ),
            RuleId::PropertyRemoved => (
                "property-removed",
                ByDirection {
                    request: Warning,
                    response: Error,
                },
                "The property '{0}' was removed.",
            ),
            RuleId::PropertyBecameRequired => (
                "property-became-required",
                ByDirection {
                    request: Error,
                    response: Info,
                },
                "The property '{0}' is now required.",
            ),
            RuleId::PropertyBecameOptional => (
                "property-became-optional",
                ByDirection {
                    request: Info,
                    response: Error,
                },
                "The property '{0}' is no longer required.",
            ),
            RuleId::AdditionalPropertiesAdded => (
                "additional-properties-added",
                LOOSENED,
                "Additional properties are now allowed.",
            ),
            RuleId::AdditionalPropertiesRemoved => (
                "additional-properties-removed",
                TIGHTENED,
                "Additional properties are no longer allowed.",
            ),
            RuleId::CompositionChanged => (
                "composition-changed",
                Fixed(Warning),
                "The {0} composition changed from {1} to {2} schemas.",
            ),
            RuleId::SecurityRequirementAdded => (
                "security-requirement-added",
                Fixed(Warning),
                "The security scheme '{0}' is now required.",
            ),
            RuleId::SecurityRequirementRemoved => (
                "security-requirement-removed",
                Fixed(Warning),
                "The security scheme '{0}' is no longer required.",
            ),
            RuleId::SecurityScopeAdded => (
                "security-scope-added",
                Fixed(Warning),
                "The scope '{1}' is now required for the security scheme '{0}'.",
            ),
            RuleId::SecurityScopeRemoved => (
                "security-scope-removed",
                Fixed(Info),
                "The scope '{1}' is no longer required for the security scheme '{0}'.",
            ),
            RuleId::SecuritySchemeTypeChanged => (
                "security-scheme-type-changed",
                Fixed(Warning),
                "The security scheme '{0}' changed from '{1}' to '{2}'.",
            ),
            RuleId::ServerAdded => ("server-added", Fixed(Info), "The server '{0}' was added."),
            RuleId::ServerRemoved => (
                "server-removed",
                Fixed(Warning),
                "The server '{0}' was removed.",
            ),
            RuleId::ServerUrlChanged => (
                "server-url-changed",
                Fixed(Warning),
                "The server URL changed from '{0}' to '{1}'.",
            ),
            RuleId::UnresolvedReference => (
                "unresolved-reference",
                Fixed(Error),
                "The reference could not be resolved: {0}.",
            ),
            RuleId::StructuralMismatch => (
                "structural-mismatch",
                Fixed(Error),
                "The node has an unexpected shape: {0}.",
            ),
        };

        RuleDefinition {
            name,
            policy,
            template,
        }
    }

    pub fn name(self) -> &'static str {
        self.definition().name
    }

    pub fn from_name(name: &str) -> Option<RuleId> {
        RuleId::ALL.iter().copied().find(|rule| rule.name() == name)
    }

    /// Fill the message template with positional arguments.
    pub fn render(self, args: &[&str]) -> String {
        let mut message = self.definition().template.to_string();
        for (i, arg) in args.iter().enumerate() {
            message = message.replace(&format!("{{{}}}", i), arg);
        }
        message
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Contents of a rules file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Severity overrides keyed by rule name.
    #[serde(default)]
    pub severity: IndexMap<String, SeverityPolicy>,
    /// Rules that must never produce a record.
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// One row of the effective rule table, for display.
#[derive(Debug, Clone, Serialize)]
pub struct RuleEntry {
    pub rule: RuleId,
    pub policy: SeverityPolicy,
    pub ignored: bool,
    pub template: &'static str,
}

/// Effective severity policies: the defaults plus any overrides.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    overrides: HashMap<RuleId, SeverityPolicy>,
    ignored: HashSet<RuleId>,
}

impl RuleTable {
    /// The default table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the severity policy of one rule.
    pub fn with_override(mut self, rule: RuleId, policy: SeverityPolicy) -> Self {
        self.overrides.insert(rule, policy);
        self
    }

    /// Suppress a rule entirely.
    pub fn ignore(mut self, rule: RuleId) -> Self {
        self.ignored.insert(rule);
        self
    }

    /// Build a table from a parsed rules file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownRule` for names that are not in the table.
    pub fn from_config(config: RuleConfig) -> Result<Self, ConfigError> {
        let mut table = RuleTable::new();
        for (name, policy) in config.severity {
            let rule = lookup(&name)?;
            table = table.with_override(rule, policy);
        }
        for name in config.ignore {
            let rule = lookup(&name)?;
            table = table.ignore(rule);
        }
        Ok(table)
    }

    /// Load a table from a YAML or JSON rules file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file can't be read, doesn't parse, or
    /// names an unknown rule.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        // YAML is a superset of JSON, so one parser covers both.
        let config: RuleConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(
            overrides = config.severity.len(),
            ignored = config.ignore.len(),
            "loaded rules file {}",
            path.display()
        );
        Self::from_config(config)
    }

    pub fn policy(&self, rule: RuleId) -> SeverityPolicy {
        self.overrides
            .get(&rule)
            .copied()
            .unwrap_or_else(|| rule.definition().policy)
    }

    pub fn is_ignored(&self, rule: RuleId) -> bool {
        self.ignored.contains(&rule)
    }

    /// Severity of a concrete change, or `None` if the rule is ignored.
    pub fn severity(&self, rule: RuleId, context: RuleContext) -> Option<Severity> {
        if self.is_ignored(rule) {
            return None;
        }
        Some(self.policy(rule).severity(context))
    }

    /// All rules with their effective policies, in table order.
    pub fn entries(&self) -> Vec<RuleEntry> {
        RuleId::ALL
            .iter()
            .map(|&rule| RuleEntry {
                rule,
                policy: self.policy(rule),
                ignored: self.is_ignored(rule),
                template: rule.definition().template,
            })
            .collect()
    }
}

fn lookup(name: &str) -> Result<RuleId, ConfigError> {
    RuleId::from_name(name).ok_or_else(|| ConfigError::UnknownRule {
        name: name.to_string(),
    })
}
