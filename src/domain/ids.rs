//! Entity identifier types with validation
//!
//! Every relation exposed by the semantic layer is addressed by a qualified
//! name of the form `<namespace>.<relation>`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace of a queryable relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Typed, renamed projections of raw source tables
    Staging,
    /// Denormalized, classified compositions
    Business,
    /// Aggregated rollups
    Metrics,
    /// Normalized alert feed
    Alerts,
    /// Alias for materialized snapshots
    Cache,
}

impl Namespace {
    /// Returns the namespace as it appears in qualified names
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Staging => "staging",
            Namespace::Business => "business",
            Namespace::Metrics => "metrics",
            Namespace::Alerts => "alerts",
            Namespace::Cache => "cache",
        }
    }

    /// Returns the evaluation layer, `None` for the cache alias namespace
    pub fn layer(&self) -> Option<Layer> {
        match self {
            Namespace::Staging => Some(Layer::Staging),
            Namespace::Business => Some(Layer::Business),
            Namespace::Metrics => Some(Layer::Metrics),
            Namespace::Alerts => Some(Layer::Alerts),
            Namespace::Cache => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "staging" => Ok(Namespace::Staging),
            "business" => Ok(Namespace::Business),
            "metrics" => Ok(Namespace::Metrics),
            "alerts" => Ok(Namespace::Alerts),
            "cache" => Ok(Namespace::Cache),
            other => Err(format!(
                "Unknown namespace '{}'. Expected one of: staging, business, metrics, alerts, cache",
                other
            )),
        }
    }
}

/// Evaluation layer, ordered from the bottom of the pipeline upwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Layer {
    Staging,
    Business,
    Metrics,
    Alerts,
}

impl Layer {
    /// Whether an entity of this layer may read from an entity of `upstream`
    ///
    /// Staging reads only raw sources. Business and Metrics may also read
    /// their own layer; the alert feed reads strictly lower layers.
    pub fn may_depend_on(&self, upstream: Layer) -> bool {
        match self {
            Layer::Staging => false,
            Layer::Business | Layer::Metrics => upstream <= *self,
            Layer::Alerts => upstream < *self,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::Staging => "staging",
            Layer::Business => "business",
            Layer::Metrics => "metrics",
            Layer::Alerts => "alerts",
        };
        f.write_str(name)
    }
}

/// Qualified entity name newtype wrapper
///
/// A bare relation name defaults to the `business` namespace.
///
/// # Examples
///
/// ```
/// use hrms_semantic::domain::ids::{EntityName, Namespace};
/// use std::str::FromStr;
///
/// let name = EntityName::from_str("metrics.headcount_metrics").unwrap();
/// assert_eq!(name.namespace(), Namespace::Metrics);
/// assert_eq!(name.relation(), "headcount_metrics");
///
/// let bare = EntityName::from_str("employee_summary").unwrap();
/// assert_eq!(bare.to_string(), "business.employee_summary");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityName {
    namespace: Namespace,
    relation: String,
}

impl EntityName {
    /// Creates a new EntityName from a namespace and relation
    pub fn new(namespace: Namespace, relation: impl Into<String>) -> Result<Self, String> {
        let relation = relation.into();
        let relation = relation.trim();
        if relation.is_empty() {
            return Err("Entity relation name cannot be empty".to_string());
        }
        if !relation
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(format!(
                "Invalid relation name '{}': only letters, digits and '_' are allowed",
                relation
            ));
        }
        Ok(Self {
            namespace,
            relation: relation.to_lowercase(),
        })
    }

    /// Returns the namespace
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Returns the relation name without namespace
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Returns the evaluation layer, `None` for `cache.*` aliases
    pub fn layer(&self) -> Option<Layer> {
        self.namespace.layer()
    }

    /// Whether this name addresses the snapshot alias namespace
    pub fn is_cache_alias(&self) -> bool {
        self.namespace == Namespace::Cache
    }

    /// Name used for files and log records, e.g. `business.employee_summary`
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.namespace, self.relation)
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.relation)
    }
}

impl FromStr for EntityName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('.') {
            Some((namespace, relation)) => Self::new(namespace.parse()?, relation),
            None => Self::new(Namespace::Business, s),
        }
    }
}

impl TryFrom<String> for EntityName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityName> for String {
    fn from(name: EntityName) -> Self {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_name_parse() {
        let name = EntityName::from_str("staging.stg_payroll").unwrap();
        assert_eq!(name.namespace(), Namespace::Staging);
        assert_eq!(name.relation(), "stg_payroll");
        assert_eq!(name.layer(), Some(Layer::Staging));
    }

    #[test]
    fn test_bare_name_defaults_to_business() {
        let name = EntityName::from_str("employee_summary").unwrap();
        assert_eq!(name.namespace(), Namespace::Business);
    }

    #[test]
    fn test_cache_alias() {
        let name = EntityName::from_str("cache.employee_summary").unwrap();
        assert!(name.is_cache_alias());
        assert_eq!(name.layer(), None);
    }

    #[test]
    fn test_invalid_names() {
        assert!(EntityName::from_str("").is_err());
        assert!(EntityName::from_str("raw.employees").is_err());
        assert!(EntityName::from_str("business.bad name").is_err());
    }

    #[test]
    fn test_relation_is_lowercased() {
        let name = EntityName::from_str("Metrics.HeadCount_Metrics").unwrap();
        assert_eq!(name.to_string(), "metrics.headcount_metrics");
    }

    #[test]
    fn test_layer_dependency_rules() {
        assert!(Layer::Business.may_depend_on(Layer::Staging));
        assert!(Layer::Business.may_depend_on(Layer::Business));
        assert!(!Layer::Business.may_depend_on(Layer::Metrics));
        assert!(Layer::Metrics.may_depend_on(Layer::Business));
        assert!(Layer::Alerts.may_depend_on(Layer::Metrics));
        assert!(!Layer::Alerts.may_depend_on(Layer::Alerts));
        assert!(!Layer::Staging.may_depend_on(Layer::Staging));
    }

    #[test]
    fn test_serde_roundtrip_as_string() {
        let name = EntityName::from_str("metrics.activity_summary").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"metrics.activity_summary\"");
        let back: EntityName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
