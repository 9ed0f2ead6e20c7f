//! Threshold configuration.
//!
//! Loads regression limits from TOML, merges command-line overrides and
//! validates the result into a flat list of [`ThresholdRule`]s.

use crate::diff::MetricFamily;
use crate::parser::HostIoType;
use crate::utils::error::ConfigError;
use log::{debug, warn};
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use toml::{Table, Value};

/// Field of the `gas` family
pub const GAS_INCREASE_FIELD: &str = "max_increase_percent";

/// Aggregate field of the `hostio` family
pub const HOSTIO_TOTAL_FIELD: &str = "max_total_calls_increase_percent";

const SCOPE_KEY: &str = "scope";
const RULE_KEY: &str = "rule";

/// Which numbers of a diff a rule is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    /// Profile-level totals
    #[default]
    Aggregate,
    /// Every call site entry of the family
    PerCallSite,
}

impl RuleScope {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleScope::Aggregate => "aggregate",
            RuleScope::PerCallSite => "per_call_site",
        }
    }
}

impl FromStr for RuleScope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aggregate" => Ok(RuleScope::Aggregate),
            "per_call_site" => Ok(RuleScope::PerCallSite),
            other => Err(ConfigError::InvalidScope(other.to_string())),
        }
    }
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric a rule's field resolves to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleTarget {
    TotalGas,
    TotalHostioCalls,
    HostioCalls(String),
}

impl RuleTarget {
    fn resolve(family: MetricFamily, field: &str) -> Result<Self, ConfigError> {
        let unknown = || ConfigError::UnknownField {
            family: family.to_string(),
            field: field.to_string(),
        };

        match family {
            MetricFamily::Gas if field == GAS_INCREASE_FIELD => Ok(RuleTarget::TotalGas),
            MetricFamily::Gas => Err(unknown()),
            MetricFamily::Hostio if field == HOSTIO_TOTAL_FIELD => Ok(RuleTarget::TotalHostioCalls),
            MetricFamily::Hostio => {
                let name = field
                    .strip_prefix("max_")
                    .and_then(|rest| rest.strip_suffix("_increase_percent"))
                    .filter(|name| !name.is_empty())
                    .ok_or_else(unknown)?;
                let hostio = HostIoType::from_str(name).map_err(|_| unknown())?;
                Ok(RuleTarget::HostioCalls(hostio.name().to_string()))
            }
        }
    }
}

/// One regression limit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdRule {
    family: MetricFamily,
    field: String,
    limit: f64,
    scope: RuleScope,
    #[serde(skip)]
    target: RuleTarget,
}

impl ThresholdRule {
    /// Validate and build a rule
    ///
    /// # Errors
    /// * `ConfigError::UnknownField` - field does not exist in the family
    /// * `ConfigError::InvalidLimit` - limit is NaN or infinite
    /// * `ConfigError::NegativeLimit` - limit is below zero
    pub fn new(
        family: MetricFamily,
        field: impl Into<String>,
        limit: f64,
        scope: RuleScope,
    ) -> Result<Self, ConfigError> {
        let field = field.into();
        let target = RuleTarget::resolve(family, &field)?;

        if !limit.is_finite() {
            return Err(ConfigError::InvalidLimit {
                family: family.to_string(),
                field,
                found: limit.to_string(),
            });
        }
        if limit < 0.0 {
            return Err(ConfigError::NegativeLimit {
                family: family.to_string(),
                field,
                limit,
            });
        }

        Ok(Self {
            family,
            field,
            limit,
            scope,
            target,
        })
    }

    /// Total gas limit over the whole profile
    pub fn gas_aggregate(limit: f64) -> Result<Self, ConfigError> {
        Self::new(MetricFamily::Gas, GAS_INCREASE_FIELD, limit, RuleScope::Aggregate)
    }

    /// Total hostio call limit over the whole profile
    pub fn hostio_aggregate(limit: f64) -> Result<Self, ConfigError> {
        Self::new(MetricFamily::Hostio, HOSTIO_TOTAL_FIELD, limit, RuleScope::Aggregate)
    }

    /// Gas limit applied to every call site
    pub fn gas_per_call_site(limit: f64) -> Result<Self, ConfigError> {
        Self::new(MetricFamily::Gas, GAS_INCREASE_FIELD, limit, RuleScope::PerCallSite)
    }

    pub fn family(&self) -> MetricFamily {
        self.family
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    pub fn scope(&self) -> RuleScope {
        self.scope
    }

    pub fn target(&self) -> &RuleTarget {
        &self.target
    }

    /// Two rules collide when they check the same metric in the same scope,
    /// whatever alias their field was spelled with
    fn same_rule(&self, other: &ThresholdRule) -> bool {
        self.target == other.target && self.scope == other.scope
    }

    fn duplicate_error(&self) -> ConfigError {
        ConfigError::DuplicateRule {
            family: self.family.to_string(),
            field: self.field.clone(),
            scope: self.scope.to_string(),
        }
    }
}

impl fmt::Display for ThresholdRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.family, self.field)?;
        if self.scope == RuleScope::PerCallSite {
            f.write_str(" (per call site)")?;
        }
        Ok(())
    }
}

/// Command-line limits that take precedence over the file
///
/// `percent` is the blanket `-p` limit. `gas_percent` and `hostio_percent`
/// focus the gate on their family: once either is set, rules of the other
/// family and per call site gas rules are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThresholdOverrides {
    /// Limit for aggregate gas, aggregate hostio calls and gas per call site
    pub percent: Option<f64>,
    /// Replaces the aggregate `gas.max_increase_percent` rule
    pub gas_percent: Option<f64>,
    /// Replaces the aggregate `hostio.max_total_calls_increase_percent` rule
    pub hostio_percent: Option<f64>,
}

impl ThresholdOverrides {
    pub fn is_empty(&self) -> bool {
        self.percent.is_none() && self.gas_percent.is_none() && self.hostio_percent.is_none()
    }

    /// True when a family-specific limit narrows the gate
    pub fn is_focused(&self) -> bool {
        self.gas_percent.is_some() || self.hostio_percent.is_some()
    }

    fn keeps(&self, rule: &ThresholdRule) -> bool {
        if !self.is_focused() {
            return true;
        }
        match rule.family {
            MetricFamily::Gas => self.gas_percent.is_some() && rule.scope == RuleScope::Aggregate,
            MetricFamily::Hostio => self.hostio_percent.is_some(),
        }
    }
}

/// Complete, validated set of threshold rules
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThresholdConfig {
    rules: Vec<ThresholdRule>,
}

impl ThresholdConfig {
    /// Build a config, rejecting two rules on the same metric and scope
    pub fn new(rules: Vec<ThresholdRule>) -> Result<Self, ConfigError> {
        for (i, rule) in rules.iter().enumerate() {
            if rules[..i].iter().any(|earlier| earlier.same_rule(rule)) {
                return Err(rule.duplicate_error());
            }
        }
        Ok(Self { rules })
    }

    /// No rules: the gate only reports the diff
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[ThresholdRule] {
        &self.rules
    }

    /// Parse a TOML threshold document
    ///
    /// # Errors
    /// * `ConfigError::Parse` - not valid TOML
    /// * `ConfigError::UnknownFamily` - top-level table other than `gas`, `hostio`, `rule`
    /// * any error from [`ThresholdRule::new`], plus `DuplicateRule`
    ///
    /// # Example
    /// ```ignore
    /// let config = ThresholdConfig::from_toml_str("[gas]\nmax_increase_percent = 5.0")?;
    /// assert_eq!(config.rules().len(), 1);
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let table: Table = contents.parse()?;
        let mut rules = Vec::new();

        for (key, value) in &table {
            if key == RULE_KEY {
                parse_rule_array(value, &mut rules)?;
                continue;
            }

            let family =
                MetricFamily::from_str(key).map_err(|_| ConfigError::UnknownFamily(key.clone()))?;
            let section = value.as_table().ok_or_else(|| ConfigError::UnknownField {
                family: key.clone(),
                field: "<not a table>".to_string(),
            })?;
            parse_family_table(family, section, &mut rules)?;
        }

        Self::new(rules)
    }

    /// Read and parse a TOML threshold file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply command-line overrides on top of the file rules
    ///
    /// Blanket `-p` rules go in first so that a family-specific limit
    /// replaces the blanket one for its aggregate. Focus filtering runs last.
    pub fn with_overrides(mut self, overrides: &ThresholdOverrides) -> Result<Self, ConfigError> {
        let mut replacements = Vec::new();
        if let Some(limit) = overrides.percent {
            replacements.push(ThresholdRule::gas_aggregate(limit)?);
            replacements.push(ThresholdRule::hostio_aggregate(limit)?);
            replacements.push(ThresholdRule::gas_per_call_site(limit)?);
        }
        if let Some(limit) = overrides.gas_percent {
            replacements.push(ThresholdRule::gas_aggregate(limit)?);
        }
        if let Some(limit) = overrides.hostio_percent {
            replacements.push(ThresholdRule::hostio_aggregate(limit)?);
        }

        for rule in replacements {
            match self.rules.iter_mut().find(|r| r.same_rule(&rule)) {
                Some(existing) => {
                    debug!("Override {} = {} (was {})", rule, rule.limit, existing.limit);
                    *existing = rule;
                }
                None => self.rules.push(rule),
            }
        }

        if overrides.is_focused() {
            let before = self.rules.len();
            self.rules.retain(|rule| overrides.keeps(rule));
            if self.rules.len() < before {
                debug!("Focused gating dropped {} rules", before - self.rules.len());
            }
        }
        Ok(self)
    }
}

/// Load threshold rules from an optional file plus overrides
///
/// **Public** - used by both `capture` and `diff`
///
/// A missing file is logged and treated as "no file rules"; the result
/// may be empty, which means diff-only gating. Any other read failure,
/// such as a permission error, is fatal.
///
/// # Errors
/// Any `ConfigError` from reading or validating the file or overrides
pub fn load_threshold_config(
    path: Option<&Path>,
    overrides: &ThresholdOverrides,
) -> Result<ThresholdConfig, ConfigError> {
    let base = match path {
        Some(path) => match ThresholdConfig::load(path) {
            Ok(config) => {
                debug!("Loaded {} threshold rules from {}", config.rules().len(), path.display());
                config
            }
            Err(ConfigError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                warn!("Threshold file {} not found; using overrides only", path.display());
                ThresholdConfig::empty()
            }
            Err(e) => return Err(e),
        },
        None => ThresholdConfig::empty(),
    };

    base.with_overrides(overrides)
}

fn parse_family_table(
    family: MetricFamily,
    section: &Table,
    rules: &mut Vec<ThresholdRule>,
) -> Result<(), ConfigError> {
    let scope = match section.get(SCOPE_KEY) {
        Some(value) => parse_scope(value)?,
        None => RuleScope::default(),
    };

    for (field, value) in section {
        if field == SCOPE_KEY {
            continue;
        }
        let limit = parse_limit(family, field, value)?;
        rules.push(ThresholdRule::new(family, field.as_str(), limit, scope)?);
    }
    Ok(())
}

fn parse_rule_array(value: &Value, rules: &mut Vec<ThresholdRule>) -> Result<(), ConfigError> {
    let entries = value.as_array().ok_or_else(|| ConfigError::InvalidRuleEntry {
        index: 0,
        reason: "'rule' must be an array of tables ([[rule]])".to_string(),
    })?;

    for (index, entry) in entries.iter().enumerate() {
        let invalid = |reason: &str| ConfigError::InvalidRuleEntry {
            index,
            reason: reason.to_string(),
        };

        let entry = entry.as_table().ok_or_else(|| invalid("not a table"))?;
        let family_name = entry
            .get("family")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing string key 'family'"))?;
        let family = MetricFamily::from_str(family_name)
            .map_err(|_| ConfigError::UnknownFamily(family_name.to_string()))?;
        let field = entry
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing string key 'field'"))?;
        let limit = entry
            .get("limit")
            .ok_or_else(|| invalid("missing key 'limit'"))
            .and_then(|value| parse_limit(family, field, value))?;
        let scope = match entry.get(SCOPE_KEY) {
            Some(value) => parse_scope(value)?,
            None => RuleScope::default(),
        };

        if let Some(extra) = entry
            .keys()
            .find(|k| !matches!(k.as_str(), "family" | "field" | "limit" | SCOPE_KEY))
        {
            return Err(invalid(&format!("unexpected key '{}'", extra)));
        }

        rules.push(ThresholdRule::new(family, field, limit, scope)?);
    }
    Ok(())
}

fn parse_scope(value: &Value) -> Result<RuleScope, ConfigError> {
    match value.as_str() {
        Some(s) => s.parse(),
        None => Err(ConfigError::InvalidScope(value.to_string())),
    }
}

fn parse_limit(family: MetricFamily, field: &str, value: &Value) -> Result<f64, ConfigError> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Integer(i) => Ok(*i as f64),
        other => Err(ConfigError::InvalidLimit {
            family: family.to_string(),
            field: field.to_string(),
            found: other.to_string(),
        }),
    }
}
