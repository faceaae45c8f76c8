//! Typed per-kind stage configuration.
//!
//! Every [`BlockKind`] owns one config struct. The configuration form works
//! on a dynamic view of those structs: an ordered list of named
//! [`ConfigValue`]s obtained through [`ConfigFields`].

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::{BlockKind, Result, StagecraftError};

/// A single configuration field value as the form sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Flag(bool),
    List(Vec<String>),
    Text(String),
}

impl ConfigValue {
    pub fn shape(&self) -> &'static str {
        match self {
            ConfigValue::Flag(_) => "flag",
            ConfigValue::List(_) => "list",
            ConfigValue::Text(_) => "text",
        }
    }

    /// Parse raw form input into a value of the same shape as `self`.
    ///
    /// Lists are one item per line, flags accept `true`/`false`, text is taken
    /// verbatim.
    pub fn parse_as(&self, input: &str) -> std::result::Result<ConfigValue, String> {
        match self {
            ConfigValue::Text(_) => Ok(ConfigValue::Text(input.to_string())),
            ConfigValue::List(_) => Ok(ConfigValue::List(
                input.split('\n').map(String::from).collect(),
            )),
            ConfigValue::Flag(_) => match input.trim() {
                "true" => Ok(ConfigValue::Flag(true)),
                "false" => Ok(ConfigValue::Flag(false)),
                other => Err(format!("expected true or false, got '{other}'")),
            },
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Flag(b) => write!(f, "{b}"),
            ConfigValue::List(items) => f.write_str(&items.join("\n")),
            ConfigValue::Text(s) => f.write_str(s),
        }
    }
}

/// Label shown next to a config field: the field name with its first
/// character upper-cased.
pub fn field_label(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Dynamic, name-based access to a typed config struct.
pub trait ConfigFields {
    /// Serialized field names in form order.
    fn field_names(&self) -> &'static [&'static str];

    fn get(&self, field: &str) -> Option<ConfigValue>;

    /// Store `value` into `field`. Returns a message when the value has the
    /// wrong shape. The field name has already been checked by the caller.
    fn set(&mut self, field: &str, value: ConfigValue) -> std::result::Result<(), String>;
}

fn text(value: ConfigValue) -> std::result::Result<String, String> {
    match value {
        ConfigValue::Text(s) => Ok(s),
        other => Err(format!("expected text, got {}", other.shape())),
    }
}

fn flag(value: ConfigValue) -> std::result::Result<bool, String> {
    match value {
        ConfigValue::Flag(b) => Ok(b),
        other => Err(format!("expected flag, got {}", other.shape())),
    }
}

fn list(value: ConfigValue) -> std::result::Result<Vec<String>, String> {
    match value {
        ConfigValue::List(items) => Ok(items),
        other => Err(format!("expected list, got {}", other.shape())),
    }
}

// ---------------------------------------------------------------------------
// Per-kind config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub repo: String,
    pub branch: String,
    pub provider: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repo: String::new(),
            branch: "main".into(),
            provider: "github".into(),
        }
    }
}

impl ConfigFields for SourceConfig {
    fn field_names(&self) -> &'static [&'static str] {
        &["repo", "branch", "provider"]
    }

    fn get(&self, field: &str) -> Option<ConfigValue> {
        match field {
            "repo" => Some(ConfigValue::Text(self.repo.clone())),
            "branch" => Some(ConfigValue::Text(self.branch.clone())),
            "provider" => Some(ConfigValue::Text(self.provider.clone())),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: ConfigValue) -> std::result::Result<(), String> {
        match field {
            "repo" => self.repo = text(value)?,
            "branch" => self.branch = text(value)?,
            "provider" => self.provider = text(value)?,
            _ => return Err(format!("unknown field '{field}'")),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub buildspec: String,
    pub runtime: String,
    pub commands: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            buildspec: String::new(),
            runtime: "node18".into(),
            commands: vec!["npm install".into(), "npm run build".into()],
        }
    }
}

impl ConfigFields for BuildConfig {
    fn field_names(&self) -> &'static [&'static str] {
        &["buildspec", "runtime", "commands"]
    }

    fn get(&self, field: &str) -> Option<ConfigValue> {
        match field {
            "buildspec" => Some(ConfigValue::Text(self.buildspec.clone())),
            "runtime" => Some(ConfigValue::Text(self.runtime.clone())),
            "commands" => Some(ConfigValue::List(self.commands.clone())),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: ConfigValue) -> std::result::Result<(), String> {
        match field {
            "buildspec" => self.buildspec = text(value)?,
            "runtime" => self.runtime = text(value)?,
            "commands" => self.commands = list(value)?,
            _ => return Err(format!("unknown field '{field}'")),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestConfig {
    pub test_command: String,
    pub coverage: bool,
    pub reports: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            test_command: "npm test".into(),
            coverage: true,
            reports: true,
        }
    }
}

impl ConfigFields for TestConfig {
    fn field_names(&self) -> &'static [&'static str] {
        &["testCommand", "coverage", "reports"]
    }

    fn get(&self, field: &str) -> Option<ConfigValue> {
        match field {
            "testCommand" => Some(ConfigValue::Text(self.test_command.clone())),
            "coverage" => Some(ConfigValue::Flag(self.coverage)),
            "reports" => Some(ConfigValue::Flag(self.reports)),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: ConfigValue) -> std::result::Result<(), String> {
        match field {
            "testCommand" => self.test_command = text(value)?,
            "coverage" => self.coverage = flag(value)?,
            "reports" => self.reports = flag(value)?,
            _ => return Err(format!("unknown field '{field}'")),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub environment: String,
    pub service: String,
    pub region: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            environment: "staging".into(),
            service: "lambda".into(),
            region: "us-east-1".into(),
        }
    }
}

impl ConfigFields for DeployConfig {
    fn field_names(&self) -> &'static [&'static str] {
        &["environment", "service", "region"]
    }

    fn get(&self, field: &str) -> Option<ConfigValue> {
        match field {
            "environment" => Some(ConfigValue::Text(self.environment.clone())),
            "service" => Some(ConfigValue::Text(self.service.clone())),
            "region" => Some(ConfigValue::Text(self.region.clone())),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: ConfigValue) -> std::result::Result<(), String> {
        match field {
            "environment" => self.environment = text(value)?,
            "service" => self.service = text(value)?,
            "region" => self.region = text(value)?,
            _ => return Err(format!("unknown field '{field}'")),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database engine, serialized as `type`.
    #[serde(rename = "type")]
    pub engine: String,
    pub scripts: Vec<String>,
    pub backup: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            engine: "rds".into(),
            scripts: Vec::new(),
            backup: true,
        }
    }
}

impl ConfigFields for DatabaseConfig {
    fn field_names(&self) -> &'static [&'static str] {
        &["type", "scripts", "backup"]
    }

    fn get(&self, field: &str) -> Option<ConfigValue> {
        match field {
            "type" => Some(ConfigValue::Text(self.engine.clone())),
            "scripts" => Some(ConfigValue::List(self.scripts.clone())),
            "backup" => Some(ConfigValue::Flag(self.backup)),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: ConfigValue) -> std::result::Result<(), String> {
        match field {
            "type" => self.engine = text(value)?,
            "scripts" => self.scripts = list(value)?,
            "backup" => self.backup = flag(value)?,
            _ => return Err(format!("unknown field '{field}'")),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub alerts: bool,
    pub dashboard: bool,
    pub logs: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            alerts: true,
            dashboard: true,
            logs: true,
        }
    }
}

impl ConfigFields for MonitoringConfig {
    fn field_names(&self) -> &'static [&'static str] {
        &["alerts", "dashboard", "logs"]
    }

    fn get(&self, field: &str) -> Option<ConfigValue> {
        match field {
            "alerts" => Some(ConfigValue::Flag(self.alerts)),
            "dashboard" => Some(ConfigValue::Flag(self.dashboard)),
            "logs" => Some(ConfigValue::Flag(self.logs)),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: ConfigValue) -> std::result::Result<(), String> {
        match field {
            "alerts" => self.alerts = flag(value)?,
            "dashboard" => self.dashboard = flag(value)?,
            "logs" => self.logs = flag(value)?,
            _ => return Err(format!("unknown field '{field}'")),
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BlockConfig: one variant per kind
// ---------------------------------------------------------------------------

/// Configuration of a placed block.
///
/// Serializes as the bare inner struct; the kind travels separately on the
/// block, so deserialization goes through [`BlockConfig::from_value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockConfig {
    Source(SourceConfig),
    Build(BuildConfig),
    Test(TestConfig),
    Deploy(DeployConfig),
    Database(DatabaseConfig),
    Monitoring(MonitoringConfig),
}

impl BlockConfig {
    /// The catalog default for `kind`.
    pub fn default_for(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Source => BlockConfig::Source(SourceConfig::default()),
            BlockKind::Build => BlockConfig::Build(BuildConfig::default()),
            BlockKind::Test => BlockConfig::Test(TestConfig::default()),
            BlockKind::Deploy => BlockConfig::Deploy(DeployConfig::default()),
            BlockKind::Database => BlockConfig::Database(DatabaseConfig::default()),
            BlockKind::Monitoring => BlockConfig::Monitoring(MonitoringConfig::default()),
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            BlockConfig::Source(_) => BlockKind::Source,
            BlockConfig::Build(_) => BlockKind::Build,
            BlockConfig::Test(_) => BlockKind::Test,
            BlockConfig::Deploy(_) => BlockKind::Deploy,
            BlockConfig::Database(_) => BlockKind::Database,
            BlockConfig::Monitoring(_) => BlockKind::Monitoring,
        }
    }

    /// Decode the JSON object stored under a block's `config` key.
    pub fn from_value(kind: BlockKind, value: serde_json::Value) -> Result<Self> {
        let config = match kind {
            BlockKind::Source => BlockConfig::Source(serde_json::from_value(value)?),
            BlockKind::Build => BlockConfig::Build(serde_json::from_value(value)?),
            BlockKind::Test => BlockConfig::Test(serde_json::from_value(value)?),
            BlockKind::Deploy => BlockConfig::Deploy(serde_json::from_value(value)?),
            BlockKind::Database => BlockConfig::Database(serde_json::from_value(value)?),
            BlockKind::Monitoring => BlockConfig::Monitoring(serde_json::from_value(value)?),
        };
        Ok(config)
    }

    fn fields_ref(&self) -> &dyn ConfigFields {
        match self {
            BlockConfig::Source(c) => c,
            BlockConfig::Build(c) => c,
            BlockConfig::Test(c) => c,
            BlockConfig::Deploy(c) => c,
            BlockConfig::Database(c) => c,
            BlockConfig::Monitoring(c) => c,
        }
    }

    fn fields_mut(&mut self) -> &mut dyn ConfigFields {
        match self {
            BlockConfig::Source(c) => c,
            BlockConfig::Build(c) => c,
            BlockConfig::Test(c) => c,
            BlockConfig::Deploy(c) => c,
            BlockConfig::Database(c) => c,
            BlockConfig::Monitoring(c) => c,
        }
    }

    /// All fields with their current values, in form order.
    pub fn fields(&self) -> Vec<(&'static str, ConfigValue)> {
        let inner = self.fields_ref();
        inner
            .field_names()
            .iter()
            .filter_map(|name| inner.get(name).map(|value| (*name, value)))
            .collect()
    }

    pub fn get(&self, field: &str) -> Option<ConfigValue> {
        self.fields_ref().get(field)
    }

    /// A copy of this config with `field` replaced by `value`.
    pub fn with_field(&self, field: &str, value: ConfigValue) -> Result<BlockConfig> {
        let kind = self.kind();
        if !self.fields_ref().field_names().iter().any(|name| *name == field) {
            return Err(StagecraftError::ConfigField {
                kind,
                field: field.to_string(),
                message: "unknown field".into(),
            });
        }
        let mut next = self.clone();
        next.fields_mut()
            .set(field, value)
            .map_err(|message| StagecraftError::ConfigField {
                kind,
                field: field.to_string(),
                message,
            })?;
        Ok(next)
    }

    /// A copy of this config with `field` set from raw form input, parsed
    /// against the field's current shape.
    pub fn with_input(&self, field: &str, input: &str) -> Result<BlockConfig> {
        let kind = self.kind();
        let current = self.get(field).ok_or_else(|| StagecraftError::ConfigField {
            kind,
            field: field.to_string(),
            message: "unknown field".into(),
        })?;
        let value = current
            .parse_as(input)
            .map_err(|message| StagecraftError::ConfigField {
                kind,
                field: field.to_string(),
                message,
            })?;
        self.with_field(field, value)
    }
}

impl Serialize for BlockConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            BlockConfig::Source(c) => c.serialize(serializer),
            BlockConfig::Build(c) => c.serialize(serializer),
            BlockConfig::Test(c) => c.serialize(serializer),
            BlockConfig::Deploy(c) => c.serialize(serializer),
            BlockConfig::Database(c) => c.serialize(serializer),
            BlockConfig::Monitoring(c) => c.serialize(serializer),
        }
    }
}
