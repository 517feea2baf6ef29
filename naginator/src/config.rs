//! Configuration document consumed by the generator.
//!
//! The document is optional: every field has a default so the CLI can run
//! against a local PuppetDB with nothing but `--output-dir`. When present it
//! carries extra query predicates, the environment filter and the hostgroup
//! derivation rules, which are validated once at load time so a broken
//! template fails before any file is written.

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::{self, Error},
    query::Predicate,
    template::Template,
};

/// Default PuppetDB host.
pub const DEFAULT_HOST: &str = "localhost";
/// Default PuppetDB HTTP port.
pub const DEFAULT_PORT: u16 = 8080;
/// Default PuppetDB query API version.
pub const DEFAULT_API_VERSION: u8 = 4;
const DEFAULT_TIMEOUT_SECS: u64 = 20;
/// Fact holding the primary interface address of workstations.
pub const DEFAULT_ADDRESS_FACT: &str = "ipaddress_eth0";

/// Root configuration document.
///
/// # Examples
///
/// ```
/// use naginator::{HostgroupRule, parse_config};
///
/// let yaml = r#"
/// environment: production
/// query:
///   - field: tag
///     value: monitored
/// hostgroups:
///   - fact: operatingsystem
/// "#;
/// let config = parse_config(yaml,).expect("valid configuration",);
/// assert_eq!(config.environment.as_deref(), Some("production"));
/// assert!(matches!(config.hostgroups[0], HostgroupRule::Fact { .. }));
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq,)]
#[serde(deny_unknown_fields)]
pub struct Config
{
    /// Connection settings for PuppetDB.
    #[serde(default)]
    pub puppetdb: PuppetDbSettings,

    /// Optional Puppet environment restricting nodes and resources.
    #[serde(default)]
    pub environment: Option<String,>,

    /// Extra equality predicates conjoined with every resource query.
    #[serde(default)]
    pub query: Vec<Predicate,>,

    /// Fact used as the address of hosts tagged `workstation`.
    #[serde(default = "default_address_fact")]
    pub workstation_address_fact: String,

    /// Hostgroup derivation rules, run in order after all types rendered.
    #[serde(default)]
    pub hostgroups: Vec<HostgroupRule,>,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            puppetdb:                 PuppetDbSettings::default(),
            environment:              None,
            query:                    Vec::new(),
            workstation_address_fact: default_address_fact(),
            hostgroups:               Vec::new(),
        }
    }
}

/// Connection settings for the PuppetDB query API.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq,)]
#[serde(deny_unknown_fields)]
pub struct PuppetDbSettings
{
    /// Hostname of the PuppetDB server.
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port of the PuppetDB server.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Query API version, either 3 or 4.
    #[serde(default = "default_api_version")]
    pub api_version: u8,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl PuppetDbSettings
{
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self,) -> Duration
    {
        Duration::from_secs(self.timeout_secs,)
    }
}

impl Default for PuppetDbSettings
{
    fn default() -> Self
    {
        Self {
            host:         default_host(),
            port:         DEFAULT_PORT,
            api_version:  DEFAULT_API_VERSION,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// One hostgroup derivation rule.
///
/// A rule with a `fact` key groups every node by that fact's value; a rule
/// with `name`/`alias` templates groups nodes by the expanded templates.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq,)]
#[serde(untagged, try_from = "RawHostgroupRule")]
pub enum HostgroupRule
{
    /// Group nodes by the raw value of a single fact.
    Fact
    {
        /// Fact name, e.g. `operatingsystem`.
        fact: String,
    },
    /// Group nodes by templated names evaluated against each node's facts.
    Template
    {
        /// Hostgroup name template, e.g. `{role}_{datacenter}`.
        name:           String,
        /// Alias template evaluated with the same facts.
        alias:          String,
        /// Resources a node must carry to be a member.
        #[serde(default)]
        traits:         Vec<ResourceTrait,>,
        /// Restrict members to nodes rendered as Nagios hosts this run.
        #[serde(default)]
        monitored_only: bool,
    },
}

impl HostgroupRule
{
    /// Short label used in log messages.
    pub fn label(&self,) -> &str
    {
        match self {
            Self::Fact {
                fact,
            } => fact,
            Self::Template {
                name, ..
            } => name,
        }
    }
}

/// Hostgroup rule as written in the document, before the two forms are told
/// apart.
#[derive(Debug, Deserialize,)]
#[serde(deny_unknown_fields)]
struct RawHostgroupRule
{
    fact:           Option<String,>,
    name:           Option<String,>,
    alias:          Option<String,>,
    traits:         Option<Vec<ResourceTrait,>,>,
    monitored_only: Option<bool,>,
}

impl TryFrom<RawHostgroupRule,> for HostgroupRule
{
    type Error = String;

    fn try_from(raw: RawHostgroupRule,) -> Result<Self, Self::Error,>
    {
        match raw {
            RawHostgroupRule {
                fact: Some(fact,),
                name: None,
                alias: None,
                traits: None,
                monitored_only: None,
            } => Ok(Self::Fact {
                fact,
            },),
            RawHostgroupRule {
                fact: Some(fact,), ..
            } => Err(format!(
                "hostgroup rule on fact '{fact}' cannot also set name, alias, traits or monitored_only"
            ),),
            RawHostgroupRule {
                fact: None,
                name: Some(name,),
                alias: Some(alias,),
                traits,
                monitored_only,
            } => Ok(Self::Template {
                name,
                alias,
                traits: traits.unwrap_or_default(),
                monitored_only: monitored_only.unwrap_or_default(),
            },),
            RawHostgroupRule {
                ..
            } => Err("hostgroup rule needs either `fact` or both `name` and `alias`".to_owned(),),
        }
    }
}

/// A `(resource type, resource title)` membership requirement.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq,)]
#[serde(deny_unknown_fields)]
pub struct ResourceTrait
{
    /// Puppet resource type, e.g. `Class`.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource title, e.g. `Apache`.
    pub title:         String,
}

fn default_host() -> String
{
    DEFAULT_HOST.to_owned()
}

fn default_port() -> u16
{
    DEFAULT_PORT
}

fn default_api_version() -> u8
{
    DEFAULT_API_VERSION
}

fn default_timeout_secs() -> u64
{
    DEFAULT_TIMEOUT_SECS
}

fn default_address_fact() -> String
{
    DEFAULT_ADDRESS_FACT.to_owned()
}

/// Loads the configuration from the provided YAML file path.
///
/// # Errors
///
/// Returns an [`Error`] when the file cannot be read, the YAML cannot be
/// deserialized, or the document violates invariants.
pub fn load_config(path: &Path,) -> Result<Config, Error,>
{
    let contents = fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
    parse_config(&contents,)
}

/// Parses the configuration from the provided YAML document string.
///
/// An empty document yields the default configuration.
///
/// # Errors
///
/// Propagates [`Error::Parse`](Error::Parse) when the YAML cannot be decoded
/// and [`Error::Validation`](Error::Validation) when values are unusable.
pub fn parse_config(contents: &str,) -> Result<Config, Error,>
{
    if contents.trim().is_empty() {
        return Ok(Config::default(),);
    }

    let config: Config = serde_yaml::from_str(contents,)?;
    validate(&config,)?;
    Ok(config,)
}

/// Checks invariants serde cannot express.
///
/// # Errors
///
/// Returns [`Error::Validation`](Error::Validation) describing the first
/// violation found.
pub fn validate(config: &Config,) -> Result<(), Error,>
{
    validate_api_version(config.puppetdb.api_version,)?;
    if config.puppetdb.timeout_secs == 0 {
        return Err(Error::validation("puppetdb.timeout_secs must be positive",),);
    }
    if config.environment.as_deref().is_some_and(|value| value.trim().is_empty(),) {
        return Err(Error::validation("environment cannot be empty",),);
    }
    if config.workstation_address_fact.trim().is_empty() {
        return Err(Error::validation("workstation_address_fact cannot be empty",),);
    }
    for predicate in &config.query {
        if predicate.field.trim().is_empty() {
            return Err(Error::validation("query predicate field cannot be empty",),);
        }
    }
    for rule in &config.hostgroups {
        validate_rule(rule,)?;
    }
    Ok((),)
}

/// Rejects API versions the client cannot talk to.
///
/// # Errors
///
/// Returns [`Error::Validation`](Error::Validation) for anything but 3 or 4.
pub fn validate_api_version(version: u8,) -> Result<(), Error,>
{
    if matches!(version, 3 | 4) {
        Ok((),)
    } else {
        Err(Error::validation(format!("unsupported puppetdb api version {version}, expected 3 or 4"),),)
    }
}

fn validate_rule(rule: &HostgroupRule,) -> Result<(), Error,>
{
    match rule {
        HostgroupRule::Fact {
            fact,
        } => {
            if fact.trim().is_empty() || fact.contains(['{', '}',],) {
                return Err(Error::validation(format!("invalid hostgroup fact name '{fact}'"),),);
            }
        }
        HostgroupRule::Template {
            name,
            alias,
            traits,
            ..
        } => {
            Template::parse(name,)?;
            Template::parse(alias,)?;
            for required in traits {
                if required.resource_type.trim().is_empty() || required.title.trim().is_empty() {
                    return Err(Error::validation(format!(
                        "hostgroup '{name}' has a trait with an empty type or title"
                    ),),);
                }
            }
        }
    }
    Ok((),)
}
