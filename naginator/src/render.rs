// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Rendering of PuppetDB resources into Nagios object definitions.
///
/// Each registered type is rendered into its own `auto_<type>.cfg` file,
/// rewritten from scratch on every run.
use std::{
    collections::HashSet,
    fmt, fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    error::{self, Error},
    model::{NodeFacts, ParamValue, Resource, fact_text},
    puppetdb::Cmdb,
    query::{Predicate, Query},
    registry::{NameRule, TypeSpec},
    servicegroup::ServiceGroupIndex,
};

/// Parameters never emitted, whatever the type: Puppet metaparameters and
/// file-management attributes of the native Nagios types.
pub const GLOBAL_EXCLUSIONS: &[&str] = &["target", "require", "tag", "notify", "ensure", "mode"];
/// Minimum width of the directive column.
pub const FIELD_WIDTH: usize = 30;
/// Address given to workstations whose address fact is unknown.
pub const LOOPBACK_ADDRESS: &str = "127.0.0.1";
const WORKSTATION_TAG: &str = "workstation";

/// One `define <type> { ... }` block.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct ObjectBlock
{
    /// Nagios object type.
    pub type_name:  String,
    /// Directive name/value pairs in output order.
    pub directives: Vec<(String, String,),>,
}

impl ObjectBlock
{
    /// Creates an empty block.
    pub fn new(type_name: impl Into<String,>,) -> Self
    {
        Self {
            type_name: type_name.into(), directives: Vec::new(),
        }
    }

    /// Appends a directive.
    pub fn push(&mut self, field: impl Into<String,>, value: impl Into<String,>,)
    {
        self.directives.push((field.into(), value.into(),),);
    }

    /// Returns the value of the first directive named `field`.
    pub fn get(&self, field: &str,) -> Option<&str,>
    {
        self.directives.iter().find(|(name, _,)| name == field,).map(|(_, value,)| value.as_str(),)
    }
}

impl fmt::Display for ObjectBlock
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        writeln!(f, "define {} {{", self.type_name)?;
        for (field, value,) in &self.directives {
            writeln!(f, "  {field:<FIELD_WIDTH$} {value}")?;
        }
        writeln!(f, "}}")
    }
}

/// Run-wide inputs of the per-type renderer.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct RenderSettings
{
    /// Directory receiving the generated files.
    pub output_dir:   PathBuf,
    /// Extra predicates conjoined with every type query.
    pub query:        Vec<Predicate,>,
    /// Optional Puppet environment filter.
    pub environment:  Option<String,>,
    /// Fact used as the address of workstations.
    pub address_fact: String,
}

/// Outcome of rendering one type.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct RenderResult
{
    /// Location of the written file.
    pub path:           PathBuf,
    /// Rendered resource names, in output order.
    pub rendered:       Vec<String,>,
    /// Names skipped because an earlier resource used them.
    pub duplicates:     Vec<String,>,
    /// Hosts of each service description, filled for `service` only.
    pub service_groups: ServiceGroupIndex,
}

/// In-memory rendering of a resource list.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct RenderedType
{
    /// File contents.
    pub contents:       String,
    /// Rendered resource names, in output order.
    pub rendered:       Vec<String,>,
    /// Names skipped as duplicates.
    pub duplicates:     Vec<String,>,
    /// Hosts of each service description.
    pub service_groups: ServiceGroupIndex,
}

/// Renders every resource of `spec` into `auto_<type>.cfg`.
///
/// # Errors
///
/// Propagates CMDB failures and returns [`Error::Write`] when the output
/// file cannot be written.
pub async fn render_type<C: Cmdb,>(
    cmdb: &C,
    spec: &TypeSpec,
    facts: &NodeFacts,
    settings: &RenderSettings,
) -> Result<RenderResult, Error,>
{
    let query = Query::resource_type(spec.type_name,).and_all(Query::from_predicates(&settings.query,),);
    let resources = cmdb.resources(&query, settings.environment.as_deref(),).await?;
    debug!("PuppetDB returned {} {} resources", resources.len(), spec.type_name);

    let rendered = render_resources(spec, resources, facts, &settings.address_fact,);
    let path = output_path(&settings.output_dir, spec.type_name,);
    write_output(&path, &rendered.contents,)?;
    info!("Wrote {} {} objects to {}", rendered.rendered.len(), spec.type_name, path.display());

    Ok(RenderResult {
        path,
        rendered: rendered.rendered,
        duplicates: rendered.duplicates,
        service_groups: rendered.service_groups,
    },)
}

/// Renders resources in the given order, keeping the first resource of each
/// name.
pub fn render_resources(
    spec: &TypeSpec,
    resources: Vec<Resource,>,
    facts: &NodeFacts,
    address_fact: &str,
) -> RenderedType
{
    let mut output = RenderedType::default();
    let mut seen = HashSet::with_capacity(resources.len(),);

    for mut resource in resources {
        if !seen.insert(resource.name.clone(),) {
            info!("duplicate {}: {}", spec.type_name, resource.name);
            output.duplicates.push(resource.name,);
            continue;
        }

        if spec.type_name == "service" {
            collect_service_hosts(&resource, &mut output.service_groups,);
        }
        if spec.type_name == "host" && resource.tags.contains(WORKSTATION_TAG,) {
            let address = workstation_address(&resource.name, facts, address_fact,);
            resource.parameters.insert("address".to_owned(), address.into(),);
        }

        let block = render_block(spec, &resource, facts,);
        output.contents.push_str(&block.to_string(),);
        output.rendered.push(resource.name,);
    }

    output
}

/// Builds the object block of a single resource.
///
/// ```
/// use naginator::{Resource, NodeFacts, lookup, render_block};
///
/// let spec = lookup("command",).expect("registered",);
/// let resource = Resource::new("check_disk",).with_param("command_line", "/bin/check.sh",);
/// let block = render_block(spec, &resource, &NodeFacts::new(),);
/// assert_eq!(block.get("command_name"), Some("check_disk"));
/// assert_eq!(block.get("command_line"), Some("/bin/check.sh"));
/// ```
pub fn render_block(spec: &TypeSpec, resource: &Resource, facts: &NodeFacts,) -> ObjectBlock
{
    let mut block = ObjectBlock::new(spec.type_name,);
    let name_line = name_field(spec, resource, facts,);
    if let Some(field,) = name_line {
        block.push(field, resource.name.as_str(),);
    }

    for (param, value,) in &resource.parameters {
        if value.is_empty() || GLOBAL_EXCLUSIONS.contains(&param.as_str(),) || !spec.allows(param,) {
            continue;
        }
        if name_line == Some(param.as_str(),) || spec.name_param == Some(param.as_str(),) {
            continue;
        }
        block.push(param.as_str(), value.render(),);
    }

    block
}

/// Directive carrying the object name, or `None` when the block has none.
fn name_field(spec: &TypeSpec, resource: &Resource, facts: &NodeFacts,) -> Option<&'static str,>
{
    match spec.name_rule {
        NameRule::Generic => Some("name",),
        NameRule::HostStyle => {
            if facts.contains(&resource.name,) || resource.has_param("use",) {
                Some("host_name",)
            } else {
                Some("name",)
            }
        }
        NameRule::ServiceStyle => (!resource.has_param("host_name",)).then_some("name",),
        NameRule::FixedField(field,) => Some(field,),
    }
}

fn collect_service_hosts(resource: &Resource, groups: &mut ServiceGroupIndex,)
{
    let hosts = resource.parameters.get("host_name",).map(ParamValue::items,).unwrap_or_default();
    if hosts.is_empty() {
        return;
    }
    let description = resource
        .parameters
        .get("service_description",)
        .filter(|value| !value.is_empty(),)
        .map(|value| value.render(),);
    let Some(description,) = description else {
        debug!("service {} has no service_description, not grouped", resource.name);
        return;
    };
    groups.entry(description,).or_default().extend(hosts,);
}

fn workstation_address(host: &str, facts: &NodeFacts, address_fact: &str,) -> String
{
    facts
        .fact(host, address_fact,)
        .map(fact_text,)
        .filter(|address| !address.is_empty(),)
        .unwrap_or_else(|| LOOPBACK_ADDRESS.to_owned(),)
}

/// Path of the generated file `auto_<stem>.cfg` in `dir`.
///
/// Path separators in `stem` are replaced with `_` so derived group keys
/// cannot escape the output directory.
pub fn output_path(dir: &Path, stem: &str,) -> PathBuf
{
    let safe: String =
        stem.chars().map(|ch| if matches!(ch, '/' | '\\' | '\0') { '_' } else { ch },).collect();
    dir.join(format!("auto_{safe}.cfg"),)
}

/// Truncates and rewrites a generated file.
///
/// # Errors
///
/// Returns [`Error::Write`] when the file cannot be written.
pub fn write_output(path: &Path, contents: &str,) -> Result<(), Error,>
{
    fs::write(path, contents,).map_err(|source| error::write_error(path, source,),)
}
