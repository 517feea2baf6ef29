//! Generation of Nagios object configuration from PuppetDB.
//!
//! The library queries PuppetDB for exported `Nagios_*` resources and node
//! facts, renders one `auto_<type>.cfg` file per supported object type and
//! derives service groups and fact-based hostgroups from the same data. The
//! [`Pipeline`] ties the steps together; the individual renderers are exposed
//! for callers that need finer control.

mod config;
mod error;
mod hostgroup;
mod model;
mod pipeline;
mod puppetdb;
mod query;
mod registry;
mod render;
mod servicegroup;
mod template;

pub use config::{
    Config, DEFAULT_ADDRESS_FACT, DEFAULT_API_VERSION, DEFAULT_HOST, DEFAULT_PORT, HostgroupRule,
    PuppetDbSettings, ResourceTrait, load_config, parse_config, validate_api_version,
};
pub use error::{Error, io_error, write_error};
pub use hostgroup::{
    CompiledRule, HostgroupIndex, HostgroupMembers, derive_hostgroups, hostgroup_block,
    write_hostgroups,
};
pub use model::{Facts, NodeFacts, ParamValue, Resource, fact_text};
pub use pipeline::{Duplicate, Pipeline, RunSummary, clean_output_dir};
pub use puppetdb::{Cmdb, PuppetDbClient, fetch_node_facts};
pub use query::{Predicate, Query, RESOURCE_TYPE_PREFIX};
pub use registry::{NameRule, REGISTRY, TypeSpec, lookup};
pub use render::{
    FIELD_WIDTH, GLOBAL_EXCLUSIONS, LOOPBACK_ADDRESS, ObjectBlock, RenderResult, RenderSettings,
    RenderedType, output_path, render_block, render_resources, render_type,
};
pub use servicegroup::{ServiceGroupIndex, servicegroup_block, write_servicegroups};
pub use template::Template;
