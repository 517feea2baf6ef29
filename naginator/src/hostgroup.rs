// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Hostgroups derived from node facts.
//!
//! Each configured [`HostgroupRule`] expands a name and an alias template
//! against the facts of every member node. Nodes sharing an expanded name
//! form one group, written to `auto_hostgroup_<name>.cfg`.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::{
    config::{HostgroupRule, ResourceTrait},
    error::Error,
    model::NodeFacts,
    puppetdb::Cmdb,
    render::{ObjectBlock, output_path, write_output},
    template::Template,
};

/// Alias and members of one derived hostgroup.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct HostgroupMembers
{
    /// Alias expanded for the first member.
    pub alias: String,
    /// Member hosts in node order.
    pub hosts: Vec<String,>,
}

/// Derived hostgroups keyed by expanded name, in order of first appearance.
pub type HostgroupIndex = IndexMap<String, HostgroupMembers,>;

/// A hostgroup rule with its templates parsed.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct CompiledRule
{
    name:           Template,
    alias:          Template,
    traits:         Vec<ResourceTrait,>,
    monitored_only: bool,
}

impl CompiledRule
{
    /// Parses the templates of `rule`.
    ///
    /// A fact rule becomes the template `<fact>_{<fact>}` for both the name
    /// and the alias.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when a template is malformed.
    pub fn compile(rule: &HostgroupRule,) -> Result<Self, Error,>
    {
        match rule {
            HostgroupRule::Fact {
                fact,
            } => {
                let template = Template::parse(&format!("{fact}_{{{fact}}}"),)?;
                Ok(Self {
                    name:           template.clone(),
                    alias:          template,
                    traits:         Vec::new(),
                    monitored_only: false,
                },)
            }
            HostgroupRule::Template {
                name,
                alias,
                traits,
                monitored_only,
            } => Ok(Self {
                name:           Template::parse(name,)?,
                alias:          Template::parse(alias,)?,
                traits:         traits.clone(),
                monitored_only: *monitored_only,
            },),
        }
    }
}

/// Groups the nodes of `facts` according to `rule`.
///
/// `monitored` holds the hosts rendered as `host` objects in this run and
/// only matters for rules with `monitored_only` set.
///
/// # Errors
///
/// Returns [`Error::MissingFact`] as soon as a member node lacks a fact
/// referenced by the name or alias template, and propagates CMDB failures
/// of trait lookups.
pub async fn derive_hostgroups<C: Cmdb,>(
    cmdb: &C,
    rule: &CompiledRule,
    facts: &NodeFacts,
    monitored: &HashSet<String,>,
) -> Result<HostgroupIndex, Error,>
{
    let mut members: Vec<&str,> = facts.hosts().collect();

    if !rule.traits.is_empty() {
        let mut qualifying = Vec::new();
        for host in &members {
            if has_traits(cmdb, host, &rule.traits,).await? {
                qualifying.push(*host,);
            }
        }
        if qualifying.is_empty() {
            warn!(
                "no node carries every trait of hostgroup {}, using all {} nodes",
                rule.name.source(),
                members.len()
            );
        } else {
            members = qualifying;
        }
    }

    if rule.monitored_only {
        members.retain(|host| monitored.contains(*host,),);
    }

    let mut index = HostgroupIndex::new();
    for host in members {
        let Some(host_facts,) = facts.get(host,) else {
            continue;
        };
        let name = rule.name.render_for(host, host_facts,)?;
        let alias = rule.alias.render_for(host, host_facts,)?;
        index
            .entry(name,)
            .or_insert_with(|| HostgroupMembers {
                alias, hosts: Vec::new(),
            },)
            .hosts
            .push(host.to_owned(),);
    }

    debug!("hostgroup rule {} produced {} groups", rule.name.source(), index.len());
    Ok(index,)
}

async fn has_traits<C: Cmdb,>(cmdb: &C, host: &str, traits: &[ResourceTrait],) -> Result<bool, Error,>
{
    for required in traits {
        let found = cmdb.node_resources(host, &required.resource_type, &required.title,).await?;
        if found.is_empty() {
            return Ok(false,);
        }
    }
    Ok(true,)
}

/// Builds the `define hostgroup` block of one group.
pub fn hostgroup_block(key: &str, group: &HostgroupMembers,) -> ObjectBlock
{
    let mut block = ObjectBlock::new("hostgroup",);
    block.push("hostgroup_name", key,);
    block.push("alias", group.alias.as_str(),);
    block.push("members", group.hosts.join(",",),);
    block
}

/// Writes one `auto_hostgroup_<key>.cfg` per group.
///
/// # Errors
///
/// Returns [`Error::Write`] when a file cannot be written.
pub fn write_hostgroups(index: &HostgroupIndex, output_dir: &Path,) -> Result<Vec<PathBuf,>, Error,>
{
    let mut written = Vec::with_capacity(index.len(),);
    for (key, group,) in index {
        let path = output_path(output_dir, &format!("hostgroup_{key}"),);
        write_output(&path, &hostgroup_block(key, group,).to_string(),)?;
        written.push(path,);
    }
    Ok(written,)
}

/// Derives and writes the hostgroups of one rule.
///
/// Nothing is written unless every member expanded successfully.
///
/// # Errors
///
/// See [`derive_hostgroups`] and [`write_hostgroups`].
pub async fn run_rule<C: Cmdb,>(
    cmdb: &C,
    rule: &HostgroupRule,
    facts: &NodeFacts,
    monitored: &HashSet<String,>,
    output_dir: &Path,
) -> Result<Vec<PathBuf,>, Error,>
{
    let compiled = CompiledRule::compile(rule,)?;
    let index = derive_hostgroups(cmdb, &compiled, facts, monitored,).await?;
    let written = write_hostgroups(&index, output_dir,)?;
    info!("Wrote {} hostgroups for rule {}", written.len(), rule.label());
    Ok(written,)
}

#[cfg(test)]
mod tests
{
    use std::collections::HashSet;

    use serde_json::json;

    use super::{CompiledRule, HostgroupMembers, derive_hostgroups, hostgroup_block, run_rule};
    use crate::{
        config::{HostgroupRule, ResourceTrait},
        error::Error,
        model::{Facts, NodeFacts},
        puppetdb::memory::MemoryCmdb,
    };

    fn facts(pairs: &[(&str, &str,)],) -> Facts
    {
        pairs.iter().map(|(name, value,)| ((*name).to_owned(), json!(value),),).collect()
    }

    fn fact_rule(fact: &str,) -> HostgroupRule
    {
        HostgroupRule::Fact {
            fact: fact.to_owned(),
        }
    }

    fn template_rule(name: &str, alias: &str,) -> HostgroupRule
    {
        HostgroupRule::Template {
            name:           name.to_owned(),
            alias:          alias.to_owned(),
            traits:         Vec::new(),
            monitored_only: false,
        }
    }

    fn nodes(entries: &[(&str, Facts,)],) -> NodeFacts
    {
        entries.iter().map(|(host, facts,)| ((*host).to_owned(), facts.clone(),),).collect()
    }

    #[tokio::test]
    async fn fact_rule_groups_nodes_by_value()
    {
        let dir = tempfile::tempdir().expect("failed to create tempdir",);
        let node_facts =
            nodes(&[("web01", facts(&[("os", "linux",)],),), ("web02", facts(&[("os", "bsd",)],),)],);

        let written = run_rule(&MemoryCmdb::default(), &fact_rule("os",), &node_facts, &HashSet::new(), dir.path(),)
            .await
            .expect("rule succeeds",);

        assert_eq!(written.len(), 2);
        let linux = std::fs::read_to_string(dir.path().join("auto_hostgroup_os_linux.cfg",),).expect("linux group",);
        assert_eq!(
            linux,
            format!(
                "define hostgroup {{\n  {:<30} os_linux\n  {:<30} os_linux\n  {:<30} web01\n}}\n",
                "hostgroup_name", "alias", "members"
            )
        );
        let bsd = std::fs::read_to_string(dir.path().join("auto_hostgroup_os_bsd.cfg",),).expect("bsd group",);
        assert!(bsd.contains(&format!("  {:<30} web02\n", "members")));
    }

    #[tokio::test]
    async fn template_rule_merges_hosts_and_keeps_first_alias()
    {
        let rule = CompiledRule::compile(&template_rule("{role}_{dc}", "{role} in {dc} ({hostname})",),)
            .expect("rule compiles",);
        let node_facts = nodes(&[
            ("db01", facts(&[("role", "db",), ("dc", "ams",), ("hostname", "db01",)],),),
            ("web01", facts(&[("role", "web",), ("dc", "ams",), ("hostname", "web01",)],),),
            ("web02", facts(&[("role", "web",), ("dc", "ams",), ("hostname", "web02",)],),),
        ],);

        let index = derive_hostgroups(&MemoryCmdb::default(), &rule, &node_facts, &HashSet::new(),)
            .await
            .expect("derivation succeeds",);

        assert_eq!(index.keys().collect::<Vec<_,>>(), ["db_ams", "web_ams"]);
        assert_eq!(index["web_ams"], HostgroupMembers {
            alias: "web in ams (web01)".to_owned(),
            hosts: vec!["web01".to_owned(), "web02".to_owned()],
        });
    }

    #[tokio::test]
    async fn missing_fact_aborts_before_writing()
    {
        let dir = tempfile::tempdir().expect("failed to create tempdir",);
        let node_facts = nodes(&[
            ("a01", facts(&[("operatingsystem", "Debian",)],),),
            ("b01", facts(&[("kernel", "Linux",)],),),
        ],);

        let error = run_rule(
            &MemoryCmdb::default(),
            &template_rule("{operatingsystem}", "{operatingsystem}",),
            &node_facts,
            &HashSet::new(),
            dir.path(),
        )
        .await
        .expect_err("expected failure",);

        match error {
            Error::MissingFact {
                host,
                facts,
                ..
            } => {
                assert_eq!(host, "b01");
                assert_eq!(facts, ["operatingsystem"]);
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
        assert_eq!(std::fs::read_dir(dir.path(),).expect("dir readable",).count(), 0);
    }

    #[tokio::test]
    async fn fact_rule_missing_fact_is_fatal()
    {
        let rule = CompiledRule::compile(&fact_rule("os",),).expect("rule compiles",);
        let node_facts = nodes(&[("web01", Facts::new(),)],);
        let error = derive_hostgroups(&MemoryCmdb::default(), &rule, &node_facts, &HashSet::new(),)
            .await
            .expect_err("expected failure",);
        assert!(matches!(error, Error::MissingFact { .. }));
    }

    #[tokio::test]
    async fn traits_restrict_membership()
    {
        let rule = CompiledRule::compile(&HostgroupRule::Template {
            name:           "{dc}".to_owned(),
            alias:          "{dc}".to_owned(),
            traits:         vec![
                ResourceTrait {
                    resource_type: "Class".to_owned(), title: "Apache".to_owned(),
                },
                ResourceTrait {
                    resource_type: "Class".to_owned(), title: "Php".to_owned(),
                },
            ],
            monitored_only: false,
        },)
        .expect("rule compiles",);
        let node_facts = nodes(&[
            ("web01", facts(&[("dc", "ams",)],),),
            ("web02", facts(&[("dc", "ams",)],),),
            ("db01", facts(&[],),),
        ],);
        let cmdb = MemoryCmdb::default()
            .with_node_resource("web01", "Class", "Apache",)
            .with_node_resource("web01", "Class", "Php",)
            .with_node_resource("web02", "Class", "Apache",);

        let index = derive_hostgroups(&cmdb, &rule, &node_facts, &HashSet::new(),)
            .await
            .expect("derivation succeeds",);
        assert_eq!(index["ams"].hosts, ["web01"]);
    }

    #[tokio::test]
    async fn unmatched_traits_fall_back_to_all_nodes()
    {
        let rule = CompiledRule::compile(&HostgroupRule::Template {
            name:           "{dc}".to_owned(),
            alias:          "{dc}".to_owned(),
            traits:         vec![ResourceTrait {
                resource_type: "Class".to_owned(), title: "Apache".to_owned(),
            }],
            monitored_only: false,
        },)
        .expect("rule compiles",);
        let node_facts =
            nodes(&[("web01", facts(&[("dc", "ams",)],),), ("web02", facts(&[("dc", "fra",)],),)],);

        let index = derive_hostgroups(&MemoryCmdb::default(), &rule, &node_facts, &HashSet::new(),)
            .await
            .expect("derivation succeeds",);
        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn monitored_only_drops_unrendered_hosts()
    {
        let rule = CompiledRule::compile(&HostgroupRule::Template {
            name:           "{role}".to_owned(),
            alias:          "{role}".to_owned(),
            traits:         Vec::new(),
            monitored_only: true,
        },)
        .expect("rule compiles",);
        let node_facts = nodes(&[
            ("db01", facts(&[],),),
            ("web01", facts(&[("role", "web",)],),),
            ("web02", facts(&[("role", "web",)],),),
        ],);
        let monitored: HashSet<String,> = ["web02".to_owned()].into_iter().collect();

        let index = derive_hostgroups(&MemoryCmdb::default(), &rule, &node_facts, &monitored,)
            .await
            .expect("derivation succeeds",);
        assert_eq!(index.len(), 1);
        assert_eq!(index["web"].hosts, ["web02"]);
    }

    #[tokio::test]
    async fn zero_groups_write_nothing()
    {
        let dir = tempfile::tempdir().expect("failed to create tempdir",);
        let written = run_rule(
            &MemoryCmdb::default(),
            &fact_rule("os",),
            &NodeFacts::new(),
            &HashSet::new(),
            dir.path(),
        )
        .await
        .expect("rule succeeds",);
        assert!(written.is_empty());
    }

    #[test]
    fn block_lists_members_comma_separated()
    {
        let group = HostgroupMembers {
            alias: "Web servers".to_owned(),
            hosts: vec!["web01".to_owned(), "web02".to_owned()],
        };
        let block = hostgroup_block("web", &group,);
        assert_eq!(block.get("alias"), Some("Web servers"));
        assert_eq!(block.get("members"), Some("web01,web02"));
    }
}
