// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// End-to-end generation run.
///
/// The driver fetches the node facts once, renders every registered type in
/// order, writes the service groups collected from `service` resources and
/// finally runs the hostgroup rules. Any failure aborts the run; files
/// already written stay on disk.
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    config::Config,
    error::{self, Error},
    hostgroup,
    puppetdb::{Cmdb, fetch_node_facts},
    registry::REGISTRY,
    render::{RenderSettings, render_type},
    servicegroup::{ServiceGroupIndex, write_servicegroups},
};

/// A resource skipped because an earlier one of the same type had its name.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Duplicate
{
    /// Nagios object type.
    pub type_name: String,
    /// Resource name.
    pub name:      String,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct RunSummary
{
    /// Nodes known to the CMDB.
    pub nodes:      usize,
    /// Every file written, in write order.
    pub files:      Vec<PathBuf,>,
    /// Resources dropped as duplicates.
    pub duplicates: Vec<Duplicate,>,
}

/// Generation run bound to one CMDB and one output directory.
#[derive(Debug,)]
pub struct Pipeline<C,>
{
    cmdb:     C,
    config:   Config,
    settings: RenderSettings,
}

impl<C: Cmdb,> Pipeline<C,>
{
    /// Creates a pipeline writing into `output_dir`.
    pub fn new(cmdb: C, config: Config, output_dir: impl Into<PathBuf,>,) -> Self
    {
        let settings = RenderSettings {
            output_dir:   output_dir.into(),
            query:        config.query.clone(),
            environment:  config.environment.clone(),
            address_fact: config.workstation_address_fact.clone(),
        };
        Self {
            cmdb,
            config,
            settings,
        }
    }

    /// Directory receiving the generated files.
    pub fn output_dir(&self,) -> &Path
    {
        &self.settings.output_dir
    }

    /// Runs the whole generation.
    ///
    /// # Errors
    ///
    /// Returns the first CMDB, write or missing fact error encountered.
    pub async fn run(&self,) -> Result<RunSummary, Error,>
    {
        let facts = fetch_node_facts(&self.cmdb, self.settings.environment.as_deref(),).await?;
        info!("Loaded facts for {} nodes", facts.len());

        let mut summary = RunSummary {
            nodes: facts.len(), ..RunSummary::default()
        };
        let mut service_groups = ServiceGroupIndex::new();
        let mut monitored = HashSet::new();

        for spec in REGISTRY {
            let result = render_type(&self.cmdb, spec, &facts, &self.settings,).await?;
            summary.files.push(result.path,);
            summary.duplicates.extend(result.duplicates.into_iter().map(|name| Duplicate {
                type_name: spec.type_name.to_owned(),
                name,
            },),);
            match spec.type_name {
                "host" => monitored.extend(result.rendered,),
                "service" => service_groups = result.service_groups,
                _ => {}
            }
        }

        summary.files.extend(write_servicegroups(&service_groups, &self.settings.output_dir,)?,);

        for rule in &self.config.hostgroups {
            let written =
                hostgroup::run_rule(&self.cmdb, rule, &facts, &monitored, &self.settings.output_dir,).await?;
            summary.files.extend(written,);
        }

        info!(
            "Generated {} files, skipped {} duplicate resources",
            summary.files.len(),
            summary.duplicates.len()
        );
        Ok(summary,)
    }
}

/// Removes previously generated `auto_*.cfg` files from `dir`.
///
/// Other files are left untouched. Returns the number of files removed.
///
/// # Errors
///
/// Returns [`Error::Write`] when the directory cannot be listed or a file
/// cannot be removed.
pub fn clean_output_dir(dir: &Path,) -> Result<usize, Error,>
{
    let entries = fs::read_dir(dir,).map_err(|source| error::write_error(dir, source,),)?;
    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|source| error::write_error(dir, source,),)?;
        let path = entry.path();
        if !is_generated(&path,) {
            continue;
        }
        fs::remove_file(&path,).map_err(|source| error::write_error(&path, source,),)?;
        debug!("Removed {}", path.display());
        removed += 1;
    }
    Ok(removed,)
}

fn is_generated(path: &Path,) -> bool
{
    path.is_file()
        && path
            .file_name()
            .and_then(|name| name.to_str(),)
            .is_some_and(|name| name.starts_with("auto_",) && name.ends_with(".cfg",),)
}

#[cfg(test)]
mod tests
{
    use serde_json::json;

    use super::{Duplicate, Pipeline, clean_output_dir};
    use crate::{
        config::{Config, HostgroupRule},
        error::Error,
        model::{Facts, Resource},
        puppetdb::memory::MemoryCmdb,
        registry::REGISTRY,
    };

    fn facts(pairs: &[(&str, &str,)],) -> Facts
    {
        pairs.iter().map(|(name, value,)| ((*name).to_owned(), json!(value),),).collect()
    }

    fn inventory() -> MemoryCmdb
    {
        MemoryCmdb::default()
            .with_node("web01", facts(&[("os", "linux",), ("ipaddress_eth0", "10.0.0.11",)],),)
            .with_node("web02", facts(&[("os", "bsd",)],),)
            .with_resource("Nagios_host", Resource::new("web01",).with_param("alias", "Web 1",),)
            .with_resource("Nagios_host", Resource::new("web02",).with_tag("workstation",),)
            .with_resource("Nagios_host", Resource::new("web01",).with_param("alias", "Shadow",),)
            .with_resource(
                "Nagios_service",
                Resource::new("http-web01",)
                    .with_param("service_description", "http",)
                    .with_param("host_name", "web01",),
            )
            .with_resource(
                "Nagios_service",
                Resource::new("http-web02",)
                    .with_param("service_description", "http",)
                    .with_param("host_name", "web02",),
            )
            .with_resource(
                "Nagios_command",
                Resource::new("check_disk",).with_param("command_line", "/bin/check.sh",),
            )
    }

    fn read(dir: &std::path::Path, name: &str,) -> String
    {
        std::fs::read_to_string(dir.join(name,),).expect("generated file exists",)
    }

    #[tokio::test]
    async fn run_writes_every_artifact()
    {
        let dir = tempfile::tempdir().expect("failed to create tempdir",);
        let config = Config {
            hostgroups: vec![HostgroupRule::Fact {
                fact: "os".to_owned(),
            }],
            ..Config::default()
        };

        let summary = Pipeline::new(inventory(), config, dir.path(),).run().await.expect("run succeeds",);

        assert_eq!(summary.nodes, 2);
        assert_eq!(summary.files.len(), REGISTRY.len() + 3);
        assert_eq!(summary.duplicates, [Duplicate {
            type_name: "host".to_owned(),
            name:      "web01".to_owned(),
        }]);

        let hosts = read(dir.path(), "auto_host.cfg",);
        assert!(hosts.contains("Web 1"));
        assert!(!hosts.contains("Shadow"));
        assert!(hosts.contains(&format!("  {:<30} 127.0.0.1\n", "address")));

        let command = read(dir.path(), "auto_command.cfg",);
        assert!(command.contains(&format!("  {:<30} check_disk\n", "command_name")));
        assert!(command.contains(&format!("  {:<30} /bin/check.sh\n", "command_line")));
        assert!(!command.contains("  command "));

        let http = read(dir.path(), "auto_servicegroup_http.cfg",);
        assert!(http.contains(&format!("  {:<30} web01,http,web02,http\n", "members")));

        assert!(read(dir.path(), "auto_hostgroup_os_linux.cfg",).contains("web01"));
        assert!(read(dir.path(), "auto_hostgroup_os_bsd.cfg",).contains("web02"));
        assert_eq!(read(dir.path(), "auto_timeperiod.cfg",), "");
    }

    #[tokio::test]
    async fn environment_and_predicates_reach_every_type_query()
    {
        let dir = tempfile::tempdir().expect("failed to create tempdir",);
        let config = parse("environment: production\nquery:\n  - field: tag\n    value: monitored\n",);
        let cmdb = MemoryCmdb::default();
        let pipeline = Pipeline::new(cmdb, config, dir.path(),);
        pipeline.run().await.expect("run succeeds",);

        let queries = pipeline.cmdb.issued_queries();
        assert_eq!(queries.len(), REGISTRY.len());
        assert_eq!(queries[0], r#"["and",["=","tag","monitored"],["=","type","Nagios_host"]]"#);
        assert!(queries.iter().all(|query| query.contains(r#"["=","tag","monitored"]"#)));
    }

    #[tokio::test]
    async fn missing_fact_aborts_after_type_files()
    {
        let dir = tempfile::tempdir().expect("failed to create tempdir",);
        let config = Config {
            hostgroups: vec![HostgroupRule::Template {
                name:           "{operatingsystem}".to_owned(),
                alias:          "{operatingsystem}".to_owned(),
                traits:         Vec::new(),
                monitored_only: false,
            }],
            ..Config::default()
        };

        let error = Pipeline::new(inventory(), config, dir.path(),).run().await.expect_err("expected failure",);
        assert!(matches!(error, Error::MissingFact { .. }));
        assert!(dir.path().join("auto_command.cfg").exists());
        assert!(!dir.path().join("auto_hostgroup_linux.cfg").exists());
    }

    #[tokio::test]
    async fn unreachable_cmdb_writes_nothing()
    {
        let dir = tempfile::tempdir().expect("failed to create tempdir",);
        let cmdb = MemoryCmdb {
            unreachable: true, ..inventory()
        };
        let error = Pipeline::new(cmdb, Config::default(), dir.path(),).run().await.expect_err("expected failure",);
        assert!(matches!(error, Error::Cmdb { .. }));
        assert_eq!(std::fs::read_dir(dir.path(),).expect("dir readable",).count(), 0);
    }

    #[test]
    fn clean_removes_only_generated_files()
    {
        let dir = tempfile::tempdir().expect("failed to create tempdir",);
        for name in ["auto_host.cfg", "auto_hostgroup_os_linux.cfg", "nagios.cfg", "auto_notes.txt"] {
            std::fs::write(dir.path().join(name,), "x",).expect("seed file",);
        }

        assert_eq!(clean_output_dir(dir.path(),).expect("clean succeeds",), 2);
        assert!(!dir.path().join("auto_host.cfg").exists());
        assert!(dir.path().join("nagios.cfg").exists());
        assert!(dir.path().join("auto_notes.txt").exists());
    }

    #[test]
    fn clean_reports_missing_directory()
    {
        let dir = tempfile::tempdir().expect("failed to create tempdir",);
        let error = clean_output_dir(&dir.path().join("absent",),).expect_err("expected failure",);
        assert!(matches!(error, Error::Write { .. }));
    }

    fn parse(yaml: &str,) -> Config
    {
        crate::config::parse_config(yaml,).expect("valid configuration",)
    }
}
