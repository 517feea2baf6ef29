// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// PuppetDB access for the generator.
///
/// [`Cmdb`] is the seam between the rendering pipeline and the database;
/// [`PuppetDbClient`] implements it over the HTTP query API (v3 and v4).
/// Requests are issued one at a time and never retried: a failed query
/// aborts the run.
use std::future::Future;

use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;

use crate::{
    config::{PuppetDbSettings, validate_api_version},
    error::Error,
    model::{Facts, NodeFacts, Resource},
    query::Query,
};

const USER_AGENT: &str = concat!("naginator/", env!("CARGO_PKG_VERSION"));

/// Read-only view of the configuration-management database.
pub trait Cmdb
{
    /// Lists the certnames of known nodes, optionally restricted to a
    /// Puppet environment.
    fn nodes(
        &self,
        environment: Option<&str,>,
    ) -> impl Future<Output = Result<Vec<String,>, Error,>,> + Send;

    /// Returns every fact of a node.
    fn node_facts(&self, node: &str,) -> impl Future<Output = Result<Facts, Error,>,> + Send;

    /// Returns resources matching `query`, optionally restricted to a Puppet
    /// environment, in database order.
    fn resources(
        &self,
        query: &Query,
        environment: Option<&str,>,
    ) -> impl Future<Output = Result<Vec<Resource,>, Error,>,> + Send;

    /// Returns the resources of type `resource_type` titled `title` in the
    /// catalog of `node`.
    fn node_resources(
        &self,
        node: &str,
        resource_type: &str,
        title: &str,
    ) -> impl Future<Output = Result<Vec<Resource,>, Error,>,> + Send;
}

/// Builds the fact table of every node: one nodes query, then one facts
/// query per node, strictly in sequence.
///
/// # Errors
///
/// Propagates the first CMDB failure.
pub async fn fetch_node_facts<C: Cmdb,>(
    cmdb: &C,
    environment: Option<&str,>,
) -> Result<NodeFacts, Error,>
{
    let nodes = cmdb.nodes(environment,).await?;
    debug!("Fetching facts for {} nodes", nodes.len());

    let mut node_facts = NodeFacts::new();
    for node in nodes {
        let facts = cmdb.node_facts(&node,).await?;
        node_facts.insert(node, facts,);
    }
    Ok(node_facts,)
}

#[derive(Debug, Deserialize,)]
struct NodeRecord
{
    #[serde(alias = "name")]
    certname: String,
}

#[derive(Debug, Deserialize,)]
struct FactRecord
{
    name:  String,
    value: serde_json::Value,
}

/// HTTP client for the PuppetDB query API.
#[derive(Debug, Clone,)]
pub struct PuppetDbClient
{
    http:        Client,
    base_url:    Url,
    api_version: u8,
}

impl PuppetDbClient
{
    /// Connects to `http://<host>:<port>/` with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](Error::Validation) for an unusable host
    /// or API version and [`Error::Cmdb`](Error::Cmdb) when the HTTP client
    /// cannot be built.
    pub fn new(settings: &PuppetDbSettings,) -> Result<Self, Error,>
    {
        let base_url = Url::parse(&format!("http://{}:{}/", settings.host, settings.port),)
            .map_err(|e| Error::validation(format!("invalid puppetdb host '{}': {e}", settings.host),),)?;
        let http = Client::builder()
            .timeout(settings.timeout(),)
            .user_agent(USER_AGENT,)
            .build()
            .map_err(|e| Error::cmdb(format!("failed to build HTTP client: {e}"),),)?;
        Self::with_client(http, base_url, settings.api_version,)
    }

    /// Creates a client with a pre-built `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](Error::Validation) for an unsupported
    /// API version.
    pub fn with_client(http: Client, base_url: Url, api_version: u8,) -> Result<Self, Error,>
    {
        validate_api_version(api_version,)?;
        Ok(Self {
            http,
            base_url,
            api_version,
        },)
    }

    /// Root URL of the server.
    pub fn base_url(&self,) -> &Url
    {
        &self.base_url
    }

    fn api_prefix(&self,) -> &'static [&'static str]
    {
        if self.api_version == 3 { &["v3"] } else { &["pdb", "query", "v4"] }
    }

    /// Builds `<base>/<api prefix>/<segments...>` with each segment
    /// percent-encoded.
    fn endpoint(&self, segments: &[&str],) -> Result<Url, Error,>
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::validation(format!("puppetdb url '{}' cannot be a base", self.base_url),),)?
            .pop_if_empty()
            .extend(self.api_prefix(),)
            .extend(segments,);
        Ok(url,)
    }

    fn environment_query(&self, environment: &str,) -> Query
    {
        let (catalog, facts,) = if self.api_version == 3 {
            ("catalog-environment", "facts-environment",)
        } else {
            ("catalog_environment", "facts_environment",)
        };
        Query::And(vec![Query::equal(catalog, environment,), Query::equal(facts, environment,)],)
    }

    async fn get<T: DeserializeOwned,>(&self, url: Url, query: Option<&Query,>,) -> Result<T, Error,>
    {
        let mut request = self.http.get(url.clone(),);
        if let Some(query,) = query {
            debug!("GET {} query={}", url, query);
            request = request.query(&[("query", query.to_string(),)],);
        } else {
            debug!("GET {}", url);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::cmdb(format!("GET {url} returned {status}: {}", body.trim()),),);
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes,)?,)
    }
}

impl Cmdb for PuppetDbClient
{
    async fn nodes(&self, environment: Option<&str,>,) -> Result<Vec<String,>, Error,>
    {
        let url = self.endpoint(&["nodes"],)?;
        let query = environment.map(|environment| self.environment_query(environment,),);
        let records: Vec<NodeRecord,> = self.get(url, query.as_ref(),).await?;
        Ok(records.into_iter().map(|record| record.certname,).collect(),)
    }

    async fn node_facts(&self, node: &str,) -> Result<Facts, Error,>
    {
        let url = self.endpoint(&["nodes", node, "facts"],)?;
        let records: Vec<FactRecord,> = self.get(url, None,).await?;
        Ok(records.into_iter().map(|record| (record.name, record.value,),).collect(),)
    }

    async fn resources(
        &self,
        query: &Query,
        environment: Option<&str,>,
    ) -> Result<Vec<Resource,>, Error,>
    {
        let url = self.endpoint(&["resources"],)?;
        let query = match environment {
            Some(environment,) => {
                query.clone().and_all(vec![Query::equal("environment", environment,)],)
            }
            None => query.clone(),
        };
        self.get(url, Some(&query,),).await
    }

    async fn node_resources(
        &self,
        node: &str,
        resource_type: &str,
        title: &str,
    ) -> Result<Vec<Resource,>, Error,>
    {
        let url = self.endpoint(&["nodes", node, "resources", resource_type, title],)?;
        self.get(url, None,).await
    }
}

/// In-memory [`Cmdb`] used by unit tests across the crate.
#[cfg(test)]
pub(crate) mod memory
{
    use std::sync::Mutex;

    use super::Cmdb;
    use crate::{
        error::Error,
        model::{Facts, Resource},
        query::Query,
    };

    /// Serves canned nodes, facts and resources and records issued queries.
    #[derive(Debug, Default,)]
    pub(crate) struct MemoryCmdb
    {
        pub nodes:          Vec<(String, Facts,),>,
        pub resources:      Vec<(String, Resource,),>,
        pub node_resources: Vec<(String, String, String,),>,
        pub unreachable:    bool,
        pub queries:        Mutex<Vec<String,>,>,
    }

    impl MemoryCmdb
    {
        pub(crate) fn with_node(mut self, name: &str, facts: Facts,) -> Self
        {
            self.nodes.push((name.to_owned(), facts,),);
            self
        }

        pub(crate) fn with_resource(mut self, resource_type: &str, resource: Resource,) -> Self
        {
            self.resources.push((resource_type.to_owned(), resource,),);
            self
        }

        pub(crate) fn with_node_resource(mut self, node: &str, resource_type: &str, title: &str,) -> Self
        {
            self.node_resources.push((node.to_owned(), resource_type.to_owned(), title.to_owned(),),);
            self
        }

        pub(crate) fn issued_queries(&self,) -> Vec<String,>
        {
            self.queries.lock().map(|queries| queries.clone(),).unwrap_or_default()
        }

        fn check(&self,) -> Result<(), Error,>
        {
            if self.unreachable { Err(Error::cmdb("connection refused",),) } else { Ok((),) }
        }
    }

    fn queried_type(query: &Query,) -> Option<&str,>
    {
        match query {
            Query::Equal {
                field,
                value,
            } if field == "type" => Some(value.as_str(),),
            Query::Equal {
                ..
            } => None,
            Query::And(parts,) => parts.iter().find_map(queried_type,),
        }
    }

    impl Cmdb for MemoryCmdb
    {
        async fn nodes(&self, _environment: Option<&str,>,) -> Result<Vec<String,>, Error,>
        {
            self.check()?;
            Ok(self.nodes.iter().map(|(name, _,)| name.clone(),).collect(),)
        }

        async fn node_facts(&self, node: &str,) -> Result<Facts, Error,>
        {
            self.check()?;
            Ok(self
                .nodes
                .iter()
                .find(|(name, _,)| name == node,)
                .map(|(_, facts,)| facts.clone(),)
                .unwrap_or_default(),)
        }

        async fn resources(
            &self,
            query: &Query,
            _environment: Option<&str,>,
        ) -> Result<Vec<Resource,>, Error,>
        {
            self.check()?;
            if let Ok(mut queries,) = self.queries.lock() {
                queries.push(query.to_string(),);
            }
            let wanted = queried_type(query,);
            Ok(self
                .resources
                .iter()
                .filter(|(resource_type, _,)| Some(resource_type.as_str(),) == wanted,)
                .map(|(_, resource,)| resource.clone(),)
                .collect(),)
        }

        async fn node_resources(
            &self,
            node: &str,
            resource_type: &str,
            title: &str,
        ) -> Result<Vec<Resource,>, Error,>
        {
            self.check()?;
            let found = self.node_resources.iter().any(|(n, t, r,)| n == node && t == resource_type && r == title,);
            Ok(if found { vec![Resource::new(title,)] } else { Vec::new() },)
        }
    }
}
