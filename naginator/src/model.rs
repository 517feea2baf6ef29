// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Records returned by PuppetDB and the per-run fact table.
//!
//! Resources are read-only snapshots of one query. The only mutation the
//! renderer performs is injecting an `address` parameter on workstation
//! hosts, which happens on its own copy of the parameter map.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// Facts of a single node keyed by fact name.
pub type Facts = BTreeMap<String, Value,>;

/// A typed, named configuration object exported to PuppetDB.
#[derive(Debug, Deserialize, Clone, PartialEq,)]
pub struct Resource
{
    /// Resource title, used as the Nagios object name.
    #[serde(rename = "title")]
    pub name: String,

    /// Tags attached to the resource by the Puppet catalog.
    #[serde(default)]
    pub tags: BTreeSet<String,>,

    /// Resource parameters in the order PuppetDB returned them.
    #[serde(default)]
    pub parameters: IndexMap<String, ParamValue,>,
}

impl Resource
{
    /// Creates a resource without tags or parameters.
    pub fn new(name: impl Into<String,>,) -> Self
    {
        Self {
            name: name.into(), tags: BTreeSet::new(), parameters: IndexMap::new(),
        }
    }

    /// Adds a tag, returning the resource for chaining.
    pub fn with_tag(mut self, tag: impl Into<String,>,) -> Self
    {
        self.tags.insert(tag.into(),);
        self
    }

    /// Adds a parameter, returning the resource for chaining.
    pub fn with_param(mut self, name: impl Into<String,>, value: impl Into<ParamValue,>,) -> Self
    {
        self.parameters.insert(name.into(), value.into(),);
        self
    }

    /// Returns `true` when the resource declares the parameter, whatever its
    /// value.
    pub fn has_param(&self, name: &str,) -> bool
    {
        self.parameters.contains_key(name,)
    }
}

/// Value of a resource parameter.
///
/// PuppetDB stores parameters as arbitrary JSON; Nagios only understands
/// text, so every variant knows how to render itself into a directive value.
#[derive(Debug, Deserialize, Clone, PartialEq,)]
#[serde(untagged)]
pub enum ParamValue
{
    /// Plain string value.
    Text(String,),
    /// Numeric value as decoded from JSON.
    Number(serde_json::Number,),
    /// Boolean flag.
    Flag(bool,),
    /// Ordered list of values.
    List(Vec<ParamValue,>,),
    /// Explicit `null` (`undef` in the Puppet manifest).
    Null,
    /// Any other JSON value, such as a hash, kept verbatim.
    Other(Value,),
}

impl ParamValue
{
    /// Returns `true` for values that must not be emitted: `null`, `false`,
    /// empty strings and hashes, numeric zero, and lists holding nothing but
    /// such values.
    pub fn is_empty(&self,) -> bool
    {
        match self {
            Self::Text(text,) => text.is_empty(),
            Self::Number(number,) => number.as_f64().is_some_and(|value| value == 0.0,),
            Self::Flag(flag,) => !flag,
            Self::List(items,) => items.iter().all(Self::is_empty,),
            Self::Null => true,
            Self::Other(value,) => value.as_object().is_some_and(serde_json::Map::is_empty,),
        }
    }

    /// Renders the value as a Nagios directive value.
    ///
    /// Lists are joined with commas, keep their element order and skip empty
    /// elements; `true` renders as `1`; hashes render as JSON text.
    pub fn render(&self,) -> String
    {
        match self {
            Self::Text(text,) => text.clone(),
            Self::Number(number,) => number.to_string(),
            Self::Flag(true,) => "1".to_owned(),
            Self::Flag(false,) => "0".to_owned(),
            Self::List(items,) => items
                .iter()
                .filter(|item| !item.is_empty(),)
                .map(Self::render,)
                .collect::<Vec<_,>>()
                .join(",",),
            Self::Null => String::new(),
            Self::Other(value,) => value.to_string(),
        }
    }

    /// Flattens the value into individual text items, expanding lists.
    ///
    /// Used where each element is a distinct member, such as the hosts a
    /// service is attached to.
    pub fn items(&self,) -> Vec<String,>
    {
        match self {
            Self::List(items,) => items.iter().flat_map(Self::items,).collect(),
            other if other.is_empty() => Vec::new(),
            other => vec![other.render()],
        }
    }
}

impl From<&str,> for ParamValue
{
    fn from(value: &str,) -> Self
    {
        Self::Text(value.to_owned(),)
    }
}

impl From<String,> for ParamValue
{
    fn from(value: String,) -> Self
    {
        Self::Text(value,)
    }
}

impl From<Vec<&str,>,> for ParamValue
{
    fn from(values: Vec<&str,>,) -> Self
    {
        Self::List(values.into_iter().map(Self::from,).collect(),)
    }
}

/// Facts of every known node, built once per run.
///
/// Hostnames iterate in sorted order so derived group memberships are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq,)]
pub struct NodeFacts
{
    nodes: BTreeMap<String, Facts,>,
}

impl NodeFacts
{
    /// Creates an empty fact table.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Records the facts of a node, replacing any previous entry.
    pub fn insert(&mut self, host: impl Into<String,>, facts: Facts,)
    {
        self.nodes.insert(host.into(), facts,);
    }

    /// Returns `true` when the host is a known node.
    pub fn contains(&self, host: &str,) -> bool
    {
        self.nodes.contains_key(host,)
    }

    /// Returns the facts of a host.
    pub fn get(&self, host: &str,) -> Option<&Facts,>
    {
        self.nodes.get(host,)
    }

    /// Returns a single fact of a host.
    pub fn fact(&self, host: &str, fact: &str,) -> Option<&Value,>
    {
        self.nodes.get(host,).and_then(|facts| facts.get(fact,),)
    }

    /// Iterates over hostnames in sorted order.
    pub fn hosts(&self,) -> impl Iterator<Item = &str,>
    {
        self.nodes.keys().map(String::as_str,)
    }

    /// Iterates over `(hostname, facts)` pairs in sorted order.
    pub fn iter(&self,) -> impl Iterator<Item = (&str, &Facts,),>
    {
        self.nodes.iter().map(|(host, facts,)| (host.as_str(), facts,),)
    }

    /// Number of known nodes.
    pub fn len(&self,) -> usize
    {
        self.nodes.len()
    }

    /// Returns `true` when no node is known.
    pub fn is_empty(&self,) -> bool
    {
        self.nodes.is_empty()
    }
}

impl FromIterator<(String, Facts,),> for NodeFacts
{
    fn from_iter<I: IntoIterator<Item = (String, Facts,),>,>(iter: I,) -> Self
    {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

/// Renders a fact value as text: strings raw, everything else as JSON.
pub fn fact_text(value: &Value,) -> String
{
    match value {
        Value::String(text,) => text.clone(),
        other => other.to_string(),
    }
}
