// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! PuppetDB query expressions.
//!
//! Only the two operators the generator needs are modelled: field equality
//! and conjunction. Expressions serialize to the JSON array syntax accepted
//! by the `query` parameter of the PuppetDB API, e.g.
//! `["and", ["=", "tag", "monitored"], ["=", "type", "Nagios_host"]]`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Prefix PuppetDB uses for the native Nagios resource types.
pub const RESOURCE_TYPE_PREFIX: &str = "Nagios_";

/// A `(field, value)` equality predicate supplied by configuration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq,)]
pub struct Predicate
{
    /// Queried field, e.g. `tag` or `certname`.
    pub field: String,
    /// Expected value of the field.
    pub value: String,
}

/// Query expression accepted by the PuppetDB API.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub enum Query
{
    /// `["=", field, value]`
    Equal
    {
        /// Queried field.
        field: String,
        /// Expected value.
        value: String,
    },
    /// `["and", ...]`
    And(Vec<Query,>,),
}

impl Query
{
    /// Builds an equality predicate.
    pub fn equal(field: impl Into<String,>, value: impl Into<String,>,) -> Self
    {
        Self::Equal {
            field: field.into(), value: value.into(),
        }
    }

    /// Selects resources of the Nagios object type `type_name`.
    ///
    /// ```
    /// use naginator::Query;
    ///
    /// let query = Query::resource_type("host",);
    /// assert_eq!(query.to_string(), r#"["=","type","Nagios_host"]"#);
    /// ```
    pub fn resource_type(type_name: &str,) -> Self
    {
        Self::equal("type", format!("{RESOURCE_TYPE_PREFIX}{type_name}"),)
    }

    /// Conjoins `extra` predicates in front of `self`.
    ///
    /// Returns `self` unchanged when there is nothing to conjoin, so the
    /// simple single-predicate form is kept whenever possible.
    pub fn and_all(self, extra: Vec<Query,>,) -> Self
    {
        if extra.is_empty() {
            return self;
        }
        let mut parts = extra;
        parts.push(self,);
        Self::And(parts,)
    }

    /// Converts configured predicates into equality expressions.
    pub fn from_predicates(predicates: &[Predicate],) -> Vec<Query,>
    {
        predicates
            .iter()
            .map(|predicate| Self::equal(predicate.field.as_str(), predicate.value.as_str(),),)
            .collect()
    }

    /// JSON representation sent to PuppetDB.
    pub fn to_json(&self,) -> Value
    {
        match self {
            Self::Equal {
                field,
                value,
            } => json!(["=", field, value]),
            Self::And(parts,) => {
                let mut items = Vec::with_capacity(parts.len() + 1,);
                items.push(Value::from("and",),);
                items.extend(parts.iter().map(Self::to_json,),);
                Value::Array(items,)
            }
        }
    }
}

impl std::fmt::Display for Query
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        write!(f, "{}", self.to_json())
    }
}
