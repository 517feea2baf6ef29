// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Service groups derived from the `service` resources of a run.
//!
//! Every distinct `service_description` becomes a group whose members are the
//! `(host, service)` pairs carrying it.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::{
    error::Error,
    render::{ObjectBlock, output_path, write_output},
};

/// Hosts of each service description, in the order the services were seen.
pub type ServiceGroupIndex = IndexMap<String, Vec<String,>,>;

/// Builds the `define servicegroup` block of one group.
pub fn servicegroup_block(key: &str, hosts: &[String],) -> ObjectBlock
{
    let members: Vec<String,> = hosts.iter().map(|host| format!("{host},{key}"),).collect();
    let mut block = ObjectBlock::new("servicegroup",);
    block.push("servicegroup_name", key,);
    block.push("alias", key,);
    block.push("members", members.join(",",),);
    block
}

/// Writes one `auto_servicegroup_<key>.cfg` per group.
///
/// # Errors
///
/// Returns [`Error::Write`] when a file cannot be written; files written
/// before the failure are left in place.
pub fn write_servicegroups(index: &ServiceGroupIndex, output_dir: &Path,) -> Result<Vec<PathBuf,>, Error,>
{
    let mut written = Vec::with_capacity(index.len(),);
    for (key, hosts,) in index {
        if hosts.is_empty() {
            debug!("Skipping servicegroup {key} without members");
            continue;
        }
        let path = output_path(output_dir, &format!("servicegroup_{key}"),);
        write_output(&path, &servicegroup_block(key, hosts,).to_string(),)?;
        debug!("Wrote servicegroup {key} with {} members", hosts.len());
        written.push(path,);
    }
    info!("Wrote {} service groups", written.len());
    Ok(written,)
}
