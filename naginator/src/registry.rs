// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Static table of the Nagios object types the generator renders.
//!
//! The table is ordered: the pipeline renders types in exactly this order,
//! which keeps `host` ahead of the hostgroup derivation that may depend on
//! the set of rendered hosts.

/// How the object name line of a block is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum NameRule
{
    /// Emit `name`, the template name directive.
    Generic,
    /// Emit `host_name` for real nodes and host templates using `use`,
    /// `name` otherwise.
    HostStyle,
    /// Emit `name` only for service templates, i.e. without `host_name`.
    ServiceStyle,
    /// Always emit the given directive.
    FixedField(&'static str,),
}

/// Rendering rules of one Nagios object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct TypeSpec
{
    /// Nagios object type, e.g. `host`.
    pub type_name:  &'static str,
    /// Exhaustive set of directives allowed on output, `None` for no
    /// filtering.
    pub allow_list: Option<&'static [&'static str],>,
    /// Name line rule.
    pub name_rule:  NameRule,
    /// PuppetDB parameter that carries the object name and is superseded by
    /// the name line.
    pub name_param: Option<&'static str,>,
}

impl TypeSpec
{
    const fn new(type_name: &'static str, name_rule: NameRule,) -> Self
    {
        Self {
            type_name, allow_list: None, name_rule, name_param: None,
        }
    }

    const fn allow(mut self, allow_list: &'static [&'static str],) -> Self
    {
        self.allow_list = Some(allow_list,);
        self
    }

    const fn named_by(mut self, name_param: &'static str,) -> Self
    {
        self.name_param = Some(name_param,);
        self
    }

    /// Returns `true` when `directive` may appear on output.
    pub fn allows(&self, directive: &str,) -> bool
    {
        self.allow_list.is_none_or(|allowed| allowed.contains(&directive,),)
    }
}

const HOST_DIRECTIVES: &[&str] = &[
    "host_name",
    "alias",
    "display_name",
    "address",
    "parents",
    "hostgroups",
    "check_command",
    "initial_state",
    "max_check_attempts",
    "check_interval",
    "retry_interval",
    "active_checks_enabled",
    "passive_checks_enabled",
    "check_period",
    "obsess_over_host",
    "check_freshness",
    "freshness_threshold",
    "event_handler",
    "event_handler_enabled",
    "low_flap_threshold",
    "high_flap_threshold",
    "flap_detection_enabled",
    "flap_detection_options",
    "process_perf_data",
    "retain_status_information",
    "retain_nonstatus_information",
    "contacts",
    "contact_groups",
    "notification_interval",
    "first_notification_delay",
    "notification_period",
    "notification_options",
    "notifications_enabled",
    "stalking_options",
    "notes",
    "notes_url",
    "action_url",
    "icon_image",
    "icon_image_alt",
    "vrml_image",
    "statusmap_image",
    "2d_coords",
    "3d_coords",
    "use",
];

const SERVICE_DIRECTIVES: &[&str] = &[
    "host_name",
    "hostgroup_name",
    "service_description",
    "display_name",
    "servicegroups",
    "is_volatile",
    "check_command",
    "initial_state",
    "max_check_attempts",
    "check_interval",
    "retry_interval",
    "active_checks_enabled",
    "passive_checks_enabled",
    "check_period",
    "obsess_over_service",
    "check_freshness",
    "freshness_threshold",
    "event_handler",
    "event_handler_enabled",
    "low_flap_threshold",
    "high_flap_threshold",
    "flap_detection_enabled",
    "flap_detection_options",
    "process_perf_data",
    "retain_status_information",
    "retain_nonstatus_information",
    "notification_interval",
    "first_notification_delay",
    "notification_period",
    "notification_options",
    "notifications_enabled",
    "contacts",
    "contact_groups",
    "stalking_options",
    "notes",
    "notes_url",
    "action_url",
    "icon_image",
    "icon_image_alt",
    "use",
];

const HOSTGROUP_DIRECTIVES: &[&str] =
    &["hostgroup_name", "alias", "members", "hostgroup_members", "notes", "notes_url", "action_url"];

const SERVICEGROUP_DIRECTIVES: &[&str] = &[
    "servicegroup_name",
    "alias",
    "members",
    "servicegroup_members",
    "notes",
    "notes_url",
    "action_url",
];

const COMMAND_DIRECTIVES: &[&str] = &["command_name", "command_line"];

const CONTACT_DIRECTIVES: &[&str] = &[
    "contact_name",
    "alias",
    "contactgroups",
    "host_notifications_enabled",
    "service_notifications_enabled",
    "host_notification_period",
    "service_notification_period",
    "host_notification_options",
    "service_notification_options",
    "host_notification_commands",
    "service_notification_commands",
    "email",
    "pager",
    "addressx",
    "can_submit_commands",
    "retain_status_information",
    "retain_nonstatus_information",
];

const CONTACTGROUP_DIRECTIVES: &[&str] =
    &["contactgroup_name", "alias", "members", "contactgroup_members"];

/// Every supported type in rendering order.
pub const REGISTRY: &[TypeSpec] = &[
    TypeSpec::new("host", NameRule::HostStyle,).allow(HOST_DIRECTIVES,),
    TypeSpec::new("hostgroup", NameRule::FixedField("hostgroup_name",),)
        .allow(HOSTGROUP_DIRECTIVES,),
    TypeSpec::new("hostescalation", NameRule::Generic,),
    TypeSpec::new("hostdependency", NameRule::Generic,),
    TypeSpec::new("hostextinfo", NameRule::Generic,),
    TypeSpec::new("service", NameRule::ServiceStyle,).allow(SERVICE_DIRECTIVES,),
    TypeSpec::new("servicegroup", NameRule::FixedField("servicegroup_name",),)
        .allow(SERVICEGROUP_DIRECTIVES,),
    TypeSpec::new("serviceescalation", NameRule::Generic,),
    TypeSpec::new("servicedependency", NameRule::Generic,),
    TypeSpec::new("serviceextinfo", NameRule::Generic,),
    TypeSpec::new("contact", NameRule::FixedField("contact_name",),).allow(CONTACT_DIRECTIVES,),
    TypeSpec::new("contactgroup", NameRule::FixedField("contactgroup_name",),)
        .allow(CONTACTGROUP_DIRECTIVES,),
    TypeSpec::new("timeperiod", NameRule::FixedField("timeperiod_name",),),
    TypeSpec::new("command", NameRule::FixedField("command_name",),)
        .allow(COMMAND_DIRECTIVES,)
        .named_by("command",),
];

/// Looks up the rendering rules of a Nagios object type.
///
/// Returns `None` for types the generator does not render.
///
/// ```
/// use naginator::{NameRule, lookup};
///
/// assert_eq!(lookup("command").map(|spec| spec.name_rule), Some(NameRule::FixedField("command_name")));
/// assert!(lookup("hostgroups").is_none());
/// ```
pub fn lookup(type_name: &str,) -> Option<&'static TypeSpec,>
{
    REGISTRY.iter().find(|spec| spec.type_name == type_name,)
}
