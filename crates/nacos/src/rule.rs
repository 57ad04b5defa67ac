//! Sentinel dashboard rule entities as stored in Nacos.
//!
//! The JSON shape matches what the dashboard writes: camelCase keys, unset
//! fields omitted, timestamps as epoch milliseconds. Unknown keys are ignored
//! on read so rules written by newer dashboards still decode.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Layout of an encoded rule list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonFormat {
    /// Indented, one field per line.
    Pretty,
    /// Single line.
    Compact,
}

/// The closed set of rule types synchronized through Nacos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Flow control rules
    Flow,
    /// Circuit breaking rules
    Degrade,
    /// Hot parameter flow rules
    ParamFlow,
    /// System adaptive protection rules
    System,
    /// Origin black/white list rules
    Authority,
}

impl RuleKind {
    /// All rule kinds.
    pub const ALL: [Self; 5] =
        [Self::Flow, Self::Degrade, Self::ParamFlow, Self::System, Self::Authority];

    /// Suffix appended to the lower-cased app name to form the Nacos data id.
    pub const fn data_id_postfix(&self) -> &'static str {
        match self {
            Self::Flow => "-flow-rules",
            Self::Degrade => "-degrade-rules",
            Self::ParamFlow => "-param-rules",
            Self::System => "-system-rules",
            Self::Authority => "-authority-rules",
        }
    }

    /// Layout the dashboard uses when encoding this kind.
    pub const fn json_format(&self) -> JsonFormat {
        match self {
            Self::Authority => JsonFormat::Compact,
            _ => JsonFormat::Pretty,
        }
    }

    /// Short name, as accepted by [`FromStr`].
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Flow => "flow",
            Self::Degrade => "degrade",
            Self::ParamFlow => "param-flow",
            Self::System => "system",
            Self::Authority => "authority",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown rule kind: {s}"))
    }
}

/// Nacos data id of `kind` rules for `app`.
///
/// The app name is lower-cased, so lookups are case-insensitive.
pub fn rule_data_id(app: &str, kind: RuleKind) -> String {
    format!("{}{}", app.to_lowercase(), kind.data_id_postfix())
}

/// A rule entity that can be synchronized through Nacos.
pub trait RuleEntity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Which rule kind this entity is.
    const KIND: RuleKind;
}

/// Cluster flow control settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterFlowConfig {
    /// Globally unique flow id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<i64>,
    /// Threshold type: 0 average local, 1 global
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_type: Option<i32>,
    /// Fall back to local flow control when the token server is unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_to_local_when_fail: Option<bool>,
    /// Cluster flow control strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<i32>,
    /// Sample count of the sliding window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<i32>,
    /// Sliding window interval in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_interval_ms: Option<i32>,
}

/// Flow control rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowRuleEntity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_app: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// 0 thread count, 1 QPS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<f64>,
    /// 0 direct, 1 relate, 2 chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_resource: Option<String>,
    /// 0 reject, 1 warm up, 2 rate limiter, 3 warm up rate limiter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_behavior: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warm_up_period_sec: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_queueing_time_ms: Option<i32>,
    #[serde(default)]
    pub cluster_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_config: Option<ClusterFlowConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmt_create: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmt_modified: Option<i64>,
}

impl RuleEntity for FlowRuleEntity {
    const KIND: RuleKind = RuleKind::Flow;
}

/// Circuit breaking rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DegradeRuleEntity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_app: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<f64>,
    /// Recovery timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_window: Option<i32>,
    /// 0 slow request ratio, 1 error ratio, 2 error count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_request_amount: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slow_ratio_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stat_interval_ms: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmt_create: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmt_modified: Option<i64>,
}

impl RuleEntity for DegradeRuleEntity {
    const KIND: RuleKind = RuleKind::Degrade;
}

/// System adaptive protection rule. Negative thresholds disable a check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemRuleEntity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_system_load: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_rt: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_thread: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_cpu_usage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmt_create: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmt_modified: Option<i64>,
}

impl RuleEntity for SystemRuleEntity {
    const KIND: RuleKind = RuleKind::System;
}

/// Core of an authority rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Comma-separated origins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_app: Option<String>,
    /// 0 white list, 1 black list
    #[serde(default)]
    pub strategy: i32,
}

/// Origin black/white list rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityRuleEntity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<AuthorityRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmt_create: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmt_modified: Option<i64>,
}

impl RuleEntity for AuthorityRuleEntity {
    const KIND: RuleKind = RuleKind::Authority;
}

/// Threshold override for a specific parameter value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamFlowItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i32>,
    /// Java class name of the parameter, e.g. `java.lang.String`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_type: Option<String>,
}

/// Cluster settings of a parameter flow rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamFlowClusterConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_type: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_to_local_when_fail: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_interval_ms: Option<i32>,
}

/// Core of a parameter flow rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamFlowRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_app: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<i32>,
    /// Index of the hot parameter in the resource's argument list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param_idx: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_behavior: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_queueing_time_ms: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burst_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_in_sec: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub param_flow_item_list: Vec<ParamFlowItem>,
    #[serde(default)]
    pub cluster_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_config: Option<ParamFlowClusterConfig>,
}

/// Hot parameter flow rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamFlowRuleEntity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<ParamFlowRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmt_create: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmt_modified: Option<i64>,
}

impl RuleEntity for ParamFlowRuleEntity {
    const KIND: RuleKind = RuleKind::ParamFlow;
}
