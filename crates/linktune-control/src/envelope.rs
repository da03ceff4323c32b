//! JSON bodies exchanged with the control sink.
//!
//! Field names follow the sink's camelCase wire convention.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use linktune_core::{EngineConfig, SinkConfig};

pub const CONTROL_REQUEST: &str = "RIC_CONTROL_REQUEST";
pub const SUBSCRIPTION_REQUEST: &str = "RIC_SUBSCRIPTION_REQUEST";
pub const MCS_ADJUSTMENT: &str = "MCS_ADJUSTMENT";

/// RAN function serving periodic metric reports.
pub const REPORT_RAN_FUNCTION_ID: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestId {
    pub ric_requestor_id: u32,
    pub ric_instance_id: u32,
}

/// One modulation-and-coding-scheme change for a target node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    pub message_type: String,
    pub ran_function_id: u32,
    pub ric_request_id: RequestId,
    pub ric_control_header: ControlHeader,
    pub ric_control_message: ControlMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlHeader {
    pub control_type: String,
    pub target_node_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub parameters: ControlParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlParameters {
    pub mcs: u8,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
}

impl ControlRequest {
    pub fn mcs_adjustment(config: &SinkConfig, mcs: u8, timestamp: f64) -> Self {
        Self {
            message_type: CONTROL_REQUEST.to_string(),
            ran_function_id: config.ran_function_id,
            ric_request_id: RequestId {
                ric_requestor_id: config.requestor_id,
                ric_instance_id: 0,
            },
            ric_control_header: ControlHeader {
                control_type: MCS_ADJUSTMENT.to_string(),
                target_node_id: config.target_node_id.clone(),
            },
            ric_control_message: ControlMessage {
                parameters: ControlParameters { mcs, timestamp },
            },
        }
    }
}

/// Announces this application to the sink after connecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub xapp_name: String,
    pub xapp_version: String,
    pub xapp_description: String,
    pub config_metadata: BTreeMap<String, ConfigParam>,
    pub supported_ran_functions: Vec<u32>,
    pub endpoints: Endpoints,
}

/// A tunable parameter and its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigParam {
    #[serde(rename = "type")]
    pub kind: String,
    pub default: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    pub health_check: String,
    pub metrics: String,
    pub config: String,
}

impl Registration {
    pub fn new(config: &SinkConfig) -> Self {
        let defaults = EngineConfig::default();
        let config_metadata = BTreeMap::from([
            (
                "cqiThreshold".to_string(),
                ConfigParam {
                    kind: "float".to_string(),
                    default: Value::from(defaults.cqi_threshold),
                },
            ),
            (
                "adjustmentInterval".to_string(),
                ConfigParam {
                    kind: "int".to_string(),
                    default: Value::from(defaults.adjustment_interval.as_secs()),
                },
            ),
        ]);

        Self {
            xapp_name: config.app_name.clone(),
            xapp_version: config.app_version.clone(),
            xapp_description: "Beam tuning and MCS optimization".to_string(),
            config_metadata,
            supported_ran_functions: vec![config.ran_function_id, REPORT_RAN_FUNCTION_ID],
            endpoints: Endpoints {
                health_check: "/healthz".to_string(),
                metrics: "/metrics".to_string(),
                config: "/config".to_string(),
            },
        }
    }
}

/// Requests periodic metric reports from the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub message_type: String,
    pub ran_function_id: u32,
    pub ric_request_id: RequestId,
    pub ric_subscription_details: SubscriptionDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDetails {
    pub ric_event_trigger_definition: EventTrigger,
    pub ric_action_definitions: Vec<ActionDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTrigger {
    pub trigger_type: String,
    pub interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefinition {
    pub ric_action_id: u32,
    pub ric_action_type: String,
    pub ric_action_definition: ReportParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportParameters {
    pub parameters: Vec<String>,
}

impl SubscriptionRequest {
    pub fn periodic(config: &SinkConfig, interval_ms: u64) -> Self {
        Self {
            message_type: SUBSCRIPTION_REQUEST.to_string(),
            ran_function_id: REPORT_RAN_FUNCTION_ID,
            ric_request_id: RequestId {
                ric_requestor_id: config.requestor_id,
                ric_instance_id: 1,
            },
            ric_subscription_details: SubscriptionDetails {
                ric_event_trigger_definition: EventTrigger {
                    trigger_type: "PERIODIC".to_string(),
                    interval_ms,
                },
                ric_action_definitions: vec![ActionDefinition {
                    ric_action_id: 1,
                    ric_action_type: "REPORT".to_string(),
                    ric_action_definition: ReportParameters {
                        parameters: ["CQI", "MCS", "THROUGHPUT", "BLER"]
                            .into_iter()
                            .map(String::from)
                            .collect(),
                    },
                }],
            },
        }
    }
}
