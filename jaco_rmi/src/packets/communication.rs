use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "Communication")]
pub enum Communication {
    #[serde(rename = "JACO_Connect")]
    Connect,
    #[serde(rename = "JACO_Disconnect")]
    Disconnect,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "Communication")]
pub enum CommunicationResponse {
    #[serde(rename = "JACO_Connect")]
    Connect(ConnectResponse),
    #[serde(rename = "JACO_Disconnect")]
    Disconnect(DisconnectResponse),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConnectResponse {
    #[serde(rename = "ErrorID")]
    pub error_id: u32,
    #[serde(rename = "RobotType", default)]
    pub robot_type: String,
    #[serde(rename = "MajorVersion")]
    pub major_version: u16,
    #[serde(rename = "MinorVersion")]
    pub minor_version: u16,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DisconnectResponse {
    #[serde(rename = "ErrorID")]
    pub error_id: u32,
}
