use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourierStatus {
    Available,
    Busy,
    Paused,
}

impl CourierStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CourierStatus::Available => "available",
            CourierStatus::Busy => "busy",
            CourierStatus::Paused => "paused",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "available" => Some(CourierStatus::Available),
            "busy" => Some(CourierStatus::Busy),
            "paused" => Some(CourierStatus::Paused),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    OnFoot,
    Scooter,
    Car,
}

impl TransportType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportType::OnFoot => "on_foot",
            TransportType::Scooter => "scooter",
            TransportType::Car => "car",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "on_foot" => Some(TransportType::OnFoot),
            "scooter" => Some(TransportType::Scooter),
            "car" => Some(TransportType::Car),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: i32,
    pub name: String,
    pub phone: String,
    pub status: CourierStatus,
    pub transport_type: TransportType,
    pub assignments_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCourier {
    pub name: String,
    pub phone: String,
    pub status: CourierStatus,
    pub transport_type: TransportType,
}
