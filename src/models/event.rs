use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusEvent {
    pub order_id: String,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEventKind {
    Created,
    Cancelled,
    Completed,
    Other,
}

impl OrderEventKind {
    pub fn parse(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "created" => OrderEventKind::Created,
            "cancelled" | "canceled" => OrderEventKind::Cancelled,
            "completed" | "delivered" => OrderEventKind::Completed,
            _ => OrderEventKind::Other,
        }
    }
}

pub fn same_status(actual: &str, event: &str) -> bool {
    actual.trim().eq_ignore_ascii_case(event.trim())
}

#[cfg(test)]
mod tests {
    use super::{same_status, OrderEventKind};

    #[test]
    fn parse_collapses_spellings() {
        assert_eq!(OrderEventKind::parse("created"), OrderEventKind::Created);
        assert_eq!(OrderEventKind::parse("cancelled"), OrderEventKind::Cancelled);
        assert_eq!(OrderEventKind::parse("canceled"), OrderEventKind::Cancelled);
        assert_eq!(OrderEventKind::parse("completed"), OrderEventKind::Completed);
        assert_eq!(OrderEventKind::parse("delivered"), OrderEventKind::Completed);
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(OrderEventKind::parse("  Created "), OrderEventKind::Created);
        assert_eq!(OrderEventKind::parse("DELIVERED"), OrderEventKind::Completed);
    }

    #[test]
    fn unknown_statuses_are_other() {
        assert_eq!(OrderEventKind::parse("preparing"), OrderEventKind::Other);
        assert_eq!(OrderEventKind::parse(""), OrderEventKind::Other);
    }

    #[test]
    fn same_status_ignores_case_and_whitespace() {
        assert!(same_status(" Delivered ", "delivered"));
        assert!(!same_status("created", "delivered"));
    }
}
