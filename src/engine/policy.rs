use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::models::courier::TransportType;

#[derive(Debug, Clone, Copy)]
pub struct DeliveryTimePolicy {
    on_foot: Duration,
    scooter: Duration,
    car: Duration,
}

impl DeliveryTimePolicy {
    pub fn new(on_foot: Duration, scooter: Duration, car: Duration) -> Self {
        Self {
            on_foot,
            scooter,
            car,
        }
    }

    pub fn offset(&self, transport: TransportType) -> Duration {
        match transport {
            TransportType::OnFoot => self.on_foot,
            TransportType::Scooter => self.scooter,
            TransportType::Car => self.car,
        }
    }

    pub fn deadline(&self, transport: TransportType, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.offset(transport)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn policy() -> DeliveryTimePolicy {
        DeliveryTimePolicy::new(
            Duration::from_secs(30 * 60),
            Duration::from_secs(15 * 60),
            Duration::from_secs(5 * 60),
        )
    }

    #[test]
    fn deadline_uses_transport_offset() {
        let now = Utc.with_ymd_and_hms(2025, 12, 22, 10, 0, 0).unwrap();

        assert_eq!(
            policy().deadline(TransportType::Car, now),
            Utc.with_ymd_and_hms(2025, 12, 22, 10, 5, 0).unwrap()
        );
        assert_eq!(
            policy().deadline(TransportType::Scooter, now),
            Utc.with_ymd_and_hms(2025, 12, 22, 10, 15, 0).unwrap()
        );
        assert_eq!(
            policy().deadline(TransportType::OnFoot, now),
            Utc.with_ymd_and_hms(2025, 12, 22, 10, 30, 0).unwrap()
        );
    }

}
