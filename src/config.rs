use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub postgres: PostgresConfig,
    pub order_service_host: String,
    pub order_service_http: String,
    pub kafka: KafkaConfig,
    pub order_polling: bool,
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: String,
    pub user: String,
    pub password: String,
    pub db: String,
}

impl PostgresConfig {
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.db
        )
    }
}

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    pub group_id: String,
    pub version: String,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// `None` disables the expiry sweeper.
    pub monitor_interval: Option<Duration>,
    pub on_foot: Duration,
    pub scooter: Duration,
    pub car: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let brokers = split_csv(&env_or_default("KAFKA_BROKERS", ""));
        let kafka_enabled = match env::var("KAFKA_ENABLED") {
            Ok(raw) if !raw.trim().is_empty() => parse_bool(&raw),
            _ => !brokers.is_empty(),
        };

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|raw| raw.trim().parse().ok())
                .unwrap_or(8080),
            log_level: env_or_default("LOG_LEVEL", "info"),
            postgres: PostgresConfig {
                host: env_or_default("POSTGRES_HOST", "localhost"),
                port: env_or_default("POSTGRES_PORT", "5432"),
                user: env_or_default("POSTGRES_USER", "postgres"),
                password: env_or_default("POSTGRES_PASSWORD", "postgres"),
                db: env_or_default("POSTGRES_DB", "postgres"),
            },
            order_service_host: env_or_default("ORDER_SERVICE_HOST", "localhost:50051"),
            order_service_http: env_or_default("ORDER_SERVICE_HTTP", "http://localhost:8083"),
            kafka: KafkaConfig {
                brokers,
                topic: env_or_default("KAFKA_ORDER_TOPIC", ""),
                group_id: env_or_default("KAFKA_CONSUMER_GROUP", ""),
                version: env_or_default("KAFKA_VERSION", ""),
                enabled: kafka_enabled,
            },
            order_polling: env::var("ORDER_POLLING_ENABLED")
                .map(|raw| parse_bool(&raw))
                .unwrap_or(false),
            delivery: DeliveryConfig {
                monitor_interval: non_zero(duration_or_default(
                    "DELIVERY_MONITOR_INTERVAL",
                    Duration::from_secs(10),
                )),
                on_foot: duration_or_default("DELIVERY_DURATION_ON_FOOT", Duration::from_secs(30 * 60)),
                scooter: duration_or_default("DELIVERY_DURATION_SCOOTER", Duration::from_secs(15 * 60)),
                car: duration_or_default("DELIVERY_DURATION_CAR", Duration::from_secs(5 * 60)),
            },
        }
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
        _ => default.to_string(),
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn duration_or_default(key: &str, default: Duration) -> Duration {
    match env::var(key) {
        Ok(raw) => humantime::parse_duration(raw.trim()).unwrap_or(default),
        Err(_) => default,
    }
}

fn non_zero(value: Duration) -> Option<Duration> {
    if value.is_zero() {
        None
    } else {
        Some(value)
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_the_usual_spellings() {
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(parse_bool(" yes "));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("on"));
    }

    #[test]
    fn split_csv_trims_and_drops_empties() {
        assert_eq!(
            split_csv("a:9092, b:9092 ,,c:9092"),
            vec!["a:9092", "b:9092", "c:9092"]
        );
        assert!(split_csv("").is_empty());
        assert!(split_csv(" , ").is_empty());
    }

    #[test]
    fn zero_interval_means_disabled() {
        assert_eq!(non_zero(Duration::ZERO), None);
        assert_eq!(
            non_zero(Duration::from_secs(10)),
            Some(Duration::from_secs(10))
        );
    }

    #[test]
    fn postgres_url_is_assembled_from_parts() {
        let cfg = PostgresConfig {
            host: "db".to_string(),
            port: "5433".to_string(),
            user: "courier".to_string(),
            password: "secret".to_string(),
            db: "dispatch".to_string(),
        };
        assert_eq!(cfg.url(), "postgres://courier:secret@db:5433/dispatch");
    }
}
