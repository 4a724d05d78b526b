use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub assignments_total: IntCounterVec,
    pub couriers_released_total: IntCounter,
    pub rate_limit_exceeded_total: IntCounter,
    pub gateway_retries_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("valid http_requests_total metric");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "http_request_duration_seconds",
                "Duration of HTTP requests in seconds",
            ),
            &["path"],
        )
        .expect("valid http_request_duration_seconds metric");

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Total assignment operations by outcome"),
            &["operation", "outcome"],
        )
        .expect("valid assignments_total metric");

        let couriers_released_total = IntCounter::new(
            "couriers_released_total",
            "Total couriers released by the expiry sweeper",
        )
        .expect("valid couriers_released_total metric");

        let rate_limit_exceeded_total = IntCounter::new(
            "rate_limit_exceeded_total",
            "Total number of rate limit exceeded responses",
        )
        .expect("valid rate_limit_exceeded_total metric");

        let gateway_retries_total = IntCounter::new(
            "gateway_retries_total",
            "Total number of order gateway retry attempts",
        )
        .expect("valid gateway_retries_total metric");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("register http_requests_total");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("register http_request_duration_seconds");
        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(couriers_released_total.clone()))
            .expect("register couriers_released_total");
        registry
            .register(Box::new(rate_limit_exceeded_total.clone()))
            .expect("register rate_limit_exceeded_total");
        registry
            .register(Box::new(gateway_retries_total.clone()))
            .expect("register gateway_retries_total");

        Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            assignments_total,
            couriers_released_total,
            rate_limit_exceeded_total,
            gateway_retries_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
