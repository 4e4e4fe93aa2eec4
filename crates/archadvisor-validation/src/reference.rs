//! Reference data: throughput benchmarks, availability estimates, known
//! token sets, and the requirement-keyword map.
//!
//! These are conservative real-world figures, not theoretical maximums.

use crate::models::{ErrorCode, Severity};

/// Requests/sec (or messages/sec) a single node of the technology sustains.
#[derive(Debug, Clone, Copy)]
pub struct Benchmark {
    pub rps: Option<u64>,
    pub write_rps: Option<u64>,
    pub mps: Option<u64>,
    pub with_replicas: Option<u64>,
}

impl Benchmark {
    const fn rps(rps: u64, write_rps: u64, with_replicas: u64) -> Self {
        Self {
            rps: Some(rps),
            write_rps: Some(write_rps),
            mps: None,
            with_replicas: Some(with_replicas),
        }
    }

    const fn cache(rps: u64, write_rps: u64) -> Self {
        Self {
            rps: Some(rps),
            write_rps: Some(write_rps),
            mps: None,
            with_replicas: None,
        }
    }

    const fn mps(mps: u64) -> Self {
        Self {
            rps: None,
            write_rps: None,
            mps: Some(mps),
            with_replicas: None,
        }
    }

    const fn web(rps: u64) -> Self {
        Self {
            rps: Some(rps),
            write_rps: None,
            mps: None,
            with_replicas: None,
        }
    }

    /// Single-node ceiling, preferring RPS over MPS.
    pub fn single_node(&self) -> u64 {
        self.rps.or(self.mps).unwrap_or(0)
    }

    /// Ceiling when the component scales horizontally. Falls back to three
    /// nodes' worth when no replicated figure is encoded.
    pub fn replicated(&self) -> u64 {
        self.with_replicas.unwrap_or(self.single_node() * 3)
    }
}

pub const THROUGHPUT_BENCHMARKS: &[(&str, Benchmark)] = &[
    // Databases
    ("postgresql", Benchmark::rps(10_000, 5_000, 50_000)),
    ("postgres", Benchmark::rps(10_000, 5_000, 50_000)),
    ("mysql", Benchmark::rps(10_000, 5_000, 40_000)),
    ("mongodb", Benchmark::rps(25_000, 15_000, 100_000)),
    ("cassandra", Benchmark::rps(50_000, 50_000, 200_000)),
    ("dynamodb", Benchmark::rps(40_000, 40_000, 1_000_000)),
    ("cockroachdb", Benchmark::rps(8_000, 3_000, 30_000)),
    ("tidb", Benchmark::rps(15_000, 8_000, 60_000)),
    // Caches
    ("redis", Benchmark::cache(100_000, 80_000)),
    ("memcached", Benchmark::cache(200_000, 200_000)),
    ("elasticache", Benchmark::cache(100_000, 80_000)),
    // Message brokers
    ("kafka", Benchmark::mps(200_000)),
    ("rabbitmq", Benchmark::mps(30_000)),
    ("sqs", Benchmark::mps(3_000)),
    ("nats", Benchmark::mps(500_000)),
    ("pulsar", Benchmark::mps(100_000)),
    ("redis_streams", Benchmark::mps(100_000)),
    // Web servers / API frameworks
    ("nginx", Benchmark::web(50_000)),
    ("envoy", Benchmark::web(40_000)),
    ("haproxy", Benchmark::web(60_000)),
    ("fastapi", Benchmark::web(8_000)),
    ("express", Benchmark::web(5_000)),
    ("spring_boot", Benchmark::web(3_000)),
    ("spring", Benchmark::web(3_000)),
    ("django", Benchmark::web(2_000)),
    ("flask", Benchmark::web(1_500)),
    ("go_net_http", Benchmark::web(30_000)),
    ("actix", Benchmark::web(40_000)),
    ("fiber", Benchmark::web(25_000)),
];

/// Availability of a single instance with no redundancy.
pub const COMPONENT_AVAILABILITY: &[(&str, f64)] = &[
    // Load balancers (managed)
    ("alb", 0.9999),
    ("nlb", 0.9999),
    ("elb", 0.9999),
    ("cloud_load_balancer", 0.9999),
    ("load_balancer", 0.9995),
    // Compute
    ("ec2", 0.9995),
    ("ecs", 0.9999),
    ("eks", 0.9995),
    ("lambda", 0.9999),
    ("cloud_run", 0.9999),
    ("cloud_functions", 0.9999),
    ("fargate", 0.9999),
    ("kubernetes", 0.9995),
    ("vm", 0.9990),
    // Databases
    ("rds_multi_az", 0.9999),
    ("rds", 0.9995),
    ("aurora", 0.9999),
    ("dynamodb", 0.9999),
    ("cloud_sql", 0.9995),
    ("cosmosdb", 0.9999),
    ("postgresql", 0.9990),
    ("mysql", 0.9990),
    ("mongodb", 0.9990),
    ("cassandra", 0.9995),
    // Caches
    ("elasticache", 0.9999),
    ("redis_cluster", 0.9999),
    ("redis", 0.9990),
    ("memcached", 0.9990),
    // Message brokers
    ("msk", 0.9999),
    ("kafka", 0.9990),
    ("sqs", 0.9999),
    ("sns", 0.9999),
    ("rabbitmq", 0.9990),
    ("eventbridge", 0.9999),
    // Storage
    ("s3", 0.99999),
    ("gcs", 0.99999),
    ("ebs", 0.9999),
    // API gateways
    ("api_gateway", 0.9999),
    ("apigee", 0.9999),
    ("kong", 0.9995),
    // CDN
    ("cloudfront", 0.9999),
    ("cloudflare", 0.9999),
    // Defaults
    ("microservice", 0.9995),
    ("service", 0.9995),
];

pub const EVENTUALLY_CONSISTENT_DBS: &[&str] = &[
    "cassandra",
    "dynamodb",
    "cosmosdb",
    "couchdb",
    "couchbase",
    "riak",
    "voldemort",
    "scylladb",
];

pub const MESSAGE_BROKERS: &[&str] = &[
    "kafka",
    "rabbitmq",
    "sqs",
    "sns",
    "nats",
    "pulsar",
    "eventbridge",
    "redis_streams",
    "kinesis",
    "pubsub",
    "cloud_pubsub",
    "msk",
    "amazon_mq",
    "activemq",
    "zeromq",
];

/// Heavyweight services flagged by the over-engineering checks.
pub const ENTERPRISE_SERVICES: &[&str] = &[
    "kafka",
    "msk",
    "kubernetes",
    "eks",
    "gke",
    "aks",
    "aurora",
    "spanner",
    "cosmosdb",
    "redshift",
    "bigquery",
    "databricks",
    "snowflake",
    "elasticsearch",
    "opensearch",
    "istio",
    "consul",
    "vault",
    "terraform",
];

/// Capability the requirements can ask for, with the keywords that detect the
/// ask and the code raised when the architecture never addresses it.
pub struct RequirementCheck {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub code: ErrorCode,
    pub severity: Severity,
}

pub fn requirement_checks() -> Vec<RequirementCheck> {
    vec![
        RequirementCheck {
            name: "auth",
            keywords: &["auth", "authentication", "login", "oauth", "sso", "jwt", "identity"],
            code: ErrorCode::MissingAuth,
            severity: Severity::High,
        },
        RequirementCheck {
            name: "analytics",
            keywords: &["analytics", "tracking", "metrics", "dashboard", "reporting", "insights"],
            code: ErrorCode::MissingAnalytics,
            severity: Severity::Medium,
        },
        RequirementCheck {
            name: "disaster_recovery",
            keywords: &["disaster recovery", "dr", "rpo", "rto", "backup", "failover"],
            code: ErrorCode::MissingDr,
            severity: Severity::High,
        },
        RequirementCheck {
            name: "monitoring",
            keywords: &["monitoring", "observability", "alerting", "health check"],
            code: ErrorCode::MissingMonitoring,
            severity: Severity::High,
        },
        RequirementCheck {
            name: "encryption",
            keywords: &["encryption", "encrypted", "tls", "ssl", "encrypt at rest", "pci"],
            code: ErrorCode::MissingEncryption,
            severity: Severity::High,
        },
        RequirementCheck {
            name: "rate_limiting",
            keywords: &["rate limit", "throttle", "rate-limit", "throttling", "quota"],
            code: ErrorCode::MissingRateLimiting,
            severity: Severity::High,
        },
        RequirementCheck {
            name: "search",
            keywords: &["search", "full-text search", "elasticsearch", "opensearch"],
            code: ErrorCode::MissingSearch,
            severity: Severity::Medium,
        },
        RequirementCheck {
            name: "notification",
            keywords: &["notification", "push notification", "alert", "email notification", "sms"],
            code: ErrorCode::MissingNotification,
            severity: Severity::Medium,
        },
        RequirementCheck {
            name: "caching",
            keywords: &["cache", "caching", "low latency", "sub-100ms", "sub-50ms"],
            code: ErrorCode::MissingCaching,
            severity: Severity::Medium,
        },
    ]
}

/// Look up a throughput benchmark by substring match in either direction,
/// the way tech stack entries actually name things ("PostgreSQL 15",
/// "aws sqs", plain "redis").
pub fn find_benchmark(tech: &str) -> Option<(&'static str, Benchmark)> {
    THROUGHPUT_BENCHMARKS
        .iter()
        .find(|(key, _)| tech.contains(key) || key.contains(tech))
        .map(|(key, bench)| (*key, *bench))
}

/// Availability figure whose key appears in the component text. Underscored
/// keys also match their spaced form ("api gateway").
pub fn find_availability(component_text: &str) -> Option<f64> {
    COMPONENT_AVAILABILITY
        .iter()
        .find(|(key, _)| {
            component_text.contains(key) || component_text.contains(&key.replace('_', " "))
        })
        .map(|(_, figure)| *figure)
}
