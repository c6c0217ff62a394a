//! Testcontainer setup for Redis.
//!
//! Set `MURPH_TEST_REDIS_URL` to run against an existing server instead.

use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage,
};

/// Redis handle for store tests.
pub struct TestContainers {
    #[allow(dead_code)]
    redis: Option<ContainerAsync<GenericImage>>,
    pub redis_url: String,
}

impl TestContainers {
    pub async fn start() -> Self {
        if let Some(url) = std::env::var("MURPH_TEST_REDIS_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            return Self {
                redis: None,
                redis_url: url,
            };
        }

        let (redis, redis_url) = start_redis().await;
        Self {
            redis: Some(redis),
            redis_url,
        }
    }
}

/// Start a Redis container, return it and its connection URL.
pub async fn start_redis() -> (ContainerAsync<GenericImage>, String) {
    let container = GenericImage::new("redis", "7-alpine")
        .with_exposed_port(6379.tcp())
        .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
        .start()
        .await
        .expect("Failed to start Redis");

    let port = container
        .get_host_port_ipv4(6379)
        .await
        .expect("Redis port not mapped");

    (container, format!("redis://127.0.0.1:{}", port))
}
