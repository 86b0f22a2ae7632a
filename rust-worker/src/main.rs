//! MailRelay Worker - RabbitMQ consumer that dispatches queued records as email.
//!
//! Every delivery on the mail queue is one record. It is processed as a
//! single-record batch through the shared batch processor and acknowledged
//! afterwards, whatever the outcome.

mod consumer;

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mailrelay::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    tracing::info!("worker_starting");

    // Load configuration from environment
    let config = Config::from_env();
    tracing::info!(
        cloudamqp_url_set = !config.cloudamqp_url.is_empty(),
        mail_queue = %config.mail_queue,
        prefetch = config.worker_prefetch,
        smtp_host_set = !config.smtp.host.is_empty(),
        smtp_port = config.smtp.port,
        smtp_user_set = !config.smtp.username.is_empty(),
        "config_loaded"
    );

    // Start the consumer
    consumer::run(config).await?;

    Ok(())
}
