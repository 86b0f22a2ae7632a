//! RabbitMQ consumer module using lapin.
//!
//! This module handles connecting to RabbitMQ and consuming the mail queue.
//! Deliveries are dispatched one after another; each one is a single-record
//! batch and is acknowledged once processed, including when it was skipped or
//! its send failed.

use anyhow::{Context, Result};
use futures::StreamExt;
use lapin::{
    options::{BasicAckOptions, BasicConsumeOptions, BasicQosOptions, QueueDeclareOptions},
    types::FieldTable,
    Connection, ConnectionProperties,
};
use tracing::{error, info, warn};

use mailrelay::shutdown::shutdown_signal;
use mailrelay::{BatchEvent, BatchProcessor, Config, RawRecord};

/// Run the RabbitMQ consumer.
///
/// This function:
/// 1. Connects to RabbitMQ using the configured URL
/// 2. Sets up QoS with the configured prefetch
/// 3. Declares the mail queue (idempotent operation)
/// 4. Dispatches each delivery in arrival order
/// 5. Handles graceful shutdown on SIGINT/SIGTERM
pub async fn run(config: Config) -> Result<()> {
    let processor = BatchProcessor::from_config(config.smtp.clone());
    let queue = config.mail_queue.as_str();

    // Connect to RabbitMQ
    info!(url_length = config.cloudamqp_url.len(), "rabbitmq_connecting");

    let conn = Connection::connect(&config.cloudamqp_url, ConnectionProperties::default())
        .await
        .context("Failed to connect to RabbitMQ")?;

    info!("rabbitmq_connected");

    let channel = conn.create_channel().await.context("Failed to create channel")?;

    info!("rabbitmq_channel_created");

    channel
        .basic_qos(config.worker_prefetch, BasicQosOptions::default())
        .await
        .context("Failed to set QoS")?;

    info!(prefetch_count = config.worker_prefetch, "rabbitmq_qos_set");

    channel
        .queue_declare(
            queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("Failed to declare queue")?;

    info!(queue = queue, "rabbitmq_queue_declared");

    let mut consumer = channel
        .basic_consume(
            queue,
            "mailrelay-worker",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .context("Failed to start consumer")?;

    info!(queue = queue, "rabbitmq_consumer_started");
    info!("worker_ready");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("worker_stopping");
                break;
            }
            delivery = consumer.next() => {
                match delivery {
                    Some(Ok(delivery)) => {
                        let delivery_tag = delivery.delivery_tag;
                        let message_id = delivery
                            .properties
                            .message_id()
                            .as_ref()
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "unknown".to_string());

                        info!(
                            queue = queue,
                            message_id = %message_id,
                            delivery_tag = delivery_tag,
                            body_length = delivery.data.len(),
                            "rabbitmq_record_received"
                        );

                        let batch = BatchEvent::single(RawRecord::from_bytes(&delivery.data));
                        let result = processor.process(&batch).await;

                        if let Err(e) = channel
                            .basic_ack(delivery_tag, BasicAckOptions::default())
                            .await
                        {
                            error!(
                                delivery_tag = delivery_tag,
                                error = %e,
                                "rabbitmq_ack_failed"
                            );
                        } else {
                            info!(
                                queue = queue,
                                message_id = %message_id,
                                sent = result.sent(),
                                "rabbitmq_record_completed"
                            );
                        }
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "rabbitmq_delivery_error");
                    }
                    None => {
                        warn!("rabbitmq_consumer_closed");
                        break;
                    }
                }
            }
        }
    }

    if let Err(e) = channel.close(200, "Normal shutdown").await {
        warn!(error = %e, "rabbitmq_channel_close_error");
    }

    if let Err(e) = conn.close(200, "Normal shutdown").await {
        warn!(error = %e, "rabbitmq_connection_close_error");
    }

    info!("worker_shutdown_complete");
    Ok(())
}
