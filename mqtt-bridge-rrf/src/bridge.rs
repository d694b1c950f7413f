//! Bridge runner: broker connection, poller lifecycle, queue drain.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{BridgeConfig, ConfigError, OUTBOUND_QUEUE_CAPACITY};
use crate::discovery::Message;
use crate::poller::{Availability, DevicePoller};

/// How long in-flight publishes may drain after the shutdown signal.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Run the bridge until a shutdown signal arrives.
///
/// Spawns one poller task per configured device, all feeding one
/// bounded outbound queue, and drains that queue into the broker. The
/// broker connection itself (reconnects, keepalive, in-flight QoS
/// state) is rumqttc's business; this loop only hands messages over.
///
/// On shutdown the pollers are cancelled cooperatively, the queue gets
/// a short grace period to drain, and a final retained `offline` is
/// published on the bridge availability topic.
pub async fn run(config: BridgeConfig) -> Result<(), ConfigError> {
    config.validate()?;
    let (broker_host, broker_port) = config.broker_addr()?;

    let topics = config.topics();
    let bridge_availability = topics.bridge_availability();

    let mut options = MqttOptions::new(config.client_id.clone(), broker_host, broker_port);
    options.set_keep_alive(config.keep_alive);
    options.set_last_will(LastWill::new(
        &bridge_availability,
        Availability::Offline.as_str(),
        QoS::AtLeastOnce,
        true,
    ));

    let (client, eventloop) = AsyncClient::new(options, 10);

    let driver_cancel = CancellationToken::new();
    let driver = tokio::spawn(drive_connection(
        eventloop,
        client.clone(),
        bridge_availability.clone(),
        config.connect_retry_delay,
        driver_cancel.clone(),
    ));

    let (queue_tx, mut queue_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE_CAPACITY);
    let poll_cancel = CancellationToken::new();
    let mut pollers = Vec::with_capacity(config.devices.len());
    for device in &config.devices {
        let poller = DevicePoller::new(device.clone(), &config);
        pollers.push(tokio::spawn(
            poller.run(queue_tx.clone(), poll_cancel.child_token()),
        ));
    }
    // once every poller is gone the receiver drains dry instead of hanging
    drop(queue_tx);

    tracing::info!(
        broker = %config.broker,
        devices = config.devices.len(),
        "bridge running"
    );

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(error) = signal {
                    tracing::error!(%error, "failed to listen for shutdown signal");
                }
                break;
            }
            message = queue_rx.recv() => match message {
                Some(message) => publish(&client, message).await,
                None => break,
            }
        }
    }

    tracing::info!("shutting down");
    poll_cancel.cancel();

    let drain = async {
        while let Some(message) = queue_rx.recv().await {
            publish(&client, message).await;
        }
    };
    if tokio::time::timeout(DRAIN_GRACE, drain).await.is_err() {
        tracing::warn!("outbound queue did not drain in time");
    }

    if let Err(error) = client
        .publish(
            bridge_availability,
            QoS::AtLeastOnce,
            true,
            Availability::Offline.as_str(),
        )
        .await
    {
        tracing::warn!(%error, "failed to publish bridge offline message");
    }

    // give the connection a moment to flush before tearing it down
    tokio::time::sleep(Duration::from_millis(100)).await;
    let _ = client.disconnect().await;
    driver_cancel.cancel();
    let _ = driver.await;
    for task in pollers {
        let _ = task.await;
    }

    tracing::info!("goodbye");
    Ok(())
}

/// Drive the rumqttc event loop.
///
/// Every successful (re)connection re-announces the retained bridge
/// `online`, so a broker restart cannot leave the last-will `offline`
/// sticking around while the bridge is alive.
async fn drive_connection(
    mut eventloop: EventLoop,
    client: AsyncClient,
    bridge_availability: String,
    retry_delay: Duration,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = eventloop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("connected to broker");
                if let Err(error) = client
                    .publish(
                        &bridge_availability,
                        QoS::AtLeastOnce,
                        true,
                        Availability::Online.as_str(),
                    )
                    .await
                {
                    tracing::warn!(%error, "failed to publish bridge online message");
                }
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(%error, "broker connection error, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(retry_delay) => {}
                }
            }
        }
    }
}

/// Hand one message to the MQTT client, logging failures.
async fn publish(client: &AsyncClient, message: Message) {
    tracing::debug!(topic = %message.topic, retain = message.retain, "publishing");
    if let Err(error) = client
        .publish(
            message.topic.clone(),
            QoS::AtLeastOnce,
            message.retain,
            message.payload,
        )
        .await
    {
        tracing::warn!(topic = %message.topic, %error, "publish failed");
    }
}
