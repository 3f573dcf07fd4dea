// MQTT Task - Transport zwischen Broker und Node
use defmt::{Debug2Format, debug, error, info, warn};
use embassy_futures::select::{Either, select};
use embassy_net::{Stack, tcp, tcp::TcpSocket};
use embassy_time::{Duration, Timer};
use embedded_io_async::{ErrorKind, ErrorType, Read, Write};

use led_core::framing::{FrameError, PacketFramer};
use led_core::protocol::{PARAMETER_REQUEST_TOPIC, decode_command, decode_parameter_request};
use led_core::types::COMMAND_TOPIC;
use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::utils::rng_generator::CountingRng;
use rust_mqtt::utils::types::EncodedString;

use crate::config::*;
use crate::tasks::wifi::{ResolveError, resolve_ipv4, wait_for_network};
use crate::{CommandChannel, OutboundReceiver, ParameterRequestSender};

/// MQTT Task - läuft parallel zum Node-Task
///
/// - Verbindet sich mit dem Broker und abonniert `led_subscriber` und
///   die Parameter-Anfragen
/// - Dekodiert eingehende Nachrichten und reicht sie an den Node weiter
/// - Publiziert die Outbound-Queue des Nodes mit QoS0
/// - Automatisches Reconnect bei Fehlern
///
/// # Parameter
/// - `stack`: embassy-net Stack für Netzwerk-Zugriff
/// - `outbound`: fertige Payloads vom Node
/// - `commands`: Kommando-Channel zum Node (Tiefe 1, neuestes gewinnt)
/// - `requests`: Parameter-Anfragen zum Node
#[embassy_executor::task]
pub async fn mqtt_task(
    stack: &'static Stack<'static>,
    outbound: OutboundReceiver,
    commands: &'static CommandChannel,
    requests: ParameterRequestSender,
) {
    info!("MQTT: Task started, waiting for network...");
    wait_for_network(stack).await;
    info!("MQTT: Network ready");

    loop {
        match mqtt_session(stack, outbound, commands, requests).await {
            Ok(()) => warn!("MQTT: Connection closed normally"),
            Err(e) => error!("MQTT: Error: {}", e),
        }
        info!("MQTT: Reconnecting in {}s...", MQTT_RECONNECT_DELAY_SECS);
        Timer::after(Duration::from_secs(MQTT_RECONNECT_DELAY_SECS)).await;
    }
}

/// Eine Broker-Session: Connect, Subscribe, dann Empfang und Versand
///
/// Bei jedem Fehler endet die Session und der Haupt-Loop verbindet neu.
/// Nachrichten, die während der Trennung anfallen, bleiben in der Queue
/// bzw. werden beim Node verworfen, sobald sie voll ist.
async fn mqtt_session(
    stack: &'static Stack<'static>,
    outbound: OutboundReceiver,
    commands: &'static CommandChannel,
    requests: ParameterRequestSender,
) -> Result<(), MqttError> {
    info!("MQTT: Resolving '{}'...", MQTT_BROKER);
    let broker_ip = resolve_ipv4(stack, MQTT_BROKER).await?;
    info!("MQTT: Resolved to {}", Debug2Format(&broker_ip));

    let mut rx_buffer = [0u8; MQTT_SOCKET_BUFFER_SIZE];
    let mut tx_buffer = [0u8; MQTT_SOCKET_BUFFER_SIZE];
    let mut socket = TcpSocket::new(*stack, &mut rx_buffer, &mut tx_buffer);
    socket.set_timeout(Some(Duration::from_secs(u64::from(MQTT_KEEP_ALIVE_SECS) * 2)));

    socket
        .connect((broker_ip, MQTT_PORT))
        .await
        .map_err(|_| MqttError::ConnectionFailed)?;
    info!("MQTT: TCP connected");

    let rng = CountingRng(20000);
    let mut config = ClientConfig::<5, _>::new(MqttVersion::MQTTv5, rng);
    config.client_id = EncodedString {
        string: MQTT_CLIENT_ID,
        len: MQTT_CLIENT_ID.len() as u16,
    };
    config.keep_alive = MQTT_KEEP_ALIVE_SECS;
    config.max_packet_size = MQTT_BUFFER_SIZE as u32;

    let mut send_buffer = [0u8; MQTT_BUFFER_SIZE];
    let mut recv_buffer = [0u8; MQTT_BUFFER_SIZE];

    let mut client = MqttClient::<_, 5, _>::new(
        BrokerConnection::new(socket),
        &mut send_buffer,
        MQTT_BUFFER_SIZE,
        &mut recv_buffer,
        MQTT_BUFFER_SIZE,
        config,
    );

    client
        .connect_to_broker()
        .await
        .map_err(|_| MqttError::ProtocolError)?;
    info!("MQTT: Connected to broker");

    for topic in [COMMAND_TOPIC, PARAMETER_REQUEST_TOPIC] {
        client
            .subscribe_to_topic(topic)
            .await
            .map_err(|_| MqttError::SubscribeFailed)?;
        info!("MQTT: Subscribed to '{}'", topic);
    }

    // Status kommt alle 100 ms und hält die Verbindung damit am Leben.
    // Ein abgebrochenes `receive_message` verliert nichts: `BrokerConnection`
    // gibt Bytes erst heraus, wenn das ganze Paket gepuffert ist.
    loop {
        match select(client.receive_message(), outbound.receive()).await {
            Either::First(received) => {
                let (topic, payload) = received.map_err(|_| MqttError::ReceiveFailed)?;
                route_inbound(topic, payload, commands, requests);
            }
            Either::Second(msg) => {
                client
                    .send_message(msg.topic, &msg.payload, QualityOfService::QoS0, false)
                    .await
                    .map_err(|_| MqttError::PublishFailed)?;
            }
        }
    }
}

/// Dekodiert eine eingehende Nachricht und reicht sie an den Node weiter
fn route_inbound(
    topic: &str,
    payload: &[u8],
    commands: &'static CommandChannel,
    requests: ParameterRequestSender,
) {
    if topic == COMMAND_TOPIC {
        match decode_command(payload) {
            Ok(cmd) => {
                // Ein ungelesenes älteres Kommando wird ersetzt
                if commands.try_send(cmd).is_err() {
                    let _ = commands.try_receive();
                    let _ = commands.try_send(cmd);
                }
            }
            Err(e) => warn!("MQTT: invalid command payload: {}", e),
        }
    } else if topic == PARAMETER_REQUEST_TOPIC {
        match decode_parameter_request(payload) {
            Ok(request) => {
                if requests.try_send(request).is_err() {
                    warn!("MQTT: parameter request dropped, queue full");
                }
            }
            Err(e) => warn!("MQTT: invalid parameter request: {}", e),
        }
    } else {
        debug!("MQTT: ignoring message on '{}'", topic);
    }
}

/// TCP-Verbindung zum Broker, liest eingehend paketweise
///
/// Ein Teilpaket bleibt im `PacketFramer` liegen, auch wenn der lesende
/// Future verworfen wird.
struct BrokerConnection<'s> {
    socket: TcpSocket<'s>,
    framer: PacketFramer<MQTT_BUFFER_SIZE>,
}

impl<'s> BrokerConnection<'s> {
    fn new(socket: TcpSocket<'s>) -> Self {
        Self {
            socket,
            framer: PacketFramer::new(),
        }
    }
}

/// Fehler der Broker-Verbindung
#[derive(Debug)]
enum ConnectionError {
    Tcp(tcp::Error),
    Frame(FrameError),
}

impl embedded_io_async::Error for ConnectionError {
    fn kind(&self) -> ErrorKind {
        match self {
            ConnectionError::Tcp(e) => embedded_io_async::Error::kind(e),
            ConnectionError::Frame(_) => ErrorKind::InvalidData,
        }
    }
}

impl ErrorType for BrokerConnection<'_> {
    type Error = ConnectionError;
}

impl Read for BrokerConnection<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        while !self.framer.is_complete() {
            let n = self
                .socket
                .read(self.framer.spare())
                .await
                .map_err(ConnectionError::Tcp)?;
            if n == 0 {
                // Broker hat die Verbindung geschlossen
                return Ok(0);
            }
            self.framer.commit(n).map_err(|e| {
                warn!("MQTT: inbound packet rejected: {}", e);
                ConnectionError::Frame(e)
            })?;
        }
        Ok(self.framer.take(buf))
    }
}

impl Write for BrokerConnection<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.socket.write(buf).await.map_err(ConnectionError::Tcp)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.socket.flush().await.map_err(ConnectionError::Tcp)
    }
}

/// MQTT Fehler-Typen
#[derive(Debug)]
enum MqttError {
    DnsResolutionFailed,
    DnsTimeout,
    ConnectionFailed,
    ProtocolError,
    SubscribeFailed,
    ReceiveFailed,
    PublishFailed,
}

impl From<ResolveError> for MqttError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Failed => MqttError::DnsResolutionFailed,
            ResolveError::Timeout => MqttError::DnsTimeout,
        }
    }
}

impl defmt::Format for MqttError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            MqttError::DnsResolutionFailed => defmt::write!(fmt, "DNS failed"),
            MqttError::DnsTimeout => defmt::write!(fmt, "DNS timeout"),
            MqttError::ConnectionFailed => defmt::write!(fmt, "Connection failed"),
            MqttError::ProtocolError => defmt::write!(fmt, "Protocol error"),
            MqttError::SubscribeFailed => defmt::write!(fmt, "Subscribe failed"),
            MqttError::ReceiveFailed => defmt::write!(fmt, "Receive failed"),
            MqttError::PublishFailed => defmt::write!(fmt, "Publish failed"),
        }
    }
}
