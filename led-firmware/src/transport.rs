// Channel-basierte Implementierungen der led-core Transport-Traits
//
// Der Node-Task serialisiert selbst und legt fertige Payloads in die
// Outbound-Queue; der MQTT-Task publiziert sie mit QoS0. Ist die Queue
// voll, wird die Nachricht verworfen.

use heapless::Vec;
use led_core::protocol::{
    PARAMETER_RESPONSE_TOPIC, encode_parameter_response, encode_status,
};
use led_core::types::STATUS_TOPIC;
use led_core::{
    CommandMessage, CommandSource, ParameterRequest, ParameterResponse, ParameterTransport,
    PublishError, StatusMessage, StatusPublisher,
};

use crate::config::OUTBOUND_PAYLOAD_SIZE;
use crate::{CommandReceiver, OutboundMessage, OutboundSender, ParameterRequestReceiver};

fn enqueue(
    outbound: &OutboundSender,
    topic: &'static str,
    payload: &[u8],
) -> Result<(), PublishError> {
    let payload = Vec::from_slice(payload).map_err(|_| PublishError::Encode)?;
    outbound
        .try_send(OutboundMessage { topic, payload })
        .map_err(|_| PublishError::QueueFull)
}

/// Status-Publisher auf `led_publisher`
pub struct ChannelStatusPublisher {
    outbound: OutboundSender,
}

impl ChannelStatusPublisher {
    pub fn new(outbound: OutboundSender) -> Self {
        Self { outbound }
    }
}

impl StatusPublisher for ChannelStatusPublisher {
    fn publish(&mut self, msg: &StatusMessage) -> Result<(), PublishError> {
        let mut buf = [0u8; OUTBOUND_PAYLOAD_SIZE];
        let len = encode_status(msg, &mut buf).map_err(|_| PublishError::Encode)?;
        enqueue(&self.outbound, STATUS_TOPIC, &buf[..len])
    }
}

/// Kommandos von `led_subscriber`
pub struct ChannelCommandSource {
    commands: CommandReceiver,
}

impl ChannelCommandSource {
    pub fn new(commands: CommandReceiver) -> Self {
        Self { commands }
    }
}

impl CommandSource for ChannelCommandSource {
    fn try_receive(&mut self) -> Option<CommandMessage> {
        self.commands.try_receive().ok()
    }
}

/// Parameter-Anfragen rein, Antworten über die Outbound-Queue raus
pub struct ChannelParameterTransport {
    requests: ParameterRequestReceiver,
    outbound: OutboundSender,
}

impl ChannelParameterTransport {
    pub fn new(requests: ParameterRequestReceiver, outbound: OutboundSender) -> Self {
        Self { requests, outbound }
    }
}

impl ParameterTransport for ChannelParameterTransport {
    fn try_receive(&mut self) -> Option<ParameterRequest> {
        self.requests.try_receive().ok()
    }

    fn respond(&mut self, response: &ParameterResponse<'_>) -> Result<(), PublishError> {
        let mut buf = [0u8; OUTBOUND_PAYLOAD_SIZE];
        let len =
            encode_parameter_response(response, &mut buf).map_err(|_| PublishError::Encode)?;
        enqueue(&self.outbound, PARAMETER_RESPONSE_TOPIC, &buf[..len])
    }
}
