// Time Sync Task - Einmalige SNTP-Abfrage beim Start
//
// Liefert den Epoch-Offset für die Zeitstempel der Status-Nachricht.
// Der Node startet erst, wenn dieser Task signalisiert hat. Schlägt die
// Abfrage fehl, wird Offset 0 (Zeit seit Boot) signalisiert.
use defmt::{Debug2Format, info, warn};
use embassy_net::Stack;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_time::{Duration, Timer, with_timeout};

use crate::config::{
    SNTP_ATTEMPTS, SNTP_LOCAL_PORT, SNTP_PORT, SNTP_SERVER, SNTP_TIMEOUT_SECS,
};
use crate::TimeSyncSignal;
use crate::hal::epoch_offset_for;
use crate::tasks::wifi::{ResolveError, resolve_ipv4, wait_for_network};

/// Größe eines SNTP-Pakets ohne Extensions
const SNTP_PACKET_SIZE: usize = 48;

/// LI = 0, Version = 4, Mode = 3 (Client)
const SNTP_CLIENT_HEADER: u8 = 0b00_100_011;

/// Mode 4 = Server
const SNTP_MODE_SERVER: u8 = 4;

/// Sekunden zwischen 1900-01-01 (NTP) und 1970-01-01 (Unix)
const NTP_UNIX_OFFSET_SECS: i64 = 2_208_988_800;

/// Offset des Transmit-Timestamps im Paket
const TRANSMIT_TIMESTAMP: usize = 40;

/// Time Sync Task
///
/// Versucht `SNTP_ATTEMPTS` Mal, die Uhrzeit zu holen, und signalisiert
/// danach in jedem Fall genau einmal den Offset an `synced`.
#[embassy_executor::task]
pub async fn time_sync_task(stack: &'static Stack<'static>, synced: &'static TimeSyncSignal) {
    wait_for_network(stack).await;
    synced.signal(sync_epoch_offset(stack).await);
}

/// Epoch-Offset per SNTP, 0 wenn alle Versuche scheitern
async fn sync_epoch_offset(stack: &'static Stack<'static>) -> i64 {
    for attempt in 1..=SNTP_ATTEMPTS {
        match query_epoch_nanos(stack).await {
            Ok(epoch_nanos) => {
                info!(
                    "Time: synchronized via '{}', epoch {} s",
                    SNTP_SERVER,
                    epoch_nanos / 1_000_000_000
                );
                return epoch_offset_for(epoch_nanos);
            }
            Err(e) => warn!(
                "Time: SNTP attempt {}/{} failed: {}",
                attempt, SNTP_ATTEMPTS, e
            ),
        }
        if attempt < SNTP_ATTEMPTS {
            Timer::after(Duration::from_secs(2)).await;
        }
    }

    warn!("Time: no SNTP response, stamps count from boot");
    0
}

/// Eine Anfrage/Antwort an den SNTP-Server
async fn query_epoch_nanos(stack: &'static Stack<'static>) -> Result<i64, SntpError> {
    let server = resolve_ipv4(stack, SNTP_SERVER).await?;

    let mut rx_meta = [PacketMetadata::EMPTY; 1];
    let mut rx_buffer = [0u8; SNTP_PACKET_SIZE * 2];
    let mut tx_meta = [PacketMetadata::EMPTY; 1];
    let mut tx_buffer = [0u8; SNTP_PACKET_SIZE * 2];
    let mut socket = UdpSocket::new(
        *stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );
    socket
        .bind(SNTP_LOCAL_PORT)
        .map_err(|e| {
            warn!("Time: bind failed: {}", Debug2Format(&e));
            SntpError::BindFailed
        })?;

    let mut request = [0u8; SNTP_PACKET_SIZE];
    request[0] = SNTP_CLIENT_HEADER;
    socket
        .send_to(&request, (server, SNTP_PORT))
        .await
        .map_err(|_| SntpError::SendFailed)?;

    let mut response = [0u8; SNTP_PACKET_SIZE];
    let (len, _) = with_timeout(
        Duration::from_secs(SNTP_TIMEOUT_SECS),
        socket.recv_from(&mut response),
    )
    .await
    .map_err(|_| SntpError::Timeout)?
    .map_err(|_| SntpError::ReceiveFailed)?;

    parse_transmit_time(&response[..len])
}

/// Liest den Transmit-Timestamp als Unix-Nanosekunden
fn parse_transmit_time(packet: &[u8]) -> Result<i64, SntpError> {
    if packet.len() < SNTP_PACKET_SIZE {
        return Err(SntpError::InvalidResponse);
    }
    // Stratum 0 = Kiss-o'-Death
    if packet[0] & 0b111 != SNTP_MODE_SERVER || packet[1] == 0 {
        return Err(SntpError::InvalidResponse);
    }

    let field = |offset: usize| {
        u32::from_be_bytes([
            packet[offset],
            packet[offset + 1],
            packet[offset + 2],
            packet[offset + 3],
        ])
    };
    let seconds = field(TRANSMIT_TIMESTAMP);
    let fraction = field(TRANSMIT_TIMESTAMP + 4);
    if seconds == 0 {
        return Err(SntpError::InvalidResponse);
    }

    let unix_secs = i64::from(seconds) - NTP_UNIX_OFFSET_SECS;
    let nanos = ((u64::from(fraction) * 1_000_000_000) >> 32) as i64;
    Ok(unix_secs * 1_000_000_000 + nanos)
}

/// SNTP Fehler-Typen
#[derive(Debug)]
enum SntpError {
    Dns(ResolveError),
    BindFailed,
    SendFailed,
    ReceiveFailed,
    Timeout,
    InvalidResponse,
}

impl From<ResolveError> for SntpError {
    fn from(e: ResolveError) -> Self {
        SntpError::Dns(e)
    }
}

impl defmt::Format for SntpError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            SntpError::Dns(ResolveError::Failed) => defmt::write!(fmt, "DNS failed"),
            SntpError::Dns(ResolveError::Timeout) => defmt::write!(fmt, "DNS timeout"),
            SntpError::BindFailed => defmt::write!(fmt, "Bind failed"),
            SntpError::SendFailed => defmt::write!(fmt, "Send failed"),
            SntpError::ReceiveFailed => defmt::write!(fmt, "Receive failed"),
            SntpError::Timeout => defmt::write!(fmt, "Timeout"),
            SntpError::InvalidResponse => defmt::write!(fmt, "Invalid response"),
        }
    }
}
