// WiFi Task - Verbindet mit WLAN und managed Connection
use defmt::{Debug2Format, error, info, warn};
use embassy_net::{IpAddress, Ipv4Address, Runner, Stack, dns::DnsQueryType};
use embassy_time::{Duration, Timer, with_timeout};
use esp_radio::wifi::{ClientConfig, ModeConfig, ScanConfig, WifiController, WifiDevice};

use crate::config::{DNS_TIMEOUT_SECS, WIFI_PASSWORD, WIFI_RETRY_DELAY_SECS, WIFI_SSID};

/// WiFi Connection Task
///
/// Managed die WiFi-Verbindung:
/// - Verbindet mit Access Point
/// - Holt IP-Adresse via DHCP
/// - Überwacht Verbindung und reconnected bei Bedarf
#[embassy_executor::task]
pub async fn connection_task(mut controller: WifiController<'static>) {
    info!("WiFi: Starting connection task");

    loop {
        if matches!(controller.is_started(), Ok(false)) {
            info!("WiFi: Configuring and starting...");

            // Configure WiFi station mode
            let client_config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(WIFI_SSID.into())
                    .with_password(WIFI_PASSWORD.into()),
            );

            if let Err(e) = controller.set_config(&client_config) {
                error!("WiFi: Failed to set configuration: {}", Debug2Format(&e));
                Timer::after(Duration::from_secs(WIFI_RETRY_DELAY_SECS)).await;
                continue;
            }

            if let Err(e) = controller.start_async().await {
                error!("WiFi: Failed to start: {}", Debug2Format(&e));
                Timer::after(Duration::from_secs(WIFI_RETRY_DELAY_SECS)).await;
                continue;
            }

            info!("WiFi: Started successfully");
        }

        // Signalstärke des Ziel-APs loggen (nur Diagnose)
        match controller
            .scan_with_config_async(ScanConfig::default())
            .await
        {
            Ok(ap_infos) => match ap_infos.iter().find(|ap| ap.ssid.as_str() == WIFI_SSID) {
                Some(ap) => info!("WiFi: '{}' visible at {} dBm", WIFI_SSID, ap.signal_strength),
                None => warn!("WiFi: '{}' not in scan results", WIFI_SSID),
            },
            Err(e) => warn!("WiFi: Scan failed: {}", Debug2Format(&e)),
        }

        // Connect to AP
        info!("WiFi: Connecting to '{}'...", WIFI_SSID);
        match controller.connect_async().await {
            Ok(_) => {
                info!("WiFi: Connected successfully!");
            }
            Err(e) => {
                error!("WiFi: Connection failed: {}", Debug2Format(&e));
                Timer::after(Duration::from_secs(WIFI_RETRY_DELAY_SECS)).await;
                continue;
            }
        }

        // Wait for disconnect
        info!("WiFi: Waiting for disconnect event...");
        controller
            .wait_for_event(esp_radio::wifi::WifiEvent::StaDisconnected)
            .await;
        warn!("WiFi: Disconnected from AP, will retry...");

        Timer::after(Duration::from_secs(2)).await;
    }
}

/// Network Task
///
/// Überwacht den Netzwerk-Stack:
/// - Prozessiert Netzwerk-Pakete
/// - Managed TCP/IP Stack
#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

/// DHCP Monitor Task
///
/// Loggt die Netzwerk-Konfiguration, sobald DHCP eine Adresse geliefert hat
#[embassy_executor::task]
pub async fn dhcp_task(stack: &'static Stack<'static>) {
    wait_for_network(stack).await;

    if let Some(config) = stack.config_v4() {
        info!("WiFi: Got IP address!");
        info!("  IP:      {}", Debug2Format(&config.address.address()));
        info!("  Gateway: {}", Debug2Format(&config.gateway));
        info!("  DNS:     {}", Debug2Format(&config.dns_servers));
    }
}

/// Wartet bis Link steht und DHCP eine IPv4-Konfiguration geliefert hat
pub async fn wait_for_network(stack: &'static Stack<'static>) {
    while !(stack.is_link_up() && stack.config_v4().is_some()) {
        Timer::after(Duration::from_millis(500)).await;
    }
}

/// Fehler bei der Namensauflösung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    Failed,
    Timeout,
}

/// Löst einen Hostnamen zur ersten IPv4-Adresse auf
pub async fn resolve_ipv4(
    stack: &'static Stack<'static>,
    hostname: &str,
) -> Result<Ipv4Address, ResolveError> {
    let addrs = with_timeout(
        Duration::from_secs(DNS_TIMEOUT_SECS),
        stack.dns_query(hostname, DnsQueryType::A),
    )
    .await
    .map_err(|_| ResolveError::Timeout)?
    .map_err(|_| ResolveError::Failed)?;

    addrs
        .iter()
        .find_map(|addr| match addr {
            IpAddress::Ipv4(ipv4) => Some(*ipv4),
            #[allow(unreachable_patterns)]
            _ => None,
        })
        .ok_or(ResolveError::Failed)
}
