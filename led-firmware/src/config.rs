// Projekt-Konfiguration: Konstanten und Hardware-Zuordnungen
//
// Timing des Nodes (Status-Periode, Poll-Intervall) liegt in led-core.

// ============================================================================
// LED-Strip Konfiguration
// ============================================================================

/// GPIO-Pin für die Datenleitung des Strips (WS2812/Neopixel)
pub const STRIP_GPIO_PIN: u8 = 8;

/// Anzahl der LEDs im Strip
pub const STRIP_LENGTH: usize = 8;

/// RMT Taktfrequenz in MHz
/// 80 MHz ist optimal für WS2812 LED-Timing
pub const RMT_CLOCK_MHZ: u32 = 80;

// ============================================================================
// WiFi Konfiguration
// ============================================================================

/// WiFi SSID (Netzwerk-Name)
/// Wird zur Build-Zeit aus der Environment Variable WIFI_SSID geladen
pub const WIFI_SSID: &str = env!(
    "WIFI_SSID",
    "WiFi SSID nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// WiFi Passwort
pub const WIFI_PASSWORD: &str = env!(
    "WIFI_PASSWORD",
    "WiFi Password nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// Wartezeit nach einem WiFi-Fehler in Sekunden
pub const WIFI_RETRY_DELAY_SECS: u64 = 5;

/// Heap-Größe für WiFi (Bytes)
pub const WIFI_HEAP_SIZE: usize = 65536; // 64 KB

/// Zusätzliche Heap-Größe (Bytes)
pub const EXTRA_HEAP_SIZE: usize = 36864; // 36 KB

/// Sockets im Netzwerk-Stack: MQTT (TCP) + SNTP (UDP) + DNS
pub const NET_SOCKETS: usize = 4;

// ============================================================================
// MQTT Konfiguration
// ============================================================================

/// MQTT Broker Hostname oder IP-Adresse
pub const MQTT_BROKER: &str = env!(
    "MQTT_BROKER",
    "MQTT Broker nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// MQTT Broker Port (1883 unverschlüsselt)
pub const MQTT_PORT: u16 = 1883;

/// MQTT Client ID
pub const MQTT_CLIENT_ID: &str = env!(
    "MQTT_CLIENT_ID",
    "MQTT Client ID nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// MQTT Keep-Alive in Sekunden
pub const MQTT_KEEP_ALIVE_SECS: u16 = 30;

/// MQTT Reconnect Delay in Sekunden
pub const MQTT_RECONNECT_DELAY_SECS: u64 = 5;

/// MQTT Buffer-Größe in Bytes
pub const MQTT_BUFFER_SIZE: usize = 1024;

/// TCP RX/TX Buffer-Größe für die MQTT-Verbindung
pub const MQTT_SOCKET_BUFFER_SIZE: usize = 4096;

/// DNS Query Timeout in Sekunden
pub const DNS_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Channels zwischen MQTT- und Node-Task
// ============================================================================

/// Maximale Payload-Größe einer ausgehenden Nachricht
/// Reicht für die List-Antwort mit fünf Parametern
pub const OUTBOUND_PAYLOAD_SIZE: usize = 512;

/// Tiefe der Outbound-Queue (Status + Parameter-Antworten)
pub const OUTBOUND_QUEUE_DEPTH: usize = 4;

/// Tiefe der Parameter-Anfrage-Queue
pub const PARAMETER_QUEUE_DEPTH: usize = 2;

// ============================================================================
// SNTP Konfiguration
// ============================================================================

/// SNTP Server, optional aus SNTP_SERVER
pub const SNTP_SERVER: &str = match option_env!("SNTP_SERVER") {
    Some(server) => server,
    None => "pool.ntp.org",
};

/// SNTP Port (RFC 4330)
pub const SNTP_PORT: u16 = 123;

/// Lokaler UDP-Port für die Anfrage
pub const SNTP_LOCAL_PORT: u16 = 50123;

/// Timeout für die SNTP-Antwort in Sekunden
pub const SNTP_TIMEOUT_SECS: u64 = 5;

/// Anzahl Versuche bevor ohne Epoch-Offset weitergemacht wird
pub const SNTP_ATTEMPTS: u8 = 3;
