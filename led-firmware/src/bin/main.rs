// Keine Standard-Bibliothek verwenden (Embedded System)
#![no_std]
// Kein normaler main() Einstiegspunkt (wird von esp_rtos bereitgestellt)
#![no_main]
// Verbiete mem::forget - gefährlich bei ESP HAL Types mit DMA-Buffern
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
// Verbiete große Stack-Frames (Stack ist auf Embedded Systemen begrenzt)
#![deny(clippy::large_stack_frames)]

// Heap Allocator (WiFi benötigt dynamischen Speicher)
extern crate alloc;

// Embassy Async Runtime
use embassy_executor::Spawner;
use embassy_net::{Config as NetConfig, Stack, StackResources};
use embassy_time::{Duration, Timer};

// ESP32-C6 HAL
use esp_hal::clock::CpuClock;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;

// Backtrace bei Panic und println!() Support
use {esp_backtrace as _, esp_println as _};

// Projekt-Module und Konfiguration
use led_node::config::{EXTRA_HEAP_SIZE, NET_SOCKETS, WIFI_HEAP_SIZE};
use led_node::tasks::{
    connection_task, dhcp_task, mqtt_task, net_task, node_task, time_sync_task,
};
use led_node::{CommandChannel, OutboundChannel, ParameterRequestChannel, TimeSyncSignal};

// ESP-IDF App Descriptor - erforderlich für den Bootloader!
esp_bootloader_esp_idf::esp_app_desc!();

/// Main Entry Point
///
/// Initialisiert Hardware und WiFi, erstellt die Channels zwischen MQTT-
/// und Node-Task und spawnt alle Tasks. Fehler beim Hochfahren sind fatal.
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    // CPU auf maximale Taktfrequenz (160 MHz)
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Zwei Heap-Bereiche: reclaimed RAM (64 KB) + extra (36 KB)
    esp_alloc::heap_allocator!(
        #[esp_hal::ram(reclaimed)]
        size: WIFI_HEAP_SIZE
    );
    esp_alloc::heap_allocator!(size: EXTRA_HEAP_SIZE);

    // Embassy Runtime initialisieren (Timer + Software Interrupt)
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_interrupt =
        esp_hal::interrupt::software::SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_interrupt.software_interrupt0);

    // WiFi Hardware initialisieren
    static RADIO_INIT: static_cell::StaticCell<esp_radio::Controller> =
        static_cell::StaticCell::new();
    let radio_init =
        RADIO_INIT.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));

    let (wifi_controller, wifi_interface) =
        esp_radio::wifi::new(radio_init, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi");

    // Random seed für TCP/IP Stack (von Hardware RNG)
    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    // MQTT (TCP) + SNTP (UDP) + DNS
    static RESOURCES: static_cell::StaticCell<StackResources<NET_SOCKETS>> =
        static_cell::StaticCell::new();
    let resources = RESOURCES.init(StackResources::new());

    let (stack, runner) = embassy_net::new(
        wifi_interface.sta,
        NetConfig::dhcpv4(Default::default()),
        resources,
        seed,
    );

    // Stack muss 'static sein für Tasks
    static STACK: static_cell::StaticCell<Stack<'static>> = static_cell::StaticCell::new();
    let stack = &*STACK.init(stack);

    // Channels zwischen MQTT- und Node-Task
    static OUTBOUND: static_cell::StaticCell<OutboundChannel> = static_cell::StaticCell::new();
    let outbound = &*OUTBOUND.init(OutboundChannel::new());

    static COMMANDS: static_cell::StaticCell<CommandChannel> = static_cell::StaticCell::new();
    let commands = &*COMMANDS.init(CommandChannel::new());

    static REQUESTS: static_cell::StaticCell<ParameterRequestChannel> =
        static_cell::StaticCell::new();
    let requests = &*REQUESTS.init(ParameterRequestChannel::new());

    // Einmalige Übergabe des Epoch-Offsets an den Node
    static TIME_SYNC: static_cell::StaticCell<TimeSyncSignal> = static_cell::StaticCell::new();
    let time_sync = &*TIME_SYNC.init(TimeSyncSignal::new());

    // Node Task: Strip + Executor (wartet auf Zeit-Synchronisation)
    spawner
        .spawn(node_task(
            peripherals.GPIO8,
            peripherals.RMT,
            outbound.sender(),
            commands.receiver(),
            requests.receiver(),
            time_sync,
        ))
        .expect("Failed to spawn node task");

    // WiFi Tasks
    spawner
        .spawn(connection_task(wifi_controller))
        .expect("Failed to spawn WiFi task");
    spawner
        .spawn(net_task(runner))
        .expect("Failed to spawn net task");
    spawner
        .spawn(dhcp_task(stack))
        .expect("Failed to spawn DHCP task");

    // Einmalige Zeit-Synchronisation, danach startet der Node-Dispatcher
    spawner
        .spawn(time_sync_task(stack, time_sync))
        .expect("Failed to spawn time sync task");

    // MQTT Task: Broker ↔ Node
    spawner
        .spawn(mqtt_task(
            stack,
            outbound.receiver(),
            commands,
            requests.sender(),
        ))
        .expect("Failed to spawn MQTT task");

    // Main-Loop: schläft (alle Arbeit läuft in Tasks)
    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}
