// Task-Modul: Enthält alle Embassy Tasks
//
// Jeder Task läuft asynchron und unabhängig.
// Tasks kommunizieren über Embassy Channels (MQTT ↔ Node).

pub mod mqtt;
pub mod node;
pub mod time_sync;
pub mod wifi;

// Re-export Tasks für einfachen Import
pub use mqtt::mqtt_task;
pub use node::node_task;
pub use time_sync::time_sync_task;
pub use wifi::{connection_task, dhcp_task, net_task, wait_for_network};
