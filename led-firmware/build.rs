// Build-Script: Wird vor dem Kompilieren ausgeführt
// Backt die Netzwerk-Konfiguration ein und setzt die Linker-Skripte

/// Variablen aus `.env`, die als `env!()` im Code landen
const BAKED_VARS: &[&str] = &[
    "WIFI_SSID",
    "WIFI_PASSWORD",
    "MQTT_BROKER",
    "MQTT_CLIENT_ID",
    "SNTP_SERVER",
];

fn main() {
    // Fehlt .env, müssen die Werte als Environment-Variablen gesetzt sein
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("⚠️  .env file nicht gefunden: {}", e);
        eprintln!("   Setze WIFI_SSID, WIFI_PASSWORD, MQTT_BROKER und MQTT_CLIENT_ID");
    }

    for var in BAKED_VARS {
        println!("cargo:rerun-if-env-changed={}", var);
        if let Ok(value) = std::env::var(var) {
            println!("cargo:rustc-env={}={}", var, value);
        }
    }
    println!("cargo:rerun-if-changed=.env");

    linker_hints();

    // defmt.x: Symbole für defmt's binäres Log-Format
    println!("cargo:rustc-link-arg=-Tdefmt.x");

    // linkall.x: Flash/RAM-Layout, muss als LETZTES kommen
    println!("cargo:rustc-link-arg=-Tlinkall.x");
}

// Wird vom Linker als "--error-handling-script" erneut aufgerufen
fn linker_hints() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 2 {
        let (kind, what) = (args[1].as_str(), args[2].as_str());
        if kind != "undefined-symbol" {
            std::process::exit(1);
        }

        let hint = match what {
            w if w.starts_with("_defmt_") => {
                Some("`defmt` not found - is `defmt.x` passed as linker script?")
            }
            "_stack_start" => Some("Is the linker script `linkall.x` missing?"),
            w if w.starts_with("esp_rtos_") => {
                Some("`esp-radio` has no scheduler - was `esp_rtos::start()` called?")
            }
            "free" | "malloc" | "calloc" | "get_free_internal_heap_size" => {
                Some("Did you forget the `esp-alloc` dependency?")
            }
            _ => None,
        };
        if let Some(hint) = hint {
            eprintln!();
            eprintln!("💡 {}", hint);
            eprintln!();
        }
        std::process::exit(0);
    }

    if let Ok(exe) = std::env::current_exe() {
        println!(
            "cargo:rustc-link-arg=--error-handling-script={}",
            exe.display()
        );
    }
}
