mod app;
mod config;

use std::thread;
use std::time::{Duration, Instant};
use dotenv::dotenv;
use log::{debug, info};
use sysinfo::System;
use time::OffsetDateTime;
use keyscan_gpio::PinBank;
use keyscan_gpio::debounce::TimedKeyFilter;
use keyscan_gpio::gpiod::GpiodDriver;
use keyscan_gpio::keypad::{EdgeWatcher, KEYPAD_MAP, Keypad, MatrixKeypad};
use crate::app::App;
use crate::config::Config;

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!("keyscan v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Host {} ({} kernel {})",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR),
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );

    debug!("Trying to load config...");
    let config = if let Some(config) = Config::try_load()? {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved.");
        config
    };

    let handle = config.handle()?;
    info!("Keypad @ Rows: {:?}, Cols: {:?}", handle.row_pins, handle.col_pins);

    debug!("Opening GPIO chips...");
    let chips = config
        .chips
        .iter()
        .map(GpiodDriver::open)
        .collect::<Result<Vec<_>, _>>()?;

    let mut bank = PinBank::new();
    for chip in &chips {
        let port = bank.add_port(chip);
        debug!("Port {} is {:?}.", port, chip);
    }

    debug!("Initializing keypad...");
    handle.claim_pins(&mut bank)?;
    let keypad = MatrixKeypad::new(handle, &bank, &KEYPAD_MAP);
    keypad.init()?;
    debug!("{:?} initialized.", keypad);

    let watcher = EdgeWatcher::new(&bank, handle.col_pins)?;
    let filter = TimedKeyFilter::new().with_debounce_time(Duration::from_millis(config.debounce_ms));
    debug!("Watching {:?} through {:?}.", watcher, filter);

    let mut app = App::new(&keypad, watcher, filter);
    let poll_interval = Duration::from_millis(config.poll_interval_ms);

    info!("Starting main loop...");

    loop {
        for key in app.update(Instant::now())? {
            let stamp = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
            println!("{} {}", stamp.time(), key);
        }

        thread::sleep(poll_interval);
    }
}
