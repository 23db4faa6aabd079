mod config;
mod sink;

use std::thread;
use dotenv::dotenv;
use log::{debug, info, warn};
use mt88l70::platform::{Platform, PlatformDevice, MT88L70_DRIVER};
use mt88l70_gpio::GpioDriver;
use mt88l70_gpio::gpiod::GpiodDriver;
use mt88l70_gpio::irq::PolledIrqChip;
use time::UtcOffset;
use crate::config::Config;
use crate::sink::StdoutInput;

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    info!("mt88l70d starting...");

    // Must happen before any thread is spawned
    let offset = UtcOffset::current_local_offset().unwrap_or_else(|_| {
        warn!("Local offset unavailable, timestamps are in UTC");
        UtcOffset::UTC
    });

    debug!("Trying to load config...");
    let mut config = if let Some(config) = Config::try_load()? {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved.");
        config
    };
    config.apply_env();

    debug!("Initializing GPIO driver...");
    let gpio = GpiodDriver::open(&config.gpiochip)?;
    debug!("{:?} initialized with {} lines.", gpio, gpio.count()?);

    let irq = PolledIrqChip::new().with_poll_interval(config.poll_interval());
    let input = StdoutInput::new(offset);
    let platform = Platform {
        gpio: &gpio,
        irq: &irq,
        input: &input,
    };

    let dev = PlatformDevice::new(MT88L70_DRIVER.name, Some(config.device));
    let dtmf = MT88L70_DRIVER.probe(&dev, platform)?;
    info!("{:?} attached as {:?}. Waiting for tones...", dtmf, dtmf.variant());

    // Events are printed from the interrupt thread
    loop {
        thread::park();
    }
}
