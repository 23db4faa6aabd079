use std::env::var_os;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use dotenv::var;
use mt88l70::keymap::DtmfTone;
use mt88l70::of::{DeviceNode, GpioSpec};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// Path of the GPIO character device the receiver is wired to.
    pub gpiochip: String,
    /// How often the strobe line is sampled, in microseconds.
    pub poll_interval_us: u64,
    /// Hardware description of the receiver.
    pub device: DeviceNode,
}

impl Config {
    fn path() -> PathBuf {
        let config_str = var_os("MT88L70_CONFIG");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("mt88l70.json"));
        PathBuf::from(config_str)
    }

    pub fn try_load() -> eyre::Result<Option<Self>> {
        Self::try_load_from(&Self::path())
    }

    pub fn try_load_from(config_path: &Path) -> eyre::Result<Option<Self>> {
        if !config_path.exists() {
            return Ok(None);
        }

        let file = std::fs::File::open(config_path)?;
        let reader = std::io::BufReader::new(file);
        Ok(Some(serde_json::from_reader(reader)?))
    }

    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, config_path: &Path) -> std::io::Result<()> {
        let file = std::fs::File::create(config_path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Applies overrides from the environment.
    pub fn apply_env(&mut self) {
        if let Ok(gpiochip) = var("MT88L70_GPIOCHIP") {
            self.gpiochip = gpiochip;
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gpiochip: "/dev/gpiochip0".to_string(),
            poll_interval_us: 500,
            device: DeviceNode {
                compatible: vec!["microsemi,mt88l70".to_string()],
                strobe_gpios: vec![Some(GpioSpec::new(17))],
                data_gpios: [5, 6, 13, 19]
                    .into_iter()
                    .map(|line| Some(GpioSpec::new(line)))
                    .collect(),
                keymap: Some(DtmfTone::default_keymap_entries()),
                num_rows: Some(4),
                num_columns: Some(4),
                wakeup_source: false,
            },
        }
    }
}
