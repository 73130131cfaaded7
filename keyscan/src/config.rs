use std::env::var_os;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use dotenv::var;
use eyre::WrapErr;
use serde::{Serialize, Deserialize};
use keyscan_gpio::PinId;
use keyscan_gpio::keypad::KeypadHandle4x4;

const DEFAULT_CONFIG_FILE: &str = "keyscan.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// GPIO character devices; the index of each one is its port number.
    pub chips: Vec<PathBuf>,
    pub row_pins: [String; 4],
    pub col_pins: [String; 4],
    pub debounce_ms: u64,
    pub poll_interval_ms: u64,
}

/// Parses four pins separated by commas, spaces or semicolons, e.g. `"0:5, 0:6, 0:13, 0:19"`.
pub fn parse_pin_bus(pin_str: &str) -> eyre::Result<[PinId; 4]> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| eyre::eyre!("Invalid number of keypad pins"))
}

impl Config {
    fn path() -> PathBuf {
        let config_str = var_os("KEYSCAN_CONFIG");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new(DEFAULT_CONFIG_FILE));
        Path::new(config_str).to_path_buf()
    }

    /// Loads the config file.
    ///
    /// Returns `Ok(None)` only if the file doesn't exist; a file that can't be read or parsed is an error.
    pub fn try_load() -> eyre::Result<Option<Self>> {
        Self::load_from(&Self::path())
    }

    fn load_from(config_path: &Path) -> eyre::Result<Option<Self>> {
        if !config_path.exists() {
            return Ok(None);
        }

        let file = std::fs::File::open(config_path)
            .wrap_err_with(|| format!("Failed to open {}", config_path.display()))?;
        let reader = std::io::BufReader::new(file);
        let config = serde_json::from_reader(reader)
            .wrap_err_with(|| format!("Failed to parse {}", config_path.display()))?;
        Ok(Some(config))
    }

    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::path())
    }

    fn save_to(&self, config_path: &Path) -> std::io::Result<()> {
        let file = std::fs::File::create(config_path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Builds the keypad handle, letting `KEYSCAN_ROW_PINS` and `KEYSCAN_COL_PINS` override the file.
    pub fn handle(&self) -> eyre::Result<KeypadHandle4x4> {
        self.handle_with(
            var("KEYSCAN_ROW_PINS").ok().as_deref(),
            var("KEYSCAN_COL_PINS").ok().as_deref(),
        )
    }

    fn handle_with(&self, rows: Option<&str>, cols: Option<&str>) -> eyre::Result<KeypadHandle4x4> {
        let rows = parse_pin_bus(rows.unwrap_or(self.row_pins.join(",").as_str()))?;
        let cols = parse_pin_bus(cols.unwrap_or(self.col_pins.join(",").as_str()))?;

        if let Some(pin) = rows.iter().find(|pin| cols.contains(*pin)) {
            eyre::bail!("Pin {} is used as both a row and a column", pin);
        }

        Ok(KeypadHandle4x4::new(rows, cols))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chips: vec![PathBuf::from("/dev/gpiochip0")],
            row_pins: ["0:5", "0:6", "0:13", "0:19"].map(String::from),
            col_pins: ["0:12", "0:16", "0:20", "0:21"].map(String::from),
            debounce_ms: 200,
            poll_interval_ms: 2,
        }
    }
}
