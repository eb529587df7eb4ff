use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const SETTINGS_PATH: &str = "settings.toml";

const MIN_TICK_HZ: u32 = 10;
const MAX_TICK_HZ: u32 = 240;
const MAX_DECODE_THREADS: usize = 16;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_server_addr")]
    pub server_addr: String,
    #[serde(default = "default_username")]
    pub username: String,
    /// 0 picks a thread count from the machine's parallelism.
    #[serde(default)]
    pub decode_threads: usize,
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            username: default_username(),
            decode_threads: 0,
            tick_hz: default_tick_hz(),
        }
    }
}

impl ClientSettings {
    fn sanitize(mut self) -> Self {
        if self.username.trim().is_empty() {
            self.username = default_username();
        }
        self.decode_threads = self.decode_threads.min(MAX_DECODE_THREADS);
        self.tick_hz = self.tick_hz.clamp(MIN_TICK_HZ, MAX_TICK_HZ);
        self
    }

    /// Explicit worker count for the decode pool, `None` for automatic.
    pub fn decode_threads(&self) -> Option<usize> {
        (self.decode_threads > 0).then_some(self.decode_threads)
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let parsed = toml::from_str::<Self>(&contents).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to deserialize settings: {e}"),
            )
        })?;
        Ok(parsed.sanitize())
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let settings = self.clone().sanitize();
        let serialized = toml::to_string_pretty(&settings).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to serialize settings: {e}"),
            )
        })?;
        fs::write(path, serialized)
    }
}

fn default_server_addr() -> String {
    "127.0.0.1:29707".to_owned()
}

fn default_username() -> String {
    "player".to_owned()
}

fn default_tick_hz() -> u32 {
    60
}

#[cfg(test)]
mod tests {
    use super::ClientSettings;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: ClientSettings =
            toml::from_str("username = \"ore\"").expect("parse partial settings");
        assert_eq!(parsed.username, "ore");
        assert_eq!(parsed.server_addr, "127.0.0.1:29707");
        assert_eq!(parsed.tick_hz, 60);
        assert_eq!(parsed.decode_threads(), None);
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let settings = ClientSettings {
            username: "   ".to_owned(),
            decode_threads: 99,
            tick_hz: 1000,
            ..ClientSettings::default()
        }
        .sanitize();

        assert_eq!(settings.username, "player");
        assert_eq!(settings.decode_threads, 16);
        assert_eq!(settings.tick_hz, 240);
    }
}
