use std::path::PathBuf;
use std::{env, fs, io};

use anyhow::{Context, Result};
use clap::Args;
use log::warn;
use serde::de::DeserializeOwned;

use crate::dirs;

/// Directories the service reads its configuration from and writes its
/// state into.
pub struct PathSet {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub pki_dir: PathBuf,
}

impl PathSet {
    pub fn new(config_dir: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<Self> {
        let is_root = dirs::is_root();

        let config_dir = if let Some(dir) = config_dir {
            dir
        } else if let Ok(dir) = env::var("COFFEE_SHOP_CONFIG") {
            PathBuf::from(dir)
        } else if is_root {
            PathBuf::from("/etc/coffee-shop")
        } else {
            dirs::home_dir()?.join(".config").join("coffee-shop")
        };

        let data_dir = if let Some(dir) = data_dir {
            dir
        } else if let Ok(dir) = env::var("COFFEE_SHOP_DATA") {
            PathBuf::from(dir)
        } else if is_root {
            PathBuf::from("/var/lib/coffee-shop")
        } else {
            dirs::home_dir()?
                .join(".local")
                .join("share")
                .join("coffee-shop")
        };

        // PKI dir is always under config dir
        let pki_dir = config_dir.join("pki");

        dirs::ensure_dir_exists(&config_dir)
            .with_context(|| format!("ensure config directory: {}", config_dir.display()))?;
        dirs::ensure_dir_exists(&data_dir)
            .with_context(|| format!("ensure data directory: {}", data_dir.display()))?;
        dirs::ensure_dir_exists(&pki_dir)
            .with_context(|| format!("ensure pki directory: {}", pki_dir.display()))?;

        Ok(Self {
            config_dir,
            data_dir,
            pki_dir,
        })
    }

    /// Reads `<config_dir>/<name>.toml`, falling back to the type's defaults
    /// when the file does not exist, then completes the result.
    pub fn load_config<T>(&self, name: &str) -> Result<T>
    where
        T: CommonConfig + Default + DeserializeOwned,
    {
        let path = self.config_dir.join(format!("{name}.toml"));
        let mut cfg: T = match fs::read_to_string(&path) {
            Ok(s) => toml::from_str(&s)
                .with_context(|| format!("parse config toml: {}", path.display()))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!("Config file for {name} not found, using defaults");
                T::default()
            }
            Err(err) => {
                return Err(err).context(format!("read config file: {}", path.display()));
            }
        };

        cfg.complete(self).context("validate config")?;
        Ok(cfg)
    }
}

pub trait CommonConfig {
    /// Validates the loaded values and fills in everything derived from them.
    fn complete(&mut self, ps: &PathSet) -> Result<()>;
}

/// Command line flags shared by everything that loads a config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// The config directory, default is `~/.config/coffee-shop`.
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// The data directory, default is `~/.local/share/coffee-shop`.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn build_path_set(&self) -> Result<PathSet> {
        PathSet::new(self.config_dir.clone(), self.data_dir.clone())
    }

    pub fn load<T>(&self, name: &str) -> Result<T>
    where
        T: CommonConfig + Default + DeserializeOwned,
    {
        let ps = self.build_path_set()?;
        ps.load_config(name)
    }
}

/// See: [`shellexpand::full`].
pub fn expandenv(name: &str, s: impl AsRef<str>) -> Result<String> {
    let s =
        shellexpand::full(s.as_ref()).with_context(|| format!("expand env value for '{name}'"))?;
    Ok(s.to_string())
}
