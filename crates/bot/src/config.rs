use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "./config.json";
const DEFAULT_STORE_PATH: &str = "./bones-store";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("invalid url for `{name}`: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Contents of the optional `config.json`. Every key may be omitted and
/// filled in from the environment instead.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub homeserver: Option<String>,
    pub token: Option<String>,
    pub hydrus_api: Option<String>,
    pub hydrus_token: Option<String>,
    pub fake_hs: Option<String>,
    pub prefix: Option<String>,
    pub store_path: Option<String>,
    pub invite_senders: Option<Vec<String>>,
}

impl FileConfig {
    /// Reads the file at `path`. A missing file is not an error.
    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(parsed))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub homeserver: String,
    pub access_token: String,
    pub hydrus_api: String,
    pub hydrus_token: String,
    /// Host part of the `mxc://` locators handed out in replies.
    pub locator_host: String,
    pub locator_prefix: String,
    pub store_path: PathBuf,
    pub invite_senders: Vec<String>,
}

impl Config {
    /// Loads `config.json` (or `$BONES_CONFIG`) and layers the process
    /// environment underneath it.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("BONES_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let file = FileConfig::read(Path::new(&path))?;
        Self::resolve(file.unwrap_or_default(), |key| env::var(key).ok())
    }

    /// File values win, then the `BONES_*` variables, then `MATRIXDEV_*`.
    pub fn resolve<F>(file: FileConfig, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |from_file: Option<String>, keys: &[&str]| {
            from_file
                .filter(|v| !v.is_empty())
                .or_else(|| keys.iter().find_map(|&k| env(k).filter(|v| !v.is_empty())))
        };

        let homeserver = pick(file.homeserver, &["BONES_HOMESERVER", "MATRIXDEV_HOMESERVER"])
            .ok_or(ConfigError::Missing("homeserver"))?;
        let access_token = pick(file.token, &["BONES_TOKEN", "MATRIXDEV_TOKEN"])
            .ok_or(ConfigError::Missing("token"))?;
        let hydrus_api = pick(file.hydrus_api, &["HYDRUS_URI"])
            .ok_or(ConfigError::Missing("hydrus_api"))?;
        let hydrus_token = pick(file.hydrus_token, &["HYDRUS_TOKEN"])
            .ok_or(ConfigError::Missing("hydrus_token"))?;
        let locator_host =
            pick(file.fake_hs, &["FAKE_HS"]).ok_or(ConfigError::Missing("fake_hs"))?;
        let locator_prefix = file
            .prefix
            .or_else(|| env("PREFIX"))
            .unwrap_or_default();
        let store_path = pick(file.store_path, &["BONES_STORE"])
            .unwrap_or_else(|| DEFAULT_STORE_PATH.into());
        let invite_senders = file
            .invite_senders
            .or_else(|| env("BONES_INVITE_SENDERS").map(|raw| split_list(&raw)))
            .unwrap_or_default();

        check_url("homeserver", &homeserver)?;
        check_url("hydrus_api", &hydrus_api)?;

        Ok(Self {
            homeserver,
            access_token,
            hydrus_api: hydrus_api.trim_end_matches('/').to_string(),
            hydrus_token,
            locator_host,
            locator_prefix,
            store_path: PathBuf::from(store_path),
            invite_senders,
        })
    }
}

fn check_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|source| ConfigError::InvalidUrl { name, source })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
