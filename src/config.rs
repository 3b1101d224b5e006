// src/config.rs

use anyhow::{bail, Context, Result};
use std::{env, path::PathBuf, str::FromStr, time::Duration};
use url::Url;

use crate::process::batch::MAX_BATCH_SIZE;

pub const DEFAULT_INPUT: &str = "to_be_decoded.csv";
pub const DEFAULT_COLUMN: &str = "VIN";
pub const DEFAULT_OUTPUT_BASE: &str = "decoded_vins_output";
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 2;
pub const DEFAULT_DECODE_URL: &str =
    "https://vpic.nhtsa.dot.gov/api/vehicles/DecodeVINValuesBatch/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime settings for one decode run, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub input_path: PathBuf,
    pub vin_column: String,
    pub output_base: PathBuf,
    pub max_file_bytes: u64,
    pub batch_size: usize,
    pub decode_url: Url,
    pub request_timeout: Duration,
}

impl Config {
    /// Build from `VIN_INPUT`, `VIN_COLUMN`, `OUTPUT_BASE`, `MAX_FILE_SIZE_MB`,
    /// `BATCH_SIZE`, `DECODE_URL` and `REQUEST_TIMEOUT_SECS`.
    /// A positional `input` argument wins over `VIN_INPUT`.
    pub fn from_env(input: Option<String>) -> Result<Self> {
        Self::from_lookup(input, |key| env::var(key).ok())
    }

    fn from_lookup<F>(input: Option<String>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let input_path = input
            .or_else(|| lookup("VIN_INPUT"))
            .unwrap_or_else(|| DEFAULT_INPUT.to_string());
        let vin_column = lookup("VIN_COLUMN").unwrap_or_else(|| DEFAULT_COLUMN.to_string());
        let output_base =
            lookup("OUTPUT_BASE").unwrap_or_else(|| DEFAULT_OUTPUT_BASE.to_string());

        let max_mb: u64 = parse_var(&lookup, "MAX_FILE_SIZE_MB", DEFAULT_MAX_FILE_SIZE_MB)?;
        let batch_size: usize = parse_var(&lookup, "BATCH_SIZE", MAX_BATCH_SIZE)?;
        if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
            bail!(
                "BATCH_SIZE must be between 1 and {}, got {}",
                MAX_BATCH_SIZE,
                batch_size
            );
        }
        let max_file_bytes = match max_mb.checked_mul(1024 * 1024) {
            Some(bytes) => bytes,
            None => bail!("MAX_FILE_SIZE_MB is too large: {}", max_mb),
        };
        let timeout_secs: u64 = parse_var(&lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            bail!("REQUEST_TIMEOUT_SECS must be at least 1");
        }

        let raw_url = lookup("DECODE_URL").unwrap_or_else(|| DEFAULT_DECODE_URL.to_string());
        let decode_url =
            Url::parse(&raw_url).with_context(|| format!("parsing DECODE_URL {}", raw_url))?;

        Ok(Config {
            input_path: PathBuf::from(input_path),
            vin_column,
            output_base: PathBuf::from(output_base),
            max_file_bytes,
            batch_size,
            decode_url,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let cfg = Config::from_lookup(None, lookup_from(&[])).unwrap();
        assert_eq!(cfg.input_path, PathBuf::from(DEFAULT_INPUT));
        assert_eq!(cfg.vin_column, "VIN");
        assert_eq!(cfg.output_base, PathBuf::from("decoded_vins_output"));
        assert_eq!(cfg.max_file_bytes, 2 * 1024 * 1024);
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(cfg.decode_url.as_str(), DEFAULT_DECODE_URL);
    }

    #[test]
    fn positional_input_overrides_env() {
        let lookup = lookup_from(&[("VIN_INPUT", "from_env.csv"), ("MAX_FILE_SIZE_MB", "5")]);
        let cfg = Config::from_lookup(Some("cli.csv".into()), lookup).unwrap();
        assert_eq!(cfg.input_path, PathBuf::from("cli.csv"));
        assert_eq!(cfg.max_file_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_lookup(None, lookup_from(&[("BATCH_SIZE", "0")])).is_err());
        assert!(Config::from_lookup(None, lookup_from(&[("BATCH_SIZE", "51")])).is_err());
        assert!(Config::from_lookup(None, lookup_from(&[("MAX_FILE_SIZE_MB", "big")])).is_err());
        assert!(Config::from_lookup(None, lookup_from(&[("DECODE_URL", "not a url")])).is_err());
    }

    #[test]
    fn rejects_oversized_limit_and_zero_timeout() {
        let huge = u64::MAX.to_string();
        let err = Config::from_lookup(None, lookup_from(&[("MAX_FILE_SIZE_MB", huge.as_str())]))
            .unwrap_err();
        assert!(err.to_string().contains("MAX_FILE_SIZE_MB"));

        let err = Config::from_lookup(None, lookup_from(&[("REQUEST_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("REQUEST_TIMEOUT_SECS"));
    }
}
