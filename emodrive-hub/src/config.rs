//! emodrive Hub Configuration
//!
//! Defaults, overridden by environment variables, then by command-line flags.

use std::env;
use std::path::PathBuf;

use tracing::info;

use emodrive_core::{
    presets, EmoError, EmoResult, EmotionMapper, Mapper, MapperFactory, MapperKind, MapperSpec,
};

use crate::analyzer::DEFAULT_ENDPOINT;
use crate::forwarder::{FillerMotionPolicy, NoSuppression, SuppressionPolicy};

pub const USAGE: &str = "\
usage: emodrive-hub [--stdin] [--verbose]

  --stdin        broadcast lines read from stdin (EMODRIVE_STDIN)
  -v, --verbose  debug logging (EMODRIVE_VERBOSE)
  -h, --help     show this help

environment:
  EMODRIVE_WS_PORT        viewer WebSocket port (9001)
  EMODRIVE_HTTP_PORT      message ingestion port, off to disable (9002)
  EMODRIVE_DRIVER_PORT    text driver port, off by default
  EMODRIVE_MAPPER         mapper configuration file (shizuku preset)
  EMODRIVE_FILLER_MOTION  filler motion to suppress, off to disable (flick_head)
  EMODRIVE_REDUCE         reduce analyzer categories before mapping (on)
  EMOTEXT_SERVER          emotion analyzer endpoint";

/// Hub configuration
#[derive(Debug, Clone, PartialEq)]
pub struct HubConfig {
    /// Viewer WebSocket (`/live2d`), `/health` and `/stats`
    pub ws_port: u16,
    /// Message ingestion endpoint
    pub http_port: Option<u16>,
    /// Text driver endpoint
    pub driver_port: Option<u16>,
    /// Mapper configuration file; the shizuku preset when unset
    pub mapper_path: Option<PathBuf>,
    pub emotext_server: String,
    /// Filler motion label to suppress; `None` disables suppression
    pub filler_motion: Option<String>,
    pub reduce_emotions: bool,
    pub stdin: bool,
    pub verbose: bool,
    pub help: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            ws_port: 9001,
            http_port: Some(9002),
            driver_port: None,
            mapper_path: None,
            emotext_server: DEFAULT_ENDPOINT.to_string(),
            filler_motion: Some(presets::SHIZUKU_FILLER_MOTION.to_string()),
            reduce_emotions: true,
            stdin: false,
            verbose: false,
            help: false,
        }
    }
}

impl HubConfig {
    /// Create config from environment variables
    pub fn from_env() -> EmoResult<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Create config from a variable lookup
    pub fn from_vars<F>(var: F) -> EmoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = var("EMODRIVE_WS_PORT") {
            config.ws_port = parse_port("EMODRIVE_WS_PORT", &port)?
                .ok_or_else(|| EmoError::config("EMODRIVE_WS_PORT cannot be disabled"))?;
        }
        if let Some(port) = var("EMODRIVE_HTTP_PORT") {
            config.http_port = parse_port("EMODRIVE_HTTP_PORT", &port)?;
        }
        if let Some(port) = var("EMODRIVE_DRIVER_PORT") {
            config.driver_port = parse_port("EMODRIVE_DRIVER_PORT", &port)?;
        }

        if let Some(path) = var("EMODRIVE_MAPPER").filter(|p| !p.trim().is_empty()) {
            config.mapper_path = Some(PathBuf::from(path.trim()));
        }
        if let Some(server) = var("EMOTEXT_SERVER").filter(|s| !s.trim().is_empty()) {
            config.emotext_server = server.trim().to_string();
        }

        if let Some(motion) = var("EMODRIVE_FILLER_MOTION") {
            let motion = motion.trim();
            config.filler_motion = if is_off(motion) {
                None
            } else {
                Some(motion.to_string())
            };
        }

        if let Some(v) = var("EMODRIVE_REDUCE") {
            config.reduce_emotions = !is_off(v.trim()) && !is_false(v.trim());
        }
        if let Some(v) = var("EMODRIVE_STDIN") {
            config.stdin = is_true(v.trim());
        }
        if let Some(v) = var("EMODRIVE_VERBOSE") {
            config.verbose = is_true(v.trim());
        }

        Ok(config)
    }

    /// Apply command-line flags (program name already stripped)
    pub fn apply_args<I, S>(&mut self, args: I) -> EmoResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            match arg.as_ref() {
                "--stdin" => self.stdin = true,
                "--verbose" | "-v" => self.verbose = true,
                "--help" | "-h" => self.help = true,
                other => return Err(EmoError::config(format!("unknown argument: {}", other))),
            }
        }
        Ok(())
    }

    /// Reject configurations the hub cannot run with
    pub fn validate(&self) -> EmoResult<()> {
        if !self.stdin && self.http_port.is_none() && self.driver_port.is_none() {
            return Err(EmoError::config(
                "no input source: enable --stdin, EMODRIVE_HTTP_PORT or EMODRIVE_DRIVER_PORT",
            ));
        }

        let ports = [Some(self.ws_port), self.http_port, self.driver_port];
        let ports: Vec<u16> = ports.into_iter().flatten().collect();
        for (i, port) in ports.iter().enumerate() {
            if ports[i + 1..].contains(port) {
                return Err(EmoError::config(format!("port {} is used twice", port)));
            }
        }
        Ok(())
    }

    /// The mapper spec: the configured file, or the stateful shizuku preset
    pub fn mapper_spec(&self) -> EmoResult<MapperSpec> {
        match &self.mapper_path {
            Some(path) => {
                info!("loading mapper configuration from {}", path.display());
                MapperSpec::load(path)
            }
            None => Ok(presets::shizuku(MapperKind::Stateful)),
        }
    }

    pub fn build_mapper(&self) -> EmoResult<Mapper> {
        MapperFactory::new(self.mapper_spec()?).create()
    }

    pub fn suppression_policy(&self) -> Box<dyn SuppressionPolicy> {
        match &self.filler_motion {
            Some(motion) => Box::new(FillerMotionPolicy::new(motion, FillerMotionPolicy::DEFAULT_WINDOW)),
            None => Box::new(NoSuppression),
        }
    }
}

fn parse_port(key: &str, value: &str) -> EmoResult<Option<u16>> {
    let value = value.trim();
    if is_off(value) {
        return Ok(None);
    }
    value
        .parse::<u16>()
        .map(|p| if p == 0 { None } else { Some(p) })
        .map_err(|_| EmoError::config(format!("{}: invalid port {:?}", key, value)))
}

fn is_off(v: &str) -> bool {
    v.is_empty() || v.eq_ignore_ascii_case("off")
}

fn is_false(v: &str) -> bool {
    v == "0" || v.eq_ignore_ascii_case("false") || v.eq_ignore_ascii_case("no")
}

fn is_true(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes") || v.eq_ignore_ascii_case("on")
}

fn describe_port(port: Option<u16>) -> String {
    port.map(|p| p.to_string()).unwrap_or_else(|| "off".to_string())
}

/// Print startup banner with config info
pub fn print_banner(config: &HubConfig, mapper: &Mapper) {
    let mapper_source = config
        .mapper_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "shizuku preset".to_string());

    println!();
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║              emodrive Hub - Avatar Control               ║");
    println!("╠══════════════════════════════════════════════════════════╣");
    println!("║  Viewers:  ws://0.0.0.0:{:<5}/live2d                     ║", config.ws_port);
    println!("║  Ingest:   {:<46}║", describe_port(config.http_port));
    println!("║  Driver:   {:<46}║", describe_port(config.driver_port));
    println!("║  Stdin:    {:<46}║", if config.stdin { "on" } else { "off" });
    println!("║  Mapper:   {:<46}║", format!("{} ({})", mapper.name(), mapper_source));
    println!("║  Filler:   {:<46}║", config.filler_motion.as_deref().unwrap_or("off"));
    println!("║  Emotext:  {:<46}║", config.emotext_server);
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn from(pairs: &[(&str, &str)]) -> EmoResult<HubConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HubConfig::from_vars(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from(&[]).unwrap();
        assert_eq!(config, HubConfig::default());
        assert_eq!(config.ws_port, 9001);
        assert_eq!(config.http_port, Some(9002));
        assert_eq!(config.driver_port, None);
        assert_eq!(config.emotext_server, "http://localhost:9003/");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = from(&[
            ("EMODRIVE_WS_PORT", "7001"),
            ("EMODRIVE_HTTP_PORT", "off"),
            ("EMODRIVE_DRIVER_PORT", "7004"),
            ("EMODRIVE_FILLER_MOTION", "off"),
            ("EMODRIVE_REDUCE", "false"),
            ("EMODRIVE_STDIN", "1"),
            ("EMOTEXT_SERVER", "http://analyzer:8000/"),
        ])
        .unwrap();

        assert_eq!(config.ws_port, 7001);
        assert_eq!(config.http_port, None);
        assert_eq!(config.driver_port, Some(7004));
        assert_eq!(config.filler_motion, None);
        assert!(!config.reduce_emotions);
        assert!(config.stdin);
        assert_eq!(config.emotext_server, "http://analyzer:8000/");
        assert_eq!(config.suppression_policy().name(), "none");
    }

    #[test]
    fn test_invalid_port() {
        let err = from(&[("EMODRIVE_HTTP_PORT", "ninety")]).unwrap_err();
        assert!(err.is_config());
        assert!(from(&[("EMODRIVE_WS_PORT", "off")]).unwrap_err().is_config());
        assert_eq!(from(&[("EMODRIVE_HTTP_PORT", "0")]).unwrap().http_port, None);
    }

    #[test]
    fn test_no_input_source() {
        let config = from(&[("EMODRIVE_HTTP_PORT", "")]).unwrap();
        assert!(config.validate().unwrap_err().is_config());

        let mut config = config;
        config.apply_args(["--stdin"]).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_port() {
        let config = from(&[("EMODRIVE_DRIVER_PORT", "9001")]).unwrap();
        assert!(config.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_args() {
        let mut config = HubConfig::default();
        config.apply_args(["-v", "--stdin"]).unwrap();
        assert!(config.verbose);
        assert!(config.stdin);
        assert!(!config.help);

        config.apply_args(["--help"]).unwrap();
        assert!(config.help);

        assert!(config.apply_args(["--bogus"]).unwrap_err().is_config());
    }

    #[test]
    fn test_default_mapper_is_stateful_shizuku() {
        let mapper = HubConfig::default().build_mapper().unwrap();
        assert_eq!(mapper.name(), "stateful");
        assert_eq!(mapper.tables(), &presets::shizuku(MapperKind::Stateful).config);
        assert_eq!(HubConfig::default().suppression_policy().name(), "filler-motion");
    }

    #[test]
    fn test_mapper_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"type": "stateless", "config": {{
                "motionFromEmotion": {{"happiness": "nod"}},
                "expressionFromPolarity": {{"positive": "smile"}}
            }}}}"#
        )
        .unwrap();

        let config = from(&[("EMODRIVE_MAPPER", file.path().to_str().unwrap())]).unwrap();
        let mapper = config.build_mapper().unwrap();
        assert_eq!(mapper.name(), "stateless");
    }

    #[test]
    fn test_mapper_file_with_unknown_type() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"type": "psychic", "config": {{
                "motionFromEmotion": {{"happiness": "nod"}},
                "expressionFromPolarity": {{"positive": "smile"}}
            }}}}"#
        )
        .unwrap();

        let config = from(&[("EMODRIVE_MAPPER", file.path().to_str().unwrap())]).unwrap();
        assert!(matches!(config.build_mapper(), Err(EmoError::UnknownMapper(_))));
    }
}
