//! Operator configuration – reads/writes `~/.sentinel/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sentinel_runtime::OrchestratorConfig;
use sentinel_types::{CameraSource, SentinelError};

/// Persisted operator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory receiving every captured artifact.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Camera selected at startup.
    #[serde(default = "default_camera")]
    pub start_camera: CameraSource,

    /// Head pitch (rad) of the first scan waypoint.
    #[serde(default)]
    pub scan_start_pitch: f64,

    /// Head pitch (rad) of the last scan waypoint.
    #[serde(default = "default_end_pitch")]
    pub scan_end_pitch: f64,

    /// Waypoints per scan (at least 2).
    #[serde(default = "default_frame_count")]
    pub scan_frame_count: usize,

    /// Settle delay after each waypoint.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Radius (m) of the closed-loop turn.
    #[serde(default = "default_turn_radius")]
    pub turn_radius: f64,

    /// Upper bound on a single image request; `0` waits indefinitely.
    #[serde(default = "default_capture_timeout_ms")]
    pub capture_timeout_ms: u64,

    /// Upper bound on a single motion command (velocity segments get their
    /// own duration on top); `0` waits indefinitely.
    #[serde(default = "default_motion_timeout_ms")]
    pub motion_timeout_ms: u64,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("head_movement_frames")
}
fn default_camera() -> CameraSource {
    CameraSource::FrontLeftFisheye
}
fn default_end_pitch() -> f64 {
    0.5
}
fn default_frame_count() -> usize {
    20
}
fn default_settle_ms() -> u64 {
    100
}
fn default_turn_radius() -> f64 {
    0.3
}
fn default_capture_timeout_ms() -> u64 {
    2000
}
fn default_motion_timeout_ms() -> u64 {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            start_camera: default_camera(),
            scan_start_pitch: 0.0,
            scan_end_pitch: default_end_pitch(),
            scan_frame_count: default_frame_count(),
            settle_ms: default_settle_ms(),
            turn_radius: default_turn_radius(),
            capture_timeout_ms: default_capture_timeout_ms(),
            motion_timeout_ms: default_motion_timeout_ms(),
        }
    }
}

impl Config {
    pub fn capture_timeout(&self) -> Option<Duration> {
        (self.capture_timeout_ms > 0).then(|| Duration::from_millis(self.capture_timeout_ms))
    }

    pub fn motion_timeout(&self) -> Option<Duration> {
        (self.motion_timeout_ms > 0).then(|| Duration::from_millis(self.motion_timeout_ms))
    }

    /// Orchestrator settings derived from this file; everything not
    /// exposed here keeps its built-in default.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            scan_start_pitch: self.scan_start_pitch,
            scan_end_pitch: self.scan_end_pitch,
            scan_frame_count: self.scan_frame_count,
            settle: Duration::from_millis(self.settle_ms),
            turn_radius: self.turn_radius,
            ..OrchestratorConfig::default()
        }
    }
}

/// Return the path to `~/.sentinel/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".sentinel").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, SentinelError> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, SentinelError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        SentinelError::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| SentinelError::Config(format!("failed to parse {}: {e}", path.display())))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `SENTINEL_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SENTINEL_OUTPUT_DIR` | `output_dir` |
/// | `SENTINEL_CAMERA` | `start_camera` |
/// | `SENTINEL_FRAME_COUNT` | `scan_frame_count` |
/// | `SENTINEL_CAPTURE_TIMEOUT_MS` | `capture_timeout_ms` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SENTINEL_OUTPUT_DIR")
        && !v.trim().is_empty()
    {
        cfg.output_dir = PathBuf::from(v);
    }
    if let Some(v) = lookup("SENTINEL_CAMERA")
        && let Ok(camera) = v.parse::<CameraSource>()
    {
        cfg.start_camera = camera;
    }
    if let Some(v) = lookup("SENTINEL_FRAME_COUNT")
        && let Ok(n) = v.trim().parse::<usize>()
    {
        cfg.scan_frame_count = n;
    }
    if let Some(v) = lookup("SENTINEL_CAPTURE_TIMEOUT_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.capture_timeout_ms = ms;
    }
}

/// Save the config to disk, creating `~/.sentinel/` if necessary.
pub fn save(cfg: &Config) -> Result<(), SentinelError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), SentinelError> {
    let io_err = |what: &str, e: std::io::Error| {
        SentinelError::Config(format!("failed to {what} {}: {e}", path.display()))
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err("create directory for", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| io_err("restrict directory of", e))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| SentinelError::Config(format!("failed to serialise config: {e}")))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| io_err("write", e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| io_err("write", e))?;
    Ok(())
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
    fn defaults_match_capture_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.output_dir, PathBuf::from("head_movement_frames"));
        assert_eq!(cfg.start_camera, CameraSource::FrontLeftFisheye);
        assert_eq!(cfg.scan_frame_count, 20);
        assert_eq!(cfg.capture_timeout(), Some(Duration::from_secs(2)));

        let orch = cfg.orchestrator_config();
        assert_eq!(orch.scan_end_pitch, 0.5);
        assert_eq!(orch.settle, Duration::from_millis(100));
        assert_eq!(orch.history_depth, 10);
    }

    #[test]
    fn zero_timeout_disables_it() {
        let cfg = Config {
            capture_timeout_ms: 0,
            motion_timeout_ms: 0,
            ..Config::default()
        };
        assert_eq!(cfg.capture_timeout(), None);
        assert_eq!(cfg.motion_timeout(), None);
        assert_eq!(Config::default().motion_timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&Config::default(), &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "scan_frame_count = 6\nstart_camera = \"back_fisheye\"\n").unwrap();
        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.scan_frame_count, 6);
        assert_eq!(loaded.start_camera, CameraSource::BackFisheye);
        assert_eq!(loaded.turn_radius, 0.3);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "scan_frame_count = \"many\"").unwrap();
        assert!(matches!(load_from(&path), Err(SentinelError::Config(_))));
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&Config::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = std::fs::metadata(path.parent().unwrap())
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn config_path_points_to_sentinel_dir() {
        let p = config_path_for_home("/home/operator");
        assert_eq!(p, PathBuf::from("/home/operator/.sentinel/config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            lookup_from(&[
                ("SENTINEL_OUTPUT_DIR", "/data/frames"),
                ("SENTINEL_CAMERA", "right_fisheye_image"),
                ("SENTINEL_FRAME_COUNT", "8"),
                ("SENTINEL_CAPTURE_TIMEOUT_MS", "500"),
            ]),
        );
        assert_eq!(cfg.output_dir, PathBuf::from("/data/frames"));
        assert_eq!(cfg.start_camera, CameraSource::RightFisheye);
        assert_eq!(cfg.scan_frame_count, 8);
        assert_eq!(cfg.capture_timeout_ms, 500);
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            lookup_from(&[
                ("SENTINEL_OUTPUT_DIR", "  "),
                ("SENTINEL_CAMERA", "periscope"),
                ("SENTINEL_FRAME_COUNT", "lots"),
                ("SENTINEL_CAPTURE_TIMEOUT_MS", "-1"),
            ]),
        );
        assert_eq!(cfg, Config::default());
    }
}
