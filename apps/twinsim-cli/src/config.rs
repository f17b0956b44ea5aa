use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use twinsim_input::ControllerConfig;
use twinsim_net::NetworkConfig;
use twinsim_router::RouterConfig;
use twinsim_scheduler::SchedulerConfig;

/// Everything the host needs, loadable from one YAML file. Missing sections
/// fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub router: RouterConfig,
    pub scheduler: SchedulerConfig,
    pub network: NetworkConfig,
    pub controller: ControllerConfig,
    /// Attempt to reach the authoritative server at startup.
    pub connect: bool,
}

impl SimConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use twinsim_router::Mode;

    #[test]
    fn loads_partial_yaml_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "router:\n  mode: native\n  integrator:\n    fluid_level: 1.5\nscheduler:\n  fixed_dt: 0.01\nnetwork:\n  url: ws://sim.local:9000\nconnect: true"
        )
        .unwrap();

        let config = SimConfig::load(file.path()).unwrap();
        assert_eq!(config.router.mode, Mode::Native);
        assert_eq!(config.router.integrator.fluid_level, Some(1.5));
        assert_eq!(config.scheduler.fixed_dt, 0.01);
        assert_eq!(config.scheduler.max_frame_delta, 0.25);
        assert_eq!(config.network.url, "ws://sim.local:9000");
        assert_eq!(config.network.probe_timeout_ms, 800);
        assert_eq!(config.controller, ControllerConfig::default());
        assert!(config.connect);
    }

    #[test]
    fn empty_mapping_is_all_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{}}").unwrap();
        assert_eq!(SimConfig::load(file.path()).unwrap(), SimConfig::default());
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let err = SimConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("absent.yaml"));
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "scheduler: [1, 2").unwrap();
        assert!(SimConfig::load(file.path()).is_err());
    }
}
