use serde::{Deserialize, Serialize};
use twinsim_kernel::IntegratorConfig;
use twinsim_native::NativeConfig;

use crate::mode::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Mode requested at startup.
    pub mode: Mode,
    pub integrator: IntegratorConfig,
    pub native: NativeConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: RouterConfig = serde_yaml::from_str(
            "mode: native\nintegrator:\n  fluid_level: 2.5\nnative:\n  max_substeps: 3\n",
        )
        .unwrap();
        assert_eq!(config.mode, Mode::Native);
        assert_eq!(config.integrator.fluid_level, Some(2.5));
        assert_eq!(config.integrator.gravity, -9.81);
        assert_eq!(config.native.max_substeps, 3);
        assert_eq!(config.native.init_timeout_ms, 5000);
    }
}
