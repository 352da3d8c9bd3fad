use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Engine limits, referenced by the payload codec and the firing loop
pub const DEFAULT_TICK_MS: u64 = 250; // polling cadence of the firing loop
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3; // executor invocations before an entry is dropped
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024; // 1 MiB hard cap per encoded command
pub const MAX_COMMAND_ARGS: usize = 4096; // argument count cap per command

/// Top-level config (deferq.toml + DEFERQ_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeferqConfig {
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Firing-loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Polling interval of the firing loop, in milliseconds.
    /// Override with env var: DEFERQ_ENGINE__TICK_MS=1000
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// How many times a failing entry is handed to the executor before it is
    /// removed and reported as exhausted.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Whether one tick's due batch fires in global (due, id) order or grouped
    /// per schedule name.
    #[serde(default)]
    pub firing_scope: FiringScope,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            firing_scope: FiringScope::Global,
        }
    }
}

/// Ordering scope for a single due batch.
///
/// The due index is always global; this only affects the order in which one
/// tick's candidates are handed to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FiringScope {
    /// Strict (due time, id) order across all schedules.
    #[default]
    Global,
    /// Candidates grouped by schedule name (names ascending); (due time, id)
    /// order within each schedule.
    PerSchedule,
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}
fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl DeferqConfig {
    /// Load config from a TOML file with DEFERQ_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ./deferq.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or("deferq.toml");

        let config: DeferqConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("DEFERQ_").split("__"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        figment::Jail::expect_with(|_jail| {
            let cfg = DeferqConfig::load(None).unwrap();
            assert_eq!(cfg.engine.tick_ms, DEFAULT_TICK_MS);
            assert_eq!(cfg.engine.max_attempts, DEFAULT_MAX_ATTEMPTS);
            assert_eq!(cfg.engine.firing_scope, FiringScope::Global);
            Ok(())
        });
    }

    #[test]
    fn toml_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "deferq.toml",
                r#"
                [engine]
                tick_ms = 50
                max_attempts = 7
                firing_scope = "per-schedule"
                "#,
            )?;
            let cfg = DeferqConfig::load(None).unwrap();
            assert_eq!(cfg.engine.tick_ms, 50);
            assert_eq!(cfg.engine.max_attempts, 7);
            assert_eq!(cfg.engine.firing_scope, FiringScope::PerSchedule);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("deferq.toml", "[engine]\ntick_ms = 50\n")?;
            jail.set_env("DEFERQ_ENGINE__TICK_MS", "10");
            let cfg = DeferqConfig::load(None).unwrap();
            assert_eq!(cfg.engine.tick_ms, 10);
            Ok(())
        });
    }
}
