use serde::{Deserialize, Serialize};

use crate::vm::stack::MAX_STACK_SIZE;

/// Scheduler settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    /// Main-stream opcode budget per tick.
    pub instructions_per_update: usize,
    /// Reject NaN and Infinity on push.
    pub enable_safe_mode: bool,
    /// Print timing totals when a program ends.
    pub show_statistics: bool,
    pub max_stack_depth: usize,
    pub stack_dump_lines: usize,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            instructions_per_update: 100,
            enable_safe_mode: true,
            show_statistics: false,
            max_stack_depth: MAX_STACK_SIZE,
            stack_dump_lines: 15,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring {key}={raw}: not a valid value");
            None
        }
    }
}

impl CpuConfig {
    pub fn with_instructions_per_update(mut self, n: usize) -> Self {
        self.instructions_per_update = n;
        self
    }

    pub fn with_safe_mode(mut self, enabled: bool) -> Self {
        self.enable_safe_mode = enabled;
        self
    }

    pub fn with_statistics(mut self, enabled: bool) -> Self {
        self.show_statistics = enabled;
        self
    }

    pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }

    pub fn with_stack_dump_lines(mut self, lines: usize) -> Self {
        self.stack_dump_lines = lines;
        self
    }

    /// Apply `KOS_INSTRUCTIONS_PER_UPDATE`, `KOS_SAFE_MODE` and `KOS_SHOW_STATISTICS`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(n) = env_parse("KOS_INSTRUCTIONS_PER_UPDATE") {
            self.instructions_per_update = n;
        }
        if let Some(b) = env_parse("KOS_SAFE_MODE") {
            self.enable_safe_mode = b;
        }
        if let Some(b) = env_parse("KOS_SHOW_STATISTICS") {
            self.show_statistics = b;
        }
        self
    }
}

/// `app_level_filter` applies to the kos crates, `level_filter` to everything else.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub app_level_filter: log::LevelFilter,
    pub level_filter: log::LevelFilter,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self { app_level_filter: log::LevelFilter::Info, level_filter: log::LevelFilter::Warn }
    }
}
