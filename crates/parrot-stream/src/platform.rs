use std::path::Path;

const CPUINFO_PATH: &str = "/proc/cpuinfo";

// ARM "CPU part" codes of boards that need extra start-up buffering
const CORTEX_A53: &str = "0xd03";
const CORTEX_A57: &str = "0xd07";
const CORTEX_A72: &str = "0xd08";
const CORTEX_A76: &str = "0xd0b";

/// Buffering hints for the machine the speaker runs on.
///
/// Computed once, outside the speaker, and passed in at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Non-empty chunks the worker holds back at the start of each session
    /// before releasing audio to playback.
    pub extra_startup_wait_blocks: u32,
}

impl PlatformConfig {
    /// Detect from `/proc/cpuinfo`. Falls back to no extra buffering.
    pub fn detect() -> Self {
        Self::from_cpuinfo_file(CPUINFO_PATH)
    }

    pub fn from_cpuinfo_file(path: impl AsRef<Path>) -> Self {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(cpuinfo) => Self::from_cpuinfo(&cpuinfo),
            Err(error) => {
                log::debug!("Cannot read {}: {}", path.as_ref().display(), error);
                Self::default()
            }
        }
    }

    /// Raspberry Pi (Cortex-A53/A72/A76) and Jetson (Cortex-A57) boards get
    /// one extra block, everything else none.
    pub fn from_cpuinfo(cpuinfo: &str) -> Self {
        let part = cpuinfo
            .lines()
            .find(|line| line.starts_with("CPU part"))
            .and_then(|line| line.split_whitespace().last())
            .map(str::to_ascii_lowercase);

        let extra_startup_wait_blocks = match part.as_deref() {
            Some(CORTEX_A53 | CORTEX_A57 | CORTEX_A72 | CORTEX_A76) => 1,
            _ => 0,
        };
        Self {
            extra_startup_wait_blocks,
        }
    }
}
