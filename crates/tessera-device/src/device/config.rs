use std::path::PathBuf;

/// Device construction parameters.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Bytes reserved for each vertex-format arena before the first upload.
    ///
    /// Arenas grow on demand; this only sets the starting point.
    pub initial_arena_capacity: usize,

    /// Forward backend diagnostics to [`debug_log_path`](Self::debug_log_path).
    pub debug_output: bool,

    pub debug_log_path: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            initial_arena_capacity: 16 * 1024 * 1024,
            debug_output: cfg!(debug_assertions),
            debug_log_path: PathBuf::from("render-debug.log"),
        }
    }
}
