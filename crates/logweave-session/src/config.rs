use logweave_frame::LineConfig;

/// Default number of lines buffered in each global channel.
pub const DEFAULT_GLOBAL_CAPACITY: usize = 256;

/// Buffering and limits for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Limits for per-source line channels.
    pub line: LineConfig,
    /// Lines buffered in each of the two global channels.
    pub global_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            line: LineConfig::default(),
            global_capacity: DEFAULT_GLOBAL_CAPACITY,
        }
    }
}
