use crate::types::element::TimeSignature;

/// Settings fixed for the lifetime of one voice construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceOptions {
    /// Log repeat handling at debug level.
    pub trace_repeats: bool,
    /// Log measure creation and finalization at debug level.
    pub trace_measures: bool,
    /// Log rest measures and measures repeats at debug level.
    pub trace_compressions: bool,
    /// Fold multiple rests into a single rest measures construct.
    pub compress_rest_measures: bool,
    /// Fold repeated measures into a measures repeat construct.
    pub compress_measures_repeats: bool,
    /// Time signature in force until the voice sets its own.
    pub default_time: TimeSignature,
}

impl Default for VoiceOptions {
    fn default() -> Self {
        Self {
            trace_repeats: false,
            trace_measures: false,
            trace_compressions: false,
            compress_rest_measures: true,
            compress_measures_repeats: true,
            default_time: TimeSignature::default(),
        }
    }
}

impl VoiceOptions {
    pub fn with_default_time(mut self, time: TimeSignature) -> Self {
        self.default_time = time;
        self
    }

    pub fn trace_all(mut self) -> Self {
        self.trace_repeats = true;
        self.trace_measures = true;
        self.trace_compressions = true;
        self
    }
}
