/// Knobs for one compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Function to transform; found by scanning for blocking calls when absent
    pub function: Option<String>,
    /// Name of the persistent record type, `<function>_state_t` by default
    pub type_name: Option<String>,
    /// Header include guard, derived from the type name by default
    pub guard: Option<String>,
    /// Opaque parameter the record arrives through; appended when missing
    pub state_param: String,
    /// Status returned when the function suspends
    pub waiting_status: String,
    /// Status returned when the dispatch sees an unknown resume point
    pub failure_status: String,
    /// Emit `//#line N` comments after generated code
    pub line_markers: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            function: None,
            type_name: None,
            guard: None,
            state_param: "plugin_state".to_string(),
            waiting_status: "PLUGIN_WAITING".to_string(),
            failure_status: "PLUGIN_ERROR".to_string(),
            line_markers: false,
        }
    }
}

impl Options {
    pub fn record_type(&self, function: &str) -> String {
        self.type_name
            .clone()
            .unwrap_or_else(|| format!("{}_state_t", function))
    }

    pub fn include_guard(&self, type_name: &str) -> String {
        self.guard
            .clone()
            .unwrap_or_else(|| crate::emit::header::default_guard(type_name))
    }
}
