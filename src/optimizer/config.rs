//! Configuration for the variable optimizer.

/// Default number of slots considered for remapping per method.
pub const DEFAULT_MAX_VARIABLES: u16 = 64;

/// Configuration for the [`VariableOptimizer`](super::VariableOptimizer).
///
/// # Examples
///
/// ```rust
/// use slotopt::optimizer::OptimizerConfig;
///
/// let config = OptimizerConfig::new()
///     .with_receiver_slot_reuse(true)
///     .with_max_variables(128);
/// assert!(config.allow_receiver_slot_reuse);
/// assert_eq!(config.max_variables, 128);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerConfig {
    /// Allow other variables to take over slot 0 of instance methods once
    /// the receiver is dead (default: false).
    ///
    /// Instance initializers never reuse the receiver slot.
    pub allow_receiver_slot_reuse: bool,

    /// Slots at or above this index keep their position (default: 64).
    pub max_variables: u16,

    /// Trim local variable debug entries to the range where their slot is
    /// alive before remapping (default: true).
    pub trim_local_variables: bool,

    /// Log the variable map of every method at debug level (default: false).
    pub debug: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            allow_receiver_slot_reuse: false,
            max_variables: DEFAULT_MAX_VARIABLES,
            trim_local_variables: true,
            debug: false,
        }
    }
}

impl OptimizerConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that considers every slot, including the
    /// receiver slot of instance methods.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            allow_receiver_slot_reuse: true,
            max_variables: u16::MAX,
            ..Self::default()
        }
    }

    /// Sets whether the receiver slot of instance methods may be reused.
    #[must_use]
    pub fn with_receiver_slot_reuse(mut self, allow: bool) -> Self {
        self.allow_receiver_slot_reuse = allow;
        self
    }

    /// Sets the number of slots considered for remapping.
    #[must_use]
    pub fn with_max_variables(mut self, max_variables: u16) -> Self {
        self.max_variables = max_variables;
        self
    }

    /// Sets whether local variable debug entries are trimmed to their live ranges.
    #[must_use]
    pub fn with_local_variable_trimming(mut self, trim: bool) -> Self {
        self.trim_local_variables = trim;
        self
    }

    /// Sets whether variable maps are logged.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
