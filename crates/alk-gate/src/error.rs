/// Errors that can occur while configuring the gate.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The busy timeout is outside the accepted range.
    #[error("busy timeout must be in 1..={max} ms, got {value}")]
    TimeoutOutOfBounds { value: u64, max: u64 },

    /// Configuration is otherwise invalid.
    #[error("configuration error: {0}")]
    Config(String),
}
