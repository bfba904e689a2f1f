//! Error taxonomy for height-field edits.
//!
//! Range problems coming from user entry (scales, brush sizes, brush index)
//! are clamped where they are assigned and never show up here. What remains
//! are contract violations between components: a bad field size, a patch
//! that does not fit, or a configuration that cannot describe a terrain.

/// Errors raised by the carve engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CarveError {
    #[error("invalid height field dimensions {width}x{depth}")]
    InvalidDimensions { width: i32, depth: i32 },

    #[error("cell ({x}, {z}) is outside the {width}x{depth} height field")]
    OutOfBounds {
        x: i32,
        z: i32,
        width: i32,
        depth: i32,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CarveError {
    pub fn config<T: ToString>(msg: T) -> Self {
        CarveError::InvalidConfig(msg.to_string())
    }

    /// True for errors that only abort the current paint call.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CarveError::OutOfBounds { .. })
    }
}

pub type CarveResult<T> = Result<T, CarveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CarveError::OutOfBounds {
            x: -1,
            z: 3,
            width: 10,
            depth: 10,
        };
        assert_eq!(
            err.to_string(),
            "cell (-1, 3) is outside the 10x10 height field"
        );
        assert!(err.is_recoverable());

        let err = CarveError::InvalidDimensions { width: 0, depth: 4 };
        assert_eq!(err.to_string(), "invalid height field dimensions 0x4");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_config_constructor() {
        let err = CarveError::config("tile size must be positive");
        assert_eq!(
            err,
            CarveError::InvalidConfig("tile size must be positive".into())
        );
    }
}
