//! Protocol constants.

/// Wire-level protocol configuration.
pub struct ProtocolConfig;

impl ProtocolConfig {
    /// String written in place of a function inside encoded arguments.
    pub const FUNCTION_PLACEHOLDER: &'static str = "[Function]";
    /// Separator between path segments in callback map keys.
    pub const PATH_SEPARATOR: char = '.';
    /// Escape character for separators appearing inside object keys.
    pub const PATH_ESCAPE: char = '\\';
    /// Maximum accepted frame size for stream transports.
    pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024; // 16MB
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator_and_escape_differ() {
        assert_ne!(ProtocolConfig::PATH_SEPARATOR, ProtocolConfig::PATH_ESCAPE);
        assert!(ProtocolConfig::MAX_MESSAGE_SIZE > 0);
    }
}
