//! User-facing strings for nanobot-boot
//!
//! Kept together so the console output of the bootstrap can be reviewed in one place.

/// Printed before the config dump (`NANOBOT_PRINT_CONFIG=1`)
pub const PRINT_CONFIG_BANNER: &str = "⚠️  NANOBOT_PRINT_CONFIG=1: printing the runtime configuration, including API keys and bot tokens. Do not leave this enabled in production.";
pub const DUMP_PATH: &str = "  Path:     {}";
pub const DUMP_SIZE: &str = "  Size:     {} bytes";
pub const DUMP_MODE: &str = "  Mode:     {}";
pub const DUMP_MODIFIED: &str = "  Modified: {}";

/// `provider` subcommand output
pub const PROVIDER_RESOLVED: &str = "Provider: {}";
pub const PROVIDER_BASE: &str = "API base: {}";
pub const PROVIDER_KEY: &str = "API key:  {}";
pub const PROVIDER_NONE: &str = "No provider has an API key for model '{}'";
pub const PROVIDER_MODEL: &str = "Model:    {}";

/// Helper function for single argument formatting
pub fn format_string(template: &str, arg: &dyn std::fmt::Display) -> String {
    template.replace("{}", &arg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_string() {
        assert_eq!(format_string(DUMP_SIZE, &42), "  Size:     42 bytes");
        assert_eq!(format_string(PROVIDER_RESOLVED, &"together"), "Provider: together");
    }
}
