/// Errors when registering or retrieving a configuration override
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An override with this name is already registered
    #[error("A config override named '{0}' is already registered")]
    AlreadyRegistered(String),
    /// The override exists but holds a different type
    #[error("Config override '{name}' holds '{actual_type}', not '{required_type}'")]
    TypeMismatch {
        name: String,
        required_type: &'static str,
        actual_type: &'static str,
    },
}
