//! Configuration access port.
//!
//! Sections and keys are looked up case-insensitively by the INI adapter.

pub trait ConfigPort {
    /// Raw value, `None` when the section or key is absent. Typed parsing and
    /// range checks live in `domain::config_validation`.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
