//! Configuration access port trait.
//!
//! Values are returned raw; parsing and defaults live in
//! `domain::config_validation`.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
