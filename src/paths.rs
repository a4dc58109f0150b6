//! XDG-style configuration paths.

use std::path::PathBuf;

const APP_DIR: &str = "polytl";

/// Returns the configuration directory.
///
/// `$XDG_CONFIG_HOME/polytl` when `XDG_CONFIG_HOME` is set and non-empty,
/// `~/.config/polytl` otherwise, and the platform config directory as a
/// last resort when there is no home directory.
pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return PathBuf::from(xdg).join(APP_DIR);
    }
    dirs::home_dir()
        .map(|home| home.join(".config"))
        .or_else(dirs::config_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Returns the path of the configuration file.
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn with_xdg<F: FnOnce()>(value: Option<&str>, f: F) {
        let original = std::env::var_os("XDG_CONFIG_HOME");
        match value {
            Some(v) => unsafe { std::env::set_var("XDG_CONFIG_HOME", v) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }
        f();
        match original {
            Some(v) => unsafe { std::env::set_var("XDG_CONFIG_HOME", v) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }
    }

    #[test]
    #[serial]
    fn test_config_dir_default() {
        with_xdg(None, || {
            assert!(config_dir().ends_with(".config/polytl"));
        });
    }

    #[test]
    #[serial]
    fn test_config_dir_xdg_override() {
        with_xdg(Some("/custom/config"), || {
            assert_eq!(config_dir(), PathBuf::from("/custom/config/polytl"));
            assert_eq!(
                config_file(),
                PathBuf::from("/custom/config/polytl/config.toml")
            );
        });
    }

    #[test]
    #[serial]
    fn test_empty_xdg_is_ignored() {
        with_xdg(Some(""), || {
            assert!(config_dir().ends_with(".config/polytl"));
        });
    }
}
