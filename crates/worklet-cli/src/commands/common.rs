//! Helpers shared by several commands.

use std::path::Path;

use anyhow::Context;
use worklet_config::RuntimeConfig;

/// Load the configuration file if one was given, defaults otherwise.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(RuntimeConfig::default()),
    }
}

/// Peak absolute value of a signal.
pub fn peak(samples: impl IntoIterator<Item = f32>) -> f32 {
    samples.into_iter().fold(0.0_f32, |acc, s| acc.max(s.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_path_gives_defaults() {
        assert_eq!(load_config(None).unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn bad_file_names_the_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("absent.toml"));
    }

    #[test]
    fn peak_of_mixed_signs() {
        assert_eq!(peak([0.25, -0.75, 0.5]), 0.75);
        assert_eq!(peak(std::iter::empty()), 0.0);
    }
}
