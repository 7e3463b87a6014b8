//! Module library: what an `import` message resolves to.
//!
//! The processing thread never loads code at runtime. Instead, a host builds a
//! [`ModuleLibrary`] up front, mapping script paths to *module scripts*. A
//! script is a function that yields the modules it defines, in the order it
//! would have registered them. `import` looks the resolved URL up here and
//! registers whatever the script yields.

use std::fmt;

use crate::ModuleDescriptor;
use crate::modules::{bypass_module, gain_module};

/// Path of the built-in gain script.
pub const GAIN_SCRIPT: &str = "modules/gain.js";

/// Path of the built-in bypass script.
pub const BYPASS_SCRIPT: &str = "modules/bypass.js";

/// A script entry point: returns the modules it defines, in registration order.
pub type ModuleScript = Box<dyn Fn() -> Vec<ModuleDescriptor> + Send>;

/// Resolve an import URL against the session origin.
///
/// URLs starting with `http` are absolute and returned unchanged; anything else
/// is appended to `origin`.
///
/// ```rust
/// use worklet_registry::resolve_url;
///
/// assert_eq!(resolve_url("https://host/", "modules/gain.js"), "https://host/modules/gain.js");
/// assert_eq!(resolve_url("https://host/", "http://cdn/x.js"), "http://cdn/x.js");
/// ```
pub fn resolve_url(origin: &str, url: &str) -> String {
    if url.starts_with("http") {
        url.to_string()
    } else {
        format!("{origin}{url}")
    }
}

/// Script paths mapped to module scripts.
#[derive(Default)]
pub struct ModuleLibrary {
    scripts: Vec<(String, ModuleScript)>,
}

impl ModuleLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self {
            scripts: Vec::new(),
        }
    }

    /// Library holding the built-in scripts ([`GAIN_SCRIPT`], [`BYPASS_SCRIPT`]).
    pub fn builtin() -> Self {
        Self::new()
            .with_script(GAIN_SCRIPT, || vec![gain_module()])
            .with_script(BYPASS_SCRIPT, || vec![bypass_module()])
    }

    /// Add a script under `path`, replacing any previous script at that path.
    pub fn add<F>(&mut self, path: impl Into<String>, script: F) -> &mut Self
    where
        F: Fn() -> Vec<ModuleDescriptor> + Send + 'static,
    {
        let path = path.into();
        self.scripts.retain(|(p, _)| *p != path);
        self.scripts.push((path, Box::new(script)));
        self
    }

    /// Builder form of [`add`](Self::add).
    pub fn with_script<F>(mut self, path: impl Into<String>, script: F) -> Self
    where
        F: Fn() -> Vec<ModuleDescriptor> + Send + 'static,
    {
        self.add(path, script);
        self
    }

    /// Find the script for a resolved URL.
    ///
    /// An exact path match wins; otherwise a script matches when the URL ends
    /// with `/` followed by its path.
    pub fn lookup(&self, resolved_url: &str) -> Option<&ModuleScript> {
        self.scripts
            .iter()
            .find(|(p, _)| p == resolved_url)
            .or_else(|| {
                self.scripts.iter().find(|(p, _)| {
                    resolved_url
                        .strip_suffix(p.as_str())
                        .is_some_and(|head| head.ends_with('/'))
                })
            })
            .map(|(_, script)| script)
    }

    /// Script paths, in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.scripts.iter().map(|(p, _)| p.as_str())
    }

    /// Returns the number of scripts.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Returns true if the library is empty.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

impl fmt::Debug for ModuleLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.paths()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_urls_join_origin() {
        assert_eq!(resolve_url("", "modules/gain.js"), "modules/gain.js");
        assert_eq!(resolve_url("http://a/", "b.js"), "http://a/b.js");
    }

    #[test]
    fn absolute_urls_pass_through() {
        assert_eq!(resolve_url("http://a/", "https://b/c.js"), "https://b/c.js");
    }

    #[test]
    fn builtin_library_has_both_scripts() {
        let lib = ModuleLibrary::builtin();
        assert_eq!(lib.len(), 2);
        let names: Vec<String> = lib
            .lookup(GAIN_SCRIPT)
            .map(|s| s().iter().map(|d| d.name().to_string()).collect())
            .unwrap();
        assert_eq!(names, vec!["Gain"]);
    }

    #[test]
    fn lookup_matches_on_path_boundary() {
        let lib = ModuleLibrary::builtin();
        assert!(lib.lookup("https://host/app/modules/gain.js").is_some());
        assert!(lib.lookup("https://host/app/xmodules/gain.js").is_none());
        assert!(lib.lookup("modules/missing.js").is_none());
    }

    #[test]
    fn add_replaces_existing_path() {
        let mut lib = ModuleLibrary::new();
        lib.add("a.js", Vec::new);
        lib.add("a.js", || vec![gain_module()]);
        assert_eq!(lib.len(), 1);
        assert_eq!(lib.lookup("a.js").map(|s| s().len()), Some(1));
    }
}
