use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::error::{BridgeError, Result};

/// Application a clipboard payload is attributed to.
///
/// Two sources are equal when their application names match; the icon path is
/// informational and does not take part in equality or hashing.
#[derive(Debug, Clone, Serialize)]
pub struct ClipboardSource {
    app_name: String,
    icon_path: Option<PathBuf>,
}

impl ClipboardSource {
    pub fn new(app_name: impl Into<String>) -> Result<Self> {
        let app_name = app_name.into();
        if app_name.is_empty() {
            return Err(BridgeError::InvalidArgument(
                "source application name cannot be empty".to_string(),
            ));
        }
        Ok(Self { app_name, icon_path: None })
    }

    pub fn with_icon_path(mut self, icon_path: impl Into<PathBuf>) -> Self {
        self.icon_path = Some(icon_path.into());
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn icon_path(&self) -> Option<&Path> {
        self.icon_path.as_deref()
    }
}

impl PartialEq for ClipboardSource {
    fn eq(&self, other: &Self) -> bool {
        self.app_name == other.app_name
    }
}

impl Eq for ClipboardSource {}

impl Hash for ClipboardSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.app_name.hash(state);
    }
}

impl fmt::Display for ClipboardSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.app_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;

    fn hash_of(source: &ClipboardSource) -> u64 {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn rejects_empty_name() {
        assert!(matches!(
            ClipboardSource::new(""),
            Err(BridgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn icon_path_is_optional() {
        let plain = ClipboardSource::new("notepad").unwrap();
        assert_eq!(plain.icon_path(), None);
        assert_eq!(plain.to_string(), "notepad");

        let with_icon = plain.clone().with_icon_path("C:/Windows/notepad.exe");
        assert_eq!(with_icon.icon_path(), Some(Path::new("C:/Windows/notepad.exe")));
    }

    #[test]
    fn same_app_collapses_in_a_set() {
        let mut set = HashSet::new();
        set.insert(ClipboardSource::new("code").unwrap().with_icon_path("/usr/bin/code"));
        set.insert(ClipboardSource::new("code").unwrap());
        set.insert(ClipboardSource::new("firefox").unwrap());
        assert_eq!(set.len(), 2);
    }

    proptest! {
        #[test]
        fn equality_ignores_icon_path(
            name in "[a-zA-Z0-9_.-]{1,24}",
            left in proptest::option::of("[a-z/]{1,32}"),
            right in proptest::option::of("[a-z/]{1,32}"),
        ) {
            let mut a = ClipboardSource::new(name.clone()).unwrap();
            if let Some(path) = left {
                a = a.with_icon_path(path);
            }
            let mut b = ClipboardSource::new(name).unwrap();
            if let Some(path) = right {
                b = b.with_icon_path(path);
            }
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(hash_of(&a), hash_of(&b));
        }
    }
}
