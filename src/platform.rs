use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Linux,
    Windows,
    Unknown,
}

pub fn detect() -> Platform {
    match std::env::consts::OS {
        "macos" => Platform::MacOS,
        "linux" => Platform::Linux,
        "windows" => Platform::Windows,
        _ => Platform::Unknown,
    }
}

pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// Where the vanilla launcher keeps worlds on this platform.
pub fn default_saves_root(platform: Platform) -> Option<PathBuf> {
    match platform {
        Platform::Windows => std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .or_else(|| home_dir().map(|h| h.join("AppData").join("Roaming")))
            .map(|appdata| appdata.join(".minecraft").join("saves")),
        Platform::MacOS => {
            home_dir().map(|h| h.join("Library/Application Support/minecraft/saves"))
        }
        Platform::Linux | Platform::Unknown => home_dir().map(|h| h.join(".minecraft/saves")),
    }
}

/// World directories directly under `root`, sorted by name.
pub fn list_worlds(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };

    let mut worlds: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    worlds.sort();
    worlds
}

/// Picks the default-named world with the highest counter:
/// `New World`, `New World (1)`, `New World (2)`, ...
pub fn latest_world(root: &Path) -> Option<PathBuf> {
    list_worlds(root)
        .into_iter()
        .filter_map(|path| {
            let index = path.file_name()?.to_str().and_then(new_world_index)?;
            Some((index, path))
        })
        .max_by_key(|(index, _)| *index)
        .map(|(_, path)| path)
}

fn new_world_index(name: &str) -> Option<u32> {
    let rest = name.strip_prefix("New World")?;
    if rest.is_empty() {
        return Some(0);
    }
    rest.strip_prefix(" (")?.strip_suffix(')')?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_world_names() {
        assert_eq!(new_world_index("New World"), Some(0));
        assert_eq!(new_world_index("New World (7)"), Some(7));
        assert_eq!(new_world_index("New World (x)"), None);
        assert_eq!(new_world_index("New World copy"), None);
        assert_eq!(new_world_index("Creative"), None);
    }

    #[test]
    fn latest_world_prefers_highest_counter() {
        let root = TempDir::new().unwrap();
        let names = [
            "New World",
            "New World (2)",
            "New World (10)",
            "Zoo",
            "New World (3) backup",
        ];
        for name in names {
            std::fs::create_dir(root.path().join(name)).unwrap();
        }
        std::fs::write(root.path().join("New World (99)"), "not a dir").unwrap();

        let latest = latest_world(root.path()).unwrap();
        assert_eq!(latest.file_name().unwrap(), "New World (10)");
    }

    #[test]
    fn latest_world_missing_root() {
        let root = TempDir::new().unwrap();
        assert!(latest_world(&root.path().join("saves")).is_none());
    }
}
