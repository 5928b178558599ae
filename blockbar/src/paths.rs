use std::path::PathBuf;

const CONFIG_FILE: &str = "blockbar/config.toml";

/// Get the default configuration file path
///
/// Priority order:
/// 1. $XDG_CONFIG_HOME/blockbar/config.toml
/// 2. $HOME/.config/blockbar/config.toml
/// 3. <home directory>/.config/blockbar/config.toml
pub fn default_config_path() -> Option<PathBuf> {
    config_path_from(
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
        dirs_next::home_dir(),
    )
}

fn config_path_from(
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    home_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    let non_empty = |path: &PathBuf| !path.as_os_str().is_empty();

    if let Some(config_home) = xdg_config_home.filter(non_empty) {
        return Some(config_home.join(CONFIG_FILE));
    }
    home.filter(non_empty)
        .or(home_dir)
        .map(|home| home.join(".config").join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_priority() {
        let xdg = Some(PathBuf::from("/xdg"));
        let home = Some(PathBuf::from("/home/me"));
        let fallback = Some(PathBuf::from("/home/fallback"));

        assert_eq!(
            config_path_from(xdg, home.clone(), fallback.clone()),
            Some(PathBuf::from("/xdg/blockbar/config.toml"))
        );
        assert_eq!(
            config_path_from(Some(PathBuf::new()), home, fallback.clone()),
            Some(PathBuf::from("/home/me/.config/blockbar/config.toml"))
        );
        assert_eq!(
            config_path_from(None, None, fallback),
            Some(PathBuf::from("/home/fallback/.config/blockbar/config.toml"))
        );
        assert_eq!(config_path_from(None, None, None), None);
    }
}
