use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tracing::Level;

use crate::error::LaunchError;

pub const DEFAULT_SCRIPT: &str = "__main__.py";
pub const DEFAULT_ENTRY_MODULE: &str = "vy.editor";
pub const DEFAULT_ENTRY_ATTR: &str = "_Editor";
pub const DEFAULT_PACKAGE: &str = "vy";

/// Every variable the launcher reads
pub const CONFIG_VARS: [&str; 6] = [
    "VY_LAUNCH",
    "VY_MAIN_SCRIPT",
    "VY_ENTRY_MODULE",
    "VY_ENTRY_ATTR",
    "VY_PACKAGE",
    "VY_LOG",
];

/// How control is handed to the application once the runtime is up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Execute a file as the top-level script
    File { script: PathBuf },
    /// Import `module`, then call `module.attr()()`
    Import { module: String, attr: String },
    /// Run a package's `__main__` module, like `python -m package`
    Package { package: String },
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::File { .. } => "file",
            Strategy::Import { .. } => "import",
            Strategy::Package { .. } => "package",
        }
    }
}

/// Everything the launcher needs to know before bringing the runtime up
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub strategy: Strategy,
    pub log_level: Level,
    /// Program name, becomes `sys.argv[0]` for the import strategy
    pub program: OsString,
    /// Forwarded verbatim to `sys.argv[1:]`, never interpreted here
    pub args: Vec<OsString>,
}

impl LaunchConfig {
    /// Build a config from the parent process environment and argv
    pub fn from_parent() -> Result<Self, LaunchError> {
        let mut argv = std::env::args_os();
        let program = argv.next().unwrap_or_else(|| OsString::from("vy_launcher"));
        let args = argv.collect();

        let vars: HashMap<String, OsString> = CONFIG_VARS
            .iter()
            .filter_map(|key| Some((key.to_string(), std::env::var_os(key)?)))
            .collect();
        let home = home::home_dir().filter(|path| !path.as_os_str().is_empty());

        Self::from_vars(&vars, home.as_deref(), program, args)
    }

    /// Build a config from an explicit variable map
    ///
    /// The arguments are stored for forwarding only: nothing about the
    /// strategy or the paths it uses depends on them.
    pub fn from_vars(
        vars: &HashMap<String, OsString>,
        home: Option<&Path>,
        program: OsString,
        args: Vec<OsString>,
    ) -> Result<Self, LaunchError> {
        let get_os = |key| lookup(vars, key);
        let get = |key| lookup_str(vars, key);

        let strategy = match get("VY_LAUNCH")?.unwrap_or("file") {
            "file" => Strategy::File {
                script: expand_tilde(
                    get_os("VY_MAIN_SCRIPT").unwrap_or(OsStr::new(DEFAULT_SCRIPT)),
                    home,
                ),
            },
            "import" => Strategy::Import {
                module: get("VY_ENTRY_MODULE")?.unwrap_or(DEFAULT_ENTRY_MODULE).to_string(),
                attr: get("VY_ENTRY_ATTR")?.unwrap_or(DEFAULT_ENTRY_ATTR).to_string(),
            },
            "package" => Strategy::Package {
                package: get("VY_PACKAGE")?.unwrap_or(DEFAULT_PACKAGE).to_string(),
            },
            other => {
                return Err(LaunchError::invalid_config(
                    "VY_LAUNCH",
                    other,
                    "file, import, package",
                ));
            }
        };

        let log_level = match get("VY_LOG")? {
            None => Level::WARN,
            Some(value) => parse_level(value).ok_or_else(|| {
                LaunchError::invalid_config("VY_LOG", value, "error, warn, info, debug, trace")
            })?,
        };

        Ok(Self {
            strategy,
            log_level,
            program,
            args,
        })
    }
}

/// Look a variable up, empty values count as unset
fn lookup<'a>(vars: &'a HashMap<String, OsString>, key: &str) -> Option<&'a OsStr> {
    vars.get(key)
        .map(OsString::as_os_str)
        .filter(|value| !value.is_empty())
}

/// Like [`lookup`], for settings that must be Unicode
fn lookup_str<'a>(
    vars: &'a HashMap<String, OsString>,
    key: &'static str,
) -> Result<Option<&'a str>, LaunchError> {
    match lookup(vars, key) {
        None => Ok(None),
        Some(value) => value.to_str().map(Some).ok_or_else(|| {
            LaunchError::invalid_config(key, value.to_string_lossy(), "a Unicode string")
        }),
    }
}

fn parse_level(value: &str) -> Option<Level> {
    match value.to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

/// Expand a leading `~` or `~/` against `home`
///
/// `~user` forms and paths without a home directory are left as-is.
pub fn expand_tilde(path: &OsStr, home: Option<&Path>) -> PathBuf {
    let path = Path::new(path);
    match home {
        Some(home) if path == Path::new("~") => home.to_path_buf(),
        Some(home) => match path.strip_prefix("~") {
            Ok(stripped) => home.join(stripped),
            Err(_) => path.to_path_buf(),
        },
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, OsString> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect()
    }

    fn config(pairs: &[(&str, &str)]) -> Result<LaunchConfig, LaunchError> {
        LaunchConfig::from_vars(&vars(pairs), Some(Path::new("/home/vy")), "vy".into(), vec![])
    }

    #[test]
    fn test_defaults_to_file_strategy() {
        let config = config(&[]).unwrap();
        assert_eq!(
            config.strategy,
            Strategy::File {
                script: PathBuf::from("__main__.py")
            }
        );
        assert_eq!(config.log_level, Level::WARN);
    }

    #[test]
    fn test_import_strategy_defaults() {
        let config = config(&[("VY_LAUNCH", "import")]).unwrap();
        assert_eq!(
            config.strategy,
            Strategy::Import {
                module: "vy.editor".to_string(),
                attr: "_Editor".to_string(),
            }
        );
    }

    #[test]
    fn test_import_strategy_overrides() {
        let config = config(&[
            ("VY_LAUNCH", "import"),
            ("VY_ENTRY_MODULE", "app.main"),
            ("VY_ENTRY_ATTR", "App"),
        ])
        .unwrap();
        assert_eq!(
            config.strategy,
            Strategy::Import {
                module: "app.main".to_string(),
                attr: "App".to_string(),
            }
        );
    }

    #[test]
    fn test_package_strategy() {
        let config = config(&[("VY_LAUNCH", "package"), ("VY_PACKAGE", "other")]).unwrap();
        assert_eq!(
            config.strategy,
            Strategy::Package {
                package: "other".to_string()
            }
        );
        assert_eq!(config.strategy.name(), "package");
    }

    #[test]
    fn test_script_path_is_tilde_expanded() {
        let config = config(&[("VY_MAIN_SCRIPT", "~/src/vy/__main__.py")]).unwrap();
        assert_eq!(
            config.strategy,
            Strategy::File {
                script: PathBuf::from("/home/vy/src/vy/__main__.py")
            }
        );
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let config = config(&[("VY_LAUNCH", ""), ("VY_MAIN_SCRIPT", ""), ("VY_LOG", "")]).unwrap();
        assert_eq!(config.strategy.name(), "file");
        assert_eq!(config.log_level, Level::WARN);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let err = config(&[("VY_LAUNCH", "repl")]).unwrap_err();
        match err {
            LaunchError::InvalidConfig { key, value, .. } => {
                assert_eq!(key, "VY_LAUNCH");
                assert_eq!(value, "repl");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(config(&[("VY_LOG", "DEBUG")]).unwrap().log_level, Level::DEBUG);
        assert!(matches!(
            config(&[("VY_LOG", "loud")]),
            Err(LaunchError::InvalidConfig { key: "VY_LOG", .. })
        ));
    }

    #[test]
    fn test_args_do_not_influence_strategy() {
        let env = vars(&[("VY_LAUNCH", "file")]);
        let bare = LaunchConfig::from_vars(&env, None, "vy".into(), vec![]).unwrap();
        let noisy = LaunchConfig::from_vars(
            &env,
            None,
            "vy".into(),
            vec!["--mode".into(), "import".into(), "other.py".into()],
        )
        .unwrap();
        assert_eq!(bare.strategy, noisy.strategy);
        assert_eq!(bare.log_level, noisy.log_level);
        assert_eq!(noisy.args.len(), 3);
    }

    #[test]
    fn test_expand_tilde() {
        let home = Some(Path::new("/home/vy"));
        let expand = |path: &str, home| expand_tilde(OsStr::new(path), home);
        assert_eq!(expand("~", home), PathBuf::from("/home/vy"));
        assert_eq!(expand("~/a/b.py", home), PathBuf::from("/home/vy/a/b.py"));
        assert_eq!(expand("~other/a.py", home), PathBuf::from("~other/a.py"));
        assert_eq!(expand("rel/a.py", home), PathBuf::from("rel/a.py"));
        assert_eq!(expand("~/a.py", None), PathBuf::from("~/a.py"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_script_path_is_kept() {
        use std::os::unix::ffi::OsStringExt;

        let script = OsString::from_vec(b"dir\xff/main.py".to_vec());
        let mut env = vars(&[]);
        env.insert("VY_MAIN_SCRIPT".to_string(), script.clone());

        let config = LaunchConfig::from_vars(&env, None, "vy".into(), vec![]).unwrap();
        assert_eq!(
            config.strategy,
            Strategy::File {
                script: PathBuf::from(script)
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_setting_is_rejected() {
        use std::os::unix::ffi::OsStringExt;

        let mut env = vars(&[]);
        env.insert(
            "VY_LAUNCH".to_string(),
            OsString::from_vec(b"imp\xffort".to_vec()),
        );
        assert!(matches!(
            LaunchConfig::from_vars(&env, None, "vy".into(), vec![]),
            Err(LaunchError::InvalidConfig { key: "VY_LAUNCH", .. })
        ));

        let mut env = vars(&[("VY_LAUNCH", "import")]);
        env.insert(
            "VY_ENTRY_MODULE".to_string(),
            OsString::from_vec(b"vy.\xfe".to_vec()),
        );
        assert!(matches!(
            LaunchConfig::from_vars(&env, None, "vy".into(), vec![]),
            Err(LaunchError::InvalidConfig { key: "VY_ENTRY_MODULE", .. })
        ));
    }
}
