//! `name=value` command-line settings of the demo.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// Argument without `=`.
    Malformed(String),
    UnknownName(String),
    InvalidValue { name: String, value: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Malformed(arg) => write!(f, "expected name=value, got {:?}", arg),
            SettingsError::UnknownName(name) => write!(f, "unknown setting {:?}", name),
            SettingsError::InvalidValue { name, value } => {
                write!(f, "invalid value {:?} for setting {:?}", value, name)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub resizable: bool,
    pub vsync: bool,
    pub verbose: bool,
    pub showinfo: bool,
    /// Extra OBJ mesh to add to the scene.
    pub mesh: Option<PathBuf>,
    /// Directory holding shadow-volume cache files.
    pub cache: PathBuf,
    /// Optional log file next to the console output.
    pub logfile: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fullscreen: false,
            resizable: true,
            vsync: true,
            verbose: false,
            showinfo: false,
            mesh: None,
            cache: PathBuf::from("cache"),
            logfile: None,
        }
    }
}

impl Settings {
    /// Parses arguments such as `width=800 vsync=0`. Later values win.
    pub fn parse<I, S>(args: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut settings = Settings::default();
        for arg in args {
            let arg = arg.as_ref();
            let (name, value) = arg
                .split_once('=')
                .ok_or_else(|| SettingsError::Malformed(arg.to_string()))?;
            settings.set(name.trim(), value.trim())?;
        }
        Ok(settings)
    }

    pub fn set(&mut self, name: &str, value: &str) -> Result<(), SettingsError> {
        match name {
            "width" => self.width = parse_dimension(name, value)?,
            "height" => self.height = parse_dimension(name, value)?,
            "fullscreen" => self.fullscreen = parse_bool(name, value)?,
            "resizable" => self.resizable = parse_bool(name, value)?,
            "vsync" => self.vsync = parse_bool(name, value)?,
            "verbose" => self.verbose = parse_bool(name, value)?,
            "showinfo" => self.showinfo = parse_bool(name, value)?,
            "mesh" => self.mesh = non_empty(value).map(PathBuf::from),
            "cache" => {
                self.cache = non_empty(value)
                    .map(PathBuf::from)
                    .ok_or_else(|| invalid(name, value))?
            }
            "logfile" => self.logfile = non_empty(value).map(PathBuf::from),
            _ => return Err(SettingsError::UnknownName(name.to_string())),
        }
        Ok(())
    }
}

fn invalid(name: &str, value: &str) -> SettingsError {
    SettingsError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value).filter(|v| !v.is_empty())
}

fn parse_bool(name: &str, value: &str) -> Result<bool, SettingsError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

fn parse_dimension(name: &str, value: &str) -> Result<u32, SettingsError> {
    match value.parse::<u32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(invalid(name, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::parse(Vec::<String>::new()).unwrap();
        assert_eq!((s.width, s.height), (1280, 720));
        assert!(!s.fullscreen && s.resizable && s.vsync && !s.verbose && !s.showinfo);
        assert_eq!(s.cache, PathBuf::from("cache"));
    }

    #[test]
    fn parses_values() {
        let s = Settings::parse(["width=800", "height=600", "vsync=false", "verbose=1", "mesh=teapot.obj"]).unwrap();
        assert_eq!((s.width, s.height), (800, 600));
        assert!(!s.vsync);
        assert!(s.verbose);
        assert_eq!(s.mesh, Some(PathBuf::from("teapot.obj")));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            Settings::parse(["colour=red"]),
            Err(SettingsError::UnknownName("colour".into()))
        );
        assert!(matches!(
            Settings::parse(["vsync=maybe"]),
            Err(SettingsError::InvalidValue { .. })
        ));
        assert!(matches!(Settings::parse(["width=0"]), Err(SettingsError::InvalidValue { .. })));
        assert!(matches!(Settings::parse(["--width"]), Err(SettingsError::Malformed(_))));
    }
}
