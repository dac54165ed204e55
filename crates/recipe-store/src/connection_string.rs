//! Connection strings
//!
//! `key=value;` pairs naming the store and how to open it:
//!
//! ```text
//! Data Source=recipes.db;Mode=ReadWriteCreate;Foreign Keys=True;Default Timeout=30
//! Data Source=RecipeTests;Mode=Memory;Cache=Shared
//! ```
//!
//! Keys are case-insensitive and may be written with or without the inner
//! space. Unknown keys are rejected. The password never appears in
//! `Display` or `Debug` output.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use recipe_core::errors::ExError;
use recipe_core_types::Sensitive;
use rusqlite::OpenFlags;
use serde::Deserialize;

use crate::errors::config_error;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const PRIVATE_MEMORY: &str = ":memory:";

/// How the store file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadWriteCreate,
    ReadWrite,
    ReadOnly,
    Memory,
}

/// Whether connections share one page cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Private,
    Shared,
}

/// Parsed connection string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct ConnectionString {
    data_source: Option<String>,
    mode: OpenMode,
    cache: CacheMode,
    foreign_keys: bool,
    default_timeout: Duration,
    password: Option<Sensitive<String>>,
}

impl ConnectionString {
    fn with_defaults(data_source: Option<String>, mode: OpenMode) -> Self {
        Self {
            data_source,
            mode,
            cache: CacheMode::Private,
            foreign_keys: true,
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            password: None,
        }
    }

    /// File-backed store, created on first open
    pub fn file(path: impl Into<String>) -> Self {
        Self::with_defaults(Some(path.into()), OpenMode::ReadWriteCreate)
    }

    /// Private in-memory store, gone when the connection closes
    pub fn memory() -> Self {
        Self::with_defaults(None, OpenMode::Memory)
    }

    /// Named in-memory store shared by every connection in the process
    /// that uses the same name
    pub fn shared_memory(name: impl Into<String>) -> Self {
        let mut cs = Self::with_defaults(Some(name.into()), OpenMode::Memory);
        cs.cache = CacheMode::Shared;
        cs
    }

    pub fn with_mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Sensitive::new(password.into()));
        self
    }

    pub fn data_source(&self) -> Option<&str> {
        self.data_source.as_deref()
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn cache(&self) -> CacheMode {
        self.cache
    }

    pub fn foreign_keys(&self) -> bool {
        self.foreign_keys
    }

    /// How long a statement waits on a locked store before failing as busy
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn password(&self) -> Option<&Sensitive<String>> {
        self.password.as_ref()
    }

    pub fn is_memory(&self) -> bool {
        self.mode == OpenMode::Memory
    }

    pub fn is_read_only(&self) -> bool {
        self.mode == OpenMode::ReadOnly
    }

    /// Path (or URI) and flags to hand to `Connection::open_with_flags`
    pub fn open_target(&self) -> (String, OpenFlags) {
        let base = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let cache_flag = match self.cache {
            CacheMode::Shared => OpenFlags::SQLITE_OPEN_SHARED_CACHE,
            CacheMode::Private => OpenFlags::SQLITE_OPEN_PRIVATE_CACHE,
        };
        let rw_create = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;

        match self.mode {
            OpenMode::Memory => {
                let name = self
                    .data_source
                    .as_deref()
                    .filter(|n| !n.is_empty() && *n != PRIVATE_MEMORY);
                match (name, self.cache) {
                    (Some(name), CacheMode::Shared) => (
                        format!("file:{}?mode=memory&cache=shared", name),
                        base | rw_create,
                    ),
                    (Some(name), CacheMode::Private) => {
                        (format!("file:{}?mode=memory", name), base | rw_create)
                    }
                    (None, _) => (PRIVATE_MEMORY.to_string(), base | rw_create),
                }
            }
            OpenMode::ReadWriteCreate => (self.path(), base | cache_flag | rw_create),
            OpenMode::ReadWrite => (
                self.path(),
                base | cache_flag | OpenFlags::SQLITE_OPEN_READ_WRITE,
            ),
            OpenMode::ReadOnly => (
                self.path(),
                base | cache_flag | OpenFlags::SQLITE_OPEN_READ_ONLY,
            ),
        }
    }

    fn path(&self) -> String {
        self.data_source.clone().unwrap_or_default()
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ExError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(config_error(format!(
            "'{}' expects True or False, got '{}'",
            key, value
        ))),
    }
}

impl FromStr for ConnectionString {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cs = Self::with_defaults(None, OpenMode::ReadWriteCreate);

        for pair in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = pair
                .split_once('=')
                .ok_or_else(|| config_error(format!("'{}' is not a key=value pair", pair)))?;
            let key = raw_key.trim();
            let value = raw_value.trim();

            match normalize_key(key).as_str() {
                "datasource" | "filename" => cs.data_source = Some(value.to_string()),
                "mode" => {
                    cs.mode = match value.to_ascii_lowercase().as_str() {
                        "readwritecreate" => OpenMode::ReadWriteCreate,
                        "readwrite" => OpenMode::ReadWrite,
                        "readonly" => OpenMode::ReadOnly,
                        "memory" => OpenMode::Memory,
                        _ => return Err(config_error(format!("unknown Mode '{}'", value))),
                    }
                }
                "cache" => {
                    cs.cache = match value.to_ascii_lowercase().as_str() {
                        "private" | "default" => CacheMode::Private,
                        "shared" => CacheMode::Shared,
                        _ => return Err(config_error(format!("unknown Cache '{}'", value))),
                    }
                }
                "foreignkeys" => cs.foreign_keys = parse_bool(key, value)?,
                "defaulttimeout" => {
                    let secs: u64 = value.parse().map_err(|_| {
                        config_error(format!("Default Timeout must be seconds, got '{}'", value))
                    })?;
                    cs.default_timeout = Duration::from_secs(secs);
                }
                "password" => cs.password = Some(Sensitive::new(value.to_string())),
                _ => {
                    return Err(config_error(format!(
                        "unknown connection string keyword '{}'",
                        key
                    )))
                }
            }
        }

        if cs.mode != OpenMode::Memory
            && cs.data_source.as_deref().map_or(true, |d| d.is_empty())
        {
            return Err(config_error("connection string has no Data Source"));
        }

        Ok(cs)
    }
}

impl TryFrom<String> for ConnectionString {
    type Error = ExError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.data_source {
            write!(f, "Data Source={};", source)?;
        }
        write!(f, "Mode={:?};", self.mode)?;
        if self.cache == CacheMode::Shared {
            write!(f, "Cache=Shared;")?;
        }
        write!(
            f,
            "Foreign Keys={};Default Timeout={}",
            if self.foreign_keys { "True" } else { "False" },
            self.default_timeout.as_secs()
        )?;
        if let Some(password) = &self.password {
            write!(f, ";Password={}", password)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_store() {
        let cs: ConnectionString = "Data Source=recipes.db;Mode=ReadWrite;Default Timeout=5"
            .parse()
            .unwrap();
        assert_eq!(cs.data_source(), Some("recipes.db"));
        assert_eq!(cs.mode(), OpenMode::ReadWrite);
        assert_eq!(cs.default_timeout(), Duration::from_secs(5));
        assert!(cs.foreign_keys());
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let cs: ConnectionString = "DATA SOURCE=a.db;foreign keys=false;DefaultTimeout=1"
            .parse()
            .unwrap();
        assert_eq!(cs.data_source(), Some("a.db"));
        assert!(!cs.foreign_keys());
        assert_eq!(cs.default_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = "Data Source=a.db;Pooling=True"
            .parse::<ConnectionString>()
            .unwrap_err();
        assert!(err.message().contains("Pooling"));
    }

    #[test]
    fn test_file_mode_requires_data_source() {
        assert!("Mode=ReadWrite".parse::<ConnectionString>().is_err());
        assert!("".parse::<ConnectionString>().is_err());
    }

    #[test]
    fn test_shared_memory_target() {
        let cs: ConnectionString = "Data Source=RecipeTests;Mode=Memory;Cache=Shared"
            .parse()
            .unwrap();
        let (path, flags) = cs.open_target();
        assert_eq!(path, "file:RecipeTests?mode=memory&cache=shared");
        assert!(flags.contains(OpenFlags::SQLITE_OPEN_URI));
    }

    #[test]
    fn test_private_memory_target() {
        let (path, _) = ConnectionString::memory().open_target();
        assert_eq!(path, ":memory:");
    }

    #[test]
    fn test_password_redacted() {
        let cs: ConnectionString = "Data Source=a.db;Password=hunter2".parse().unwrap();
        assert_eq!(cs.password().map(|p| p.expose().as_str()), Some("hunter2"));
        assert!(!cs.to_string().contains("hunter2"));
        assert!(!format!("{:?}", cs).contains("hunter2"));

        let built = ConnectionString::file("a.db").with_password("hunter2");
        assert_eq!(built.password(), cs.password());
    }

    #[test]
    fn test_display_reparses() {
        let cs = ConnectionString::shared_memory("Demo");
        let reparsed: ConnectionString = cs.to_string().parse().unwrap();
        assert_eq!(reparsed, cs);
    }
}
