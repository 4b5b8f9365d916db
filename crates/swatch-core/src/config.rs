//! Settings - 設定の読み込み
//!
//! 読み込み順（後勝ち）:
//! 1. 組み込みのデフォルト
//! 2. `config/swatch.{toml,json,...}`（任意）または明示されたファイル（必須）
//! 3. `SWATCH__<SECTION>__<KEY>` 環境変数
//!
//! ```toml
//! [storage]
//! root = "media"
//!
//! [database]
//! url = "sqlite://swatch.db"
//!
//! [[auth.tokens]]
//! token = "dev-admin-token"
//! username = "admin"
//! is_staff = true
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 環境変数の prefix（`SWATCH__STORAGE__ROOT` など）
pub const ENV_PREFIX: &str = "SWATCH";

const DEFAULT_CONFIG_FILE: &str = "config/swatch";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storage: StorageSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub upload: UploadSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// media root。StoredPath はここからの相対パス
    pub root: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://swatch.db".to_string(),
        }
    }
}

/// トークン表。空ならすべての管理操作が Unauthorized になる
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub tokens: Vec<TokenSettings>,
}

#[derive(Clone, Deserialize)]
pub struct TokenSettings {
    pub token: String,
    pub username: String,
    #[serde(default)]
    pub is_staff: bool,
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("token", &"***")
            .field("username", &self.username)
            .field("is_staff", &self.is_staff)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub max_bytes: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// EnvFilter 形式（`RUST_LOG` が設定されていればそちらが優先）
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// 設定を読み込む
    ///
    /// `path` が指定されていればそのファイルは必須、
    /// 無ければ `config/swatch.*` を探して、あれば使う。
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
