pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 設定ファイルを直接指定する環境変数
pub const CONFIG_ENV: &str = "BUCKETFLOW_CONFIG";

/// カレントディレクトリで探すファイル名 (優先順)
const CANDIDATES: [&str; 3] = ["bucketflow.local.yaml", "bucketflow.yaml", ".bucketflow.yaml"];

/// 対象のクラウドプロバイダー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Aws,
    Azure,
    Gcp,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" | "s3" => Ok(ProviderKind::Aws),
            "azure" | "az" => Ok(ProviderKind::Azure),
            "gcp" | "gcs" | "google" => Ok(ProviderKind::Gcp),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Aws => write!(f, "aws"),
            ProviderKind::Azure => write!(f, "azure"),
            ProviderKind::Gcp => write!(f, "gcp"),
        }
    }
}

/// 設定ファイルの内容
///
/// すべての項目は省略可能。CLI フラグ > 環境変数 > 設定ファイル > 組み込みの既定値
/// の順に優先される。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub provider: Option<ProviderKind>,
    pub region: Option<String>,
    pub storage_class: Option<String>,
    pub aws: AwsSettings,
    pub azure: AzureSettings,
    pub gcp: GcpSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AwsSettings {
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AzureSettings {
    pub resource_group: Option<String>,
    pub subscription: Option<String>,
    /// ストレージアカウント作成待ちの初回間隔 (秒)
    pub poll_interval_secs: Option<u64>,
    /// ストレージアカウント作成待ちの最大回数
    pub poll_max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GcpSettings {
    pub project: Option<String>,
    /// JSON API のエンドポイント (エミュレーター向け)
    pub endpoint: Option<String>,
}

impl Settings {
    /// YAML 文字列から読み込む
    pub fn from_yaml(path: &Path, content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// ファイルから読み込む
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(path, &content)
    }
}

/// BucketFlow の設定ディレクトリ (~/.config/bucketflow)
pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("bucketflow"))
}

/// 設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 BUCKETFLOW_CONFIG (直接パス指定)
/// 2. カレントディレクトリ: bucketflow.local.yaml, bucketflow.yaml, .bucketflow.yaml
/// 3. ~/.config/bucketflow/config.yaml (グローバル設定)
pub fn find_config_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::EnvPathNotFound(path));
    }

    // 2. カレントディレクトリで検索
    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. グローバル設定ファイル
    if let Ok(dir) = config_dir() {
        let global_config = dir.join("config.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// 設定を読み込む。設定ファイルがなければ既定値を返す
pub fn load_settings() -> Result<Settings> {
    match find_config_file() {
        Ok(path) => Settings::from_file(&path),
        Err(ConfigError::ConfigFileNotFound) => Ok(Settings::default()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    /// カレントディレクトリとグローバル設定を一時ディレクトリに向けて実行する
    fn in_temp_dir<F: FnOnce(&Path)>(f: F) {
        let temp_dir = tempfile::tempdir().unwrap();
        let xdg = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        temp_env::with_vars(
            [
                (CONFIG_ENV, None),
                ("XDG_CONFIG_HOME", Some(xdg.path().to_str().unwrap())),
            ],
            || f(temp_dir.path()),
        );

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    fn test_config_dir() {
        let dir = config_dir().unwrap();
        assert!(dir.ends_with("bucketflow"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_current_dir() {
        in_temp_dir(|dir| {
            fs::write(dir.join("bucketflow.yaml"), "provider: aws\n").unwrap();

            let result = find_config_file().unwrap();
            assert!(result.ends_with("bucketflow.yaml"));
        });
    }

    #[test]
    #[serial]
    fn test_local_file_priority() {
        in_temp_dir(|dir| {
            fs::write(dir.join("bucketflow.yaml"), "region: us-east-1\n").unwrap();
            fs::write(dir.join("bucketflow.local.yaml"), "region: eu-west-1\n").unwrap();
            fs::write(dir.join(".bucketflow.yaml"), "region: ap-south-1\n").unwrap();

            // bucketflow.local.yaml が優先される
            let settings = load_settings().unwrap();
            assert_eq!(settings.region.as_deref(), Some("eu-west-1"));
        });
    }

    #[test]
    #[serial]
    fn test_env_var_path() {
        in_temp_dir(|dir| {
            let config_path = dir.join("custom.yaml");
            fs::write(&config_path, "provider: gcp\n").unwrap();
            fs::write(dir.join("bucketflow.yaml"), "provider: aws\n").unwrap();

            temp_env::with_var(CONFIG_ENV, Some(config_path.to_str().unwrap()), || {
                assert_eq!(find_config_file().unwrap(), config_path);
                assert_eq!(load_settings().unwrap().provider, Some(ProviderKind::Gcp));
            });
        });
    }

    #[test]
    #[serial]
    fn test_env_var_missing_file_is_error() {
        in_temp_dir(|dir| {
            let missing = dir.join("missing.yaml");
            temp_env::with_var(CONFIG_ENV, Some(missing.to_str().unwrap()), || {
                assert!(matches!(
                    find_config_file(),
                    Err(ConfigError::EnvPathNotFound(_))
                ));
            });
        });
    }

    #[test]
    #[serial]
    #[cfg(target_os = "linux")]
    fn test_global_config() {
        in_temp_dir(|_| {
            let global = config_dir().unwrap();
            fs::create_dir_all(&global).unwrap();
            fs::write(global.join("config.yaml"), "azure:\n  resource_group: rg-global\n")
                .unwrap();

            let settings = load_settings().unwrap();
            assert_eq!(settings.azure.resource_group.as_deref(), Some("rg-global"));
        });
    }

    #[test]
    #[serial]
    fn test_no_config_file_gives_defaults() {
        in_temp_dir(|_| {
            assert!(matches!(
                find_config_file(),
                Err(ConfigError::ConfigFileNotFound)
            ));
            assert_eq!(load_settings().unwrap(), Settings::default());
        });
    }

    #[test]
    fn test_parse_full_settings() {
        let yaml = r#"
provider: azure
region: japaneast
storage_class: Hot
aws:
  profile: dev
azure:
  resource_group: rg-data
  subscription: 00000000-0000-0000-0000-000000000000
  poll_interval_secs: 5
  poll_max_attempts: 40
gcp:
  project: my-project
  endpoint: http://localhost:4443/storage/v1
"#;
        let settings = Settings::from_yaml(Path::new("bucketflow.yaml"), yaml).unwrap();
        assert_eq!(settings.provider, Some(ProviderKind::Azure));
        assert_eq!(settings.aws.profile.as_deref(), Some("dev"));
        assert_eq!(settings.azure.poll_max_attempts, Some(40));
        assert_eq!(settings.gcp.project.as_deref(), Some("my-project"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = Settings::from_yaml(Path::new("bucketflow.yaml"), "regoin: x\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bucketflow.yaml"));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings = Settings::from_yaml(Path::new("bucketflow.yaml"), "\n").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("AWS".parse::<ProviderKind>().unwrap(), ProviderKind::Aws);
        assert_eq!("gcs".parse::<ProviderKind>().unwrap(), ProviderKind::Gcp);
        assert_eq!("azure".parse::<ProviderKind>().unwrap(), ProviderKind::Azure);
        assert!("oracle".parse::<ProviderKind>().is_err());
    }
}
