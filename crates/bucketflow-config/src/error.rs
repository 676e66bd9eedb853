use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    /// `load_settings` はこの場合に既定値を返す
    #[error("設定ファイルが見つかりません")]
    ConfigFileNotFound,

    #[error("BUCKETFLOW_CONFIG で指定されたファイルが存在しません: {}", .0.display())]
    EnvPathNotFound(PathBuf),

    #[error("不明なプロバイダー: {0} (aws, azure, gcp のいずれかを指定してください)")]
    UnknownProvider(String),

    #[error("設定ファイルの解析に失敗しました ({}): {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
