//! AzureBlobProvider を偽の az CLI (sh スクリプト) で動かすテスト
#![cfg(unix)]

use bucketflow_cloud::{
    FailureKind, Outcome, PollConfig, Reconciler, ResourceIntent, StorageProvider, normalize,
};
use bucketflow_cloud_azure::{AuthMode, AzureBlobProvider, AzureConfig};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// ストレージアカウントとコンテナをファイルとして扱う偽の az CLI
///
/// 作成直後のアカウントは一度だけ "Creating" を返す。
const FAKE_AZ: &str = r#"
echo "$@" >> "@DIR@/calls.log"
state="@DIR@/state"
mkdir -p "$state"
case "$2 $3" in
  "account show")
    acct="$state/$7.account"
    if [ ! -f "$acct" ]; then
      echo "ERROR: (ResourceNotFound) The Resource 'Microsoft.Storage/storageAccounts/$7' under resource group '$5' was not found." >&2
      echo "Code: ResourceNotFound" >&2
      exit 3
    fi
    status=$(cat "$acct")
    echo "Succeeded" > "$acct"
    echo '{"name": "'"$7"'", "location": "japaneast", "provisioningState": "'"$status"'", "accessTier": "Hot", "sku": {"name": "Standard_LRS"}}'
    ;;
  "account create")
    echo "Creating" > "$state/$7.account"
    mkdir -p "$state/$7"
    ;;
  "account list")
    echo '[{"name": "acct01", "creationTime": "2024-05-12T00:00:00.000000+00:00"}]'
    ;;
  "container exists")
    if [ -f "$state/$5/$7" ]; then echo '{"exists": true}'; else echo '{"exists": false}'; fi
    ;;
  "container create")
    if [ -f "$state/$5/$7" ]; then
      echo "ERROR: The specified container already exists." >&2
      echo "ErrorCode:ContainerAlreadyExists" >&2
      exit 1
    fi
    touch "$state/$5/$7"
    echo '{"created": true}'
    ;;
  "container delete")
    if [ -f "$state/$5/$7" ]; then
      rm -f "$state/$5/$7"
      echo '{"deleted": true}'
    else
      echo '{"deleted": false}'
    fi
    ;;
  "container show")
    echo '{"name": "'"$7"'", "properties": {"etag": "\"0x8DC7\"", "lastModified": "2024-05-12T00:00:00+00:00", "lease": {"state": "available", "status": "unlocked"}, "publicAccess": null}}'
    ;;
  "container list")
    printf '['
    sep=''
    for f in "$state/$5"/*; do
      [ -f "$f" ] || continue
      printf '%s{"name": "%s"}' "$sep" "$(basename "$f")"
      sep=','
    done
    echo ']'
    ;;
  "blob list")
    echo '[{"name": "a.csv"}, {"name": "b.csv"}]'
    ;;
  "blob delete")
    ;;
esac
"#;

fn fast_poll() -> PollConfig {
    PollConfig {
        max_attempts: 5,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
        backoff_multiplier: 1.0,
    }
}

fn fake_config(dir: &TempDir, script: &str) -> AzureConfig {
    let path = dir.path().join("az.sh");
    let body = script.replace("@DIR@", &dir.path().to_string_lossy());
    std::fs::write(&path, body).unwrap();

    AzureConfig::new("rg-data")
        .with_region("japaneast")
        .with_poll(fast_poll())
        .with_program("sh", vec![path.to_string_lossy().to_string()])
}

fn fake_provider(dir: &TempDir, script: &str) -> AzureBlobProvider {
    AzureBlobProvider::new(fake_config(dir, script)).unwrap()
}

/// コンテナ・blob 操作のコマンド
fn data_plane_calls(dir: &Path) -> Vec<String> {
    calls(dir)
        .into_iter()
        .filter(|c| c.starts_with("storage container") || c.starts_with("storage blob"))
        .collect()
}

fn calls(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn count(dir: &Path, op: &str) -> usize {
    calls(dir).iter().filter(|c| c.starts_with(op)).count()
}

/// アカウントがなければ作成し、プロビジョニング完了を待ってからコンテナを作る
#[tokio::test]
async fn test_create_provisions_storage_account() {
    let dir = TempDir::new().unwrap();
    let provider = fake_provider(&dir, FAKE_AZ);
    let engine = Reconciler::new(&provider);
    let intent = ResourceIntent::create("my-data");

    let account = normalize("my-data", &provider.parent_naming_rules().unwrap()).unwrap();

    let first = engine.reconcile(&intent).await;
    assert_eq!(first.outcome, Outcome::Created);
    assert_eq!(
        first.resource.as_deref(),
        Some(format!("{}/my-data", account).as_str())
    );

    let creates: Vec<String> = calls(dir.path())
        .into_iter()
        .filter(|c| c.starts_with("storage account create"))
        .collect();
    assert_eq!(creates.len(), 1);
    assert!(creates[0].contains(&format!("--name {}", account)));
    assert!(creates[0].contains("--location japaneast"));
    assert!(creates[0].contains("--kind StorageV2"));
    assert!(creates[0].contains("--sku Standard_LRS"));
    assert!(creates[0].contains("--min-tls-version TLS1_2"));

    let second = engine.reconcile(&intent).await;
    assert_eq!(second.outcome, Outcome::AlreadyExisted);
    assert_eq!(count(dir.path(), "storage account create"), 1);
    assert_eq!(count(dir.path(), "storage container create"), 1);

    // 作成直後のアカウントでも RBAC ロールなしで操作できるようキー認証を使う
    let data_plane = data_plane_calls(dir.path());
    assert!(!data_plane.is_empty());
    assert!(data_plane.iter().all(|c| c.contains("--auth-mode key")));
}

/// AuthMode::Login を選ぶとサインイン中の ID で操作する
#[tokio::test]
async fn test_login_auth_mode() {
    let dir = TempDir::new().unwrap();
    let provider =
        AzureBlobProvider::new(fake_config(&dir, FAKE_AZ).with_auth_mode(AuthMode::Login))
            .unwrap();
    let engine = Reconciler::new(&provider);

    engine
        .reconcile(&ResourceIntent::create("logs").with_parent("acct01"))
        .await;
    engine
        .reconcile(&ResourceIntent::delete("logs").with_parent("acct01"))
        .await;

    let data_plane = data_plane_calls(dir.path());
    assert!(data_plane.iter().any(|c| c.starts_with("storage blob delete")));
    assert!(data_plane.iter().all(|c| c.contains("--auth-mode login")));
}

/// 明示したアカウント名にはハッシュを付けない
#[tokio::test]
async fn test_explicit_account_is_used_verbatim() {
    let dir = TempDir::new().unwrap();
    let provider = fake_provider(&dir, FAKE_AZ);

    let result = Reconciler::new(&provider)
        .reconcile(&ResourceIntent::create("logs").with_parent("acct01"))
        .await;

    assert_eq!(result.resource.as_deref(), Some("acct01/logs"));
    assert!(
        calls(dir.path())
            .iter()
            .any(|c| c.starts_with("storage container create --account-name acct01 --name logs"))
    );
}

/// 削除は blob を消してからコンテナを消し、2回目は AlreadyAbsent
#[tokio::test]
async fn test_delete_container() {
    let dir = TempDir::new().unwrap();
    let provider = fake_provider(&dir, FAKE_AZ);
    let engine = Reconciler::new(&provider);
    engine
        .reconcile(&ResourceIntent::create("logs").with_parent("acct01"))
        .await;

    let result = engine
        .reconcile(&ResourceIntent::delete("logs").with_parent("acct01"))
        .await;
    assert_eq!(result.outcome, Outcome::Deleted);
    assert_eq!(count(dir.path(), "storage blob delete"), 2);

    let again = engine
        .reconcile(&ResourceIntent::delete("logs").with_parent("acct01"))
        .await;
    assert_eq!(again.outcome, Outcome::AlreadyAbsent);
}

/// アカウントがない状態での削除は何もしない
#[tokio::test]
async fn test_delete_without_account_is_absent() {
    let dir = TempDir::new().unwrap();
    let provider = fake_provider(&dir, FAKE_AZ);

    let result = Reconciler::new(&provider)
        .reconcile(&ResourceIntent::delete("logs").with_parent("acct01"))
        .await;

    assert_eq!(result.outcome, Outcome::AlreadyAbsent);
    assert_eq!(count(dir.path(), "storage container delete"), 0);
}

/// describe はコンテナとアカウントの情報を合わせて返す
#[tokio::test]
async fn test_describe_container() {
    let dir = TempDir::new().unwrap();
    let provider = fake_provider(&dir, FAKE_AZ);
    let engine = Reconciler::new(&provider);
    engine
        .reconcile(&ResourceIntent::create("logs").with_parent("acct01"))
        .await;

    let result = engine
        .reconcile(&ResourceIntent::describe("logs").with_parent("acct01"))
        .await;

    let metadata = result.metadata().unwrap();
    assert_eq!(metadata.region.as_deref(), Some("japaneast"));
    assert_eq!(metadata.storage_class.as_deref(), Some("Standard_LRS"));
    assert_eq!(metadata.etag.as_deref(), Some("\"0x8DC7\""));
    assert_eq!(
        metadata.get_attribute::<String>("lease_status"),
        Some("unlocked".to_string())
    );
}

/// 親を指定した一覧はそのアカウントのコンテナ、指定なしはアカウント一覧
#[tokio::test]
async fn test_enumerate() {
    let dir = TempDir::new().unwrap();
    let provider = fake_provider(&dir, FAKE_AZ);
    let engine = Reconciler::new(&provider);
    for name in ["alpha", "beta"] {
        engine
            .reconcile(&ResourceIntent::create(name).with_parent("acct01"))
            .await;
    }

    let containers = engine
        .reconcile(&ResourceIntent::enumerate().with_parent("acct01"))
        .await;
    let mut names: Vec<&str> = containers
        .listing()
        .unwrap()
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    names.sort();
    assert_eq!(names, vec!["alpha", "beta"]);

    let accounts = engine.reconcile(&ResourceIntent::enumerate()).await;
    let listing = accounts.listing().unwrap();
    assert_eq!(listing.len(), 1);
    assert!(listing[0].created_at.is_some());

}

/// 存在しないアカウントの一覧は空の成功で、コンテナ一覧コマンドは呼ばれない
#[tokio::test]
async fn test_enumerate_missing_account_is_empty() {
    let dir = TempDir::new().unwrap();
    let provider = fake_provider(&dir, FAKE_AZ);

    let result = Reconciler::new(&provider)
        .reconcile(&ResourceIntent::enumerate().with_parent("nothere"))
        .await;

    assert_eq!(result.outcome, Outcome::Listed);
    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.resource.as_deref(), Some("nothere"));
    assert!(result.listing().unwrap().is_empty());
    assert_eq!(count(dir.path(), "storage container list"), 0);
}

/// 権限がなければ AccessDenied で止まり、作成系コマンドは呼ばれない
#[tokio::test]
async fn test_authorization_failure() {
    let dir = TempDir::new().unwrap();
    let script = r#"
echo "$@" >> "@DIR@/calls.log"
echo "ERROR: (AuthorizationFailed) The client 'user@example.com' does not have authorization to perform action 'Microsoft.Storage/storageAccounts/read'." >&2
echo "Code: AuthorizationFailed" >&2
exit 1
"#;
    let provider = fake_provider(&dir, script);

    let result = Reconciler::new(&provider)
        .reconcile(&ResourceIntent::create("logs").with_parent("acct01"))
        .await;

    assert_eq!(result.failure_kind(), Some(FailureKind::AccessDenied));
    assert_eq!(calls(dir.path()).len(), 1);
}

/// プロビジョニングが終わらなければ Provisioning で失敗する
#[tokio::test]
async fn test_provisioning_timeout() {
    let dir = TempDir::new().unwrap();
    let script = r#"
echo "$@" >> "@DIR@/calls.log"
case "$2 $3" in
  "account show")
    if [ -f "@DIR@/created" ]; then
      echo '{"name": "acct01", "provisioningState": "Creating"}'
    else
      echo "ERROR: (ResourceNotFound) not found" >&2
      exit 3
    fi
    ;;
  "account create")
    touch "@DIR@/created"
    ;;
esac
"#;
    let provider = fake_provider(&dir, script);

    let result = Reconciler::new(&provider)
        .reconcile(&ResourceIntent::create("logs").with_parent("acct01"))
        .await;

    assert_eq!(result.failure_kind(), Some(FailureKind::Provisioning));
    assert_eq!(count(dir.path(), "storage container create"), 0);
}
