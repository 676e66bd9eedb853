use bucketflow_cloud::{IntentAction, ReconcileResult, Reconciler, ResourceIntent, StorageProvider};
use colored::Colorize;

/// 意図を 1 サイクル実行する
pub async fn run(
    provider: &dyn StorageProvider,
    intent: &ResourceIntent,
    json: bool,
) -> ReconcileResult {
    if !json {
        let verb = match intent.action {
            IntentAction::Create => "作成",
            IntentAction::Delete => "削除",
            IntentAction::Describe => "確認",
            IntentAction::Enumerate => "一覧取得",
        };
        let header = format!("{} の{}中...", provider.display_name(), verb);
        if intent.logical_name.is_empty() {
            println!("{}", header.blue());
        } else {
            println!("{} {}", header.blue(), intent.logical_name.cyan());
        }
    }

    Reconciler::new(provider).reconcile(intent).await
}
