//! 結果の表示

use bucketflow_cloud::{ContainerMetadata, ContainerSummary, Detail, Outcome, ReconcileResult};
use chrono::{DateTime, Utc};
use colored::Colorize;

/// 結果を表示する。`json` なら stdout に JSON のみを出力
pub fn print_result(result: &ReconcileResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    let resource = result.resource.as_deref().unwrap_or("-");
    match result.outcome {
        Outcome::Created => {
            println!("{} {}", "✓ 作成しました:".green(), resource.cyan());
        }
        Outcome::AlreadyExisted => match result.metadata() {
            Some(metadata) => print_metadata(resource, metadata),
            None => println!("{} {}", "✓ 既に存在します:".green(), resource.cyan()),
        },
        Outcome::Deleted => {
            println!("{} {}", "✓ 削除しました:".green(), resource.cyan());
            if let Some(Detail::Cleanup {
                sub_resources_deleted,
            }) = &result.detail
            {
                if *sub_resources_deleted > 0 {
                    println!("  オブジェクト {} 件を削除", sub_resources_deleted);
                }
            }
        }
        Outcome::AlreadyAbsent => {
            println!("{} {}", "✓ 既に存在しません:".green(), resource.cyan());
        }
        Outcome::Listed => print_listing(result.listing().unwrap_or_default()),
        Outcome::Failed => {
            if let Some(Detail::Failure { kind, message }) = &result.detail {
                eprintln!("{} [{}] {}", "✗ 失敗しました".red().bold(), kind, message);
            } else {
                eprintln!("{}", "✗ 失敗しました".red().bold());
            }
            if let Some(resource) = &result.resource {
                eprintln!("  対象: {}", resource);
            }
        }
    }

    Ok(())
}

fn print_metadata(resource: &str, metadata: &ContainerMetadata) {
    println!("{} {}", "✓ 存在します:".green(), resource.cyan());
    println!();

    let field = |label: &str, value: Option<&str>| {
        println!("  {} {}", format!("{:<14}", label).bold(), value.unwrap_or("-"));
    };
    field("region", metadata.region.as_deref());
    field("created", metadata.created_at.map(format_time).as_deref());
    field("storage class", metadata.storage_class.as_deref());
    field("etag", metadata.etag.as_deref());

    let mut keys: Vec<&String> = metadata.attributes.keys().collect();
    keys.sort();
    for key in keys {
        let value = &metadata.attributes[key];
        let value = match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        };
        field(key.as_str(), Some(&value));
    }
}

fn print_listing(containers: &[ContainerSummary]) {
    println!();
    if containers.is_empty() {
        println!("{}", "コンテナはありません".dimmed());
        return;
    }

    println!("{}", format!("{:<64} {:<20}", "NAME", "CREATED").bold());
    println!("{}", "─".repeat(85).dimmed());
    for container in containers {
        let created = container
            .created_at
            .map(format_time)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} {}",
            format!("{:<64}", container.id).cyan(),
            created.dimmed()
        );
    }
    println!();
    println!("{} 件", containers.len());
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
