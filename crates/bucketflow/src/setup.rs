//! プロバイダーの組み立て
//!
//! 優先順位: CLI フラグ > 環境変数 > 設定ファイル > 組み込みの既定値

use crate::GlobalOptions;
use bucketflow_cloud::{PollConfig, ResourceIntent, StorageProvider};
use bucketflow_cloud_aws::{AwsConfig, S3Provider};
use bucketflow_cloud_azure::{AzureBlobProvider, AzureConfig};
use bucketflow_cloud_gcp::{GcsConfig, GcsProvider};
use bucketflow_config::{AzureSettings, ProviderKind, Settings};
use std::time::Duration;

/// フラグと設定からプロバイダーを生成する
pub fn build_provider(
    options: &GlobalOptions,
    settings: &Settings,
) -> anyhow::Result<Box<dyn StorageProvider>> {
    let kind = options.provider.or(settings.provider).ok_or_else(|| {
        anyhow::anyhow!("プロバイダーが指定されていません (--provider または BUCKETFLOW_PROVIDER)")
    })?;
    let region = pick(&options.region, &settings.region);

    tracing::debug!("Using provider {}", kind);

    let provider: Box<dyn StorageProvider> = match kind {
        ProviderKind::Aws => {
            let mut config = AwsConfig::new();
            if let Some(profile) = pick(&options.profile, &settings.aws.profile) {
                config = config.with_profile(profile);
            }
            if let Some(region) = region {
                config = config.with_region(region);
            }
            Box::new(S3Provider::new(config))
        }
        ProviderKind::Azure => {
            let resource_group = pick(&options.resource_group, &settings.azure.resource_group)
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "リソースグループが指定されていません (--resource-group または AZURE_RESOURCE_GROUP)"
                    )
                })?;
            let mut config =
                AzureConfig::new(resource_group).with_poll(poll_config(&settings.azure));
            if let Some(subscription) = pick(&options.subscription, &settings.azure.subscription)
            {
                config = config.with_subscription(subscription);
            }
            if let Some(region) = region {
                config = config.with_region(region);
            }
            Box::new(AzureBlobProvider::new(config)?)
        }
        ProviderKind::Gcp => {
            let mut config = GcsConfig::from_env();
            if let Some(project) = pick(&options.project, &settings.gcp.project) {
                config = config.with_project(project);
            }
            if let Some(endpoint) = settings.gcp.endpoint.clone() {
                config = config.with_endpoint(endpoint);
            }
            if let Some(region) = region {
                config = config.with_location(region);
            }
            Box::new(GcsProvider::new(config)?)
        }
    };

    Ok(provider)
}

/// コマンド単位のオプションを意図に反映する
pub fn complete_intent(
    mut intent: ResourceIntent,
    options: &GlobalOptions,
    settings: &Settings,
) -> ResourceIntent {
    if let Some(parent) = &options.parent {
        intent = intent.with_parent(parent.clone());
    }
    if let Some(storage_class) = pick(&options.storage_class, &settings.storage_class) {
        intent = intent.with_storage_class(storage_class);
    }
    intent
}

/// ストレージアカウント作成待ちの設定
fn poll_config(settings: &AzureSettings) -> PollConfig {
    let mut poll = PollConfig::default();
    if let Some(secs) = settings.poll_interval_secs {
        poll.initial_delay = Duration::from_secs(secs);
        poll.max_delay = poll.max_delay.max(poll.initial_delay);
    }
    if let Some(attempts) = settings.poll_max_attempts {
        poll.max_attempts = attempts;
    }
    poll
}

fn pick(flag: &Option<String>, setting: &Option<String>) -> Option<String> {
    flag.clone().or_else(|| setting.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_required() {
        let err = build_provider(&GlobalOptions::default(), &Settings::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("BUCKETFLOW_PROVIDER"));
    }

    #[test]
    fn test_provider_from_settings() {
        let settings = Settings {
            provider: Some(ProviderKind::Aws),
            region: Some("eu-west-1".to_string()),
            ..Default::default()
        };
        let provider = build_provider(&GlobalOptions::default(), &settings).unwrap();
        assert_eq!(provider.name(), "aws");
        assert_eq!(provider.default_region(), Some("eu-west-1"));
    }

    #[test]
    fn test_flag_overrides_settings() {
        let options = GlobalOptions {
            provider: Some(ProviderKind::Azure),
            region: Some("japaneast".to_string()),
            resource_group: Some("rg-flag".to_string()),
            ..Default::default()
        };
        let settings = Settings {
            provider: Some(ProviderKind::Aws),
            region: Some("eu-west-1".to_string()),
            ..Default::default()
        };
        let provider = build_provider(&options, &settings).unwrap();
        assert_eq!(provider.name(), "azure");
        assert_eq!(provider.default_region(), Some("japaneast"));
    }

    #[test]
    fn test_azure_requires_resource_group() {
        let options = GlobalOptions {
            provider: Some(ProviderKind::Azure),
            ..Default::default()
        };
        let err = build_provider(&options, &Settings::default()).err().unwrap();
        assert!(err.to_string().contains("リソースグループ"));
    }

    #[test]
    fn test_poll_config_from_settings() {
        let settings = AzureSettings {
            poll_interval_secs: Some(30),
            poll_max_attempts: Some(5),
            ..Default::default()
        };
        let poll = poll_config(&settings);
        assert_eq!(poll.max_attempts, 5);
        assert_eq!(poll.initial_delay, Duration::from_secs(30));
        assert!(poll.max_delay >= poll.initial_delay);

        let poll = poll_config(&AzureSettings::default());
        assert_eq!(poll.max_attempts, PollConfig::default().max_attempts);
    }

    #[test]
    fn test_complete_intent() {
        let options = GlobalOptions {
            parent: Some("acct01".to_string()),
            ..Default::default()
        };
        let settings = Settings {
            storage_class: Some("Cool".to_string()),
            ..Default::default()
        };
        let intent = complete_intent(ResourceIntent::create("logs"), &options, &settings);
        assert_eq!(intent.parent_hint(), Some("acct01"));
        assert_eq!(intent.storage_class.as_deref(), Some("Cool"));
    }
}
