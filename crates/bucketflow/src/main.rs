mod output;
mod run;
mod setup;

use bucketflow_cloud::ResourceIntent;
use bucketflow_config::ProviderKind;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bucketflow")]
#[command(about = "バケットは、宣言すれば揃う。", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    options: GlobalOptions,
}

/// 全コマンド共通のオプション
#[derive(Args, Debug, Default)]
pub(crate) struct GlobalOptions {
    /// クラウドプロバイダー (aws, azure, gcp)
    #[arg(short, long, global = true, env = "BUCKETFLOW_PROVIDER")]
    pub provider: Option<ProviderKind>,

    /// 作成先リージョン
    #[arg(short, long, global = true, env = "BUCKETFLOW_REGION")]
    pub region: Option<String>,

    /// 親リソース名 (Azure ストレージアカウント)
    #[arg(long, global = true)]
    pub parent: Option<String>,

    /// Azure リソースグループ
    #[arg(long, global = true, env = "AZURE_RESOURCE_GROUP")]
    pub resource_group: Option<String>,

    /// Azure サブスクリプション
    #[arg(long, global = true, env = "AZURE_SUBSCRIPTION_ID")]
    pub subscription: Option<String>,

    /// GCP プロジェクト
    #[arg(long, global = true, env = "GOOGLE_CLOUD_PROJECT")]
    pub project: Option<String>,

    /// AWS プロファイル
    #[arg(long, global = true, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// ストレージクラス (作成時のみ)
    #[arg(long, global = true)]
    pub storage_class: Option<String>,

    /// 結果を JSON で出力
    #[arg(long, global = true)]
    pub json: bool,

    /// ログを詳細に出力 (-v: info, -vv: debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// コンテナを作成（既に存在する場合は何もしない）
    Create {
        /// 論理名（プロバイダーの命名規則に正規化される）
        name: String,
    },
    /// コンテナを削除（中身も削除、存在しない場合は何もしない）
    Delete {
        /// 論理名
        name: String,
    },
    /// コンテナの状態を表示
    Check {
        /// 論理名
        name: String,
    },
    /// コンテナの一覧を表示
    List {
        /// 論理名（Azure ではストレージアカウントの導出に使う）
        name: Option<String>,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrに出力（stdoutは結果表示・JSON用）
    init_tracing(cli.options.verbose);

    let intent = match cli.command {
        Commands::Create { name } => ResourceIntent::create(name),
        Commands::Delete { name } => ResourceIntent::delete(name),
        Commands::Check { name } => ResourceIntent::describe(name),
        Commands::List { name } => ResourceIntent::new(
            bucketflow_cloud::IntentAction::Enumerate,
            name.unwrap_or_default(),
        ),
        // Versionコマンドは設定ファイル不要
        Commands::Version => {
            println!("bucketflow {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
    };

    let settings = bucketflow_config::load_settings()?;
    let provider = setup::build_provider(&cli.options, &settings)?;
    let intent = setup::complete_intent(intent, &cli.options, &settings);

    let result = run::run(provider.as_ref(), &intent, cli.options.json).await;

    output::print_result(&result, cli.options.json)?;

    let code = result.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// RUST_LOG が優先。-v を指定した場合はそのレベルで上書きする
fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
