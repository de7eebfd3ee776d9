// userdb 服务入口：解析参数、加载配置、启动 HTTP 服务
use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use figment::providers::Serialized;
use serde::Serialize;
use userdb::config::Config;
use userdb::logging::{init_logging, Verbosity};

/// JSON-file backed user record service
#[derive(Parser, Debug)]
#[command(name = "userdb")]
#[command(version, about, long_about = None)]
struct Args {
    /// Config file (defaults to ./userdb.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Listen host
    #[arg(long)]
    host: Option<IpAddr>,

    /// Data file holding the record collection
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

// 命令行参数作为最高优先级的一层覆盖
#[derive(Serialize)]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    server: Option<ServerOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage: Option<StorageOverrides>,
}

#[derive(Serialize)]
struct ServerOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
}

#[derive(Serialize)]
struct StorageOverrides {
    data_path: PathBuf,
}

impl CliOverrides {
    fn from_args(args: &Args) -> Self {
        let server = (args.host.is_some() || args.port.is_some()).then(|| ServerOverrides {
            host: args.host,
            port: args.port,
        });
        let storage = args
            .data
            .clone()
            .map(|data_path| StorageOverrides { data_path });
        CliOverrides { server, storage }
    }
}

fn load_config(args: &Args) -> userdb::Result<Config> {
    let config: Config = Config::figment(args.config.clone())
        .merge(Serialized::defaults(CliOverrides::from_args(args)))
        .extract()?;
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(Verbosity::from_flags(args.quiet, args.verbose));

    tracing::info!("userdb v{}", userdb::VERSION);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = userdb::start_server(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
