use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wind_core::config::{AppConfig, CONFIG};
use windpy::{WindApi, WindBridgeClient, WindCall};

#[derive(Parser, Debug)]
#[command(name = "wind-cli", about = "直接调用 Wind 桥接服务的调试工具", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 查询 Wind 会话是否已连接
    Status,
    /// 启动（或重新启动）Wind 会话
    Start,
    /// 关闭 Wind 会话
    Stop,
    /// 日时间序列 (w.wsd)
    Wsd {
        /// 证券代码，逗号分隔，例如 600030.SH,000001.SZ
        #[arg(long, short = 'c')]
        codes: String,
        /// 指标，逗号分隔，例如 close,open
        #[arg(long, short = 'f')]
        fields: String,
        #[arg(long, short = 'b')]
        begin: String,
        #[arg(long, short = 'e')]
        end: String,
        #[arg(long, short = 'o', default_value = "")]
        options: String,
    },
    /// 日截面数据 (w.wss)
    Wss {
        #[arg(long, short = 'c')]
        codes: String,
        #[arg(long, short = 'f')]
        fields: String,
        #[arg(long, short = 'o', default_value = "")]
        options: String,
    },
    /// 实时行情 (w.wsq)
    Wsq {
        #[arg(long, short = 'c')]
        codes: String,
        #[arg(long, short = 'f')]
        fields: String,
    },
    /// 区间交易日序列 (w.tdays)
    Tdays {
        #[arg(long, short = 'b')]
        begin: String,
        #[arg(long, short = 'e')]
        end: String,
        #[arg(long, short = 'o', default_value = "")]
        options: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let cli = Cli::parse();
    let config: &AppConfig = &CONFIG;
    let client = WindBridgeClient::from_config(config)?;

    match cli.command {
        Command::Status => {
            let connected = client.is_connected().await?;
            println!("connected: {}", connected);
        }
        Command::Start => {
            let result = client.start().await?.ensure_success()?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Stop => {
            let result = client.stop().await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Wsd {
            codes,
            fields,
            begin,
            end,
            options,
        } => {
            let call = WindCall::Wsd {
                codes,
                fields,
                begin_time: begin,
                end_time: end,
                options,
            };
            print_call(&client, &call).await?;
        }
        Command::Wss {
            codes,
            fields,
            options,
        } => {
            let call = WindCall::Wss {
                codes,
                fields,
                options,
            };
            print_call(&client, &call).await?;
        }
        Command::Wsq { codes, fields } => {
            let call = WindCall::Wsq {
                codes,
                fields,
                options: String::new(),
            };
            print_call(&client, &call).await?;
        }
        Command::Tdays {
            begin,
            end,
            options,
        } => {
            let call = WindCall::Tdays {
                begin_time: begin,
                end_time: end,
                options,
            };
            print_call(&client, &call).await?;
        }
    }

    Ok(())
}

async fn print_call(client: &WindBridgeClient, call: &WindCall) -> Result<()> {
    let result = client.query(call).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn init_tracing() -> Result<()> {
    if tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish(),
    )
    .is_err()
    {
        // tracing already initialised; ignore.
    }
    Ok(())
}
