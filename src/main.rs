// ==========================================
// 地质数据导入 - 命令行入口 (geo-import)
// ==========================================

use clap::Parser;
use geological_data_import::logging::{self, LogFormat};
use geological_data_import::ImportOutcome;

mod cli;
mod commands;

use crate::cli::{Cli, Command, LogFormatArg};
use crate::commands::{run_import, run_inspect};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Json => LogFormat::Json,
    };
    logging::init_with(cli.log_level.as_deref(), format);

    tracing::info!("{} v{}", geological_data_import::APP_NAME, geological_data_import::VERSION);

    let exit_code = match cli.command {
        Command::Inspect(args) => match run_inspect(&args) {
            Ok(()) => 0,
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::Import(args) => match run_import(args).await {
            Ok(outcome) => exit_code_for(&outcome),
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
    };
    std::process::exit(exit_code);
}

fn exit_code_for(outcome: &ImportOutcome) -> i32 {
    match outcome {
        ImportOutcome::Succeeded | ImportOutcome::SucceededWithWarnings(_) => 0,
        ImportOutcome::Failed(_) => 1,
        ImportOutcome::Canceled(_) => 130,
    }
}
