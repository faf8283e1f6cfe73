use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use ascii_stream::cli::{self, Args, Command, CommandResult, RunContext};
use ascii_stream::config::Config;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Some(Command::Palettes) => {
            cli::list_palettes();
            Ok(())
        }
        Some(Command::Config { action }) => {
            cli::handle_config_action(action, args.config.as_deref(), &config)
        }
        command => {
            let ctx = RunContext {
                show_status: config.ui.status_line && !args.no_status,
                config,
                source: args.source,
                patch: args.adjust.to_patch(),
                stop: Arc::new(AtomicBool::new(false)),
            };
            run_capture(command, ctx)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Run a capture command on a fresh tokio runtime, stopping on Ctrl-C.
fn run_capture(command: Option<Command>, ctx: RunContext) -> CommandResult {
    let stop = Arc::clone(&ctx.stop);
    ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        match command {
            None | Some(Command::Run) => cli::run_live(&ctx).await,
            Some(Command::Snapshot { output, share }) => cli::snapshot(&ctx, output, share).await,
            Some(Command::Record {
                seconds,
                gif,
                output,
                share,
            }) => cli::record(&ctx, seconds, gif, output, share).await,
            Some(Command::Palettes) | Some(Command::Config { .. }) => Ok(()),
        }
    })
}
