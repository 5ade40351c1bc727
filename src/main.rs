use android_adb_mirror::adb::AdbShell;
use android_adb_mirror::args::{Args, ArgsAction, print_help};
use android_adb_mirror::config::{self, FileConfig, ToolPaths};
use android_adb_mirror::error::MirrorResult;
use android_adb_mirror::session::{RunContext, RunOutcome, ScrcpyProcess, finalize};
use android_adb_mirror::{RunOptions, init_logging, run_until, shutdown_signal};
use log::debug;

fn main() {
    let args = match Args::parse() {
        Ok(ArgsAction::Help) => {
            print_help();
            return;
        }
        Ok(ArgsAction::Version) => {
            println!(
                "Android ADB Mirror v{} (c) {} Vigor Solutions",
                env!("APP_VERSION_DISPLAY"),
                env!("APP_BUILD_YEAR")
            );
            return;
        }
        Ok(ArgsAction::Run(args)) => Ok(args),
        Err(e) => Err(e),
    };
    init_logging(args.as_ref().is_ok_and(|args| args.debug));

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("❌ Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    let code = runtime.block_on(async_main(args));
    std::process::exit(code);
}

async fn async_main(args: MirrorResult<Args>) -> i32 {
    let ctx = RunContext::new();

    let (paths, options) = match preflight(args) {
        Ok(ready) => ready,
        Err(e) => {
            return finalize::<AdbShell>(None, &ctx, RunOutcome::Failed(e))
                .await
                .unwrap_or(1);
        }
    };
    debug!("Options: {options:?}");

    let bridge = AdbShell::new(&paths.adb, options.command_timeout);
    let mirror = ScrcpyProcess::new(&paths.scrcpy);
    let outcome = run_until(&bridge, &mirror, &options, &ctx, shutdown_signal()).await;
    finalize(Some(&bridge), &ctx, outcome).await.unwrap_or(0)
}

/// Everything that must hold before a device is contacted
fn preflight(args: MirrorResult<Args>) -> MirrorResult<(ToolPaths, RunOptions)> {
    let args = args?;
    let dir = config::tool_dir()?;
    config::enter_tool_dir(&dir)?;
    let file = FileConfig::load(&dir)?;
    let options = RunOptions::resolve(&args, &file)?;
    let paths = ToolPaths::resolve(&dir, &file);
    paths.check_environment()?;
    Ok((paths, options))
}
