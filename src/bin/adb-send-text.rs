use android_adb_mirror::adb::AdbShell;
use android_adb_mirror::config::{self, FileConfig, ToolPaths};
use android_adb_mirror::error::{MirrorError, MirrorResult};
use android_adb_mirror::init_logging;
use android_adb_mirror::text_input::send_text;
use std::env;

struct SendArgs {
    text: String,
    debug: bool,
}

fn parse_args() -> MirrorResult<Option<SendArgs>> {
    let mut debug = false;
    let mut text: Option<String> = None;

    for arg in env::args().skip(1) {
        if arg == "--help" || arg == "-h" {
            print_help();
            return Ok(None);
        } else if arg == "--debug" || arg == "-d" {
            debug = true;
        } else if text.is_none() {
            text = Some(arg);
        } else {
            return Err(MirrorError::Argument(format!("Unexpected argument: {arg}")));
        }
    }

    match text {
        Some(text) => Ok(Some(SendArgs { text, debug })),
        None => Err(MirrorError::Argument("Missing TEXT to send".to_string())),
    }
}

fn print_help() {
    println!("⌨️ Send text to an Android device (requires the ADB Keyboard IME)");
    println!();
    println!("USAGE:");
    println!("    adb-send-text [FLAGS] TEXT");
    println!();
    println!("FLAGS:");
    println!("    -d, --debug         Show adb commands");
    println!("    -h, --help          Show this help message");
}

async fn run(args: &SendArgs) -> MirrorResult<()> {
    let dir = config::tool_dir()?;
    config::enter_tool_dir(&dir)?;
    let file = FileConfig::load(&dir)?;
    let paths = ToolPaths::resolve(&dir, &file);
    paths.check_adb()?;

    let timeout = file.command_timeout()?;
    let bridge = AdbShell::new(&paths.adb, timeout);
    send_text(&bridge, &args.text).await?;
    Ok(())
}

fn exit_with(e: MirrorError) -> ! {
    eprintln!("❌ {e}");
    if let Some(hint) = e.hint() {
        eprintln!("💡 {hint}");
    }
    std::process::exit(e.exit_code());
}

fn main() {
    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => return,
        Err(e) => exit_with(e),
    };
    init_logging(args.debug);

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

    if let Err(e) = runtime.block_on(run(&args)) {
        exit_with(e);
    }
}
