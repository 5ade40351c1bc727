use crate::connection::DEFAULT_PORT;
use crate::error::{MirrorError, MirrorResult};
use crate::session::Rotation;
use std::env;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    pub ip: Option<Ipv4Addr>,
    /// None when not given on the command line, so the config file can fill it
    pub port: Option<u16>,
    pub rotation: Option<Rotation>,
    pub usb_only: bool,
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgsAction {
    Run(Args),
    Help,
    Version,
}

impl Args {
    pub fn parse() -> MirrorResult<ArgsAction> {
        Self::parse_from(env::args().skip(1))
    }

    /// Parses arguments without the program name.
    /// Accepts `--flag value` and `--flag=value`.
    pub fn parse_from<I, S>(args: I) -> MirrorResult<ArgsAction>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = Args::default();
        let mut iter = args.into_iter().map(Into::into);

        while let Some(arg) = iter.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => {
                    (flag.to_string(), Some(value.to_string()))
                }
                _ => (arg.clone(), None),
            };

            match flag.as_str() {
                "-h" | "--help" => return Ok(ArgsAction::Help),
                "-v" | "--version" => return Ok(ArgsAction::Version),
                "-u" | "--usb" => parsed.usb_only = true,
                "-d" | "--debug" => parsed.debug = true,
                "-i" | "--ip" => {
                    let value = take_value(&flag, inline, &mut iter)?;
                    parsed.ip = Some(parse_ip(&value)?);
                }
                "-p" | "--port" => {
                    let value = take_value(&flag, inline, &mut iter)?;
                    parsed.port = Some(parse_port(&value)?);
                }
                "-r" | "--rotation" => {
                    let value = take_value(&flag, inline, &mut iter)?;
                    parsed.rotation = Some(value.parse()?);
                }
                _ => {
                    return Err(MirrorError::Argument(format!("Unknown argument: {arg}")));
                }
            }
        }

        Ok(ArgsAction::Run(parsed))
    }
}

fn take_value(
    flag: &str,
    inline: Option<String>,
    rest: &mut impl Iterator<Item = String>,
) -> MirrorResult<String> {
    inline
        .or_else(|| rest.next())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| MirrorError::Argument(format!("Missing value for {flag}")))
}

fn parse_ip(value: &str) -> MirrorResult<Ipv4Addr> {
    value
        .parse()
        .map_err(|_| MirrorError::Argument(format!("Invalid IPv4 address: {value}")))
}

pub fn parse_port(value: &str) -> MirrorResult<u16> {
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(MirrorError::Argument(format!(
            "Invalid port '{value}', expected a number between 1 and 65535"
        ))),
    }
}

pub fn print_help() {
    println!("📱 Android ADB Mirror");
    println!();
    println!("Connects to an Android device over adb, wireless when possible,");
    println!("and mirrors its screen with scrcpy.");
    println!("Device settings changed for the session are restored on exit.");
    println!();
    println!("USAGE:");
    println!("    android-adb-mirror [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    -i, --ip IP           Connect to the device at this IPv4 address");
    println!("    -p, --port PORT       Wireless adb port (default: {DEFAULT_PORT})");
    println!("    -r, --rotation N      Lock rotation: 0 portrait, 1 landscape right,");
    println!("                          3 landscape left");
    println!("    -u, --usb             Mirror over USB, do not switch to wireless");
    println!("    -d, --debug           Show every adb command and state change");
    println!("    -h, --help            Show this help message");
    println!("    -v, --version         Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    android-adb-mirror");
    println!("    android-adb-mirror --ip 192.168.1.50");
    println!("    android-adb-mirror -i 192.168.1.50 -p 5556 -r 1");
    println!("    android-adb-mirror --usb --debug");
}
