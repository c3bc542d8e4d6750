use clap::{App, AppSettings, Arg, SubCommand};
use colored::*;
use serde::Serialize;
use stationd::protocol::{DeviceId, ReplyKind, StatusLine, MAX_DATAGRAM_SIZE};
use std::time::Duration;
use tokio::net::UdpSocket;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "5005";
const DEFAULT_TIMEOUT_SECS: &str = "5";

#[derive(Debug, Serialize)]
struct ReplyReport {
    command: String,
    kind: ReplyKind,
    reply: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    status: Vec<StatusLine>,
}

impl ReplyReport {
    fn new(command: &str, reply: &str) -> Self {
        let reply = reply.trim_end().to_string();
        let kind = reply.lines().next().map_or(ReplyKind::Status, ReplyKind::classify);
        let status = if kind == ReplyKind::Status {
            reply.lines().filter_map(StatusLine::parse).collect()
        } else {
            Vec::new()
        };
        Self {
            command: command.to_string(),
            kind,
            reply,
            status,
        }
    }

    fn is_failure(&self) -> bool {
        self.kind == ReplyKind::Failure
    }
}

struct Target {
    addr: String,
    timeout: Duration,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("stationctl")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Space Systems Engineering Team")
        .about("📡 Operator client for the station daemon")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("host")
                .short("H")
                .long("host")
                .value_name("HOST")
                .help("Daemon host address")
                .takes_value(true)
                .default_value(DEFAULT_HOST)
                .global(true),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("Daemon UDP port")
                .takes_value(true)
                .default_value(DEFAULT_PORT)
                .global(true)
                .validator(|v| match v.parse::<u16>() {
                    Ok(_) => Ok(()),
                    Err(_) => Err("Port must be a number between 0 and 65535".into()),
                }),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .takes_value(true)
                .possible_values(&["text", "json"])
                .default_value("text")
                .global(true),
        )
        .arg(
            Arg::with_name("timeout")
                .short("t")
                .long("timeout")
                .value_name("SECONDS")
                .help("Seconds to wait for each reply")
                .takes_value(true)
                .default_value(DEFAULT_TIMEOUT_SECS)
                .global(true)
                .validator(|v| match v.parse::<u64>() {
                    Ok(secs) if secs > 0 => Ok(()),
                    _ => Err("Timeout must be a positive number of seconds".into()),
                }),
        )
        .subcommand(
            SubCommand::with_name("send")
                .about("Send a raw command, e.g. `stationctl send vhf pa-power on`")
                .arg(
                    Arg::with_name("command")
                        .help("Command tokens")
                        .required(true)
                        .multiple(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("status")
                .about("Show line states for one device, or every device")
                .arg(
                    Arg::with_name("device")
                        .help("Device name")
                        .possible_values(&DeviceId::ALL.map(DeviceId::as_str)),
                ),
        )
        .subcommand(SubCommand::with_name("temp").about("Read the station temperature"))
        .get_matches();

    let target = Target {
        addr: format!(
            "{}:{}",
            matches.value_of("host").unwrap_or(DEFAULT_HOST),
            matches.value_of("port").unwrap_or(DEFAULT_PORT)
        ),
        timeout: Duration::from_secs(
            matches
                .value_of("timeout")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        ),
    };
    let json = matches.value_of("format") == Some("json");

    let commands: Vec<String> = match matches.subcommand() {
        ("send", Some(sub)) => vec![sub
            .values_of("command")
            .map(|tokens| tokens.collect::<Vec<_>>().join(" "))
            .unwrap_or_default()],
        ("status", Some(sub)) => match sub.value_of("device") {
            Some(device) => vec![format!("{device} status")],
            None => DeviceId::ALL
                .iter()
                .map(|device| format!("{device} status"))
                .collect(),
        },
        ("temp", _) => vec!["gettemp".to_string()],
        _ => {
            println!("{}", "No command specified. Use --help for usage information.".yellow());
            return Ok(());
        }
    };

    let mut reports = Vec::with_capacity(commands.len());
    for command in &commands {
        let reply = send_command(&target, command).await?;
        reports.push(ReplyReport::new(command, &reply));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    if reports.iter().any(ReplyReport::is_failure) {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &ReplyReport) {
    match report.kind {
        ReplyKind::Success => println!("{} {}", "✅".green(), report.reply.bright_green()),
        ReplyKind::Warning => println!("{} {}", "⚠️".yellow(), report.reply.yellow()),
        ReplyKind::Failure => println!("{} {}", "❌".red(), report.reply.bright_red()),
        ReplyKind::Confirm => {
            println!("{} {}", "🔒".yellow(), report.reply.bright_yellow());
            println!("   {}", report.command.bright_cyan());
        }
        ReplyKind::Temperature => println!("{} {}", "🌡️".cyan(), report.reply.bright_white()),
        ReplyKind::Status => {
            for line in &report.status {
                let state = match line.state.as_str() {
                    "ON" => line.state.bright_green(),
                    "OFF" => line.state.dimmed(),
                    _ => line.state.bright_cyan(),
                };
                println!("{:<14} {:<14} {}", line.device.bright_white(), line.component, state);
            }
        }
    }
}

async fn send_command(target: &Target, command: &str) -> Result<String, Box<dyn std::error::Error>> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    if let Err(e) = socket.connect(&target.addr).await {
        eprintln!("{} Cannot reach station daemon at {}", "❌".red(), target.addr.bright_white());
        return Err(e.into());
    }

    match tokio::time::timeout(target.timeout, async {
        socket.send(command.as_bytes()).await?;
        let mut buffer = vec![0; MAX_DATAGRAM_SIZE];
        let n = socket.recv(&mut buffer).await?;
        Ok::<_, std::io::Error>(String::from_utf8_lossy(&buffer[..n]).into_owned())
    })
    .await
    {
        Ok(result) => Ok(result?),
        Err(_) => {
            eprintln!(
                "{} No reply from {} after {}s",
                "⏰".yellow(),
                target.addr.bright_white(),
                target.timeout.as_secs()
            );
            eprintln!("{} Is stationd running? Start it with:", "💡".yellow());
            eprintln!("   {}", "stationd --config /etc/stationd.toml".bright_cyan());
            Err("Command timeout".into())
        }
    }
}
