use clap::{App, Arg};
use stationd::config::StationConfig;
use stationd::{PinAllocator, Station, StationServer, SystemClock};
use std::fs::OpenOptions;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{error, info, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("stationd")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Space Systems Engineering Team")
        .about("📡 Ground station RF interlock daemon")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("bind")
                .short("b")
                .long("bind")
                .value_name("ADDR")
                .help("UDP address to listen on (overrides network.bind)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("simulate")
                .long("simulate")
                .help("Drive in-memory lines instead of sysfs GPIO"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log at debug level"),
        )
        .get_matches();

    let mut config = match matches.value_of("config") {
        Some(path) => StationConfig::load(Path::new(path))?,
        None => StationConfig::default(),
    };
    if let Some(bind) = matches.value_of("bind") {
        config.network.bind = bind.to_string();
    }
    if matches.is_present("simulate") {
        config.simulate();
    }
    if matches.is_present("verbose") {
        config.logging.level = "debug".to_string();
    }
    config.validate()?;

    init_logging(&config)?;

    println!("📡 Station Daemon");
    println!("=================");
    println!("   backend: {:?}", config.gpio.backend);
    println!("   bind:    {}", config.network.bind);

    let mut allocator = PinAllocator::new(&config);
    let station = Station::open(&config, &mut allocator, Arc::new(SystemClock))?;

    let server = StationServer::bind(config.bind_addr()?, station).await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {e}");
            }
        })
        .await?;

    info!("Station daemon stopped");
    Ok(())
}

fn init_logging(config: &StationConfig) -> Result<(), Box<dyn std::error::Error>> {
    let level = Level::from_str(&config.logging.level)
        .map_err(|_| format!("invalid logging.level '{}'", config.logging.level))?;

    match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
