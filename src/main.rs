use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use colored::*;
use std::time::Duration;

use onvif_scout::{
    config::DiscoveryConfig,
    discovery::{CollectPlan, DiscoveryService},
    output::{OutputConfig, OutputFormat, OutputManager},
    ptz::{client::ptz_service_url, Credentials, PtzClient},
};

const PTZ_ACTIONS: [&str; 10] = [
    "move",
    "stop",
    "absolute",
    "relative",
    "home",
    "set-home",
    "presets",
    "goto-preset",
    "set-preset",
    "capabilities",
];

fn axis(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("VALUE")
        .help(help)
        .value_parser(value_parser!(f32))
        .allow_negative_numbers(true)
        .default_value("0")
}

fn cli() -> Command {
    Command::new("onvif-scout")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Find ONVIF cameras on the local network and drive their PTZ heads")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("More logging (-v info, -vv debug)")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("output-format")
                .short('o')
                .long("output-format")
                .value_name("FORMAT")
                .help("text or json")
                .default_value("text")
                .global(true),
        )
        .subcommand(
            Command::new("discover")
                .about("Discover ONVIF devices")
                .arg(
                    Arg::new("network")
                        .value_name("NETWORK")
                        .help("Target network: auto, a.b.c.d/nn, a.b.c.d/m.m.m.m or a bare address (/24)"),
                )
                .arg(
                    Arg::new("attempts")
                        .long("attempts")
                        .value_name("N")
                        .help("Collection attempts")
                        .value_parser(value_parser!(u32).range(1..)),
                )
                .arg(
                    Arg::new("timeout")
                        .short('t')
                        .long("timeout")
                        .value_name("SECS")
                        .help("Wait per collection attempt")
                        .value_parser(value_parser!(u64).range(1..)),
                )
                .arg(
                    Arg::new("max")
                        .short('m')
                        .long("max")
                        .value_name("N")
                        .help("Maximum devices to report")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("output-file")
                        .long("output-file")
                        .value_name("FILE")
                        .help("Write results to FILE"),
                ),
        )
        .subcommand(
            Command::new("ptz")
                .about("Send a PTZ command")
                .arg(
                    Arg::new("url")
                        .required(true)
                        .value_name("URL")
                        .help("PTZ service URL, or a device service URL to derive it from"),
                )
                .arg(
                    Arg::new("action")
                        .required(true)
                        .value_name("ACTION")
                        .value_parser(PTZ_ACTIONS),
                )
                .arg(Arg::new("user").short('u').long("user").value_name("USER"))
                .arg(
                    Arg::new("pass")
                        .short('p')
                        .long("pass")
                        .value_name("PASS")
                        .requires("user"),
                )
                .arg(
                    Arg::new("profile")
                        .long("profile")
                        .value_name("TOKEN")
                        .help("Media profile token")
                        .default_value("profile_1"),
                )
                .arg(axis("pan", "Pan velocity, position or offset"))
                .arg(axis("tilt", "Tilt velocity, position or offset"))
                .arg(axis("zoom", "Zoom velocity, position or offset"))
                .arg(
                    Arg::new("token")
                        .long("token")
                        .value_name("TOKEN")
                        .help("Preset token for goto-preset"),
                )
                .arg(
                    Arg::new("name")
                        .long("name")
                        .value_name("NAME")
                        .help("Preset name for set-preset"),
                )
                .arg(
                    Arg::new("timeout")
                        .short('t')
                        .long("timeout")
                        .value_name("SECS")
                        .value_parser(value_parser!(u64).range(1..))
                        .default_value("10"),
                ),
        )
}

fn output_manager(matches: &ArgMatches, file: Option<String>) -> anyhow::Result<OutputManager> {
    let format = matches
        .get_one::<String>("output-format")
        .map(|f| f.parse::<OutputFormat>())
        .transpose()
        .map_err(anyhow::Error::msg)?
        .unwrap_or(OutputFormat::Text);

    let use_color = !matches.get_flag("no-color");
    if !use_color {
        colored::control::set_override(false);
    }

    Ok(OutputManager::new(OutputConfig {
        format,
        file,
        colored: use_color,
    }))
}

async fn run_discover(matches: &ArgMatches, output: OutputManager) -> anyhow::Result<()> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => {
            DiscoveryConfig::from_toml_file(path).with_context(|| format!("loading {}", path))?
        }
        None => DiscoveryConfig::load_default_config(),
    };

    if let Some(network) = matches.get_one::<String>("network") {
        config.network = network.clone();
    }
    if let Some(&max) = matches.get_one::<usize>("max") {
        config.max_devices = max;
    }
    config.validate()?;

    let plan = match (matches.get_one::<u32>("attempts"), matches.get_one::<u64>("timeout")) {
        (None, None) => None,
        (attempts, secs) => Some(CollectPlan {
            attempts: attempts.copied().unwrap_or(config.collect_attempts),
            timeout: secs
                .map(|s| Duration::from_secs(*s))
                .unwrap_or_else(|| config.collect_timeout_duration()),
        }),
    };

    let network = config.network.clone();
    let capacity = config.max_devices;
    let service = DiscoveryService::new(config);

    log::info!("Discovering on {}", network);
    let report = service.run(&network, capacity, plan).await?;
    output.write_report(&report)?;
    Ok(())
}

async fn run_ptz(matches: &ArgMatches, output: OutputManager) -> anyhow::Result<()> {
    let url = matches.get_one::<String>("url").map(String::as_str).unwrap_or_default();
    let service_url = if url.contains("ptz") {
        url.to_string()
    } else {
        ptz_service_url(url)
    };

    let profile = matches.get_one::<String>("profile").map(String::as_str).unwrap_or("profile_1");
    let timeout = Duration::from_secs(matches.get_one::<u64>("timeout").copied().unwrap_or(10));

    let mut client = PtzClient::new(&service_url, profile, timeout)?;
    if let Some(user) = matches.get_one::<String>("user") {
        let pass = matches.get_one::<String>("pass").cloned().unwrap_or_default();
        client = client.with_credentials(Credentials::new(user.clone(), pass));
    }

    let value = |name: &str| matches.get_one::<f32>(name).copied().unwrap_or(0.0);
    let (pan, tilt, zoom) = (value("pan"), value("tilt"), value("zoom"));

    let action = matches.get_one::<String>("action").map(String::as_str).unwrap_or_default();
    match action {
        "move" => client.continuous_move(pan, tilt, zoom).await?,
        "stop" => client.stop(true, true).await?,
        "absolute" => client.absolute_move(pan, tilt, zoom).await?,
        "relative" => client.relative_move(pan, tilt, zoom).await?,
        "home" => client.goto_home_position().await?,
        "set-home" => client.set_home_position().await?,
        "presets" => {
            let presets = client.get_presets().await?;
            output.write_presets(&presets)?;
            return Ok(());
        }
        "goto-preset" => {
            let Some(token) = matches.get_one::<String>("token") else {
                bail!("goto-preset needs --token");
            };
            client.goto_preset(token).await?
        }
        "set-preset" => {
            let name = matches.get_one::<String>("name").map(String::as_str).unwrap_or("");
            let token = client.set_preset(name).await?;
            println!("{} preset token {}", "[✓]".bright_green(), token.bright_cyan());
            return Ok(());
        }
        "capabilities" => {
            output.write_capabilities(&client.get_capabilities())?;
            return Ok(());
        }
        other => bail!("unknown PTZ action {}", other),
    }

    println!("{} {} sent to {}", "[✓]".bright_green(), action, client.service_url());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let level = match matches.get_count("verbose") {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match matches.subcommand() {
        Some(("discover", sub)) => {
            let file = sub.get_one::<String>("output-file").cloned();
            run_discover(sub, output_manager(sub, file)?).await
        }
        Some(("ptz", sub)) => run_ptz(sub, output_manager(sub, None)?).await,
        _ => bail!("no subcommand given"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn test_ptz_negative_axis_values() {
        let args = [
            "onvif-scout",
            "ptz",
            "http://10.0.0.5/onvif/ptz_service",
            "move",
            "--pan",
            "-0.5",
        ];
        let matches = cli().try_get_matches_from(args).unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(sub.get_one::<f32>("pan"), Some(&-0.5));
        assert_eq!(sub.get_one::<f32>("tilt"), Some(&0.0));
    }

    #[test]
    fn test_discover_rejects_zero_attempts() {
        let args = ["onvif-scout", "discover", "--attempts", "0"];
        assert!(cli().try_get_matches_from(args).is_err());
    }
}
