use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uir_core::RecoveryConfig;
use uir_grounding::ActionTranslator;
use uir_vision::{Resolution, VisualVerifier};

fn cli() -> Command {
    Command::new("uir")
        .version(uir_core::VERSION)
        .about("UI failure recovery toolkit")
        .subcommand_required(true)
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("compare")
                .about("Compare two screenshots the way the recovery loop verifies actions")
                .arg(
                    Arg::new("before")
                        .long("before")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Screenshot taken before the action"),
                )
                .arg(
                    Arg::new("after")
                        .long("after")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Screenshot taken after the action"),
                )
                .arg(
                    Arg::new("expect-change")
                        .long("expect-change")
                        .action(ArgAction::SetTrue)
                        .help("The action was expected to change the screen"),
                )
                .arg(
                    Arg::new("threshold")
                        .long("threshold")
                        .value_parser(value_parser!(f64))
                        .help("Similarity threshold (default from configuration)"),
                ),
        )
        .subcommand(
            Command::new("translate")
                .about("Translate grounding-model output into a UI action")
                .arg(Arg::new("text").required(true).help("Model output"))
                .arg(
                    Arg::new("width")
                        .long("width")
                        .default_value("1920")
                        .value_parser(value_parser!(u32))
                        .help("Actual screen width"),
                )
                .arg(
                    Arg::new("height")
                        .long("height")
                        .default_value("1080")
                        .value_parser(value_parser!(u32))
                        .help("Actual screen height"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Print the resolved configuration")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn compare(args: &ArgMatches) -> Result<()> {
    let mut config = RecoveryConfig::load(None)?.verifier;
    if let Some(threshold) = args.get_one::<f64>("threshold") {
        config = config.with_threshold(*threshold);
    }

    let mut images = Vec::with_capacity(2);
    for name in ["before", "after"] {
        let path = args
            .get_one::<PathBuf>(name)
            .with_context(|| format!("--{name} is required"))?;
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        images.push(bytes);
    }

    let expect_change = args.get_flag("expect-change");
    let result = VisualVerifier::new(config).compare(&images[0], &images[1], expect_change)?;
    tracing::info!(similarity = result.similarity, "comparison done");
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.matches_expectation {
        std::process::exit(1);
    }
    Ok(())
}

fn translate(args: &ArgMatches) -> Result<()> {
    let text = args
        .get_one::<String>("text")
        .context("model output is required")?;
    let width = args.get_one::<u32>("width").copied().unwrap_or(1920);
    let height = args.get_one::<u32>("height").copied().unwrap_or(1080);

    let config = RecoveryConfig::load(None)?;
    let reference = Resolution::new(
        config.grounding.reference_width,
        config.grounding.reference_height,
    );
    match ActionTranslator::new(reference).translate(text, Resolution::new(width, height)) {
        Ok(action) => {
            println!("{}", serde_json::to_string_pretty(&action)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::json!({ "error": e.to_string() }));
            std::process::exit(1);
        }
    }
}

fn show_config(args: &ArgMatches) -> Result<()> {
    let path = args.get_one::<PathBuf>("file");
    let config = RecoveryConfig::load(path.map(PathBuf::as_path))
        .context("configuration is invalid")?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json"));

    match matches.subcommand() {
        Some(("compare", args)) => compare(args).await,
        Some(("translate", args)) => translate(args),
        Some(("config", args)) => show_config(args),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn parses_translate_arguments() {
        let matches = cli()
            .try_get_matches_from(["uir", "translate", "Action: wait()", "--width", "1280"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "translate");
        assert_eq!(args.get_one::<u32>("width"), Some(&1280));
        assert_eq!(args.get_one::<u32>("height"), Some(&1080));
    }

    #[test]
    fn compare_requires_both_images() {
        assert!(cli()
            .try_get_matches_from(["uir", "compare", "--before", "a.png"])
            .is_err());
    }
}
