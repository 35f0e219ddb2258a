use anyhow::{Context, Result};
use clap::{Arg, Command};
use log::LevelFilter;
use std::env;
use voice_ir::types::element::TimeSignature;
use voice_ir::{VoiceOptions, parse_events, replay_events};

fn main() -> Result<()> {
    let matches = Command::new("voice-ir")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds the structure of one voice from an event script")
        .arg(
            Arg::new("input")
                .help("Input event script (.vevents)")
                .required(true)
                .value_name("INPUT_FILE")
                .index(1),
        )
        .arg(
            Arg::new("voice")
                .help("Voice number")
                .long("voice")
                .value_name("NUMBER")
                .default_value("1")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("time")
                .help("Time signature in force before the first time element (e.g. 3/4)")
                .long("time")
                .value_name("SIGNATURE")
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("no-rest-compression")
                .help("Keep multiple rests as plain measures")
                .long("no-rest-compression")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-measures-repeat-compression")
                .help("Keep repeated measures as plain measures")
                .long("no-measures-repeat-compression")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("trace-repeats")
                .help("Trace repeat handling")
                .long("trace-repeats")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("trace-measures")
                .help("Trace measure creation and finalization")
                .long("trace-measures")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("trace-compressions")
                .help("Trace rest measures and measures repeats")
                .long("trace-compressions")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .help("Enable verbose output (all traces, debug logging)")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");

    let mut log_builder = env_logger::builder();
    if env::var("RUST_LOG").is_err() {
        log_builder.filter_level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        });
    }
    log_builder.init();

    let input_file = matches
        .get_one::<String>("input")
        .context("Missing input file")?;
    let voice_number = matches.get_one::<u32>("voice").copied().unwrap_or(1);

    let mut options = VoiceOptions {
        trace_repeats: verbose || matches.get_flag("trace-repeats"),
        trace_measures: verbose || matches.get_flag("trace-measures"),
        trace_compressions: verbose || matches.get_flag("trace-compressions"),
        compress_rest_measures: !matches.get_flag("no-rest-compression"),
        compress_measures_repeats: !matches.get_flag("no-measures-repeat-compression"),
        ..VoiceOptions::default()
    };
    if let Some(time) = matches.get_one::<String>("time") {
        let time = time
            .parse::<TimeSignature>()
            .with_context(|| format!("Invalid time signature: {}", time))?;
        options = options.with_default_time(time);
    }

    let content = std::fs::read_to_string(input_file)
        .with_context(|| format!("Failed to read input file: {}", input_file))?;
    let event_file = parse_events(&content)
        .with_context(|| format!("Failed to parse event script: {}", input_file))?;
    log::info!(
        "{}: {} events, {} measures",
        input_file,
        event_file.get_events().len(),
        event_file.measure_count()
    );

    let voice = replay_events(&event_file, voice_number, options)
        .with_context(|| format!("Failed to build voice {} from {}", voice_number, input_file))?;
    let tree = voice.tree()?;

    println!("{}", tree);
    for warning in voice.warnings() {
        println!("warning: {}", warning);
    }

    Ok(())
}
