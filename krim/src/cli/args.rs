use std::path::PathBuf;

use clap::Parser;
use humantime::Duration;
use krim::events::EventTypeSet;

#[derive(Parser, Debug)]
#[command(name = "krim", about = "Kernel runtime integrity monitor")]
pub struct Cli {
	#[arg(long, help = "TOML configuration file")]
	pub config: Option<PathBuf>,

	#[arg(long, value_parser = parse_events, help = "Comma separated event kinds (e.g., bpf,ptrace). Defaults to all")]
	pub events: Option<EventTypeSet>,

	#[arg(long, help = "Line-delimited JSON output file")]
	pub output: Option<PathBuf>,

	#[arg(long, help = "Compiled kernel object to load")]
	pub object: Option<PathBuf>,

	#[arg(long, help = "Run for a fixed duration (e.g., 20s, 5m, 1h) instead of until Ctrl-C")]
	pub time: Option<Duration>,
}

fn parse_events(value: &str) -> Result<EventTypeSet, String> {
	value.parse::<EventTypeSet>().map_err(|err| err.to_string())
}

// region:    --- Tests


// endregion: --- Tests
