// region:    --- Modules
mod cli;
// endregion: --- Modules

use clap::Parser;
use krim::{
	config::Config,
	controller::Krim,
	events::BootClockResolver,
	runtime::AyaRuntime,
	Result,
};
use tracing_subscriber::EnvFilter;
#[rustfmt::skip]
use tracing::{debug, info};

use crate::cli::args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
	let args = Cli::parse();
	tracing_subscriber::fmt()
		.with_target(false)
		.with_env_filter(EnvFilter::from_default_env())
		.init();

	let mut config = match &args.config {
		Some(path) => Config::from_file(path)?,
		None => Config::default(),
	};
	if let Some(events) = args.events {
		config.options.events = events;
	}
	if let Some(output) = args.output {
		config.options.output = Some(output);
	}
	if let Some(object) = args.object {
		config.ebpf.object = object;
	}

	// Bump the memlock rlimit. This is needed for older kernels that don't use the
	// new memcg based accounting, see https://lwn.net/Articles/837122/
	let rlim = libc::rlimit {
		rlim_cur: libc::RLIM_INFINITY,
		rlim_max: libc::RLIM_INFINITY,
	};
	let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
	if ret != 0 {
		debug!("remove limit on locked memory failed, ret is: {ret}");
	}

	let resolver = BootClockResolver::new()?;
	if let Some(boot_epoch) = resolver.boot_epoch() {
		debug!("boot epoch {}", humantime::format_rfc3339_nanos(boot_epoch));
	}
	let runtime = AyaRuntime::new(&config.ebpf.object).with_perf_map(&config.ebpf.perf_map);
	let mut krim = Krim::new(config.options, runtime, resolver)?;
	krim.start()?;

	match args.time {
		Some(duration) => {
			let duration: std::time::Duration = duration.into();
			info!("running for {}", humantime::format_duration(duration));
			tokio::select! {
				_ = tokio::time::sleep(duration) => {}
				res = tokio::signal::ctrl_c() => res?,
			}
		}
		None => {
			info!("waiting for Ctrl-C...");
			tokio::signal::ctrl_c().await?;
		}
	}

	krim.stop();

	Ok(())
}
