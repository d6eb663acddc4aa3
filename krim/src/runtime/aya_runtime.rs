use std::{
	collections::HashSet,
	path::PathBuf,
	sync::{Arc, RwLock},
};

use aya::{
	maps::{perf::PerfEventArrayBuffer, MapData, PerfEventArray, ProgramArray},
	programs::{KProbe, TracePoint},
	util::online_cpus,
	Ebpf,
};
use bytes::BytesMut;
use krim_common as wire;
use tokio::{
	io::{unix::AsyncFd, Interest},
	runtime::Handle,
	task::JoinSet,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
	error::{Error, Result},
	events::Event,
	probes::{AttachPlan, AttachPoint, ControlFlowEdge, HookType},
	runtime::{CleanupMode, Delivery, InstrumentationRuntime},
};

const PERF_BATCH: usize = 16;
const PERF_RECORD_CAPACITY: usize = 1024;

/// Loads the compiled kernel object with aya and polls its perf event array, one tokio task
/// per online CPU.
pub struct AyaRuntime {
	object: PathBuf,
	perf_map: String,
	plan: Option<AttachPlan>,

	ebpf: Option<Ebpf>,
	loaded: Vec<(&'static str, HookType)>,
	prog_arrays: Vec<(&'static str, ProgramArray<MapData>)>,
	perf: Option<PerfEventArray<MapData>>,
	running: bool,

	shutdown: CancellationToken,
	workers: JoinSet<Result<()>>,
	// Held shared for each delivered batch, exclusively by `stop`.
	delivery_gate: Arc<RwLock<()>>,
}

impl AyaRuntime {
	pub fn new(object: impl Into<PathBuf>) -> Self {
		Self {
			object: object.into(),
			perf_map: wire::EVENTS_MAP.to_string(),
			plan: None,
			ebpf: None,
			loaded: Vec::new(),
			prog_arrays: Vec::new(),
			perf: None,
			running: false,
			shutdown: CancellationToken::new(),
			workers: JoinSet::new(),
			delivery_gate: Arc::new(RwLock::new(())),
		}
	}

	pub fn with_perf_map(mut self, perf_map: impl Into<String>) -> Self {
		self.perf_map = perf_map.into();
		self
	}

	pub fn is_running(&self) -> bool {
		self.running
	}

	fn try_start(&mut self, delivery: Arc<dyn Delivery>) -> Result<()> {
		let plan = self.plan.clone().ok_or(Error::NotConfigured)?;
		let handle = Handle::try_current().map_err(|err| Error::custom(format!("no tokio runtime: {err}")))?;

		let mut ebpf = Ebpf::load_file(&self.object)?;
		if let Err(e) = aya_log::EbpfLogger::init(&mut ebpf) {
			// This can happen if the object carries no log statements.
			warn!("failed to initialize eBPF logger: {e}");
		}

		// -- Attach points
		let mut attached: HashSet<&str> = HashSet::new();
		for point in &plan.attach_points {
			match attach_point(&mut ebpf, point) {
				Ok(()) => {
					attached.insert(point.id);
					self.loaded.push((point.id, point.hook));
				}
				Err(err) if plan.is_optional(point.id) => {
					warn!(probe = %point, "optional attach point skipped: {err}");
				}
				Err(err) => warn!(probe = %point, "attach failed: {err}"),
			}
		}
		if let Some(selector) = plan.unsatisfied(&attached) {
			return Err(Error::SelectorUnsatisfied(selector.to_string()));
		}

		// -- Tail-call routes
		self.prog_arrays = take_program_arrays(&mut ebpf, &plan.routes)?;
		for route in &plan.routes {
			let loaded = self.loaded.iter().any(|(id, _)| *id == route.program);
			let program: &mut TracePoint = ebpf
				.program_mut(route.program)
				.ok_or_else(|| Error::EbpfProgNotFound(route.program.to_string()))?
				.try_into()?;
			if !loaded {
				program.load()?;
				self.loaded.push((route.program, HookType::TracePoint));
			}
			let (_, array) = self
				.prog_arrays
				.iter_mut()
				.find(|(name, _)| *name == route.program_array)
				.ok_or_else(|| Error::EbpfMapNotFound(route.program_array.to_string()))?;
			array.set(route.key, program.fd()?, 0)?;
		}

		// -- Per-CPU readers
		let map = ebpf
			.take_map(&self.perf_map)
			.ok_or_else(|| Error::EbpfMapNotFound(self.perf_map.clone()))?;
		let mut perf = PerfEventArray::try_from(map)?;
		let cpus = online_cpus().map_err(|(_, error)| error)?;
		for cpu_id in cpus.iter().copied() {
			let buf = AsyncFd::with_interest(perf.open(cpu_id, None)?, Interest::READABLE)?;
			let worker = CpuWorker {
				buf,
				batch: BatchDelivery {
					cpu_id,
					delivery: delivery.clone(),
					shutdown: self.shutdown.clone(),
					delivery_gate: self.delivery_gate.clone(),
				},
			};
			self.workers.spawn_on(worker.run(), &handle);
		}

		info!(
			object = %self.object.display(),
			attached = attached.len(),
			routes = plan.routes.len(),
			cpus = cpus.len(),
			"instrumentation started"
		);
		self.perf = Some(perf);
		self.ebpf = Some(ebpf);
		self.running = true;
		Ok(())
	}

	fn unload_programs(&mut self) -> Result<()> {
		let Some(ebpf) = self.ebpf.as_mut() else {
			return Ok(());
		};

		let mut first_err = None;
		for (id, hook) in self.loaded.drain(..) {
			if let Err(err) = unload_program(ebpf, id, hook) {
				warn!(program = id, "unload failed: {err}");
				first_err.get_or_insert(err);
			}
		}
		first_err.map_or(Ok(()), Err)
	}

	fn release(&mut self) {
		self.running = false;
		self.loaded.clear();
		self.prog_arrays.clear();
		self.perf = None;
		self.ebpf = None;
	}
}

impl InstrumentationRuntime for AyaRuntime {
	fn configure(&mut self, plan: AttachPlan) -> Result<()> {
		if self.is_running() {
			return Err(Error::AlreadyStarted);
		}
		debug!(points = plan.attach_points.len(), routes = plan.routes.len(), "runtime configured");
		self.plan = Some(plan);
		Ok(())
	}

	fn start(&mut self, delivery: Arc<dyn Delivery>) -> Result<()> {
		if self.is_running() {
			return Err(Error::AlreadyStarted);
		}

		let res = self.try_start(delivery);
		if res.is_err() {
			self.shutdown.cancel();
			self.workers.abort_all();
			self.release();
			self.shutdown = CancellationToken::new();
		}
		res
	}

	fn stop(&mut self, mode: CleanupMode) -> Result<()> {
		if !self.is_running() {
			return Ok(());
		}

		self.shutdown.cancel();
		{
			// waits for in-flight batches
			let _gate = self.delivery_gate.write()?;
			self.workers.abort_all();
		}
		self.running = false;
		self.shutdown = CancellationToken::new();

		let res = match mode {
			CleanupMode::DetachPrograms => self.unload_programs(),
			CleanupMode::CleanAll => Ok(()),
		};
		if mode == CleanupMode::CleanAll || res.is_err() {
			self.release();
		}
		info!(?mode, "instrumentation stopped");
		res
	}
}

// region:    --- Loading

fn attach_point(ebpf: &mut Ebpf, point: &AttachPoint) -> Result<()> {
	let program = ebpf
		.program_mut(point.id)
		.ok_or_else(|| Error::EbpfProgNotFound(point.id.to_string()))?;

	match point.hook {
		HookType::TracePoint => {
			let (category, name) = point
				.tracepoint_parts()
				.ok_or_else(|| Error::custom(format!("invalid tracepoint target '{}'", point.target)))?;
			let tp: &mut TracePoint = program.try_into()?;
			tp.load()?;
			tp.attach(category, name)?;
		}
		// kprobe vs kretprobe is fixed by the program section
		HookType::KProbe | HookType::KRetProbe => {
			let kp: &mut KProbe = program.try_into()?;
			kp.load()?;
			kp.attach(point.target, 0)?;
		}
	}
	Ok(())
}

fn unload_program(ebpf: &mut Ebpf, id: &str, hook: HookType) -> Result<()> {
	let program = ebpf
		.program_mut(id)
		.ok_or_else(|| Error::EbpfProgNotFound(id.to_string()))?;
	match hook {
		HookType::TracePoint => {
			let tp: &mut TracePoint = program.try_into()?;
			tp.unload()?;
		}
		HookType::KProbe | HookType::KRetProbe => {
			let kp: &mut KProbe = program.try_into()?;
			kp.unload()?;
		}
	}
	Ok(())
}

/// One `ProgramArray` per distinct array name, in first-use order.
fn take_program_arrays(
	ebpf: &mut Ebpf,
	routes: &[ControlFlowEdge],
) -> Result<Vec<(&'static str, ProgramArray<MapData>)>> {
	let mut names: Vec<&'static str> = Vec::new();
	for route in routes {
		if !names.contains(&route.program_array) {
			names.push(route.program_array);
		}
	}

	names
		.into_iter()
		.map(|name| {
			let map = ebpf
				.take_map(name)
				.ok_or_else(|| Error::EbpfMapNotFound(name.to_string()))?;
			Ok((name, ProgramArray::try_from(map)?))
		})
		.collect()
}

// endregion: --- Loading

// region:    --- CpuWorker

/// Hands one batch of raw records to the delivery, unless shutdown has begun.
struct BatchDelivery {
	cpu_id: u32,
	delivery: Arc<dyn Delivery>,
	shutdown: CancellationToken,
	delivery_gate: Arc<RwLock<()>>,
}

impl BatchDelivery {
	/// Returns `false` once shutdown has begun. A failed record never stops the rest of the
	/// batch.
	fn deliver<B: AsRef<[u8]>>(&self, scratch: &mut Event, batch: &[B]) -> Result<bool> {
		let _gate = self.delivery_gate.read()?;
		if self.shutdown.is_cancelled() {
			return Ok(false);
		}

		for data in batch.iter().map(AsRef::as_ref) {
			if let Err(err) = self.delivery.deliver(scratch, data) {
				if err.is_decode() {
					debug!(cpu = self.cpu_id, len = data.len(), "dropping record: {err}");
				} else {
					warn!(cpu = self.cpu_id, "delivery failed: {err}");
				}
			}
		}
		Ok(true)
	}
}

struct CpuWorker {
	buf: AsyncFd<PerfEventArrayBuffer<MapData>>,
	batch: BatchDelivery,
}

impl CpuWorker {
	async fn run(mut self) -> Result<()> {
		let cpu_id = self.batch.cpu_id;
		let mut scratch = Event::new();
		let mut buffers = (0..PERF_BATCH)
			.map(|_| BytesMut::with_capacity(PERF_RECORD_CAPACITY))
			.collect::<Vec<_>>();

		loop {
			let mut guard = tokio::select! {
				_ = self.batch.shutdown.cancelled() => break,
				ready = self.buf.readable_mut() => match ready {
					Ok(guard) => guard,
					Err(err) => {
						warn!(cpu = cpu_id, "perf buffer readable_mut failed: {err}");
						break;
					}
				},
			};

			let events = match guard.get_inner_mut().read_events(&mut buffers) {
				Ok(events) => events,
				Err(err) => {
					warn!(cpu = cpu_id, "perf buffer read_events failed: {err}");
					guard.clear_ready();
					continue;
				}
			};
			guard.clear_ready();

			if events.lost > 0 {
				warn!(cpu = cpu_id, lost = events.lost, "perf buffer lost samples");
			}
			if !self.batch.deliver(&mut scratch, &buffers[..events.read])? {
				break;
			}
		}

		debug!(cpu = cpu_id, "perf worker exiting");
		Ok(())
	}
}

// endregion: --- CpuWorker

// region:    --- Tests


// endregion: --- Tests
