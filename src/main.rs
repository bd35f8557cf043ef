//! Doorflow field worker CLI
//!
//! Entry point for the `doorflow-field` command-line tool.

use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use doorflow_field::api::{Job, MediaKind, Role, ScheduleRequest};
use doorflow_field::backend::users_with_role;
use doorflow_field::capture::{SignatureStrokes, Stroke};
use doorflow_field::config::{ConfigError, EffectiveConfig, FieldSettings};
use doorflow_field::connectivity::{ConnectivityMonitor, Transition};
use doorflow_field::session::{format_elapsed, EXIT_BACKEND, EXIT_STORE, EXIT_SYNC, EXIT_VALIDATION};
use doorflow_field::store::{QueuedChange, StoreError};
use doorflow_field::sync::{sync_device, JobSyncReport};
use doorflow_field::{
    logging, Backend, BackendError, CameraCapture, CaptureError, Column, DeviceStore, DispatchBoard, DispatchError,
    FileCamera, HttpBackend, JobWorkerSession, SessionError, SignOff, SignaturePad,
};

#[derive(Parser)]
#[command(name = "doorflow-field")]
#[command(about = "Offline-capable field job worker", version)]
struct Cli {
    /// Config file (default: ~/.config/doorflow/field.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Device store directory
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, global = true)]
    api: Option<String>,

    /// Work from the device cache without contacting the backend
    #[arg(long, global = true)]
    offline: bool,

    /// Log level or filter directive
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List field jobs
    Jobs {
        /// Only jobs scheduled on this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Field job actions
    Job {
        #[command(subcommand)]
        action: JobCommands,
    },

    /// Door actions
    Door {
        #[command(subcommand)]
        action: DoorCommands,
    },

    /// Checklist actions
    LineItem {
        #[command(subcommand)]
        action: LineItemCommands,
    },

    /// Photo and video evidence
    Media {
        #[command(subcommand)]
        action: MediaCommands,
    },

    /// Show changes and media waiting to be synced
    Queue,

    /// Replay queued changes and upload stored media
    Sync {
        /// Only this job (default: every job with pending work)
        job_id: Option<String>,
    },

    /// Probe connectivity until interrupted, syncing on reconnect
    Watch {
        /// Keep this job open and show its elapsed time
        job_id: Option<String>,
    },

    /// Today's field counts
    Summary,

    /// Schedule a job on a date
    Schedule {
        job_id: String,
        date: NaiveDate,
        #[arg(long)]
        truck: Option<String>,
    },

    /// Dispatch board
    Dispatch {
        #[command(subcommand)]
        action: DispatchCommands,
    },

    /// List dashboard users
    Users {
        /// Only users with this role
        #[arg(long)]
        role: Option<Role>,
    },

    /// Device cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },

    /// Configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Customer signature arguments shared by sign-off commands
#[derive(clap::Args)]
struct SignOffArgs {
    /// Strokes JSON exported by a drawing surface
    #[arg(long)]
    signature: PathBuf,

    /// Name of the person signing
    #[arg(long)]
    signer: String,

    /// Title of the person signing
    #[arg(long)]
    title: Option<String>,
}

#[derive(Subcommand)]
enum JobCommands {
    /// Show a job with its doors
    Show { job_id: String },

    /// Start work with the customer's sign-off
    Start {
        job_id: String,
        #[command(flatten)]
        sign_off: SignOffArgs,
    },

    /// Complete the job once every door is done
    Complete {
        job_id: String,
        #[command(flatten)]
        sign_off: SignOffArgs,
    },
}

#[derive(Subcommand)]
enum DoorCommands {
    /// Sign off a door whose checklist and media are complete
    Complete {
        job_id: String,
        door_id: String,
        #[command(flatten)]
        sign_off: SignOffArgs,
    },
}

#[derive(Subcommand)]
enum LineItemCommands {
    /// Flip a checklist item
    Toggle {
        job_id: String,
        door_id: String,
        line_item_id: String,
    },
}

#[derive(Subcommand)]
enum MediaCommands {
    /// Attach a photo or video file to a door
    Attach {
        job_id: String,
        door_id: String,
        #[arg(long, conflicts_with = "video", required_unless_present = "video")]
        photo: Option<PathBuf>,
        #[arg(long)]
        video: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum DispatchCommands {
    /// Show the board for a date
    Show { date: NaiveDate },

    /// Move a job to a truck (or "unassigned") and save the board
    Assign {
        date: NaiveDate,
        job_id: String,
        to: Column,
        /// Position in the column (default: end)
        #[arg(long)]
        index: Option<usize>,
        /// Hide the job from the technician
        #[arg(long)]
        hidden: bool,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Drop completed jobs with nothing left to sync
    Prune,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration with secrets redacted
    Show,
}

/// Command failure with its exit code
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Usage(String),

    #[error("Sync incomplete for {0} job(s)")]
    SyncIncomplete(usize),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Session(e) => e.exit_code(),
            CliError::Backend(_) => EXIT_BACKEND,
            CliError::Store(_) => EXIT_STORE,
            CliError::SyncIncomplete(_) => EXIT_SYNC,
            CliError::Config(_) | CliError::Read { .. } => 1,
            CliError::Capture(_) | CliError::Dispatch(_) | CliError::Usage(_) => EXIT_VALIDATION,
        }
    }
}

type CliResult = Result<(), CliError>;

/// Everything a command may need, built once from the effective config
struct Context {
    settings: FieldSettings,
    effective: EffectiveConfig,
    backend: Arc<dyn Backend>,
    monitor: ConnectivityMonitor,
    json: bool,
    store_root: PathBuf,
}

impl Context {
    fn open_store(&self) -> Result<DeviceStore, CliError> {
        Ok(DeviceStore::open(&self.store_root)?)
    }

    fn session(&self) -> Result<JobWorkerSession, CliError> {
        Ok(
            JobWorkerSession::new(self.backend.clone(), self.open_store()?, self.monitor.handle())
                .with_config(self.settings.session_config()),
        )
    }

    fn require_online(&self) -> CliResult {
        if self.monitor.is_online() {
            Ok(())
        } else {
            Err(SessionError::Offline.into())
        }
    }

    fn sign_off(&self, args: &SignOffArgs) -> Result<SignOff, CliError> {
        let text = fs::read_to_string(&args.signature).map_err(|source| CliError::Read {
            path: args.signature.clone(),
            source,
        })?;
        let file: StrokeFile = serde_json::from_str(&text).map_err(CaptureError::from)?;
        let strokes = SignatureStrokes {
            width: file.width.unwrap_or(self.settings.capture.signature_width),
            height: file.height.unwrap_or(self.settings.capture.signature_height),
            strokes: file.strokes,
        };
        let signature = SignaturePad::from_strokes(strokes)?
            .with_pen_width(self.settings.capture.signature_pen_width)
            .finish()?;

        let sign_off = SignOff::new(signature, args.signer.clone());
        Ok(match &args.title {
            Some(title) => sign_off.with_title(title.clone()),
            None => sign_off,
        })
    }
}

/// Strokes file; the canvas falls back to the configured signature size
#[derive(Deserialize)]
struct StrokeFile {
    width: Option<u32>,
    height: Option<u32>,
    strokes: Vec<Stroke>,
}

fn main() {
    let cli = Cli::parse();

    let result = build_context(&cli).and_then(|mut ctx| run(cli.command, &mut ctx));
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if let CliError::Session(s) = &e {
            if s.is_retryable() {
                eprintln!("This can be retried later.");
            }
        }
        process::exit(e.exit_code());
    }
}

fn cli_overrides(cli: &Cli) -> Option<serde_json::Value> {
    let mut overrides = serde_json::Map::new();
    if let Some(api) = &cli.api {
        overrides.insert("api".to_string(), serde_json::json!({ "base_url": api }));
    }
    if let Some(store) = &cli.store {
        overrides.insert("store".to_string(), serde_json::json!({ "root": store }));
    }
    if let Some(level) = &cli.log_level {
        overrides.insert("log".to_string(), serde_json::json!({ "level": level }));
    }
    if overrides.is_empty() {
        None
    } else {
        Some(serde_json::Value::Object(overrides))
    }
}

fn build_context(cli: &Cli) -> Result<Context, CliError> {
    let effective = EffectiveConfig::load(cli.config.as_deref(), cli_overrides(cli))?;
    let settings = effective.settings()?;

    if let Err(e) = logging::init_logging(&settings.log.level, settings.log.format) {
        eprintln!("Warning: {}", e);
    }

    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&settings.http_config())?);

    let online = !cli.offline && reachable(backend.as_ref());
    if !online {
        info!(forced = cli.offline, "working offline");
    }

    Ok(Context {
        store_root: settings.store_root(),
        settings,
        effective,
        backend,
        monitor: ConnectivityMonitor::new(online),
        json: cli.json,
    })
}

fn reachable(backend: &dyn Backend) -> bool {
    match backend.ping() {
        Ok(()) => true,
        Err(e) => !e.is_connectivity(),
    }
}

fn run(command: Commands, ctx: &mut Context) -> CliResult {
    match command {
        Commands::Jobs { date } => run_jobs(ctx, date),
        Commands::Job { action } => match action {
            JobCommands::Show { job_id } => run_job_show(ctx, &job_id),
            JobCommands::Start { job_id, sign_off } => {
                let sign_off = ctx.sign_off(&sign_off)?;
                with_job(ctx, &job_id, |session| session.start_job(&sign_off))
            }
            JobCommands::Complete { job_id, sign_off } => {
                let sign_off = ctx.sign_off(&sign_off)?;
                with_job(ctx, &job_id, |session| session.complete_job(&sign_off))
            }
        },
        Commands::Door { action } => match action {
            DoorCommands::Complete {
                job_id,
                door_id,
                sign_off,
            } => {
                let sign_off = ctx.sign_off(&sign_off)?;
                with_job(ctx, &job_id, |session| session.complete_door(&door_id, &sign_off))
            }
        },
        Commands::LineItem { action } => match action {
            LineItemCommands::Toggle {
                job_id,
                door_id,
                line_item_id,
            } => with_job(ctx, &job_id, |session| {
                session.toggle_line_item(&door_id, &line_item_id).map(|_| ())
            }),
        },
        Commands::Media { action } => match action {
            MediaCommands::Attach {
                job_id,
                door_id,
                photo,
                video,
            } => run_media_attach(ctx, &job_id, &door_id, photo, video),
        },
        Commands::Queue => run_queue(ctx),
        Commands::Sync { job_id } => run_sync(ctx, job_id.as_deref()),
        Commands::Watch { job_id } => run_watch(ctx, job_id.as_deref()),
        Commands::Summary => run_summary(ctx),
        Commands::Schedule { job_id, date, truck } => {
            ctx.require_online()?;
            ctx.backend.schedule_job(
                &job_id,
                &ScheduleRequest {
                    scheduled_date: date,
                    truck_id: truck,
                },
            )?;
            println!("Scheduled {} on {}", job_id, date);
            Ok(())
        }
        Commands::Dispatch { action } => match action {
            DispatchCommands::Show { date } => run_dispatch_show(ctx, date),
            DispatchCommands::Assign {
                date,
                job_id,
                to,
                index,
                hidden,
            } => run_dispatch_assign(ctx, date, &job_id, &to, index, hidden),
        },
        Commands::Users { role } => run_users(ctx, role),
        Commands::Cache { action } => match action {
            CacheCommands::Prune => run_cache_prune(ctx),
        },
        Commands::Config { action } => match action {
            ConfigCommands::Show => print_json(&ctx.effective.redacted()),
        },
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError::Usage(format!("Error serializing output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

/// Load a job, apply one action, then show the result
fn with_job<F>(ctx: &Context, job_id: &str, action: F) -> CliResult
where
    F: FnOnce(&mut JobWorkerSession) -> Result<(), SessionError>,
{
    let mut session = ctx.session()?;
    session.load_job(job_id)?;
    action(&mut session)?;

    let pending = session.pending_changes()?;
    match session.job() {
        Some(job) if ctx.json => print_json(job),
        Some(job) => {
            print_job(job);
            if pending > 0 {
                println!("\n{} change(s) waiting to sync", pending);
            }
            Ok(())
        }
        None => Ok(()),
    }
}

fn run_jobs(ctx: &Context, date: Option<NaiveDate>) -> CliResult {
    if !ctx.monitor.is_online() {
        // Offline the cache is the only listing there is
        let store = ctx.open_store()?;
        let mut jobs = Vec::new();
        for id in store.cache().job_ids()? {
            if let Some(job) = store.cache().get(&id)? {
                jobs.push(job);
            }
        }
        if ctx.json {
            return print_json(&jobs);
        }
        println!("Cached jobs ({} total, offline):\n", jobs.len());
        for job in &jobs {
            println!("  {}  {}  {}  [{}]", job.id, job.job_number, job.customer_name, job.mobile_status);
        }
        return Ok(());
    }

    let jobs = ctx.backend.field_jobs(date)?;
    if ctx.json {
        return print_json(&jobs);
    }
    if jobs.is_empty() {
        println!("No field jobs.");
        return Ok(());
    }
    println!("Field jobs ({} total):\n", jobs.len());
    for job in &jobs {
        let scheduled = job.scheduled_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "  {}  {}  {}  {}  doors: {}  [{}]",
            job.id, job.job_number, job.customer_name, scheduled, job.door_count, job.mobile_status
        );
    }
    Ok(())
}

fn run_job_show(ctx: &Context, job_id: &str) -> CliResult {
    let mut session = ctx.session()?;
    let job = session.load_job(job_id)?;
    if ctx.json {
        return print_json(job);
    }
    print_job(job);
    if let Some(elapsed) = session.elapsed() {
        println!("\nOn site: {}", format_elapsed(elapsed));
    }
    Ok(())
}

fn print_job(job: &Job) {
    println!("{} {} [{}]", job.job_number, job.customer_name, job.mobile_status);
    if !job.address.is_empty() {
        println!("  Address: {}", job.address);
    }
    if let Some(contact) = &job.contact_name {
        match &job.contact_phone {
            Some(phone) => println!("  Contact: {} ({})", contact, phone),
            None => println!("  Contact: {}", contact),
        }
    }
    if !job.scope.is_empty() {
        println!("  Scope: {}", job.scope);
    }
    println!("  Doors: {}/{} completed", job.completed_door_count(), job.doors.len());

    for door in &job.doors {
        let mark = if door.completed { "x" } else { " " };
        println!("\n  [{}] Door {} ({}) {}", mark, door.door_number, door.id, door.location);
        if !door.dimensions.is_empty() || !door.door_type.is_empty() {
            println!("      {} {}", door.door_type, door.dimensions);
        }
        for item in &door.line_items {
            let tick = if item.completed { "x" } else { " " };
            println!("      [{}] {} ({})", tick, item.description, item.id);
        }
        println!(
            "      photo: {}  video: {}",
            if door.has_photo { "yes" } else { "no" },
            if door.has_video { "yes" } else { "no" }
        );
    }
}

fn run_media_attach(
    ctx: &Context,
    job_id: &str,
    door_id: &str,
    photo: Option<PathBuf>,
    video: Option<PathBuf>,
) -> CliResult {
    let kind = if video.is_some() { MediaKind::Video } else { MediaKind::Photo };

    let mut camera = CameraCapture::new(FileCamera::new(photo, video));
    camera.open()?;
    let payload = match kind {
        MediaKind::Photo => camera.capture_photo()?,
        MediaKind::Video => {
            camera.start_recording()?;
            camera.stop_recording()?
        }
    };
    camera.close();

    with_job(ctx, job_id, |session| session.capture_media(door_id, kind, payload))
}

#[derive(Serialize)]
struct QueueStatus {
    job_id: String,
    changes: Vec<QueuedChange>,
    media: Vec<MediaEntry>,
}

#[derive(Serialize)]
struct MediaEntry {
    door_id: String,
    kind: MediaKind,
    bytes: usize,
}

fn run_queue(ctx: &Context) -> CliResult {
    let store = ctx.open_store()?;

    let mut job_ids = store.queue().jobs_with_pending()?;
    job_ids.extend(store.media().job_ids()?);
    job_ids.sort();
    job_ids.dedup();

    let mut status = Vec::new();
    for job_id in job_ids {
        let changes = store.queue().pending(&job_id)?;
        let media = store
            .media()
            .list(&job_id)?
            .into_iter()
            .map(|m| MediaEntry {
                door_id: m.door_id,
                kind: m.kind,
                bytes: m.payload.len(),
            })
            .collect();
        status.push(QueueStatus { job_id, changes, media });
    }

    if ctx.json {
        return print_json(&status);
    }
    if status.is_empty() {
        println!("Nothing waiting to sync.");
        return Ok(());
    }
    for job in &status {
        println!("Job {}:", job.job_id);
        for change in &job.changes {
            println!("  #{} {} ({})", change.seq, change.kind(), change.created_at.format("%Y-%m-%d %H:%M:%S"));
        }
        for media in &job.media {
            println!("  {} for door {} ({} bytes)", media.kind, media.door_id, media.bytes);
        }
    }
    Ok(())
}

fn print_sync_reports(ctx: &Context, reports: &[JobSyncReport]) -> CliResult {
    if ctx.json {
        print_json(&reports)?;
    } else if reports.is_empty() {
        println!("Nothing to sync.");
    } else {
        for report in reports {
            let uploaded = report.media.uploaded.len();
            let replayed = report.drain.replayed.len();
            if report.is_complete() {
                println!("Job {}: {} upload(s), {} change(s) synced", report.job_id, uploaded, replayed);
                continue;
            }
            println!(
                "Job {}: {} upload(s), {} change(s) synced, {} still queued",
                report.job_id, uploaded, replayed, report.drain.remaining
            );
            if let Some(failure) = &report.media.failure {
                println!("  {} upload for door {} failed: {}", failure.kind, failure.door_id, failure.error);
            }
            if let Some(failure) = &report.drain.failure {
                println!("  change #{} ({}) failed: {}", failure.seq, failure.kind, failure.error);
            }
        }
    }

    let incomplete = reports.iter().filter(|r| !r.is_complete()).count();
    if incomplete > 0 {
        return Err(CliError::SyncIncomplete(incomplete));
    }
    Ok(())
}

fn run_sync(ctx: &Context, job_id: Option<&str>) -> CliResult {
    ctx.require_online()?;
    match job_id {
        Some(job_id) => {
            let mut session = ctx.session()?;
            session.load_job(job_id)?;
            let report = session.sync()?;
            print_sync_reports(ctx, std::slice::from_ref(&report))
        }
        None => {
            let store = ctx.open_store()?;
            let reports = sync_device(&store, ctx.backend.as_ref())?;
            print_sync_reports(ctx, &reports)
        }
    }
}

fn run_watch(ctx: &mut Context, job_id: Option<&str>) -> CliResult {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .map_err(|e| CliError::Usage(format!("Cannot install Ctrl-C handler: {}", e)))?;

    let mut session = match job_id {
        Some(id) => {
            let mut session = ctx.session()?;
            session.load_job(id)?;
            Some(session)
        }
        None => None,
    };
    let store = ctx.open_store()?;
    let interval = ctx.settings.probe_interval();

    println!(
        "Watching connectivity every {}s ({}); Ctrl-C to stop",
        interval.as_secs(),
        if ctx.monitor.is_online() { "online" } else { "offline" }
    );

    while running.load(Ordering::SeqCst) {
        let transition = match session.as_mut() {
            Some(session) => {
                let reconnect = ctx.monitor.probe_and_sync(ctx.backend.as_ref(), session);
                if let Some(Ok(report)) = &reconnect.sync {
                    print_sync_reports(ctx, std::slice::from_ref(report)).ok();
                }
                reconnect.transition
            }
            None => {
                let transition = ctx.monitor.probe(ctx.backend.as_ref());
                if transition == Transition::CameOnline {
                    match sync_device(&store, ctx.backend.as_ref()) {
                        Ok(reports) => {
                            print_sync_reports(ctx, &reports).ok();
                        }
                        Err(e) => warn!(error = %e, "device sync failed"),
                    }
                }
                transition
            }
        };

        match transition {
            Transition::CameOnline => println!("Online"),
            Transition::WentOffline => println!("Offline, changes will be queued"),
            Transition::Unchanged => {}
        }
        if let Some(elapsed) = session.as_ref().and_then(JobWorkerSession::elapsed) {
            println!("On site: {}", format_elapsed(elapsed));
        }

        let deadline = Instant::now() + interval;
        while running.load(Ordering::SeqCst) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(200));
        }
    }

    println!("Stopped.");
    Ok(())
}

fn run_summary(ctx: &Context) -> CliResult {
    ctx.require_online()?;
    let summary = ctx.backend.field_summary()?;
    if ctx.json {
        return print_json(&summary);
    }
    println!("Today: {}", summary.today);
    println!("  Not started: {}", summary.not_started);
    println!("  Started:     {}", summary.started);
    println!("  Completed:   {}", summary.completed);
    Ok(())
}

fn print_board(board: &DispatchBoard) {
    println!("Dispatch for {}", board.date());
    for column in board.columns() {
        println!("\n  {} ({}):", column.title, column.cards.len());
        for (i, card) in column.cards.iter().enumerate() {
            let hidden = if card.is_visible { "" } else { "  (hidden)" };
            println!("    {}. {} {} {}{}", i + 1, card.job_id, card.job_number, card.customer_name, hidden);
        }
    }
}

fn run_dispatch_show(ctx: &Context, date: NaiveDate) -> CliResult {
    ctx.require_online()?;
    let board = DispatchBoard::from_day(&ctx.backend.dispatch(date)?);
    if ctx.json {
        return print_json(&board);
    }
    print_board(&board);
    Ok(())
}

fn run_dispatch_assign(
    ctx: &Context,
    date: NaiveDate,
    job_id: &str,
    to: &Column,
    index: Option<usize>,
    hidden: bool,
) -> CliResult {
    ctx.require_online()?;
    let mut board = DispatchBoard::from_day(&ctx.backend.dispatch(date)?);
    board.move_job(job_id, to, index.unwrap_or(usize::MAX))?;
    board.set_visible(job_id, !hidden)?;

    let request = board.to_request();
    ctx.backend.save_dispatch(&request)?;
    info!(job_id, column = %to, "dispatch saved");

    if ctx.json {
        return print_json(&request);
    }
    print_board(&board);
    Ok(())
}

fn run_users(ctx: &Context, role: Option<Role>) -> CliResult {
    ctx.require_online()?;
    let users = match &role {
        Some(role) => users_with_role(ctx.backend.as_ref(), role)?,
        None => ctx.backend.users()?,
    };
    if ctx.json {
        return print_json(&users);
    }
    println!("Users ({} total):\n", users.len());
    for user in &users {
        let name = user.full_name.as_deref().unwrap_or("");
        let inactive = if user.is_active { "" } else { "  (inactive)" };
        println!("  {}  {}  {}  [{}]{}", user.id, user.username, name, user.role, inactive);
    }
    Ok(())
}

fn run_cache_prune(ctx: &Context) -> CliResult {
    let store = ctx.open_store()?;
    let pruned = store.prune_completed()?;
    if ctx.json {
        return print_json(&pruned);
    }
    if pruned.is_empty() {
        println!("Nothing to prune.");
    } else {
        println!("Pruned {} job(s): {}", pruned.len(), pruned.join(", "));
    }
    Ok(())
}
