use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};

use classbanner::api::{ApiContext, ApiServer, ApiServerConfig, ApiSharedState, DEFAULT_API_PORT};
use classbanner::banner::controller::{BannerConfig, DEFAULT_POLL_INTERVAL, RenderSink, mount};
use classbanner::banner::render::render_text;
use classbanner::banner::state::BannerView;
use classbanner::broadcast::FormatBus;
use classbanner::diagnostics;
use classbanner::schedule::model::{ScheduleData, ScheduleError, load_schedule};
use classbanner::schedule::query::WallTime;
use classbanner::schedule::time::TimeFormat;
use classbanner::settings::{FormatToggle, SettingsStore};
use classbanner::time_provider::select_clock;

#[derive(Parser, Debug)]
#[command(
    name = "classbanner",
    version,
    about = "Live class-schedule banner: what is on now, what starts soon"
)]
struct Cli {
    #[arg(long, default_value = "schedule.json")]
    schedule: PathBuf,

    #[arg(long, default_value = "settings.json")]
    settings: PathBuf,

    /// Overrides the persisted time format for this session.
    #[arg(long, value_parser = parse_time_format)]
    time_format: Option<TimeFormat>,

    /// Pins the clock, e.g. --at "Senin 09:00".
    #[arg(long, value_parser = parse_wall_time)]
    at: Option<WallTime>,

    /// Print a schedule report and exit.
    #[arg(long)]
    check: bool,

    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    poll_secs: u64,

    /// Stop after this many seconds instead of waiting for stdin to close.
    #[arg(long)]
    run_secs: Option<u64>,

    #[arg(long)]
    api: bool,

    #[arg(long, default_value = "127.0.0.1")]
    api_bind: String,

    #[arg(long, default_value_t = DEFAULT_API_PORT)]
    api_port: u16,
}

fn parse_time_format(input: &str) -> Result<TimeFormat, String> {
    input.parse()
}

fn parse_wall_time(input: &str) -> Result<WallTime, String> {
    input.parse()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    if cli.poll_secs == 0 {
        bail!("--poll-secs must be greater than zero");
    }

    let selected = select_clock(cli.at);
    let store = SettingsStore::open(&cli.settings);
    let format = cli.time_format.unwrap_or_else(|| store.time_format());

    if cli.check {
        let schedule = load_schedule(&cli.schedule)
            .with_context(|| format!("failed to load {}", cli.schedule.display()))?;
        diagnostics::run_check(&schedule, &selected, format)?;
        return Ok(());
    }

    let schedule = load_optional_schedule(&cli.schedule)?;
    let bus = FormatBus::new();
    let toggle = Arc::new(FormatToggle::new(Some(store), bus.clone(), format));
    let api_state = Arc::new(Mutex::new(ApiSharedState::default()));

    let sink_state = Arc::clone(&api_state);
    let sink: RenderSink = Box::new(move |view: Option<&BannerView>| {
        if let Ok(mut guard) = sink_state.lock() {
            guard.publish_banner(view);
        }
        if let Some(view) = view {
            let mut stdout = io::stdout().lock();
            let _ = write!(stdout, "{}", render_text(view));
            let _ = stdout.flush();
        }
    });

    let banner = mount(
        BannerConfig {
            schedule: schedule.clone(),
            clock: Arc::clone(&selected.clock),
            format,
            poll_interval: Duration::from_secs(cli.poll_secs),
        },
        &bus,
        sink,
    );
    if !banner.is_live() {
        warn!("live banner is not running; output stays empty");
    }

    let api_server = if cli.api {
        let server = ApiServer::start(
            ApiServerConfig {
                bind_addr: cli.api_bind.clone(),
                port: cli.api_port,
            },
            ApiContext {
                state: Arc::clone(&api_state),
                schedule,
                clock: Arc::clone(&selected.clock),
                toggle: Arc::clone(&toggle),
            },
        )
        .with_context(|| {
            format!(
                "failed to start local API at {}:{}",
                cli.api_bind, cli.api_port
            )
        })?;
        Some(server)
    } else {
        None
    };

    let toggle_for_stdin = Arc::clone(&toggle);
    let stdin_join = thread::spawn(move || read_toggle_commands(&toggle_for_stdin));
    match cli.run_secs {
        Some(secs) => thread::sleep(Duration::from_secs(secs)),
        None => {
            let _ = stdin_join.join();
        }
    }

    drop(api_server);
    drop(banner);
    info!("live banner unmounted");
    Ok(())
}

fn load_optional_schedule(path: &Path) -> Result<Option<Arc<ScheduleData>>> {
    match load_schedule(path) {
        Ok(schedule) => {
            info!(
                "loaded {} course(s) for term '{}'",
                schedule.total_courses(),
                schedule.term
            );
            Ok(Some(Arc::new(schedule)))
        }
        Err(ScheduleError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            warn!("no schedule at {}, banner stays hidden", path.display());
            Ok(None)
        }
        Err(err) => Err(err).with_context(|| format!("failed to load {}", path.display())),
    }
}

/// Terminal side of the format switch: `12`, `24`, `toggle`, `quit`.
fn read_toggle_commands(toggle: &FormatToggle) {
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else {
            break;
        };
        match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            "toggle" => {
                toggle.toggle();
            }
            other => match other.parse::<TimeFormat>() {
                Ok(format) => {
                    toggle.set(format);
                }
                Err(err) => warn!("{err}; commands are 12, 24, toggle, quit"),
            },
        }
    }
}
