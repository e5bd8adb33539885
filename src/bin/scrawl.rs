use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use scrawl::{
    FrameIndex, InMemoryQueue, JobQueue as _, JobStatus, OutputFormat, OutputSpec, PresetCatalog,
    RenderJob, Scene, SchedulerConfig, WorkerScheduler, compose::FrameOutcome, encode, job,
};

#[derive(Parser, Debug)]
#[command(name = "scrawl", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame.
    Frame(FrameArgs),
    /// Render every frame of a scene into a directory.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output path; the extension picks the format (.svg or .png).
    #[arg(long)]
    out: PathBuf,

    /// JSON file of preset overrides, merged over the builtin catalog.
    #[arg(long)]
    preset_file: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory; frames land as frame_00000.<ext>.
    #[arg(long)]
    out_dir: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = FormatChoice::Svg)]
    format: FormatChoice,

    /// Worker concurrency.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Per-frame execution timeout in seconds (0 disables it).
    #[arg(long, default_value_t = 0)]
    timeout_secs: u64,

    /// JSON file of preset overrides, merged over the builtin catalog.
    #[arg(long)]
    preset_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Svg,
    Png,
}

impl From<FormatChoice> for OutputFormat {
    fn from(choice: FormatChoice) -> Self {
        match choice {
            FormatChoice::Svg => OutputFormat::Svg,
            FormatChoice::Png => OutputFormat::Png,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn read_scene_json(path: &Path) -> anyhow::Result<Scene> {
    let f = File::open(path).with_context(|| format!("open scene '{}'", path.display()))?;
    let r = BufReader::new(f);
    let scene: Scene = serde_json::from_reader(r).with_context(|| "parse scene JSON")?;
    Ok(scene)
}

fn load_catalog(preset_file: Option<&Path>) -> anyhow::Result<PresetCatalog> {
    match preset_file {
        None => Ok(PresetCatalog::builtin()),
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("read preset file '{}'", path.display()))?;
            Ok(PresetCatalog::builtin_with_overrides(&json)?)
        }
    }
}

fn format_for(out: &Path) -> anyhow::Result<OutputFormat> {
    match out.extension().and_then(|e| e.to_str()) {
        Some("svg") => Ok(OutputFormat::Svg),
        Some("png") => Ok(OutputFormat::Png),
        _ => anyhow::bail!(
            "cannot infer output format from '{}' (expected .svg or .png)",
            out.display()
        ),
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let scene = read_scene_json(&args.in_path)?;
    let catalog = load_catalog(args.preset_file.as_deref())?;
    let format = format_for(&args.out)?;

    let render = RenderJob {
        job_id: format!("{}/{}", scene.id, args.frame),
        scene: Arc::new(scene),
        catalog: Arc::new(catalog),
        frame: FrameIndex(args.frame),
        output: OutputSpec { format },
        timeout: None,
    };

    let control = job::JobControl::for_job(&render);
    let doc = match job::execute(&render, &control)? {
        FrameOutcome::Document(doc) => doc,
        FrameOutcome::Cancelled => anyhow::bail!("frame render was cancelled"),
    };
    let bytes = encode::encode(&doc, format)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, bytes)
        .with_context(|| format!("write frame '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let scene = read_scene_json(&args.in_path)?;
    scene.validate()?;
    let catalog = Arc::new(load_catalog(args.preset_file.as_deref())?);
    let format: OutputFormat = args.format.into();

    let frames = scene.frame_count();
    let scene = Arc::new(scene);
    let timeout = (args.timeout_secs > 0).then(|| Duration::from_secs(args.timeout_secs));

    let queue = InMemoryQueue::bounded(frames as usize);
    for f in 0..frames {
        queue.enqueue(RenderJob {
            job_id: format!("frame_{f:05}"),
            scene: Arc::clone(&scene),
            catalog: Arc::clone(&catalog),
            frame: FrameIndex(f),
            output: OutputSpec { format },
            timeout,
        })?;
    }

    let config = SchedulerConfig {
        workers: args.workers,
        ..SchedulerConfig::default()
    };
    let scheduler = WorkerScheduler::new(config)?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    let started = Instant::now();
    let results = scheduler.drain(&queue);

    let mut ok = 0usize;
    let mut failed = 0usize;
    let mut cancelled = 0usize;
    for result in &results {
        match result.outcome.status {
            JobStatus::Succeeded => {
                ok += 1;
                let payload = result
                    .payload
                    .as_deref()
                    .context("succeeded job carried no payload (bug)")?;
                let name = format!("{}.{}", result.outcome.job_id, format.extension());
                let path = args.out_dir.join(name);
                std::fs::write(&path, payload)
                    .with_context(|| format!("write frame '{}'", path.display()))?;
            }
            JobStatus::Failed => {
                failed += 1;
                eprintln!(
                    "frame {} failed: {:?}",
                    result.outcome.job_id, result.outcome.error_kind
                );
            }
            JobStatus::Cancelled => cancelled += 1,
        }
    }

    eprintln!(
        "rendered {ok}/{frames} frames in {:.2?} ({failed} failed, {cancelled} cancelled) -> {}",
        started.elapsed(),
        args.out_dir.display()
    );

    if failed > 0 {
        anyhow::bail!("{failed} frame(s) failed");
    }
    Ok(())
}
