use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ekg_lib::{
    analyze,
    io::{self as ekg_io, export},
    metrics::Metrics,
    plot::{figure_from_analysis, figure_from_rr, Figure, Series},
    simulate::{simulate, SimulationConfig},
    AnalysisConfig, AnalysisResult, Finding, Recommendation,
};
use env_logger::Env;
use log::{info, warn};
use plotters::prelude::*;
use serde::Serialize;
use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "ekg",
    version,
    about = "Single-lead ECG analysis: filtering, beat detection, HRV and rule-based findings"
)]
struct Cli {
    /// Default log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a recording read from --input (text or CSV) or stdin
    Analyze {
        #[arg(long)]
        fs: u32,
        #[arg(long)]
        input: Option<PathBuf>,
        /// CSV column to use instead of the first one
        #[arg(long)]
        column: Option<String>,
        /// TOML file overriding detection and rule thresholds
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        metrics_csv: Option<PathBuf>,
        #[arg(long)]
        findings_csv: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Generate a synthetic ECG, optionally analyzing it straight away
    Simulate {
        #[arg(long, default_value_t = 10.0)]
        duration: f64,
        #[arg(long, default_value_t = 75.0)]
        heart_rate: f64,
        #[arg(long, default_value_t = 0.05)]
        noise: f64,
        #[arg(long, default_value_t = 1000)]
        fs: u32,
        #[arg(long, default_value_t = 160.0)]
        pr_ms: f64,
        /// Fixed QT; derived from the heart rate when omitted
        #[arg(long)]
        qt_ms: Option<f64>,
        #[arg(long, default_value_t = 0.0)]
        rr_jitter_s: f64,
        #[arg(long, default_value_t = 0.0)]
        baseline_wander: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Write samples here (one per line) instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the analysis of the generated signal as JSON
        #[arg(long)]
        analyze: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Analyze several recordings in parallel, one JSON line per file
    Batch {
        #[arg(long)]
        fs: u32,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        column: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Worker threads (defaults to available parallelism)
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Render the filtered signal with R-peak markers to a PNG
    Plot {
        #[arg(long)]
        fs: u32,
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        column: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        out: PathBuf,
        /// Also render the RR tachogram
        #[arg(long)]
        rr_out: Option<PathBuf>,
        #[arg(long, default_value_t = 1200)]
        width: u32,
        #[arg(long, default_value_t = 480)]
        height: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    match cli.command {
        Commands::Analyze {
            fs,
            input,
            column,
            config,
            metrics_csv,
            findings_csv,
            format,
        } => cmd_analyze(
            fs,
            input.as_deref(),
            column.as_deref(),
            config.as_deref(),
            metrics_csv.as_deref(),
            findings_csv.as_deref(),
            format,
        )?,
        Commands::Simulate {
            duration,
            heart_rate,
            noise,
            fs,
            pr_ms,
            qt_ms,
            rr_jitter_s,
            baseline_wander,
            seed,
            out,
            analyze: run_analysis,
            config,
        } => {
            let sim = SimulationConfig {
                duration_s: duration,
                heart_rate_bpm: heart_rate,
                noise,
                sampling_rate: fs,
                pr_ms,
                qt_ms,
                rr_jitter_s,
                baseline_wander,
                seed,
            };
            cmd_simulate(&sim, out.as_deref(), run_analysis, config.as_deref())?
        }
        Commands::Batch {
            fs,
            files,
            column,
            config,
            jobs,
        } => cmd_batch(fs, &files, column.as_deref(), config.as_deref(), jobs)?,
        Commands::Plot {
            fs,
            input,
            column,
            config,
            out,
            rr_out,
            width,
            height,
        } => cmd_plot(
            fs,
            input.as_deref(),
            column.as_deref(),
            config.as_deref(),
            &out,
            rr_out.as_deref(),
            (width, height),
        )?,
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

fn read_samples(input: Option<&Path>, column: Option<&str>) -> Result<Vec<f64>> {
    match input {
        Some(path) => ekg_io::read_signal(path, column)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            let samples = if column.is_some() {
                ekg_io::csv::read_column(buf.as_bytes(), column)
            } else {
                ekg_io::text::parse_samples(&buf)
            };
            samples.context("failed to parse samples from stdin")
        }
    }
}

fn create_file(path: &Path) -> Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

#[allow(clippy::too_many_arguments)]
fn cmd_analyze(
    fs: u32,
    input: Option<&Path>,
    column: Option<&str>,
    config: Option<&Path>,
    metrics_csv: Option<&Path>,
    findings_csv: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let cfg = load_config(config)?;
    let samples = read_samples(input, column)?;
    let result = analyze(&samples, fs, &cfg)?;
    info!("{}", result.recommendation);

    if let Some(path) = metrics_csv {
        export::write_metrics_csv(create_file(path)?, &result)?;
        info!("wrote metrics to {}", path.display());
    }
    if let Some(path) = findings_csv {
        export::write_findings_csv(create_file(path)?, &result)?;
        info!("wrote findings to {}", path.display());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => export::write_result_json(&mut out, &result, false)?,
        OutputFormat::Pretty => export::write_result_json(&mut out, &result, true)?,
        OutputFormat::Text => write_report(&mut out, &result)?,
    }
    Ok(())
}

fn write_report<W: Write>(out: &mut W, result: &AnalysisResult) -> Result<()> {
    writeln!(
        out,
        "{} beat(s) at {} Hz",
        result.peaks.len(),
        result.sampling_rate
    )?;
    for (name, unit, value) in result.metrics.entries() {
        match value.value() {
            Some(v) => writeln!(out, "  {name:<14} {v:>10.2} {unit}")?,
            None => writeln!(out, "  {name:<14} {:>10} {unit}", "n/a")?,
        }
    }
    writeln!(out, "findings:")?;
    for finding in &result.findings {
        writeln!(out, "  [{}] {}", finding.severity, finding.condition)?;
    }
    writeln!(out, "{}", result.recommendation)?;
    Ok(())
}

fn cmd_simulate(
    sim: &SimulationConfig,
    out: Option<&Path>,
    run_analysis: bool,
    config: Option<&Path>,
) -> Result<()> {
    let ts = simulate(sim)?;
    info!(
        "simulated {} sample(s) at {} bpm",
        ts.len(),
        sim.heart_rate_bpm
    );
    match out {
        Some(path) => ekg_io::text::write_samples(create_file(path)?, &ts.data)?,
        None if !run_analysis => ekg_io::text::write_samples(io::stdout().lock(), &ts.data)?,
        None => {}
    }
    if run_analysis {
        let cfg = load_config(config)?;
        let result = analyze(&ts.data, ts.fs, &cfg)?;
        export::write_result_json(io::stdout().lock(), &result, false)?;
    }
    Ok(())
}

/// Per-file batch output. The filtered signal is left out to keep lines short.
#[derive(Serialize)]
struct BatchLine {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<BatchSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct BatchSummary {
    sampling_rate: u32,
    peaks: Vec<usize>,
    metrics: Metrics,
    findings: Vec<Finding>,
    recommendation: Recommendation,
}

impl From<AnalysisResult> for BatchSummary {
    fn from(result: AnalysisResult) -> Self {
        Self {
            sampling_rate: result.sampling_rate,
            peaks: result.peaks.indices,
            metrics: result.metrics,
            findings: result.findings,
            recommendation: result.recommendation,
        }
    }
}

fn analyze_file(path: &Path, fs: u32, column: Option<&str>, cfg: &AnalysisConfig) -> BatchLine {
    let outcome = ekg_io::read_signal(path, column)
        .and_then(|samples| analyze(&samples, fs, cfg));
    let file = path.display().to_string();
    match outcome {
        Ok(result) => BatchLine {
            file,
            summary: Some(result.into()),
            error: None,
        },
        Err(err) => {
            warn!("{file}: {err}");
            BatchLine {
                file,
                summary: None,
                error: Some(err.to_string()),
            }
        }
    }
}

fn cmd_batch(
    fs: u32,
    files: &[PathBuf],
    column: Option<&str>,
    config: Option<&Path>,
    jobs: Option<usize>,
) -> Result<()> {
    let cfg = load_config(config)?;
    let workers = jobs
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
        .clamp(1, files.len().max(1));
    info!("analyzing {} file(s) on {} worker(s)", files.len(), workers);

    let (job_tx, job_rx) = crossbeam_channel::unbounded::<(usize, &Path)>();
    let (res_tx, res_rx) = crossbeam_channel::unbounded::<(usize, BatchLine)>();
    for (idx, path) in files.iter().enumerate() {
        job_tx
            .send((idx, path.as_path()))
            .map_err(|_| anyhow!("batch queue closed"))?;
    }
    drop(job_tx);

    let cfg = &cfg;
    std::thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let res_tx = res_tx.clone();
            scope.spawn(move || {
                for (idx, path) in job_rx.iter() {
                    let line = analyze_file(path, fs, column, cfg);
                    if res_tx.send((idx, line)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(res_tx);

    let mut lines: Vec<(usize, BatchLine)> = res_rx.iter().collect();
    lines.sort_by_key(|(idx, _)| *idx);
    let failed = lines.iter().filter(|(_, line)| line.error.is_some()).count();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (_, line) in &lines {
        writeln!(out, "{}", serde_json::to_string(line)?)?;
    }
    out.flush()?;

    if failed > 0 {
        return Err(anyhow!("{failed} of {} file(s) failed", files.len()));
    }
    Ok(())
}

fn cmd_plot(
    fs: u32,
    input: Option<&Path>,
    column: Option<&str>,
    config: Option<&Path>,
    out: &Path,
    rr_out: Option<&Path>,
    size: (u32, u32),
) -> Result<()> {
    let cfg = load_config(config)?;
    let samples = read_samples(input, column)?;
    let result = analyze(&samples, fs, &cfg)?;
    let fig = figure_from_analysis(&result, (size.0 as usize * 2).max(2));
    draw_plotters_figure(out, &fig, size)?;
    info!("wrote {}", out.display());
    if let Some(path) = rr_out {
        draw_plotters_figure(path, &figure_from_rr(&result.rr), size)?;
        info!("wrote {}", path.display());
    }
    Ok(())
}

fn draw_plotters_figure(path: &Path, fig: &Figure, size: (u32, u32)) -> Result<()> {
    let backend = BitMapBackend::new(path, size);
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;
    let ((x_min, x_max), (y_min, y_max)) = fig.bounds();
    let y_pad = 0.05 * (y_max - y_min);
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, (y_min - y_pad)..(y_max + y_pad))?;
    chart
        .configure_mesh()
        .x_desc(fig.x.label.clone().unwrap_or_default())
        .y_desc(fig.y.label.clone().unwrap_or_default())
        .draw()?;
    for series in &fig.series {
        match series {
            Series::Line(line) => {
                let (r, g, b) = line.style.color.rgb();
                let style = RGBColor(r, g, b).stroke_width(line.style.width.round().max(1.0) as u32);
                chart.draw_series(LineSeries::new(
                    line.points.iter().map(|p| (p[0], p[1])),
                    style,
                ))?;
            }
            Series::Markers(markers) => {
                let (r, g, b) = markers.style.color.rgb();
                let radius = markers.style.width.round().max(1.0) as i32;
                chart.draw_series(markers.points.iter().map(|p| {
                    Circle::new((p[0], p[1]), radius, RGBColor(r, g, b).filled())
                }))?;
            }
        }
    }
    root.present()?;
    Ok(())
}
