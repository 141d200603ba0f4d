use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, LevelFilter};

use osapeaks::curve_fit::{fit_in_window, fit_with, FitConfig, PeakModel};
use osapeaks::{
    AnalysisConfig, Analyzer, ClusteringStrategy, SelectionPolicy, WavelengthUnit,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Cluster the peaks of a batch of spectra and report per-line statistics.
    Analyze(AnalyzeArgs),
    /// List the peaks of a single spectrum with their prominences.
    Inspect(InspectArgs),
    /// Fit a peak shape to a spectrum or a window of one.
    Fit(FitArgs),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    #[default]
    VisibleOsa,
    Thorlabs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Unit {
    M,
    Nm,
}

impl From<Unit> for WavelengthUnit {
    fn from(value: Unit) -> Self {
        match value {
            Unit::M => WavelengthUnit::Meters,
            Unit::Nm => WavelengthUnit::Nanometers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Policy {
    OnePerBand,
    TopThree,
}

impl From<Policy> for SelectionPolicy {
    fn from(value: Policy) -> Self {
        match value {
            Policy::OnePerBand => SelectionPolicy::OnePerBand,
            Policy::TopThree => SelectionPolicy::TopThree,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Strategy {
    Auto,
    Hierarchical,
    Binned,
}

#[derive(Args, Debug, Clone)]
struct DetectionArgs {
    /// Start from an instrument preset.
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Read the analysis configuration from a JSON file, flags take precedence.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// The unit the wavelength column is written in.
    #[arg(short, long, value_enum)]
    unit: Option<Unit>,

    /// The minimum peak prominence.
    #[arg(short, long)]
    prominence: Option<f64>,

    /// The minimum index separation between peaks.
    #[arg(short, long)]
    distance: Option<usize>,

    /// An absolute intensity floor for peaks.
    #[arg(long)]
    height: Option<f64>,

    /// Ignore everything up to the line containing this marker, e.g. `[Data]`.
    #[arg(long)]
    section_marker: Option<String>,

    /// Reject a file on its first malformed line.
    #[arg(long)]
    strict: bool,
}

impl DetectionArgs {
    fn config(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = match (&self.config, self.preset) {
            (Some(path), _) => {
                let file = fs::File::open(path)
                    .with_context(|| format!("Failed to open config {}", path.display()))?;
                AnalysisConfig::from_json(io::BufReader::new(file))
                    .with_context(|| format!("Failed to parse config {}", path.display()))?
            }
            (None, Some(Preset::Thorlabs)) => AnalysisConfig::thorlabs(),
            (None, _) => AnalysisConfig::visible_osa(),
        };
        if let Some(unit) = self.unit {
            config = config.unit(unit.into());
        }
        if let Some(prominence) = self.prominence {
            config = config.prominence(prominence);
        }
        if self.distance.is_some() {
            config = config.distance(self.distance);
        }
        if self.height.is_some() {
            config = config.height(self.height);
        }
        if self.section_marker.is_some() {
            config = config.section_marker(self.section_marker.clone());
        }
        if self.strict {
            config = config.strict(true);
        }
        Ok(config)
    }
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Spectrum files, or directories whose `.txt` and `.csv` files are read in name order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    #[command(flatten)]
    detection: DetectionArgs,

    /// The clustering tolerance in nanometers.
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// How the principal lines are chosen.
    #[arg(long, value_enum)]
    policy: Option<Policy>,

    /// The clustering strategy.
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// The peak count at which the automatic strategy switches to binning.
    #[arg(long, default_value_t = osapeaks::clustering::DEFAULT_HIERARCHICAL_LIMIT)]
    auto_threshold: usize,

    /// Write the statistics table as CSV.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the full report as JSON.
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    input: PathBuf,

    #[command(flatten)]
    detection: DetectionArgs,
}

#[derive(Args, Debug)]
struct FitArgs {
    input: PathBuf,

    #[command(flatten)]
    detection: DetectionArgs,

    /// The peak shape to fit.
    #[arg(short, long, default_value_t = PeakModel::Gaussian)]
    model: PeakModel,

    /// Restrict the fit to wavelengths between LO and HI nanometers.
    #[arg(short, long, num_args = 2, value_names = ["LO", "HI"])]
    window: Option<Vec<f64>>,

    /// The minimum number of distinct points to fit.
    #[arg(long, default_value_t = osapeaks::curve_fit::MIN_FIT_POINTS)]
    min_points: usize,

    /// The maximum number of fitting iterations.
    #[arg(long, default_value_t = 500)]
    max_iter: usize,
}

fn expand_inputs(inputs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(input)
                .with_context(|| format!("Failed to list {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| {
                    path.is_file()
                        && matches!(
                            path.extension().and_then(|e| e.to_str()),
                            Some("txt") | Some("csv")
                        )
                })
                .collect();
            entries.sort();
            paths.extend(entries);
        } else {
            paths.push(input.clone());
        }
    }
    if paths.is_empty() {
        bail!("No spectrum files were found");
    }
    Ok(paths)
}

fn main_analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let mut config = args.detection.config()?;
    if let Some(tolerance) = args.tolerance {
        config = config.tolerance_nm(tolerance);
    }
    if let Some(policy) = args.policy {
        config = config.selection(policy.into());
    }
    if let Some(strategy) = args.strategy {
        config = config.clustering(match strategy {
            Strategy::Auto => ClusteringStrategy::Auto {
                threshold: args.auto_threshold,
            },
            Strategy::Hierarchical => ClusteringStrategy::Hierarchical,
            Strategy::Binned => ClusteringStrategy::Binned,
        });
    }

    let paths = expand_inputs(&args.inputs)?;
    info!("Analyzing {} files", paths.len());
    let report = Analyzer::new(config).analyze_files(&paths)?;

    for failure in report.summary.failures.iter() {
        println!("{}: {}", failure.source_id, failure.reason);
    }
    println!("{}", report.summary);
    println!("{} groups", report.groups.len());
    println!("{}", report.console_summary());

    if let Some(path) = args.csv.as_deref() {
        let file = fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        report.statistics.write_csv(io::BufWriter::new(file))?;
        info!("Statistics written to {}", path.display());
    }
    if let Some(path) = args.json.as_deref() {
        let file = fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        report.write_json(io::BufWriter::new(file))?;
        info!("Report written to {}", path.display());
    }
    Ok(())
}

fn load(path: &Path, config: &AnalysisConfig) -> anyhow::Result<osapeaks::Spectrum> {
    let report = config
        .reader()
        .read_file(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if report.skipped_count() > 0 {
        info!("Skipped {} malformed records", report.skipped_count());
    }
    Ok(report.spectrum)
}

fn main_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let config = args.detection.config()?;
    let spectrum = load(&args.input, &config)?;
    let peaks = Analyzer::new(config).inspect(&spectrum);
    println!("index\twavelength_nm\tintensity\tprominence\tband");
    for peak in peaks.iter() {
        println!(
            "{}\t{:.4}\t{:.4}\t{:.4}\t{}",
            peak.index, peak.wavelength_nm, peak.intensity, peak.prominence, peak.color_band
        );
    }
    println!("{} peaks", peaks.len());
    Ok(())
}

fn main_fit(args: FitArgs) -> anyhow::Result<()> {
    let config = args.detection.config()?;
    let spectrum = load(&args.input, &config)?;
    let fit_config = FitConfig::default()
        .min_points(args.min_points)
        .max_iter(args.max_iter);
    let result = match args.window.as_deref() {
        Some([lo, hi]) => fit_in_window(
            spectrum.wavelength_nm(),
            spectrum.intensity(),
            (*lo, *hi),
            args.model,
            fit_config,
        )?,
        Some(_) => bail!("A window needs exactly two bounds"),
        None => fit_with(
            spectrum.wavelength_nm(),
            spectrum.intensity(),
            args.model,
            fit_config,
        )?,
    };
    println!("{result}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(args) => main_analyze(args),
        Commands::Inspect(args) => main_inspect(args),
        Commands::Fit(args) => main_fit(args),
    }
}
