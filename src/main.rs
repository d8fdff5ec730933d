#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::error::Error;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use qmselect::artifact::SelectionArtifact;
use qmselect::data::{load_dataset, write_columns};
use qmselect::progress::{CorrelationProgressObserver, CorrelationStage};
use qmselect::solver::DEFAULT_EXACT_MAX_VARIABLES;
use qmselect::{ExactCqmSolver, FitOptions, QuadraticModelSelector, SelectorConfig};

#[derive(Parser)]
#[command(
    name = "qmselect",
    about = "Feature selection by constrained binary quadratic optimization",
    long_about = "Scores features by their correlation with a label and with each other, \
                 then picks a fixed-size subset by solving a constrained quadratic model."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Select a feature subset from a CSV file
    ///
    /// The built-in exact solver enumerates every subset, so it only accepts
    /// tables with at most `--max-variables` feature columns.
    #[command(about = "Select features (outputs: selection.toml)")]
    Select {
        /// Headered CSV with numeric cells
        #[arg(value_name = "CSV_PATH")]
        input: PathBuf,

        /// Name of the label column
        #[arg(long, value_name = "COLUMN")]
        label: String,

        /// Number of features to select
        #[arg(long, value_name = "K")]
        num_features: Option<usize>,

        /// Weight of relevance against redundancy, between 0 and 1
        #[arg(long, value_name = "ALPHA")]
        alpha: Option<f64>,

        /// Select at most, rather than exactly, the requested number of features
        #[arg(long)]
        relaxed: bool,

        /// Solver time limit in seconds
        #[arg(long, value_name = "SECONDS")]
        time_limit: Option<f64>,

        /// Selector configuration in TOML; flags override its values
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Where to write the fitted selection
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Most feature columns the exact solver will enumerate (2^N subsets, at most 63)
        #[arg(long, value_name = "N", default_value_t = DEFAULT_EXACT_MAX_VARIABLES)]
        max_variables: usize,
    },

    /// Keep only the selected columns of a CSV file
    #[command(about = "Apply a saved selection (outputs: reduced CSV)")]
    Apply {
        #[arg(value_name = "CSV_PATH")]
        input: PathBuf,

        /// Selection written by `qmselect select`
        #[arg(long, value_name = "PATH")]
        selection: PathBuf,

        /// Label column to carry through unchanged
        #[arg(long, value_name = "COLUMN")]
        label: Option<String>,

        #[arg(long, value_name = "PATH")]
        output: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Select {
            input,
            label,
            num_features,
            alpha,
            relaxed,
            time_limit,
            config,
            output,
            max_variables,
        }) => run_select(SelectArgs {
            input,
            label,
            num_features,
            alpha,
            relaxed,
            time_limit,
            config,
            output,
            max_variables,
        }),
        Some(Commands::Apply {
            input,
            selection,
            label,
            output,
        }) => run_apply(input, selection, label, output),
        None => {
            Cli::command().print_help().expect("print help");
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

struct SelectArgs {
    input: PathBuf,
    label: String,
    num_features: Option<usize>,
    alpha: Option<f64>,
    relaxed: bool,
    time_limit: Option<f64>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    max_variables: usize,
}

fn run_select(args: SelectArgs) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => SelectorConfig::load(path)?,
        None => SelectorConfig::default(),
    };
    if args.relaxed {
        config = config.with_strict(false);
    }
    if args.time_limit.is_some() {
        config = config.with_time_limit(args.time_limit);
    }

    let dataset = load_dataset(&args.input, Some(&args.label))?;
    let y = dataset
        .y
        .as_ref()
        .ok_or_else(|| format!("label column '{}' was not loaded", args.label))?;
    println!(
        "Loaded {} samples with {} features from {}",
        dataset.x.nrows(),
        dataset.x.ncols(),
        args.input.display()
    );

    let options = FitOptions {
        alpha: args.alpha,
        num_features: args.num_features,
        time_limit: None,
    };
    let solver = ExactCqmSolver::new().with_max_variables(args.max_variables);
    let mut selector = QuadraticModelSelector::new(config, solver)?;
    let progress = ProgressBarObserver::new();
    let start = Instant::now();
    selector.fit_with_progress(dataset.x.view(), y.view(), options, &progress)?;
    println!("Selection finished in {:.2?}", start.elapsed());

    let artifact = selector
        .artifact()?
        .with_feature_names(dataset.feature_names.clone());
    if let Some(names) = artifact.selected_names() {
        println!("Selected {} feature(s):", names.len());
        for name in names {
            println!("  {name}");
        }
    }

    if let Some(path) = &args.output {
        artifact.save(path)?;
        println!("Selection written to {}", path.display());
    }
    Ok(())
}

fn run_apply(
    input: PathBuf,
    selection: PathBuf,
    label: Option<String>,
    output: PathBuf,
) -> Result<(), Box<dyn Error>> {
    let artifact = SelectionArtifact::load(&selection)?;
    let dataset = load_dataset(&input, label.as_deref())?;

    if let Some(expected) = &artifact.feature_names {
        if expected != &dataset.feature_names {
            return Err(format!(
                "columns of {} do not match the columns the selection was fitted on",
                input.display()
            )
            .into());
        }
    }

    let selector = QuadraticModelSelector::from_artifact(artifact, ExactCqmSolver::new())?;
    let reduced = selector.transform(dataset.x.view())?;
    let names: Vec<String> = selector
        .support_indices()?
        .into_iter()
        .map(|idx| dataset.feature_names[idx].clone())
        .collect();

    let carried = match (&dataset.label_name, &dataset.y) {
        (Some(name), Some(y)) => Some((name.as_str(), y.view())),
        _ => None,
    };
    write_columns(&output, &names, reduced.view(), carried)?;
    println!(
        "Wrote {} of {} columns to {}",
        names.len(),
        dataset.feature_names.len(),
        output.display()
    );
    Ok(())
}

/// Reports correlation progress on stderr, one bar per stage.
struct ProgressBarObserver {
    bar: ProgressBar,
}

impl ProgressBarObserver {
    fn new() -> Self {
        let draw_target = if std::io::stderr().is_terminal() {
            ProgressDrawTarget::stderr_with_hz(20)
        } else {
            ProgressDrawTarget::hidden()
        };
        let bar = ProgressBar::with_draw_target(Some(0), draw_target);
        bar.set_style(
            ProgressStyle::with_template(
                "\n> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )
            .expect("progress template is valid")
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        Self { bar }
    }
}

impl CorrelationProgressObserver for ProgressBarObserver {
    fn on_stage_start(&self, stage: CorrelationStage, total_rows: usize) {
        self.bar.reset();
        self.bar.set_length(total_rows as u64);
        self.bar.set_message(stage.describe());
    }

    fn on_stage_advance(&self, _: CorrelationStage, rows: usize) {
        self.bar.inc(rows as u64);
    }

    fn on_stage_finish(&self, stage: CorrelationStage) {
        self.bar.finish_and_clear();
        log::debug!("Finished {stage}");
    }
}
