extern crate ebm;

use clap::{Args, Parser};
use ebm::model_period::{DEFAULT_END_YEAR, DEFAULT_START_YEAR};
use ebm::output::FileOutput;
use ebm::{run_project, Layout, RunConfig, Step, YearRange};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

const INVALID_INPUT_EXIT_CODE: u8 = 3;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct EbmArgs {
    #[arg(
        env = "EBM_INPUT_DIRECTORY",
        default_value = "input",
        help = "Directory holding the input tables"
    )]
    input_directory: PathBuf,
    #[arg(
        long,
        short,
        env = "EBM_OUTPUT",
        default_value = "output",
        help = "Directory the reports are written to"
    )]
    output: PathBuf,
    #[arg(long, env = "EBM_START_YEAR", default_value_t = DEFAULT_START_YEAR)]
    start_year: u32,
    #[arg(long, env = "EBM_END_YEAR", default_value_t = DEFAULT_END_YEAR)]
    end_year: u32,
    #[arg(
        long,
        short,
        default_value_t = false,
        help = "Overwrite reports that already exist"
    )]
    force: bool,
    #[command(flatten)]
    layout: LayoutChoice,
    #[arg(
        long,
        value_enum,
        default_value_t = Step::EnergyUse,
        help = "Last stage to calculate and report"
    )]
    step: Step,
    #[clap(long, default_value_t = false, help = "Whether to log out spans")]
    log_spans: bool,
}

#[derive(Args, Clone, Copy, Default, Debug)]
#[group(required = false, multiple = false)]
struct LayoutChoice {
    #[arg(long, help = "One column per model year (default)")]
    horizontal: bool,
    #[arg(long, help = "One row per model year")]
    vertical: bool,
}

impl From<LayoutChoice> for Layout {
    fn from(choice: LayoutChoice) -> Self {
        if choice.vertical {
            Layout::Vertical
        } else {
            Layout::Horizontal
        }
    }
}

fn main() -> ExitCode {
    let args = EbmArgs::parse();

    // set up basic tracing
    let tracing_subscriber = {
        let mut builder = tracing_subscriber::fmt::fmt().with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        );

        if args.log_spans {
            builder = builder.with_span_events(FmtSpan::CLOSE);
        }

        builder.finish()
    };
    if let Err(err) = tracing::subscriber::set_global_default(tracing_subscriber) {
        eprintln!("setting tracing subscriber failed: {err}");
    }

    let model_years = match YearRange::new(args.start_year, args.end_year) {
        Ok(model_years) => model_years,
        Err(err) => {
            error!("{err}");
            return ExitCode::from(INVALID_INPUT_EXIT_CODE);
        }
    };

    let config = RunConfig {
        model_years,
        layout: args.layout.into(),
        step: args.step,
    };
    let file_output = FileOutput::new(args.output.clone(), "{}.csv".to_string(), args.force);

    match run_project(&args.input_directory, &file_output, &config) {
        Ok(_) => {
            info!(output = ?args.output, "Finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
