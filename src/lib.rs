#![allow(clippy::too_many_arguments)]

mod compare_floats;
pub mod core;
pub mod corpus;
pub mod errors;
pub mod input;
pub mod model_period;
pub mod output;
pub mod output_writer;

#[cfg(test)]
mod tests;

#[macro_use]
extern crate is_close;

pub use crate::corpus::{RunResults, Step};
pub use crate::errors::EbmError;
pub use crate::model_period::YearRange;
pub use crate::output_writer::Layout;

use crate::corpus::Corpus;
use crate::input::InputTables;
use crate::output::Output;
use crate::output_writer::{location_keys, write_reports};
use std::path::Path;
use tracing::info;

/// Options for a single model run.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunConfig {
    pub model_years: YearRange,
    pub layout: Layout,
    pub step: Step,
}

/// Load the input directory, run the pipeline up to `config.step` and write its reports.
///
/// Output locations are checked before any input is read, so a run that could not save
/// its results fails early.
pub fn run_project(
    input_dir: &Path,
    output: impl Output,
    config: &RunConfig,
) -> Result<RunResults, EbmError> {
    output.check_writable(location_keys(config.step))?;

    info!(input = ?input_dir, years = %config.model_years, "Loading input tables");
    let input = InputTables::load(input_dir, config.model_years)?;
    let corpus = Corpus::from_inputs(input, config.model_years)?;

    let results = corpus.run(config.step)?;
    write_reports(&output, &results, config.layout)?;

    Ok(results)
}
