//! Command-line driver for the tzlookup build.
//!
//! Feeds the countryzones, zone.tab and backward files plus a compiled
//! transition dump through the generator and writes the XML artifact. On
//! any failure the output file is removed so consumers never see a
//! half-built artifact.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use tzlookup::{generate, xml, Diagnostics, GeneratorError, TransitionZoneRules, TzLookupDocument};

/// One or more validation errors.
const EXIT_ERRORS: u8 = 1;
/// An input file could not be read.
const EXIT_MISSING_INPUT: u8 = 2;
/// An input file could not be understood at all, or the alias data cycles.
const EXIT_BAD_SCHEMA: u8 = 3;

#[derive(Parser)]
#[command(
    name = "tzlookup-datagen",
    about = "Generates the tzlookup XML artifact from countryzones, zone.tab and backward"
)]
struct Cli {
    /// The countryzones text file.
    countryzones: PathBuf,

    /// The IANA zone.tab file.
    zone_tab: PathBuf,

    /// The IANA backward file.
    backward: PathBuf,

    /// A JSON dump of per-zone offset transitions to resolve rules against.
    rules: PathBuf,

    /// The XML file to generate.
    output: PathBuf,

    /// Also write the resolved records as pretty JSON into this directory.
    #[arg(long)]
    debug_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    run(&Cli::parse())
}

fn run(cli: &Cli) -> ExitCode {
    let inputs = [&cli.countryzones, &cli.zone_tab, &cli.backward, &cli.rules]
        .map(|path| read_input(path));
    let [Some(countryzones), Some(zone_tab), Some(backward), Some(rules_json)] = inputs else {
        return discard_output_and_exit(&cli.output, EXIT_MISSING_INPUT);
    };

    let rules = match TransitionZoneRules::from_json(&rules_json) {
        Ok(rules) => rules,
        Err(err) => {
            error!("unable to parse {}: {err}", cli.rules.display());
            return discard_output_and_exit(&cli.output, EXIT_BAD_SCHEMA);
        }
    };

    let mut diags = Diagnostics::new();
    let result = generate(&rules, &countryzones, &zone_tab, &backward, &mut diags);
    if !diags.is_empty() {
        eprintln!("Issues:\n{}", diags.render());
    }

    let doc = match result {
        Ok(doc) => doc,
        Err(GeneratorError::Schema(_)) => {
            return discard_output_and_exit(&cli.output, EXIT_BAD_SCHEMA);
        }
        Err(GeneratorError::Failed) => {
            return discard_output_and_exit(&cli.output, EXIT_ERRORS);
        }
    };

    if let Some(debug_dir) = &cli.debug_dir {
        if let Err(err) = write_debug(debug_dir, &doc) {
            error!("unable to write debug output: {err}");
            return discard_output_and_exit(&cli.output, EXIT_ERRORS);
        }
    }

    let rendered = match xml::write_document(&doc) {
        Ok(rendered) => rendered,
        Err(err) => {
            error!("unable to render output: {err}");
            return discard_output_and_exit(&cli.output, EXIT_ERRORS);
        }
    };
    if let Err(err) = fs::write(&cli.output, rendered) {
        error!("unable to write {}: {err}", cli.output.display());
        return discard_output_and_exit(&cli.output, EXIT_ERRORS);
    }
    info!("wrote {}", cli.output.display());
    ExitCode::SUCCESS
}

fn read_input(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(contents) => Some(contents),
        Err(err) => {
            error!("unable to read {}: {err}", path.display());
            None
        }
    }
}

/// Writes the resolved records as JSON for diffing between runs.
fn write_debug(debug_dir: &Path, doc: &TzLookupDocument) -> std::io::Result<()> {
    fs::create_dir_all(debug_dir)?;
    let json = serde_json::to_string_pretty(doc).expect("document serialization is infallible");
    fs::write(debug_dir.join("tzlookup.json"), json)
}

/// A failed run must leave no stale artifact behind.
fn discard_output_and_exit(output: &Path, code: u8) -> ExitCode {
    let _ = fs::remove_file(output);
    ExitCode::from(code)
}
