use std::fs::File;
use std::io::BufReader;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use log::info;
use pnsroute::board::design::BoardDesign;
use pnsroute::router::settings::RouterSettings;
use pnsroute::session::command::{Command, CommandOutcome};
use pnsroute::session::Session;

mod cli;

fn main() -> anyhow::Result<()> {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    let args = Cli::parse();

    let design_file = File::open(&args.input)
        .with_context(|| format!("cannot open {}", args.input.display()))?;
    let design = BoardDesign::load(BufReader::new(design_file))?;
    let board = design.make_board()?;

    let settings: RouterSettings = if let Some(settings_filename) = &args.settings {
        let settings_file = File::open(settings_filename)
            .with_context(|| format!("cannot open {}", settings_filename.display()))?;
        serde_json::from_reader(BufReader::new(settings_file))?
    } else {
        RouterSettings::default()
    };

    let commands: Vec<Command> = if let Some(gestures_filename) = &args.gestures {
        let gestures_file = File::open(gestures_filename)
            .with_context(|| format!("cannot open {}", gestures_filename.display()))?;
        serde_json::from_reader(BufReader::new(gestures_file))?
    } else {
        vec![]
    };

    let mut session = Session::new(board, design.rules.clone(), settings);

    for (i, command) in commands.iter().enumerate() {
        match session.execute(command) {
            Ok(CommandOutcome::Placed(placement)) => println!(
                "{}: {:?}, {} segments, {} violations, {} shoved{}",
                i,
                placement.state,
                placement.line.segment_count(),
                placement.violations.len(),
                placement.shoved.len(),
                if placement.timed_out { ", timed out" } else { "" }
            ),
            Ok(CommandOutcome::Committed(summary)) => println!(
                "{}: committed, {} added, {} removed",
                i,
                summary.added.len(),
                summary.removed.len()
            ),
            Ok(outcome) => println!("{}: {:?}", i, outcome),
            Err(err) => println!("{}: error: {}", i, err),
        }
    }

    let board = session.into_board();
    let output_filename = args
        .output
        .unwrap_or_else(|| args.input.with_extension("routed.json"));
    let output_file = File::create(&output_filename)
        .with_context(|| format!("cannot create {}", output_filename.display()))?;
    BoardDesign::from_board(&board, design.rules)?.write(output_file)?;
    info!("wrote {}", output_filename.display());

    Ok(())
}
