use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(about, version)]
pub struct Cli {
    #[arg(
        value_name = "BOARD FILE",
        help = "Specify the JSON board description to route on"
    )]
    pub input: PathBuf,
    #[arg(
        short,
        long,
        value_name = "SETTINGS FILE",
        help = "JSON file with router settings. Defaults are used for anything it leaves out"
    )]
    pub settings: Option<PathBuf>,
    #[arg(
        short,
        long,
        value_name = "GESTURE FILE",
        help = "JSON list of gestures (start_route, move_to, place_via, start_drag, drag_to, finish, cancel, undo, redo) to replay"
    )]
    pub gestures: Option<PathBuf>,
    #[arg(
        short,
        long,
        value_name = "OUTPUT FILE",
        help = "Where to write the routed board. The input filename with the extension changed to .routed.json is used by default"
    )]
    pub output: Option<PathBuf>,
}
