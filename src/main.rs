use std::path::Path;
use std::process::ExitCode;

use log::error;

use dot_anchor::app::Script;
use dot_anchor::platform::memory::{MemoryDispatcher, MemoryRenderSink};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let script = match std::env::args().nth(1) {
        Some(path) => match Script::load(Path::new(&path)) {
            Ok(script) => script,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Script::builtin(),
    };

    let sink = MemoryRenderSink::logging();
    let dispatcher = MemoryDispatcher::new();

    match script.run(sink.clone(), dispatcher.clone()) {
        Ok(report) => {
            println!(
                "screen:   {}x{} {:?}",
                report.geometry.width, report.geometry.height, report.geometry.rotation
            );
            println!("anchor:   ({}, {})", report.anchor.x, report.anchor.y);
            println!("current:  ({}, {})", report.current.x, report.current.y);
            println!("moves:    {}", sink.moves().len());
            println!("gestures: {:?}", report.gestures);
            println!("actions:  {:?}", dispatcher.performed());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
