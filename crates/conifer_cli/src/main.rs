//! CLI probe for the counting core.
//!
//! # Responsibility
//! - Verify `conifer_core` wiring without a UI host.
//! - Drive one session end to end: connect, record sightings, end session,
//!   print the identity's history as CSV.
//!
//! Usage: `conifer_cli [<users_root> <subject_id> <email> [tree ...]]`

use conifer_core::{api, init_logging_from_config, CoreConfig, Dashboard};
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("conifer_core version={}", conifer_core::core_version());

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        return ExitCode::SUCCESS;
    }
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error error={message}");
            eprintln!("conifer_cli: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let [users_root, subject_id, email, trees @ ..] = args else {
        return Err("usage: conifer_cli <users_root> <subject_id> <email> [tree ...]".to_string());
    };

    let config = CoreConfig::new(users_root).map_err(|err| err.to_string())?;
    init_logging_from_config(&config)?;

    let dashboard = Dashboard::start(&config).map_err(|err| err.to_string())?;
    let mut session = dashboard
        .connect(subject_id, email)
        .map_err(|err| err.to_string())?;

    for tree in trees {
        let response = api::record_sighting(&mut session, tree);
        println!("{tree}: {}", response.message);
    }

    let ended = api::end_session(&mut session);
    if !ended.ok {
        return Err(ended.message);
    }
    println!("{}", ended.message);

    let history = api::view_history(&session);
    match history.data {
        Some(table) => {
            print!("{}", table.to_csv());
            Ok(())
        }
        None => Err(history.message),
    }
}
