use std::process::ExitCode;

use stereo_synth::cli::Cli;

fn main() -> ExitCode {
    stereo_synth::init_logging();

    let cli: Cli = argh::from_env();
    match stereo_synth::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
