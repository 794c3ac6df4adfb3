use std::process::ExitCode;

mod samples;

fn main() -> ExitCode {
    otter_unit::cli::main_with(samples::registry())
}
