mod cli;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use sim_fs_shell::Shell;

fn main() -> io::Result<ExitCode> {
    env_logger::init();

    let cli = Cli::parse();
    let mut shell = match Shell::new(cli.config()) {
        Ok(shell) => shell,
        Err(err) => {
            eprintln!("error: {err}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let input: Box<dyn BufRead> = match &cli.script {
        Some(script) => Box::new(BufReader::new(File::open(script)?)),
        None => Box::new(io::stdin().lock()),
    };

    let mut stdout = io::stdout().lock();
    for (lineno, line) in input.lines().enumerate() {
        let line = line?;
        match shell.run(&line) {
            Ok(out) if out.is_empty() => {}
            Ok(out) => writeln!(stdout, "{out}")?,
            Err(err) => {
                log::warn!("line {}: {line:?}", lineno + 1);
                writeln!(stdout, "error: {err}")?;
            }
        }
    }

    shell.unmount();
    Ok(ExitCode::SUCCESS)
}
