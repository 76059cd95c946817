use clap::Parser;

use alanfl::cli::Args;
use alanfl::config::AppConfig;
use alanfl::diagnostic::render_diagnostics;
use alanfl::interpreter::{self, Interpreter};
use owo_colors::OwoColorize;

fn main() {
    let args = Args::parse();
    let config = AppConfig::from_args(&args);

    verbose_log(&config, "Starting alanfl");

    let source = match std::fs::read_to_string(&args.source) {
        Ok(source) => source,
        Err(error) => {
            error_message(
                &config,
                &format!("failed to read {}: {}", args.source.display(), error),
            );
            std::process::exit(1);
        }
    };

    verbose_log(
        &config,
        &format!("Read {} bytes of source", source.len()),
    );

    let (module, diagnostics) = interpreter::parse_source(&source);
    if !diagnostics.is_empty() {
        verbose_log(
            &config,
            &format!("Aborting on {} parse error(s)", diagnostics.len()),
        );
        print!("{}", render_diagnostics(&source, &diagnostics));
        std::process::exit(1);
    }

    verbose_log(&config, "Parsed module, starting execution");

    let mut interpreter = Interpreter::new();
    if let Err(error) = interpreter.exec_module(&module) {
        error_message(&config, &error.to_string());
        std::process::exit(1);
    }
}

fn verbose_log(config: &AppConfig, message: &str) {
    if config.verbose {
        eprintln!("[alanfl:debug] {}", message);
    }
}

fn error_message(config: &AppConfig, message: &str) {
    if config.color_enabled {
        eprintln!("{}", message.red().bold());
    } else {
        eprintln!("{}", message);
    }
}
