use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "alanfl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Interpreter for the AlanFL expression language", long_about = None)]
pub struct Args {
    /// Path to the AlanFL source file to execute
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    #[arg(long = "color", value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "Invalid color choice: {}. Must be 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}
