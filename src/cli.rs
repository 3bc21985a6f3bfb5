use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "geodrop")]
#[command(version)]
#[command(about = "Inspect KMZ archives and read features from geo files", long_about = None)]
#[command(after_help = "Examples:\n  \
  geodrop -l trip.kmz            list archive entries\n  \
  geodrop -p trip.kmz | less     print the extracted KML document\n  \
  geodrop -f route.geojson       read features through the format registry\n  \
  geodrop -d out -o trip.kmz     extract all entries into ./out")]
pub struct Cli {
    /// KMZ archive or geo file path
    #[arg(value_name = "FILE")]
    pub file: String,

    /// List archive entries (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List archive entries verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Print the extracted KML document to stdout
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Read features through the format registry and summarize them
    #[arg(short = 'f', long = "features")]
    pub features: bool,

    /// Extract archive entries into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Junk paths (do not make directories)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }
}
