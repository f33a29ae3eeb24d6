use std::io::Write;

use clap::Parser;
use env_logger::Builder;
use log::error;

use edgesim::{Experiment, ExperimentConfig};

#[derive(Parser, Debug)]
#[clap(about, long_about = None)]
struct Args {
    /// File with run configurations, edge aggregation at every level vs cloud if not set
    #[clap(short, long)]
    input: Option<String>,

    /// Output file for summaries in JSON
    #[clap(short, long)]
    output: Option<String>,
}

fn main() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let args = Args::parse();

    let config = match &args.input {
        Some(path) => ExperimentConfig::from_file(path),
        None => Ok(ExperimentConfig::write_by_level()),
    };
    let summaries = match config.and_then(|config| Experiment::new(config).run()) {
        Ok(summaries) => summaries,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    for summary in &summaries {
        println!("{}\n", summary);
    }

    if let Some(output) = args.output {
        std::fs::File::create(output)
            .unwrap()
            .write_all(serde_json::to_string_pretty(&summaries).unwrap().as_bytes())
            .unwrap();
    }
}
