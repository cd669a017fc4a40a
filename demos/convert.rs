//! Headless conversion run that prints what a UI would display.
//!
//! Usage: `cargo run --example convert -- [input] [output] [--long] [--only-long]`
//!
//! Without folder arguments, `./input` and `./output` are created (if needed)
//! and used, the same defaults a first launch of a desktop front end offers.

use comicpress::observer::percent;
use comicpress::prelude::*;
use comicpress::request::ensure_default_folders;

#[tokio::main]
async fn main() -> comicpress::error::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let flags: Vec<&str> = args
        .iter()
        .filter(|a| a.starts_with("--"))
        .map(String::as_str)
        .collect();
    let folders: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let (input, output) = match folders.as_slice() {
        [input, output, ..] => (PathBuf::from(input), PathBuf::from(output)),
        _ => ensure_default_folders(&std::env::current_dir()?)?,
    };

    let only_long = flags.contains(&"--only-long");
    let request = ConversionRequest::builder()
        .input_root(input)
        .output_root(output)
        .generate_pdf(!only_long)
        .generate_long_image(only_long || flags.contains(&"--long"))
        .build()?;

    println!("=== comicpress ===");
    println!("Input:  {:?}", request.input_root);
    println!("Output: {:?}", request.output_root);
    println!("Workers: {}\n", request.max_workers);

    let (observer, mut events) = ChannelObserver::new();
    let handle = RunHandle::spawn(request, Arc::new(observer));

    while let Some(event) = events.recv().await {
        match event {
            ConversionEvent::Log(line) => println!("{}", line),
            ConversionEvent::Progress { completed, total } => {
                println!("[{:>3}%] {}/{}", percent(completed, total), completed, total)
            }
            ConversionEvent::Finished { status, detail } => {
                println!("\n{:?}: {}", status, detail);
                break;
            }
        }
    }

    let summary = handle.wait().await?;
    println!(
        "Took {:.1}s ({} converted, {} skipped)",
        summary.elapsed().num_milliseconds() as f64 / 1000.0,
        summary.comics_processed,
        summary.comics_skipped
    );

    Ok(())
}
