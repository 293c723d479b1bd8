use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Context;
use chrono::Local;

use cv_extractor::config::{self, ExtractorConfig};
use cv_extractor::pipeline::batch::{BatchError, BatchEvent, BatchRunner, ThreadSleepPacer};
use cv_extractor::pipeline::extraction::DocumentExtractor;
use cv_extractor::pipeline::structuring::build_llm_client;

fn main() -> anyhow::Result<()> {
    cv_extractor::init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ExtractorConfig::from_env().context("Invalid configuration")?;
    tracing::info!(
        provider = config.provider.as_str(),
        model = %config.model,
        delay_secs = config.min_delay().as_secs_f64(),
        "Configuration loaded"
    );

    let folder = prompt_folder()?;
    let folder = Path::new(&folder);
    if !folder.is_dir() {
        println!("Error: Directory '{}' does not exist.", folder.display());
        return Ok(());
    }

    let llm = build_llm_client(&config).context("Failed to set up the LLM client")?;
    let runner = BatchRunner::new(
        Box::new(DocumentExtractor::from_config(&config)),
        llm,
        Box::new(ThreadSleepPacer),
        &config,
    );

    let outcome = match runner.run_with_progress(folder, &print_progress) {
        Ok(outcome) => outcome,
        Err(BatchError::DirectoryNotFound(dir)) => {
            println!("Error: Directory '{}' does not exist.", dir.display());
            return Ok(());
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Batch run failed")),
    };

    match outcome
        .export(&config.output_dir, Local::now().naive_local())
        .context("Failed to write the spreadsheet")?
    {
        Some(path) => println!("\nAll data saved to {}", path.display()),
        None => println!("No data processed."),
    }
    Ok(())
}

fn prompt_folder() -> anyhow::Result<String> {
    print!("Enter the full folder path containing CV files: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_progress(event: BatchEvent) {
    match event {
        BatchEvent::Started { total } => println!("Found {total} CV file(s)."),
        BatchEvent::Processing { file_name, .. } => println!("\nProcessing: {file_name}"),
        BatchEvent::Failed { error, .. } => println!("Error parsing response: {error}"),
        BatchEvent::Renamed { from, to, .. } => println!("Renamed '{from}' to '{to}'"),
        BatchEvent::RenameFailed { error, .. } => println!("Could not rename file: {error}"),
        BatchEvent::Pausing { delay } => println!(
            "Sleeping for {:.2} seconds to respect rate limit...",
            delay.as_secs_f64()
        ),
        BatchEvent::Recorded { .. } | BatchEvent::Completed { .. } => {}
    }
}
