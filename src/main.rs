use std::io;

use clap::Parser;
use form_crawler::cli::commands::{
    ModelSettings, build_classifier, build_generator, cmd_crawl, cmd_diagnose, cmd_generate,
    cmd_run,
};
use form_crawler::cli::config::{
    Cli, Commands, build_crawl_options, build_launch_options, build_load_options,
    build_runner_options, load_config,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging(verbose: u8, debug: bool) {
    let default_filter = match (verbose, debug) {
        (0, false) => "form_crawler=info,warn",
        (0, true) | (1, _) => "form_crawler=debug,info",
        _ => "form_crawler=trace,debug",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    let config = load_config(cli.config.as_deref());
    let launch = build_launch_options(cli.headed, &config.browser);

    match cli.command {
        Commands::Crawl {
            url,
            spa,
            csv,
            json,
        } => {
            let crawl = build_crawl_options(cli.timeout, spa, &config);
            cmd_crawl(&url, &crawl, &launch, csv.as_deref(), json.as_deref())?;
        }
        Commands::Generate {
            url,
            spa,
            generator,
            classifier,
            output_root,
            api_key,
            model,
            endpoint,
        } => {
            // CLI > config > defaults; the API key already folds in the env var
            let generator_kind = generator.unwrap_or(config.ai.generator);
            let classifier_kind = classifier.unwrap_or(config.ai.classifier);
            let settings = ModelSettings::resolve(api_key, model, endpoint, &config.ai);

            let generator = build_generator(generator_kind, &settings)?;
            let classifier = build_classifier(classifier_kind, generator_kind, &settings)?;
            let crawl = build_crawl_options(cli.timeout, spa, &config);
            let output_root = output_root.unwrap_or_else(|| config.output.root.clone());

            cmd_generate(
                &url,
                &crawl,
                &launch,
                generator.as_ref(),
                classifier.as_ref(),
                &output_root,
            )?;
        }
        Commands::Run {
            dir,
            format,
            output,
            script_timeout,
            harden,
        } => {
            let options = build_runner_options(script_timeout, harden, &config.runner);
            let dir = dir.unwrap_or_else(|| config.output.root.clone());
            let all_passed = cmd_run(&dir, format, output.as_deref(), &options)?;
            if !all_passed {
                std::process::exit(1);
            }
        }
        Commands::Diagnose { url } => {
            let load = build_load_options(cli.timeout, &config.browser);
            cmd_diagnose(&url, &load, &launch)?;
        }
    }

    Ok(())
}
