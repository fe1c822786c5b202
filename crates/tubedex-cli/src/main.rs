// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, bail};
use config::Config;
use runtime::LlmRuntime;
use std::env;
use std::path::PathBuf;
use tubedex_app::AppState;
use tubedex_catalog::Catalog;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `tubedex --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let catalog = load_catalog(&options, &config)?;

    let llm_client = if config.llm_enabled() {
        match config.llm_api_key() {
            Some(api_key) => Some(
                tubedex_llm::Client::new(
                    config.llm_base_url(),
                    config.llm_model(),
                    &api_key,
                    config.llm_timeout()?,
                )
                .with_context(|| {
                    format!(
                        "invalid [llm] config in {}; fix base_url/model/timeout values",
                        options.config_path.display()
                    )
                })?,
            ),
            None => bail!(
                "llm.enabled is true but no API key is configured; set llm.api_key in {} or export GEMINI_API_KEY, or set llm.enabled = false",
                options.config_path.display()
            ),
        }
    } else {
        None
    };

    if options.check_only {
        println!(
            "config ok; catalog ok ({} channels); llm {}",
            catalog.len(),
            if llm_client.is_some() {
                "configured"
            } else {
                "disabled"
            },
        );
        return Ok(());
    }

    let mut state = AppState {
        view_mode: config.view_mode(),
        summary_visible: config.show_summary(),
        ..AppState::default()
    };

    let mut runtime = LlmRuntime::new(llm_client);
    tubedex_tui::run_app(catalog.channels(), &mut state, &mut runtime)
}

/// CLI flag wins, then the config value, then a catalog file at the
/// default location if one exists, then the built-in directory.
fn load_catalog(options: &CliOptions, config: &Config) -> Result<Catalog> {
    let explicit = options
        .catalog_path
        .clone()
        .or_else(|| config.catalog_path());

    if let Some(path) = explicit {
        tubedex_catalog::validate_catalog_path(&path.to_string_lossy())?;
        return Catalog::load(&path).with_context(|| {
            format!(
                "load catalog {} -- if this path is wrong, fix [catalog].path or --catalog",
                path.display()
            )
        });
    }

    let default = tubedex_catalog::default_catalog_path()?;
    if default.exists() {
        return Catalog::load(&default);
    }
    Catalog::builtin()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    catalog_path: Option<PathBuf>,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        catalog_path: None,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--catalog" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--catalog requires a file path"))?;
                options.catalog_path = Some(PathBuf::from(value.as_ref()));
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("tubedex");
    println!("  --config <path>          Use a specific config path");
    println!("  --catalog <path>         Load channels from a JSON catalog file");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config, catalog, and [llm] settings");
    println!("  --help                   Show this help");
}
