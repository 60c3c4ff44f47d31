use clap::{CommandFactory, Parser};
use clap_complete::generate;
use grace2json::cli::{self, Cli, Commands, OutputFormat};
use grace2json::input::PipelineConfig;
use grace2json::log::{config_echo, show_farewell_with_timing, show_greeting};
use grace2json::{fetch, info, process_groundwater_job};
use log::error;
use std::io;
use std::time::Instant;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    // Failures are reported on the log stream and the process still exits
    // through the default success path; nothing downstream consumes an exit
    // code from this tool.
    if let Err(err) = dispatch(cli) {
        error!("An error occurred during processing: {err}");
    }
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_source = cli
        .config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string());

    match cli.command {
        Commands::Fetch => {
            let config = cli::load_config(cli.config.as_deref(), None)?;
            fetch::fetch_all(&config);
            Ok(())
        }
        Commands::Extract { args } => {
            let config = cli::load_config(cli.config.as_deref(), Some(&args))?;
            run_pipeline(&config_source, &config, false)
        }
        Commands::Run { args } => {
            let config = cli::load_config(cli.config.as_deref(), Some(&args))?;
            run_pipeline(&config_source, &config, true)
        }
        Commands::Info {
            file,
            detailed,
            variable,
            format,
        } => {
            let netcdf_info = info::get_netcdf_info(&file, variable.as_deref(), detailed)?;
            match format {
                OutputFormat::Human => info::print_file_info_human(&netcdf_info),
                OutputFormat::Json => info::print_file_info_json(&netcdf_info)?,
                OutputFormat::Yaml => info::print_file_info_yaml(&netcdf_info)?,
            }
            Ok(())
        }
        Commands::Template { format, output } => {
            let rendered = cli::render_template(&format)?;
            match output {
                Some(path) => std::fs::write(&path, rendered)?,
                None => println!("{rendered}"),
            }
            Ok(())
        }
        Commands::Completions { shell, output } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            match output {
                Some(path) => {
                    let mut file = std::fs::File::create(&path)?;
                    generate(shell, &mut cmd, name, &mut file);
                }
                None => generate(shell, &mut cmd, name, &mut io::stdout()),
            }
            Ok(())
        }
    }
}

fn run_pipeline(
    config_source: &str,
    config: &PipelineConfig,
    with_fetch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();

    show_greeting(config_source);
    config_echo(config);

    if with_fetch {
        fetch::fetch_all(config);
    }
    process_groundwater_job(config)?;

    show_farewell_with_timing(start_time.elapsed());
    Ok(())
}
