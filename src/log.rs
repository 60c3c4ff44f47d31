use crate::input::PipelineConfig;
use std::time::Duration;

pub fn show_greeting(config_source: &str) {
    println!("=== GRACE Groundwater Extractor ===");
    println!("Loading configuration from: {}", config_source);
}

pub fn config_echo(config: &PipelineConfig) {
    println!("\nConfiguration:");
    println!("  Missions:");
    for mission in &config.missions {
        println!(
            "    {}: {} -> {}",
            mission.name,
            mission.collection,
            mission.data_dir.display()
        );
    }
    println!("  Variable: {}", config.variable_name);
    println!("  Output directory: {}", config.output_dir.display());
    println!("  Number of countries: {}", config.countries.len());
    for (name, bounds) in &config.countries {
        println!(
            "    {}: lon {}..{}, lat {}..{}",
            name, bounds.lon_min, bounds.lon_max, bounds.lat_min, bounds.lat_max
        );
    }
}

pub fn show_farewell_with_timing(elapsed: Duration) {
    println!("\n=== Processing complete in {:.2?} ===", elapsed);
}
