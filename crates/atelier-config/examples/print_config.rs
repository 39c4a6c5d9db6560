/// Example program to print the loaded configuration
///
/// Run with: cargo run -p atelier-config --example print_config

fn main() {
    let config = atelier_config::AtelierConfig::load();

    println!("=== Atelier Configuration ===\n");

    println!("Site:");
    println!("  Label: {}", config.site.label);
    println!("  Root page: {}", config.site.root_page);
    println!("  Default theme: {}", config.site.default_theme);
    println!();

    println!("Preview:");
    println!("  Allowed origins: {:?}", config.preview.allowed_origins);
    println!("  Host origin: {}", config.preview.host_origin);
    println!("  Render debounce: {}ms", config.preview.render_debounce_ms);
    println!();

    println!("Collaborators:");
    println!("  Base URL: {:?}", config.collaborators.base_url);
    println!("  Timeout: {}s", config.collaborators.timeout_secs);
    println!();

    match toml::to_string_pretty(&config) {
        Ok(toml_str) => {
            println!("=== Serialized Configuration ===");
            println!("{}", toml_str);
        }
        Err(e) => eprintln!("Failed to serialize config: {}", e),
    }
}
