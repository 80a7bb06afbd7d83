// src/banner.rs

/// Prints the startup banner to the console.
pub fn print_banner(api_base: &str) {
    let banner = r#"
 _ _                             _
| (_)_   _____    _____   ____ _| |
| | \ \ / / _ \  / _ \ \ / / _` | |
| | |\ V /  __/ |  __/\ V / (_| | |
|_|_| \_/ \___|  \___| \_/ \__,_|_|

    Live code evaluation client
"#;
    println!("{}", banner);
    println!("🔗 Evaluation service: {}", api_base);
}
