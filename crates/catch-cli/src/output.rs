//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use catch_core::{format_price, Fish, FishKey, Locale, OrderLine, OrderSummary};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a generated store name
    pub fn print_name(&self, name: &str) {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::json!({ "name": name })),
            OutputFormat::Human | OutputFormat::Quiet => println!("{}", name),
        }
    }

    /// Print a single fish
    pub fn print_fish(&self, key: &FishKey, fish: &Fish, locale: Locale) {
        match self.format {
            OutputFormat::Human => {
                println!("Key:         {}", key);
                println!("Name:        {}", fish.name);
                println!("Price:       {}", format_price(fish.price, locale));
                println!("Status:      {}", fish.status.label());
                if !fish.desc.is_empty() {
                    println!("Description: {}", fish.desc);
                }
                if !fish.image.is_empty() {
                    println!("Image:       {}", fish.image);
                }
            }
            OutputFormat::Json => {
                println!("{}", fish_json(key, fish));
            }
            OutputFormat::Quiet => {
                println!("{}", key);
            }
        }
    }

    /// Print the store's menu
    pub fn print_fishes<'a>(
        &self,
        fishes: impl IntoIterator<Item = (&'a FishKey, &'a Fish)>,
        locale: Locale,
    ) {
        let fishes: Vec<_> = fishes.into_iter().collect();

        match self.format {
            OutputFormat::Human => {
                if fishes.is_empty() {
                    println!("No fish yet. Try `catch fish samples`.");
                    return;
                }
                for (key, fish) in &fishes {
                    println!(
                        "{} | {:<20} | {:>10} | {}",
                        key,
                        truncate(&fish.name, 20),
                        format_price(fish.price, locale),
                        fish.status.label()
                    );
                }
                println!("\n{} fish", fishes.len());
            }
            OutputFormat::Json => {
                let json: Vec<_> = fishes
                    .iter()
                    .map(|(key, fish)| fish_json(key, fish))
                    .collect();
                println!("{}", serde_json::Value::Array(json));
            }
            OutputFormat::Quiet => {
                for (key, _) in &fishes {
                    println!("{}", key);
                }
            }
        }
    }

    /// Print order lines and the total
    pub fn print_order(&self, summary: &OrderSummary, locale: Locale) {
        match self.format {
            OutputFormat::Human => {
                println!("Your Order");
                println!("──────────");
                if summary.is_empty() {
                    println!("Nothing ordered yet.");
                }
                for line in &summary.lines {
                    match line {
                        OrderLine::Available { .. } => println!("{}", line.render(locale)),
                        OrderLine::Unavailable { .. } => println!("✗ {}", line.render(locale)),
                    }
                }
                println!();
                println!("Total: {}", summary.total_text(locale));
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "lines": summary.lines,
                        "total": summary.total,
                        "total_text": summary.total_text(locale),
                    })
                );
            }
            OutputFormat::Quiet => {
                println!("{}", summary.total_text(locale));
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Warn on stderr (suppressed in quiet mode)
    pub fn warn(&self, msg: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", msg);
        }
    }
}

fn fish_json(key: &FishKey, fish: &Fish) -> serde_json::Value {
    serde_json::json!({
        "key": key,
        "name": fish.name,
        "price": fish.price,
        "status": fish.status,
        "desc": fish.desc,
        "image": fish.image,
    })
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
