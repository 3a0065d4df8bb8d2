/// Quick Scenario example: franchise-focused and generic scenario synthesis.
///
/// Run with: cargo run --example quick_scenario [keywords...]

use narrative_synth::schema::scenario::Scenario;
use narrative_synth::StoryEngine;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("narrative_synth=info".parse().expect("valid directive")),
        )
        .init();

    let keywords: Vec<String> = std::env::args().skip(1).collect();
    let keywords = if keywords.is_empty() {
        "star wars battle".to_string()
    } else {
        keywords.join(" ")
    };

    let mut engine = StoryEngine::builder()
        .seed(2026)
        .build()
        .expect("Failed to build engine");

    println!("=== Quick scenarios for \"{}\" ===", keywords);
    for scenario in engine.quick_scenarios(&keywords) {
        print_scenario(&scenario);
    }

    // The same keywords through the single-scenario path, no franchise focus.
    println!("=== Single scenario for \"{}\" ===", keywords);
    print_scenario(&engine.scenario(&keywords));

    println!("=== Cast of five for \"haunted lighthouse\" ===");
    for c in engine.cast("haunted lighthouse", 5) {
        println!(
            "  {:<24} {:<10} {:<8} mood={} voice={}",
            c.name,
            c.role.as_deref().unwrap_or("-"),
            c.character_type,
            c.mood,
            c.voice_style
        );
    }
}

fn print_scenario(s: &Scenario) {
    println!();
    match s.focus {
        Some(focus) => println!("[{:?}] {}", focus, s.title),
        None => println!("[{}] {}", s.scenario_type, s.title),
    }
    println!("  {}", s.description);
    println!("  > {}", s.prompt);
    println!("  background: {}", s.background);
    for c in &s.characters {
        println!(
            "  - {} ({}, {}): \"{}\"",
            c.name,
            c.role.as_deref().unwrap_or("-"),
            c.archetype.as_deref().unwrap_or("generic"),
            c.opening_line
        );
    }
    println!();
}
