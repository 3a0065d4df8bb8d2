/// Preview: interactive synthesis shell for trying out content.
///
/// Usage: preview [--content <dir>] [--seed <n>]
///
/// Commands:
///   character <keywords>      synthesize a character
///   describe <text>           character from a free-text description
///   scenario <keywords>       synthesize a scenario with its cast
///   quick <keywords>          three quick-scenario variants
///   cast <n> <keywords>       n diverse characters
///   story <theme> <title...>  start a story arc
///   say <speaker>: <message>  add a chat line and advance the arc
///   arc                       show the current arc
///   instruct                  writing instructions for the last character
///   seed <n>                  rebuild the engine with a new seed
///   help                      list commands
///   quit                      exit

use narrative_synth::schema::character::Character;
use narrative_synth::schema::chat::ChatMessage;
use narrative_synth::schema::scenario::Scenario;
use narrative_synth::schema::story_arc::StoryArc;
use narrative_synth::{PipelineError, StoryEngine};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("narrative_synth=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut content_dir: Option<PathBuf> = None;
    let mut seed: u64 = 42;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--content" if i + 1 < args.len() => {
                i += 1;
                content_dir = Some(PathBuf::from(&args[i]));
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut engine = build_engine(content_dir.as_ref(), seed)?;
    println!("Seed: {}", seed);
    println!("Type 'help' for commands.\n");

    // Session state
    let mut last_character: Option<Character> = None;
    let mut arc: Option<StoryArc> = None;
    let mut history: Vec<ChatMessage> = Vec::new();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd.to_lowercase(), rest.trim()),
            None => (line.to_lowercase(), ""),
        };

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "character" | "char" => {
                let c = engine.character(rest);
                print_character(&c);
                last_character = Some(c);
            }
            "describe" => match engine.character_from_description(rest) {
                Some(c) => {
                    print_character(&c);
                    last_character = Some(c);
                }
                None => println!("Usage: describe <text>"),
            },
            "scenario" => {
                let s = engine.scenario(rest);
                print_scenario(&s);
                if let Some(first) = s.characters.first() {
                    last_character = Some(first.clone());
                }
            }
            "quick" => {
                for s in engine.quick_scenarios(rest) {
                    print_scenario(&s);
                }
            }
            "cast" => {
                let (count, keywords) = match rest.split_once(char::is_whitespace) {
                    Some((n, kw)) => (n.parse::<usize>().ok(), kw),
                    None => (rest.parse::<usize>().ok(), ""),
                };
                let Some(count) = count else {
                    println!("Usage: cast <n> <keywords>");
                    continue;
                };
                let cast = engine.cast(keywords, count);
                for c in &cast {
                    println!(
                        "  {} [{}] {} / {}",
                        c.name,
                        c.role.as_deref().unwrap_or("-"),
                        c.character_type,
                        c.archetype.as_deref().unwrap_or("generic")
                    );
                }
                last_character = cast.into_iter().last().or(last_character);
            }
            "story" => {
                let Some((theme, title)) = rest.split_once(char::is_whitespace) else {
                    println!("Usage: story <theme> <title...>");
                    continue;
                };
                let started = engine.begin_story(title.trim(), title.trim(), theme);
                history.clear();
                print_arc(&started);
                arc = Some(started);
            }
            "say" => {
                let Some(current) = arc.as_ref() else {
                    println!("No story in progress. Start one with 'story <theme> <title>'.");
                    continue;
                };
                let Some((speaker, message)) = rest.split_once(':') else {
                    println!("Usage: say <speaker>: <message>");
                    continue;
                };
                history.push(ChatMessage::new(speaker.trim(), message.trim()));
                let next = engine.advance_story(current, &history);
                if next.current_phase != current.current_phase {
                    println!(
                        "  Phase: {} -> {} (tension {})",
                        current.current_phase, next.current_phase, next.current_tension
                    );
                }
                if next.current_goal != current.current_goal {
                    println!("  Goal: {}", next.current_goal);
                }
                arc = Some(next);
            }
            "arc" => match arc.as_ref() {
                Some(a) => print_arc(a),
                None => println!("No story in progress."),
            },
            "instruct" => {
                let out = engine.instruct(arc.as_ref(), last_character.as_ref());
                println!("\n--- Writing Instructions ---");
                println!("Style:   {:?}", out.writing_style);
                println!("Length:  {:?}", out.response_length);
                if !out.story_arc.is_empty() {
                    println!("Arc:     {}", out.story_arc);
                }
                if !out.character_reminders.is_empty() {
                    println!("Remind:  {}", out.character_reminders);
                }
                if !out.general_notes.is_empty() {
                    println!("Notes:   {}", out.general_notes);
                }
                println!("--- End ---\n");
            }
            "seed" => match rest.parse::<u64>() {
                Ok(n) => match build_engine(content_dir.as_ref(), n) {
                    Ok(e) => {
                        engine = e;
                        println!("Seed set to {}", n);
                    }
                    Err(e) => println!("ERROR: {}", e),
                },
                Err(_) => println!("Usage: seed <n>"),
            },
            other => println!("Unknown command '{}'. Type 'help' for commands.", other),
        }
    }

    Ok(())
}

fn build_engine(content_dir: Option<&PathBuf>, seed: u64) -> Result<StoryEngine, PipelineError> {
    let builder = StoryEngine::builder().seed(seed);
    match content_dir {
        Some(dir) => builder.content_dir(dir).build(),
        None => builder.build(),
    }
}

fn print_character(c: &Character) {
    println!("\n--- {} ---", c.name);
    println!(
        "Type: {}  Archetype: {}  Mood: {}  Avatar: {}",
        c.character_type,
        c.archetype.as_deref().unwrap_or("generic"),
        c.mood,
        c.avatar
    );
    let traits: Vec<String> = c
        .personality
        .iter()
        .map(|(t, v)| format!("{}={}", t.as_str(), v))
        .collect();
    println!("Personality: {}", traits.join(" "));
    println!(
        "Talkativeness: {}  Thinking speed: {:.2}",
        c.talkativeness, c.thinking_speed
    );
    println!("Voice: {}", c.voice_style);
    println!("Opening: {}", c.opening_line);
    println!("{}", c.description);
    for phrase in &c.catchphrases {
        println!("  \"{}\"", phrase);
    }
    println!();
}

fn print_scenario(s: &Scenario) {
    println!("\n=== {} ===", s.title);
    match (&s.franchise, s.focus) {
        (Some(franchise), Some(focus)) => {
            println!("Type: {}  Franchise: {}  Focus: {:?}", s.scenario_type, franchise, focus)
        }
        _ => println!("Type: {}", s.scenario_type),
    }
    println!("Background: {}", s.background);
    println!("{}", s.description);
    println!("> {}", s.prompt);
    for c in &s.characters {
        println!(
            "  - {} [{}] ({})",
            c.name,
            c.role.as_deref().unwrap_or("-"),
            c.archetype.as_deref().unwrap_or("generic")
        );
    }
    println!();
}

fn print_arc(a: &StoryArc) {
    println!("\n--- {} ({}) ---", a.title, a.theme);
    println!("Phase: {}  Tension: {}", a.current_phase, a.current_tension);
    println!("Goal: {}", a.current_goal);
    println!("Context: {}", a.current_context);
    if !a.key_characters.is_empty() {
        println!("Characters: {}", a.key_characters.join(", "));
    }
    if !a.key_locations.is_empty() {
        println!("Locations: {}", a.key_locations.join(", "));
    }
    for point in &a.plot_points {
        println!("  * {}", point);
    }
    println!();
}

fn print_usage() {
    println!("Preview: interactive synthesis shell for characters, scenarios and story arcs.");
    println!();
    println!("Usage: preview [--content <dir>] [--seed <n>]");
    println!();
    println!("  --content <dir>  Directory of RON content overrides (optional)");
    println!("  --seed <n>       Initial RNG seed (default: 42)");
}

fn print_help() {
    println!("Commands:");
    println!("  character <keywords>      Synthesize a character");
    println!("  describe <text>           Character from a free-text description");
    println!("  scenario <keywords>       Synthesize a scenario with its cast");
    println!("  quick <keywords>          Three quick-scenario variants");
    println!("  cast <n> <keywords>       n diverse characters");
    println!("  story <theme> <title...>  Start a story arc");
    println!("  say <speaker>: <message>  Add a chat line and advance the arc");
    println!("  arc                       Show the current arc");
    println!("  instruct                  Writing instructions for the last character");
    println!("  seed <n>                  Rebuild the engine with a new seed");
    println!("  help                      Show this help");
    println!("  quit                      Exit");
}
