/// Content Linter: validates a directory of RON content assets.
///
/// Usage: content_linter <content_dir>
///
/// Files missing from the directory are taken from the built-in content,
/// so a directory holding a single override can be linted on its own.

use narrative_synth::core::library::{
    ASSET_FILES, CHARACTERS_FILE, ENHANCEMENTS_FILE, INSTRUCTIONS_FILE, LEXICON_FILE,
    PERSONALITY_FILE, SCENARIOS_FILE, STORY_ARCS_FILE,
};
use narrative_synth::{ContentLibrary, LibraryError};
use std::path::Path;
use std::process;

/// Pools smaller than this get a low-variety warning.
const RECOMMENDED_POOL: usize = 3;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: content_linter <content_dir>");
        process::exit(0);
    }

    let content_dir = Path::new(&args[1]);
    if !content_dir.is_dir() {
        eprintln!("ERROR: Directory '{}' does not exist", content_dir.display());
        process::exit(1);
    }

    for file in ASSET_FILES {
        if content_dir.join(file).is_file() {
            println!("  Loaded: {}", content_dir.join(file).display());
        } else {
            println!("  Built-in: {}", file);
        }
    }

    // Validation errors still produce a library worth warning about, so
    // parse first and lint separately.
    let library = match ContentLibrary::load_from_dir(content_dir) {
        Ok(library) => library,
        Err(LibraryError::Invalid(_)) => match reload_unvalidated(content_dir) {
            Some(library) => library,
            None => process::exit(1),
        },
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    let errors = library.lint();
    let warnings = lint_variety(&library);

    println!("\n=== Content Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

/// Parse the directory's assets without running validation.
fn reload_unvalidated(dir: &Path) -> Option<ContentLibrary> {
    let mut library = match ContentLibrary::builtin() {
        Ok(library) => library,
        Err(e) => {
            eprintln!("ERROR: built-in content is broken: {}", e);
            return None;
        }
    };
    for file in ASSET_FILES {
        let path = dir.join(file);
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };
        let parsed = match file {
            LEXICON_FILE => ron::from_str(&text).map(|t| library.lexicon = t),
            PERSONALITY_FILE => ron::from_str(&text).map(|t| library.personality = t),
            CHARACTERS_FILE => ron::from_str(&text).map(|t| library.characters = t),
            ENHANCEMENTS_FILE => ron::from_str(&text).map(|t| library.enhancements = t),
            SCENARIOS_FILE => ron::from_str(&text).map(|t| library.scenarios = t),
            STORY_ARCS_FILE => ron::from_str(&text).map(|t| library.arcs = t),
            INSTRUCTIONS_FILE => ron::from_str(&text).map(|t| library.instructions = t),
            _ => Ok(()),
        };
        if let Err(e) = parsed {
            eprintln!("ERROR: RON error in {}: {}", path.display(), e);
            return None;
        }
    }
    Some(library)
}

/// Quality checks that never fail the lint.
fn lint_variety(library: &ContentLibrary) -> Vec<String> {
    let mut warnings = Vec::new();

    for profile in &library.characters.archetypes {
        if profile.names.len() < RECOMMENDED_POOL {
            warnings.push(format!(
                "Archetype '{}' has only {} names (minimum {} recommended)",
                profile.key,
                profile.names.len(),
                RECOMMENDED_POOL
            ));
        }
        if profile.catchphrases.is_empty() {
            warnings.push(format!("Archetype '{}' has no catchphrases", profile.key));
        }
        if !library
            .personality
            .bundles
            .iter()
            .any(|b| b.archetype == profile.key)
        {
            warnings.push(format!(
                "Archetype '{}' has no personality bundle; generic adjustments apply",
                profile.key
            ));
        }
    }

    for franchise in &library.scenarios.franchises {
        for (label, pool) in [
            ("settings", &franchise.settings),
            ("characters", &franchise.characters),
            ("items", &franchise.items),
            ("themes", &franchise.themes),
        ] {
            if pool.len() < RECOMMENDED_POOL {
                warnings.push(format!(
                    "Franchise '{}' has only {} {} (minimum {} recommended)",
                    franchise.name,
                    pool.len(),
                    label,
                    RECOMMENDED_POOL
                ));
            }
        }
        if franchise.backgrounds.len() < RECOMMENDED_POOL {
            warnings.push(format!(
                "Franchise '{}' has {} backgrounds; focus variants will share images",
                franchise.name,
                franchise.backgrounds.len()
            ));
        }
    }

    for known in &library.arcs.known_scenarios {
        for phase in known.phases.iter().skip(1) {
            let has_context = known.contexts.iter().any(|c| c.phase == *phase)
                || library
                    .arcs
                    .contexts
                    .iter()
                    .any(|c| c.phase == *phase && c.theme.eq_ignore_ascii_case(&known.theme));
            if !has_context {
                warnings.push(format!(
                    "Scenario '{}' keeps its old context on entering '{}'",
                    known.title, phase
                ));
            }
        }
        if known.key_characters.is_empty() {
            warnings.push(format!("Scenario '{}' has no key characters", known.title));
        }
    }

    warnings
}
