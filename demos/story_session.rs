/// Story Session example: a scripted chat walked through a story arc.
///
/// A mini story: scattered heroes → a weakness found → the assault → victory.
/// Each turn prints the arc state and the writing instructions the next
/// speaker would receive, then the whole room is saved as JSON.
///
/// Run with: cargo run --example story_session

use narrative_synth::schema::chat::ChatMessage;
use narrative_synth::schema::save::SaveDocument;
use narrative_synth::StoryEngine;

const TITLE: &str = "Avengers: Alien Invasion";

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("narrative_synth=info".parse().expect("valid directive")),
        )
        .init();

    let mut engine = StoryEngine::builder()
        .seed(7)
        .message_window(3)
        .build()
        .expect("Failed to build engine");

    let mut room = SaveDocument::new("Stark Tower", "superhero");
    room.opening_prompt = "Aliens pour out of a portal above Manhattan.".to_string();
    room.characters = vec![
        engine.character("confident genius inventor"),
        engine.character("brave loyal soldier leader"),
        engine.character("bold funny thunder"),
    ];

    let mut arc = engine.begin_story(TITLE, &room.opening_prompt, &room.theme);
    println!("Phase: {}  Tension: {}", arc.current_phase, arc.current_tension);
    println!("Goal:  {}\n", arc.current_goal);

    let script = [
        ("Tony", "They just keep coming through that hole in the sky."),
        ("Steve", "Civilians are trapped on 42nd street. We need to get them out."),
        ("Tony", "Wait. Every ship is slaved to the mothership. That's their weakness."),
        ("Steve", "Then we regroup and hit it together. Avengers, attack!"),
        ("Thor", "The portal closed! The invaders are retreating. Victory!"),
    ];

    for (turn, (speaker, line)) in script.into_iter().enumerate() {
        room.chat_history.push(ChatMessage::new(speaker, line));
        let next = engine.advance_story(&arc, &room.chat_history);

        println!("--- Turn {} ---", turn + 1);
        println!("{}: {}", speaker, line);
        if next.current_phase != arc.current_phase {
            println!(
                "  * phase {} -> {}, tension {}",
                arc.current_phase, next.current_phase, next.current_tension
            );
        }
        if next.current_goal != arc.current_goal {
            println!("  * goal: {}", next.current_goal);
        }
        arc = next;

        let responder = &room.characters[turn % room.characters.len()];
        let out = engine.instruct(Some(&arc), Some(responder));
        println!(
            "  next: {} ({:?}, {:?})",
            responder.name, out.writing_style, out.response_length
        );
        println!("  notes: {}\n", out.general_notes);
    }

    println!("Known characters: {}", arc.key_characters.join(", "));
    for point in &arc.plot_points {
        println!("  * {}", point);
    }

    room.story_arc = Some(arc);
    room.touch();
    match room.to_json() {
        Ok(json) => println!("\nSaved room ({} bytes):\n{}", json.len(), json),
        Err(e) => eprintln!("Failed to save room: {}", e),
    }
}
