/// Story arc progression and writing instructions, end to end.
use narrative_synth::schema::character::{Character, Personality};
use narrative_synth::schema::chat::ChatMessage;
use narrative_synth::schema::instructions::{ResponseLength, WritingInstructions, WritingStyle};
use narrative_synth::schema::save::SaveDocument;
use narrative_synth::schema::story_arc::{Phase, StoryArc, Tension};
use narrative_synth::StoryEngine;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const AVENGERS: &str = "Avengers: Alien Invasion";

fn engine() -> StoryEngine {
    StoryEngine::builder().seed(11).build().unwrap()
}

fn say(speaker: &str, text: &str) -> ChatMessage {
    ChatMessage::new(speaker, text)
}

#[test]
fn avengers_arc_starts_in_conflict() {
    let arc = engine().begin_story(AVENGERS, "Aliens pour out of the sky.", "superhero");
    assert_eq!(arc.current_phase, Phase::Conflict);
    assert_eq!(arc.current_tension, Tension::High);
    assert_eq!(
        arc.key_characters,
        vec!["Iron Man", "Captain America", "Thor", "Hulk"]
    );
    assert!(!arc.current_goal.is_empty());
    assert!(!arc.current_context.is_empty());
}

#[test]
fn weakness_moves_avengers_to_planning() {
    let engine = engine();
    let arc = engine.begin_story(AVENGERS, "", "superhero");
    let next = engine.advance_story(
        &arc,
        &[
            say("Thor", "They keep coming."),
            say("Iron Man", "JARVIS found a weakness in their network."),
        ],
    );
    assert_eq!(next.current_phase, Phase::Planning);
    assert_eq!(next.previous_context, arc.current_context);
    assert!(next.plot_points.len() > arc.plot_points.len());
    assert_eq!(arc.current_phase, Phase::Conflict);
}

#[test]
fn unknown_title_uses_generic_phases() {
    let engine = engine();
    let mut arc = engine.begin_story("Lost in the Fog", "A quiet harbor town", "");
    assert_eq!(arc.current_phase, Phase::Introduction);

    let script = [
        ("Mara", "There's a threat out past the reef."),
        ("Jonah", "We need a plan before nightfall."),
        ("Mara", "Showdown at the lighthouse, then."),
        ("Jonah", "It's over. We're safe."),
    ];
    let mut phases = vec![arc.current_phase];
    for (speaker, text) in script {
        arc = engine.advance_story(&arc, &[say(speaker, text)]);
        phases.push(arc.current_phase);
    }
    assert_eq!(
        phases,
        vec![
            Phase::Introduction,
            Phase::Conflict,
            Phase::Planning,
            Phase::Climax,
            Phase::Resolution
        ]
    );
    assert_eq!(arc.current_tension, Tension::Falling);
    assert!(arc.key_characters.iter().any(|c| c == "Mara"));
    assert!(arc.key_characters.iter().any(|c| c == "Jonah"));
}

#[test]
fn resolved_arc_stays_resolved() {
    let engine = engine();
    let mut arc = engine.begin_story(AVENGERS, "", "superhero");
    arc.current_phase = Phase::Resolution;
    let next = engine.advance_story(&arc, &[say("Thor", "Attack! Regroup! Victory!")]);
    assert_eq!(next.current_phase, Phase::Resolution);
}

#[test]
fn empty_conversation_changes_nothing() {
    let engine = engine();
    let arc = engine.begin_story(AVENGERS, "", "superhero");
    assert_eq!(engine.advance_story(&arc, &[]), arc);
}

#[test]
fn high_humor_character_writes_witty() {
    let mut engine = engine();
    let mut character = engine.character("shopkeeper");
    character.personality = Personality {
        analytical: 4,
        emotional: 5,
        philosophical: 3,
        humor: 9,
        confidence: 6,
        creativity: None,
        sociability: None,
    };
    character.talkativeness = 8;

    let arc = engine.begin_story(AVENGERS, "", "superhero");
    let out = engine.instruct(Some(&arc), Some(&character));
    assert_eq!(out.writing_style, WritingStyle::Witty);
    assert_eq!(out.response_length, ResponseLength::Long);
    assert!(out.character_reminders.contains(&character.name));
    assert!(out.general_notes.contains(AVENGERS));
}

#[test]
fn instructions_without_arc_or_character_use_defaults() {
    let out = engine().instruct(None, None);
    assert_eq!(out.writing_style, WritingStyle::Balanced);
    assert_eq!(out.response_length, ResponseLength::Medium);
    assert!(out.character_reminders.is_empty());
}

#[test]
fn instructions_need_both_arc_and_character() {
    let mut engine = engine();
    let arc = engine.begin_story(AVENGERS, "", "superhero");
    let character = engine.character("witty inventor");

    let arc_only = engine.instruct(Some(&arc), None);
    assert_eq!(arc_only, WritingInstructions::default());
    assert!(arc_only.story_arc.is_empty());
    assert!(arc_only.general_notes.is_empty());

    let character_only = engine.instruct(None, Some(&character));
    assert_eq!(character_only, WritingInstructions::default());
}

#[test]
fn avengers_arc_outside_its_phases_uses_generic_keywords() {
    let engine = engine();
    let mut arc = engine.begin_story(AVENGERS, "", "superhero");
    arc.current_phase = Phase::Introduction;
    let next = engine.advance_story(&arc, &[say("Cap", "An enemy attack! Danger!")]);
    assert_eq!(next.current_phase, Phase::Conflict);

    let next = engine.advance_story(&next, &[say("Tony", "I found a weakness.")]);
    assert_eq!(next.current_phase, Phase::Planning);
}

#[test]
fn camel_case_save_resumes_without_normalization() {
    let engine = engine();
    let json = r#"{
        "room_name": "Tower",
        "created_at": "2024-05-01T12:00:00Z",
        "updated_at": "2024-05-01T12:30:00Z",
        "story_arc": {
            "title": "Avengers: Alien Invasion",
            "theme": "superhero",
            "currentPhase": "climax",
            "currentTension": "very high",
            "currentGoal": "Close the portal",
            "keyCharacters": ["Thor"],
            "keyLocations": [],
            "plotPoints": [],
            "currentContext": "The portal hangs over the tower.",
            "previousContext": ""
        }
    }"#;
    let arc = SaveDocument::from_json(json).unwrap().story_arc.unwrap();
    assert_eq!(arc.current_phase, Phase::Climax);
    assert_eq!(arc.current_goal, "Close the portal");
    assert_eq!(arc.key_characters, vec!["Thor"]);

    let next = engine.advance_story(&arc, &[say("Thor", "The portal closed. Victory!")]);
    assert_eq!(next.current_phase, Phase::Resolution);
    assert_eq!(next.current_tension, Tension::Falling);
}

#[test]
fn loaded_character_is_clamped_before_instructions() {
    let mut engine = engine();
    let arc = engine.begin_story(AVENGERS, "", "superhero");
    let mut value = serde_json::to_value(engine.character("shopkeeper")).unwrap();
    value["personality"]["humor"] = 200.into();
    value["talkativeness"] = 0.into();
    let character: Character = serde_json::from_value(value).unwrap();

    assert_eq!(character.personality.humor, 10);
    assert_eq!(character.talkativeness, 1);
    let out = engine.instruct(Some(&arc), Some(&character));
    assert_eq!(out.response_length, ResponseLength::Brief);
}

#[test]
fn saved_arc_resumes_where_it_left_off() {
    let engine = engine();
    let mut doc = SaveDocument::new("Tower Defense", "superhero");
    doc.chat_history = vec![say("Cap", "Regroup at the tower, we need a strategy.")];
    let arc = engine.begin_story(AVENGERS, "", "superhero");
    doc.story_arc = Some(engine.advance_story(&arc, &doc.chat_history));

    let restored = SaveDocument::from_json(&doc.to_json().unwrap()).unwrap();
    let resumed = restored.story_arc.unwrap();
    assert_eq!(resumed.current_phase, Phase::Planning);

    let next = engine.advance_story(&resumed, &[say("Thor", "Avengers, attack!")]);
    assert_eq!(next.current_phase, Phase::Climax);
    assert_eq!(next.current_tension, Tension::VeryHigh);
}

fn chatter() -> impl Strategy<Value = Vec<ChatMessage>> {
    let lines = prop::sample::select(vec![
        "We should regroup.",
        "Attack now!",
        "Victory is ours.",
        "I found their weakness.",
        "Let's go, final push!",
        "Is anyone hurt?",
        "There's a threat nearby.",
        "We need a plan.",
        "Nothing happened today.",
    ]);
    prop::collection::vec(lines.prop_map(|l| ChatMessage::new("Sam", l)), 0..6)
}

proptest! {
    #[test]
    fn phases_never_move_backward(
        title in prop::sample::select(vec![AVENGERS, "Murder at Blackwood Manor", "Untitled"]),
        turns in prop::collection::vec(chatter(), 1..10),
    ) {
        let engine = StoryEngine::builder().build().unwrap();
        let mut arc: StoryArc = engine.begin_story(title, "", "");
        for messages in &turns {
            let next = engine.advance_story(&arc, messages);
            prop_assert!(next.current_phase.rank() >= arc.current_phase.rank());
            if arc.current_phase == Phase::Resolution {
                prop_assert_eq!(next.current_phase, Phase::Resolution);
            }
            arc = next;
        }
    }
}
