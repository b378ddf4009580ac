//! Invariants of the stemming pipeline and the index, checked end to end.

use firms_engine::QueryInput;
use firms_model::{
    DEFAULT_WINDOW, GeneralNote, Pitch, Snippet, Step, quarter_length, snippets, split_voices,
};
use firms_retrieval_tests::{ranking, sqlite_engine, tiny};
use firms_stem::{Stemmer, StemmerRegistry};
use firms_store::IndexStore;

fn note(step: Step, octave: i8) -> GeneralNote {
    GeneralNote::note(Pitch::new(step, 0, octave), quarter_length(4, 0))
}

#[test]
fn snippet_count_per_voice_is_length_minus_window_plus_one() {
    for length in [0usize, 3, 5, 6, 12] {
        let events: Vec<GeneralNote> = (0..length).map(|_| note(Step::C, 4)).collect();
        let expected = length.saturating_sub(DEFAULT_WINDOW - 1);
        assert_eq!(
            snippets(&events, DEFAULT_WINDOW).count(),
            expected,
            "length {length}"
        );
    }
}

#[test]
fn indexed_snippet_count_matches_the_formula() {
    // Two parts of lengths 8 and 5: (8−5+1) + (5−5+1) = 5 snippets.
    let dir = tempfile::tempdir().unwrap();
    let mut engine = sqlite_engine(dir.path());

    let mut score = tiny("c d e f g a b c'");
    score.parts.push(tiny("g f e d c").parts.remove(0));
    engine.add_piece(&score, "/corpus/two-parts.tiny", false).unwrap();

    assert_eq!(engine.store().stats().unwrap().snippets, 5);
}

#[test]
fn contour_stems_have_window_minus_one_tokens() {
    let registry = StemmerRegistry::standard();
    let contour = registry.get("By Contour").unwrap();
    let events: Vec<GeneralNote> = [Step::C, Step::E, Step::D, Step::G, Step::C]
        .iter()
        .map(|s| note(*s, 4))
        .collect();
    for snippet in snippets(&events, DEFAULT_WINDOW) {
        for stem in contour.stem(&snippet).unwrap() {
            assert_eq!(stem.split(' ').count(), DEFAULT_WINDOW - 1);
        }
    }
}

#[test]
fn split_voices_preserves_length_and_is_identity_on_monophony() {
    let monophonic: Vec<GeneralNote> = [Step::C, Step::D, Step::E]
        .iter()
        .map(|s| note(*s, 4))
        .collect();
    assert_eq!(split_voices(&monophonic).unwrap(), vec![monophonic.clone()]);

    let polyphonic = vec![
        note(Step::C, 4),
        GeneralNote::chord(
            [
                Pitch::new(Step::C, 0, 4),
                Pitch::new(Step::E, 0, 4),
                Pitch::new(Step::G, 0, 4),
            ],
            quarter_length(4, 0),
        ),
        GeneralNote::rest(quarter_length(8, 0)),
        note(Step::D, 4),
    ];
    let voices = split_voices(&polyphonic).unwrap();
    assert_eq!(voices.len(), 3);
    for voice in &voices {
        assert_eq!(voice.len(), polyphonic.len());
    }
}

#[test]
fn interval_and_contour_are_transposition_invariant_for_any_interval() {
    let registry = StemmerRegistry::standard();
    let original = tiny("c e- g b- c' d").flattened_events();

    for semitones in -6..=6 {
        if semitones == 0 {
            continue;
        }
        let transposed: Vec<GeneralNote> = original
            .iter()
            .map(|e| GeneralNote::note(e.pitches[0].transpose(semitones), e.quarter_length))
            .collect();
        for name in ["By Interval", "By Contour"] {
            let stemmer = registry.get(name).unwrap();
            assert_eq!(
                stemmer.stem(&Snippet::new(&original, 0)).unwrap(),
                stemmer.stem(&Snippet::new(&transposed, 0)).unwrap(),
                "{name} at {semitones:+}"
            );
        }
    }
}

#[test]
fn any_verbatim_window_of_an_indexed_piece_ranks_it_first() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = sqlite_engine(dir.path());

    let melody = "c d e f g a b c' b a g f";
    let p1 = tiny(melody);
    let p1_id = engine.add_piece(&p1, "/corpus/p1.tiny", false).unwrap();
    // Two pieces that share no window with the melody.
    let p2 = tiny("C C G G A A G G F F E E");
    engine.add_piece(&p2, "/corpus/p2.tiny", false).unwrap();
    let p3 = tiny("e' e' d' d' c' c' b b a a g g");
    engine.add_piece(&p3, "/corpus/p3.tiny", false).unwrap();

    let events = p1.flattened_events();
    for window in snippets(&events, DEFAULT_WINDOW) {
        let mut query = firms_model::Score::new(None);
        let mut part = firms_model::Part::new(None);
        part.events = window.events().to_vec();
        query.parts.push(part);

        let grades = engine.query(QueryInput::Score(query)).unwrap();
        let order = ranking(&grades["BM25"]);
        assert_eq!(order[0], p1_id, "window at offset {}", window.offset());
    }
}

#[test]
fn graders_reset_to_empty_between_queries() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = sqlite_engine(dir.path());
    let p1 = tiny("c d e f g");
    engine.add_piece(&p1, "/corpus/p1.tiny", false).unwrap();

    // A matching query, then one sharing no stem on any channel (repeated
    // pitches kill the contour/interval match, uneven rhythm kills both
    // rhythm channels): state must not leak.
    let hit = engine.query(QueryInput::Tiny("c d e f g".into())).unwrap();
    assert!(!hit["BM25"].is_empty());

    let miss = engine
        .query(QueryInput::Tiny("F#8 F#4 F#8 F#4 F#8".into()))
        .unwrap();
    for (grader, results) in &miss {
        assert!(results.is_empty(), "{grader} leaked state");
    }
}

#[test]
fn duplicate_query_windows_raise_term_frequency() {
    // Indexing a drone: every window shares the same pitch stem. A query
    // with the same repetition matches that stem once per query window,
    // and the duplicate rows all count. Filler pieces sharing no stem with
    // the query keep the matched stems' idf positive.
    let dir = tempfile::tempdir().unwrap();
    let mut engine = sqlite_engine(dir.path());

    let drone = tiny("c c c c c c");
    let drone_id = engine.add_piece(&drone, "/corpus/drone.tiny", false).unwrap();
    let other = tiny("c c c c c d");
    engine.add_piece(&other, "/corpus/other.tiny", false).unwrap();
    for (k, filler) in ["g8 e4 g8 e4 g8", "d8 f4 d8 f4 d8", "e8 a4 e8 a4 e8"]
        .iter()
        .enumerate()
    {
        engine
            .add_piece(&tiny(filler), &format!("/corpus/filler{k}.tiny"), false)
            .unwrap();
    }

    let grades = engine
        .query(QueryInput::Tiny("c c c c c c".into()))
        .unwrap();
    assert_eq!(ranking(&grades["BM25"])[0], drone_id);
}
