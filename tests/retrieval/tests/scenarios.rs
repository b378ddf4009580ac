//! End-to-end scenarios over the full pipeline (window = 5 throughout).

use firms_engine::QueryInput;
use firms_model::{GeneralNote, Snippet, quarter_length};
use firms_retrieval_tests::{ranking, sqlite_engine, tiny};
use firms_stem::{StemmerRegistry, Stemmer};
use firms_store::IndexStore;

fn stem_with(name: &str, events: &[GeneralNote]) -> Vec<String> {
    let registry = StemmerRegistry::standard();
    let stemmer = registry.get(name).expect("standard stemmer");
    stemmer.stem(&Snippet::new(events, 0)).expect("stemmable")
}

#[test]
fn four_repeated_notes_then_a_step_up() {
    let score = tiny("c c c c d");
    let events = score.flattened_events();

    assert_eq!(stem_with("By Pitch", &events), ["C4 C4 C4 C4 D4"]);
    assert_eq!(stem_with("By Simple Pitch", &events), ["C C C C D"]);
    assert_eq!(stem_with("By Contour", &events), ["s s s u"]);
    assert_eq!(stem_with("By Rythm", &events), ["1 1 1 1 1"]);
    assert_eq!(
        stem_with("By Normal Rythm", &events),
        ["1.0 1.0 1.0 1.0 1.0"]
    );
}

#[test]
fn transposition_keeps_interval_and_contour_stems() {
    let original = tiny("c c c c d").flattened_events();
    // Up a major third.
    let transposed: Vec<GeneralNote> = original
        .iter()
        .map(|e| GeneralNote::note(e.pitches[0].transpose(4), e.quarter_length))
        .collect();

    for name in ["By Interval", "By Contour"] {
        assert_eq!(
            stem_with(name, &original),
            stem_with(name, &transposed),
            "{name}"
        );
    }
    assert_ne!(
        stem_with("By Pitch", &original),
        stem_with("By Pitch", &transposed)
    );
}

#[test]
fn a_chord_window_stems_once_per_voice() {
    let mut events = tiny("c c").flattened_events();
    events.insert(
        1,
        GeneralNote::chord(
            [
                firms_model::Pitch::new(firms_model::Step::C, 0, 4),
                firms_model::Pitch::new(firms_model::Step::E, 0, 4),
            ],
            quarter_length(4, 0),
        ),
    );

    let stems = stem_with("By Pitch", &events);
    assert_eq!(stems, ["C4 C4 C4", "C4 E4 C4"]);
}

#[test]
fn near_duplicate_corpus_ranks_the_exact_piece_first() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = sqlite_engine(dir.path());

    let p1 = tiny("a a b c' d'");
    let p2 = tiny("a a b c' e'");
    let p1_id = engine.add_piece(&p1, "/corpus/p1.tiny", false).unwrap();
    let p2_id = engine.add_piece(&p2, "/corpus/p2.tiny", false).unwrap();
    // Filler pieces sharing no stem with the query, so the stems the near
    // duplicates share stay below half the corpus and keep positive idf
    // (the unsmoothed estimator turns non-positive above that line).
    for (k, filler) in ["g8 e4 g8 e4 g8", "d8 f4 d8 f4 d8", "e8 c4 e8 c4 e8"]
        .iter()
        .enumerate()
    {
        engine
            .add_piece(&tiny(filler), &format!("/corpus/filler{k}.tiny"), false)
            .unwrap();
    }

    let grades = engine
        .query(QueryInput::Tiny("a a b c' d'".into()))
        .unwrap();
    let order = ranking(&grades["BM25"]);
    assert_eq!(order[0], p1_id);
    assert_eq!(order.get(1), Some(&p2_id));

    let bm25 = &grades["BM25"];
    let grade_of = |id: i64| {
        bm25.iter()
            .find(|r| r.piece_id == id)
            .map(|r| r.grade)
            .unwrap()
    };
    assert!(grade_of(p1_id) > grade_of(p2_id));
}

#[test]
fn empty_chord_windows_are_skipped_without_losing_the_piece() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = sqlite_engine(dir.path());

    // A clean piece, then a piece whose tail window contains an empty chord.
    let clean = tiny("c d e f g a");
    engine.add_piece(&clean, "/corpus/clean.tiny", false).unwrap();

    let mut broken = tiny("c d e f g a");
    broken.parts[0]
        .events
        .push(GeneralNote::chord([], quarter_length(4, 0)));
    engine.add_piece(&broken, "/corpus/broken.tiny", false).unwrap();

    // Both pieces are in the corpus exactly once; the unprocessable
    // windows contributed nothing.
    assert_eq!(engine.store().corpus_size().unwrap(), 2);

    // The broken piece is still reachable through its clean windows.
    let grades = engine.query(QueryInput::Tiny("c d e f g".into())).unwrap();
    assert_eq!(grades["BM25"].len(), 2);
}

#[test]
fn empty_corpus_returns_empty_grades_for_every_grader() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = sqlite_engine(dir.path());

    let grades = engine.query(QueryInput::Tiny("c c c c d".into())).unwrap();
    assert!(!grades.is_empty());
    for (grader, results) in &grades {
        assert!(results.is_empty(), "{grader} returned results");
    }
}

#[test]
fn musicxml_ingest_is_queryable_from_tiny_notation() {
    let xml = "<?xml version=\"1.0\"?>\
        <score-partwise version=\"4.0\">\
        <work><work-title>Little Study</work-title></work>\
        <part-list><score-part id=\"P1\"><part-name>Right Hand</part-name></score-part></part-list>\
        <part id=\"P1\"><measure number=\"1\">\
        <attributes><divisions>1</divisions></attributes>\
        <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration></note>\
        <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration></note>\
        <note><pitch><step>E</step><octave>4</octave></pitch><duration>1</duration></note>\
        <note><pitch><step>F</step><octave>4</octave></pitch><duration>1</duration></note>\
        </measure><measure number=\"2\">\
        <note><pitch><step>G</step><octave>4</octave></pitch><duration>1</duration></note>\
        </measure></part></score-partwise>";

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("study.musicxml");
    std::fs::write(&file, xml).unwrap();

    let mut engine = sqlite_engine(dir.path());
    let id = engine.add_piece_file(&file, false).unwrap();

    let piece = engine.store().piece(id).unwrap().unwrap();
    assert_eq!(piece.name, "Little Study");

    let grades = engine.query(QueryInput::Tiny("c d e f g".into())).unwrap();
    assert_eq!(ranking(&grades["BM25"]), vec![id]);
}
