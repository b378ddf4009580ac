//! In-memory index store.
//!
//! Same contract as the SQLite store over plain hash maps. Useful for tests
//! and one-shot sessions where durability is not wanted. Not synchronized;
//! callers needing cross-thread sharing must lock externally.

use std::collections::{HashMap, HashSet};

use firms_model::{Score, snippets};
use firms_stem::StemmerRegistry;

use crate::{
    IndexStore, IngestOptions, LookupMatch, PartRow, PieceRow, StoreResult, StoreStats,
};

#[derive(Debug, Clone, Copy)]
struct SnippetRow {
    id: i64,
    piece_id: i64,
    part_id: i64,
    offset: i64,
}

/// Ephemeral index store backed by hash maps.
#[derive(Default)]
pub struct MemoryStore {
    pieces: Vec<PieceRow>,
    parts: Vec<PartRow>,
    snippets: Vec<SnippetRow>,
    snippet_ids: HashMap<(i64, i64, i64), i64>,
    stemmer_ids: HashMap<String, i64>,
    stem_ids: HashMap<(i64, String), i64>,
    /// stem id → snippet ids (the postings list).
    postings: HashMap<i64, Vec<i64>>,
    entry_keys: HashSet<(i64, i64)>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn ensure_piece(&mut self, path: &str, name: &str) -> i64 {
        if let Some(row) = self
            .pieces
            .iter()
            .find(|p| p.path == path && p.name == name)
        {
            return row.id;
        }
        let id = self.fresh_id();
        self.pieces.push(PieceRow {
            id,
            path: path.to_string(),
            name: name.to_string(),
        });
        id
    }

    /// Parts are identified by ordinal within their piece; display names
    /// may repeat (divisi scores).
    fn ensure_part(&mut self, piece_id: i64, index: usize, name: &str) -> i64 {
        if let Some(row) = self
            .parts
            .iter()
            .filter(|p| p.piece_id == piece_id)
            .nth(index)
        {
            return row.id;
        }
        let id = self.fresh_id();
        self.parts.push(PartRow {
            id,
            piece_id,
            name: name.to_string(),
        });
        id
    }

    fn ensure_snippet(&mut self, piece_id: i64, part_id: i64, offset: i64) -> i64 {
        if let Some(id) = self.snippet_ids.get(&(piece_id, part_id, offset)) {
            return *id;
        }
        let id = self.fresh_id();
        self.snippet_ids.insert((piece_id, part_id, offset), id);
        self.snippets.push(SnippetRow {
            id,
            piece_id,
            part_id,
            offset,
        });
        id
    }

    fn ensure_stemmer(&mut self, name: &str) -> i64 {
        if let Some(id) = self.stemmer_ids.get(name) {
            return *id;
        }
        let id = self.fresh_id();
        self.stemmer_ids.insert(name.to_string(), id);
        id
    }

    fn ensure_stem(&mut self, stemmer_id: i64, stem: &str) -> i64 {
        if let Some(id) = self.stem_ids.get(&(stemmer_id, stem.to_string())) {
            return *id;
        }
        let id = self.fresh_id();
        self.stem_ids.insert((stemmer_id, stem.to_string()), id);
        id
    }

    fn ensure_entry(&mut self, stem_id: i64, snippet_id: i64) {
        if self.entry_keys.insert((stem_id, snippet_id)) {
            self.postings.entry(stem_id).or_default().push(snippet_id);
        }
    }
}

impl IndexStore for MemoryStore {
    fn add_piece(
        &mut self,
        score: &Score,
        path: &str,
        stemmers: &StemmerRegistry,
        options: &IngestOptions,
    ) -> StoreResult<i64> {
        let piece_id = self.ensure_piece(path, &score.display_title());

        for (index, part) in score.parts.iter().enumerate() {
            let part_name = part.display_name(index);
            let part_id = self.ensure_part(piece_id, index, &part_name);

            let events = if options.explicit_repeats {
                part.expand_repeats()
                    .unwrap_or_else(|_| part.events.clone())
            } else {
                part.events.clone()
            };

            for snippet in snippets(&events, options.window) {
                let snippet_id =
                    self.ensure_snippet(piece_id, part_id, snippet.offset() as i64);
                for stemmer in stemmers.iter() {
                    let stemmer_id = self.ensure_stemmer(stemmer.name());
                    let stems = match stemmer.stem(&snippet) {
                        Ok(stems) => stems,
                        Err(err) => {
                            tracing::warn!(
                                stemmer = stemmer.name(),
                                part = %part_name,
                                offset = snippet.offset(),
                                %err,
                                "unable to process snippet, skipping"
                            );
                            continue;
                        }
                    };
                    for stem in stems {
                        let stem_id = self.ensure_stem(stemmer_id, &stem);
                        self.ensure_entry(stem_id, snippet_id);
                    }
                }
            }
        }
        Ok(piece_id)
    }

    fn lookup(&self, stemmer_name: &str, stems: &[String]) -> StoreResult<Vec<LookupMatch>> {
        let Some(stemmer_id) = self.stemmer_ids.get(stemmer_name) else {
            return Ok(Vec::new());
        };
        let mut matches = Vec::new();
        for stem in stems {
            let Some(stem_id) = self.stem_ids.get(&(*stemmer_id, stem.clone())) else {
                continue;
            };
            let Some(snippet_ids) = self.postings.get(stem_id) else {
                continue;
            };
            for snippet_id in snippet_ids {
                if let Some(row) = self.snippets.iter().find(|s| s.id == *snippet_id) {
                    matches.push(LookupMatch {
                        snippet_id: row.id,
                        piece_id: row.piece_id,
                        part_id: row.part_id,
                        offset: row.offset,
                        stem_id: *stem_id,
                        stemmer: stemmer_name.to_string(),
                    });
                }
            }
        }
        Ok(matches)
    }

    fn corpus_size(&self) -> StoreResult<u64> {
        Ok(self.pieces.len() as u64)
    }

    fn stats(&self) -> StoreResult<StoreStats> {
        Ok(StoreStats {
            pieces: self.pieces.len() as u64,
            parts: self.parts.len() as u64,
            snippets: self.snippets.len() as u64,
            stemmers: self.stemmer_ids.len() as u64,
            stems: self.stem_ids.len() as u64,
            entries: self.entry_keys.len() as u64,
        })
    }

    fn pieces(&self) -> StoreResult<Vec<PieceRow>> {
        Ok(self.pieces.clone())
    }

    fn piece(&self, id: i64) -> StoreResult<Option<PieceRow>> {
        Ok(self.pieces.iter().find(|p| p.id == id).cloned())
    }

    fn parts_of(&self, piece_id: i64) -> StoreResult<Vec<PartRow>> {
        Ok(self
            .parts
            .iter()
            .filter(|p| p.piece_id == piece_id)
            .cloned()
            .collect())
    }

    fn paths_matching(&self, needle: &str) -> StoreResult<Vec<String>> {
        let mut paths: Vec<String> = self
            .pieces
            .iter()
            .filter(|p| p.path.contains(needle))
            .map(|p| p.path.clone())
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firms_model::{GeneralNote, Part, Pitch, Step, quarter_length};

    fn scale() -> Score {
        let mut score = Score::new(Some("Scale".into()));
        score.parts.push(Part {
            name: None,
            events: [Step::A, Step::B, Step::C, Step::D, Step::E, Step::F]
                .iter()
                .map(|s| GeneralNote::note(Pitch::new(*s, 0, 4), quarter_length(4, 0)))
                .collect(),
            repeats: vec![],
        });
        score
    }

    #[test]
    fn mirrors_the_sqlite_contract() {
        let mut store = MemoryStore::new();
        let stemmers = StemmerRegistry::standard();
        let id = store
            .add_piece(&scale(), "/corpus/scale.xml", &stemmers, &IngestOptions::default())
            .unwrap();
        let again = store
            .add_piece(&scale(), "/corpus/scale.xml", &stemmers, &IngestOptions::default())
            .unwrap();
        assert_eq!(id, again);
        assert_eq!(store.corpus_size().unwrap(), 1);

        let stats = store.stats().unwrap();
        assert_eq!(stats.snippets, 2);
        assert_eq!(stats.stemmers, 6);

        let matches = store
            .lookup("By Pitch", &["A4 B4 C4 D4 E4".to_string()])
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].piece_id, id);

        assert!(store.lookup("By Typo", &["x".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn same_named_parts_stay_distinct() {
        let mut store = MemoryStore::new();
        let stemmers = StemmerRegistry::standard();
        let mut score = Score::new(Some("Divisi".into()));
        for steps in [
            [Step::C, Step::D, Step::E, Step::F, Step::G],
            [Step::A, Step::G, Step::F, Step::E, Step::D],
        ] {
            score.parts.push(Part {
                name: Some("Soprano".into()),
                events: steps
                    .iter()
                    .map(|s| GeneralNote::note(Pitch::new(*s, 0, 4), quarter_length(4, 0)))
                    .collect(),
                repeats: vec![],
            });
        }
        let id = store
            .add_piece(&score, "/corpus/divisi.xml", &stemmers, &IngestOptions::default())
            .unwrap();

        assert_eq!(store.parts_of(id).unwrap().len(), 2);
        assert_eq!(store.stats().unwrap().snippets, 2);
        let second = store
            .lookup("By Pitch", &["A4 G4 F4 E4 D4".to_string()])
            .unwrap();
        assert_eq!(second.len(), 1);

        store
            .add_piece(&score, "/corpus/divisi.xml", &stemmers, &IngestOptions::default())
            .unwrap();
        assert_eq!(store.parts_of(id).unwrap().len(), 2);
        assert_eq!(store.stats().unwrap().snippets, 2);
    }
}
