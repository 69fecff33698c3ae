//! Narrative sequencing.
//!
//! Picks the next narrative chunk for a turn and formats it for
//! transmission. Independent of any network code.
//!
//! Normal operation supplies the expected index (last delivered + 1,
//! starting at 1) and demands exactly that chunk; a missing index is a
//! data-integrity condition the caller surfaces, never silently
//! substituted. Without an expected index (e.g. after a session reload,
//! where progress is not durably persisted) selection falls back to the
//! first not-yet-used chunk, wrapping when all are used.

use tomte_types::narrative::Chunk;

/// How many used chunk indices the caller retains.
pub const USAGE_WINDOW: usize = 5;

/// Select the chunk for the next turn.
///
/// With `expected_index`: exactly the chunk carrying that index, or `None`
/// when absent. Without it: the first chunk (ascending by index) not in
/// `previously_used`, wrapping to the lowest-index chunk when all are used.
pub fn select_next<'a>(
    chunks: &'a [Chunk],
    previously_used: &[u32],
    expected_index: Option<u32>,
) -> Option<&'a Chunk> {
    let mut ordered: Vec<&Chunk> = chunks.iter().collect();
    ordered.sort_by_key(|chunk| chunk.index);

    match expected_index {
        Some(expected) => ordered.into_iter().find(|chunk| chunk.index == expected),
        None => {
            let first = *ordered.first()?;
            Some(
                ordered
                    .iter()
                    .copied()
                    .find(|chunk| !previously_used.contains(&chunk.index))
                    .unwrap_or(first),
            )
        }
    }
}

/// Deterministic formatting of a chunk as the turn's outgoing message
/// content. Fixed order: system guidance, interaction hint, topics,
/// separator, content.
///
/// In narrative mode this formatted text -- never the user's literal input
/// -- is what goes over the wire; the literal input is retained only for
/// on-screen display and event logging.
pub fn format_for_transmission(chunk: &Chunk) -> String {
    format!(
        "{}\n{}\n{}\n---\n{}",
        chunk.system_guidance,
        chunk.interaction_hint,
        chunk.topics.join(", "),
        chunk.content
    )
}

/// Record a delivered index, retaining only the last [`USAGE_WINDOW`]
/// entries.
pub fn record_usage(used: &mut Vec<u32>, index: u32) {
    used.push(index);
    if used.len() > USAGE_WINDOW {
        let excess = used.len() - USAGE_WINDOW;
        used.drain(..excess);
    }
}
