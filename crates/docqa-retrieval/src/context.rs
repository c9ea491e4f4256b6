//! Context compression: survivors become one source-tagged, length-bounded block.

use tracing::debug;

use docqa_core::text::truncate_chars;
use docqa_core::types::{ContextBlock, ContextSegment, FusedCandidate};

/// Append `(source, text)` segments in fused order until the next one would
/// overflow `max_chars`.
///
/// The first candidate is always kept; when it alone is too long its text is
/// cut so the segment fits. Later candidates are never truncated: the first
/// one that does not fit ends the block.
pub fn compress(candidates: &[FusedCandidate], max_chars: usize) -> ContextBlock {
    let mut block = ContextBlock::new(max_chars);
    for candidate in candidates {
        let chunk = &candidate.chunk;
        let segment = ContextSegment::new(&chunk.doc_name, &chunk.id, &chunk.text);
        let separator = if block.is_empty() { 0 } else { ContextBlock::separator_chars() };
        if block.char_len() + separator + segment.rendered_chars() <= max_chars {
            block.push(segment);
            continue;
        }
        if block.is_empty() {
            block.push(truncate_to_fit(segment, max_chars));
        }
        break;
    }
    debug!(segments = block.len(), chars = block.char_len(), max_chars, "compressed context");
    block
}

fn truncate_to_fit(mut segment: ContextSegment, max_chars: usize) -> ContextSegment {
    let room = max_chars.saturating_sub(ContextSegment::header_chars(&segment.source));
    segment.text = truncate_chars(&segment.text, room).to_string();
    segment.truncated = true;
    segment
}
