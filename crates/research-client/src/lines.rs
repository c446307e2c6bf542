/// Reassembles newline-terminated lines from arbitrarily split chunks.
///
/// Bytes are held until a `\n` arrives and each line is decoded only once it
/// is complete. A newline byte never appears inside a multi-byte UTF-8
/// sequence, so characters split across chunk boundaries survive intact.
#[derive(Debug, Default)]
pub struct LineReassembler {
    buf: Vec<u8>,
    /// Prefix of `buf` already known to hold no `\n`.
    scanned: usize,
}

impl LineReassembler {
    /// Appends a chunk and returns every line it completed, in order.
    ///
    /// The trailing partial line (possibly empty) stays buffered for the next
    /// call. A trailing `\r` is stripped from each emitted line.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let Some(offset) = self.buf[self.scanned..].iter().rposition(|b| *b == b'\n') else {
            self.scanned = self.buf.len();
            return Vec::new();
        };
        let last_newline = self.scanned + offset;
        let rest = self.buf.split_off(last_newline + 1);
        self.scanned = rest.len();
        let complete = std::mem::replace(&mut self.buf, rest);
        complete[..last_newline]
            .split(|b| *b == b'\n')
            .map(decode_line)
            .collect()
    }

    /// Convenience wrapper over `push_chunk` for text input.
    pub fn push_str(&mut self, chunk: &str) -> Vec<String> {
        self.push_chunk(chunk.as_bytes())
    }

    /// Number of buffered bytes that do not yet form a complete line.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Consumes the reassembler at end of stream.
    ///
    /// Returns the unterminated remainder, if any. Callers do not dispatch it;
    /// it is surfaced only so it can be logged.
    pub fn finish(self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(decode_line(&self.buf))
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const INPUT: &str = "data: {\"type\":\"content\",\"content\":\"héllo wörld ✓\"}\n\n\
                         : keepalive\n\
                         data: {\"type\":\"complete\",\"content\":\"日本語\"}\n\n";

    fn whole() -> Vec<String> {
        LineReassembler::default().push_str(INPUT)
    }

    #[test]
    fn splits_whole_input_into_lines() {
        let lines = whole();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("data: "));
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], ": keepalive");
        assert!(lines[3].contains("日本語"));
    }

    #[test]
    fn every_two_way_byte_split_matches_whole_input() {
        let bytes = INPUT.as_bytes();
        let expected = whole();
        for cut in 0..=bytes.len() {
            let mut reassembler = LineReassembler::default();
            let mut lines = reassembler.push_chunk(&bytes[..cut]);
            lines.extend(reassembler.push_chunk(&bytes[cut..]));
            assert_eq!(lines, expected, "split at byte {cut}");
            assert_eq!(reassembler.pending_len(), 0);
        }
    }

    #[test]
    fn byte_at_a_time_matches_whole_input() {
        let mut reassembler = LineReassembler::default();
        let mut lines = Vec::new();
        for byte in INPUT.as_bytes() {
            lines.extend(reassembler.push_chunk(std::slice::from_ref(byte)));
        }
        assert_eq!(lines, whole());
    }

    #[test]
    fn multibyte_character_split_is_not_corrupted() {
        let text = "data: ✓\n";
        let bytes = text.as_bytes();
        let check_start = text.find('✓').expect("check mark");
        let mut reassembler = LineReassembler::default();
        assert!(reassembler.push_chunk(&bytes[..check_start + 1]).is_empty());
        assert!(reassembler.push_chunk(&bytes[check_start + 1..check_start + 2]).is_empty());
        let lines = reassembler.push_chunk(&bytes[check_start + 2..]);
        assert_eq!(lines, vec!["data: ✓".to_string()]);
    }

    #[test]
    fn crlf_terminators_are_normalized() {
        let mut reassembler = LineReassembler::default();
        let lines = reassembler.push_str("data: a\r\ndata: b\r");
        assert_eq!(lines, vec!["data: a".to_string()]);
        assert_eq!(reassembler.push_str("\n"), vec!["data: b".to_string()]);
    }

    #[test]
    fn unterminated_remainder_is_held_and_returned_by_finish() {
        let mut reassembler = LineReassembler::default();
        assert_eq!(
            reassembler.push_str("data: one\ndata: tw"),
            vec!["data: one".to_string()]
        );
        assert_eq!(reassembler.pending_len(), "data: tw".len());
        assert_eq!(reassembler.finish().as_deref(), Some("data: tw"));
    }

    #[test]
    fn finish_without_remainder_is_none() {
        let mut reassembler = LineReassembler::default();
        let _ = reassembler.push_str("data: one\n");
        assert_eq!(reassembler.finish(), None);
    }

    #[test]
    fn long_line_in_small_chunks_is_scanned_once() {
        let mut reassembler = LineReassembler::default();
        let payload = "x".repeat(4096);
        for piece in payload.as_bytes().chunks(7) {
            assert!(reassembler.push_chunk(piece).is_empty());
            assert_eq!(reassembler.scanned, reassembler.pending_len());
        }
        assert_eq!(reassembler.push_str("\nnext"), vec![payload]);
        assert_eq!(reassembler.scanned, "next".len());
        assert_eq!(reassembler.push_str("\n"), vec!["next".to_string()]);
    }

    proptest! {
        #[test]
        fn any_chunking_yields_the_same_lines(
            lines in prop::collection::vec("[^\\r\\n]{0,24}", 0..8),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
        ) {
            let input: String = lines.iter().map(|line| format!("{line}\n")).collect();
            let bytes = input.as_bytes();
            let mut points: Vec<usize> =
                cuts.iter().map(|cut| cut.index(bytes.len() + 1)).collect();
            points.sort_unstable();

            let mut reassembler = LineReassembler::default();
            let mut emitted = Vec::new();
            let mut start = 0;
            for point in points.into_iter().chain(std::iter::once(bytes.len())) {
                emitted.extend(reassembler.push_chunk(&bytes[start..point]));
                start = point;
            }
            prop_assert_eq!(emitted, lines);
            prop_assert_eq!(reassembler.finish(), None);
        }

        #[test]
        fn remainder_is_held_until_its_newline(
            head in "[^\\r\\n]{0,24}",
            tail in "[^\\r\\n]{1,24}",
        ) {
            let mut reassembler = LineReassembler::default();
            prop_assert_eq!(reassembler.push_str(&format!("{head}\n{tail}")), vec![head]);
            prop_assert_eq!(reassembler.pending_len(), tail.len());
            prop_assert_eq!(reassembler.finish(), Some(tail));
        }
    }
}
