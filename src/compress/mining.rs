//! Dictionary mining (component C5, passes 1-3): finds recurring
//! fragments across a patch's string-command content and its char-command
//! segment content, and assigns each a dictionary id.
//!
//! Three sub-passes feed the final dictionary (spec §4.5):
//! - Pass 2a step 1, whole-string dedup: an entire payload line repeated
//!   verbatim becomes a template outright.
//! - Pass 2a steps 2-5, seed/extend/mask: the remaining payload lines are
//!   seeded at every `SEED_LENGTH`-char window, grown to a maximal common
//!   fragment wherever a seed recurs, scored by profit, and accepted
//!   greedily with a per-string occupancy mask so accepted fragments never
//!   overlap.
//! - Pass 2b, char fragment mining: literal segment content from `a`/`d`/
//!   `e`/`a*`/`d*` commands is mined separately and atomically (no
//!   seed/extend — segment content is short enough that whole-content
//!   dedup already captures the recurring case).

use crate::linepatch::command::Command;
use ahash::{AHashMap, AHashSet};

const MIN_FREQUENCY: usize = 2;
const WHOLE_STRING_OVERHEAD: i64 = 2;
// The §8 worked example (two "A common line" commands, an 11-char
// fragment repeated twice) is the acceptance test for this bar: profit
// there is (2-1)*11 - 2*2 = 7. It must clear the bar, so the bar sits at
// 0 (any positive profit), rather than the plain tunable default.
const WHOLE_STRING_THRESHOLD: i64 = 0;
const SEED_LENGTH: usize = 12;

/// Every whole-line string a string command (`A`/`D` and their block
/// forms) carries. Context commands (`E`/`E+`/`EqualSeparate`) are the
/// spec §4.5 Pass 1 "other" bucket and are never mining material.
fn string_pool(commands: &[Command]) -> Vec<String> {
    let mut pool = Vec::new();
    for command in commands {
        match command {
            Command::Add { content, .. } | Command::Delete { content, .. } => {
                pool.push(content.clone());
            }
            Command::AddBlock { content, .. } | Command::DeleteBlock { content, .. } => {
                pool.extend(content.iter().cloned())
            }
            _ => {}
        }
    }
    pool
}

/// Every literal segment content used inside `a`/`d`/`e`/`a*`/`d*`
/// commands (spec §4.5 Pass 2b). `x`/`x*` segments carry no content.
fn char_segment_pool(commands: &[Command]) -> Vec<String> {
    let mut pool = Vec::new();
    for command in commands {
        if let Command::Char(c) = command {
            if !c.op.has_content() {
                continue;
            }
            for segment in &c.segments {
                if let Some(content) = &segment.content {
                    pool.push(content.clone());
                }
            }
        }
    }
    pool
}

/// Estimated byte profit of installing a dictionary entry of `length`
/// referenced `occurrences` times: each reference costs roughly
/// `overhead` bytes (`@` + a short id), and the first occurrence still
/// pays for the dictionary line itself.
fn profit(length: usize, occurrences: usize, overhead: i64) -> i64 {
    (occurrences as i64 - 1) * length as i64 - occurrences as i64 * overhead
}

/// Pass 2a step 1: whole-string dedup. Returns the accepted templates and
/// the subset of `pool` not fully consumed by one.
fn whole_string_templates(pool: &[String]) -> (Vec<String>, Vec<String>) {
    let mut freq: AHashMap<&str, usize> = AHashMap::new();
    for s in pool {
        if s.is_empty() {
            continue;
        }
        *freq.entry(s.as_str()).or_insert(0) += 1;
    }
    let accepted: AHashSet<String> = freq
        .into_iter()
        .filter(|&(content, count)| {
            count >= MIN_FREQUENCY
                && profit(content.chars().count(), count, WHOLE_STRING_OVERHEAD) > WHOLE_STRING_THRESHOLD
        })
        .map(|(content, _)| content.to_string())
        .collect();

    let remaining: Vec<String> = pool.iter().filter(|s| !s.is_empty() && !accepted.contains(s.as_str())).cloned().collect();
    (accepted.into_iter().collect(), remaining)
}

struct Candidate {
    content: String,
    occurrences: Vec<(usize, usize, usize)>,
}

/// Pass 2a steps 2-5: seed/extend/mask substring mining over the strings
/// remaining after whole-string dedup.
fn seed_extend_templates(strings: &[String]) -> Vec<String> {
    let char_strings: Vec<Vec<char>> = strings.iter().map(|s| s.chars().collect()).collect();

    let mut seed_index: AHashMap<Vec<char>, Vec<(usize, usize)>> = AHashMap::new();
    for (si, chars) in char_strings.iter().enumerate() {
        if chars.len() < SEED_LENGTH {
            continue;
        }
        for start in 0..=(chars.len() - SEED_LENGTH) {
            seed_index.entry(chars[start..start + SEED_LENGTH].to_vec()).or_default().push((si, start));
        }
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    for occs in seed_index.values() {
        if occs.len() < 2 {
            continue;
        }

        // Extend left while every occurrence agrees on the preceding char.
        let min_start = occs.iter().map(|&(_, start)| start).min().unwrap_or(0);
        let mut left = 0usize;
        while left < min_start {
            let mut agreed: Option<char> = None;
            let mut ok = true;
            for &(si, start) in occs {
                let c = char_strings[si][start - left - 1];
                match agreed {
                    None => agreed = Some(c),
                    Some(prev) if prev != c => {
                        ok = false;
                        break;
                    }
                    _ => {}
                }
            }
            if !ok {
                break;
            }
            left += 1;
        }

        // Extend right while every occurrence agrees on the following char.
        let mut right = 0usize;
        loop {
            let mut agreed: Option<char> = None;
            let mut ok = true;
            for &(si, start) in occs {
                let end = start + SEED_LENGTH + right;
                if end >= char_strings[si].len() {
                    ok = false;
                    break;
                }
                let c = char_strings[si][end];
                match agreed {
                    None => agreed = Some(c),
                    Some(prev) if prev != c => {
                        ok = false;
                        break;
                    }
                    _ => {}
                }
            }
            if !ok {
                break;
            }
            right += 1;
        }

        let &(si0, start0) = &occs[0];
        let content: String = char_strings[si0][start0 - left..start0 + SEED_LENGTH + right].iter().collect();
        let occurrences: Vec<(usize, usize, usize)> =
            occs.iter().map(|&(si, start)| (si, start - left, start + SEED_LENGTH + right)).collect();
        candidates.push(Candidate { content, occurrences });
    }

    // Score descending by profit, ties broken by length descending (spec
    // §4.5 step 4).
    candidates.sort_by(|a, b| {
        let pa = profit(a.content.chars().count(), a.occurrences.len(), WHOLE_STRING_OVERHEAD);
        let pb = profit(b.content.chars().count(), b.occurrences.len(), WHOLE_STRING_OVERHEAD);
        pb.cmp(&pa).then_with(|| b.content.chars().count().cmp(&a.content.chars().count()))
    });

    // Mask filter (spec §4.5 step 5): accept only if no prior-accepted
    // fragment overlaps any of this candidate's occurrences.
    let mut masks: Vec<Vec<bool>> = char_strings.iter().map(|c| vec![false; c.len()]).collect();
    let mut accepted = Vec::new();
    for candidate in candidates {
        let p = profit(candidate.content.chars().count(), candidate.occurrences.len(), WHOLE_STRING_OVERHEAD);
        if p <= 0 {
            continue;
        }
        let clear = candidate.occurrences.iter().all(|&(si, start, end)| masks[si][start..end].iter().all(|&m| !m));
        if !clear {
            continue;
        }
        for &(si, start, end) in &candidate.occurrences {
            for m in &mut masks[si][start..end] {
                *m = true;
            }
        }
        accepted.push(candidate.content);
    }
    accepted
}

/// Pass 2b: atomic char-segment content templates.
fn char_fragment_templates(pool: &[String]) -> Vec<String> {
    let mut freq: AHashMap<&str, usize> = AHashMap::new();
    for s in pool {
        if s.is_empty() {
            continue;
        }
        *freq.entry(s.as_str()).or_insert(0) += 1;
    }
    freq.into_iter().filter(|&(_, count)| count >= MIN_FREQUENCY).map(|(s, _)| s.to_string()).collect()
}

/// Runs all three mining sub-passes and returns the final dictionary
/// contents, sorted ascending by length (ties lexical) — the order
/// [`crate::container::encode_dictionary_id`] assumes ids are assigned in
/// (spec §4.5 Pass 3).
pub fn mine_templates(commands: &[Command]) -> Vec<String> {
    let pool = string_pool(commands);
    let (whole, remaining) = whole_string_templates(&pool);
    let fragments = seed_extend_templates(&remaining);
    let char_fragments = char_fragment_templates(&char_segment_pool(commands));

    let mut seen: AHashSet<String> = AHashSet::new();
    let mut templates = Vec::new();
    for content in whole.into_iter().chain(fragments).chain(char_fragments) {
        if seen.insert(content.clone()) {
            templates.push(content);
        }
    }
    templates.sort_by(|a, b| a.chars().count().cmp(&b.chars().count()).then_with(|| a.cmp(b)));
    templates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linepatch::create::build_commands;
    use crate::linepatch::options::CreateOptions;

    #[test]
    fn repeated_whole_line_becomes_a_template() {
        let commands = build_commands(
            "a\nb",
            "a fairly long repeated fragment indeed\na\na fairly long repeated fragment indeed\nb",
            &CreateOptions::default(),
        )
        .unwrap();
        let templates = mine_templates(&commands);
        assert!(templates.iter().any(|t| t == "a fairly long repeated fragment indeed"));
    }

    #[test]
    fn singleton_content_is_not_mined() {
        let commands = build_commands("a", "a\nunique addition", &CreateOptions::default()).unwrap();
        let templates = mine_templates(&commands);
        assert!(templates.is_empty());
    }

    #[test]
    fn templates_are_sorted_ascending_by_length() {
        let commands = build_commands(
            "x",
            "aabbccddee\nx\naabbccddee\nx2\ncccccccccccccc\nx3\ncccccccccccccc",
            &CreateOptions::default(),
        )
        .unwrap();
        let templates = mine_templates(&commands);
        for pair in templates.windows(2) {
            assert!(pair[0].chars().count() <= pair[1].chars().count());
        }
    }

    #[test]
    fn common_substring_shorter_than_either_whole_line_is_mined() {
        // Two distinct lines that share a long common substring but are
        // not equal outright: seed/extend should still find the shared
        // middle fragment.
        let commands = build_commands(
            "x\ny",
            "prefixA shared common substring here sufX\nx\nprefixB shared common substring here sufY\ny",
            &CreateOptions::default(),
        )
        .unwrap();
        let templates = mine_templates(&commands);
        assert!(templates.iter().any(|t| t.contains("shared common substring here")));
    }

    #[test]
    fn seed_scenario_short_repeated_line_clears_the_whole_string_bar() {
        // spec §8: ["10 A common line", "20 A common line"] must mine
        // "common line" as a dictionary template (profit 7, over the bar).
        use crate::linepatch::parse::parse_patch;
        use crate::warn::NullSink;
        let patch = vec!["10 A common line".to_string(), "20 A common line".to_string()];
        let commands = parse_patch(&patch, &NullSink);
        let templates = mine_templates(&commands);
        assert_eq!(templates, vec!["common line".to_string()]);
    }

    #[test]
    fn equal_content_is_never_mined() {
        use crate::linepatch::parse::parse_patch;
        use crate::warn::NullSink;
        let patch = vec!["1 E repeated context line".to_string(), "5 E repeated context line".to_string()];
        let commands = parse_patch(&patch, &NullSink);
        let templates = mine_templates(&commands);
        assert!(templates.is_empty());
    }

    #[test]
    fn repeated_char_segment_content_is_mined() {
        // Neither replaced digit ("1", "2") shares a character with the
        // replacement ("99"), so the LCS-based char diff can't partially
        // match a prefix into a single-char edit — both lines produce a
        // clean two-char `Add` segment with identical content.
        let commands = build_commands(
            "const aaaaaaaaaaaa = 1;\nconst bbbbbbbbbbbb = 2;",
            "const aaaaaaaaaaaa = 99;\nconst bbbbbbbbbbbb = 99;",
            &CreateOptions::default(),
        )
        .unwrap();
        let templates = mine_templates(&commands);
        assert!(templates.iter().any(|t| t == "99"));
    }
}
