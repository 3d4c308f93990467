//! The `a`/`d`/`e`/`x` (and grouped `a*`/`d*`/`x*`) char command model.

use super::segment::Segment;
use core::fmt;

/// Intra-line opcode. `Equal` is informational (§4.2, emitted only when
/// `includeCharEquals` is set); `Unsafe` segments omit content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharOp {
    Add,
    Delete,
    Equal,
    Unsafe,
}

impl CharOp {
    /// Single-line opcode letter (`a`, `d`, `e`, `x`).
    pub fn letter(self) -> char {
        match self {
            CharOp::Add => 'a',
            CharOp::Delete => 'd',
            CharOp::Equal => 'e',
            CharOp::Unsafe => 'x',
        }
    }

    /// Grouped opcode token (`a*`, `d*`, `x*`); `Equal` has no grouped form.
    pub fn grouped_token(self) -> Option<&'static str> {
        match self {
            CharOp::Add => Some("a*"),
            CharOp::Delete => Some("d*"),
            CharOp::Unsafe => Some("x*"),
            CharOp::Equal => None,
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'a' => Some(CharOp::Add),
            'd' => Some(CharOp::Delete),
            'e' => Some(CharOp::Equal),
            'x' => Some(CharOp::Unsafe),
            _ => None,
        }
    }

    /// Whether this op's segments carry a `content` field.
    pub fn has_content(self) -> bool {
        !matches!(self, CharOp::Unsafe)
    }
}

/// One element of a grouped coordinate's range-list: a single line number
/// or an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RangeItem {
    Single(usize),
    Range(usize, usize),
}

impl RangeItem {
    pub fn start(&self) -> usize {
        match *self {
            RangeItem::Single(n) => n,
            RangeItem::Range(a, _) => a,
        }
    }

    /// Every line number this item covers, ascending.
    pub fn expand(&self) -> Vec<usize> {
        match *self {
            RangeItem::Single(n) => vec![n],
            RangeItem::Range(a, b) => (a..=b).collect(),
        }
    }
}

impl fmt::Display for RangeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeItem::Single(n) => write!(f, "{n}"),
            RangeItem::Range(a, b) => write!(f, "{a}-{b}"),
        }
    }
}

/// A char command's coordinate: one line (single-line commands) or a
/// sorted, comma-separated range-list (grouped commands).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coordinate {
    Single(usize),
    Grouped(Vec<RangeItem>),
}

impl Coordinate {
    pub fn is_grouped(&self) -> bool {
        matches!(self, Coordinate::Grouped(_))
    }

    /// All line numbers this coordinate addresses, ascending.
    pub fn lines(&self) -> Vec<usize> {
        match self {
            Coordinate::Single(n) => vec![*n],
            Coordinate::Grouped(items) => items.iter().flat_map(RangeItem::expand).collect(),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinate::Single(n) => write!(f, "{n}"),
            Coordinate::Grouped(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

/// Parses a range-list coordinate like `1-3,5,8-9` (no grouping of
/// adjacent items beyond what's already written — ascending order is an
/// invariant of the producer, not re-sorted here).
pub fn parse_range_list(s: &str) -> Option<Vec<RangeItem>> {
    let mut items = Vec::new();
    for part in s.split(',') {
        if let Some((a, b)) = part.split_once('-') {
            items.push(RangeItem::Range(a.parse().ok()?, b.parse().ok()?));
        } else {
            items.push(RangeItem::Single(part.parse().ok()?));
        }
    }
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// An intra-line command: `<coordinate> <opcode> <payload>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharCommand {
    pub coordinate: Coordinate,
    pub op: CharOp,
    pub segments: Vec<Segment>,
}

impl CharCommand {
    pub fn new_single(line: usize, op: CharOp, segments: Vec<Segment>) -> Self {
        CharCommand { coordinate: Coordinate::Single(line), op, segments }
    }

    /// Swaps `Add` <-> `Delete`, keeping coordinate and segments literally
    /// identical (spec §4.3 "Inversion"). `Unsafe` commands have no
    /// content to swap against and are not invertible; `Equal` commands
    /// are informational and invert to themselves.
    pub fn invert(&self) -> Option<CharCommand> {
        let op = match self.op {
            CharOp::Add => CharOp::Delete,
            CharOp::Delete => CharOp::Add,
            CharOp::Equal => CharOp::Equal,
            CharOp::Unsafe => return None,
        };
        Some(CharCommand { coordinate: self.coordinate.clone(), op, segments: self.segments.clone() })
    }

    pub fn opcode_token(&self) -> String {
        if self.coordinate.is_grouped() {
            self.op
                .grouped_token()
                .expect("equal commands are never grouped")
                .to_string()
        } else {
            self.op.letter().to_string()
        }
    }
}

impl fmt::Display for CharCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = super::segment::serialize_segments(&self.segments, self.op.has_content());
        write!(f, "{} {} {}", self.coordinate, self.opcode_token(), payload)
    }
}

/// Folds consecutive single-line commands of the same op whose segment
/// lists are structurally identical (same index/length/content, line
/// number aside) into one grouped command — spec §3's `a*`/`d*`/`x*`
/// "one segment applies to every line in the range" form. Input must
/// already be sorted ascending by line number.
pub fn group_identical(commands: &[CharCommand]) -> Vec<CharCommand> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < commands.len() {
        let cur = &commands[i];
        let Coordinate::Single(start_line) = cur.coordinate else {
            out.push(cur.clone());
            i += 1;
            continue;
        };
        let mut run_lines = vec![start_line];
        let mut j = i + 1;
        while j < commands.len() {
            let Coordinate::Single(line) = commands[j].coordinate else { break };
            if commands[j].op == cur.op && commands[j].segments == cur.segments {
                run_lines.push(line);
                j += 1;
            } else {
                break;
            }
        }
        if run_lines.len() > 1 && cur.op.grouped_token().is_some() {
            out.push(CharCommand {
                coordinate: Coordinate::Grouped(to_range_items(&run_lines)),
                op: cur.op,
                segments: cur.segments.clone(),
            });
            i = j;
        } else {
            out.push(cur.clone());
            i += 1;
        }
    }
    out
}

fn to_range_items(lines: &[usize]) -> Vec<RangeItem> {
    let mut items = Vec::new();
    let mut start = lines[0];
    let mut prev = lines[0];
    for &line in &lines[1..] {
        if line == prev + 1 {
            prev = line;
            continue;
        }
        items.push(if start == prev { RangeItem::Single(start) } else { RangeItem::Range(start, prev) });
        start = line;
        prev = line;
    }
    items.push(if start == prev { RangeItem::Single(start) } else { RangeItem::Range(start, prev) });
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charpatch::segment::Segment;

    fn seg(index: usize, length: usize, content: &str) -> Segment {
        Segment { index, length, content: Some(content.to_string()) }
    }

    #[test]
    fn displays_single_command() {
        let cmd = CharCommand::new_single(1, CharOp::Delete, vec![seg(6, 1, "x")]);
        assert_eq!(cmd.to_string(), "1 d 6 1 x");
    }

    #[test]
    fn parses_and_displays_range_list() {
        let items = parse_range_list("1-3,5,8-9").unwrap();
        assert_eq!(
            items,
            vec![RangeItem::Range(1, 3), RangeItem::Single(5), RangeItem::Range(8, 9)]
        );
        let coord = Coordinate::Grouped(items);
        assert_eq!(coord.to_string(), "1-3,5,8-9");
        assert_eq!(coord.lines(), vec![1, 2, 3, 5, 8, 9]);
    }

    #[test]
    fn groups_identical_adjacent_commands() {
        let commands = vec![
            CharCommand::new_single(1, CharOp::Add, vec![seg(0, 2, "  ")]),
            CharCommand::new_single(2, CharOp::Add, vec![seg(0, 2, "  ")]),
        ];
        let grouped = group_identical(&commands);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].to_string(), "1-2 a* 0 2   ");
    }

    #[test]
    fn does_not_group_differing_commands() {
        let commands = vec![
            CharCommand::new_single(1, CharOp::Add, vec![seg(0, 2, "  ")]),
            CharCommand::new_single(2, CharOp::Add, vec![seg(0, 1, " ")]),
        ];
        let grouped = group_identical(&commands);
        assert_eq!(grouped.len(), 2);
    }
}
