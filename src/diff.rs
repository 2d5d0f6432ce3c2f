//! Transcript-aware diffing.
//!
//! A plain unified diff with one twist: line equivalence is the matcher's,
//! so an expected `(re)`/`(glob)`/`(esc)` line that matches its actual
//! counterpart counts as unchanged and is shown verbatim, annotation and
//! all. Test files are small, so a quadratic LCS is fine here.
//!
//! The same comparison also produces the merged transcript: actual output
//! where things differ, the original expected line (annotation included)
//! where they match. A fully matching run merges back to the reference
//! transcript byte for byte.
use crate::matcher::ExpectedLine;

const CONTEXT: usize = 3;

#[derive(Debug,Clone,Copy,PartialEq)]
enum Tag {
	Equal,
	Delete,
	Insert,
}

#[derive(Debug,Clone,Copy)]
struct Opcode {
	tag: Tag,
	i1: usize,
	i2: usize,
	j1: usize,
	j2: usize,
}

/// One computed comparison of a reference transcript against a
/// reconstructed one. Renders as a unified diff or as the merged
/// transcript; the line-matching work happens once, in [`Comparison::new`].
pub struct Comparison<'a> {
	refout: &'a [Vec<u8>],
	postout: &'a [Vec<u8>],
	codes: Vec<Opcode>,
}

impl<'a> Comparison<'a> {
	pub fn new(refout: &'a [Vec<u8>], postout: &'a [Vec<u8>]) -> Self {
		let expected: Vec<ExpectedLine> = refout.iter().map(|l| ExpectedLine::parse(l)).collect();
		let codes = opcodes(&expected, postout);
		Self { refout, postout, codes }
	}

	/// Did every line match?
	pub fn is_match(&self) -> bool {
		self.codes.iter().all(|op| op.tag == Tag::Equal)
	}

	/// Render as unified-diff lines. Empty when everything matched.
	/// Labels go into the `---`/`+++` header lines and may be empty.
	pub fn unified(&self, from_label: &[u8], to_label: &[u8]) -> Vec<Vec<u8>> {
		let groups = grouped(&self.codes);
		if groups.is_empty() {
			return vec![];
		}

		let mut out = Vec::new();
		out.push([b"--- ", from_label, b"\n"].concat());
		out.push([b"+++ ", to_label, b"\n"].concat());
		for group in groups {
			let first = group[0];
			let last = group[group.len() - 1];
			let header = format!(
				"@@ -{} +{} @@\n",
				format_range(first.i1, last.i2),
				format_range(first.j1, last.j2),
			);
			out.push(header.into_bytes());
			for op in group {
				match op.tag {
					Tag::Equal => {
						for line in &self.refout[op.i1..op.i2] {
							out.push([b" ", line.as_slice()].concat());
						}
					}
					Tag::Delete => {
						for line in &self.refout[op.i1..op.i2] {
							out.push([b"-", line.as_slice()].concat());
						}
					}
					Tag::Insert => {
						for line in &self.postout[op.j1..op.j2] {
							out.push([b"+", line.as_slice()].concat());
						}
					}
				}
			}
		}
		out
	}

	/// The reconstructed transcript with matching expected lines kept as
	/// written. Matched ranges come from the reference side, so patterns
	/// survive; everything else is the shell's actual output.
	pub fn merged(&self) -> Vec<Vec<u8>> {
		let mut out = Vec::new();
		for op in &self.codes {
			match op.tag {
				Tag::Equal => out.extend(self.refout[op.i1..op.i2].iter().cloned()),
				Tag::Insert => out.extend(self.postout[op.j1..op.j2].iter().cloned()),
				// Deleted expectations have no actual counterpart.
				Tag::Delete => {}
			}
		}
		out
	}
}

/// The `start,length` piece of a hunk header. Length one is rendered as
/// the bare line number, the usual unified-diff shorthand.
fn format_range(start: usize, stop: usize) -> String {
	let length = stop - start;
	if length == 1 {
		return format!("{}", start + 1);
	}
	let beg = if length == 0 { start } else { start + 1 };
	format!("{beg},{length}")
}

/// LCS opcodes over matcher equivalence. Deletions win ties so `-` lines
/// always come before their replacing `+` lines.
fn opcodes(expected: &[ExpectedLine], actual: &[Vec<u8>]) -> Vec<Opcode> {
	let n = expected.len();
	let m = actual.len();
	let mut table = vec![vec![0u32; m + 1]; n + 1];
	for i in (0..n).rev() {
		for j in (0..m).rev() {
			table[i][j] = if expected[i].matches(&actual[j]) {
				table[i + 1][j + 1] + 1
			} else {
				table[i + 1][j].max(table[i][j + 1])
			};
		}
	}

	let mut codes: Vec<Opcode> = Vec::new();
	let mut push = |tag: Tag, i1: usize, i2: usize, j1: usize, j2: usize| {
		if let Some(prev) = codes.last_mut()
			&& prev.tag == tag {
				prev.i2 = i2;
				prev.j2 = j2;
				return;
		}
		codes.push(Opcode { tag, i1, i2, j1, j2 });
	};

	let (mut i, mut j) = (0, 0);
	while i < n && j < m {
		if expected[i].matches(&actual[j]) {
			push(Tag::Equal, i, i + 1, j, j + 1);
			i += 1;
			j += 1;
		} else if table[i + 1][j] >= table[i][j + 1] {
			push(Tag::Delete, i, i + 1, j, j);
			i += 1;
		} else {
			push(Tag::Insert, i, i, j, j + 1);
			j += 1;
		}
	}
	if i < n {
		push(Tag::Delete, i, n, j, j);
	}
	if j < m {
		push(Tag::Insert, i, i, j, m);
	}
	codes
}

/// Group opcodes into hunks with [`CONTEXT`] lines of surrounding context,
/// trimming the leading and trailing equal runs. An all-equal sequence
/// yields no groups at all.
fn grouped(codes: &[Opcode]) -> Vec<Vec<Opcode>> {
	if codes.iter().all(|op| op.tag == Tag::Equal) {
		return vec![];
	}
	let mut codes = codes.to_vec();

	if let Some(first) = codes.first_mut()
		&& first.tag == Tag::Equal {
			first.i1 = first.i1.max(first.i2.saturating_sub(CONTEXT));
			first.j1 = first.j1.max(first.j2.saturating_sub(CONTEXT));
	}
	if let Some(last) = codes.last_mut()
		&& last.tag == Tag::Equal {
			last.i2 = last.i2.min(last.i1 + CONTEXT);
			last.j2 = last.j2.min(last.j1 + CONTEXT);
	}

	let mut groups = Vec::new();
	let mut group: Vec<Opcode> = Vec::new();
	for &op in &codes {
		let mut op = op;
		// A long equal stretch ends the current hunk and starts the next.
		if op.tag == Tag::Equal && op.i2 - op.i1 > CONTEXT * 2 {
			let mut head = op;
			head.i2 = head.i2.min(head.i1 + CONTEXT);
			head.j2 = head.j2.min(head.j1 + CONTEXT);
			group.push(head);
			groups.push(std::mem::take(&mut group));
			op.i1 = op.i1.max(op.i2.saturating_sub(CONTEXT));
			op.j1 = op.j1.max(op.j2.saturating_sub(CONTEXT));
		}
		group.push(op);
	}
	if !group.is_empty() && !(group.len() == 1 && group[0].tag == Tag::Equal) {
		groups.push(group);
	}
	groups
}
