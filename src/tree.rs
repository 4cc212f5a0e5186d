use std::collections::BTreeSet;

use crate::regex::Regex;

/// Unique id of a leaf (letter or end marker) in the augmented tree.
pub type Position = usize;

#[derive(Debug, Clone, Copy, Eq, Ord, PartialEq, PartialOrd)]
pub struct NodeIdx(usize);

/// Augmented syntax tree in an arena, annotated for DFA construction.
///
/// The tree built from a pattern is `Cat(body, terminator)`: the end marker is
/// the rightmost leaf, its position is the highest, and a position set
/// containing it marks an accepting DFA state. `nullable`, `firstpos` and
/// `lastpos` are fixed at node construction (children exist before parents);
/// `followpos` is filled in by one pass afterwards and only `Cat` and `Star`
/// contribute edges.
#[derive(Debug)]
pub struct SyntaxTree {
	nodes: Vec<Node>,
	root: NodeIdx,
	/// Letter carried by each position; the end marker renders as '#'.
	letters: Vec<char>,
	followpos: Vec<BTreeSet<Position>>,
}

#[derive(Debug)]
pub struct Node {
	kind: NodeKind,
	nullable: bool,
	firstpos: BTreeSet<Position>,
	lastpos: BTreeSet<Position>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NodeKind {
	Empty,
	Letter { letter: char, position: Position },
	Terminator { position: Position },
	Or(NodeIdx, NodeIdx),
	Cat(NodeIdx, NodeIdx),
	Star(NodeIdx),
}

impl SyntaxTree {
	pub fn for_regex(regex: &Regex) -> Self {
		let mut tree: Self = SyntaxTree {
			nodes: Vec::new(),
			root: NodeIdx(0),
			letters: Vec::new(),
			followpos: Vec::new(),
		};

		// In-order lowering assigns letter positions left to right, which for
		// this grammar equals input order; the end marker takes the last id.
		let body: NodeIdx = tree.lower(regex);
		let position: Position = tree.new_position('#');
		let marker: NodeIdx = tree.add_node(NodeKind::Terminator { position });
		tree.root = tree.add_node(NodeKind::Cat(body, marker));

		tree.followpos = vec![BTreeSet::new(); tree.letters.len()];
		tree.link_followpos(tree.root);

		tree
	}

	fn lower(&mut self, regex: &Regex) -> NodeIdx {
		match regex {
			Regex::Empty => self.add_node(NodeKind::Empty),
			&Regex::Letter(letter) => {
				let position: Position = self.new_position(letter);
				self.add_node(NodeKind::Letter { letter, position })
			},
			Regex::Or(left, right) => {
				let left: NodeIdx = self.lower(left);
				let right: NodeIdx = self.lower(right);
				self.add_node(NodeKind::Or(left, right))
			},
			Regex::Cat(left, right) => {
				let left: NodeIdx = self.lower(left);
				let right: NodeIdx = self.lower(right);
				self.add_node(NodeKind::Cat(left, right))
			},
			Regex::Star(child) => {
				let child: NodeIdx = self.lower(child);
				self.add_node(NodeKind::Star(child))
			},
		}
	}

	fn new_position(&mut self, letter: char) -> Position {
		let position: Position = self.letters.len();
		self.letters.push(letter);
		position
	}

	fn add_node(&mut self, kind: NodeKind) -> NodeIdx {
		let (nullable, firstpos, lastpos): (bool, BTreeSet<Position>, BTreeSet<Position>) = match kind {
			NodeKind::Empty => (true, BTreeSet::new(), BTreeSet::new()),
			NodeKind::Letter { position, .. } | NodeKind::Terminator { position } => {
				(false, BTreeSet::from([position]), BTreeSet::from([position]))
			},
			NodeKind::Or(left, right) => (
				self[left].nullable || self[right].nullable,
				&self[left].firstpos | &self[right].firstpos,
				&self[left].lastpos | &self[right].lastpos,
			),
			NodeKind::Cat(left, right) => (
				self[left].nullable && self[right].nullable,
				if self[left].nullable {
					&self[left].firstpos | &self[right].firstpos
				} else {
					self[left].firstpos.clone()
				},
				if self[right].nullable {
					&self[left].lastpos | &self[right].lastpos
				} else {
					self[right].lastpos.clone()
				},
			),
			NodeKind::Star(child) => (true, self[child].firstpos.clone(), self[child].lastpos.clone()),
		};

		let n: usize = self.nodes.len();
		self.nodes.push(Node {
			kind,
			nullable,
			firstpos,
			lastpos,
		});
		NodeIdx(n)
	}

	fn link_followpos(&mut self, idx: NodeIdx) {
		match self[idx].kind {
			NodeKind::Cat(left, right) => {
				let sources: BTreeSet<Position> = self[left].lastpos.clone();
				let targets: BTreeSet<Position> = self[right].firstpos.clone();
				self.link(&sources, &targets);
				self.link_followpos(left);
				self.link_followpos(right);
			},
			NodeKind::Star(child) => {
				let sources: BTreeSet<Position> = self[child].lastpos.clone();
				let targets: BTreeSet<Position> = self[child].firstpos.clone();
				self.link(&sources, &targets);
				self.link_followpos(child);
			},
			NodeKind::Or(left, right) => {
				self.link_followpos(left);
				self.link_followpos(right);
			},
			NodeKind::Empty | NodeKind::Letter { .. } | NodeKind::Terminator { .. } => (),
		}
	}

	fn link(&mut self, sources: &BTreeSet<Position>, targets: &BTreeSet<Position>) {
		for &p in sources.iter() {
			self.followpos[p].extend(targets.iter().copied());
		}
	}
}

impl SyntaxTree {
	pub fn root(&self) -> NodeIdx {
		self.root
	}

	/// Number of leaf positions, end marker included.
	pub fn position_count(&self) -> usize {
		self.letters.len()
	}

	pub fn terminator(&self) -> Position {
		self.letters.len() - 1
	}

	pub fn is_terminator(&self, position: Position) -> bool {
		position == self.terminator()
	}

	pub fn letter(&self, position: Position) -> char {
		self.letters[position]
	}

	pub fn followpos(&self, position: Position) -> &BTreeSet<Position> {
		&self.followpos[position]
	}
}

impl std::ops::Index<NodeIdx> for SyntaxTree {
	type Output = Node;

	fn index(&self, i: NodeIdx) -> &Self::Output {
		&self.nodes[i.0]
	}
}

impl std::fmt::Display for NodeIdx {
	fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(fmt, "{}", self.0)
	}
}

impl Node {
	pub fn kind(&self) -> NodeKind {
		self.kind
	}

	pub fn nullable(&self) -> bool {
		self.nullable
	}

	pub fn firstpos(&self) -> &BTreeSet<Position> {
		&self.firstpos
	}

	pub fn lastpos(&self) -> &BTreeSet<Position> {
		&self.lastpos
	}
}

impl NodeKind {
	pub fn children(self) -> impl Iterator<Item = NodeIdx> {
		let pair: [Option<NodeIdx>; 2] = match self {
			Self::Empty | Self::Letter { .. } | Self::Terminator { .. } => [None, None],
			Self::Star(child) => [Some(child), None],
			Self::Or(left, right) | Self::Cat(left, right) => [Some(left), Some(right)],
		};
		pair.into_iter().flatten()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn tree(pattern: &str) -> SyntaxTree {
		SyntaxTree::for_regex(&Regex::from_pattern(pattern).unwrap())
	}

	fn set(positions: &[Position]) -> BTreeSet<Position> {
		positions.iter().copied().collect::<BTreeSet<_>>()
	}

	#[test]
	fn positions_are_assigned_in_input_order() {
		let t: SyntaxTree = tree("ab|c");
		assert_eq!(t.position_count(), 4);
		assert_eq!(t.letter(0), 'a');
		assert_eq!(t.letter(1), 'b');
		assert_eq!(t.letter(2), 'c');
		assert_eq!(t.terminator(), 3);
		assert!(t.is_terminator(3));
		assert!(!t.is_terminator(2));
	}

	#[test]
	fn dragon_book_followpos() {
		// (a|b)*abb with positions a:0 b:1 a:2 b:3 b:4 #:5.
		let t: SyntaxTree = tree("(a|b)*abb");
		assert_eq!(t.position_count(), 6);
		assert_eq!(t[t.root()].firstpos(), &set(&[0, 1, 2]));
		assert_eq!(t[t.root()].lastpos(), &set(&[5]));

		assert_eq!(t.followpos(0), &set(&[0, 1, 2]));
		assert_eq!(t.followpos(1), &set(&[0, 1, 2]));
		assert_eq!(t.followpos(2), &set(&[3]));
		assert_eq!(t.followpos(3), &set(&[4]));
		assert_eq!(t.followpos(4), &set(&[5]));
		assert_eq!(t.followpos(5), &set(&[]));
	}

	#[test]
	fn star_makes_the_marker_reachable_first() {
		// a* is nullable, so the start set holds both the letter and the marker.
		let t: SyntaxTree = tree("a*");
		assert_eq!(t[t.root()].firstpos(), &set(&[0, 1]));
		assert!(!t[t.root()].nullable());
		assert_eq!(t.followpos(0), &set(&[0, 1]));
	}

	#[test]
	fn empty_pattern() {
		let t: SyntaxTree = tree("");
		assert_eq!(t.position_count(), 1);
		assert_eq!(t[t.root()].firstpos(), &set(&[0]));
		assert!(t.is_terminator(0));
	}

	#[test]
	fn empty_group_concatenates_as_identity() {
		// ab()c: the empty group adds no positions and breaks no follow links.
		let t: SyntaxTree = tree("ab()c");
		assert_eq!(t.position_count(), 4);
		assert_eq!(t.followpos(0), &set(&[1]));
		assert_eq!(t.followpos(1), &set(&[2]));
		assert_eq!(t.followpos(2), &set(&[3]));
	}

	#[test]
	fn firstpos_of_cat_ignores_right_when_left_matches_something() {
		let t: SyntaxTree = tree("ab");
		assert_eq!(t[t.root()].firstpos(), &set(&[0]));
	}

	#[test]
	fn position_sets_stay_within_the_subtree() {
		let t: SyntaxTree = tree("(a|b)*abb");
		let all: BTreeSet<Position> = (0..t.position_count()).collect::<BTreeSet<_>>();
		for idx in 0..t.position_count() {
			assert!(t.followpos(idx).is_subset(&all));
		}
		let root: &Node = &t[t.root()];
		assert!(root.firstpos().is_subset(&all));
		assert!(root.lastpos().is_subset(&all));
	}
}
