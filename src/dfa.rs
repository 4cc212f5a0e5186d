use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;

use crate::tree::Position;
use crate::tree::SyntaxTree;

/// Deterministic finite automaton over the letters that appear in the pattern.
///
/// State 0 is the start state. The dead state is implicit: it has id
/// `size()`, no outgoing transitions, and is never accepting. Letters missing
/// from a state's transition map lead to it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Dfa {
	transitions: Vec<BTreeMap<char, usize>>,
	accepting: Vec<bool>,
}

/// Programmer error: `next`/`accepting` was asked about a state id strictly
/// greater than `size()`. The automaton itself stays valid.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct InvalidStateAccess {
	pub state: usize,
	pub size: usize,
}

impl std::fmt::Display for InvalidStateAccess {
	fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			fmt,
			"state {} is out of range for a DFA of {} states (dead state {})",
			self.state, self.size, self.size
		)
	}
}

impl std::error::Error for InvalidStateAccess {}

impl Dfa {
	/// Subset construction over position sets, algorithm 3.62 from the dragon
	/// book: start from `firstpos(root)` and expand through `followpos`.
	pub fn construct(tree: &SyntaxTree) -> Self {
		let mut dfa: Self = Dfa {
			transitions: Vec::new(),
			accepting: Vec::new(),
		};

		// Bijection from position sets (compared by content) to state ids,
		// plus the FIFO of sets not yet expanded; both die with this call.
		let initial: BTreeSet<Position> = tree[tree.root()].firstpos().clone();
		debug!("state 0 <- positions {initial:?}");
		let mut state_id: BTreeMap<BTreeSet<Position>, usize> = BTreeMap::new();
		let mut unmarked: VecDeque<BTreeSet<Position>> = VecDeque::new();
		state_id.insert(initial.clone(), 0);
		unmarked.push_back(initial);

		while let Some(positions) = unmarked.pop_front() {
			let mut accepting: bool = false;

			// Union the followpos sets per letter; the map iterates letters in
			// ascending code-point order, fixing the transition order for
			// minimization and DOT emission downstream.
			let mut destinations: BTreeMap<char, BTreeSet<Position>> = BTreeMap::new();
			for &p in positions.iter() {
				if tree.is_terminator(p) {
					accepting = true;
					continue;
				}
				destinations
					.entry(tree.letter(p))
					.or_default()
					.extend(tree.followpos(p).iter().copied());
			}

			let mut row: BTreeMap<char, usize> = BTreeMap::new();
			for (letter, destination) in destinations.into_iter() {
				let id: usize = match state_id.get(&destination) {
					Some(&id) => id,
					None => {
						let id: usize = state_id.len();
						debug!("state {id} <- positions {destination:?}");
						state_id.insert(destination.clone(), id);
						unmarked.push_back(destination);
						id
					},
				};
				row.insert(letter, id);
			}

			// Discovery order: the set popped k-th was assigned id k.
			dfa.transitions.push(row);
			dfa.accepting.push(accepting);
		}

		dfa
	}

	/// Number of real states; doubles as the id of the implicit dead state.
	pub fn size(&self) -> usize {
		self.accepting.len()
	}

	pub fn next(&self, state: usize, letter: char) -> Result<usize, InvalidStateAccess> {
		if state > self.size() {
			return Err(InvalidStateAccess {
				state,
				size: self.size(),
			});
		}
		Ok(self.step(state, letter))
	}

	pub fn accepting(&self, state: usize) -> Result<bool, InvalidStateAccess> {
		if state > self.size() {
			return Err(InvalidStateAccess {
				state,
				size: self.size(),
			});
		}
		Ok(self.is_accepting(state))
	}

	/// Outgoing transitions of a real state.
	pub fn transitions(&self, state: usize) -> &BTreeMap<char, usize> {
		&self.transitions[state]
	}

	fn step(&self, state: usize, letter: char) -> usize {
		if state == self.size() {
			return self.size();
		}
		self.transitions[state].get(&letter).copied().unwrap_or(self.size())
	}

	pub(crate) fn is_accepting(&self, state: usize) -> bool {
		state < self.size() && self.accepting[state]
	}
}

impl Dfa {
	/// Table-filling minimization. The implicit dead state takes part in the
	/// table as id `size()`; its group is dropped from the quotient again
	/// unless distinguishability fused it with a real state.
	pub fn minimize(&self) -> Self {
		let size: usize = self.size();
		let mut table: PairTable = PairTable::new(size + 1);

		for p in 0..=size {
			for q in 0..p {
				if self.is_accepting(p) != self.is_accepting(q) {
					table.mark(p, q);
				}
			}
		}

		let mut updated: bool = true;
		while updated {
			updated = false;
			for p in 0..=size {
				for q in 0..p {
					if !table.marked(p, q) && self.distinguishes(p, q, &table) {
						table.mark(p, q);
						updated = true;
					}
				}
			}
		}

		// One pass groups every state with everything indistinguishable from
		// it; indistinguishability is transitive, so no state is claimed twice.
		let mut grouped: Vec<bool> = vec![false; size + 1];
		let mut groups: Vec<Vec<usize>> = Vec::new();
		for p in 0..=size {
			if grouped[p] {
				continue;
			}
			let mut group: Vec<usize> = Vec::new();
			for q in 0..=size {
				if p != q && table.marked(p, q) {
					continue;
				}
				group.push(q);
				grouped[q] = true;
			}
			groups.push(group);
		}
		debug!("equivalence groups: {groups:?}");

		groups.retain(|group| !(group.len() == 1 && group[0] == size));

		let start: usize = groups
			.iter()
			.position(|group| group.contains(&0))
			.expect("state 0 always survives into a group");
		groups.swap(0, start);

		let mut group_of: Vec<usize> = vec![usize::MAX; size + 1];
		for (i, group) in groups.iter().enumerate() {
			for &state in group.iter() {
				group_of[state] = i;
			}
		}

		let mut transitions: Vec<BTreeMap<char, usize>> = vec![BTreeMap::new(); groups.len()];
		for (state, row) in self.transitions.iter().enumerate() {
			for (&letter, &target) in row.iter() {
				// Fused states agree on their targets, so overwriting is fine.
				transitions[group_of[state]].insert(letter, group_of[target]);
			}
		}

		let accepting: Vec<bool> = groups
			.iter()
			.map(|group| group.iter().any(|&state| self.is_accepting(state)))
			.collect::<Vec<_>>();

		Dfa { transitions, accepting }
	}

	fn distinguishes(&self, p: usize, q: usize, table: &PairTable) -> bool {
		let empty: BTreeMap<char, usize> = BTreeMap::new();
		let rows: [&BTreeMap<char, usize>; 2] = [
			if p == self.size() { &empty } else { &self.transitions[p] },
			if q == self.size() { &empty } else { &self.transitions[q] },
		];
		for row in rows {
			for &letter in row.keys() {
				if table.marked(self.step(p, letter), self.step(q, letter)) {
					return true;
				}
			}
		}
		false
	}
}

/// Lower-triangular pair table: the entry for `(p, q)` lives at
/// `[max(p, q)][min(p, q)]`, so row `p` has `p` slots.
#[derive(Debug)]
struct PairTable {
	marked: Vec<Vec<bool>>,
}

impl PairTable {
	fn new(states: usize) -> Self {
		Self {
			marked: (0..states).map(|p| vec![false; p]).collect::<Vec<_>>(),
		}
	}

	fn marked(&self, p: usize, q: usize) -> bool {
		if p == q {
			return false;
		}
		self.marked[p.max(q)][p.min(q)]
	}

	fn mark(&mut self, p: usize, q: usize) {
		self.marked[p.max(q)][p.min(q)] = true;
	}
}
