use std::collections::BTreeSet;
use std::collections::VecDeque;

use crate::dfa::Dfa;
use crate::tree::NodeIdx;
use crate::tree::NodeKind;
use crate::tree::Position;
use crate::tree::SyntaxTree;

impl SyntaxTree {
	/// DOT text for the annotated tree. Arena indices double as the node
	/// handles; labels carry the position sets in a smaller sub-label.
	pub fn graph(&self) -> String {
		let mut out: String = String::new();
		out.push_str("digraph G {\n\tgraph [ordering=\"out\"];\n");

		let mut pending: Vec<NodeIdx> = vec![self.root()];
		while let Some(idx) = pending.pop() {
			out.push_str(&format!(
				"{idx} [label=<{}<BR />\n<FONT POINT-SIZE=\"10\">{}<BR />\n{}<BR />{}</FONT>>];\n",
				self.node_label(idx),
				position_set("firstpos", self[idx].firstpos()),
				position_set("lastpos", self[idx].lastpos()),
				position_set("followpos", &self.node_followpos(idx)),
			));
			for child in self[idx].kind().children() {
				out.push_str(&format!("\t{idx} -> {child};\n"));
				pending.push(child);
			}
		}

		out.push_str("}\n");
		out
	}

	fn node_label(&self, idx: NodeIdx) -> String {
		match self[idx].kind() {
			NodeKind::Empty => "empty".to_owned(),
			NodeKind::Letter { letter, position } => format!("{}:{position}", escape_html(letter)),
			NodeKind::Terminator { position } => format!("#:{position}"),
			NodeKind::Or(..) => "OR".to_owned(),
			NodeKind::Cat(..) => "CAT".to_owned(),
			NodeKind::Star(..) => "STAR".to_owned(),
		}
	}

	/// Interior nodes own no position, so their followpos renders empty.
	fn node_followpos(&self, idx: NodeIdx) -> BTreeSet<Position> {
		match self[idx].kind() {
			NodeKind::Letter { position, .. } | NodeKind::Terminator { position } => self.followpos(position).clone(),
			_ => BTreeSet::new(),
		}
	}
}

impl Dfa {
	/// DOT text for the automaton: breadth-first from state 0, accepting
	/// states drawn as double circles, edges labelled with their letter.
	pub fn graph(&self) -> String {
		let mut out: String = String::new();
		out.push_str("digraph G {\n\tgraph [ordering=\"out\" overlap=scale splines=true];\nrankdir=LR;\n");

		let mut visited: BTreeSet<usize> = BTreeSet::from([0]);
		let mut queue: VecDeque<usize> = VecDeque::from([0]);
		while let Some(state) = queue.pop_front() {
			let shape: &str = if self.is_accepting(state) { "doublecircle" } else { "circle" };
			out.push_str(&format!("{state} [shape={shape}];\n"));

			for (&letter, &target) in self.transitions(state).iter() {
				if visited.insert(target) {
					queue.push_back(target);
				}
				out.push_str(&format!("\t{state} -> {target} [label=\"{}\"];\n", escape_quoted(letter)));
			}
		}

		out.push_str("}\n");
		out
	}
}

fn position_set(name: &str, positions: &BTreeSet<Position>) -> String {
	let mut out: String = format!("{name}: {{");
	for p in positions.iter() {
		out.push_str(&format!("{p} "));
	}
	out.push('}');
	out
}

fn escape_html(letter: char) -> String {
	match letter {
		'&' => "&amp;".to_owned(),
		'<' => "&lt;".to_owned(),
		'>' => "&gt;".to_owned(),
		_ => letter.to_string(),
	}
}

fn escape_quoted(letter: char) -> String {
	match letter {
		'"' => "\\\"".to_owned(),
		'\\' => "\\\\".to_owned(),
		_ => letter.to_string(),
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::regex::Regex;

	fn tree(pattern: &str) -> SyntaxTree {
		SyntaxTree::for_regex(&Regex::from_pattern(pattern).unwrap())
	}

	#[test]
	fn dfa_graph_for_a_chain() {
		let dfa: Dfa = Dfa::construct(&tree("ab"));
		let expected: &str = "digraph G {\n\
			\tgraph [ordering=\"out\" overlap=scale splines=true];\n\
			rankdir=LR;\n\
			0 [shape=circle];\n\
			\t0 -> 1 [label=\"a\"];\n\
			1 [shape=circle];\n\
			\t1 -> 2 [label=\"b\"];\n\
			2 [shape=doublecircle];\n\
			}\n";
		assert_eq!(dfa.graph(), expected);
	}

	#[test]
	fn tree_graph_for_a_single_letter() {
		// Arena order: letter 0, end marker 1, root 2.
		let expected: &str = "digraph G {\n\
			\tgraph [ordering=\"out\"];\n\
			2 [label=<CAT<BR />\n\
			<FONT POINT-SIZE=\"10\">firstpos: {0 }<BR />\n\
			lastpos: {1 }<BR />followpos: {}</FONT>>];\n\
			\t2 -> 0;\n\
			\t2 -> 1;\n\
			1 [label=<#:1<BR />\n\
			<FONT POINT-SIZE=\"10\">firstpos: {1 }<BR />\n\
			lastpos: {1 }<BR />followpos: {}</FONT>>];\n\
			0 [label=<a:0<BR />\n\
			<FONT POINT-SIZE=\"10\">firstpos: {0 }<BR />\n\
			lastpos: {0 }<BR />followpos: {1 }</FONT>>];\n\
			}\n";
		assert_eq!(tree("a").graph(), expected);
	}

	#[test]
	fn emission_is_deterministic() {
		let t: SyntaxTree = tree("(a|b)*abb");
		assert_eq!(t.graph(), t.graph());
		let dfa: Dfa = Dfa::construct(&t);
		assert_eq!(dfa.graph(), dfa.graph());
	}

	#[test]
	fn every_edge_is_emitted_even_into_visited_states() {
		// a|b: both letters reach state 1, so two edges but one node statement.
		let dfa: Dfa = Dfa::construct(&tree("a|b"));
		let dot: String = dfa.graph();
		assert_eq!(dot.matches("-> 1").count(), 2);
		assert_eq!(dot.matches("1 [shape=").count(), 1);
	}

	#[test]
	fn graphs_are_terminated() {
		for pattern in ["", "a", "(a|b)*abb"] {
			let t: SyntaxTree = tree(pattern);
			assert!(t.graph().ends_with("}\n"));
			assert!(Dfa::construct(&t).graph().ends_with("}\n"));
		}
	}

	#[test]
	fn markup_letters_are_escaped() {
		let dot: String = tree("<").graph();
		assert!(dot.contains("&lt;:0"), "unescaped label in {dot}");

		let dfa: Dfa = Dfa::construct(&tree("\""));
		let dot: String = dfa.graph();
		assert!(dot.contains("[label=\"\\\"\"]"), "unescaped edge label in {dot}");
	}
}
