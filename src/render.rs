use std::io::Read;
use std::io::Write;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;

use crate::dfa::Dfa;
use crate::regex::Regex;
use crate::regex::RegexError;
use crate::tree::SyntaxTree;

/// DFAs beyond this many states are served as text even when an image was
/// requested.
pub const MAX_RENDERED_STATES: usize = 32;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Mode {
	#[default]
	Tree,
	Dfa,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Format {
	Text,
	#[default]
	Image,
}

impl Mode {
	/// Query values are permissive: anything that isn't "dfa" draws the tree.
	pub fn from_query(value: &str) -> Self {
		if value == "dfa" { Self::Dfa } else { Self::Tree }
	}
}

impl Format {
	pub fn from_query(value: &str) -> Self {
		if value == "text" { Self::Text } else { Self::Image }
	}
}

#[derive(Debug)]
pub enum Rendered {
	Text(String),
	Image(Vec<u8>),
}

#[derive(Debug)]
pub enum RenderError<'a> {
	Pattern(RegexError<'a>),
	Layout(std::io::Error),
}

impl std::fmt::Display for RenderError<'_> {
	fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Pattern(err) => write!(fmt, "{err}"),
			Self::Layout(err) => write!(fmt, "graph layout failed: {err}"),
		}
	}
}

impl std::error::Error for RenderError<'_> {}

/// Compile `pattern` and draw the requested graph. Image output pipes the DOT
/// text through the external `dot` layout tool; oversized DFAs fall back to
/// text regardless of the requested format.
pub fn render(pattern: &str, mode: Mode, format: Format) -> Result<Rendered, RenderError<'_>> {
	let regex: Regex = Regex::from_pattern(pattern).map_err(RenderError::Pattern)?;
	let tree: SyntaxTree = SyntaxTree::for_regex(&regex);

	let (dot, oversized): (String, bool) = match mode {
		Mode::Tree => (tree.graph(), false),
		Mode::Dfa => {
			// The rendering path draws the raw construction.
			let dfa: Dfa = Dfa::construct(&tree);
			let oversized: bool = dfa.size() > MAX_RENDERED_STATES;
			(dfa.graph(), oversized)
		},
	};

	match format {
		Format::Text => Ok(Rendered::Text(dot)),
		Format::Image if oversized => Ok(Rendered::Text(dot)),
		Format::Image => layout_image(&dot).map(Rendered::Image).map_err(RenderError::Layout),
	}
}

fn layout_image(dot: &str) -> std::io::Result<Vec<u8>> {
	let mut child: Child = Command::new("dot")
		.arg("-Tpng")
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.spawn()?;

	// The write end is a temporary, so it is closed as soon as the bytes are
	// down; dot only produces output once its input reaches EOF.
	let wrote: std::io::Result<()> = child
		.stdin
		.take()
		.expect("stdin was requested piped")
		.write_all(dot.as_bytes());

	let mut image: Vec<u8> = Vec::new();
	let drained: std::io::Result<usize> = child
		.stdout
		.take()
		.expect("stdout was requested piped")
		.read_to_end(&mut image);

	// Reap before reporting any of the pipe errors.
	let status: ExitStatus = child.wait()?;
	wrote?;
	drained?;
	if !status.success() {
		return Err(std::io::Error::other(format!("dot exited with {status}")));
	}

	Ok(image)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn query_selectors_have_lenient_defaults() {
		assert_eq!(Mode::from_query("dfa"), Mode::Dfa);
		assert_eq!(Mode::from_query("tree"), Mode::Tree);
		assert_eq!(Mode::from_query("nonsense"), Mode::Tree);
		assert_eq!(Mode::default(), Mode::Tree);

		assert_eq!(Format::from_query("text"), Format::Text);
		assert_eq!(Format::from_query("image"), Format::Image);
		assert_eq!(Format::from_query(""), Format::Image);
		assert_eq!(Format::default(), Format::Image);
	}

	#[test]
	fn text_format_returns_the_dot_source() {
		let rendered: Rendered = render("a|b", Mode::Dfa, Format::Text).unwrap();
		let Rendered::Text(dot): Rendered = rendered else {
			panic!("expected text output");
		};
		assert!(dot.starts_with("digraph G {"));
		assert!(dot.ends_with("}\n"));
	}

	#[test]
	fn oversized_dfa_falls_back_to_text() {
		// A chain of 33 letters needs 34 states, past the image bound.
		let pattern: String = "a".repeat(33);
		let rendered: Rendered = render(&pattern, Mode::Dfa, Format::Image).unwrap();
		assert!(matches!(rendered, Rendered::Text(_)));
	}

	#[test]
	fn tree_mode_ignores_the_state_bound() {
		let pattern: String = "a".repeat(33);
		let rendered: Rendered = render(&pattern, Mode::Tree, Format::Text).unwrap();
		let Rendered::Text(dot): Rendered = rendered else {
			panic!("expected text output");
		};
		assert!(dot.contains("CAT"));
	}

	#[test]
	fn parse_errors_surface() {
		let err: RenderError<'_> = render("(", Mode::Tree, Format::Text).unwrap_err();
		assert!(matches!(err, RenderError::Pattern(_)));
		assert!(err.to_string().contains("invalid regex"));
	}
}
