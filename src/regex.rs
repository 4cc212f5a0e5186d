use std::str::Chars;

use nom::Err as NomErr;
use nom::IResult;
use nom::Parser;
use nom::error::ErrorKind as NomErrorKind;
use nom::error::ParseError;

/// The only characters with syntactic meaning; everything else is a letter.
/// `+` is tokenized but reserved: the grammar rejects it.
const METACHARACTERS: &str = "()|*+";

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Regex {
	/// Matches only the empty string.
	Empty,
	Letter(char),
	Or(Box<Regex>, Box<Regex>),
	Cat(Box<Regex>, Box<Regex>),
	Star(Box<Regex>),
}

#[derive(Debug)]
pub struct RegexError<'a> {
	consumed: &'a str,
	remaining: &'a str,
	kind: RegexErrorKind,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RegexErrorKind {
	/// An atom (letter or parenthesized group) was required but not found;
	/// covers stray ')', '|', '*', and running out of input after '|'.
	InvalidTerm,
	/// Missing the closing delimiter for the following pair.
	MissingClose(char, char),
	/// The '+' token is recognized but not part of the grammar.
	ReservedQuantifier,
	/// An error from nom; shouldn't happen, but used to implement [`nom::error::ParseError`].
	Nom(NomErrorKind),
}

#[derive(Debug)]
struct RegexParsingError<'a> {
	pub input: &'a str,
	pub kind: RegexErrorKind,
}

impl<'a> ParseError<&'a str> for RegexParsingError<'a> {
	fn from_error_kind(input: &'a str, nom: NomErrorKind) -> Self {
		Self {
			input,
			kind: RegexErrorKind::Nom(nom),
		}
	}

	fn append(_input: &'a str, _kind: NomErrorKind, other: Self) -> Self {
		other
	}
}

impl<'a> RegexParsingError<'a> {
	fn new(input: &'a str, kind: RegexErrorKind) -> Self {
		Self { input, kind }
	}
}

type ParsingResult<'a, T> = IResult<&'a str, T, RegexParsingError<'a>>;

impl Regex {
	pub fn from_pattern(pattern: &str) -> Result<Self, RegexError<'_>> {
		match parse_to_end(pattern) {
			Ok((remaining, regex)) => {
				debug_assert_eq!(remaining, "");
				Ok(regex)
			},
			Err(NomErr::Incomplete(_)) => {
				panic!("We shouldn't be using anything that can return this!");
			},
			Err(NomErr::Error(err) | NomErr::Failure(err)) => {
				let consumed: &str = pattern
					.strip_suffix(err.input)
					.expect("parser errors always point at a suffix of the pattern");
				Err(RegexError {
					consumed,
					remaining: err.input,
					kind: err.kind,
				})
			},
		}
	}
}

impl RegexError<'_> {
	/// Byte offset into the pattern where parsing failed.
	pub fn offset(&self) -> usize {
		self.consumed.len()
	}

	pub fn kind(&self) -> RegexErrorKind {
		self.kind
	}
}

impl std::fmt::Display for RegexError<'_> {
	fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(fmt, "invalid regex at byte {}: ", self.offset())?;
		match self.kind {
			RegexErrorKind::InvalidTerm => {
				if self.remaining.is_empty() {
					write!(fmt, "expected a letter or '(' but the pattern ended")
				} else {
					write!(fmt, "expected a letter or '(' but found {:?}", first_char(self.remaining))
				}
			},
			RegexErrorKind::MissingClose(open, close) => {
				write!(fmt, "missing {close:?} to match {open:?}")
			},
			RegexErrorKind::ReservedQuantifier => {
				write!(fmt, "'+' is reserved and not accepted")
			},
			RegexErrorKind::Nom(nom) => {
				write!(fmt, "internal parser error ({nom:?})")
			},
		}
	}
}

impl std::error::Error for RegexError<'_> {}

fn first_char(input: &str) -> char {
	input.chars().next().unwrap_or('\0')
}

impl RegexErrorKind {
	fn error(self, input: &str) -> NomErr<RegexParsingError<'_>> {
		NomErr::Error(RegexParsingError::new(input, self))
	}

	fn diagnostic<'a, T>(self) -> impl Fn(&'a str) -> ParsingResult<'a, T> {
		move |input| Err(self.error(input))
	}
}

// ==================================

fn parse_to_end(input: &str) -> ParsingResult<'_, Regex> {
	// `parse_sequence` is a "list" that simply terminates when no more starred
	// atoms can be parsed, so it swallows errors from `parse_starred`; same for
	// `parse_alternation` at a missing '|'. Inside parentheses, the list ending
	// means we look for the closing parenthesis. Here, the list ending means we
	// must be at the end of input, otherwise reproduce the term diagnostic.
	let (input, regex): (&str, Regex) = parse_alternation(input)?;

	if !input.is_empty() {
		let kind: RegexErrorKind = if input.starts_with('+') {
			RegexErrorKind::ReservedQuantifier
		} else {
			RegexErrorKind::InvalidTerm
		};
		return Err(kind.error(input));
	}

	Ok((input, regex))
}

fn parse_alternation(input: &str) -> ParsingResult<'_, Regex> {
	use nom::combinator::cut;
	use nom::combinator::opt;

	// A regex position that immediately sees EOF or the ')' of the enclosing
	// group denotes the empty string. Everything else requires at least one
	// sequence; an empty branch between '|'s does not.
	if input.is_empty() || input.starts_with(')') {
		return Ok((input, Regex::Empty));
	}

	let (mut input, mut regex): (&str, Regex) = cut(parse_sequence).parse(input)?;

	loop {
		let maybe_bar: Option<char>;
		(input, maybe_bar) = opt(parse_char::<'|'>).parse(input)?;
		if maybe_bar.is_none() {
			break;
		}

		// Cut: After seeing a '|', we necessarily are expecting a sequence.
		let right: Regex;
		(input, right) = cut(parse_sequence).parse(input)?;
		regex = Regex::Or(Box::new(regex), Box::new(right));
	}

	Ok((input, regex))
}

fn parse_sequence(input: &str) -> ParsingResult<'_, Regex> {
	let (mut input, mut regex): (&str, Regex) = parse_starred(input)?;

	loop {
		match parse_starred(input) {
			Ok((remaining, right)) => {
				input = remaining;
				regex = Regex::Cat(Box::new(regex), Box::new(right));
			},
			Err(NomErr::Error(_)) => {
				break;
			},
			Err(err @ (NomErr::Incomplete(_) | NomErr::Failure(_))) => {
				return Err(err);
			},
		}
	}

	Ok((input, regex))
}

fn parse_starred(input: &str) -> ParsingResult<'_, Regex> {
	use nom::combinator::opt;

	let (mut input, mut regex): (&str, Regex) = parse_atom(input)?;

	// Stars may stack: `a**` is `a*`.
	loop {
		let maybe_star: Option<char>;
		(input, maybe_star) = opt(parse_char::<'*'>).parse(input)?;
		if maybe_star.is_none() {
			break;
		}
		regex = Regex::Star(Box::new(regex));
	}

	Ok((input, regex))
}

fn parse_atom(input: &str) -> ParsingResult<'_, Regex> {
	use nom::branch::alt;

	if input.starts_with('+') {
		return Err(RegexErrorKind::ReservedQuantifier.error(input));
	}

	alt((
		parse_parenthesized,
		parse_letter.map(Regex::Letter),
		RegexErrorKind::InvalidTerm.diagnostic(),
	))
	.parse(input)
}

fn parse_parenthesized(original_input: &str) -> ParsingResult<'_, Regex> {
	use nom::combinator::cut;

	let (input, _): (&str, char) = parse_char::<'('>(original_input)?;

	let (input, inner): (&str, Regex) = match parse_alternation(input) {
		Ok(ok) => ok,
		Err(err @ NomErr::Incomplete(_)) => {
			return Err(err);
		},
		Err(NomErr::Error(err) | NomErr::Failure(err)) => {
			// Since we already matched the opening parenthesis, we require the
			// inside to match too; fold `Error` ("something else may match") to
			// a `Failure` ("input is malformed") and keep the inside's message.
			return Err(NomErr::Failure(err));
		},
	};

	let (input, _): (&str, char) =
		cut(parse_char::<')'>.or(RegexErrorKind::MissingClose('(', ')').diagnostic())).parse(input)?;

	Ok((input, inner))
}

fn parse_letter(input: &str) -> ParsingResult<'_, char> {
	let mut chars: Chars<'_> = input.chars();

	match chars.next() {
		Some(ch) if !METACHARACTERS.contains(ch) => Ok((chars.as_str(), ch)),
		_ => Err(RegexErrorKind::InvalidTerm.error(input)),
	}
}

fn parse_char<const CHAR: char>(input: &str) -> ParsingResult<'_, char> {
	let mut chars: Chars<'_> = input.chars();

	match chars.next() {
		Some(ch) if ch == CHAR => Ok((chars.as_str(), ch)),
		_ => Err(RegexErrorKind::InvalidTerm.error(input)),
	}
}
