use std::env;
use std::io::Write;
use std::process::exit;

use regex_mechanic::render::Format;
use regex_mechanic::render::Mode;
use regex_mechanic::render::Rendered;
use regex_mechanic::render::render;

fn main() {
	tracing_subscriber::fmt::init();

	let args: Vec<String> = env::args().skip(1).collect::<Vec<_>>();
	if args.is_empty() || args.len() > 3 {
		eprintln!("usage: regex2dot <pattern> [tree|dfa] [text|image]");
		exit(1);
	}

	let mode: Mode = args.get(1).map_or_else(Mode::default, |value| Mode::from_query(value));
	let format: Format = args.get(2).map_or_else(Format::default, |value| Format::from_query(value));

	match render(&args[0], mode, format) {
		Ok(Rendered::Text(dot)) => {
			print!("{dot}");
		},
		Ok(Rendered::Image(png)) => {
			if let Err(err) = std::io::stdout().write_all(&png) {
				eprintln!("error: {err}");
				exit(1);
			}
		},
		Err(err) => {
			eprintln!("error: {err}");
			exit(2);
		},
	}
}
