use std::path::PathBuf;

use clap::Parser;

use super::*;

#[test]
fn parse_execute_with_trailing_command() {
	let args = vec!["terminator", "execute", "-t", "build", "--timeout", "5", "cargo", "test", "--all"];
	let cli = Cli::try_parse_from(args).unwrap();

	match cli.command {
		Commands::Execute(args) => {
			assert_eq!(args.target.tag, "build");
			assert_eq!(args.timeout, Some(5));
			assert_eq!(args.command_line().as_deref(), Some("cargo test --all"));
			assert_eq!(args.focus, FocusMode::Default);
			assert!(!args.background);
		}
		_ => panic!("Expected Execute command"),
	}
}

#[test]
fn parse_execute_without_command_prepares() {
	let args = vec!["terminator", "execute", "--tag", "build", "--project", "/srv/app"];
	let cli = Cli::try_parse_from(args).unwrap();

	match cli.command {
		Commands::Execute(args) => {
			assert_eq!(args.command_line(), None);
			assert_eq!(args.target.project, Some(PathBuf::from("/srv/app")));
		}
		_ => panic!("Expected Execute command"),
	}
}

#[test]
fn parse_focus_modes() {
	let args = vec!["terminator", "kill", "-t", "build", "--focus", "no-focus"];
	let cli = Cli::try_parse_from(args).unwrap();

	match cli.command {
		Commands::Kill(args) => assert_eq!(args.focus, FocusMode::Never),
		_ => panic!("Expected Kill command"),
	}

	let args = vec!["terminator", "execute", "-t", "x", "--focus", "sideways"];
	assert!(Cli::try_parse_from(args).is_err());
}

#[test]
fn parse_global_overrides_after_subcommand() {
	let args = vec!["terminator", "list", "--app", "iterm", "--grouping", "off", "-f", "json", "-vv"];
	let cli = Cli::try_parse_from(args).unwrap();

	assert_eq!(cli.format, crate::output::OutputFormat::Json);
	assert_eq!(cli.verbose, 2);
	let overrides = cli.global.overrides();
	assert_eq!(overrides.app, Some(TerminalApp::ITerm));
	assert_eq!(overrides.window_grouping, Some(WindowGrouping::Off));
	assert!(overrides.default_lines.is_none());
}

#[test]
fn read_requires_a_tag() {
	assert!(Cli::try_parse_from(["terminator", "read"]).is_err());
	let cli = Cli::try_parse_from(["terminator", "read", "-t", "logs", "-n", "20"]).unwrap();
	match cli.command {
		Commands::Read(args) => assert_eq!(args.lines, Some(20)),
		_ => panic!("Expected Read command"),
	}
}
