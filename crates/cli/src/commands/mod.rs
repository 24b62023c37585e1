//! Subcommand handlers.
//!
//! Each handler returns its data plus warnings; [`dispatch`] wraps them in
//! the output envelope.

mod execute;
mod focus;
mod info;
mod kill;
mod list;
mod read;

use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use crate::output::{self, CommandInputs, OutputFormat, ResultBuilder, TextRender};
use crate::runtime::build_dispatcher;

/// Data and warnings produced by one handler.
pub struct Reply<T> {
	pub data: T,
	pub warnings: Vec<String>,
}

impl<T> Reply<T> {
	pub fn new(data: T) -> Self {
		Self {
			data,
			warnings: Vec::new(),
		}
	}

	pub fn with_warnings(data: T, warnings: Vec<String>) -> Self {
		Self { data, warnings }
	}
}

/// A failed command, kept with the name and inputs for the error envelope.
pub struct Failure {
	pub command: &'static str,
	pub inputs: CommandInputs,
	pub error: CliError,
}

/// Runs the parsed command and prints its envelope.
pub async fn dispatch(cli: Cli, format: OutputFormat) -> std::result::Result<(), Failure> {
	let name = command_name(&cli.command);
	let inputs = command_inputs(&cli.command);
	let started = Instant::now();

	let dispatcher = build_dispatcher(&cli.global).map_err(|error| Failure {
		command: name,
		inputs: inputs.clone(),
		error,
	})?;
	debug!(target = "terminator.cli", command = name, "dispatching");

	let outcome = match cli.command {
		Commands::Execute(args) => emit(name, &inputs, started, format, execute::run(&dispatcher, args).await),
		Commands::Read(args) => emit(name, &inputs, started, format, read::run(&dispatcher, args).await),
		Commands::List(args) => emit(name, &inputs, started, format, list::run(&dispatcher, args).await),
		Commands::Focus(args) => emit(name, &inputs, started, format, focus::run(&dispatcher, args).await),
		Commands::Kill(args) => emit(name, &inputs, started, format, kill::run(&dispatcher, args).await),
		Commands::Info => emit(name, &inputs, started, format, info::run(&dispatcher)),
	};

	outcome.map_err(|error| Failure {
		command: name,
		inputs,
		error,
	})
}

fn emit<T: Serialize + TextRender>(
	name: &str,
	inputs: &CommandInputs,
	started: Instant,
	format: OutputFormat,
	reply: Result<Reply<T>>,
) -> Result<()> {
	let reply = reply?;
	let result = ResultBuilder::new(name)
		.started_at(started)
		.inputs(inputs.clone())
		.data(reply.data)
		.warnings(reply.warnings)
		.build();
	output::print_result(&result, format);
	Ok(())
}

/// Stable command name used in envelopes.
pub fn command_name(command: &Commands) -> &'static str {
	match command {
		Commands::Execute(_) => "execute",
		Commands::Read(_) => "read",
		Commands::List(_) => "list",
		Commands::Focus(_) => "focus",
		Commands::Kill(_) => "kill",
		Commands::Info => "info",
	}
}

fn command_inputs(command: &Commands) -> CommandInputs {
	match command {
		Commands::Execute(args) => CommandInputs {
			tag: Some(args.target.tag.clone()),
			project: args.target.project.clone(),
			command: args.command_line(),
		},
		Commands::Read(args) => target_inputs(&args.target),
		Commands::Focus(args) => target_inputs(args),
		Commands::Kill(args) => target_inputs(&args.target),
		Commands::List(args) => CommandInputs {
			tag: args.tag.clone(),
			..CommandInputs::default()
		},
		Commands::Info => CommandInputs::default(),
	}
}

fn target_inputs(target: &crate::cli::TargetArgs) -> CommandInputs {
	CommandInputs {
		tag: Some(target.tag.clone()),
		project: target.project.clone(),
		command: None,
	}
}
