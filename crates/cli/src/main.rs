use clap::Parser;
use terminator_cli::{
	cli::Cli,
	commands::{self, Failure},
	logging,
	output::{self, OutputFormat, ResultBuilder},
};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;

	if let Err(failure) = commands::dispatch(cli, format).await {
		handle_error(failure, format);
		std::process::exit(1);
	}
}

fn handle_error(failure: Failure, format: OutputFormat) {
	let cmd_error = failure.error.to_command_error();

	// Humans read stderr; agents read the envelope on stdout.
	output::print_error_stderr(&cmd_error);

	if format != OutputFormat::Text {
		let result: output::CommandResult<()> = ResultBuilder::new(failure.command)
			.inputs(failure.inputs)
			.error(cmd_error)
			.build();
		output::print_result(&result, format);
	}
}
