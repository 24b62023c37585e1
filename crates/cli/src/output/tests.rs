use super::*;

use terminator::{SessionHandle, SessionId};

fn session() -> SessionHandle {
	SessionHandle {
		id: SessionId::new("12", "3"),
		tag: "build".into(),
		project_path: None,
		project_hash: None,
		tty: Some("/dev/ttys004".into()),
		title: "build [tm:-]".into(),
		is_busy: false,
	}
}

#[test]
fn result_builder_success() {
	let result: CommandResult<SessionHandle> = ResultBuilder::new("focus")
		.inputs(CommandInputs {
			tag: Some("build".into()),
			..Default::default()
		})
		.data(session())
		.build();

	assert!(result.ok);
	assert_eq!(result.command, "focus");
	assert_eq!(result.schema_version, Some(SCHEMA_VERSION));
	assert!(result.error.is_none());
	assert!(result.timings.is_some());
}

#[test]
fn result_builder_error() {
	let result: CommandResult<SessionHandle> = ResultBuilder::new("read")
		.error(CommandError {
			code: ErrorCode::SessionNotFound,
			message: "no session tagged 'ghost'".into(),
			details: None,
		})
		.build();

	assert!(!result.ok);
	assert!(result.data.is_none());
	assert_eq!(result.error.as_ref().unwrap().code, ErrorCode::SessionNotFound);
}

#[test]
fn error_code_display_matches_serde() {
	for code in [
		ErrorCode::BackendError,
		ErrorCode::SessionNotFound,
		ErrorCode::SessionBusy,
		ErrorCode::ProcessControlError,
		ErrorCode::IoError,
	] {
		let json = serde_json::to_value(code).unwrap();
		assert_eq!(json.as_str(), Some(code.to_string().as_str()));
	}
}

#[test]
fn output_format_parse() {
	assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
	assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
	assert!("yaml".parse::<OutputFormat>().is_err());
}

#[test]
fn envelope_uses_camel_case_and_skips_empty_fields() {
	let result: CommandResult<SessionHandle> = ResultBuilder::new("focus").data(session()).build();
	let json = serde_json::to_value(&result).unwrap();

	assert_eq!(json["schemaVersion"], 1);
	assert_eq!(json["data"]["id"]["window"], "12");
	assert_eq!(json["data"]["isBusy"], false);
	assert!(json.get("diagnostics").is_none());
	assert!(json.get("inputs").is_none());
	assert!(json["timings"]["durationMs"].is_u64());
}

#[test]
fn warnings_become_diagnostics() {
	let result: CommandResult<()> = ResultBuilder::new("kill")
		.data(())
		.warnings(["pre-kill hook failed: exit 1"])
		.build();

	assert_eq!(result.diagnostics.len(), 1);
	assert_eq!(result.diagnostics[0].level, DiagnosticLevel::Warning);
}

#[test]
fn empty_session_list_renders_placeholder() {
	colored::control::set_override(false);
	assert_eq!(Vec::<SessionHandle>::new().render_text(), "no sessions\n");
	assert!(vec![session()].render_text().contains("/dev/ttys004"));
}
