//! Session identity encoded in tab titles.
//!
//! Titles look like `build @ my-app [tm:3f2a9c01b7de]`, or `build [tm:-]`
//! for sessions without a project. The tag is always the first token; the
//! `[tm:…]` token may appear anywhere because terminals decorate names.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Longest tag kept after sanitizing.
pub const MAX_TAG_LEN: usize = 64;

/// Hex characters of the project hash embedded in titles.
pub const HASH_LEN: usize = 12;

const TOKEN_OPEN: &str = "[tm:";
const NO_PROJECT: &str = "-";

/// Replaces characters outside `[A-Za-z0-9_-]` with `-`, trims edge dashes,
/// and truncates to [`MAX_TAG_LEN`].
pub fn sanitize_tag(tag: &str) -> Result<String> {
	let mut out = String::with_capacity(tag.len());
	for c in tag.chars() {
		if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
			out.push(c);
		} else {
			out.push('-');
		}
	}
	let trimmed = out.trim_matches('-');
	if trimmed.is_empty() {
		return Err(Error::InvalidInput(format!("tag {tag:?} has no usable characters")));
	}
	let mut tag: String = trimmed.chars().take(MAX_TAG_LEN).collect();
	while tag.ends_with('-') {
		tag.pop();
	}
	Ok(tag)
}

/// Absolute, canonical form of `path` (relative paths resolve against the
/// current directory).
pub fn canonical_project(path: &Path) -> Result<PathBuf> {
	let absolute = if path.is_absolute() {
		path.to_path_buf()
	} else {
		std::env::current_dir()?.join(path)
	};
	Ok(absolute.canonicalize().unwrap_or(absolute))
}

/// First [`HASH_LEN`] hex characters of SHA-256 over the path.
pub fn project_hash(path: &Path) -> String {
	let digest = Sha256::digest(path.to_string_lossy().as_bytes());
	let mut hex = String::with_capacity(HASH_LEN);
	for byte in digest.iter().take(HASH_LEN / 2) {
		hex.push_str(&format!("{byte:02x}"));
	}
	hex
}

/// Builds the title for a session.
pub fn format_title(tag: &str, project: Option<(&Path, &str)>) -> String {
	match project {
		Some((path, hash)) => {
			let name = path
				.file_name()
				.map(|n| n.to_string_lossy().into_owned())
				.unwrap_or_else(|| path.display().to_string());
			format!("{tag} @ {name} {TOKEN_OPEN}{hash}]")
		}
		None => format!("{tag} {TOKEN_OPEN}{NO_PROJECT}]"),
	}
}

/// Identity recovered from a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTitle {
	pub tag: String,
	/// `None` for sessions created without a project.
	pub project_hash: Option<String>,
}

/// Recovers tag and project hash; `None` for titles not written by us.
pub fn parse_title(title: &str) -> Option<ParsedTitle> {
	let start = title.find(TOKEN_OPEN)?;
	let rest = &title[start + TOKEN_OPEN.len()..];
	let end = rest.find(']')?;
	let hash = &rest[..end];
	let project_hash = if hash == NO_PROJECT {
		None
	} else if hash.len() == HASH_LEN && hash.bytes().all(|b| b.is_ascii_hexdigit()) {
		Some(hash.to_string())
	} else {
		return None;
	};

	let tag = title.split_whitespace().next()?;
	if tag.starts_with(TOKEN_OPEN) {
		return None;
	}
	Some(ParsedTitle {
		tag: tag.to_string(),
		project_hash,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sanitize_replaces_and_trims() {
		assert_eq!(sanitize_tag("my build/42").unwrap(), "my-build-42");
		assert_eq!(sanitize_tag("--dev server!").unwrap(), "dev-server");
		assert!(sanitize_tag("!!!").is_err());
		assert!(sanitize_tag("").is_err());
	}

	#[test]
	fn sanitize_truncates_long_tags() {
		let tag = sanitize_tag(&"a".repeat(100)).unwrap();
		assert_eq!(tag.len(), MAX_TAG_LEN);

		let tricky = format!("{}-b", "a".repeat(MAX_TAG_LEN - 1));
		let tag = sanitize_tag(&tricky).unwrap();
		assert!(!tag.ends_with('-'));
	}

	#[test]
	fn hash_is_short_and_deterministic() {
		let a = project_hash(Path::new("/Users/dev/app"));
		let b = project_hash(Path::new("/Users/dev/app"));
		let c = project_hash(Path::new("/Users/dev/other"));
		assert_eq!(a, b);
		assert_ne!(a, c);
		assert_eq!(a.len(), HASH_LEN);
	}

	#[test]
	fn titles_round_trip() {
		let path = Path::new("/Users/dev/app");
		let hash = project_hash(path);
		let title = format_title("build", Some((path, &hash)));
		assert!(title.starts_with("build @ app [tm:"));
		let parsed = parse_title(&title).unwrap();
		assert_eq!(parsed.tag, "build");
		assert_eq!(parsed.project_hash.as_deref(), Some(hash.as_str()));

		let parsed = parse_title(&format_title("tests", None)).unwrap();
		assert_eq!(parsed.tag, "tests");
		assert_eq!(parsed.project_hash, None);
	}

	#[test]
	fn decorated_titles_still_parse() {
		let parsed = parse_title("build @ app [tm:0123456789ab] — zsh — 80×24").unwrap();
		assert_eq!(parsed.project_hash.as_deref(), Some("0123456789ab"));
	}

	#[test]
	fn foreign_titles_are_ignored() {
		assert_eq!(parse_title("vim README.md"), None);
		assert_eq!(parse_title("build [tm:nothex!]"), None);
		assert_eq!(parse_title("[tm:-]"), None);
	}
}
