//! Loading of configuration split across several files.
//!
//! A file may pull in other files with `include = "file.toml"` or
//! `include = ["a.toml", "b.toml"]`. Included files may include further files;
//! relative paths are resolved against the directory of the including file.
//! A top-level section can only be defined by one file.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use toml::{Table, Value};

const INCLUDE_KEY: &str = "include";

/// Loads a configuration file together with everything it includes.
pub struct ConfigLoader {
	base_dir: PathBuf,
	/// Canonical paths of files already read
	visited: HashSet<PathBuf>,
	/// File that defined each top-level section
	section_owners: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	/// Creates a loader resolving the top-level file against `base_dir`.
	pub fn new(base_dir: impl AsRef<Path>) -> Self {
		Self {
			base_dir: base_dir.as_ref().to_path_buf(),
			visited: HashSet::new(),
			section_owners: HashMap::new(),
		}
	}

	/// Loads `path`, follows its includes and validates the merged result.
	pub async fn load_config(&mut self, path: impl AsRef<Path>) -> Result<Config, ConfigError> {
		let mut merged = Table::new();
		let mut pending = VecDeque::from([(self.base_dir.clone(), path.as_ref().to_path_buf())]);

		while let Some((dir, path)) = pending.pop_front() {
			let file = locate(&dir, &path)?;
			let mut table = self.read_table(&file).await?;

			let parent = file.parent().map(Path::to_path_buf).unwrap_or_default();
			for include in take_includes(&mut table, &file)? {
				pending.push_back((parent.clone(), include));
			}

			self.merge(&mut merged, table, &file)?;
		}

		let config = Value::Table(merged).try_into::<Config>()?;
		config.validate()?;
		tracing::debug!(files = self.visited.len(), "Loaded configuration");
		Ok(config)
	}

	/// Reads one file, resolving environment variables before parsing.
	async fn read_table(&mut self, file: &Path) -> Result<Table, ConfigError> {
		let canonical = file.canonicalize()?;
		if !self.visited.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical.display()
			)));
		}

		let content = tokio::fs::read_to_string(file).await?;
		Ok(toml::from_str(&resolve_env_vars(&content)?)?)
	}

	fn merge(&mut self, merged: &mut Table, table: Table, file: &Path) -> Result<(), ConfigError> {
		for (section, value) in table {
			if let Some(owner) = self.section_owners.get(&section) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' found in {} and {}",
					section,
					owner.display(),
					file.display()
				)));
			}
			self.section_owners.insert(section.clone(), file.to_path_buf());
			merged.insert(section, value);
		}
		Ok(())
	}
}

fn locate(dir: &Path, path: &Path) -> Result<PathBuf, ConfigError> {
	let file = dir.join(path);
	if !file.is_file() {
		return Err(ConfigError::Io(std::io::Error::new(
			std::io::ErrorKind::NotFound,
			format!("Configuration file not found: {}", file.display()),
		)));
	}
	Ok(file)
}

/// Removes the include directive from `table` and returns the listed paths.
fn take_includes(table: &mut Table, file: &Path) -> Result<Vec<PathBuf>, ConfigError> {
	let invalid = || {
		ConfigError::Validation(format!(
			"Include in {} must be a string or an array of strings",
			file.display()
		))
	};

	let entries = match table.remove(INCLUDE_KEY) {
		None => return Ok(Vec::new()),
		Some(Value::String(path)) => return Ok(vec![PathBuf::from(path)]),
		Some(Value::Array(entries)) => entries,
		Some(_) => return Err(invalid()),
	};

	entries
		.into_iter()
		.map(|entry| match entry {
			Value::String(path) => Ok(PathBuf::from(path)),
			_ => Err(invalid()),
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_single_file_config() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("config.toml"),
			r#"
[verifier]
default_chain_id = 11155111

[chains.11155111]
name = "sepolia"
rpc_url = "https://sepolia.example.org"
"#,
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config("config.toml").await.unwrap();

		assert_eq!(config.verifier.default_chain_id, 11155111);
		assert_eq!(config.chains.get(&11155111).unwrap().name, "sepolia");
	}

	#[tokio::test]
	async fn test_config_with_includes() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			r#"
include = ["chains.toml"]

[verifier]
default_chain_id = 31337
include_known_chains = false
"#,
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("chains.toml"),
			r#"
[chains.31337]
name = "anvil"
rpc_url = "http://127.0.0.1:8545"
"#,
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config("main.toml").await.unwrap();

		assert_eq!(config.verifier.default_chain_id, 31337);
		assert!(!config.verifier.include_known_chains);
		assert_eq!(config.chains.get(&31337).unwrap().name, "anvil");
	}

	#[tokio::test]
	async fn test_nested_include_relative_to_including_file() {
		let temp_dir = TempDir::new().unwrap();
		fs::create_dir(temp_dir.path().join("conf")).unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = \"conf/verifier.toml\"\n",
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("conf/verifier.toml"),
			"include = [\"chains.toml\"]\n\n[verifier]\ndefault_chain_id = 10\n",
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("conf/chains.toml"),
			"[chains.10]\nname = \"optimism\"\nrpc_url = \"https://op.example.org\"\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config("main.toml").await.unwrap();

		assert_eq!(config.verifier.default_chain_id, 10);
		assert_eq!(
			config.chains.get(&10).unwrap().rpc_url,
			"https://op.example.org"
		);
	}

	#[tokio::test]
	async fn test_duplicate_section_error() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = [\"duplicate.toml\"]\n\n[verifier]\ndefault_chain_id = 1\n",
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("duplicate.toml"),
			"[verifier]\ndefault_chain_id = 10\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let error_msg = loader
			.load_config("main.toml")
			.await
			.unwrap_err()
			.to_string();
		assert!(error_msg.contains("Duplicate section 'verifier'"));
	}

	#[tokio::test]
	async fn test_self_include_detection() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("self.toml"),
			"include = [\"self.toml\"]\n\n[verifier]\ndefault_chain_id = 1\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let error_msg = loader
			.load_config("self.toml")
			.await
			.unwrap_err()
			.to_string();
		assert!(error_msg.contains("already loaded"));
	}

	#[tokio::test]
	async fn test_missing_include_reported() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = [\"missing.toml\"]\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let error_msg = loader
			.load_config("main.toml")
			.await
			.unwrap_err()
			.to_string();
		assert!(error_msg.contains("Configuration file not found"));
	}

	#[tokio::test]
	async fn test_include_must_list_strings() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(temp_dir.path().join("main.toml"), "include = [1, 2]\n").unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("main.toml").await.unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}
}
