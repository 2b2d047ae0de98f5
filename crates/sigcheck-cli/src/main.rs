//! Command-line entry point for sigcheck.
//!
//! Formats wallet signing requests and verifies the signatures wallets
//! return. Results go to stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use sigcheck_chain::implementations::alloy::AlloyConnector;
use sigcheck_chain::ChainTable;
use sigcheck_config::Config;
use sigcheck_request::{format_request, sign_message_methods, Fields};
use sigcheck_types::{parse_hex_bytes, SigningMethod, VerificationOutcome, VerificationRequest};
use sigcheck_verify::SignatureVerifier;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Exit code when a request could not be checked at all.
const EXIT_ERROR: u8 = 3;

/// Command-line arguments for sigcheck.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, env = "SIGCHECK_CONFIG")]
	config: Option<PathBuf>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// List the supported signing methods and their parameters
	Methods,
	/// Print the JSON-RPC request a wallet expects for a signing method
	Format {
		/// Signing method, e.g. personal_sign
		#[arg(short, long)]
		method: String,
		/// Request field as key=value (repeatable)
		#[arg(short, long = "field", value_parser = parse_field)]
		fields: Vec<(String, String)>,
		/// JSON-RPC request id
		#[arg(long, default_value_t = 1)]
		id: u64,
	},
	/// Verify a signature returned by a wallet
	Verify {
		/// Signing method that produced the signature
		#[arg(short, long)]
		method: String,
		/// Claimed signer address
		#[arg(long)]
		from: String,
		/// Signature as returned by the wallet
		#[arg(short, long)]
		signature: String,
		/// Signed message: text for personal_sign, typed data as JSON
		#[arg(long)]
		message: String,
		/// Treat a personal_sign message as 0x-prefixed hex bytes
		#[arg(long)]
		raw: bool,
		/// Chain to verify against
		#[arg(long)]
		chain_id: Option<u64>,
		/// Print the outcome as JSON
		#[arg(long)]
		json: bool,
	},
}

/// Main entry point.
///
/// Exit codes: 0 verified (or command succeeded), 1 not verified,
/// 2 unsupported method, 3 error.
#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	match run(args).await {
		Ok(code) => ExitCode::from(code),
		Err(e) => {
			tracing::error!("{}", e);
			ExitCode::from(EXIT_ERROR)
		},
	}
}

async fn run(args: Args) -> Result<u8, Box<dyn std::error::Error>> {
	match args.command {
		Command::Methods => {
			for spec in sign_message_methods() {
				let params: Vec<&str> = spec.params.iter().map(|param| param.key).collect();
				println!("{:<24} {}", spec.method.as_str(), params.join(", "));
			}
			Ok(0)
		},
		Command::Format { method, fields, id } => {
			let fields: Fields = fields.into_iter().collect();
			let request = format_request(&method, &fields)?;
			println!("{}", serde_json::to_string_pretty(&request.to_json_rpc(id))?);
			Ok(0)
		},
		Command::Verify {
			method,
			from,
			signature,
			message,
			raw,
			chain_id,
			json,
		} => {
			let config = load_config(args.config.as_ref()).await?;
			let registry = ChainTable::from_config(&config)?;
			let mut verifier = SignatureVerifier::new(Arc::new(registry), Arc::new(AlloyConnector));
			if let Some(code) = &config.verifier.erc6492_validator {
				verifier = verifier.with_erc6492_validator(parse_hex_bytes(code)?);
			}

			let message = parse_message_arg(&method, &message, raw)?;
			let mut request = VerificationRequest::new(method, from, signature, message);
			request.chain_id = chain_id;

			let outcome = verifier.verify(&request).await?;
			tracing::info!(method = %request.method, "{}", outcome);
			if json {
				println!("{}", serde_json::to_string(&outcome)?);
			} else {
				println!("{}", outcome);
			}
			Ok(exit_code(&outcome))
		},
	}
}

/// Loads the configuration file, or the built-in defaults when none is given.
async fn load_config(path: Option<&PathBuf>) -> Result<Config, Box<dyn std::error::Error>> {
	let Some(path) = path else {
		return Ok(Config::default());
	};
	let path = path
		.to_str()
		.ok_or_else(|| format!("Configuration path is not valid UTF-8: {}", path.display()))?;
	let config = Config::from_file(path).await?;
	tracing::info!(path, "Loaded configuration");
	Ok(config)
}

/// Parses a `key=value` field argument.
fn parse_field(arg: &str) -> Result<(String, String), String> {
	arg.split_once('=')
		.map(|(key, value)| (key.to_string(), value.to_string()))
		.filter(|(key, _)| !key.is_empty())
		.ok_or_else(|| format!("expected key=value, got '{}'", arg))
}

/// Builds the request message for `method` from the `--message` argument.
///
/// Text-signing methods take the argument verbatim, even when it looks like
/// JSON. With `raw`, a personal_sign message is hex bytes. Typed-data methods
/// use structured JSON as-is and pass anything else on as a string for
/// typed-data normalization.
fn parse_message_arg(method: &str, message: &str, raw: bool) -> Result<Value, String> {
	match method.parse::<SigningMethod>() {
		Ok(SigningMethod::PersonalSign) if raw => Ok(json!({ "raw": message })),
		_ if raw => Err(format!("--raw only applies to personal_sign, not {}", method)),
		Ok(
			SigningMethod::SignTypedDataV1
			| SigningMethod::SignTypedDataV3
			| SigningMethod::SignTypedDataV4,
		) => match serde_json::from_str::<Value>(message) {
			Ok(value @ (Value::Object(_) | Value::Array(_))) => Ok(value),
			_ => Ok(Value::String(message.to_string())),
		},
		_ => Ok(Value::String(message.to_string())),
	}
}

fn exit_code(outcome: &VerificationOutcome) -> u8 {
	match outcome {
		VerificationOutcome::Verified { .. } => 0,
		VerificationOutcome::NotVerified | VerificationOutcome::Mismatch { .. } => 1,
		VerificationOutcome::Unsupported => 2,
	}
}
