// Copyright 2025 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use std::io::{self, IsTerminal, Read};

use octoshell::config::{set_thread_config, Config, LogLevel, DEFAULT_CONFIG_TEMPLATE};
use octoshell::session::chat::{ChatSession, Mode, RustylineInput, TerminalRenderer};
use octoshell::session::environment::Environment;
use octoshell::session::CompletionClient;
use octoshell::shell::SystemShell;

#[derive(Parser)]
#[command(name = "octoshell")]
#[command(version)]
#[command(about = "Ask questions or get shell commands from an LLM, right in your terminal")]
struct CliArgs {
	/// Prompt to answer once and exit; piped stdin is prepended to it
	#[arg(value_name = "PROMPT")]
	prompt: Option<String>,

	/// Start an interactive chat session
	#[arg(long, short)]
	chat: bool,

	/// Generate a shell command and ask before running it
	#[arg(long, short)]
	shell: bool,

	/// Print debug output (raw error bodies, skipped stream lines)
	#[arg(long, short = 'V')]
	verbose: bool,

	/// Print the default configuration file and exit
	#[arg(long)]
	template: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum PromptInput {
	Prompt(String),
	/// A prompt was given but it is blank
	Empty,
	/// Neither an argument nor piped input
	Missing,
}

// Piped stdin first, then the prompt argument
fn combine_prompt(piped: Option<&str>, argument: Option<&str>) -> PromptInput {
	if piped.is_none() && argument.is_none() {
		return PromptInput::Missing;
	}

	let parts: Vec<&str> = [piped, argument]
		.into_iter()
		.flatten()
		.map(str::trim)
		.filter(|part| !part.is_empty())
		.collect();

	if parts.is_empty() {
		PromptInput::Empty
	} else {
		PromptInput::Prompt(parts.join("\n\n"))
	}
}

fn read_prompt(argument: Option<&str>) -> Result<PromptInput> {
	let stdin = io::stdin();
	let piped = if stdin.is_terminal() {
		None
	} else {
		let mut buffer = String::new();
		stdin
			.lock()
			.read_to_string(&mut buffer)
			.context("Failed to read prompt from stdin")?;
		Some(buffer)
	};

	Ok(combine_prompt(piped.as_deref(), argument))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
	let args = CliArgs::parse();

	if args.template {
		print!("{}", DEFAULT_CONFIG_TEMPLATE);
		return Ok(());
	}

	// Interactive sessions read the terminal; stdin is only consumed for one-shot runs
	let prompt = if args.chat {
		String::new()
	} else {
		match read_prompt(args.prompt.as_deref())? {
			PromptInput::Prompt(prompt) => prompt,
			PromptInput::Empty => {
				println!("{}", "Empty prompt, ignored".yellow());
				return Ok(());
			}
			PromptInput::Missing => {
				CliArgs::command().print_help()?;
				println!();
				return Ok(());
			}
		}
	};

	let mut config = Config::load()?;
	if args.verbose {
		config.log_level = LogLevel::Debug;
	}
	set_thread_config(&config);

	if let Err(e) = config.validate() {
		octoshell::log_error!("Configuration error: {:#}", e);
		if let Some(path) = config.config_path() {
			octoshell::log_error!("Config file: {}", path.display());
		}
		std::process::exit(1);
	}

	let environment = Environment::detect(&config);
	octoshell::log_debug!(
		"Environment: {} / {} via {} ({})",
		environment.os_name,
		environment.shell_name,
		config.model,
		config.masked_api_key()
	);

	let client = CompletionClient::new(&config)?;
	let shell = SystemShell::new(environment.shell_name.clone());
	let renderer = TerminalRenderer::new(&config);
	let input = RustylineInput::new()?;

	let mode = match (args.chat, args.shell) {
		(_, true) => Mode::Execute,
		(true, false) => config.default_mode.interactive(),
		(false, false) => Mode::Temp,
	};

	let mut session = ChatSession::new(client, environment, mode, input, renderer, shell);
	session.install_interrupt_handler()?;

	if args.chat {
		return session.run_interactive().await;
	}

	if session.run_once(&prompt).await.is_err() {
		// Already reported by the session
		std::process::exit(1);
	}

	Ok(())
}
