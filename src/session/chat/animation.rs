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

// Animation module for the waiting indicator

use anyhow::Result;
use colored::*;
use crossterm::{cursor, execute, terminal};
use std::io::{stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

const LOADING_FRAMES: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

// Show loading animation until the flag is raised
async fn show_loading_animation(stop: Arc<AtomicBool>, message: &'static str) -> Result<()> {
	let mut stdout = stdout();
	let mut frame_idx = 0;

	execute!(stdout, cursor::SavePosition, cursor::Hide)?;

	while !stop.load(Ordering::SeqCst) {
		execute!(stdout, cursor::RestorePosition)?;
		print!(" {} {}", LOADING_FRAMES[frame_idx].cyan(), message.bright_blue());
		stdout.flush()?;

		frame_idx = (frame_idx + 1) % LOADING_FRAMES.len();
		tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
	}

	execute!(
		stdout,
		cursor::RestorePosition,
		terminal::Clear(terminal::ClearType::UntilNewLine),
		cursor::Show
	)?;
	stdout.flush()?;

	Ok(())
}

/// Running waiting indicator; stop it before printing anything else
pub struct Spinner {
	stop: Arc<AtomicBool>,
	handle: Option<JoinHandle<()>>,
}

impl Spinner {
	pub fn start(message: &'static str) -> Self {
		let stop = Arc::new(AtomicBool::new(false));
		let flag = stop.clone();
		let handle = tokio::spawn(async move {
			if let Err(e) = show_loading_animation(flag, message).await {
				crate::log_debug!("Spinner stopped: {}", e);
			}
		});

		Self {
			stop,
			handle: Some(handle),
		}
	}

	/// Stop the animation and wait until the line is cleared
	pub async fn stop(mut self) {
		self.stop.store(true, Ordering::SeqCst);
		if let Some(handle) = self.handle.take() {
			let _ = handle.await;
		}
	}
}

impl Drop for Spinner {
	fn drop(&mut self) {
		self.stop.store(true, Ordering::SeqCst);
	}
}
