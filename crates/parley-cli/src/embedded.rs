//! Embedded mode: hand the hosted web client to the platform's browser view.

use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::info;

/// The command that opens `url` with the platform's default handler.
fn opener(url: &str) -> Command {
  if cfg!(target_os = "macos") {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    cmd
  } else if cfg!(target_os = "windows") {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", "", url]);
    cmd
  } else {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    cmd
  }
}

/// Open `url` and return once the opener has handed it off.
pub fn open(url: &str) -> Result<()> {
  if !(url.starts_with("https://") || url.starts_with("http://")) {
    bail!("web_url must be an http(s) URL, got {url:?}");
  }

  let mut cmd = opener(url);
  info!(url, program = ?cmd.get_program(), "opening web client");
  let status = cmd
    .status()
    .with_context(|| format!("launching {:?}", cmd.get_program()))?;
  if !status.success() {
    bail!("{:?} exited with {status}", cmd.get_program());
  }
  Ok(())
}
