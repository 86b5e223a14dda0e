//! `biosvc check-config`: validate settings and print the launch plan.

use std::path::Path;

use crate::config::load_launch_spec;

pub fn execute(config: Option<&Path>) -> anyhow::Result<()> {
    let spec = load_launch_spec(config)?;
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}
