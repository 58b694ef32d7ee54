//! Implementation of the `fltrel toolchain` command.

use anyhow::Result;

use super::{BuildArgs, Context};
use crate::output::{print_info, print_json, print_stat, print_success};

pub fn cmd_toolchain(ctx: &Context) -> Result<()> {
  let args = BuildArgs {
    targets: Vec::new(),
    triple: None,
    mode: None,
  };
  let pipeline = ctx.pipeline(&args)?;
  let toolchain = pipeline.toolchain();
  let env = toolchain.cross_env(pipeline.triple());

  if ctx.output.is_json() {
    let env: std::collections::BTreeMap<_, _> = env.iter().map(|(k, v)| (k, v.to_string_lossy())).collect();
    return print_json(&serde_json::json!({
      "triple": pipeline.triple(),
      "toolchain": toolchain,
      "env": env,
    }));
  }

  print_success(&format!("Toolchain resolved for {}", pipeline.triple()));
  print_stat("Arch", pipeline.triple().arch());
  print_stat("Workspace", &toolchain.workspace_root.display().to_string());
  print_stat("Compiler", &toolchain.compiler.display().to_string());
  print_stat("Linker", &toolchain.linker.display().to_string());
  print_stat("Stamper", &toolchain.stamper.display().to_string());
  print_stat("Std sources", &toolchain.std_src.display().to_string());
  println!();
  print_info("Build environment:");
  for (key, value) in &env {
    print_stat(key, &value.to_string_lossy());
  }

  Ok(())
}
