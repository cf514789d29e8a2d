use std::env;
use std::error::Error;
use std::process::Command;

use simple_error::bail;
use vergen::{BuildBuilder, CargoBuilder, Emitter, RustcBuilder};

fn uncommitted_count() -> usize {
    let output = match exec_git(&["status", "-s"]) {
        Ok(output) => output,
        Err(_) => return 0,
    };
    output
        .trim()
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .count()
}

fn exec_git(args: &[&str]) -> Result<String, Box<dyn Error>> {
    let output = Command::new("git").args(args).output()?;
    if !output.status.success() {
        bail!("Execute git command 'git {}' failed", args.join(" "));
    }
    let output = String::from_utf8(output.stdout)?;
    Ok(output.trim().to_string())
}

fn main() -> Result<(), Box<dyn Error>> {
    let build = BuildBuilder::all_build()?;
    let cargo = CargoBuilder::all_cargo()?;
    let rustc = RustcBuilder::all_rustc()?;

    Emitter::default()
        .add_instructions(&build)?
        .add_instructions(&cargo)?
        .add_instructions(&rustc)?
        .emit()?;

    // Released builds are tagged; fall back to the manifest version for
    // source tarballs and shallow checkouts.
    let mut version = match exec_git(&["describe", "--tags"]) {
        Ok(version) => version,
        Err(_) => env::var("CARGO_PKG_VERSION")?,
    };
    if uncommitted_count() > 0 {
        version = format!("{version}-dirty");
    }

    println!("cargo:rustc-env=COFFEE_SHOP_VERSION={version}");

    Ok(())
}
