//! Module listing command.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use worklet_registry::ModuleLibrary;

#[derive(Args)]
pub struct ModulesArgs {
    /// Show only the script that defines this module
    #[arg(value_name = "MODULE")]
    module: Option<String>,

    /// Print parameter descriptors as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: &ModulesArgs) -> anyhow::Result<()> {
    let library = ModuleLibrary::builtin();
    let mut found = false;

    for path in library.paths() {
        let Some(script) = library.lookup(path) else {
            continue;
        };
        for descriptor in script() {
            if let Some(wanted) = &args.module
                && !descriptor.name().eq_ignore_ascii_case(wanted)
            {
                continue;
            }
            found = true;

            if args.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "script": path,
                        "name": descriptor.name(),
                        "descriptor": descriptor.parameter_descriptors(),
                    })
                );
                continue;
            }

            println!("{}  ({path})", descriptor.name());
            if descriptor.parameter_descriptors().is_empty() {
                println!("  no parameters");
            } else {
                println!(
                    "  {:12}  {:>8}  {:>8}  {:>8}  {}",
                    "Name", "Default", "Min", "Max", "Rate"
                );
                for param in descriptor.parameter_descriptors() {
                    println!(
                        "  {:12}  {:>8.3}  {:>8.3}  {:>8.3}  {:?}",
                        param.name,
                        param.default_value,
                        param.min_value,
                        param.max_value,
                        param.automation_rate
                    );
                }
            }
            println!();
        }
    }

    if let Some(wanted) = &args.module
        && !found
    {
        anyhow::bail!("Unknown module: {wanted}");
    }
    Ok(())
}
