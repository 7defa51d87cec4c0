//! `fxflow tools` — list registered tool definitions.

use std::path::Path;

use super::truncate;

pub fn list(tools_dir: Option<&Path>) -> Result<(), String> {
    let registry = super::build_registry(tools_dir)?;
    let names = registry.list_tools();

    println!("{} tool(s) registered", names.len());
    println!();
    println!("┌──────────────────┬────────────────────┬────────────────────────────────┐");
    println!("│ Name             │ Implementation     │ Parameters                     │");
    println!("├──────────────────┼────────────────────┼────────────────────────────────┤");

    for name in &names {
        let Some(definition) = registry.get_definition(name) else {
            continue;
        };
        let params: Vec<String> = definition
            .parameters
            .iter()
            .map(|p| if p.required { format!("{}*", p.name) } else { p.name.clone() })
            .collect();
        println!(
            "│ {:<16} │ {:<18} │ {:<30} │",
            truncate(&definition.name, 16),
            truncate(&definition.implementation, 18),
            truncate(&params.join(", "), 30)
        );
    }

    println!("└──────────────────┴────────────────────┴────────────────────────────────┘");
    println!("  * required");
    Ok(())
}
