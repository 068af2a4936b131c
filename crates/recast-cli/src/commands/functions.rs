//! List the function catalog

use anyhow::Result;
use recast_core::{FunctionCategory, TransformService};

/// Run the functions command
pub async fn run(category: Option<&str>, json: bool) -> Result<()> {
    let category = category
        .map(str::parse::<FunctionCategory>)
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let functions = TransformService::new().list_functions(category);

    if json {
        println!("{}", serde_json::to_string_pretty(&functions)?);
        return Ok(());
    }

    for (name, info) in &functions {
        let params = if info.params.is_empty() {
            String::new()
        } else {
            format!("({})", info.params.join(", "))
        };
        println!(
            "{:<16} {:<12} {:<36} {}",
            name,
            info.category.as_str(),
            params,
            info.description
        );
    }
    Ok(())
}
