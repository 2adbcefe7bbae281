//! Print the OpenAPI document to stdout.

fn main() -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&zaguan::api::openapi())?);
    Ok(())
}
