use crate::cli::client::ApiClient;
use crate::cli::utils::{field, output_json};
use crate::cli::OutputFormat;

pub async fn handle(server: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = ApiClient::anonymous(server)?;
    let data = client.get("/health").await?;

    match output_format {
        OutputFormat::Json => output_json(&data),
        OutputFormat::Text => {
            println!("{}: {} (database {})", client.base_url(), field(&data, "status"), field(&data, "database"));
            Ok(())
        }
    }
}
