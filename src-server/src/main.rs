#[tokio::main]
async fn main() {
    if let Err(err) = incidentdesk_lib::run().await {
        eprintln!("incidentdesk: {err}");
        if let Some(details) = &err.details {
            eprintln!("  {details}");
        }
        std::process::exit(1);
    }
}
