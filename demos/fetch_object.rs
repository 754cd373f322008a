use parse_lite::{Client, ClientConfig, TcpConnection};

/// Fetches one object and prints a few of its fields.
///
/// Usage: fetch_object <host> <port> <application-id> <client-key> <path>
///
/// `TcpConnection` is plaintext, so point this at a local or proxied backend.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 6 {
        eprintln!("usage: {} <host> <port> <application-id> <client-key> <path>", args[0]);
        std::process::exit(2);
    }

    let mut config = ClientConfig::new(&args[3], &args[4]);
    config.api_host = args[1].clone();
    config.port = args[2].parse()?;

    let mut client = Client::new(config, TcpConnection::new(), TcpConnection::new())?;
    println!("Installation: {}", client.installation_id().await);

    let mut response = client.send_request("GET", &args[5], "", "").await;
    response.read_with_timeout(10).await;

    println!("Status: {:?}", response.status());
    println!("objectId: {}", response.get_string("objectId"));
    println!("updatedAt: {}", response.get_string("updatedAt"));
    if response.error_code() != 0 {
        println!("Error: {}", response.get_string("error"));
    }
    println!("Raw response:\n{}", response.json_body());
    response.close();

    client.end().await;
    Ok(())
}
