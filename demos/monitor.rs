use plugwise_smile::{Event, PlugwiseClient};
use std::env;
use std::time::Duration;

#[tokio::main]
async fn main() -> plugwise_smile::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let (Some(host), Some(password)) = (args.get(1), args.get(2)) else {
        eprintln!("usage: monitor <host> <smile-id> [--legacy]");
        std::process::exit(2);
    };
    let legacy = args.iter().any(|a| a == "--legacy");

    let mut client = PlugwiseClient::builder(host, password)
        .legacy(legacy)
        .on_event(|event| {
            if let Event::MeasurementChanged {
                log_type: Some(log_type),
                new: Some(value),
                ..
            } = event
            {
                println!("{log_type}: {value}");
            }
        })
        .build()?;

    println!("Connecting to {host}...");
    if !client.connect().await {
        eprintln!("Failed to connect to Plugwise");
        std::process::exit(1);
    }
    client.find_all_appliances().await?;
    println!("Connected. Polling for updates...");

    loop {
        client.update_device().await?;
        match client.reading() {
            Ok(reading) => println!(
                "room: {:?}\u{00b0}C | target: {:?}\u{00b0}C | preset: {}",
                reading.current_temperature,
                reading.target_temperature,
                reading.preset.as_deref().unwrap_or("?"),
            ),
            Err(e) => eprintln!("Read error: {e}"),
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}
