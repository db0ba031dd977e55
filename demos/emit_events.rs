// Load generator: sends random count and timing events to a running collector.
//
// Usage: cargo run --example emit_events -- [--address ADDR] [--port PORT]
//   --address  default: 127.0.0.1
//   --port     default: 8686

use chilada::models::Event;
use rand::Rng;
use std::env;
use tokio::net::UdpSocket;
use tokio::time::{Duration, sleep};

const LABELS: [&str; 4] = ["Foo", "Bar", "Baz", "Blub"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let address = flag(&args, "--address").unwrap_or("127.0.0.1");
    let port: u16 = flag(&args, "--port")
        .and_then(|s| s.parse().ok())
        .unwrap_or(8686);

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect((address, port)).await?;

    let mut rng = rand::rng();
    loop {
        let label = LABELS[rng.random_range(0..LABELS.len())];
        let event = if rng.random_bool(0.5) {
            Event::count(label, rng.random_range(1..=5))
        } else {
            Event::timing(label, rng.random_range(10..1010))
        };
        let payload = event.encode();
        println!("{}", String::from_utf8_lossy(&payload));
        socket.send(&payload).await?;
        sleep(Duration::from_millis(rng.random_range(0..10) * 10)).await;
    }
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}
