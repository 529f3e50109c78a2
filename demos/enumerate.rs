//! Connects to an NFSv3 export and recursively lists it.
//!
//! ```text
//! cargo run --example enumerate -- <host> <export-path> [max-depth]
//! ```
//!
//! Port discovery goes through PORTMAP unless `NFS3_CLIENT_PORT` is set, in
//! which case both MOUNT and NFSv3 are dialed directly on that port.

use std::env;

use futures::StreamExt;
use nfs3_client::client::enumerate::EnumerateEntry;
use nfs3_client::config::{ClientConfig, Target};
use nfs3_client::protocol::xdr::nfs3::ftype3;
use nfs3_client::Client;

// The library surfaces its own `ClientError` throughout (see `error.rs`);
// this binary's top-level `main`, like the teacher's own `tcp::run`, just
// wants *a* error to print and exit on, so it collapses into `anyhow::Error`
// at this one outer boundary rather than propagating `ClientError` further.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "localhost".to_string());
    let export_path = args.next().unwrap_or_else(|| "/".to_string());
    let max_depth = args.next().and_then(|s| s.parse::<usize>().ok());

    let port = env::var("NFS3_CLIENT_PORT").ok().and_then(|p| p.parse::<u16>().ok()).unwrap_or(0);
    let target = Target::new(host, port);
    let config = ClientConfig::new(target);

    let client = Client::connect(config, export_path.clone().into_bytes()).await?;
    println!("mounted {export_path} (state: {:?})", client.state().await);

    let mut entries = Box::pin(client.enumerate(client.root(), max_depth, None));
    let mut count = 0usize;
    while let Some(item) = entries.next().await {
        match item {
            Ok(entry) => {
                print_entry(&entry);
                count += 1;
            }
            Err(err) => eprintln!("! error walking subtree: {err}"),
        }
    }
    println!("{count} entries");

    client.disconnect().await;
    Ok(())
}

fn print_entry(entry: &EnumerateEntry) {
    let marker = match entry.kind {
        ftype3::NF3DIR => "d",
        ftype3::NF3LNK => "l",
        ftype3::NF3REG => "-",
        _ => "?",
    };
    println!("{marker} {}", entry.path);
}
