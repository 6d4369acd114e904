/*!
# Rollcall Node

## Example Usage

```bash
rollcall --config node_a
```

`node_a.toml` (or any format the config crate understands) must hold the
node's bind address and next-peer address:

```toml
[node]
id = "A"
bind_address = "127.0.0.1:7001"
next_peer = "127.0.0.1:7002"
```

Kick off a round with any JSON-RPC client:

```bash
echo '{"jsonrpc":"2.0","id":"curl","method":"start_roll_call","params":[]}' | nc 127.0.0.1 7001
```
*/

use clap::{App, Arg};

#[tokio::main]
pub async fn main() -> rollcall::Result<()> {
    tracing_subscriber::fmt::init();

    let matches = App::new("Rollcall Node")
        .about("Runs one node of a roll-call ring")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .takes_value(true)
                .help("config file name"),
        )
        .get_matches();

    let config_name = match matches.value_of("config") {
        Some(name) => name,
        None => "config",
    };

    let mut settings = config::Config::default();
    settings.merge(config::File::with_name(config_name))?;

    rollcall::runtime::run(settings).await
}
